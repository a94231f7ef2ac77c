//! SkyRoads-style `roads.lzs`-adjacent archives: nameless, headerless, a
//! `u16le offset | u16le size` row per entry at the very start of the file.
//! The first row's offset field doubles as the table's own length in
//! disguise — the table always occupies `[0, count*4)` and the first
//! entry's payload always begins exactly where the table ends, so `count`
//! is recovered as `first_offset / 4` with no separate count field stored
//! anywhere.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{read_u16_at, write_u16_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::{Error, Result};

const ROW_WIDTH: u64 = 4;

#[derive(Debug)]
pub struct RoadsSkyroads;

impl RoadsSkyroads {
    fn row_pos(index: usize) -> u64 {
        index as u64 * ROW_WIDTH
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for RoadsSkyroads {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::RoadsSkyroads
    }

    fn max_filename(&self) -> Option<usize> {
        None
    }

    fn off_first(&self) -> u64 {
        0
    }

    fn head_record_width(&self) -> u64 {
        ROW_WIDTH
    }

    fn new_entry(&self) -> Entry {
        Entry {
            id: 0,
            index: 0,
            offset: 0,
            header_len: 0,
            stored_size: 0,
            real_size: 0,
            name: String::new(),
            file_type: String::new(),
            attrs: 0,
            filter: None,
            valid: false,
            extra: EntryExtra::None,
        }
    }

    fn update_file_name(&mut self, _stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        Err(Error::UnsupportedOperation {
            operation: "rename: this format carries no filenames",
        })
    }

    fn update_file_offset(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u16_at(stream, Self::row_pos(entry.index), entry.offset as u16)
    }

    fn update_file_size(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u16_at(stream, Self::row_pos(entry.index) + 2, entry.stored_size as u16)
    }

    fn pre_insert_file(
        &mut self,
        stream: &mut SegmentedStream<S>,
        _before: Option<&Entry>,
        entry: Entry,
    ) -> Result<Entry> {
        let row = Self::row_pos(entry.index);
        write_u16_at(stream, row, entry.offset as u16)?;
        write_u16_at(stream, row + 2, entry.stored_size as u16)?;
        Ok(entry)
    }
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    match read_entries(stream) {
        Ok(entries) if !entries.is_empty() => Ok(Detection::PossiblyYes),
        _ => Ok(Detection::DefinitelyNo),
    }
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Vec<Entry>> {
    let total = stream.size();
    if total < ROW_WIDTH {
        return Err(Error::Truncated {
            expected: ROW_WIDTH,
            found: total,
        });
    }
    let first_offset = read_u16_at(stream, 0)? as u64;
    if first_offset == 0 || first_offset % ROW_WIDTH != 0 || first_offset > total {
        return Err(Error::CorruptHeader {
            offset: 0,
            reason: "first entry's offset is not a valid table length".into(),
        });
    }
    let count = (first_offset / ROW_WIDTH) as usize;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let row = RoadsSkyroads::row_pos(i);
        if row + ROW_WIDTH > total {
            return Err(Error::Truncated {
                expected: row + ROW_WIDTH,
                found: total,
            });
        }
        let offset = read_u16_at(stream, row)? as u64;
        let size = read_u16_at(stream, row + 2)? as u64;
        if offset + size > total {
            return Err(Error::CorruptHeader {
                offset: row,
                reason: "entry payload runs past end of archive".into(),
            });
        }
        entries.push(Entry {
            id: i as u64,
            index: i,
            offset,
            header_len: 0,
            stored_size: size,
            real_size: size,
            name: String::new(),
            file_type: String::new(),
            attrs: 0,
            filter: None,
            valid: true,
            extra: EntryExtra::None,
        });
    }
    Ok(entries)
}

pub fn open<S: Read + Write + Seek + Truncate>(
    mut stream: SegmentedStream<S>,
) -> Result<Archive<S>> {
    let entries = read_entries(&mut stream)?;
    let next_id = entries.len() as u64;
    Ok(Archive::from_parts(stream, entries, next_id, Box::new(RoadsSkyroads)))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let stream = SegmentedStream::new(backing, 0);
    Ok(Archive::from_parts(stream, Vec::new(), 0, Box::new(RoadsSkyroads)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn first_insert_lands_right_after_its_own_row() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "", 10, "", 0).unwrap();
        archive.flush().unwrap();
        assert_eq!(e.offset, ROW_WIDTH);
    }

    #[test]
    fn rename_is_unsupported() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "", 2, "", 0).unwrap();
        assert!(matches!(
            archive.rename(&e, "x").unwrap_err(),
            Error::UnsupportedOperation { .. }
        ));
    }
}
