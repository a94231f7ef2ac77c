//! Hugo-class scenery DAT archives: per-entry inline `name:12 | size:u32le`
//! records immediately before each payload (like [`super::res_stellar7`]),
//! plus a secondary on-disk FAT region at the tail of the archive holding
//! one `i32le` "file number" per entry — a format-specific identifier
//! distinct from the engine's own contiguous `index`, exposed to callers
//! through [`crate::entry::EntryExtra::HugoFile`].
//!
//! Header is a single `u32le` file count at offset 0.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{fixed_name_field, name_from_field, read_bytes_at, read_u32_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::{Error, Result};

const NAME_WIDTH: usize = 12;
const HEADER_LEN: u64 = 4;
const RECORD_LEN: u64 = NAME_WIDTH as u64 + 4;

#[derive(Debug)]
pub struct DatHugo {
    /// Absolute offset where the trailing file-number array begins.
    tail_fat_pos: u64,
    file_count: usize,
    next_file_number: i32,
}

impl DatHugo {
    fn slot(&self, index: usize) -> u64 {
        self.tail_fat_pos + index as u64 * 4
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for DatHugo {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::DatHugo
    }

    fn max_filename(&self) -> Option<usize> {
        Some(NAME_WIDTH)
    }

    fn off_first(&self) -> u64 {
        HEADER_LEN
    }

    fn new_entry(&self) -> Entry {
        Entry {
            id: 0,
            index: 0,
            offset: 0,
            header_len: RECORD_LEN,
            stored_size: 0,
            real_size: 0,
            name: String::new(),
            file_type: String::new(),
            attrs: 0,
            filter: None,
            valid: false,
            extra: EntryExtra::HugoFile(0),
        }
    }

    fn update_file_name(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(entry.offset))?;
        stream.write_all(&field)?;
        Ok(())
    }

    fn update_file_offset(
        &mut self,
        _stream: &mut SegmentedStream<S>,
        _entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        // The inline record travels with its payload; there is no separate offset field.
        Ok(())
    }

    fn update_file_size(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u32_at(stream, entry.offset + NAME_WIDTH as u64, entry.stored_size as u32)
    }

    fn pre_insert_file(
        &mut self,
        stream: &mut SegmentedStream<S>,
        _before: Option<&Entry>,
        mut entry: Entry,
    ) -> Result<Entry> {
        entry.header_len = RECORD_LEN;
        stream.seek(SeekFrom::Start(entry.offset))?;
        stream.insert(RECORD_LEN);
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(entry.offset))?;
        stream.write_all(&field)?;
        write_u32_at(stream, entry.offset + NAME_WIDTH as u64, entry.stored_size as u32)?;

        self.tail_fat_pos += RECORD_LEN;
        let file_no = self.next_file_number;
        self.next_file_number += 1;
        entry.extra = EntryExtra::HugoFile(file_no);

        let slot = self.slot(entry.index);
        stream.seek(SeekFrom::Start(slot))?;
        stream.insert(4);
        write_u32_at(stream, slot, file_no as u32)?;
        Ok(entry)
    }

    fn post_insert_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        self.tail_fat_pos += entry.stored_size;
        self.file_count += 1;
        write_u32_at(stream, 0, self.file_count as u32)
    }

    fn pre_remove_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        let slot = self.slot(entry.index);
        stream.seek(SeekFrom::Start(slot))?;
        stream.remove(4);
        Ok(())
    }

    fn post_remove_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        self.tail_fat_pos -= entry.header_len + entry.stored_size;
        self.file_count -= 1;
        write_u32_at(stream, 0, self.file_count as u32)
    }
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    match read_entries(stream) {
        Ok((entries, _, _, _)) if !entries.is_empty() => Ok(Detection::PossiblyYes),
        _ => Ok(Detection::DefinitelyNo),
    }
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<(Vec<Entry>, u64, usize, i32)> {
    let total = stream.size();
    if total < HEADER_LEN {
        return Err(Error::Truncated {
            expected: HEADER_LEN,
            found: total,
        });
    }
    let count = read_u32_at(stream, 0)? as usize;
    let mut entries = Vec::with_capacity(count);
    let mut pos = HEADER_LEN;
    for i in 0..count {
        if total - pos < RECORD_LEN {
            return Err(Error::Truncated {
                expected: pos + RECORD_LEN,
                found: total,
            });
        }
        let name = read_bytes_at(stream, pos, NAME_WIDTH)?;
        let size = read_u32_at(stream, pos + NAME_WIDTH as u64)? as u64;
        let entry_offset = pos;
        pos += RECORD_LEN;
        if total - pos < size {
            return Err(Error::CorruptHeader {
                offset: entry_offset + NAME_WIDTH as u64,
                reason: format!("declared size {size} exceeds remaining archive bytes"),
            });
        }
        pos += size;
        entries.push(Entry {
            id: i as u64,
            index: i,
            offset: entry_offset,
            header_len: RECORD_LEN,
            stored_size: size,
            real_size: size,
            name: name_from_field(&name),
            file_type: String::new(),
            attrs: 0,
            filter: None,
            valid: true,
            extra: EntryExtra::HugoFile(0),
        });
    }
    let tail_fat_pos = pos;
    if total - tail_fat_pos != count as u64 * 4 {
        return Err(Error::CorruptHeader {
            offset: tail_fat_pos,
            reason: "trailing file-number region does not match the file count".into(),
        });
    }
    let mut max_seen = -1i32;
    for (i, e) in entries.iter_mut().enumerate() {
        let file_no = read_u32_at(stream, tail_fat_pos + i as u64 * 4)? as i32;
        e.extra = EntryExtra::HugoFile(file_no);
        max_seen = max_seen.max(file_no);
    }
    Ok((entries, tail_fat_pos, count, max_seen + 1))
}

pub fn open<S: Read + Write + Seek + Truncate>(
    mut stream: SegmentedStream<S>,
) -> Result<Archive<S>> {
    let (entries, tail_fat_pos, count, next_file_number) = read_entries(&mut stream)?;
    let next_id = entries.len() as u64;
    Ok(Archive::from_parts(
        stream,
        entries,
        next_id,
        Box::new(DatHugo {
            tail_fat_pos,
            file_count: count,
            next_file_number,
        }),
    ))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let mut stream = SegmentedStream::new(backing, 0);
    stream.insert(HEADER_LEN);
    write_u32_at(&mut stream, 0, 0)?;
    Ok(Archive::from_parts(
        stream,
        Vec::new(),
        0,
        Box::new(DatHugo {
            tail_fat_pos: HEADER_LEN,
            file_count: 0,
            next_file_number: 0,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn file_number(entry: &Entry) -> i32 {
        match entry.extra {
            EntryExtra::HugoFile(n) => n,
            _ => panic!("expected HugoFile extra"),
        }
    }

    #[test]
    fn insert_assigns_increasing_file_numbers() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let a = archive.insert(None, "A.MAP", 2, "", 0).unwrap();
        let b = archive.insert(None, "B.MAP", 3, "", 0).unwrap();
        archive.flush().unwrap();
        assert_eq!(file_number(&archive.find("A.MAP").unwrap()), file_number(&a));
        assert_ne!(file_number(&a), file_number(&b));
    }

    #[test]
    fn round_trips_through_reopen() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "A.MAP", 4, "", 0).unwrap();
        {
            let mut v = archive.open(&e).unwrap();
            v.write_all(b"DATA").unwrap();
        }
        archive.flush().unwrap();
        assert_eq!(archive.len(), 1);
        let reopened = archive.find("A.MAP").unwrap();
        assert_eq!(reopened.stored_size, 4);
    }

    #[test]
    fn remove_then_insert_reuses_freed_slot_cleanly() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let a = archive.insert(None, "A.MAP", 2, "", 0).unwrap();
        archive.insert(None, "B.MAP", 3, "", 0).unwrap();
        archive.remove(&a).unwrap();
        archive.flush().unwrap();
        assert_eq!(archive.len(), 1);
        assert!(archive.find("A.MAP").is_none());
    }
}
