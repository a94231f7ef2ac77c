//! Sango-class tail-FAT archive: `ptr:u32le | payload... | offset:u32le[n] | sentinel:u32le`.
//!
//! The 4-byte header holds the absolute offset where the FAT region
//! begins; the FAT is `n` absolute payload offsets followed by one extra
//! "sentinel" offset equal to the FAT's own start position. Entry `i`'s
//! stored size is `fat[i+1] - fat[i]` (with `fat[n]` standing in for the
//! sentinel). An empty archive is exactly `04 00 00 00` — zero FAT slots,
//! not even a sentinel.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{read_u32_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::{Error, Result};

const HEADER_LEN: u64 = 4;

#[derive(Debug)]
pub struct DatSango {
    fat_ptr: u64,
    file_count: usize,
}

impl DatSango {
    fn slot(&self, index: usize) -> u64 {
        self.fat_ptr + index as u64 * 4
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for DatSango {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::DatSango
    }

    fn max_filename(&self) -> Option<usize> {
        None
    }

    fn off_first(&self) -> u64 {
        HEADER_LEN
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
        write_u32_at(stream, self.slot(entry.index), entry.offset as u32)
    }

    fn update_file_size(
        &mut self,
        _stream: &mut SegmentedStream<S>,
        _entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        // Sizes are implicit (consecutive offset deltas); nothing to rewrite directly.
        Ok(())
    }

    fn pre_insert_file(
        &mut self,
        stream: &mut SegmentedStream<S>,
        _before: Option<&Entry>,
        entry: Entry,
    ) -> Result<Entry> {
        let n = self.file_count;
        let width = if n == 0 { 8 } else { 4 };
        let slot_pos = self.slot(entry.index);
        stream.seek(SeekFrom::Start(slot_pos))?;
        stream.insert(width);
        write_u32_at(stream, slot_pos, entry.offset as u32)?;
        let sentinel_pos = self.fat_ptr + (n as u64 + 1) * 4;
        let new_fat_ptr = self.fat_ptr + entry.stored_size;
        write_u32_at(stream, sentinel_pos, new_fat_ptr as u32)?;
        Ok(entry)
    }

    fn post_insert_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        self.fat_ptr += entry.stored_size;
        self.file_count += 1;
        write_u32_at(stream, 0, self.fat_ptr as u32)
    }

    fn pre_remove_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        if self.file_count == 1 {
            stream.seek(SeekFrom::Start(self.fat_ptr))?;
            stream.remove(8);
        } else {
            stream.seek(SeekFrom::Start(self.slot(entry.index)))?;
            stream.remove(4);
            let n = self.file_count;
            let sentinel_pos = self.fat_ptr + (n as u64 - 1) * 4;
            let new_fat_ptr = self.fat_ptr - entry.stored_size;
            write_u32_at(stream, sentinel_pos, new_fat_ptr as u32)?;
        }
        Ok(())
    }

    fn post_remove_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        self.fat_ptr -= entry.stored_size;
        self.file_count -= 1;
        write_u32_at(stream, 0, self.fat_ptr as u32)
    }
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    let total = stream.size();
    if total < 4 {
        return Ok(Detection::DefinitelyNo);
    }
    let fat_ptr = read_u32_at(stream, 0)? as u64;
    if fat_ptr < 4 || fat_ptr > total {
        return Ok(Detection::DefinitelyNo);
    }
    let fat_len = total - fat_ptr;
    if fat_len % 4 != 0 {
        return Ok(Detection::DefinitelyNo);
    }
    if fat_len == 0 {
        return Ok(Detection::DefinitelyYes);
    }
    let n = (fat_len / 4) as usize - 1;
    let sentinel = read_u32_at(stream, fat_ptr + n as u64 * 4)? as u64;
    if sentinel != fat_ptr {
        return Ok(Detection::DefinitelyNo);
    }
    Ok(Detection::DefinitelyYes)
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<(Vec<Entry>, u64, usize)> {
    let total = stream.size();
    if total < 4 {
        return Err(Error::Truncated {
            expected: 4,
            found: total,
        });
    }
    let fat_ptr = read_u32_at(stream, 0)? as u64;
    if fat_ptr < 4 || fat_ptr > total || (total - fat_ptr) % 4 != 0 {
        return Err(Error::CorruptHeader {
            offset: 0,
            reason: "FAT pointer inconsistent with archive length".into(),
        });
    }
    let fat_len = total - fat_ptr;
    if fat_len == 0 {
        return Ok((Vec::new(), fat_ptr, 0));
    }
    let n = (fat_len / 4) as usize - 1;
    let mut offsets = Vec::with_capacity(n + 1);
    for i in 0..=n {
        offsets.push(read_u32_at(stream, fat_ptr + i as u64 * 4)? as u64);
    }
    let mut entries = Vec::with_capacity(n);
    for i in 0..n {
        let offset = offsets[i];
        let size = offsets[i + 1] - offset;
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
    Ok((entries, fat_ptr, n))
}

pub fn open<S: Read + Write + Seek + Truncate>(
    mut stream: SegmentedStream<S>,
) -> Result<Archive<S>> {
    let (entries, fat_ptr, n) = read_entries(&mut stream)?;
    Ok(Archive::from_parts(
        stream,
        entries,
        n as u64,
        Box::new(DatSango { fat_ptr, file_count: n }),
    ))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let mut stream = SegmentedStream::new(backing, 0);
    stream.insert(4);
    write_u32_at(&mut stream, 0, 4)?;
    Ok(Archive::from_parts(
        stream,
        Vec::new(),
        0,
        Box::new(DatSango {
            fat_ptr: 4,
            file_count: 0,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_archive_is_four_bytes() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.flush().unwrap();
        assert!(archive.is_empty());
    }

    #[test]
    fn insert_then_remove_round_trips_to_empty() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "", 6, "", 0).unwrap();
        {
            let mut v = archive.open(&e).unwrap();
            v.write_all(b"abcdef").unwrap();
        }
        archive.flush().unwrap();
        assert_eq!(archive.len(), 1);
        archive.remove(&e).unwrap();
        archive.flush().unwrap();
        assert!(archive.is_empty());
    }

    #[test]
    fn rename_is_unsupported() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "", 1, "", 0).unwrap();
        assert!(matches!(
            archive.rename(&e, "x").unwrap_err(),
            Error::UnsupportedOperation { .. }
        ));
    }

    #[test]
    fn two_files_round_trip_through_reopen() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let a = archive.insert(None, "", 3, "", 0).unwrap();
        {
            let mut v = archive.open(&a).unwrap();
            v.write_all(b"AAA").unwrap();
        }
        let b = archive.insert(None, "", 2, "", 0).unwrap();
        {
            let mut v = archive.open(&b).unwrap();
            v.write_all(b"BB").unwrap();
        }
        archive.flush().unwrap();
        assert_eq!(archive.len(), 2);
    }
}
