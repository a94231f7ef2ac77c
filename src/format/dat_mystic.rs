//! Mystic Towers-class tail-FAT archives: `ptr:u32le | payload... |
//! (name:8 | offset:u32le)[n] | sentinel:u32le`, mirroring
//! [`super::dat_sango`]'s implicit-size-via-offset-diff layout but with an
//! 8-byte name riding alongside each offset.
//!
//! The adapter tracks an `uncommitted_files` counter the way the format's
//! original C++ implementation did, to flush the FAT region's file-count
//! word once per logical edit rather than once per shifted entry; since
//! this engine performs exactly one edit per public call, that flush always
//! happens immediately inside `post_insert_file`/`post_remove_file`.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{fixed_name_field, name_from_field, read_bytes_at, read_u32_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::{Error, Result};

const NAME_WIDTH: usize = 8;
const HEADER_LEN: u64 = 4;
const ROW_WIDTH: u64 = NAME_WIDTH as u64 + 4;

#[derive(Debug)]
pub struct DatMystic {
    fat_ptr: u64,
    file_count: usize,
    /// Entries written to disk but not yet reflected in the file-count word.
    uncommitted_files: i32,
}

impl DatMystic {
    fn slot(&self, index: usize) -> u64 {
        self.fat_ptr + index as u64 * ROW_WIDTH
    }

    fn update_file_count<S: Read + Write + Seek + Truncate>(
        &mut self,
        stream: &mut SegmentedStream<S>,
    ) -> Result<()> {
        self.file_count = (self.file_count as i32 + self.uncommitted_files) as usize;
        self.uncommitted_files = 0;
        write_u32_at(stream, 0, self.file_count as u32)
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for DatMystic {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::DatMystic
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

    fn update_file_name(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(self.slot(entry.index)))?;
        stream.write_all(&field)?;
        Ok(())
    }

    fn update_file_offset(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u32_at(stream, self.slot(entry.index) + NAME_WIDTH as u64, entry.offset as u32)
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
        let width = if n == 0 { ROW_WIDTH + 4 } else { ROW_WIDTH };
        let slot_pos = self.slot(entry.index);
        stream.seek(SeekFrom::Start(slot_pos))?;
        stream.insert(width);
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(slot_pos))?;
        stream.write_all(&field)?;
        write_u32_at(stream, slot_pos + NAME_WIDTH as u64, entry.offset as u32)?;
        let sentinel_pos = self.fat_ptr + (n as u64 + 1) * ROW_WIDTH;
        let new_fat_ptr = self.fat_ptr + entry.stored_size;
        write_u32_at(stream, sentinel_pos, new_fat_ptr as u32)?;
        Ok(entry)
    }

    fn post_insert_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        self.fat_ptr += entry.stored_size;
        self.uncommitted_files += 1;
        self.update_file_count(stream)
    }

    fn pre_remove_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        if self.file_count == 1 {
            stream.seek(SeekFrom::Start(self.fat_ptr))?;
            stream.remove(ROW_WIDTH + 4);
        } else {
            stream.seek(SeekFrom::Start(self.slot(entry.index)))?;
            stream.remove(ROW_WIDTH);
            let n = self.file_count;
            let sentinel_pos = self.fat_ptr + (n as u64 - 1) * ROW_WIDTH;
            let new_fat_ptr = self.fat_ptr - entry.stored_size;
            write_u32_at(stream, sentinel_pos, new_fat_ptr as u32)?;
        }
        Ok(())
    }

    fn post_remove_file(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        self.fat_ptr -= entry.stored_size;
        self.uncommitted_files -= 1;
        self.update_file_count(stream)
    }
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    let total = stream.size();
    if total < HEADER_LEN {
        return Ok(Detection::DefinitelyNo);
    }
    let fat_ptr = read_u32_at(stream, 0)? as u64;
    if fat_ptr < HEADER_LEN || fat_ptr > total {
        return Ok(Detection::DefinitelyNo);
    }
    let fat_len = total - fat_ptr;
    if fat_len == 0 {
        return Ok(Detection::DefinitelyYes);
    }
    if fat_len < 4 || (fat_len - 4) % ROW_WIDTH != 0 {
        // n rows plus a lone trailing u32 sentinel
        return Ok(Detection::DefinitelyNo);
    }
    let n = ((fat_len - 4) / ROW_WIDTH) as usize;
    let sentinel = read_u32_at(stream, fat_ptr + n as u64 * ROW_WIDTH)? as u64;
    if sentinel != fat_ptr {
        return Ok(Detection::DefinitelyNo);
    }
    Ok(Detection::DefinitelyYes)
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<(Vec<Entry>, u64, usize)> {
    let total = stream.size();
    if total < HEADER_LEN {
        return Err(Error::Truncated {
            expected: HEADER_LEN,
            found: total,
        });
    }
    let fat_ptr = read_u32_at(stream, 0)? as u64;
    if fat_ptr < HEADER_LEN || fat_ptr > total {
        return Err(Error::CorruptHeader {
            offset: 0,
            reason: "FAT pointer inconsistent with archive length".into(),
        });
    }
    let fat_len = total - fat_ptr;
    if fat_len == 0 {
        return Ok((Vec::new(), fat_ptr, 0));
    }
    if fat_len < 4 || (fat_len - 4) % ROW_WIDTH != 0 {
        return Err(Error::CorruptHeader {
            offset: 0,
            reason: "FAT pointer inconsistent with archive length".into(),
        });
    }
    let n = ((fat_len - 4) / ROW_WIDTH) as usize;
    let mut names = Vec::with_capacity(n);
    let mut offsets = Vec::with_capacity(n + 1);
    for i in 0..n {
        let row = fat_ptr + i as u64 * ROW_WIDTH;
        names.push(read_bytes_at(stream, row, NAME_WIDTH)?);
        offsets.push(read_u32_at(stream, row + NAME_WIDTH as u64)? as u64);
    }
    offsets.push(read_u32_at(stream, fat_ptr + n as u64 * ROW_WIDTH)? as u64);
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
            name: name_from_field(&names[i]),
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
        Box::new(DatMystic {
            fat_ptr,
            file_count: n,
            uncommitted_files: 0,
        }),
    ))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let mut stream = SegmentedStream::new(backing, 0);
    stream.insert(HEADER_LEN);
    write_u32_at(&mut stream, 0, HEADER_LEN)?;
    Ok(Archive::from_parts(
        stream,
        Vec::new(),
        0,
        Box::new(DatMystic {
            fat_ptr: HEADER_LEN,
            file_count: 0,
            uncommitted_files: 0,
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
        let e = archive.insert(None, "LEVEL01", 6, "", 0).unwrap();
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
    fn rename_updates_name_field() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.insert(None, "LEVEL01", 2, "", 0).unwrap();
        let e = archive.find("LEVEL01").unwrap();
        archive.rename(&e, "LEVEL02").unwrap();
        archive.flush().unwrap();
        assert!(archive.find("LEVEL02").is_some());
        assert!(archive.find("LEVEL01").is_none());
    }

    #[test]
    fn two_files_round_trip_through_reopen() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let a = archive.insert(None, "A", 3, "", 0).unwrap();
        {
            let mut v = archive.open(&a).unwrap();
            v.write_all(b"AAA").unwrap();
        }
        let b = archive.insert(None, "B", 2, "", 0).unwrap();
        {
            let mut v = archive.open(&b).unwrap();
            v.write_all(b"BB").unwrap();
        }
        archive.flush().unwrap();
        assert_eq!(archive.len(), 2);
    }
}
