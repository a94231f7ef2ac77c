//! Terminal Velocity POD archives: head-FAT, fixed 60-byte records
//! (`name:12 | offset:u32le | size:u32le | comment:40`), file count at
//! offset 0. The per-file comment is a free-text field the generic engine
//! never reads or writes on its own; it round-trips through
//! [`crate::entry::EntryExtra::PodComment`] instead.
//!
//! No magic number distinguishes this header from any other `u32le` count
//! field, so [`detect`] only reports [`Detection::PossiblyYes`] after a
//! full structural parse succeeds.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{fixed_name_field, name_from_field, read_bytes_at, read_u32_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::{Error, Result};

const NAME_WIDTH: usize = 12;
const COMMENT_WIDTH: usize = 40;
const HEADER_LEN: u64 = 4;
const ROW_WIDTH: u64 = NAME_WIDTH as u64 + 4 + 4 + COMMENT_WIDTH as u64;

#[derive(Debug)]
pub struct PodTv;

impl PodTv {
    fn row_pos(index: usize) -> u64 {
        HEADER_LEN + index as u64 * ROW_WIDTH
    }
}

fn comment_of(entry: &Entry) -> String {
    match &entry.extra {
        EntryExtra::PodComment(c) => c.clone(),
        _ => String::new(),
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for PodTv {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::PodTv
    }

    fn max_filename(&self) -> Option<usize> {
        Some(NAME_WIDTH)
    }

    fn off_first(&self) -> u64 {
        HEADER_LEN
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
            extra: EntryExtra::PodComment(String::new()),
        }
    }

    fn update_file_name(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()> {
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(Self::row_pos(entry.index)))?;
        stream.write_all(&field)?;
        Ok(())
    }

    fn update_file_offset(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u32_at(stream, Self::row_pos(entry.index) + NAME_WIDTH as u64, entry.offset as u32)
    }

    fn update_file_size(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u32_at(
            stream,
            Self::row_pos(entry.index) + NAME_WIDTH as u64 + 4,
            entry.stored_size as u32,
        )
    }

    fn pre_insert_file(
        &mut self,
        stream: &mut SegmentedStream<S>,
        _before: Option<&Entry>,
        entry: Entry,
    ) -> Result<Entry> {
        let row = Self::row_pos(entry.index);
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(row))?;
        stream.write_all(&field)?;
        write_u32_at(stream, row + NAME_WIDTH as u64, entry.offset as u32)?;
        write_u32_at(stream, row + NAME_WIDTH as u64 + 4, entry.stored_size as u32)?;
        let comment = fixed_name_field(&comment_of(&entry), COMMENT_WIDTH);
        stream.seek(SeekFrom::Start(row + NAME_WIDTH as u64 + 8))?;
        stream.write_all(&comment)?;
        Ok(entry)
    }

    fn post_insert_file(&mut self, stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        let count = read_u32_at(stream, 0)?;
        write_u32_at(stream, 0, count + 1)
    }

    fn post_remove_file(&mut self, stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        let count = read_u32_at(stream, 0)?;
        write_u32_at(stream, 0, count.saturating_sub(1))
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
    if total < HEADER_LEN {
        return Err(Error::Truncated {
            expected: HEADER_LEN,
            found: total,
        });
    }
    let count = read_u32_at(stream, 0)? as usize;
    let table_end = HEADER_LEN + count as u64 * ROW_WIDTH;
    if table_end > total {
        return Err(Error::CorruptHeader {
            offset: 0,
            reason: "file count implies a FAT table longer than the archive".into(),
        });
    }
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let row = PodTv::row_pos(i);
        let name = read_bytes_at(stream, row, NAME_WIDTH)?;
        let offset = read_u32_at(stream, row + NAME_WIDTH as u64)? as u64;
        let size = read_u32_at(stream, row + NAME_WIDTH as u64 + 4)? as u64;
        let comment = read_bytes_at(stream, row + NAME_WIDTH as u64 + 8, COMMENT_WIDTH)?;
        if offset + size > total || offset < table_end {
            return Err(Error::CorruptHeader {
                offset: row,
                reason: "entry offset/size inconsistent with archive bounds".into(),
            });
        }
        entries.push(Entry {
            id: i as u64,
            index: i,
            offset,
            header_len: 0,
            stored_size: size,
            real_size: size,
            name: name_from_field(&name),
            file_type: String::new(),
            attrs: 0,
            filter: None,
            valid: true,
            extra: EntryExtra::PodComment(name_from_field(&comment)),
        });
    }
    Ok(entries)
}

pub fn open<S: Read + Write + Seek + Truncate>(
    mut stream: SegmentedStream<S>,
) -> Result<Archive<S>> {
    let entries = read_entries(&mut stream)?;
    let next_id = entries.len() as u64;
    Ok(Archive::from_parts(stream, entries, next_id, Box::new(PodTv)))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let mut stream = SegmentedStream::new(backing, 0);
    stream.insert(HEADER_LEN);
    write_u32_at(&mut stream, 0, 0)?;
    Ok(Archive::from_parts(stream, Vec::new(), 0, Box::new(PodTv)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn insert_records_explicit_offset_and_bumps_count() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "LEVEL1.LVL", 8, "", 0).unwrap();
        archive.flush().unwrap();
        assert_eq!(e.offset, HEADER_LEN + ROW_WIDTH);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn comment_round_trips_through_entry_extra() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.insert(None, "A.TXT", 3, "", 0).unwrap();
        archive.flush().unwrap();
        let e = archive.find("A.TXT").unwrap();
        assert!(matches!(e.extra, EntryExtra::PodComment(ref c) if c.is_empty()));
    }

    #[test]
    fn detect_rejects_table_longer_than_archive() {
        let mut s = SegmentedStream::new(Cursor::new(vec![5, 0, 0, 0]), 4);
        assert_eq!(detect(&mut s).unwrap(), Detection::DefinitelyNo);
    }
}
