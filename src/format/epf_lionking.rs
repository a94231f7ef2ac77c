//! The Lion King EPF archives: head-FAT with an explicit per-entry offset
//! field (`name:13 | offset:u32le | size:u32le`), unlike GRP's
//! index-addressed table. Header is a 4-byte magic plus a `u16le` file
//! count.
//!
//! The archive may carry a trailing free-text description blob between the
//! last payload's end and EOF; it is never touched by the generic engine
//! (insert/remove only ever splice bytes before it, so it rides along for
//! free) and round-trips through [`crate::engine::Archive::description`]/
//! [`crate::engine::Archive::set_description`] instead of a per-entry field.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{fixed_name_field, name_from_field, read_bytes_at, read_u16_at, read_u32_at, write_u16_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::Result;

const MAGIC: &[u8; 4] = b"EPF\x1a";
const HEADER_LEN: u64 = 6;
const ROW_WIDTH: u64 = 21;
const NAME_WIDTH: usize = 13;

#[derive(Debug)]
pub struct EpfLionKing;

impl EpfLionKing {
    fn row_pos(index: usize) -> u64 {
        HEADER_LEN + index as u64 * ROW_WIDTH
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for EpfLionKing {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::EpfLionKing
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
            extra: EntryExtra::None,
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
        Ok(entry)
    }

    fn post_insert_file(&mut self, stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        let count = read_u16_at(stream, 4)?;
        write_u16_at(stream, 4, count + 1)
    }

    fn post_remove_file(&mut self, stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        let count = read_u16_at(stream, 4)?;
        write_u16_at(stream, 4, count.saturating_sub(1))
    }

    fn read_description(
        &self,
        stream: &mut SegmentedStream<S>,
        entries: &[Entry],
    ) -> Result<Option<String>> {
        let offset = description_offset(entries);
        let total = stream.size();
        let bytes = read_bytes_at(stream, offset, (total - offset) as usize)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn write_description(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entries: &[Entry],
        value: &str,
    ) -> Result<()> {
        let offset = description_offset(entries);
        let old_len = stream.size() - offset;
        stream.seek(SeekFrom::Start(offset))?;
        if old_len > 0 {
            stream.remove(old_len);
        }
        let bytes = value.as_bytes();
        if !bytes.is_empty() {
            stream.insert(bytes.len() as u64);
            stream.write_all(bytes)?;
        }
        Ok(())
    }
}

/// Offset of the trailing description blob: right after the last valid
/// entry's payload, or right after the (possibly empty) FAT table when the
/// archive carries no entries yet.
fn description_offset(entries: &[Entry]) -> u64 {
    entries
        .iter()
        .filter(|e| e.valid)
        .map(Entry::payload_end)
        .max()
        .unwrap_or(HEADER_LEN)
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    if stream.size() < HEADER_LEN {
        return Ok(Detection::DefinitelyNo);
    }
    let magic = read_bytes_at(stream, 0, 4)?;
    Ok(if magic == MAGIC {
        Detection::DefinitelyYes
    } else {
        Detection::DefinitelyNo
    })
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Vec<Entry>> {
    let count = read_u16_at(stream, 4)? as usize;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let row = EpfLionKing::row_pos(i);
        let name = read_bytes_at(stream, row, NAME_WIDTH)?;
        let offset = read_u32_at(stream, row + NAME_WIDTH as u64)? as u64;
        let size = read_u32_at(stream, row + NAME_WIDTH as u64 + 4)? as u64;
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
    Ok(Archive::from_parts(stream, entries, next_id, Box::new(EpfLionKing)))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let mut stream = SegmentedStream::new(backing, 0);
    stream.insert(HEADER_LEN);
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(MAGIC)?;
    write_u16_at(&mut stream, 4, 0)?;
    Ok(Archive::from_parts(stream, Vec::new(), 0, Box::new(EpfLionKing)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn insert_records_explicit_offset() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let e = archive.insert(None, "MAP01", 8, "", 0).unwrap();
        archive.flush().unwrap();
        assert_eq!(e.offset, HEADER_LEN + ROW_WIDTH);
    }

    #[test]
    fn detect_rejects_foreign_bytes() {
        let mut s = SegmentedStream::new(Cursor::new(b"not an epf archive......".to_vec()), 24);
        assert_eq!(detect(&mut s).unwrap(), Detection::DefinitelyNo);
    }

    #[test]
    fn empty_archive_has_an_empty_description() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        assert_eq!(archive.description().unwrap(), Some(String::new()));
    }

    #[test]
    fn description_round_trips_through_set_and_get() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.set_description("ripped by Malvineous").unwrap();
        assert_eq!(archive.description().unwrap().as_deref(), Some("ripped by Malvineous"));
    }

    #[test]
    fn description_survives_insert_and_resize() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.set_description("notes").unwrap();
        let e = archive.insert(None, "MAP01", 4, "", 0).unwrap();
        archive.open(&e).unwrap().write_all(b"ABCD").unwrap();
        archive.flush().unwrap();
        assert_eq!(archive.description().unwrap().as_deref(), Some("notes"));

        archive.resize(&e, 6, 6).unwrap();
        archive.flush().unwrap();
        assert_eq!(archive.description().unwrap().as_deref(), Some("notes"));
    }
}
