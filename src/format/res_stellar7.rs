//! Stellar 7 RES archives: `name:4 | size:u32le | payload`, repeated to EOF.
//!
//! No header, no magic number, no separate FAT region — each entry's
//! 8-byte record sits immediately before its payload, so the whole archive
//! is just a sequence of these records read until the stream is exhausted.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{fixed_name_field, name_from_field, read_u32_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::{Error, Result};

const NAME_WIDTH: usize = 4;
const HEADER_LEN: u64 = NAME_WIDTH as u64 + 4;

#[derive(Debug)]
pub struct ResStellar7;

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for ResStellar7 {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::ResStellar7
    }

    fn max_filename(&self) -> Option<usize> {
        Some(NAME_WIDTH)
    }

    fn off_first(&self) -> u64 {
        0
    }

    fn new_entry(&self) -> Entry {
        Entry {
            id: 0,
            index: 0,
            offset: 0,
            header_len: HEADER_LEN,
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
        // The header travels with its payload; there is no separate offset field.
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
        entry.header_len = HEADER_LEN;
        stream.seek(SeekFrom::Start(entry.offset))?;
        stream.insert(HEADER_LEN);
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        stream.seek(SeekFrom::Start(entry.offset))?;
        stream.write_all(&field)?;
        write_u32_at(stream, entry.offset + NAME_WIDTH as u64, entry.stored_size as u32)?;
        Ok(entry)
    }
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    // No magic number; a layout-consistent parse is the strongest signal available.
    match read_entries(stream) {
        Ok(_) => Ok(Detection::PossiblyYes),
        Err(_) => Ok(Detection::DefinitelyNo),
    }
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Vec<Entry>> {
    let total = stream.size();
    let mut entries = Vec::new();
    let mut pos = 0u64;
    let mut index = 0usize;
    while pos < total {
        if total - pos < HEADER_LEN {
            return Err(Error::Truncated {
                expected: pos + HEADER_LEN,
                found: total,
            });
        }
        let name_bytes = super::io_util::read_bytes_at(stream, pos, NAME_WIDTH)?;
        let size = read_u32_at(stream, pos + NAME_WIDTH as u64)? as u64;
        let entry_offset = pos;
        pos += HEADER_LEN;
        if total - pos < size {
            return Err(Error::CorruptHeader {
                offset: entry_offset + NAME_WIDTH as u64,
                reason: format!("declared size {size} exceeds remaining archive bytes"),
            });
        }
        entries.push(Entry {
            id: index as u64,
            index,
            offset: entry_offset,
            header_len: HEADER_LEN,
            stored_size: size,
            real_size: size,
            name: name_from_field(&name_bytes),
            file_type: String::new(),
            attrs: 0,
            filter: None,
            valid: true,
            extra: EntryExtra::None,
        });
        pos += size;
        index += 1;
    }
    Ok(entries)
}

pub fn open<S: Read + Write + Seek + Truncate>(
    mut stream: SegmentedStream<S>,
) -> Result<Archive<S>> {
    let entries = read_entries(&mut stream)?;
    let next_id = entries.len() as u64;
    Ok(Archive::from_parts(stream, entries, next_id, Box::new(ResStellar7)))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let stream = SegmentedStream::new(backing, 0);
    Ok(Archive::from_parts(stream, Vec::new(), 0, Box::new(ResStellar7)))
}
