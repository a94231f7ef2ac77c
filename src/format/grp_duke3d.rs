//! Build Engine GRP archives (Duke Nukem 3D and kin): head-FAT, fixed
//! 16-byte records (`name:12 | size:u32le`), addressed purely by index —
//! there is no explicit per-entry offset field, since a payload's position
//! is always the sum of the header, the table, and every preceding
//! payload's size.

use std::io::{Read, Seek, SeekFrom, Write};

use super::io_util::{fixed_name_field, name_from_field, read_bytes_at, read_u32_at, write_u32_at};
use super::{ArchiveTypeCode, Detection};
use crate::engine::{Archive, FatFormat};
use crate::entry::{Entry, EntryExtra};
use crate::stream::{SegmentedStream, Truncate};
use crate::Result;

const MAGIC: &[u8; 12] = b"KenSilverman";
const HEADER_LEN: u64 = 16;
const ROW_WIDTH: u64 = 16;
const NAME_WIDTH: usize = 12;

#[derive(Debug)]
pub struct GrpDuke3d;

impl GrpDuke3d {
    fn row_pos(index: usize) -> u64 {
        HEADER_LEN + index as u64 * ROW_WIDTH
    }
}

impl<S: Read + Write + Seek + Truncate> FatFormat<S> for GrpDuke3d {
    fn type_code(&self) -> ArchiveTypeCode {
        ArchiveTypeCode::GrpDuke3d
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
        _stream: &mut SegmentedStream<S>,
        _entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        Ok(())
    }

    fn update_file_size(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        _delta: i64,
    ) -> Result<()> {
        write_u32_at(stream, Self::row_pos(entry.index) + NAME_WIDTH as u64, entry.stored_size as u32)
    }

    fn pre_insert_file(
        &mut self,
        stream: &mut SegmentedStream<S>,
        _before: Option<&Entry>,
        entry: Entry,
    ) -> Result<Entry> {
        let field = fixed_name_field(&entry.name, NAME_WIDTH);
        let row = Self::row_pos(entry.index);
        stream.seek(SeekFrom::Start(row))?;
        stream.write_all(&field)?;
        write_u32_at(stream, row + NAME_WIDTH as u64, entry.stored_size as u32)?;
        Ok(entry)
    }

    fn post_insert_file(&mut self, stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        let count = read_u32_at(stream, 12)?;
        write_u32_at(stream, 12, count + 1)
    }

    fn post_remove_file(&mut self, stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        let count = read_u32_at(stream, 12)?;
        write_u32_at(stream, 12, count.saturating_sub(1))
    }
}

pub fn detect<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Detection> {
    if stream.size() < HEADER_LEN {
        return Ok(Detection::DefinitelyNo);
    }
    let magic = read_bytes_at(stream, 0, 12)?;
    Ok(if magic == MAGIC {
        Detection::DefinitelyYes
    } else {
        Detection::DefinitelyNo
    })
}

fn read_entries<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
) -> Result<Vec<Entry>> {
    let count = read_u32_at(stream, 12)? as usize;
    let mut entries = Vec::with_capacity(count);
    let mut offset = HEADER_LEN + count as u64 * ROW_WIDTH;
    for i in 0..count {
        let row = GrpDuke3d::row_pos(i);
        let name = read_bytes_at(stream, row, NAME_WIDTH)?;
        let size = read_u32_at(stream, row + NAME_WIDTH as u64)? as u64;
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
        offset += size;
    }
    Ok(entries)
}

pub fn open<S: Read + Write + Seek + Truncate>(
    mut stream: SegmentedStream<S>,
) -> Result<Archive<S>> {
    let entries = read_entries(&mut stream)?;
    let next_id = entries.len() as u64;
    Ok(Archive::from_parts(stream, entries, next_id, Box::new(GrpDuke3d)))
}

pub fn new_archive<S: Read + Write + Seek + Truncate>(backing: S) -> Result<Archive<S>> {
    let mut stream = SegmentedStream::new(backing, 0);
    stream.insert(HEADER_LEN);
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(MAGIC)?;
    write_u32_at(&mut stream, 12, 0)?;
    Ok(Archive::from_parts(stream, Vec::new(), 0, Box::new(GrpDuke3d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn insert_updates_header_count() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.insert(None, "TILES", 4, "", 0).unwrap();
        archive.flush().unwrap();
        assert_eq!(archive.len(), 1);
        let e = archive.find("TILES").unwrap();
        assert_eq!(e.offset, HEADER_LEN + ROW_WIDTH);
    }

    #[test]
    fn second_insert_lands_after_first_payload() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        archive.insert(None, "A", 3, "", 0).unwrap();
        let b = archive.insert(None, "B", 5, "", 0).unwrap();
        archive.flush().unwrap();
        assert_eq!(b.offset, HEADER_LEN + ROW_WIDTH * 2 + 3);
    }

    #[test]
    fn remove_decrements_header_count() {
        let archive = new_archive(Cursor::new(Vec::new())).unwrap();
        let a = archive.insert(None, "A", 2, "", 0).unwrap();
        archive.insert(None, "B", 2, "", 0).unwrap();
        archive.remove(&a).unwrap();
        archive.flush().unwrap();
        assert_eq!(archive.len(), 1);
    }
}
