//! Small little-endian field helpers shared by every format adapter.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::stream::{SegmentedStream, Truncate};
use crate::Result;

pub fn read_u16_at<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
    pos: u64,
) -> Result<u16> {
    let mut buf = [0u8; 2];
    stream.seek(SeekFrom::Start(pos))?;
    stream.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn write_u16_at<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
    pos: u64,
    value: u16,
) -> Result<()> {
    stream.seek(SeekFrom::Start(pos))?;
    stream.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn read_u32_at<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
    pos: u64,
) -> Result<u32> {
    let mut buf = [0u8; 4];
    stream.seek(SeekFrom::Start(pos))?;
    stream.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_u32_at<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
    pos: u64,
    value: u32,
) -> Result<()> {
    stream.seek(SeekFrom::Start(pos))?;
    stream.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn read_bytes_at<S: Read + Write + Seek + Truncate>(
    stream: &mut SegmentedStream<S>,
    pos: u64,
    n: usize,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    stream.seek(SeekFrom::Start(pos))?;
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Copies `name` into a fixed-width field, zero-padded or truncated to `width`.
pub fn fixed_name_field(name: &str, width: usize) -> Vec<u8> {
    let mut buf = vec![0u8; width];
    let bytes = name.as_bytes();
    let n = bytes.len().min(width);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

/// Decodes a fixed-width name field, trimming trailing NUL padding.
pub fn name_from_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
