//! Filtered stream: glues a (decode, encode) filter pair onto a [`Substream`]
//! so callers read and write an entry's *real* (post-decode) bytes while the
//! substream underneath only ever sees *stored* (post-encode) bytes.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::segmented::Truncate;
use super::substream::Substream;
use crate::filter::{Filter, pump};
use crate::Result;

/// A decode/encode filter pair layered over a [`Substream`].
///
/// Reads decode on demand from the underlying stored bytes; the decoded
/// form is cached once produced, since every filter in this crate is cheap
/// to run over the small payloads these archives carry and caching makes
/// backward seeks free instead of requiring a restart-point search.
/// Writes accumulate plaintext and are only encoded and pushed through the
/// substream on [`flush`](FilteredStream::flush), at which point the exact
/// encoded length is known and the substream's window can be grown or
/// shrunk to match in one step.
pub struct FilteredStream<S: Read + Write + Seek + Truncate> {
    inner: Substream<S>,
    decoder: Box<dyn Filter>,
    encoder: Box<dyn Filter>,
    decoded: Option<Vec<u8>>,
    write_buf: Vec<u8>,
    dirty: bool,
    cursor: u64,
    on_grow: Option<Box<dyn FnMut(u64, u64) -> Result<()>>>,
}

impl<S: Read + Write + Seek + Truncate> FilteredStream<S> {
    /// Wraps `inner`, driving reads through `decoder` and writes through
    /// `encoder`. `on_grow(new_real_len, new_stored_len)` is called from
    /// [`flush`] once the accumulated plaintext has been run through the
    /// encoder and both lengths are known, giving the caller (the FAT
    /// engine) a chance to `resize` the owning entry — and therefore this
    /// view's window — before the encoded bytes are written into the
    /// substream.
    pub fn new(
        inner: Substream<S>,
        decoder: Box<dyn Filter>,
        encoder: Box<dyn Filter>,
        on_grow: Option<Box<dyn FnMut(u64, u64) -> Result<()>>>,
    ) -> Self {
        FilteredStream {
            inner,
            decoder,
            encoder,
            decoded: None,
            write_buf: Vec::new(),
            dirty: false,
            cursor: 0,
            on_grow,
        }
    }

    fn decode_all(&mut self) -> io::Result<&[u8]> {
        if self.decoded.is_none() {
            self.decoder.reset(Some(self.inner.len()));
            self.inner.seek(SeekFrom::Start(0))?;
            let mut stored = Vec::new();
            self.inner.read_to_end(&mut stored)?;
            let mut plain = Vec::new();
            pump(&mut *self.decoder, &stored, &mut plain);
            pump(&mut *self.decoder, &[], &mut plain);
            self.decoded = Some(plain);
        }
        Ok(self.decoded.as_deref().unwrap())
    }
}

impl<S: Read + Write + Seek + Truncate> Read for FilteredStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let cursor = self.cursor as usize;
        let data = self.decode_all()?;
        if cursor >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - cursor);
        buf[..n].copy_from_slice(&data[cursor..cursor + n]);
        self.cursor += n as u64;
        Ok(n)
    }
}

impl<S: Read + Write + Seek + Truncate> Write for FilteredStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let start = self.cursor as usize;
        if self.write_buf.len() < start + buf.len() {
            self.write_buf.resize(start + buf.len(), 0);
        }
        self.write_buf[start..start + buf.len()].copy_from_slice(buf);
        self.cursor += buf.len() as u64;
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.dirty {
            return self.inner.flush();
        }
        self.encoder.reset(Some(self.write_buf.len() as u64));
        let mut encoded = Vec::new();
        pump(&mut *self.encoder, &self.write_buf, &mut encoded);
        pump(&mut *self.encoder, &[], &mut encoded);

        if let Some(cb) = self.on_grow.as_mut() {
            cb(self.write_buf.len() as u64, encoded.len() as u64).map_err(io::Error::other)?;
        }
        if encoded.len() as u64 > self.inner.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "encoded payload does not fit the substream's window",
            ));
        }
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&encoded)?;
        self.inner.flush()?;
        self.decoded = Some(std::mem::take(&mut self.write_buf));
        self.dirty = false;
        Ok(())
    }
}

impl<S: Read + Write + Seek + Truncate> Seek for FilteredStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = if self.dirty {
            self.write_buf.len() as u64
        } else {
            self.decode_all()?.len() as u64
        };
        let new_pos = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => len as i64 + n,
            SeekFrom::Current(n) => self.cursor as i64 + n,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        self.cursor = new_pos as u64;
        Ok(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{build_decoder, build_encoder, code};
    use crate::stream::segmented::SegmentedStream;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn filtered(
        bytes: &[u8],
        len: u64,
    ) -> FilteredStream<Cursor<Vec<u8>>> {
        let stream = Rc::new(RefCell::new(SegmentedStream::new(
            Cursor::new(bytes.to_vec()),
            bytes.len() as u64,
        )));
        let (view, _bounds) = Substream::new(Rc::clone(&stream), 0, len, None);
        FilteredStream::new(
            view,
            build_decoder(code::RLE_DDAVE).unwrap(),
            build_encoder(code::RLE_DDAVE).unwrap(),
            None,
        )
    }

    #[test]
    fn write_then_read_back_round_trips_through_filter() {
        let mut fs = filtered(&[0u8; 64], 64);
        let plain = b"aaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbccccccccdddddddd";
        fs.write_all(plain).unwrap();
        fs.flush().unwrap();

        fs.seek(SeekFrom::Start(0)).unwrap();
        let mut back = vec![0u8; plain.len()];
        fs.read_exact(&mut back).unwrap();
        assert_eq!(back, plain);
    }

    #[test]
    fn grow_callback_runs_once_per_flush() {
        let calls = Rc::new(RefCell::new(0u64));
        let calls2 = Rc::clone(&calls);
        let stream = Rc::new(RefCell::new(SegmentedStream::new(
            Cursor::new(vec![0u8; 4]),
            4,
        )));
        let (view, _bounds) = Substream::new(Rc::clone(&stream), 0, 4, None);
        let mut fs = FilteredStream::new(
            view,
            build_decoder(code::RLE_DDAVE).unwrap(),
            build_encoder(code::RLE_DDAVE).unwrap(),
            Some(Box::new(move |_real, _stored| {
                *calls2.borrow_mut() += 1;
                Ok(())
            })),
        );
        fs.write_all(b"aaaaaaaaaaaaaaaaaaaaaa").unwrap();
        fs.flush().unwrap();
        assert_eq!(*calls.borrow(), 1);
    }
}
