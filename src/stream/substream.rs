//! Bounded, relocatable views into a [`SegmentedStream`].

use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use super::segmented::{SegmentedStream, Truncate};
use crate::Result;

/// The mutable state of one open view: its window into the parent stream.
///
/// Shared via `Rc<RefCell<_>>` between the [`Substream`] the caller holds
/// and the `Weak` reference the owning archive keeps in its open-view
/// table, so the archive can call [`ViewBounds::relocate`]/`resize` without
/// the caller's cooperation.
#[derive(Debug, Clone, Copy)]
pub struct ViewBounds {
    /// Absolute offset of byte 0 of this view within the parent stream.
    pub base: u64,
    /// Length of the view's window.
    pub len: u64,
}

impl ViewBounds {
    /// Slides `base` by `delta` (positive or negative) without otherwise
    /// disturbing the view. Called by the FAT engine during `shift_files`.
    pub fn relocate(&mut self, delta: i64) {
        self.base = (self.base as i64 + delta) as u64;
    }

    /// Announces a new window length. Does not itself insert or remove
    /// bytes in the parent stream — the caller (engine) is responsible for
    /// having already done so.
    pub fn resize(&mut self, new_len: u64) {
        self.len = new_len;
    }
}

/// A bounded window into a [`SegmentedStream`], relocatable and resizable
/// while live.
///
/// Writes that would extend past the current window invoke the
/// `on_truncate` callback supplied at construction, giving the owner (the
/// FAT engine) a chance to grow the backing entry and widen `bounds`
/// before the write proceeds.
pub struct Substream<S: Read + Write + Seek + Truncate> {
    stream: Rc<RefCell<SegmentedStream<S>>>,
    bounds: Rc<RefCell<ViewBounds>>,
    cursor: u64,
    on_truncate: Option<Box<dyn FnMut(u64) -> Result<()>>>,
}

impl<S: Read + Write + Seek + Truncate> Substream<S> {
    /// Builds a new view with its own shared bounds handle.
    ///
    /// Returns the `Substream` together with the `Rc<RefCell<ViewBounds>>`
    /// so the caller (the FAT engine) can retain a `Weak` reference to it
    /// for later relocation/resize.
    pub fn new(
        stream: Rc<RefCell<SegmentedStream<S>>>,
        base: u64,
        len: u64,
        on_truncate: Option<Box<dyn FnMut(u64) -> Result<()>>>,
    ) -> (Self, Rc<RefCell<ViewBounds>>) {
        let bounds = Rc::new(RefCell::new(ViewBounds { base, len }));
        let view = Substream {
            stream,
            bounds: Rc::clone(&bounds),
            cursor: 0,
            on_truncate,
        };
        (view, bounds)
    }

    /// Current window bounds.
    pub fn bounds(&self) -> ViewBounds {
        *self.bounds.borrow()
    }

    /// Length of the view's current window.
    pub fn len(&self) -> u64 {
        self.bounds.borrow().len
    }

    /// True when the view's window is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Read + Write + Seek + Truncate> Read for Substream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bounds = *self.bounds.borrow();
        let remaining = bounds.len.saturating_sub(self.cursor);
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let mut stream = self.stream.borrow_mut();
        stream.seek(SeekFrom::Start(bounds.base + self.cursor))?;
        let n = stream.read(&mut buf[..want])?;
        self.cursor += n as u64;
        Ok(n)
    }
}

impl<S: Read + Write + Seek + Truncate> Write for Substream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bounds = *self.bounds.borrow();
        let needed = self.cursor + buf.len() as u64;
        if needed > bounds.len {
            if let Some(cb) = self.on_truncate.as_mut() {
                cb(needed).map_err(io::Error::other)?;
                bounds = *self.bounds.borrow();
            }
        }
        let remaining = bounds.len.saturating_sub(self.cursor);
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let mut stream = self.stream.borrow_mut();
        stream.seek(SeekFrom::Start(bounds.base + self.cursor))?;
        let n = stream.write(&buf[..want])?;
        self.cursor += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.borrow_mut().flush().map_err(io::Error::other)
    }
}

impl<S: Read + Write + Seek + Truncate> Seek for Substream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.len();
        let new_pos = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => len as i64 + n,
            SeekFrom::Current(n) => self.cursor as i64 + n,
        };
        if new_pos < 0 || new_pos as u64 > len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek out of view bounds",
            ));
        }
        self.cursor = new_pos as u64;
        Ok(self.cursor)
    }
}
