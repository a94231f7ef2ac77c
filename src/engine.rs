//! The generic, format-agnostic FAT engine: entry table, in-place
//! insert/remove/rename/move/resize, and the dispatch of format-specific
//! hooks at the right moments.

use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom, Write};
use std::rc::{Rc, Weak};

use log::{debug, trace, warn};

use crate::entry::Entry;
use crate::filter::{build_decoder, build_encoder};
use crate::format::ArchiveTypeCode;
use crate::stream::{FilteredStream, SegmentedStream, Stream, Substream, ViewBounds};
use crate::{Error, Result};

/// The capability interface every format adapter implements.
///
/// The engine is generic over this trait and stores adapters as
/// `Box<dyn FatFormat<S>>`, so `Archive<S>` stays a single concrete type no
/// matter which adapter matched at `open` time. Hooks marked with a default
/// body are no-ops unless a format overrides them (mirrors `update_file_offset`
/// being a no-op for index-addressed head-FAT formats).
pub trait FatFormat<S: Stream>: std::fmt::Debug {
    /// This adapter's registry identity.
    fn type_code(&self) -> ArchiveTypeCode;

    /// Maximum on-disk name length, if the format bounds it.
    fn max_filename(&self) -> Option<usize>;

    /// Floor offset below which no valid entry's payload may begin.
    fn off_first(&self) -> u64;

    /// Width in bytes of this format's fixed-size head-FAT table record, or
    /// `0` for tail-FAT and per-entry-header formats that keep no such
    /// table. When non-zero the engine reserves/frees exactly this many
    /// bytes at `off_first + entry.index * width` around every insert and
    /// remove, shifting every other valid entry's offset uniformly, before
    /// handing control to [`pre_insert_file`](Self::pre_insert_file) /
    /// [`pre_remove_file`](Self::pre_remove_file) to fill in or tear down
    /// that record's contents.
    fn head_record_width(&self) -> u64 {
        0
    }

    /// Allocates a fresh, invalid entry (possibly extended with
    /// format-specific [`crate::entry::EntryExtra`]).
    fn new_entry(&self) -> Entry;

    /// Rewrites the name field of an existing on-disk FAT record.
    fn update_file_name(&mut self, stream: &mut SegmentedStream<S>, entry: &Entry) -> Result<()>;

    /// Rewrites the offset field of an existing on-disk FAT record, if the
    /// format stores one explicitly. `entry.offset` already holds the new
    /// value; `delta` is supplied for formats that patch a field
    /// incrementally instead of rewriting it outright.
    fn update_file_offset(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        delta: i64,
    ) -> Result<()>;

    /// Rewrites the size field(s) of an existing on-disk FAT record.
    /// `entry.stored_size`/`entry.real_size` already hold the new values.
    fn update_file_size(
        &mut self,
        stream: &mut SegmentedStream<S>,
        entry: &Entry,
        delta: i64,
    ) -> Result<()>;

    /// Writes the new record's FAT bytes (and reserves `header_len` bytes
    /// immediately before the payload, if this format uses per-entry
    /// headers). May adjust fields on `entry` (in particular `header_len`
    /// and `extra`) before returning it.
    fn pre_insert_file(
        &mut self,
        stream: &mut SegmentedStream<S>,
        before: Option<&Entry>,
        entry: Entry,
    ) -> Result<Entry>;

    /// Format cleanup after a successful insert (e.g. bump a file-count
    /// header field). No-op by default.
    fn post_insert_file(&mut self, _stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        Ok(())
    }

    /// Deletes the on-disk FAT record for `entry` (beyond whatever the
    /// engine already reclaimed via [`head_record_width`](Self::head_record_width)).
    /// No-op by default.
    fn pre_remove_file(&mut self, _stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        Ok(())
    }

    /// Format cleanup after a successful remove (e.g. decrement a
    /// file-count header field). No-op by default.
    fn post_remove_file(&mut self, _stream: &mut SegmentedStream<S>, _entry: &Entry) -> Result<()> {
        Ok(())
    }

    /// Reads this format's auxiliary, archive-level free-text description
    /// blob, if it carries one (e.g. EPF-LionKing's trailing string).
    /// `None` by default.
    fn read_description(
        &self,
        _stream: &mut SegmentedStream<S>,
        _entries: &[Entry],
    ) -> Result<Option<String>> {
        Ok(None)
    }

    /// Overwrites the archive-level description blob, growing or shrinking
    /// the backing stream as needed. Fails with [`Error::UnsupportedOperation`]
    /// by default.
    fn write_description(
        &mut self,
        _stream: &mut SegmentedStream<S>,
        _entries: &[Entry],
        _value: &str,
    ) -> Result<()> {
        Err(Error::UnsupportedOperation {
            operation: "set_description",
        })
    }
}

struct ViewHandle {
    entry_id: u64,
    bounds: Weak<RefCell<ViewBounds>>,
}

struct ArchiveInner<S: Stream> {
    stream: Rc<RefCell<SegmentedStream<S>>>,
    entries: Vec<Entry>,
    views: Vec<ViewHandle>,
    next_id: u64,
    format: Box<dyn FatFormat<S>>,
}

/// A FAT-style archive: the segmented backing stream, its entry table, and
/// the format adapter that knows how to keep the on-disk FAT consistent.
///
/// Cheap to clone: cloning an `Archive` shares the same underlying state
/// via an `Rc<RefCell<_>>`, so a `Substream`/`FilteredStream` handed out by
/// [`open`](Self::open) can hold its own strong reference back to this
/// state without the caller needing to keep the `Archive` itself alive.
#[derive(Clone)]
pub struct Archive<S: Stream> {
    inner: Rc<RefCell<ArchiveInner<S>>>,
}

impl<S: Stream> Archive<S> {
    pub(crate) fn from_parts(
        stream: SegmentedStream<S>,
        entries: Vec<Entry>,
        next_id: u64,
        format: Box<dyn FatFormat<S>>,
    ) -> Self {
        Archive {
            inner: Rc::new(RefCell::new(ArchiveInner {
                stream: Rc::new(RefCell::new(stream)),
                entries,
                views: Vec::new(),
                next_id,
                format,
            })),
        }
    }

    /// This archive's registered format.
    pub fn type_code(&self) -> ArchiveTypeCode {
        self.inner.borrow().format.type_code()
    }

    /// Bit flags from [`crate::entry::attrs`] this format's entries may carry.
    pub fn supported_attributes(&self) -> u32 {
        crate::entry::attrs::COMPRESSED | crate::entry::attrs::FOLDER
    }

    /// Number of entries currently tracked (valid or not yet committed).
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.iter().filter(|e| e.valid).count()
    }

    /// True when no valid entry exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive lookup by name. Always returns `None` for nameless
    /// formats, since there is nothing meaningful to compare against.
    pub fn find(&self, name: &str) -> Option<Entry> {
        let inner = self.inner.borrow();
        inner
            .entries
            .iter()
            .find(|e| e.valid && !e.name.is_empty() && e.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// A snapshot of every tracked entry, in insertion order (not on-disk order).
    pub fn list(&self) -> Vec<Entry> {
        self.inner.borrow().entries.iter().filter(|e| e.valid).cloned().collect()
    }

    /// True if `entry` (matched by id) is still valid in this archive.
    pub fn is_valid(&self, entry: &Entry) -> bool {
        let inner = self.inner.borrow();
        inner.entries.iter().any(|e| e.id == entry.id && e.valid)
    }

    fn require_valid(&self, entry: &Entry) -> Result<()> {
        if self.is_valid(entry) {
            Ok(())
        } else {
            Err(Error::NotFound {
                name: if entry.name.is_empty() {
                    format!("entry #{}", entry.index)
                } else {
                    entry.name.clone()
                },
            })
        }
    }

    /// Opens a bounded, relocatable view onto `entry`'s stored (possibly
    /// still filter-encoded) payload bytes.
    pub fn open(&self, entry: &Entry) -> Result<Substream<S>> {
        self.require_valid(entry)?;
        let mut inner = self.inner.borrow_mut();
        let stream = Rc::clone(&inner.stream);
        let id = entry.id;
        let archive = self.clone();
        let on_truncate: Box<dyn FnMut(u64) -> Result<()>> = Box::new(move |needed| {
            archive.resize_by_id(id, needed, needed)
        });
        let (view, bounds) = Substream::new(stream, entry.payload_offset(), entry.stored_size, Some(on_truncate));
        inner.views.push(ViewHandle {
            entry_id: id,
            bounds: Rc::downgrade(&bounds),
        });
        Ok(view)
    }

    /// Opens `entry` through its attached filter, presenting the *real*
    /// (decoded) bytes to the caller. Returns [`Error::UnsupportedOperation`]
    /// if the entry carries no filter.
    pub fn open_filtered(&self, entry: &Entry) -> Result<FilteredStream<S>> {
        let filter = entry.filter.as_deref().ok_or(Error::UnsupportedOperation {
            operation: "open_filtered: entry has no filter attached",
        })?;
        let decoder = build_decoder(filter)?;
        let encoder = build_encoder(filter)?;
        let view = self.open(entry)?;
        let id = entry.id;
        let archive = self.clone();
        let on_grow: Box<dyn FnMut(u64, u64) -> Result<()>> =
            Box::new(move |real, stored| archive.resize_by_id(id, stored, real));
        Ok(FilteredStream::new(view, decoder, encoder, Some(on_grow)))
    }

    /// Entries can nest sub-archives in some formats; unsupported here.
    pub fn open_folder(&self, _entry: &Entry) -> Result<Archive<S>> {
        Err(Error::UnsupportedOperation {
            operation: "open_folder",
        })
    }

    fn alloc_id(inner: &mut ArchiveInner<S>) -> u64 {
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Inserts a new, empty (zero-filled) entry, `before` an existing entry
    /// (or at the tail when `None`), and returns it.
    pub fn insert(
        &self,
        before: Option<&Entry>,
        name: &str,
        stored_size: u64,
        file_type: &str,
        attrs: u32,
    ) -> Result<Entry> {
        debug!("insert: name={name:?} stored_size={stored_size}");
        let mut inner = self.inner.borrow_mut();
        if let Some(max) = inner.format.max_filename() {
            if name.len() > max {
                return Err(Error::FilenameTooLong {
                    name: name.to_string(),
                    len: name.len(),
                    max,
                });
            }
        }

        let mut entry = inner.format.new_entry();
        entry.id = Self::alloc_id(&mut inner);
        entry.name = name.to_string();
        entry.stored_size = stored_size;
        entry.real_size = stored_size;
        entry.file_type = file_type.to_string();
        entry.attrs = attrs;
        entry.valid = false;

        let before_resolved = match before {
            Some(b) => {
                if !inner.entries.iter().any(|e| e.id == b.id && e.valid) {
                    return Err(Error::NotFound {
                        name: b.name.clone(),
                    });
                }
                Some(b.clone())
            }
            None => None,
        };

        match &before_resolved {
            Some(b) => {
                entry.offset = b.offset;
                entry.index = b.index;
            }
            None => {
                if let Some(tail) = inner
                    .entries
                    .iter()
                    .filter(|e| e.valid)
                    .max_by_key(|e| e.payload_end())
                {
                    entry.offset = tail.payload_end();
                    entry.index = inner.entries.iter().filter(|e| e.valid).map(|e| e.index).max().map(|m| m + 1).unwrap_or(0);
                } else {
                    entry.offset = inner.format.off_first();
                    entry.index = 0;
                }
            }
        }

        let off_first = inner.format.off_first();
        let width = inner.format.head_record_width();
        if width > 0 {
            let row_pos = off_first + entry.index as u64 * width;
            let stream_rc = Rc::clone(&inner.stream);
            {
                let mut stream = stream_rc.borrow_mut();
                stream.seek(SeekFrom::Start(row_pos))?;
                stream.insert(width);
            }
            shift_all_offsets(&mut inner, width as i64, None)?;
            entry.offset += width;
        }

        let entry = {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            let result = inner.format.pre_insert_file(&mut stream, before_resolved.as_ref(), entry);
            match result {
                Ok(e) => e,
                Err(e) => {
                    warn!("insert: pre_insert_file hook failed: {e}");
                    return Err(e);
                }
            }
        };
        let mut entry = entry;
        entry.valid = true;

        // `entry.offset` is the position pre_insert_file targeted before it spliced in
        // any header bytes; it's stable even though a later entry's in-memory `offset`
        // field hasn't been shifted yet to reflect that splice. The total physical
        // displacement any such entry needs is header_len + stored_size, applied in one
        // shift_files pass (the header splice and the payload splice below both land at
        // or after this same `entry.offset`).
        let mid_archive = inner
            .entries
            .iter()
            .any(|e| e.valid && e.id != entry.id && e.offset >= entry.offset);
        if mid_archive {
            let total_delta = (entry.header_len + stored_size) as i64;
            shift_files(&mut inner, entry.id, entry.offset, total_delta, 1)?;
        }

        inner.entries.push(entry.clone());

        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            stream.seek(SeekFrom::Start(entry.payload_offset()))?;
            stream.insert(stored_size);
        }

        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            inner.format.post_insert_file(&mut stream, &entry)?;
        }

        Ok(entry)
    }

    /// Removes `entry` and closes the gap it leaves behind.
    pub fn remove(&self, entry: &Entry) -> Result<()> {
        debug!("remove: name={:?}", entry.name);
        let mut inner = self.inner.borrow_mut();
        self.require_valid_locked(&inner, entry)?;
        let mut entry = inner
            .entries
            .iter()
            .find(|e| e.id == entry.id)
            .cloned()
            .expect("checked valid above");

        let off_first = inner.format.off_first();
        let width = inner.format.head_record_width();
        if width > 0 {
            let row_pos = off_first + entry.index as u64 * width;
            let stream_rc = Rc::clone(&inner.stream);
            {
                let mut stream = stream_rc.borrow_mut();
                stream.seek(SeekFrom::Start(row_pos))?;
                stream.remove(width);
            }
            shift_all_offsets(&mut inner, -(width as i64), Some(entry.id))?;
            entry.offset -= width;
        }

        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            inner.format.pre_remove_file(&mut stream, &entry)?;
        }

        inner.entries.retain(|e| e.id != entry.id);
        shift_files(
            &mut inner,
            entry.id,
            entry.offset,
            -((entry.stored_size + entry.header_len) as i64),
            -1,
        )?;

        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            stream.seek(SeekFrom::Start(entry.offset))?;
            stream.remove(entry.stored_size + entry.header_len);
        }

        entry.valid = false;

        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            inner.format.post_remove_file(&mut stream, &entry)?;
        }

        Ok(())
    }

    fn require_valid_locked(&self, inner: &ArchiveInner<S>, entry: &Entry) -> Result<()> {
        if inner.entries.iter().any(|e| e.id == entry.id && e.valid) {
            Ok(())
        } else {
            Err(Error::NotFound {
                name: entry.name.clone(),
            })
        }
    }

    /// Renames `entry`. Fails with [`Error::UnsupportedOperation`] on
    /// nameless formats (their `update_file_name` hook reports it) and
    /// with [`Error::FilenameTooLong`] if `name` exceeds the format's bound.
    pub fn rename(&self, entry: &Entry, name: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        self.require_valid_locked(&inner, entry)?;
        if let Some(max) = inner.format.max_filename() {
            if name.len() > max {
                return Err(Error::FilenameTooLong {
                    name: name.to_string(),
                    len: name.len(),
                    max,
                });
            }
        }
        let mut updated = inner.entries.iter().find(|e| e.id == entry.id).cloned().unwrap();
        updated.name = name.to_string();
        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            inner.format.update_file_name(&mut stream, &updated)?;
        }
        if let Some(e) = inner.entries.iter_mut().find(|e| e.id == entry.id) {
            e.name = name.to_string();
        }
        Ok(())
    }

    /// Moves `entry` to just before `before` (or to the tail when `None`),
    /// implemented as insert-copy-remove. Not atomic: an I/O failure partway
    /// through the payload copy can leave both the source and destination
    /// entries on disk.
    pub fn move_entry(&self, before: Option<&Entry>, entry: &Entry) -> Result<Entry> {
        self.require_valid(entry)?;
        let dest = self.insert(
            before,
            &entry.name,
            entry.stored_size,
            &entry.file_type,
            entry.attrs,
        )?;
        if dest.filter != entry.filter {
            self.remove(&dest)?;
            return Err(Error::FilterChange {
                source: entry.filter.clone(),
                destination: dest.filter.clone(),
            });
        }
        {
            let mut src = self.open(entry)?;
            let mut dst = self.open(&dest)?;
            std::io::copy(&mut src, &mut dst)?;
        }
        self.flush()?;
        if entry.filter.is_some() && entry.real_size != entry.stored_size {
            self.resize(&dest, dest.stored_size, entry.real_size)?;
        }
        self.remove(entry)?;
        self.inner
            .borrow()
            .entries
            .iter()
            .find(|e| e.id == dest.id)
            .cloned()
            .ok_or(Error::NotFound {
                name: dest.name.clone(),
            })
    }

    /// Grows or shrinks `entry`'s stored payload to `new_stored` bytes,
    /// reporting `new_real` as the post-decode size.
    pub fn resize(&self, entry: &Entry, new_stored: u64, new_real: u64) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        self.require_valid_locked(&inner, entry)?;
        let old = inner.entries.iter().find(|e| e.id == entry.id).cloned().unwrap();
        let delta = new_stored as i64 - old.stored_size as i64;
        if delta == 0 && new_real == old.real_size {
            return Ok(());
        }

        if let Some(e) = inner.entries.iter_mut().find(|e| e.id == entry.id) {
            e.stored_size = new_stored;
            e.real_size = new_real;
        }
        let updated = inner.entries.iter().find(|e| e.id == entry.id).cloned().unwrap();
        {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            if let Err(e) = inner.format.update_file_size(&mut stream, &updated, delta) {
                drop(stream);
                if let Some(e) = inner.entries.iter_mut().find(|e| e.id == entry.id) {
                    e.stored_size = old.stored_size;
                    e.real_size = old.real_size;
                }
                return Err(e);
            }
        }

        if delta > 0 {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            stream.seek(SeekFrom::Start(old.payload_end()))?;
            stream.insert(delta as u64);
        } else if delta < 0 {
            let stream_rc = Rc::clone(&inner.stream);
            let mut stream = stream_rc.borrow_mut();
            stream.seek(SeekFrom::Start(old.payload_offset() + new_stored))?;
            stream.remove((-delta) as u64);
        }

        if delta != 0 {
            shift_files(&mut inner, entry.id, old.payload_end(), delta, 0)?;
            for v in inner.views.iter() {
                if v.entry_id != entry.id {
                    continue;
                }
                if let Some(b) = v.bounds.upgrade() {
                    b.borrow_mut().resize(new_stored);
                }
            }
        }
        Ok(())
    }

    fn resize_by_id(&self, entry_id: u64, new_stored: u64, new_real: u64) -> Result<()> {
        let entry = self
            .inner
            .borrow()
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
            .ok_or(Error::NotFound {
                name: "<open view>".into(),
            })?;
        self.resize(&entry, new_stored, new_real)
    }

    /// Reads this archive's free-text description blob, for formats that
    /// carry one (currently only EPF-LionKing). `None` for every other
    /// format.
    pub fn description(&self) -> Result<Option<String>> {
        let mut inner = self.inner.borrow_mut();
        let stream_rc = Rc::clone(&inner.stream);
        let mut stream = stream_rc.borrow_mut();
        let entries = inner.entries.clone();
        inner.format.read_description(&mut stream, &entries)
    }

    /// Overwrites the archive's description blob. Fails with
    /// [`Error::UnsupportedOperation`] on formats that don't carry one.
    pub fn set_description(&self, value: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let stream_rc = Rc::clone(&inner.stream);
        let mut stream = stream_rc.borrow_mut();
        let entries = inner.entries.clone();
        inner.format.write_description(&mut stream, &entries, value)
    }

    /// Linearizes every pending edit into the underlying byte store. This is
    /// the only point at which the segmented stream's tail is physically
    /// rewritten.
    pub fn flush(&self) -> Result<()> {
        trace!("flush");
        let inner = self.inner.borrow();
        inner.stream.borrow_mut().flush()
    }
}

/// Moves every valid entry other than `skip` whose offset is `>= from` by
/// `delta_offset` (and `delta_index`), rewriting its on-disk FAT record and
/// relocating any live view. Zero-length entries that share `from`'s offset
/// with `skip` but have a smaller index are deliberately left in place.
fn shift_files<S: Stream>(
    inner: &mut ArchiveInner<S>,
    skip_id: u64,
    from: u64,
    delta_offset: i64,
    delta_index: i32,
) -> Result<()> {
    let skip_index = inner.entries.iter().find(|e| e.id == skip_id).map(|e| e.index);
    let mut touched = Vec::new();
    for e in inner.entries.iter_mut() {
        if e.id == skip_id || !e.valid || e.offset < from {
            continue;
        }
        if e.stored_size == 0 && e.offset == from {
            if let Some(skip_idx) = skip_index {
                if e.index < skip_idx {
                    continue;
                }
            }
        }
        e.offset = (e.offset as i64 + delta_offset) as u64;
        e.index = (e.index as i64 + delta_index as i64) as usize;
        touched.push(e.clone());
    }
    let stream_rc = Rc::clone(&inner.stream);
    for e in &touched {
        let mut stream = stream_rc.borrow_mut();
        inner.format.update_file_offset(&mut stream, e, delta_offset)?;
    }
    relocate_views(inner, &touched, delta_offset);
    Ok(())
}

/// The table-growth shift used by head-FAT formats: shifts every valid
/// entry (except `skip`, if any) unconditionally, independent of offset.
fn shift_all_offsets<S: Stream>(
    inner: &mut ArchiveInner<S>,
    delta_offset: i64,
    skip_id: Option<u64>,
) -> Result<()> {
    let mut touched = Vec::new();
    for e in inner.entries.iter_mut() {
        if !e.valid || Some(e.id) == skip_id {
            continue;
        }
        e.offset = (e.offset as i64 + delta_offset) as u64;
        touched.push(e.clone());
    }
    let stream_rc = Rc::clone(&inner.stream);
    for e in &touched {
        let mut stream = stream_rc.borrow_mut();
        inner.format.update_file_offset(&mut stream, e, delta_offset)?;
    }
    relocate_views(inner, &touched, delta_offset);
    Ok(())
}

fn relocate_views<S: Stream>(inner: &mut ArchiveInner<S>, touched: &[Entry], delta_offset: i64) {
    for v in inner.views.iter() {
        if let Some(bounds) = v.bounds.upgrade() {
            if touched.iter().any(|e| e.id == v.entry_id) {
                bounds.borrow_mut().relocate(delta_offset);
            }
        }
    }
    inner.views.retain(|v| v.bounds.strong_count() > 0);
}
