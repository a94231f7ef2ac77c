//! The generic, format-agnostic entry record the FAT engine operates on.

/// Bit flags describing an entry, independent of any one format's on-disk
/// encoding of them.
pub mod attrs {
    /// The payload is stored through a filter (compressed and/or encrypted).
    pub const COMPRESSED: u32 = 1 << 0;
    /// The entry is itself a folder / sub-archive rather than a plain file.
    pub const FOLDER: u32 = 1 << 1;
}

/// Format-specific fields some adapters attach to an [`Entry`] beyond the
/// fields the generic engine reads.
///
/// The engine never inspects this value; it exists purely so that an
/// adapter's hooks can stash the extra state their on-disk layout needs
/// (see `DESIGN.md` for which adapters use which variant).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum EntryExtra {
    /// No format-specific data (the common case).
    #[default]
    None,
    /// DAT-Hugo: index into a second, parallel on-disk FAT region that
    /// stores the payload's actual file number, distinct from `index`.
    HugoFile(i32),
    /// POD-TV: a fixed-width free-text comment stored alongside the FAT
    /// record, exposed to callers that care about it but not read by the
    /// generic engine.
    PodComment(String),
}

/// One record in an archive's File Allocation Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable identity, assigned once at creation and never reused.
    ///
    /// Used to key the archive's open-view table; unlike `index`, it never
    /// changes as entries are shifted, inserted, or removed around this one.
    pub id: u64,
    /// 0-based position in the on-disk FAT, contiguous across valid entries.
    pub index: usize,
    /// Absolute byte offset of the entry's header within the archive.
    pub offset: u64,
    /// Bytes of per-file header immediately preceding the payload. Zero for
    /// formats whose FAT lives in a separate region.
    pub header_len: u64,
    /// Payload bytes as stored in the archive (post-filter).
    pub stored_size: u64,
    /// Payload bytes after filter decode; equals `stored_size` when no
    /// filter is attached.
    pub real_size: u64,
    /// Logical name; empty for nameless formats.
    pub name: String,
    /// Format-defined type tag (e.g. a DOS-style three-letter extension
    /// code), opaque to the engine.
    pub file_type: String,
    /// Bit flags from the [`attrs`] module.
    pub attrs: u32,
    /// Identifier of the filter applied to this entry's payload, if any.
    pub filter: Option<String>,
    /// `false` between allocation and commit inside `insert`, and after
    /// `remove`; entries in this state are skipped by shift passes.
    pub valid: bool,
    /// Format-specific extension data; see [`EntryExtra`].
    pub extra: EntryExtra,
}

impl Entry {
    /// True if `attrs` has the `COMPRESSED` bit set.
    pub fn is_compressed(&self) -> bool {
        self.attrs & attrs::COMPRESSED != 0
    }

    /// True if `attrs` has the `FOLDER` bit set.
    pub fn is_folder(&self) -> bool {
        self.attrs & attrs::FOLDER != 0
    }

    /// Absolute offset of the first payload byte (past the per-file header).
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_len
    }

    /// Absolute offset one past the entry's last payload byte.
    pub fn payload_end(&self) -> u64 {
        self.payload_offset() + self.stored_size
    }
}
