//! Error types for FAT-style game archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when working with archives through this crate, along with
//! a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. You can
//! handle errors using pattern matching or the `?` operator:
//!
//! ```rust,no_run
//! use fatgamearch::Result;
//! use fatgamearch::format::{ArchiveTypeCode, open_by_code};
//! use std::io::Cursor;
//!
//! fn open_it(bytes: Vec<u8>) -> Result<()> {
//!     let archive = open_by_code(ArchiveTypeCode::ResStellar7, Cursor::new(bytes))?;
//!     let _ = archive;
//!     Ok(())
//! }
//! ```
//!
//! ## Exhaustive Error Matching
//!
//! ```rust,no_run
//! use fatgamearch::Error;
//!
//! fn describe(err: &Error) -> &'static str {
//!     match err {
//!         Error::Io(_) => "underlying stream failed",
//!         Error::FilenameTooLong { .. } => "name exceeds format limit",
//!         Error::NotFound { .. } => "no such entry",
//!         _ => "other archive error",
//!     }
//! }
//! ```

use std::io;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors that can occur while parsing, reading, or editing an archive.
///
/// Every mutating FAT engine operation (`insert`, `remove`, `rename`,
/// `move_entry`, `resize`) guarantees that if it fails before any hook has
/// touched the in-memory entry vector, the archive is left byte-identical to
/// how it was before the call. See each operation's documentation for the
/// exact point past which this guarantee no longer holds.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying byte stream (file, cursor, network source) failed.
    ///
    /// This wraps [`std::io::Error`] and is returned whenever a read, write,
    /// or seek against the segmented stream's underlying store fails.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive is shorter than the format requires.
    ///
    /// Returned while parsing a header or FAT record that needs more bytes
    /// than remain in the underlying stream.
    #[error("archive truncated: expected at least {expected} bytes, found {found}")]
    Truncated {
        /// Bytes the format's header/FAT required.
        expected: u64,
        /// Bytes actually present.
        found: u64,
    },

    /// A header or FAT field holds a value that cannot be valid given the
    /// archive's actual size (e.g. an offset or count pointing past EOF).
    #[error("corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// Byte offset where the bad value was read.
        offset: u64,
        /// Description of what was expected.
        reason: String,
    },

    /// A name supplied to `insert` or `rename` exceeds the format's
    /// `max_filename` bound.
    ///
    /// The archive is guaranteed unchanged when this is returned — the
    /// length check runs before any hook is invoked.
    #[error("name {name:?} is {len} bytes, exceeds the format's limit of {max}")]
    FilenameTooLong {
        /// The rejected name.
        name: String,
        /// Its length in bytes.
        len: usize,
        /// The format's maximum.
        max: usize,
    },

    /// The archive format does not support the requested operation.
    ///
    /// Typical cases: `rename` on a nameless format, `open_folder` on a
    /// format with no sub-archive entries.
    #[error("operation not supported by this format: {operation}")]
    UnsupportedOperation {
        /// Name of the unsupported operation.
        operation: &'static str,
    },

    /// The format forbids two entries sharing the same name and a conflict
    /// was detected during `insert` or `rename`.
    #[error("an entry named {name:?} already exists")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// `move_entry` would have to cross a filter boundary (the destination
    /// entry was created with a different `filter` string than the source),
    /// which this crate refuses rather than silently re-encoding.
    ///
    /// When this is returned, the newly inserted destination entry has
    /// already been rolled back, leaving the archive as it was before the
    /// call.
    #[error(
        "cannot move entry: source filter {source:?} differs from destination filter {destination:?}"
    )]
    FilterChange {
        /// The source entry's filter identifier, if any.
        source: Option<String>,
        /// The filter identifier the destination would have had.
        destination: Option<String>,
    },

    /// No entry matched the lookup.
    #[error("entry not found: {name}")]
    NotFound {
        /// The name or description that was looked up.
        name: String,
    },

    /// None of the registered format adapters recognized the input, or more
    /// than one claimed it with no single best match.
    #[error("could not determine archive type: {reason}")]
    UnrecognizedFormat {
        /// Explanation (no match vs. ambiguous match).
        reason: String,
    },
}
