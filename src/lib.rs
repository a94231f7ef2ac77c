//! # fatgamearch
//!
//! A pure-Rust read/write library for retro-game "FAT-style" container
//! archives: files that embed a File Allocation Table — a header plus a
//! list of fixed-layout records pointing at packed payloads inside one
//! backing byte stream.
//!
//! The crate is split into a format-agnostic core and a set of per-format
//! adapters that plug into it:
//!
//! - [`stream`] — the segmented backing stream (O(1) amortized
//!   insert/remove, commits on `flush`), bounded relocatable substream
//!   views, and the filtered stream that glues a codec/cipher pair onto one.
//! - [`filter`] — resumable byte-transform filters (RLE, a stream cipher,
//!   two dictionary decoders) driven by a [`stream::FilteredStream`].
//! - [`engine`] — the generic FAT engine: [`engine::Archive`], its
//!   `insert`/`remove`/`rename`/`move_entry`/`resize` operations, and the
//!   [`engine::FatFormat`] hook trait every adapter implements.
//! - [`format`] — the adapters themselves (GRP, EPF, two tail-FAT DAT
//!   variants, RES, POD, a per-entry-header DAT variant, SkyRoads) plus the
//!   type registry and the [`format::open`]/[`format::new_archive`] entry
//!   points.
//!
//! ## Quick start
//!
//! ```
//! use fatgamearch::format::{self, ArchiveTypeCode};
//! use std::io::{Cursor, Write};
//!
//! fn main() -> fatgamearch::Result<()> {
//!     let archive = format::new_archive(ArchiveTypeCode::ResStellar7, Cursor::new(Vec::new()))?;
//!     let entry = archive.insert(None, "ONE:", 5, "", 0)?;
//!     archive.open(&entry)?.write_all(b"hello")?;
//!     archive.flush()?;
//!
//!     assert_eq!(archive.len(), 1);
//!     assert!(archive.find("ONE:").is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Opening an archive of unknown type
//!
//! [`format::open`] sniffs every registered adapter and opens the single
//! best match; [`format::open_by_code`] skips detection when the caller
//! already knows the type.
//!
//! ```
//! use fatgamearch::format;
//! use std::io::Cursor;
//!
//! # fn main() -> fatgamearch::Result<()> {
//! let bytes = vec![0x04, 0x00, 0x00, 0x00]; // an empty DAT-Sango archive
//! let archive = format::open(Cursor::new(bytes))?;
//! assert!(archive.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. See [`Error`] for the full set of
//! failure kinds.
//!
//! ## Concurrency
//!
//! This crate assumes single-threaded, cooperative use: one `Archive`
//! handle (internally an `Rc`-backed, cheaply-cloneable reference) owns its
//! backing stream exclusively for its lifetime. There is no internal
//! locking and no `Send`/`Sync` bound on [`engine::Archive`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod engine;
pub mod entry;
pub mod error;
pub mod filter;
pub mod format;
pub mod stream;

pub use engine::Archive;
pub use entry::{Entry, EntryExtra, attrs};
pub use error::{Error, Result};
