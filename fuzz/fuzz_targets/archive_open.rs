//! Fuzz target for `format::open` and each registered format's
//! `open_by_code` with arbitrary byte input.
//!
//! This target exercises every adapter's header/FAT parsing with
//! potentially malformed or adversarial input. The goal is to find panics,
//! hangs, or memory issues in the parsing logic, not to assert anything
//! about the result.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::{Cursor, Read};

use fatgamearch::format::{self, ArchiveTypeCode};

fuzz_target!(|data: &[u8]| {
    if let Ok(archive) = format::open(Cursor::new(data.to_vec())) {
        for entry in archive.list() {
            let _ = entry.name.len();
            let _ = entry.stored_size;
            let _ = entry.real_size;
            if let Ok(mut view) = archive.open(&entry) {
                let mut buf = [0u8; 256];
                let _ = view.read(&mut buf);
            }
        }
    }

    for &code in ArchiveTypeCode::all() {
        if let Ok(archive) = format::open_by_code(code, Cursor::new(data.to_vec())) {
            for entry in archive.list() {
                let _ = archive.open(&entry);
            }
        }
    }
});
