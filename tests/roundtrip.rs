//! Round-trip integration tests for fatgamearch.
//!
//! These exercise whole archives end-to-end: build one backed by a real
//! file, flush it, reopen the file fresh through the public
//! [`format::open`]/[`format::open_by_code`] dispatcher, and check the
//! entry table and payload bytes survive the trip unchanged.

use std::fs::File;
use std::io::{Read, Write};

use fatgamearch::format::{self, ArchiveTypeCode};

fn temp_path(name: &str) -> std::path::PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    // Leak the TempDir so the file outlives this function; the OS temp
    // directory is cleaned up independently of this process.
    std::mem::forget(dir);
    path
}

/// Every registered type round-trips an empty archive: `new_archive`, flush,
/// reopen by sniffing, and the reopened archive is empty and of the same type.
#[test]
fn every_format_round_trips_an_empty_archive() {
    for &code in ArchiveTypeCode::all() {
        let path = temp_path("empty.bin");
        let backing = File::create(&path).unwrap();
        let archive = format::new_archive(code, backing).unwrap();
        archive.flush().unwrap();
        drop(archive);

        let reopened = format::open_by_code(code, File::open(&path).unwrap()).unwrap();
        assert!(reopened.is_empty(), "format {code:?} should reopen empty");
        assert_eq!(reopened.type_code(), code);
    }
}

/// Inserting a handful of entries, flushing, and reopening preserves every
/// entry's name, size, and payload bytes.
#[test]
fn res_stellar7_round_trips_multiple_entries_through_reopen() {
    let path = temp_path("res.bin");
    let payloads: &[(&str, &[u8])] = &[
        ("ONE:", b"This is one.dat"),
        ("TWO:", b"This is two.dat"),
        ("THR:", b"This is three.dat"),
    ];
    {
        let backing = File::create(&path).unwrap();
        let archive = format::new_archive(ArchiveTypeCode::ResStellar7, backing).unwrap();
        for (name, data) in payloads {
            let e = archive.insert(None, name, data.len() as u64, "", 0).unwrap();
            archive.open(&e).unwrap().write_all(data).unwrap();
        }
        archive.flush().unwrap();
    }

    let reopened = format::open(File::open(&path).unwrap()).unwrap();
    assert_eq!(reopened.len(), payloads.len());
    for (name, data) in payloads {
        let entry = reopened.find(name).expect("entry should survive reopen");
        let mut body = Vec::new();
        reopened.open(&entry).unwrap().read_to_end(&mut body).unwrap();
        assert_eq!(&body, data);
    }
}

/// Same as above but for a nameless tail-FAT format, to confirm the
/// round-trip law holds independent of whether names are present.
#[test]
fn dat_sango_round_trips_multiple_entries_through_reopen() {
    let path = temp_path("sango.dat");
    let payloads: &[&[u8]] = &[b"first file", b"second one is longer", b"c"];
    {
        let backing = File::create(&path).unwrap();
        let archive = format::new_archive(ArchiveTypeCode::DatSango, backing).unwrap();
        for data in payloads {
            let e = archive.insert(None, "", data.len() as u64, "", 0).unwrap();
            archive.open(&e).unwrap().write_all(data).unwrap();
        }
        archive.flush().unwrap();
    }

    let reopened = format::open_by_code(ArchiveTypeCode::DatSango, File::open(&path).unwrap()).unwrap();
    assert_eq!(reopened.len(), payloads.len());
    let mut entries = reopened.list();
    entries.sort_by_key(|e| e.index);
    for (entry, expected) in entries.iter().zip(payloads) {
        let mut body = Vec::new();
        reopened.open(entry).unwrap().read_to_end(&mut body).unwrap();
        assert_eq!(&body, expected);
    }
}

/// A head-FAT format (GRP) round-trips its fixed-width name field and file
/// count header correctly across insert -> flush -> reopen.
#[test]
fn grp_duke3d_round_trips_and_header_count_matches() {
    let path = temp_path("duke3d.grp");
    {
        let backing = File::create(&path).unwrap();
        let archive = format::new_archive(ArchiveTypeCode::GrpDuke3d, backing).unwrap();
        archive.insert(None, "TILES", 4, "", 0).unwrap();
        archive.open(&archive.find("TILES").unwrap()).unwrap().write_all(b"ABCD").unwrap();
        archive.insert(None, "PALETTE", 3, "", 0).unwrap();
        archive.open(&archive.find("PALETTE").unwrap()).unwrap().write_all(b"XYZ").unwrap();
        archive.flush().unwrap();
    }

    let reopened = format::open_by_code(ArchiveTypeCode::GrpDuke3d, File::open(&path).unwrap()).unwrap();
    assert_eq!(reopened.len(), 2);
    let tiles = reopened.find("TILES").unwrap();
    let mut body = Vec::new();
    reopened.open(&tiles).unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"ABCD");
}

/// Removing an entry from a head-FAT format shrinks its on-disk table and
/// shifts the surviving entry's table row and payload left correctly;
/// the result reopens with only the surviving entry intact.
#[test]
fn grp_duke3d_remove_then_reopen_keeps_surviving_entry_intact() {
    let path = temp_path("duke3d_remove.grp");
    {
        let backing = File::create(&path).unwrap();
        let archive = format::new_archive(ArchiveTypeCode::GrpDuke3d, backing).unwrap();
        let tiles = archive.insert(None, "TILES", 4, "", 0).unwrap();
        archive.open(&tiles).unwrap().write_all(b"ABCD").unwrap();
        let palette = archive.insert(None, "PALETTE", 3, "", 0).unwrap();
        archive.open(&palette).unwrap().write_all(b"XYZ").unwrap();
        archive.remove(&tiles).unwrap();
        archive.flush().unwrap();
    }

    let reopened = format::open_by_code(ArchiveTypeCode::GrpDuke3d, File::open(&path).unwrap()).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(reopened.find("TILES").is_none());
    let palette = reopened.find("PALETTE").expect("surviving entry should remain");
    let mut body = Vec::new();
    reopened.open(&palette).unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"XYZ");
}

/// An edit sequence and its exact inverse leave the archive byte-identical
/// after flush.
#[test]
fn insert_then_remove_is_byte_identical_to_before() {
    let path = temp_path("identical.res");
    let before = {
        let backing = File::create(&path).unwrap();
        let archive = format::new_archive(ArchiveTypeCode::ResStellar7, backing).unwrap();
        archive.insert(None, "ONE:", 15, "", 0).unwrap();
        archive.open(&archive.find("ONE:").unwrap()).unwrap().write_all(b"This is one.dat").unwrap();
        archive.flush().unwrap();
        std::fs::read(&path).unwrap()
    };

    let after = {
        let backing = File::options().read(true).write(true).open(&path).unwrap();
        let archive = format::open_by_code(ArchiveTypeCode::ResStellar7, backing).unwrap();
        let added = archive.insert(None, "TWO:", 4, "", 0).unwrap();
        archive.open(&added).unwrap().write_all(b"data").unwrap();
        archive.remove(&added).unwrap();
        archive.flush().unwrap();
        std::fs::read(&path).unwrap()
    };

    assert_eq!(before, after);
}
