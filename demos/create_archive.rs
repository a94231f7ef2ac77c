//! Build a fresh Stellar 7 RES archive from files on disk.
//!
//! This demonstrates basic archive authoring:
//! - Creating an empty archive of a chosen format
//! - Inserting entries and writing their payloads
//! - Flushing the backing file to disk
//!
//! # Usage
//!
//! ```bash
//! cargo run --example create_archive -- output.res file1.txt file2.txt
//! ```

use std::env;
use std::fs::File;
use std::io::Write as _;

use fatgamearch::format::{self, ArchiveTypeCode};
use fatgamearch::Result;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output.res> [file1] [file2...]", args[0]);
        eprintln!();
        eprintln!("Creates a RES archive from the specified files.");
        eprintln!("If no files are specified, creates a demo archive with sample data.");
        std::process::exit(1);
    }

    let output_path = &args[1];
    let input_files: Vec<&String> = args[2..].iter().collect();

    println!("Creating archive: {output_path}");
    let backing = File::create(output_path)?;
    let archive = format::new_archive(ArchiveTypeCode::ResStellar7, backing)?;

    if input_files.is_empty() {
        println!("No files specified, creating demo archive...");
        let readme = b"Welcome to fatgamearch!\n\nThis is a demo archive.";
        let entry = archive.insert(None, "README", readme.len() as u64, "", 0)?;
        archive.open(&entry)?.write_all(readme)?;
        println!("  Added: README ({} bytes)", readme.len());

        let data = vec![0u8; 256];
        let entry = archive.insert(None, "DATA", data.len() as u64, "", 0)?;
        archive.open(&entry)?.write_all(&data)?;
        println!("  Added: DATA ({} bytes)", data.len());
    } else {
        for file_path in &input_files {
            let path = std::path::Path::new(file_path);
            if !path.exists() {
                eprintln!("Warning: file not found, skipping: {file_path}");
                continue;
            }
            let bytes = std::fs::read(path)?;
            let stem = path
                .file_stem()
                .and_then(|n| n.to_str())
                .unwrap_or(file_path)
                .to_uppercase();
            let entry = archive.insert(None, &stem, bytes.len() as u64, "", 0)?;
            archive.open(&entry)?.write_all(&bytes)?;
            println!("  Added: {stem} ({} bytes)", bytes.len());
        }
    }

    archive.flush()?;
    println!();
    println!("Archive created successfully with {} entries.", archive.len());

    Ok(())
}
