//! Extract only specific entries from a FAT archive.
//!
//! This demonstrates selective extraction using different filtering
//! strategies against the generic [`Entry`] listing, independent of which
//! on-disk format the archive happens to be.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example extract_selective -- archive.res ./output
//! ```

use std::env;
use std::fs::{self, File};
use std::io::{Read as _, Write as _};
use std::path::Path;

use fatgamearch::entry::Entry;
use fatgamearch::{format, Result};

fn extract_matching(
    archive: &fatgamearch::Archive<File>,
    entries: &[Entry],
    selector: impl Fn(&Entry) -> bool,
    out_dir: &Path,
) -> Result<usize> {
    fs::create_dir_all(out_dir)?;
    let mut count = 0;
    for entry in entries.iter().filter(|e| selector(e)) {
        let mut payload = Vec::new();
        archive.open_filtered(entry)?.read_to_end(&mut payload)?;
        let name = if entry.name.is_empty() {
            format!("entry_{}", entry.index)
        } else {
            entry.name.clone()
        };
        File::create(out_dir.join(name))?.write_all(&payload)?;
        count += 1;
    }
    Ok(count)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <archive> <output_dir>", args[0]);
        std::process::exit(1);
    }

    let archive_path = &args[1];
    let output_dir = Path::new(&args[2]);

    println!("Opening archive: {archive_path}");
    let archive = format::open(File::open(archive_path)?)?;
    let entries = archive.list();

    println!("Archive contains {} entries:", entries.len());
    for entry in &entries {
        let kind = if entry.is_folder() { "DIR " } else { "FILE" };
        println!("  [{kind}] {} ({} bytes)", entry.name, entry.real_size);
    }
    println!();

    println!("Extracting compressed entries...");
    let compressed_dir = output_dir.join("compressed");
    let n = extract_matching(&archive, &entries, |e| e.is_compressed(), &compressed_dir)?;
    println!("  Extracted {n} compressed entries to {}", compressed_dir.display());
    println!();

    println!("Extracting entries larger than 100 bytes...");
    let large_dir = output_dir.join("large");
    let n = extract_matching(&archive, &entries, |e| e.real_size > 100, &large_dir)?;
    println!("  Extracted {n} large entries to {}", large_dir.display());
    println!();

    println!("Extracting all non-folder entries...");
    let all_dir = output_dir.join("all");
    let n = extract_matching(&archive, &entries, |e| !e.is_folder(), &all_dir)?;
    println!("  Extracted {n} entries to {}", all_dir.display());

    println!();
    println!("Selective extraction complete!");

    Ok(())
}
