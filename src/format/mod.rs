//! Format adapters and the type registry that dispatches between them.
//!
//! Each adapter module implements [`crate::engine::FatFormat`] plus a
//! `detect`/`open`/`new_archive` trio wired into the tables below. The
//! engine treats every format's on-disk layout as opaque bytes; this module
//! is the only place that knows the full list of registered formats.

mod dat_hugo;
mod dat_mystic;
mod dat_sango;
mod epf_lionking;
mod grp_duke3d;
mod io_util;
mod pod_tv;
mod res_stellar7;
mod roads_skyroads;

use std::io::{Read, Seek, Write};

use crate::engine::Archive;
use crate::stream::{SegmentedStream, Stream, Truncate};
use crate::{Error, Result};

/// Identifies one registered archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ArchiveTypeCode {
    /// Build Engine (Duke Nukem 3D) GRP archives: head-FAT, fixed 16-byte records.
    GrpDuke3d,
    /// The Lion King EPF archives: head-FAT with a trailing description blob.
    EpfLionKing,
    /// A Sango-class tail-FAT archive: leading pointer, absolute offset array, sentinel.
    DatSango,
    /// Stellar 7 RES archives: per-entry inline `name | size | payload` records.
    ResStellar7,
    /// Duke Nukem (1) POD-style archives: fixed-width table rows with a per-file comment.
    PodTv,
    /// A Hugo-class archive with per-entry headers and a parallel file-number FAT region.
    DatHugo,
    /// A Mystic-class tail-FAT archive with batched file-count commits.
    DatMystic,
    /// SkyRoads `.lzs`-adjacent archives: nameless 4-byte-per-entry head FAT.
    RoadsSkyroads,
}

impl ArchiveTypeCode {
    /// Every registered type, in the order `types()` reports them.
    pub fn all() -> &'static [ArchiveTypeCode] {
        use ArchiveTypeCode::*;
        &[
            GrpDuke3d,
            EpfLionKing,
            DatSango,
            ResStellar7,
            PodTv,
            DatHugo,
            DatMystic,
            RoadsSkyroads,
        ]
    }

    /// A short human-friendly name, as `types()` would report it.
    pub fn friendly_name(&self) -> &'static str {
        match self {
            ArchiveTypeCode::GrpDuke3d => "Build Engine GRP",
            ArchiveTypeCode::EpfLionKing => "EPF (The Lion King)",
            ArchiveTypeCode::DatSango => "Sango-class DAT",
            ArchiveTypeCode::ResStellar7 => "Stellar 7 RES",
            ArchiveTypeCode::PodTv => "POD (Terminal Velocity)",
            ArchiveTypeCode::DatHugo => "Hugo-class DAT",
            ArchiveTypeCode::DatMystic => "Mystic-class DAT",
            ArchiveTypeCode::RoadsSkyroads => "SkyRoads roads.lzs",
        }
    }

    /// The conventional file extension(s) for this format, without the dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ArchiveTypeCode::GrpDuke3d => &["grp"],
            ArchiveTypeCode::EpfLionKing => &["epf"],
            ArchiveTypeCode::DatSango => &["dat"],
            ArchiveTypeCode::ResStellar7 => &["res"],
            ArchiveTypeCode::PodTv => &["pod"],
            ArchiveTypeCode::DatHugo => &["dat"],
            ArchiveTypeCode::DatMystic => &["dat"],
            ArchiveTypeCode::RoadsSkyroads => &["lzs"],
        }
    }
}

/// Result of a format's sniff pass over the first bytes of a candidate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// A magic number or other unambiguous marker matched.
    DefinitelyYes,
    /// The input structurally cannot be this format.
    DefinitelyNo,
    /// The format carries no magic number; the input is merely *consistent*
    /// with its layout (used by [`ArchiveTypeCode::ResStellar7`]).
    PossiblyYes,
}

/// Friendly metadata describing one registered format, as returned by [`types`].
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// This format's registry identity.
    pub code: ArchiveTypeCode,
    /// Short human-friendly name.
    pub name: &'static str,
    /// Conventional extension(s), without the leading dot.
    pub extensions: &'static [&'static str],
}

/// Lists every registered format with its friendly metadata.
pub fn types() -> Vec<TypeInfo> {
    ArchiveTypeCode::all()
        .iter()
        .map(|&code| TypeInfo {
            code,
            name: code.friendly_name(),
            extensions: code.extensions(),
        })
        .collect()
}

fn detect<S: Stream>(code: ArchiveTypeCode, stream: &mut SegmentedStream<S>) -> Result<Detection> {
    use ArchiveTypeCode::*;
    match code {
        GrpDuke3d => grp_duke3d::detect(stream),
        EpfLionKing => epf_lionking::detect(stream),
        DatSango => dat_sango::detect(stream),
        ResStellar7 => res_stellar7::detect(stream),
        PodTv => pod_tv::detect(stream),
        DatHugo => dat_hugo::detect(stream),
        DatMystic => dat_mystic::detect(stream),
        RoadsSkyroads => roads_skyroads::detect(stream),
    }
}

fn open_with<S: Stream>(code: ArchiveTypeCode, stream: SegmentedStream<S>) -> Result<Archive<S>> {
    use ArchiveTypeCode::*;
    match code {
        GrpDuke3d => grp_duke3d::open(stream),
        EpfLionKing => epf_lionking::open(stream),
        DatSango => dat_sango::open(stream),
        ResStellar7 => res_stellar7::open(stream),
        PodTv => pod_tv::open(stream),
        DatHugo => dat_hugo::open(stream),
        DatMystic => dat_mystic::open(stream),
        RoadsSkyroads => roads_skyroads::open(stream),
    }
}

/// Opens `backing` under the explicitly named format, skipping detection.
pub fn open_by_code<S: Read + Write + Seek + Truncate>(
    code: ArchiveTypeCode,
    mut backing: S,
) -> Result<Archive<S>> {
    let end = backing.seek(std::io::SeekFrom::End(0))?;
    backing.seek(std::io::SeekFrom::Start(0))?;
    open_with(code, SegmentedStream::new(backing, end))
}

/// Sniffs every registered format against `backing` and opens the single
/// best match. Fails with [`Error::UnrecognizedFormat`] if no format
/// reports `DefinitelyYes`/`PossiblyYes`, or if more than one
/// `DefinitelyYes` match is found.
pub fn open<S: Read + Write + Seek + Truncate>(mut backing: S) -> Result<Archive<S>> {
    let end = backing.seek(std::io::SeekFrom::End(0))?;
    backing.seek(std::io::SeekFrom::Start(0))?;
    let mut stream = SegmentedStream::new(backing, end);

    let mut yes = Vec::new();
    let mut maybe = Vec::new();
    for &code in ArchiveTypeCode::all() {
        match detect(code, &mut stream)? {
            Detection::DefinitelyYes => yes.push(code),
            Detection::PossiblyYes => maybe.push(code),
            Detection::DefinitelyNo => {}
        }
    }

    let chosen = if yes.len() == 1 {
        yes[0]
    } else if yes.is_empty() && maybe.len() == 1 {
        maybe[0]
    } else if yes.is_empty() && maybe.is_empty() {
        return Err(Error::UnrecognizedFormat {
            reason: "no registered format recognized this input".into(),
        });
    } else {
        return Err(Error::UnrecognizedFormat {
            reason: format!(
                "ambiguous match: {} definite, {} possible candidates",
                yes.len(),
                maybe.len()
            ),
        });
    };

    open_with(chosen, stream)
}

/// Writes a fresh, empty archive of the given type into `backing` and opens it.
pub fn new_archive<S: Read + Write + Seek + Truncate>(
    code: ArchiveTypeCode,
    backing: S,
) -> Result<Archive<S>> {
    use ArchiveTypeCode::*;
    match code {
        GrpDuke3d => grp_duke3d::new_archive(backing),
        EpfLionKing => epf_lionking::new_archive(backing),
        DatSango => dat_sango::new_archive(backing),
        ResStellar7 => res_stellar7::new_archive(backing),
        PodTv => pod_tv::new_archive(backing),
        DatHugo => dat_hugo::new_archive(backing),
        DatMystic => dat_mystic::new_archive(backing),
        RoadsSkyroads => roads_skyroads::new_archive(backing),
    }
}
