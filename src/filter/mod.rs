//! Streaming byte-transform filters applied to individual entries' payloads.
//!
//! Every filter implements [`Filter`]: a resumable, partial-buffer
//! transform driven by a [`crate::stream::FilteredStream`] during read and
//! write. Filters are looked up by a short string code (mirroring how the
//! FAT engine's format adapters name them in an entry's `filter` field) via
//! [`build_decoder`] and [`build_encoder`].

mod ddave_rle;
mod glb_raptor;
mod skyroads_lzs;
mod stellar7_lzw;

use crate::{Error, Result};

/// Filter identifier strings, as they appear in [`crate::Entry::filter`].
pub mod code {
    /// Dangerous Dave run-length encoding.
    pub const RLE_DDAVE: &str = "rle-ddave";
    /// Raptor GLB stream cipher, reset every 28 bytes (used on FAT regions).
    pub const GLB_RAPTOR_FAT: &str = "glb-raptor-fat";
    /// Raptor GLB stream cipher, no periodic reset (used on file bodies).
    pub const GLB_RAPTOR: &str = "glb-raptor";
    /// SkyRoads LZS-style dictionary compression.
    pub const LZS_SKYROADS: &str = "lzs-skyroads";
    /// Stellar-7 LZW-style dictionary compression.
    pub const LZW_STELLAR7: &str = "lzw-stellar7";
}

/// A resumable byte-level transform.
///
/// `transform` must consume up to `input.len()` bytes and produce up to
/// `out.len()` bytes, returning `(consumed, produced)`. It must make
/// progress whenever either side has room and the filter holds state that
/// could advance; it must also tolerate being called with an empty `input`
/// slice, which signals "flush what you're holding" (used when draining a
/// [`crate::stream::FilteredStream`] on `flush`/EOF).
pub trait Filter: std::fmt::Debug {
    /// Clears all internal state. `input_hint`, when given, is the total
    /// number of input bytes the caller expects to feed — used by
    /// dictionary-style filters that parse a size header up front.
    fn reset(&mut self, input_hint: Option<u64>);

    /// Runs one step of the transform. See the trait docs for the contract.
    fn transform(&mut self, out: &mut [u8], input: &[u8]) -> (usize, usize);
}

/// Repeatedly drives `filter` over `input` until either the input is
/// exhausted or the filter stops making progress, appending every produced
/// byte to `out`. Returns the number of input bytes consumed.
///
/// This is the pump loop every caller of [`Filter::transform`] needs,
/// because a single call is only required to make *some* progress, not to
/// consume everything offered.
pub fn pump(filter: &mut dyn Filter, input: &[u8], out: &mut Vec<u8>) -> usize {
    let mut consumed = 0usize;
    let mut scratch = [0u8; 4096];
    loop {
        let (c, p) = filter.transform(&mut scratch, &input[consumed..]);
        out.extend_from_slice(&scratch[..p]);
        consumed += c;
        if c == 0 && p == 0 {
            break;
        }
        if consumed >= input.len() && p == 0 {
            break;
        }
    }
    consumed
}

/// Builds the decoder half of the named filter.
pub fn build_decoder(code: &str) -> Result<Box<dyn Filter>> {
    match code {
        self::code::RLE_DDAVE => Ok(Box::new(ddave_rle::Decoder::new())),
        self::code::GLB_RAPTOR_FAT => Ok(Box::new(glb_raptor::Cipher::new_decoder(28))),
        self::code::GLB_RAPTOR => Ok(Box::new(glb_raptor::Cipher::new_decoder(0))),
        self::code::LZS_SKYROADS => Ok(Box::new(skyroads_lzs::Decoder::new())),
        self::code::LZW_STELLAR7 => Ok(Box::new(stellar7_lzw::Decoder::new())),
        _ => Err(Error::UnsupportedOperation {
            operation: "unknown filter code (decoder)",
        }),
    }
}

/// Builds the encoder half of the named filter.
pub fn build_encoder(code: &str) -> Result<Box<dyn Filter>> {
    match code {
        self::code::RLE_DDAVE => Ok(Box::new(ddave_rle::Encoder::new())),
        self::code::GLB_RAPTOR_FAT => Ok(Box::new(glb_raptor::Cipher::new_encoder(28))),
        self::code::GLB_RAPTOR => Ok(Box::new(glb_raptor::Cipher::new_encoder(0))),
        self::code::LZS_SKYROADS => Ok(Box::new(skyroads_lzs::Encoder::new())),
        self::code::LZW_STELLAR7 => Ok(Box::new(stellar7_lzw::Encoder::new())),
        _ => Err(Error::UnsupportedOperation {
            operation: "unknown filter code (encoder)",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_filter_code_is_rejected() {
        assert!(build_decoder("not-a-real-filter").is_err());
        assert!(build_encoder("not-a-real-filter").is_err());
    }

    #[test]
    fn every_registered_filter_round_trips_small_input() {
        for c in [
            code::RLE_DDAVE,
            code::GLB_RAPTOR_FAT,
            code::GLB_RAPTOR,
            code::LZS_SKYROADS,
            code::LZW_STELLAR7,
        ] {
            let input = b"the quick brown fox jumps over the lazy dog, the quick brown fox";
            let mut encoder = build_encoder(c).unwrap();
            let mut encoded = Vec::new();
            pump(&mut *encoder, input, &mut encoded);
            pump(&mut *encoder, &[], &mut encoded);

            let mut decoder = build_decoder(c).unwrap();
            let mut decoded = Vec::new();
            pump(&mut *decoder, &encoded, &mut decoded);
            pump(&mut *decoder, &[], &mut decoded);
            assert_eq!(decoded, input, "round-trip failed for filter {c}");
        }
    }
}
