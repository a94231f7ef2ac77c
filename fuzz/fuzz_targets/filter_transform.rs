//! Fuzz target for every registered [`fatgamearch::filter::Filter`] with
//! arbitrary input, split at an arbitrary point to exercise partial-buffer
//! feeding.
//!
//! Looks for panics or hangs in the pump loop, and checks the one
//! assertable invariant that holds for arbitrary input regardless of
//! content: decoding whatever an encoder produced for `data` reproduces
//! `data` exactly.

#![no_main]

use libfuzzer_sys::fuzz_target;

use fatgamearch::filter::{build_decoder, build_encoder, code, pump};

const FILTERS: &[&str] = &[
    code::RLE_DDAVE,
    code::GLB_RAPTOR_FAT,
    code::GLB_RAPTOR,
    code::LZS_SKYROADS,
    code::LZW_STELLAR7,
];

fuzz_target!(|data: &[u8]| {
    let split = if data.is_empty() { 0 } else { data.len() / 2 };
    let (first, second) = data.split_at(split);

    for &filter_code in FILTERS {
        let mut encoder = build_encoder(filter_code).unwrap();
        let mut encoded = Vec::new();
        pump(&mut *encoder, first, &mut encoded);
        pump(&mut *encoder, second, &mut encoded);
        pump(&mut *encoder, &[], &mut encoded);

        let mut decoder = build_decoder(filter_code).unwrap();
        let mut decoded = Vec::new();
        pump(&mut *decoder, &encoded, &mut decoded);
        pump(&mut *decoder, &[], &mut decoded);

        assert_eq!(decoded, data, "filter {filter_code} failed to round-trip fuzzed input");
    }
});
