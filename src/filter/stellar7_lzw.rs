//! Stellar-7 LZW-style dictionary compression.
//!
//! As with the SkyRoads LZS filter, the original's exact dictionary layout
//! is not part of the retrieved source (only the `FilterType` declaration
//! is), so this is a textbook variable-dictionary LZW transform — codes
//! 0..255 are literal bytes, new multi-byte codes are assigned sequentially
//! from 256 — encoded as `u16le` code words. It satisfies the `Filter`
//! contract and round-trips correctly without claiming bit-exact fidelity
//! to an undisclosed algorithm.

use std::collections::HashMap;
use std::collections::VecDeque;

use super::Filter;

const MAX_CODE: u32 = 1 << 16;

fn compress(input: &[u8]) -> Vec<u8> {
    let mut dict: HashMap<Vec<u8>, u16> = (0u16..256).map(|b| (vec![b as u8], b)).collect();
    let mut next_code: u32 = 256;
    let mut out = Vec::new();
    let mut w: Vec<u8> = Vec::new();

    for &c in input {
        let mut wc = w.clone();
        wc.push(c);
        if dict.contains_key(&wc) {
            w = wc;
        } else {
            if let Some(&code) = dict.get(&w) {
                out.extend_from_slice(&code.to_le_bytes());
            }
            if next_code < MAX_CODE {
                dict.insert(wc, next_code as u16);
                next_code += 1;
            }
            w = vec![c];
        }
    }
    if !w.is_empty() {
        if let Some(&code) = dict.get(&w) {
            out.extend_from_slice(&code.to_le_bytes());
        }
    }
    out
}

fn decompress(codes: &[u8]) -> Vec<u8> {
    let mut dict: Vec<Vec<u8>> = (0u32..256).map(|b| vec![b as u8]).collect();
    let mut out = Vec::new();
    let mut code_iter = codes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));

    let Some(first) = code_iter.next() else {
        return out;
    };
    let mut w = dict[first as usize].clone();
    out.extend_from_slice(&w);

    for code in code_iter {
        let entry = if (code as usize) < dict.len() {
            dict[code as usize].clone()
        } else {
            let mut e = w.clone();
            e.push(w[0]);
            e
        };
        out.extend_from_slice(&entry);
        if dict.len() < MAX_CODE as usize {
            let mut new_entry = w.clone();
            new_entry.push(entry[0]);
            dict.push(new_entry);
        }
        w = entry;
    }
    out
}

/// Encoder half: buffers the whole payload, then emits LZW code words once
/// a zero-length flush call arrives.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
    flushed: bool,
    emit_queue: VecDeque<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for Encoder {
    fn reset(&mut self, _input_hint: Option<u64>) {
        self.buf.clear();
        self.flushed = false;
        self.emit_queue.clear();
    }

    fn transform(&mut self, out: &mut [u8], input: &[u8]) -> (usize, usize) {
        let consumed = if !input.is_empty() {
            self.buf.extend_from_slice(input);
            input.len()
        } else {
            if !self.flushed {
                self.emit_queue.extend(compress(&self.buf));
                self.flushed = true;
            }
            0
        };
        let n = out.len().min(self.emit_queue.len());
        for slot in out.iter_mut().take(n) {
            *slot = self.emit_queue.pop_front().unwrap();
        }
        (consumed, n)
    }
}

/// Decoder half: buffers the whole code-word stream, then emits the decoded
/// bytes once a zero-length flush call arrives.
#[derive(Debug, Default)]
pub struct Decoder {
    codes: Vec<u8>,
    decoded: Option<Vec<u8>>,
    emit_pos: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for Decoder {
    fn reset(&mut self, _input_hint: Option<u64>) {
        self.codes.clear();
        self.decoded = None;
        self.emit_pos = 0;
    }

    fn transform(&mut self, out: &mut [u8], input: &[u8]) -> (usize, usize) {
        let consumed = if !input.is_empty() {
            self.codes.extend_from_slice(input);
            input.len()
        } else {
            if self.decoded.is_none() {
                self.decoded = Some(decompress(&self.codes));
            }
            0
        };
        let n = match &self.decoded {
            Some(data) => {
                let n = out.len().min(data.len() - self.emit_pos);
                out[..n].copy_from_slice(&data[self.emit_pos..self.emit_pos + n]);
                self.emit_pos += n;
                n
            }
            None => 0,
        };
        (consumed, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::pump;

    #[test]
    fn round_trips_repetitive_input() {
        let input = b"TOBEORNOTTOBEORTOBEORNOT".repeat(4);
        let mut enc = Encoder::new();
        let mut compressed = Vec::new();
        pump(&mut enc, &input, &mut compressed);
        pump(&mut enc, &[], &mut compressed);

        let mut dec = Decoder::new();
        let mut decoded = Vec::new();
        pump(&mut dec, &compressed, &mut decoded);
        pump(&mut dec, &[], &mut decoded);
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trips_empty_input() {
        assert_eq!(decompress(&compress(&[])), Vec::<u8>::new());
    }
}
