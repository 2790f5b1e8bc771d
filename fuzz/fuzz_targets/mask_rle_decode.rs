//! Fuzz target for mask run decoding and cropping.
//!
//! The input is read as little-endian u16 values: runs followed by the
//! mask box.

#![no_main]

use framelabel::mask::{crop_mask, is_void};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 || data.len() > 64 * 1024 {
        return;
    }

    let points: Vec<f64> = data
        .chunks_exact(2)
        .map(|pair| f64::from(u16::from_le_bytes([pair[0], pair[1]]) % 512))
        .collect();

    let cropped = crop_mask(&points, 256, 256);
    let _ = is_void(&cropped);
});
