use bytemuck::Pod;
use std::mem::size_of;

use crate::error::{DecoderError, DecoderResult};

pub fn assert(statement: bool, err: DecoderError) -> DecoderResult {
    if !statement {
        Err(err)
    } else {
        Ok(())
    }
}

pub fn check_len(data: &[u8], expected: usize) -> DecoderResult {
    assert(
        data.len() >= expected,
        DecoderError::TruncatedBuffer {
            expected,
            actual: data.len(),
        },
    )
}

/// Copies a `T` out of the front of `data`. The copy means no borrow of the
/// account buffer outlives the decode call, and the buffer needs no alignment.
pub fn read_pod<T: Pod>(data: &[u8]) -> DecoderResult<T> {
    let len = size_of::<T>();
    check_len(data, len)?;
    Ok(bytemuck::pod_read_unaligned(&data[..len]))
}

/// The first 8 bytes of every account identify its kind.
pub fn read_discriminant(data: &[u8]) -> DecoderResult<u64> {
    read_pod::<u64>(data)
}

/// Stored `u128` values are kept as two little-endian words so the layout
/// structs stay free of alignment padding.
pub fn u128_from_words(words: [u64; 2]) -> u128 {
    (words[1] as u128) << 64 | words[0] as u128
}

pub fn u128_to_words(value: u128) -> [u64; 2] {
    [value as u64, (value >> 64) as u64]
}
