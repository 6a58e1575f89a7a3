//! Bitstream readers for entropy-coded payloads.
//!
//! Two directions exist in the format:
//!
//! - Forward, LSB-first within each byte: used by the FSE normalized-count
//!   (table description) headers.
//! - Backward: all entropy payload streams (FSE sequence stream, FSE-coded
//!   Huffman weights, Huffman literal streams) are written forward but read
//!   back-to-front. The final byte carries a sentinel "1" bit above the last
//!   meaningful bit; reads proceed from just below the sentinel toward the
//!   first byte.

use stolas_core::{Error, Result};

/// Forward bit reader, LSB-first within bytes.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0 }
    }

    /// Total bits available in the underlying slice.
    pub fn total_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Bits not yet consumed.
    pub fn remaining_bits(&self) -> usize {
        self.total_bits().saturating_sub(self.bit_pos)
    }

    /// Bytes consumed so far, rounding a partial byte up.
    pub fn bytes_consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }

    /// Look at the next `count` bits without consuming them.
    /// Bits past the end of the slice read as zero.
    pub fn peek_bits(&self, count: usize) -> u64 {
        debug_assert!(count <= 57);
        let mut value = 0u64;
        for k in 0..count {
            let idx = self.bit_pos + k;
            if idx >= self.total_bits() {
                break;
            }
            let bit = (self.data[idx / 8] >> (idx % 8)) & 1;
            value |= (bit as u64) << k;
        }
        value
    }

    /// Advance the cursor by `count` bits. May move past the end; callers
    /// validate the final position via `bytes_consumed`.
    pub fn consume(&mut self, count: usize) {
        self.bit_pos += count;
    }

    /// Read `count` bits, erroring if the slice is exhausted.
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if self.bit_pos + count > self.total_bits() {
            return Err(Error::unexpected_eof(self.bytes_consumed()));
        }
        let value = self.peek_bits(count);
        self.bit_pos += count;
        Ok(value)
    }
}

/// Backward bit reader over a sentinel-terminated payload.
///
/// `bits_remaining` may go negative: reads past the stream start yield zero
/// bits, mirroring the zero-filled container of the reference reader. Callers
/// that must not over-read check `bits_remaining` (or `is_exhausted`) after
/// the fact; a negative value is the corruption signal.
#[derive(Debug)]
pub struct ReverseBitReader<'a> {
    data: &'a [u8],
    bits_remaining: isize,
}

impl<'a> ReverseBitReader<'a> {
    /// Locate the sentinel bit in the last byte and position the cursor
    /// just below it.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let last = *data
            .last()
            .ok_or_else(|| Error::corrupted("empty entropy payload"))?;
        if last == 0 {
            return Err(Error::corrupted("entropy payload missing sentinel bit"));
        }
        let sentinel = 7 - last.leading_zeros() as isize;
        Ok(ReverseBitReader {
            data,
            bits_remaining: (data.len() as isize - 1) * 8 + sentinel,
        })
    }

    /// Bits still unread; negative once the stream has been over-read.
    pub fn bits_remaining(&self) -> isize {
        self.bits_remaining
    }

    /// True iff every meaningful bit was consumed and none past the start.
    pub fn is_exhausted(&self) -> bool {
        self.bits_remaining == 0
    }

    /// True once a read has gone past the start of the stream.
    pub fn overflowed(&self) -> bool {
        self.bits_remaining < 0
    }

    fn extract(&self, from: isize, count: usize) -> u64 {
        let mut value = 0u64;
        for k in 0..count {
            let idx = from + k as isize;
            if idx < 0 {
                continue;
            }
            let byte = self.data[(idx / 8) as usize];
            let bit = (byte >> (idx % 8)) & 1;
            value |= (bit as u64) << k;
        }
        value
    }

    /// Look at the next `count` bits without consuming. Bits below the
    /// stream start read as zero.
    pub fn peek_bits(&self, count: usize) -> u64 {
        debug_assert!(count <= 57);
        self.extract(self.bits_remaining - count as isize, count)
    }

    /// Advance past `count` bits.
    pub fn consume(&mut self, count: usize) {
        self.bits_remaining -= count as isize;
    }

    /// Read `count` bits in encoder value order (the value that was
    /// appended forward is recovered intact).
    pub fn read_bits(&mut self, count: usize) -> u64 {
        let value = self.peek_bits(count);
        self.bits_remaining -= count as isize;
        value
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Test-side counterpart of the backward reader: appends values
    /// LSB-first and closes the stream with the sentinel bit.
    pub(crate) struct ReverseBitWriter {
        bits: Vec<bool>,
    }

    impl ReverseBitWriter {
        pub(crate) fn new() -> Self {
            ReverseBitWriter { bits: Vec::new() }
        }

        pub(crate) fn write_bits(&mut self, value: u64, count: usize) {
            for k in 0..count {
                self.bits.push((value >> k) & 1 == 1);
            }
        }

        pub(crate) fn finish(mut self) -> Vec<u8> {
            self.bits.push(true); // sentinel
            let mut out = vec![0u8; self.bits.len().div_ceil(8)];
            for (i, bit) in self.bits.iter().enumerate() {
                if *bit {
                    out[i / 8] |= 1 << (i % 8);
                }
            }
            out
        }
    }

    #[test]
    fn test_forward_reader_lsb_first() {
        // 0b1101_0110, 0b0000_1010
        let data = [0xD6, 0x0A];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(3).unwrap(), 0b110);
        assert_eq!(r.read_bits(5).unwrap(), 0b11010);
        assert_eq!(r.read_bits(8).unwrap(), 0x0A);
        assert!(r.read_bits(1).is_err());
    }

    #[test]
    fn test_forward_reader_peek_does_not_consume() {
        let data = [0xFF];
        let mut r = BitReader::new(&data);
        assert_eq!(r.peek_bits(4), 0xF);
        assert_eq!(r.peek_bits(4), 0xF);
        r.consume(4);
        assert_eq!(r.remaining_bits(), 4);
    }

    #[test]
    fn test_forward_reader_bytes_consumed_rounds_up() {
        let data = [0x00, 0x00];
        let mut r = BitReader::new(&data);
        r.consume(3);
        assert_eq!(r.bytes_consumed(), 1);
        r.consume(5);
        assert_eq!(r.bytes_consumed(), 1);
        r.consume(1);
        assert_eq!(r.bytes_consumed(), 2);
    }

    #[test]
    fn test_reverse_reader_rejects_empty_and_zero_sentinel() {
        assert!(ReverseBitReader::new(&[]).is_err());
        assert!(ReverseBitReader::new(&[0x12, 0x00]).is_err());
    }

    #[test]
    fn test_reverse_reader_recovers_written_values() {
        let mut w = ReverseBitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(0x7F, 7);
        w.write_bits(1, 1);
        let data = w.finish();

        let mut r = ReverseBitReader::new(&data).unwrap();
        // Values come back in reverse write order.
        assert_eq!(r.read_bits(1), 1);
        assert_eq!(r.read_bits(7), 0x7F);
        assert_eq!(r.read_bits(3), 0b101);
        assert!(r.is_exhausted());
    }

    #[test]
    fn test_reverse_reader_sentinel_only_stream_is_empty() {
        let r = ReverseBitReader::new(&[0x01]).unwrap();
        assert_eq!(r.bits_remaining(), 0);
        assert!(r.is_exhausted());
    }

    #[test]
    fn test_reverse_reader_overread_pads_zero_and_flags() {
        let mut w = ReverseBitWriter::new();
        w.write_bits(0b11, 2);
        let data = w.finish();

        let mut r = ReverseBitReader::new(&data).unwrap();
        assert_eq!(r.read_bits(4), 0b1100);
        assert!(r.overflowed());
        assert!(!r.is_exhausted());
    }

    proptest! {
        #[test]
        fn prop_reverse_roundtrip(values in prop::collection::vec((0u64..=u32::MAX as u64, 1usize..=32), 1..64)) {
            let mut w = ReverseBitWriter::new();
            for (v, n) in &values {
                w.write_bits(v & ((1u64 << n) - 1), *n);
            }
            let data = w.finish();
            let mut r = ReverseBitReader::new(&data).unwrap();
            for (v, n) in values.iter().rev() {
                prop_assert_eq!(r.read_bits(*n), v & ((1u64 << n) - 1));
            }
            prop_assert!(r.is_exhausted());
        }
    }
}
