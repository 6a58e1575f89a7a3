//! Huffman weight-description parsing and literal stream decoding.

use super::table::HuffmanTable;
use super::WEIGHT_FSE_MAX_ACCURACY_LOG;
use crate::bits::ReverseBitReader;
use crate::fse::{FseDecoder, FseTable};
use stolas_core::{Error, Result};

/// Parse a Huffman table description from the start of `data`.
///
/// Header byte >= 128: direct 4-bit weights for `header - 127` symbols,
/// high nibble first. Header byte < 128: `header` bytes of FSE-compressed
/// weights. The final symbol's weight is never stored; it is inferred from
/// the power-of-two deficit. Returns the complete weight array and bytes
/// consumed.
pub fn parse_weights(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let header = *data
        .first()
        .ok_or_else(|| Error::unexpected_eof(0))? as usize;

    let (mut weights, consumed) = if header >= 128 {
        let num_symbols = header - 127;
        let nibble_bytes = num_symbols.div_ceil(2);
        if data.len() < 1 + nibble_bytes {
            return Err(Error::unexpected_eof(data.len()));
        }
        let mut weights = Vec::with_capacity(num_symbols);
        for i in 0..num_symbols {
            let byte = data[1 + i / 2];
            let weight = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
            weights.push(weight);
        }
        (weights, 1 + nibble_bytes)
    } else {
        if data.len() < 1 + header {
            return Err(Error::unexpected_eof(data.len()));
        }
        let weights = decode_fse_weights(&data[1..1 + header])?;
        (weights, 1 + header)
    };

    let implicit = infer_last_weight(&weights)?;
    weights.push(implicit);
    Ok((weights, consumed))
}

/// FSE-compressed weights: one small table, two interleaved states, decoded
/// until the backward stream runs dry, at which point both states flush.
fn decode_fse_weights(data: &[u8]) -> Result<Vec<u8>> {
    // The weight alphabet spans a full byte; weights a table can emit but
    // the stream never lands on are harmless, and out-of-range weights are
    // rejected when the weight array is summed.
    let (table, header_len) = FseTable::parse(data, 255, WEIGHT_FSE_MAX_ACCURACY_LOG)?;
    if header_len >= data.len() {
        return Err(Error::corrupted("Huffman weight stream missing payload"));
    }
    let mut bits = ReverseBitReader::new(&data[header_len..])?;

    let mut even = FseDecoder::new(&table);
    let mut odd = FseDecoder::new(&table);
    even.init(&mut bits)?;
    odd.init(&mut bits)?;

    let mut weights = Vec::new();
    loop {
        weights.push(even.decode(&mut bits));
        if bits.overflowed() {
            weights.push(odd.symbol());
            break;
        }
        weights.push(odd.decode(&mut bits));
        if bits.overflowed() {
            weights.push(even.symbol());
            break;
        }
        if weights.len() > 253 {
            return Err(Error::corrupted("Huffman weight stream too long"));
        }
    }
    Ok(weights)
}

/// The stored weights must leave a power-of-two deficit; its log gives the
/// last symbol's weight.
fn infer_last_weight(weights: &[u8]) -> Result<u8> {
    let mut total: u64 = 0;
    for &w in weights {
        if w > 12 {
            return Err(Error::corrupted("Huffman weight out of range"));
        }
        if w > 0 {
            total += 1u64 << (w - 1);
        }
    }
    if total == 0 {
        return Err(Error::corrupted("Huffman weights are all zero"));
    }
    let full = 1u64 << (64 - total.leading_zeros());
    let rest = full - total;
    if !rest.is_power_of_two() {
        return Err(Error::corrupted("Huffman weights leave an invalid remainder"));
    }
    Ok((63 - rest.leading_zeros()) as u8 + 1)
}

/// Decode one backward Huffman stream into exactly `regen_size` bytes.
pub fn decode_single_stream(
    table: &HuffmanTable,
    data: &[u8],
    regen_size: usize,
) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(regen_size);
    let mut bits = ReverseBitReader::new(data)?;
    decode_stream_into(table, &mut bits, regen_size, &mut output)?;
    Ok(output)
}

/// Decode the 4-stream layout: a 6-byte jump table of three little-endian
/// u16 sizes, then four independent backward streams. The first three
/// streams regenerate `ceil(regen_size / 4)` bytes each, the last the
/// remainder.
pub fn decode_four_streams(
    table: &HuffmanTable,
    data: &[u8],
    regen_size: usize,
) -> Result<Vec<u8>> {
    if data.len() < 6 {
        return Err(Error::unexpected_eof(data.len()));
    }
    let size1 = u16::from_le_bytes([data[0], data[1]]) as usize;
    let size2 = u16::from_le_bytes([data[2], data[3]]) as usize;
    let size3 = u16::from_le_bytes([data[4], data[5]]) as usize;
    let payload = &data[6..];

    let end3 = size1
        .checked_add(size2)
        .and_then(|s| s.checked_add(size3))
        .ok_or_else(|| Error::corrupted("Huffman jump table overflow"))?;
    if end3 >= payload.len() {
        return Err(Error::corrupted("Huffman jump table exceeds payload"));
    }

    let chunk = regen_size.div_ceil(4);
    let last = regen_size
        .checked_sub(3 * chunk)
        .ok_or_else(|| Error::corrupted("literals too short for four streams"))?;

    let streams = [
        (&payload[..size1], chunk),
        (&payload[size1..size1 + size2], chunk),
        (&payload[size1 + size2..end3], chunk),
        (&payload[end3..], last),
    ];

    let mut output = Vec::with_capacity(regen_size);
    for (stream, expected) in streams {
        let mut bits = ReverseBitReader::new(stream)?;
        decode_stream_into(table, &mut bits, expected, &mut output)?;
    }
    Ok(output)
}

fn decode_stream_into(
    table: &HuffmanTable,
    bits: &mut ReverseBitReader<'_>,
    count: usize,
    output: &mut Vec<u8>,
) -> Result<()> {
    let max_bits = table.max_bits() as usize;
    for _ in 0..count {
        let index = bits.peek_bits(max_bits) as usize;
        let cell = table.cell(index);
        bits.consume(cell.num_bits as usize);
        if bits.overflowed() {
            return Err(Error::corrupted("Huffman stream over-read"));
        }
        output.push(cell.symbol);
    }
    if !bits.is_exhausted() {
        return Err(Error::corrupted("Huffman stream not fully consumed"));
    }
    Ok(())
}
