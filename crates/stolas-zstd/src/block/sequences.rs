//! Sequence section decoding.
//!
//! Sequences are (literal_length, offset, match_length) triples driven by
//! three interleaved FSE states over one backward bitstream. Each of the
//! three symbol classes picks its table per block: the predefined RFC
//! distribution, a one-symbol RLE table, a freshly described FSE table, or
//! the table left behind by an earlier block.

use crate::bits::ReverseBitReader;
use crate::fse::{
    FseDecoder, FseTable, LITERAL_LENGTH_DEFAULT_DISTRIBUTION, MATCH_LENGTH_DEFAULT_DISTRIBUTION,
    OFFSET_DEFAULT_DISTRIBUTION,
};
use stolas_core::{Error, Result};

/// Accuracy ceilings per symbol class for block-described tables.
const LL_MAX_ACCURACY_LOG: u8 = 9;
const OF_MAX_ACCURACY_LOG: u8 = 8;
const ML_MAX_ACCURACY_LOG: u8 = 9;

/// Highest valid code per symbol class.
const LL_MAX_SYMBOL: u8 = 35;
const OF_MAX_SYMBOL: u8 = 31;
const ML_MAX_SYMBOL: u8 = 52;

/// Literal length code -> (baseline, extra bits).
#[rustfmt::skip]
const LITERAL_LENGTH_BASELINE: [(u32, u8); 36] = [
    (0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (7, 0),
    (8, 0), (9, 0), (10, 0), (11, 0), (12, 0), (13, 0), (14, 0), (15, 0),
    (16, 1), (18, 1), (20, 1), (22, 1), (24, 2), (28, 2), (32, 3), (40, 3),
    (48, 4), (64, 6), (128, 7), (256, 8), (512, 9), (1024, 10), (2048, 11),
    (4096, 12), (8192, 13), (16384, 14), (32768, 15), (65536, 16),
];

/// Match length code -> (baseline, extra bits).
#[rustfmt::skip]
const MATCH_LENGTH_BASELINE: [(u32, u8); 53] = [
    (3, 0), (4, 0), (5, 0), (6, 0), (7, 0), (8, 0), (9, 0), (10, 0),
    (11, 0), (12, 0), (13, 0), (14, 0), (15, 0), (16, 0), (17, 0), (18, 0),
    (19, 0), (20, 0), (21, 0), (22, 0), (23, 0), (24, 0), (25, 0), (26, 0),
    (27, 0), (28, 0), (29, 0), (30, 0), (31, 0), (32, 0), (33, 0), (34, 0),
    (35, 1), (37, 1), (39, 1), (41, 1), (43, 2), (47, 2), (51, 3), (59, 3),
    (67, 4), (83, 4), (99, 5), (131, 7), (259, 8), (515, 9), (1027, 10),
    (2051, 11), (4099, 12), (8195, 13), (16387, 14), (32771, 15), (65539, 16),
];

/// One decoded and offset-resolved sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    pub literal_length: u32,
    /// Resolved match distance, repeat history already applied.
    pub offset: u32,
    pub match_length: u32,
}

/// The three-slot repeat offset history, reset to 1, 4, 8 per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatOffsets {
    offsets: [u32; 3],
}

impl RepeatOffsets {
    pub fn new() -> Self {
        RepeatOffsets { offsets: [1, 4, 8] }
    }

    /// Dictionary-provided starting history.
    pub fn from_history(offsets: [u32; 3]) -> Self {
        RepeatOffsets { offsets }
    }

    /// Resolve an offset value against the history and update it.
    ///
    /// Values above 3 are literal distances (`value - 3`). Values 1 to 3
    /// index the history, shifted up by one when the sequence carries no
    /// literals; the shifted form of slot 3 means "most recent minus one".
    pub fn resolve(&mut self, value: u64, literal_length: u32) -> Result<u32> {
        if value > 3 {
            let offset = (value - 3) as u32;
            self.offsets[2] = self.offsets[1];
            self.offsets[1] = self.offsets[0];
            self.offsets[0] = offset;
            return Ok(offset);
        }
        let index = value as usize + usize::from(literal_length == 0);
        let offset = match index {
            1 => self.offsets[0],
            2 => {
                let offset = self.offsets[1];
                self.offsets[1] = self.offsets[0];
                self.offsets[0] = offset;
                offset
            }
            3 => {
                let offset = self.offsets[2];
                self.offsets[2] = self.offsets[1];
                self.offsets[1] = self.offsets[0];
                self.offsets[0] = offset;
                offset
            }
            _ => {
                let offset = self.offsets[0].wrapping_sub(1);
                if offset == 0 {
                    return Err(Error::corrupted("repeat offset underflow"));
                }
                self.offsets[2] = self.offsets[1];
                self.offsets[1] = self.offsets[0];
                self.offsets[0] = offset;
                offset
            }
        };
        Ok(offset)
    }
}

impl Default for RepeatOffsets {
    fn default() -> Self {
        Self::new()
    }
}

/// Compression mode of one symbol class, from the 2-bit mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolMode {
    Predefined,
    Rle,
    Fse,
    Repeat,
}

impl SymbolMode {
    fn from_field(field: u8) -> Self {
        match field & 0b11 {
            0 => SymbolMode::Predefined,
            1 => SymbolMode::Rle,
            2 => SymbolMode::Fse,
            _ => SymbolMode::Repeat,
        }
    }
}

/// FSE tables persisted across blocks for the three symbol classes.
#[derive(Debug, Default)]
pub struct SequenceTables {
    pub literal_lengths: Option<FseTable>,
    pub offsets: Option<FseTable>,
    pub match_lengths: Option<FseTable>,
}

/// Per-class table description: defaults, RLE byte, FSE header, or reuse.
fn resolve_table(
    data: &[u8],
    mode: SymbolMode,
    slot: &mut Option<FseTable>,
    defaults: &[i16],
    default_log: u8,
    max_symbol: u8,
    max_log: u8,
    class: &str,
) -> Result<usize> {
    match mode {
        SymbolMode::Predefined => {
            *slot = Some(FseTable::from_counts(defaults, default_log)?);
            Ok(0)
        }
        SymbolMode::Rle => {
            let symbol = *data
                .first()
                .ok_or_else(|| Error::unexpected_eof(0))?;
            if symbol > max_symbol {
                return Err(Error::corrupted(format!("{class}: RLE symbol out of range")));
            }
            *slot = Some(FseTable::rle(symbol));
            Ok(1)
        }
        SymbolMode::Fse => {
            let (table, consumed) = FseTable::parse(data, max_symbol, max_log)?;
            *slot = Some(table);
            Ok(consumed)
        }
        SymbolMode::Repeat => {
            if slot.is_none() {
                return Err(Error::corrupted(format!(
                    "{class}: repeat mode without a previous table"
                )));
            }
            Ok(0)
        }
    }
}

/// Parse the sequence count, mode byte, and table descriptions, then decode
/// and offset-resolve every sequence. `tables` and `repeat_offsets` carry
/// state across the frame's blocks.
pub fn decode_sequences(
    data: &[u8],
    tables: &mut SequenceTables,
    repeat_offsets: &mut RepeatOffsets,
) -> Result<Vec<Sequence>> {
    let (count, mut offset) = parse_sequence_count(data)?;
    if count == 0 {
        if offset != data.len() {
            return Err(Error::corrupted("trailing bytes after empty sequence section"));
        }
        return Ok(Vec::new());
    }

    let modes = *data
        .get(offset)
        .ok_or_else(|| Error::unexpected_eof(data.len()))?;
    offset += 1;
    if modes & 0b11 != 0 {
        return Err(Error::corrupted("reserved sequence mode bits set"));
    }
    let ll_mode = SymbolMode::from_field(modes >> 6);
    let of_mode = SymbolMode::from_field(modes >> 4);
    let ml_mode = SymbolMode::from_field(modes >> 2);

    offset += resolve_table(
        &data[offset..],
        ll_mode,
        &mut tables.literal_lengths,
        &LITERAL_LENGTH_DEFAULT_DISTRIBUTION,
        6,
        LL_MAX_SYMBOL,
        LL_MAX_ACCURACY_LOG,
        "literal length table",
    )?;
    offset += resolve_table(
        &data[offset..],
        of_mode,
        &mut tables.offsets,
        &OFFSET_DEFAULT_DISTRIBUTION,
        5,
        OF_MAX_SYMBOL,
        OF_MAX_ACCURACY_LOG,
        "offset table",
    )?;
    offset += resolve_table(
        &data[offset..],
        ml_mode,
        &mut tables.match_lengths,
        &MATCH_LENGTH_DEFAULT_DISTRIBUTION,
        6,
        ML_MAX_SYMBOL,
        ML_MAX_ACCURACY_LOG,
        "match length table",
    )?;

    let ll_table = tables.literal_lengths.as_ref().ok_or_else(|| {
        Error::corrupted("literal length table unavailable")
    })?;
    let of_table = tables.offsets.as_ref().ok_or_else(|| {
        Error::corrupted("offset table unavailable")
    })?;
    let ml_table = tables.match_lengths.as_ref().ok_or_else(|| {
        Error::corrupted("match length table unavailable")
    })?;

    let mut bits = ReverseBitReader::new(&data[offset..])?;
    let mut ll_state = FseDecoder::new(ll_table);
    let mut of_state = FseDecoder::new(of_table);
    let mut ml_state = FseDecoder::new(ml_table);
    ll_state.init(&mut bits)?;
    of_state.init(&mut bits)?;
    ml_state.init(&mut bits)?;

    let mut sequences = Vec::with_capacity(count);
    for i in 0..count {
        let of_code = of_state.symbol();
        if of_code > OF_MAX_SYMBOL {
            return Err(Error::corrupted("offset code out of range"));
        }
        let of_value = (1u64 << of_code) + bits.read_bits(of_code as usize);

        let ml_code = ml_state.symbol();
        if ml_code > ML_MAX_SYMBOL {
            return Err(Error::corrupted("match length code out of range"));
        }
        let (ml_base, ml_extra) = MATCH_LENGTH_BASELINE[ml_code as usize];
        let match_length = ml_base + bits.read_bits(ml_extra as usize) as u32;

        let ll_code = ll_state.symbol();
        if ll_code > LL_MAX_SYMBOL {
            return Err(Error::corrupted("literal length code out of range"));
        }
        let (ll_base, ll_extra) = LITERAL_LENGTH_BASELINE[ll_code as usize];
        let literal_length = ll_base + bits.read_bits(ll_extra as usize) as u32;

        if bits.overflowed() {
            return Err(Error::corrupted("sequence bitstream over-read"));
        }

        // States do not advance past the final sequence.
        if i + 1 < count {
            ll_state.advance(&mut bits);
            ml_state.advance(&mut bits);
            of_state.advance(&mut bits);
            if bits.overflowed() {
                return Err(Error::corrupted("sequence bitstream over-read"));
            }
        }

        let resolved = repeat_offsets.resolve(of_value, literal_length)?;
        sequences.push(Sequence {
            literal_length,
            offset: resolved,
            match_length,
        });
    }

    if !bits.is_exhausted() {
        return Err(Error::corrupted(format!(
            "sequence bitstream not fully consumed, {} bits left",
            bits.bits_remaining()
        )));
    }
    Ok(sequences)
}

/// Sequence count: one byte below 128, two bytes up to 0x7EFF, three bytes
/// with a 0x7F00 bias above that.
fn parse_sequence_count(data: &[u8]) -> Result<(usize, usize)> {
    let byte0 = *data.first().ok_or_else(|| Error::unexpected_eof(0))? as usize;
    if byte0 < 128 {
        Ok((byte0, 1))
    } else if byte0 < 255 {
        let byte1 = *data.get(1).ok_or_else(|| Error::unexpected_eof(1))? as usize;
        Ok((((byte0 - 128) << 8) + byte1, 2))
    } else {
        if data.len() < 3 {
            return Err(Error::unexpected_eof(data.len()));
        }
        let value = data[1] as usize + ((data[2] as usize) << 8) + 0x7F00;
        Ok((value, 3))
    }
}
