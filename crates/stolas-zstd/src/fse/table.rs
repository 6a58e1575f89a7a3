//! FSE decode table construction.
//!
//! Tables are built from normalized counts: signed 16-bit probabilities that
//! sum to exactly `2^accuracy_log`, where `-1` marks a "less than one"
//! symbol granted a single cell at the high end of the table. Counts arrive
//! either from a compact bitstream header (`parse_normalized_counts`) or
//! from the compiled-in default distributions.

use super::FSE_MAX_ACCURACY_LOG;
use crate::bits::BitReader;
use stolas_core::{Error, Result};

/// One decode-table cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FseCell {
    /// Symbol emitted when the state machine sits on this cell.
    pub symbol: u8,
    /// Bits to read for the state transition out of this cell.
    pub num_bits: u8,
    /// Next state is `baseline` plus the bits just read.
    pub baseline: u16,
}

/// A complete FSE decode table.
#[derive(Debug, Clone)]
pub struct FseTable {
    cells: Vec<FseCell>,
    accuracy_log: u8,
}

/// Default literal-length distribution (36 symbols, accuracy log 6).
pub const LITERAL_LENGTH_DEFAULT_DISTRIBUTION: [i16; 36] = [
    4, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 1, 1, 1, 1,
    1, -1, -1, -1, -1,
];

/// Default match-length distribution (53 symbols, accuracy log 6).
pub const MATCH_LENGTH_DEFAULT_DISTRIBUTION: [i16; 53] = [
    1, 4, 3, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
];

/// Default offset-code distribution (29 symbols, accuracy log 5).
pub const OFFSET_DEFAULT_DISTRIBUTION: [i16; 29] = [
    1, 1, 1, 1, 1, 1, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1,
];

/// Parse a normalized-count header from the start of `data`.
///
/// Values are encoded with a variable bit width derived from the shrinking
/// remaining probability mass; a zero count is followed by 2-bit zero-run
/// repeat flags. Returns the counts (indexed by symbol), the accuracy log,
/// and the number of header bytes consumed.
pub fn parse_normalized_counts(
    data: &[u8],
    max_symbol: u8,
    max_log: u8,
) -> Result<(Vec<i16>, u8, usize)> {
    debug_assert!(max_log <= FSE_MAX_ACCURACY_LOG);
    let mut reader = BitReader::new(data);

    let accuracy_log = reader.read_bits(4)? as u8 + 5;
    if accuracy_log > max_log {
        return Err(Error::corrupted(format!(
            "FSE accuracy log {} exceeds maximum {}",
            accuracy_log, max_log
        )));
    }

    let table_size = 1i32 << accuracy_log;
    let mut remaining = table_size + 1;
    let mut threshold = table_size;
    let mut num_bits = accuracy_log as usize + 1;

    let mut counts: Vec<i16> = Vec::new();
    let mut previous_zero = false;

    while remaining > 1 {
        if counts.len() > max_symbol as usize {
            return Err(Error::corrupted("FSE header describes too many symbols"));
        }
        if previous_zero {
            // Zero-run escape: 2-bit groups, value 3 extends the run.
            loop {
                let flag = reader.read_bits(2)?;
                for _ in 0..flag.min(3) {
                    counts.push(0);
                }
                if counts.len() > max_symbol as usize + 1 {
                    return Err(Error::corrupted("FSE zero run exceeds symbol range"));
                }
                if flag < 3 {
                    break;
                }
            }
            previous_zero = false;
            continue;
        }

        let max = (2 * threshold - 1) - remaining;
        let mut value = reader.peek_bits(num_bits) as i32;
        if (value & (threshold - 1)) < max {
            value &= threshold - 1;
            reader.consume(num_bits - 1);
        } else {
            reader.consume(num_bits);
            if value >= threshold {
                value -= max;
            }
        }

        let count = (value - 1) as i16;
        remaining -= count.unsigned_abs() as i32;
        if remaining < 1 {
            return Err(Error::corrupted("FSE counts exceed table size"));
        }
        counts.push(count);
        previous_zero = count == 0;

        while remaining < threshold {
            num_bits -= 1;
            threshold >>= 1;
        }
    }

    if remaining != 1 {
        return Err(Error::corrupted("FSE counts do not sum to table size"));
    }
    let consumed = reader.bytes_consumed();
    if consumed > data.len() {
        return Err(Error::unexpected_eof(data.len()));
    }
    // Peeks near the tail may have looked past the end; the cursor itself
    // must stay within the slice.
    Ok((counts, accuracy_log, consumed))
}

impl FseTable {
    /// Build a decode table from normalized counts.
    pub fn from_counts(counts: &[i16], accuracy_log: u8) -> Result<Self> {
        if accuracy_log > FSE_MAX_ACCURACY_LOG {
            return Err(Error::corrupted("FSE accuracy log too large"));
        }
        // Below log 5 the spread step is no longer coprime to the table size.
        if accuracy_log < 5 {
            return Err(Error::corrupted("FSE accuracy log below minimum"));
        }
        if counts.len() > 256 {
            return Err(Error::corrupted("FSE symbol alphabet too large"));
        }
        let table_size = 1usize << accuracy_log;

        let total: i64 = counts
            .iter()
            .map(|&c| if c == -1 { 1 } else { c.max(0) as i64 })
            .sum();
        if total != table_size as i64 {
            return Err(Error::corrupted(format!(
                "FSE counts sum to {}, table size is {}",
                total, table_size
            )));
        }

        let mut cells = vec![FseCell::default(); table_size];
        let mut high_threshold = table_size - 1;

        // Less-than-one symbols take the top cells, probability 1/table_size.
        for (symbol, &count) in counts.iter().enumerate() {
            if count == -1 {
                cells[high_threshold].symbol = symbol as u8;
                high_threshold = high_threshold.wrapping_sub(1);
            }
        }

        // Spread the remaining symbols with the coprime step.
        let step = (table_size >> 1) + (table_size >> 3) + 3;
        let mask = table_size - 1;
        let mut position = 0usize;
        for (symbol, &count) in counts.iter().enumerate() {
            if count <= 0 {
                continue;
            }
            for _ in 0..count {
                cells[position].symbol = symbol as u8;
                position = (position + step) & mask;
                while position > high_threshold && high_threshold < table_size {
                    position = (position + step) & mask;
                }
            }
        }
        if position != 0 {
            return Err(Error::corrupted("FSE table spread did not close"));
        }

        // Transition fields: each symbol's cells get consecutive counters.
        let mut symbol_next: Vec<u16> = counts
            .iter()
            .map(|&c| if c == -1 { 1 } else { c.max(0) as u16 })
            .collect();
        for cell in cells.iter_mut() {
            let counter = symbol_next[cell.symbol as usize];
            symbol_next[cell.symbol as usize] += 1;
            let num_bits = accuracy_log - highest_bit(counter as u32);
            cell.num_bits = num_bits;
            cell.baseline = ((counter as u32) << num_bits).wrapping_sub(table_size as u32) as u16;
        }

        Ok(FseTable {
            cells,
            accuracy_log,
        })
    }

    /// Parse a table description header and build the table in one step.
    /// Returns the table and the header bytes consumed.
    pub fn parse(data: &[u8], max_symbol: u8, max_log: u8) -> Result<(Self, usize)> {
        let (counts, accuracy_log, consumed) = parse_normalized_counts(data, max_symbol, max_log)?;
        Ok((Self::from_counts(&counts, accuracy_log)?, consumed))
    }

    /// One-cell table emitting a single symbol with zero transition bits.
    pub fn rle(symbol: u8) -> Self {
        FseTable {
            cells: vec![FseCell {
                symbol,
                num_bits: 0,
                baseline: 0,
            }],
            accuracy_log: 0,
        }
    }

    pub fn accuracy_log(&self) -> u8 {
        self.accuracy_log
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cell(&self, state: usize) -> FseCell {
        self.cells[state]
    }
}

#[inline]
fn highest_bit(value: u32) -> u8 {
    debug_assert!(value != 0);
    (31 - value.leading_zeros()) as u8
}
