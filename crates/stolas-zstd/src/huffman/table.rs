//! Huffman decode table construction from symbol weights.

use super::HUF_MAX_TABLE_LOG;
use stolas_core::{Error, Result};

/// One lookup cell: the decoded byte and its code length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCell {
    pub symbol: u8,
    pub num_bits: u8,
}

/// Single-level Huffman decode table.
///
/// Indexed by the next `max_bits` unread bits of the stream (first-read bit
/// as the most significant); every index is covered when the weights
/// satisfy Kraft equality.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    cells: Vec<HuffmanCell>,
    max_bits: u8,
}

impl HuffmanTable {
    /// Build from a complete weight array (implicit last weight already
    /// resolved). Weight 0 means "symbol absent"; weight `w` implies a code
    /// of `max_bits + 1 - w` bits.
    pub fn from_weights(weights: &[u8]) -> Result<Self> {
        if weights.len() > 256 {
            return Err(Error::corrupted("too many Huffman symbols"));
        }

        let mut total: u64 = 0;
        let mut present = 0usize;
        for &w in weights {
            if w > HUF_MAX_TABLE_LOG + 1 {
                return Err(Error::corrupted("Huffman weight too large"));
            }
            if w > 0 {
                total += 1u64 << (w - 1);
                present += 1;
            }
        }
        if present < 2 {
            return Err(Error::corrupted("Huffman table needs at least two symbols"));
        }
        if !total.is_power_of_two() {
            return Err(Error::corrupted("Huffman weights do not fill the tree"));
        }

        let max_bits = (63 - total.leading_zeros()) as u8;
        if max_bits > HUF_MAX_TABLE_LOG {
            return Err(Error::corrupted("Huffman table log too large"));
        }
        if max_bits == 0 {
            return Err(Error::corrupted("degenerate Huffman table"));
        }

        // Canonical layout: ascending weight (longest code first), symbols
        // in natural order within a weight, each spanning 2^(w-1) cells.
        let table_size = 1usize << max_bits;
        let mut cells = vec![HuffmanCell::default(); table_size];
        let mut offset = 0usize;
        for weight in 1..=max_bits + 1 {
            for (symbol, &w) in weights.iter().enumerate() {
                if w != weight {
                    continue;
                }
                let span = 1usize << (w - 1);
                let num_bits = max_bits + 1 - w;
                for cell in &mut cells[offset..offset + span] {
                    *cell = HuffmanCell {
                        symbol: symbol as u8,
                        num_bits,
                    };
                }
                offset += span;
            }
        }
        debug_assert_eq!(offset, table_size);

        Ok(HuffmanTable { cells, max_bits })
    }

    pub fn max_bits(&self) -> u8 {
        self.max_bits
    }

    #[inline]
    pub fn cell(&self, index: usize) -> HuffmanCell {
        self.cells[index]
    }

    /// Recover each present symbol's `(code, length)` pair. Test and
    /// diagnostic helper; decoding itself never needs explicit codes.
    pub fn codes(&self) -> Vec<(u8, u16, u8)> {
        let mut out = Vec::new();
        let mut index = 0usize;
        while index < self.cells.len() {
            let cell = self.cells[index];
            let span = 1usize << (self.max_bits - cell.num_bits);
            let code = (index >> (self.max_bits - cell.num_bits)) as u16;
            out.push((cell.symbol, code, cell.num_bits));
            index += span;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_equal_symbols() {
        let table = HuffmanTable::from_weights(&[1, 1]).unwrap();
        assert_eq!(table.max_bits(), 1);
        assert_eq!(table.cell(0), HuffmanCell { symbol: 0, num_bits: 1 });
        assert_eq!(table.cell(1), HuffmanCell { symbol: 1, num_bits: 1 });
    }

    #[test]
    fn test_skewed_weights_span_cells() {
        // Weights [2, 1, 1]: symbol 0 gets a 1-bit code, symbols 1 and 2
        // get 2-bit codes.
        let table = HuffmanTable::from_weights(&[2, 1, 1]).unwrap();
        assert_eq!(table.max_bits(), 2);
        assert_eq!(table.cell(0), HuffmanCell { symbol: 1, num_bits: 2 });
        assert_eq!(table.cell(1), HuffmanCell { symbol: 2, num_bits: 2 });
        assert_eq!(table.cell(2), HuffmanCell { symbol: 0, num_bits: 1 });
        assert_eq!(table.cell(3), HuffmanCell { symbol: 0, num_bits: 1 });
    }

    #[test]
    fn test_kraft_inequality_rejected() {
        // 1 + 1 + 1 = 3 is not a power of two.
        assert!(HuffmanTable::from_weights(&[1, 1, 1]).is_err());
    }

    #[test]
    fn test_single_symbol_rejected() {
        assert!(HuffmanTable::from_weights(&[1]).is_err());
        assert!(HuffmanTable::from_weights(&[3, 0, 0]).is_err());
    }

    #[test]
    fn test_weight_zero_symbols_absent() {
        let table = HuffmanTable::from_weights(&[1, 0, 1]).unwrap();
        let codes = table.codes();
        assert_eq!(codes.len(), 2);
        assert!(codes.iter().all(|&(s, _, _)| s != 1));
    }

    #[test]
    fn test_oversized_weight_rejected() {
        assert!(HuffmanTable::from_weights(&[13, 1]).is_err());
    }

    #[test]
    fn test_codes_are_prefix_free() {
        let table = HuffmanTable::from_weights(&[3, 2, 2, 1, 1]).unwrap();
        let codes = table.codes();
        for (i, &(_, code_a, len_a)) in codes.iter().enumerate() {
            for &(_, code_b, len_b) in codes.iter().skip(i + 1) {
                let shift = len_a.abs_diff(len_b);
                let (short, long) = if len_a < len_b {
                    (code_a, code_b)
                } else {
                    (code_b, code_a)
                };
                assert_ne!(short, long >> shift, "prefix collision");
            }
        }
    }
}
