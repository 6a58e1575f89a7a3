//! Table-driven FSE state machine.

use super::table::FseTable;
use crate::bits::ReverseBitReader;
use stolas_core::{Error, Result};

/// One FSE decode state walking a shared backward bitstream.
///
/// Several decoders may interleave over the same reader; each owns only its
/// state index. The caller controls the symbol/advance cadence, which
/// differs between the weight stream (emit-then-advance in lockstep) and
/// the sequence stream (three states, batched updates).
#[derive(Debug)]
pub struct FseDecoder<'t> {
    table: &'t FseTable,
    state: usize,
}

impl<'t> FseDecoder<'t> {
    pub fn new(table: &'t FseTable) -> Self {
        FseDecoder { table, state: 0 }
    }

    /// Read the initial state: `accuracy_log` bits from the stream.
    pub fn init(&mut self, bits: &mut ReverseBitReader<'_>) -> Result<()> {
        self.state = bits.read_bits(self.table.accuracy_log() as usize) as usize;
        if bits.overflowed() {
            return Err(Error::corrupted("bitstream too short for FSE state"));
        }
        Ok(())
    }

    /// Symbol of the current cell. Does not touch the bitstream.
    #[inline]
    pub fn symbol(&self) -> u8 {
        self.table.cell(self.state).symbol
    }

    /// Transition to the next state, consuming the current cell's bits.
    /// Reads past the stream start pad with zeros; the caller polices
    /// overflow via the reader.
    #[inline]
    pub fn advance(&mut self, bits: &mut ReverseBitReader<'_>) {
        let cell = self.table.cell(self.state);
        let delta = bits.read_bits(cell.num_bits as usize) as usize;
        self.state = cell.baseline as usize + delta;
    }

    /// Emit the current symbol, then advance.
    #[inline]
    pub fn decode(&mut self, bits: &mut ReverseBitReader<'_>) -> u8 {
        let symbol = self.symbol();
        self.advance(bits);
        symbol
    }
}
