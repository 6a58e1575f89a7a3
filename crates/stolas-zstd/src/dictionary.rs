//! Dictionary parsing.
//!
//! A formatted dictionary carries its own magic, an identifier, a full set
//! of entropy tables, a starting repeat-offset history, and the content
//! that frames may reference as pre-loaded history. Input without the
//! magic is treated as a raw content dictionary with id 0 and no entropy
//! state.

use crate::block::{BlockContext, RepeatOffsets, SequenceTables};
use crate::fse::FseTable;
use crate::huffman::{parse_weights, HuffmanTable};
use stolas_core::{Error, Result};

/// Magic number opening a formatted dictionary (little-endian 0xEC30A437).
pub const DICTIONARY_MAGIC: u32 = 0xEC30A437;

/// A parsed decompression dictionary.
#[derive(Debug)]
pub struct Dictionary {
    pub id: u32,
    content: Vec<u8>,
    huffman: Option<HuffmanTable>,
    literal_lengths: Option<FseTable>,
    offsets: Option<FseTable>,
    match_lengths: Option<FseTable>,
    repeat_offsets: RepeatOffsets,
}

impl Dictionary {
    /// Parse dictionary bytes. Formatted dictionaries start with the
    /// dictionary magic; anything else becomes a raw content dictionary.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Ok(Self::new_raw(data));
        }
        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != DICTIONARY_MAGIC {
            return Ok(Self::new_raw(data));
        }
        let id = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

        let mut offset = 8usize;
        let (weights, consumed) = parse_weights(&data[offset..])
            .map_err(|e| Error::InvalidDictionary(format!("Huffman table: {e}")))?;
        let huffman = HuffmanTable::from_weights(&weights)
            .map_err(|e| Error::InvalidDictionary(format!("Huffman table: {e}")))?;
        offset += consumed;

        // FSE tables in wire order: offsets, match lengths, literal lengths.
        let (of_table, consumed) = FseTable::parse(&data[offset..], 31, 8)
            .map_err(|e| Error::InvalidDictionary(format!("offset table: {e}")))?;
        offset += consumed;
        let (ml_table, consumed) = FseTable::parse(&data[offset..], 52, 9)
            .map_err(|e| Error::InvalidDictionary(format!("match length table: {e}")))?;
        offset += consumed;
        let (ll_table, consumed) = FseTable::parse(&data[offset..], 35, 9)
            .map_err(|e| Error::InvalidDictionary(format!("literal length table: {e}")))?;
        offset += consumed;

        if data.len() < offset + 12 {
            return Err(Error::InvalidDictionary(
                "truncated repeat offset history".into(),
            ));
        }
        let mut reps = [0u32; 3];
        for (i, rep) in reps.iter_mut().enumerate() {
            let at = offset + 4 * i;
            *rep = u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        }
        offset += 12;

        let content = data[offset..].to_vec();
        for &rep in &reps {
            if rep == 0 {
                return Err(Error::InvalidDictionary("zero repeat offset".into()));
            }
            if rep as usize > content.len() {
                return Err(Error::InvalidDictionary(
                    "repeat offset exceeds dictionary content".into(),
                ));
            }
        }

        Ok(Dictionary {
            id,
            content,
            huffman: Some(huffman),
            literal_lengths: Some(ll_table),
            offsets: Some(of_table),
            match_lengths: Some(ml_table),
            repeat_offsets: RepeatOffsets::from_history(reps),
        })
    }

    /// A raw content dictionary: history only, no entropy state, id 0.
    pub fn new_raw(content: &[u8]) -> Self {
        Dictionary {
            id: 0,
            content: content.to_vec(),
            huffman: None,
            literal_lengths: None,
            offsets: None,
            match_lengths: None,
            repeat_offsets: RepeatOffsets::new(),
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Frame-start entropy state seeded from this dictionary.
    pub fn initial_context(&self) -> BlockContext {
        BlockContext {
            huffman: self.huffman.clone(),
            sequence_tables: SequenceTables {
                literal_lengths: self.literal_lengths.clone(),
                offsets: self.offsets.clone(),
                match_lengths: self.match_lengths.clone(),
            },
            repeat_offsets: self.repeat_offsets,
        }
    }
}
