//! HPACK: Header Compression for HTTP/2 (RFC 7541).
//!
//! A from-scratch implementation: canonical Huffman coding, the N-bit
//! integer and string-literal primitives, the 61-entry static table, and a
//! FIFO dynamic table, composed by the header-block representation codec.

pub mod dynamic_table;
pub mod header_block;
pub mod huffman;
pub mod primitives;
pub mod static_table;

use dynamic_table::DynamicTable;
use header_block::{Event, Indexing};
use std::collections::HashSet;

/// A decoded HTTP/2 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H2Header {
    pub name: String,
    pub value: String,
    pub indexing: Indexing,
}

impl H2Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            indexing: Indexing::Incremental,
        }
    }
}

/// HPACK decoder for HTTP/2 header blocks, owning one dynamic table.
#[derive(Debug, Default)]
pub struct HpackDecoder {
    pub dynamic_table: DynamicTable,
    max_table_size: u32,
}

impl HpackDecoder {
    pub fn new(max_table_size: u32) -> Self {
        Self {
            dynamic_table: DynamicTable::new(max_table_size),
            max_table_size,
        }
    }

    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<H2Header>, header_block::HeaderBlockError> {
        let events = header_block::decode(data, &mut self.dynamic_table, self.max_table_size)?;
        Ok(events
            .into_iter()
            .filter_map(|e| match e {
                Event::Header { name, value, indexing } => Some(H2Header { name, value, indexing }),
                Event::SizeUpdate(_) => None,
            })
            .collect())
    }

    pub fn set_max_table_size(&mut self, size: u32) {
        self.max_table_size = size;
        self.dynamic_table.set_capacity(size);
    }
}

impl Default for DynamicTable {
    fn default() -> Self {
        DynamicTable::new(4096)
    }
}

/// HPACK encoder for HTTP/2 header blocks, owning one dynamic table.
#[derive(Debug)]
pub struct HpackEncoder {
    pub dynamic_table: DynamicTable,
    pub use_huffman: bool,
    pub never_index: HashSet<String>,
    pub without_index: HashSet<String>,
}

impl Default for HpackEncoder {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl HpackEncoder {
    pub fn new(max_table_size: u32) -> Self {
        Self {
            dynamic_table: DynamicTable::new(max_table_size),
            use_huffman: true,
            never_index: HashSet::new(),
            without_index: HashSet::new(),
        }
    }

    pub fn encode(&mut self, headers: &[H2Header]) -> Vec<u8> {
        let pairs: Vec<(String, String)> = headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        header_block::encode(
            &pairs,
            &mut self.dynamic_table,
            self.use_huffman,
            &self.never_index,
            &self.without_index,
            None,
        )
    }
}
