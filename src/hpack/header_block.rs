//! RFC 7541 Section 6: representation dispatch for a full header block.
//! Mirrors `CodecHttp2.cpp`'s `UnpackHeader`/`PackHeader*` bit-pattern table,
//! restoring the distinction between incremental-indexing, without-indexing
//! and never-indexed literals.

use super::dynamic_table::DynamicTable;
use super::primitives::{decode_integer, decode_string, encode_integer, encode_string};
use super::static_table;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBlockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    Incremental,
    WithoutIndexing,
    NeverIndexed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Header {
        name: String,
        value: String,
        indexing: Indexing,
    },
    SizeUpdate(u32),
}

/// Resolve a 1-based index over the combined static+dynamic space to its
/// (name, value). The static table's many name-only entries (`:authority`,
/// `accept`, `cookie`, ...) carry an empty-string value, not an absent one —
/// callers must not conflate "value is the empty string" with "no such
/// entry"; only an out-of-range index is an error.
fn lookup_combined(
    index: usize,
    decoder_table: &DynamicTable,
) -> Result<(String, String), HeaderBlockError> {
    if index == 0 {
        return Err(HeaderBlockError);
    }
    if index <= static_table::STATIC_TABLE_LEN {
        let (name, value) = static_table::lookup(index).ok_or(HeaderBlockError)?;
        return Ok((name.to_string(), value.to_string()));
    }
    let dyn_index = index - static_table::STATIC_TABLE_LEN;
    let entry = decoder_table.lookup(dyn_index).ok_or(HeaderBlockError)?;
    Ok((entry.name.clone(), entry.value.clone()))
}

fn utf8(bytes: Vec<u8>) -> Result<String, HeaderBlockError> {
    String::from_utf8(bytes).map_err(|_| HeaderBlockError)
}

/// Decode a full header block into a sequence of events. Dynamic table size
/// updates are only legal before any other representation in the block;
/// this is enforced here rather than left to the caller.
pub fn decode(
    data: &[u8],
    decoder_table: &mut DynamicTable,
    settings_header_table_size: u32,
) -> Result<Vec<Event>, HeaderBlockError> {
    let mut events = Vec::new();
    let mut pos = 0usize;
    let mut seen_non_size_update = false;

    while pos < data.len() {
        let byte = data[pos];
        if byte & 0x80 != 0 {
            // Indexed Header Field (6.1)
            let (index, consumed) = decode_integer(&data[pos..], 7).map_err(|_| HeaderBlockError)?;
            let (name, value) = lookup_combined(index as usize, decoder_table)?;
            events.push(Event::Header {
                name,
                value,
                indexing: Indexing::Incremental,
            });
            pos += consumed;
            seen_non_size_update = true;
        } else if byte & 0x40 != 0 {
            // Literal Header Field with Incremental Indexing (6.2.1)
            let (header, consumed) = decode_literal(&data[pos..], 6, decoder_table)?;
            decoder_table.insert(header.0.clone(), header.1.clone());
            events.push(Event::Header {
                name: header.0,
                value: header.1,
                indexing: Indexing::Incremental,
            });
            pos += consumed;
            seen_non_size_update = true;
        } else if byte & 0x20 != 0 {
            // Dynamic Table Size Update (6.3)
            if seen_non_size_update {
                return Err(HeaderBlockError);
            }
            let (new_size, consumed) = decode_integer(&data[pos..], 5).map_err(|_| HeaderBlockError)?;
            if new_size > settings_header_table_size as u64 {
                return Err(HeaderBlockError);
            }
            decoder_table.set_capacity(new_size as u32);
            events.push(Event::SizeUpdate(new_size as u32));
            pos += consumed;
        } else if byte & 0x10 != 0 {
            // Literal Header Field Never Indexed (6.2.3)
            let (header, consumed) = decode_literal(&data[pos..], 4, decoder_table)?;
            events.push(Event::Header {
                name: header.0,
                value: header.1,
                indexing: Indexing::NeverIndexed,
            });
            pos += consumed;
            seen_non_size_update = true;
        } else {
            // Literal Header Field without Indexing (6.2.2)
            let (header, consumed) = decode_literal(&data[pos..], 4, decoder_table)?;
            events.push(Event::Header {
                name: header.0,
                value: header.1,
                indexing: Indexing::WithoutIndexing,
            });
            pos += consumed;
            seen_non_size_update = true;
        }
    }

    Ok(events)
}

fn decode_literal(
    data: &[u8],
    prefix_bits: u8,
    decoder_table: &DynamicTable,
) -> Result<((String, String), usize), HeaderBlockError> {
    let (name_index, mut consumed) = decode_integer(data, prefix_bits).map_err(|_| HeaderBlockError)?;
    let name = if name_index == 0 {
        let (bytes, n) = decode_string(&data[consumed..]).map_err(|_| HeaderBlockError)?;
        consumed += n;
        utf8(bytes)?
    } else {
        let (name, _) = lookup_combined(name_index as usize, decoder_table)?;
        name
    };
    let (value_bytes, n) = decode_string(&data[consumed..]).map_err(|_| HeaderBlockError)?;
    consumed += n;
    let value = utf8(value_bytes)?;
    Ok(((name, value), consumed))
}

/// Encode a sequence of headers into a header block. `never_index` and
/// `without_index` name sets (lowercased) select the disposition for
/// regular headers; anything not in either set is packed with incremental
/// indexing when it isn't already an exact static/dynamic table match.
#[allow(clippy::too_many_arguments)]
pub fn encode(
    headers: &[(String, String)],
    encoder_table: &mut DynamicTable,
    use_huffman: bool,
    never_index: &HashSet<String>,
    without_index: &HashSet<String>,
    dynamic_table_update_size: Option<u32>,
) -> Vec<u8> {
    let mut out = Vec::new();

    if let Some(new_size) = dynamic_table_update_size {
        encoder_table.set_capacity(new_size);
        out.extend(encode_integer(new_size as u64, 5, 0x20));
    }

    for (name, value) in headers {
        if let Some(index) = static_table::find_with_value(name, value)
            .or_else(|| encoder_table.find_with_value(name, value).map(|i| i + static_table::STATIC_TABLE_LEN))
        {
            out.extend(encode_integer(index as u64, 7, 0x80));
            continue;
        }

        let name_index = static_table::find_name(name)
            .or_else(|| encoder_table.find_name(name).map(|i| i + static_table::STATIC_TABLE_LEN));

        if never_index.contains(name) {
            pack_literal(&mut out, name, value, name_index, use_huffman, 4, 0x10);
        } else if without_index.contains(name) {
            pack_literal(&mut out, name, value, name_index, use_huffman, 4, 0x00);
        } else {
            pack_literal(&mut out, name, value, name_index, use_huffman, 6, 0x40);
            encoder_table.insert(name.clone(), value.clone());
        }
    }

    out
}

fn pack_literal(
    out: &mut Vec<u8>,
    name: &str,
    value: &str,
    name_index: Option<usize>,
    use_huffman: bool,
    prefix_bits: u8,
    leading_bits: u8,
) {
    match name_index {
        Some(index) => out.extend(encode_integer(index as u64, prefix_bits, leading_bits)),
        None => {
            out.push(leading_bits);
            out.extend(encode_string(name.as_bytes(), use_huffman));
        }
    }
    out.extend(encode_string(value.as_bytes(), use_huffman));
}
