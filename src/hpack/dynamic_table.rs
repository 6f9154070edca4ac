//! RFC 7541 Section 2.3.2 / 4: the FIFO dynamic table shared by the static
//! table to form the full HPACK index space. A connection holds two
//! independent instances — one for encoding, one for decoding — they are
//! never shared.

use std::collections::VecDeque;

/// Per-entry overhead added to `name.len() + value.len()` for HPACK size
/// accounting (RFC 7541 4.1).
pub const ENTRY_OVERHEAD: usize = 32;

#[derive(Debug, Clone)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn hpack_size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}

#[derive(Debug, Clone)]
pub struct DynamicTable {
    /// Newest entry at the front, oldest at the back.
    entries: VecDeque<HeaderEntry>,
    size: usize,
    capacity: usize,
}

impl DynamicTable {
    pub fn new(capacity: u32) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            capacity: capacity as usize,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 1-based lookup, newest entry first (index 1 == most recently
    /// inserted), the layout callers combine with the static table's 61
    /// entries to form the full HPACK index space.
    pub fn lookup(&self, index: usize) -> Option<&HeaderEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get(index - 1)
    }

    pub fn find_with_value(&self, name: &str, value: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name && e.value == value)
            .map(|i| i + 1)
    }

    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name).map(|i| i + 1)
    }

    fn evict_to_fit(&mut self, incoming: usize) {
        while self.size + incoming > self.capacity {
            match self.entries.pop_back() {
                Some(evicted) => self.size -= evicted.hpack_size(),
                None => {
                    self.size = 0;
                    break;
                }
            }
        }
    }

    /// Insert a new entry, evicting from the tail until it fits. An entry
    /// whose own size exceeds the table's capacity empties the table and is
    /// not inserted (RFC 7541 4.4).
    pub fn insert(&mut self, name: String, value: String) {
        let entry = HeaderEntry { name, value };
        let entry_size = entry.hpack_size();
        self.evict_to_fit(entry_size);
        if entry_size > self.capacity {
            return;
        }
        self.size += entry_size;
        self.entries.push_front(entry);
    }

    /// Change the negotiated capacity, evicting from the tail until the
    /// size invariant holds.
    pub fn set_capacity(&mut self, new_capacity: u32) {
        self.capacity = new_capacity as usize;
        self.evict_to_fit(0);
    }
}
