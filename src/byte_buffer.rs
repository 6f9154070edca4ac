//! A cursor-tracked growable byte region.
//!
//! Unlike a plain `Vec<u8>` drained on every read, `ByteBuffer` keeps a
//! separate read cursor so a partial decode can snapshot and restore its
//! position (the PAUSE invariant: on insufficient input the cursor must end
//! up exactly where it started).

use bytes::{Bytes, BytesMut};

#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read_index: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            read_index: 0,
        }
    }

    /// Append bytes at the tail (the write index is always `data.len()`).
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    /// Write the low 24 bits of `v` as a 3-byte big-endian integer.
    pub fn write_u24(&mut self, v: u32) {
        self.data.push((v >> 16) as u8);
        self.data.push((v >> 8) as u8);
        self.data.push(v as u8);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    /// Bytes available to read from the current cursor.
    pub fn readable(&self) -> usize {
        self.data.len() - self.read_index
    }

    pub fn is_empty_unread(&self) -> bool {
        self.readable() == 0
    }

    /// The unread slice, without advancing the cursor.
    pub fn peek(&self) -> &[u8] {
        &self.data[self.read_index..]
    }

    pub fn peek_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let start = self.read_index + offset;
        let end = start + len;
        if end > self.data.len() {
            None
        } else {
            Some(&self.data[start..end])
        }
    }

    /// Advance the read cursor, without copying.
    pub fn advance(&mut self, n: usize) {
        self.read_index = (self.read_index + n).min(self.data.len());
    }

    /// Snapshot the read cursor so a partial decode can roll back on PAUSE.
    pub fn save_cursor(&self) -> usize {
        self.read_index
    }

    pub fn restore_cursor(&mut self, mark: usize) {
        self.read_index = mark;
    }

    /// Read `n` bytes as an owned `Vec`, advancing the cursor.
    pub fn read_vec(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.readable() < n {
            return None;
        }
        let start = self.read_index;
        self.read_index += n;
        Some(self.data[start..self.read_index].to_vec())
    }

    /// Read `n` bytes as a cheaply-shareable `Bytes`, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Option<Bytes> {
        self.read_vec(n).map(Bytes::from)
    }

    /// Drop already-consumed bytes from the front, bounding memory growth on
    /// a long-lived connection buffer.
    pub fn compact(&mut self) {
        if self.read_index == 0 {
            return;
        }
        self.data.drain(..self.read_index);
        self.read_index = 0;
    }

    pub fn into_bytes_mut(self) -> BytesMut {
        let mut b = BytesMut::with_capacity(self.data.len() - self.read_index);
        b.extend_from_slice(&self.data[self.read_index..]);
        b
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            read_index: 0,
        }
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data,
            read_index: 0,
        }
    }
}
