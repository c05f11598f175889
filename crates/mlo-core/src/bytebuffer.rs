use std::fmt;

use crate::element_parse_error::ElementParseErr;

/// Octet-level buffer for element and frame encoding/decoding.
/// Reads are bounds-checked against `end`; writes either respect `end` or,
/// in autoexpand mode, advance it and grow the underlying vector.
pub struct ByteBuffer {
    buffer: Vec<u8>,
    pos: usize,          // next byte offset for read/write
    end: usize,          // bytes at or after this are out of window
    flag_autoexpand: bool,
}

impl ByteBuffer {
    /// Create a zeroed buffer capable of holding exactly `len` bytes.
    pub fn new(len: usize) -> Self {
        ByteBuffer {
            buffer: vec![0; len],
            pos: 0,
            end: len,
            flag_autoexpand: false,
        }
    }

    /// Create a buffer with an initial capacity but zero length (end is set to 0).
    /// Writes automatically advance the end pointer and reallocate if needed.
    pub fn new_autoexpand(initial_cap: usize) -> Self {
        ByteBuffer {
            buffer: vec![0; initial_cap],
            pos: 0,
            end: 0,
            flag_autoexpand: true,
        }
    }

    /// Wrap an existing byte-vector. No new allocation is needed here.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        ByteBuffer {
            buffer: data,
            pos: 0,
            end: len,
            flag_autoexpand: false,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Peek one byte at the current pos without advancing.
    pub fn peek_u8(&self) -> Option<u8> {
        if self.pos >= self.end {
            return None;
        }
        Some(self.buffer[self.pos])
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let v = self.peek_u8()?;
        self.pos += 1;
        Some(v)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        if self.pos + 2 > self.end {
            return None;
        }
        let v = u16::from_be_bytes([self.buffer[self.pos], self.buffer[self.pos + 1]]);
        self.pos += 2;
        Some(v)
    }

    pub fn read_bytes(&mut self, num: usize) -> Option<&[u8]> {
        if self.pos + num > self.end {
            return None;
        }
        let s = &self.buffer[self.pos..self.pos + num];
        self.pos += num;
        Some(s)
    }

    /// Similar to read_u8, but returns ElementParseErr::BufferEnded with the given
    /// field name if not enough bytes are available.
    pub fn read_field_u8(&mut self, field: &'static str) -> Result<u8, ElementParseErr> {
        self.read_u8().ok_or(ElementParseErr::BufferEnded { field: Some(field) })
    }

    pub fn read_field_u16(&mut self, field: &'static str) -> Result<u16, ElementParseErr> {
        self.read_u16().ok_or(ElementParseErr::BufferEnded { field: Some(field) })
    }

    pub fn read_field_bytes(&mut self, num: usize, field: &'static str) -> Result<Vec<u8>, ElementParseErr> {
        self.read_bytes(num)
            .map(|s| s.to_vec())
            .ok_or(ElementParseErr::BufferEnded { field: Some(field) })
    }

    pub fn write_u8(&mut self, value: u8) {
        self.ensure_cap(1);
        self.buffer[self.pos] = value;
        self.pos += 1;
    }

    pub fn write_u16(&mut self, value: u16) {
        self.ensure_cap(2);
        let b = value.to_be_bytes();
        self.buffer[self.pos] = b[0];
        self.buffer[self.pos + 1] = b[1];
        self.pos += 2;
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.ensure_cap(data.len());
        self.buffer[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    /// When a write would exceed the end: panic, or in autoexpand mode advance
    /// the end and reallocate the buffer if its capacity is insufficient.
    fn ensure_cap(&mut self, num: usize) {
        if self.pos + num <= self.end {
            return;
        }
        assert!(self.flag_autoexpand, "write would exceed buffer end");
        self.end = self.pos + num;
        if self.end > self.buffer.len() {
            let new_cap = usize::max(self.end, self.buffer.len() * 2);
            self.buffer.resize(new_cap, 0);
        }
    }

    /// Window length in bytes.
    pub fn get_len(&self) -> usize {
        self.end
    }

    /// Number of bytes left in the window, from pos to end.
    pub fn get_len_remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn get_pos(&self) -> usize {
        self.pos
    }

    /// Seek `pos` to `offset`. Panics when seeking outside the window.
    pub fn seek(&mut self, offset: usize) {
        assert!(offset <= self.end, "seek out of window: got {}, end {}", offset, self.end);
        self.pos = offset;
    }

    /// Extract the written window as a byte-vector.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buffer.truncate(self.end);
        self.buffer
    }

    /// Dump the window as an uppercase hex string, no separators.
    pub fn dump_hex(&self) -> String {
        let mut s = String::with_capacity(self.end * 2);
        for b in &self.buffer[..self.end] {
            s.push_str(&format!("{:02X}", b));
        }
        s
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer {{ ^{} >{} {} }}", self.pos, self.end, self.dump_hex())
    }
}
