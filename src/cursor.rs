//! A bounded byte source: checked advance, slice views without copy.

use crate::error::Error;
use crate::error::Result;

/// A position marker that can be used to seek a `Cursor` back to a prior
/// point, even across the buffer compaction a `StreamBuffer` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub absolute_pos: u64,
}

/// Tracks a read position within a borrowed byte slice. Used both for
/// one-shot `decode(&[u8])` (where `base_offset` is always 0) and for
/// streaming decode over a `StreamBuffer` window (where `base_offset`
/// tracks how many bytes have been compacted away).
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    slice: &'a [u8],
    pos: usize,
    base_offset: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self {
            slice,
            pos: 0,
            base_offset: 0,
        }
    }

    pub fn with_offset(slice: &'a [u8], base_offset: u64) -> Self {
        Self {
            slice,
            pos: 0,
            base_offset,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn absolute_pos(&self) -> u64 {
        self.base_offset + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.slice.len().saturating_sub(self.pos)
    }

    pub fn mark(&self) -> Location {
        Location {
            absolute_pos: self.absolute_pos(),
        }
    }

    #[inline]
    fn need(&self, n: usize) -> Result<()> {
        if self.pos + n > self.slice.len() {
            Err(Error::Value("unexpected end of input".into()))
        } else {
            Ok(())
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.need(1)?;
        let byte = self.slice[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.need(1)?;
        Ok(self.slice[self.pos])
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.need(len)?;
        let slice = &self.slice[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.need(len)?;
        self.pos += len;
        Ok(())
    }

    /// The remainder of the slice from the current position, without
    /// copying.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.slice[self.pos..]
    }
}

/// A growable buffer that accumulates encoded values and hands out cursors
/// over the unconsumed tail. Used by `Stream`/`FileStream` to support
/// resumable, chunked decoding: a failed parse leaves `valid_start`
/// untouched, so the next `decode` call re-reads from the same point once
/// more bytes have arrived.
pub struct StreamBuffer {
    pub data: Vec<u8>,
    pub base_offset: u64,
    pub valid_start: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base_offset: 0,
            valid_start: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// A cursor over the unconsumed tail of the buffer.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::with_offset(&self.data[self.valid_start..], self.base_offset + self.valid_start as u64)
    }

    /// Commit that `n` bytes starting at `valid_start` have been fully
    /// parsed. Only call this after a parse succeeds end-to-end.
    pub fn mark_consumed(&mut self, n: usize) {
        self.valid_start += n;
    }

    /// Drop fully-consumed bytes from the front of the buffer, freeing
    /// memory. `base_offset` absorbs the shift so absolute positions
    /// (and any `Location`s taken before the compaction) stay meaningful.
    pub fn compact(&mut self) -> usize {
        let freed = self.valid_start;
        if freed > 0 {
            self.data.drain(..self.valid_start);
            self.base_offset += freed as u64;
            self.valid_start = 0;
        }
        freed
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.valid_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}
