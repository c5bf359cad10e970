//! An in-memory handle for encoding or decoding a sequence of values
//! incrementally, without needing the whole message up front.

use crate::buffer::Buffer;
use crate::cursor::StreamBuffer;
use crate::decode::DecodeOptions;
use crate::decode::decode_from;
use crate::encode::EncodeOptions;
use crate::encode::encode_into;
use crate::error::Result;
use crate::value::Value;

/// Wraps a growable in-memory buffer. Each `encode` call appends one more
/// value's bytes; each `decode` call consumes exactly one value's worth of
/// bytes from the front, or returns an error and leaves the buffer
/// untouched if not enough bytes have arrived yet.
pub struct Stream {
    inner: StreamBuffer,
}

impl Stream {
    pub fn new() -> Self {
        Self {
            inner: StreamBuffer::new(),
        }
    }

    /// Feed externally-received bytes into the decode side of the stream.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inner.extend(bytes);
    }

    pub fn encode(&mut self, value: &Value, opts: &EncodeOptions<'_>) -> Result<()> {
        let mut buf = Buffer::with_capacity(64);
        encode_into(value, &mut buf, opts)?;
        self.inner.extend(buf.as_slice());
        Ok(())
    }

    /// Decode the next value from previously-fed bytes. On success, the
    /// consumed bytes are dropped from the front of the buffer. On a
    /// short read, the buffer is left exactly as it was so a later `decode`
    /// call (after more bytes are `feed`) can retry from scratch.
    pub fn decode(&mut self, opts: &DecodeOptions<'_>) -> Result<Value> {
        let mut cursor = self.inner.cursor();
        let value = decode_from(&mut cursor, opts)?;
        let consumed = cursor.pos();
        self.inner.mark_consumed(consumed);
        self.inner.compact();
        Ok(value)
    }

    /// Decode a value straight out of `bytes`, bypassing this stream's own
    /// buffered state entirely.
    pub fn decode_bytes(&self, bytes: &[u8], opts: &DecodeOptions<'_>) -> Result<Value> {
        crate::decode::decode(bytes, opts)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.len()
    }

    /// The bytes accumulated by `encode` calls so far, still present
    /// because nothing has `feed`/`decode`d them out again. In a pure
    /// encode-only usage this is the full emitted message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.data[self.inner.valid_start..]
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}
