//! A file-backed counterpart to `Stream`: values are appended to a file on
//! encode, and read back, chunk by chunk, on decode. Each `FileStream`
//! keeps its own read offset, so two handles open on the same path decode
//! the same sequence of values independently of each other.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;

use crate::buffer::Buffer;
use crate::cursor::StreamBuffer;
use crate::decode::DecodeOptions;
use crate::decode::decode_from;
use crate::encode::EncodeOptions;
use crate::encode::encode_into;
use crate::error::Result;
use crate::value::Value;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Encodes values by appending to a file, and decodes them by reading the
/// file forward from this instance's own offset.
pub struct FileStream {
    file: File,
    /// Scratch window over bytes read from `file` but not yet fully
    /// parsed into a value.
    window: StreamBuffer,
    /// Byte offset in the file this instance will read its next chunk
    /// from. Independent of any other `FileStream` open on the same path.
    reading_offset: u64,
    chunk_size: usize,
}

impl FileStream {
    /// Open (creating if necessary) `path` for both reading and
    /// appending. The new handle starts reading from byte 0, regardless
    /// of how much any other open handle has already consumed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_chunk_size(path, DEFAULT_CHUNK_SIZE)
    }

    pub fn open_with_chunk_size<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        Ok(Self {
            file,
            window: StreamBuffer::new(),
            reading_offset: 0,
            chunk_size,
        })
    }

    pub fn encode(&mut self, value: &Value, opts: &EncodeOptions<'_>) -> Result<()> {
        let mut buf = Buffer::with_capacity(64);
        encode_into(value, &mut buf, opts)?;
        self.file.write_all(buf.as_slice())?;
        Ok(())
    }

    /// Read the next value starting at `reading_offset`. Pulls chunks from
    /// the file as needed; a short read (value not fully present yet)
    /// leaves `reading_offset` unchanged so the next call retries cleanly.
    pub fn decode(&mut self, opts: &DecodeOptions<'_>) -> Result<Value> {
        loop {
            if !self.window.is_empty() {
                let mut cursor = self.window.cursor();
                match decode_from(&mut cursor, opts) {
                    Ok(value) => {
                        let consumed = cursor.pos();
                        self.window.mark_consumed(consumed);
                        self.reading_offset += consumed as u64;
                        self.window.compact();
                        return Ok(value);
                    }
                    Err(_) if self.pull_chunk()? => continue,
                    Err(e) => return Err(e),
                }
            } else if !self.pull_chunk()? {
                return Err(crate::error::Error::Buffer(
                    "no more bytes available to decode".into(),
                ));
            }
        }
    }

    /// Decode directly from `bytes`, independent of the file and this
    /// instance's offset.
    pub fn decode_bytes(&self, bytes: &[u8], opts: &DecodeOptions<'_>) -> Result<Value> {
        crate::decode::decode(bytes, opts)
    }

    /// Reads one more chunk from the file at `reading_offset` into the
    /// scratch window. Returns `false` if nothing new was available.
    fn pull_chunk(&mut self) -> Result<bool> {
        self.file.seek(SeekFrom::Start(
            self.reading_offset + self.window.len() as u64,
        ))?;
        let mut chunk = vec![0u8; self.chunk_size];
        let n = self.file.read(&mut chunk)?;
        if n == 0 {
            return Ok(false);
        }
        self.window.extend(&chunk[..n]);
        Ok(true)
    }

    pub fn reading_offset(&self) -> u64 {
        self.reading_offset
    }
}
