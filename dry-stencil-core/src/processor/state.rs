// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Buffered source state shared with operation handlers
//!
//! [`ProcessorState`] owns the sliding byte window over the source stream and the
//! handle on the target stream for a single run. Operations receive it when one of
//! their tokens matches and use its seek primitives to look around the match:
//! forward over the source, and backward over output that was already written.

use std::{
    fs::File,
    io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write},
    sync::Arc,
};

use tracing::debug;

use crate::{
    encoding::Encoding,
    processor::encoding_config::EncodingConfig,
    trie::SimpleTrie,
};

/// Smallest buffer able to hold any byte-order mark
const MIN_BUFFER_SIZE: usize = 4;

/// How much written output is read back at a time by backward seeks
const BACK_WINDOW: usize = 4096;

/// Output of a run
///
/// Besides appending, handlers can read back what was written and truncate it,
/// which is how whitespace before a control token is removed after the fact.
pub trait TargetStream: Write {
    /// Number of bytes written so far
    fn written_len(&mut self) -> io::Result<u64>;

    /// Fills `buf` with written output starting at `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Drops written output past `len`; later writes continue from there
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

fn out_of_range() -> io::Error {
    io::Error::new(ErrorKind::UnexpectedEof, "read past the end of the written output")
}

impl TargetStream for Vec<u8> {
    fn written_len(&mut self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = offset as usize;
        let src = self.get(start..start + buf.len()).ok_or_else(out_of_range)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        Vec::truncate(self, len as usize);
        Ok(())
    }
}

impl TargetStream for Cursor<Vec<u8>> {
    fn written_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.get_mut().read_at(offset, buf)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        self.set_position(len);
        Ok(())
    }
}

/// Files must be opened for both reading and writing
impl TargetStream for File {
    fn written_len(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)?;
        self.seek(SeekFrom::End(0))?;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

impl<T: TargetStream + ?Sized> TargetStream for &mut T {
    fn written_len(&mut self) -> io::Result<u64> {
        (**self).written_len()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }
}

/// Sliding window over the source stream of one run
pub struct ProcessorState<'a> {
    source: &'a mut dyn Read,
    target: &'a mut dyn TargetStream,
    buffer: Vec<u8>,
    length: usize,
    position: usize,
    exhausted: bool,
    encoding: Encoding,
    config: Arc<EncodingConfig>,
    /// Output offset just past the byte-order mark, backward seeks never cut below it
    output_floor: u64,
}

impl<'a> ProcessorState<'a> {
    /// Reads the first buffer and positions the cursor after any byte-order mark
    ///
    /// `configure` receives the detected encoding and builds the token tables.
    pub fn new(
        source: &'a mut dyn Read,
        target: &'a mut dyn TargetStream,
        buffer_size: usize,
        configure: impl Fn(Encoding) -> EncodingConfig,
    ) -> io::Result<Self> {
        let mut state = Self {
            source,
            target,
            buffer: vec![0; buffer_size.max(MIN_BUFFER_SIZE)],
            length: 0,
            position: 0,
            exhausted: false,
            encoding: Encoding::Utf8,
            config: Arc::new(configure(Encoding::Utf8)),
            output_floor: 0,
        };
        state.fill()?;
        let (encoding, bom) = Encoding::detect(&state.buffer[..state.length]);
        state.position = bom;
        state.output_floor = bom as u64;
        if encoding != Encoding::Utf8 {
            state.config = Arc::new(configure(encoding));
        }
        state.encoding = encoding;
        Ok(state)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn encoding_config(&self) -> &Arc<EncodingConfig> {
        &self.config
    }

    /// The valid part of the buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.length);
    }

    /// Whether the source has no more bytes beyond the buffer
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Reads from the source until the buffer is full or the source ends
    fn fill(&mut self) -> io::Result<usize> {
        let mut total = 0;
        while !self.exhausted && self.length < self.buffer.len() {
            match self.source.read(&mut self.buffer[self.length..]) {
                Ok(0) => self.exhausted = true,
                Ok(read) => {
                    self.length += read;
                    total += read;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Discards everything before `from`, moves the rest to the front and refills
    ///
    /// The cursor ends up at the start of the buffer. Returns `false` once the
    /// buffer is empty and the source is exhausted.
    pub fn advance_buffer(&mut self, from: usize) -> io::Result<bool> {
        let from = from.min(self.length);
        self.buffer.copy_within(from..self.length, 0);
        self.length -= from;
        self.position = 0;
        self.fill()?;
        Ok(self.length > 0)
    }

    /// Makes sure `needed` bytes are available after the cursor, unless the source ends first
    pub fn ensure_lookahead(&mut self, needed: usize) -> io::Result<()> {
        if self.length - self.position >= needed || self.exhausted {
            return Ok(());
        }
        if needed > self.buffer.len() {
            debug!(capacity = self.buffer.len(), needed, "growing buffer for lookahead");
            self.buffer.resize(needed, 0);
        }
        self.advance_buffer(self.position)?;
        Ok(())
    }

    /// Grows the buffer so it can always hold `size` bytes of lookahead
    pub fn reserve_lookahead(&mut self, size: usize) {
        if size > self.buffer.len() {
            debug!(capacity = self.buffer.len(), size, "buffer smaller than the longest token, growing it");
            self.buffer.resize(size, 0);
        }
    }

    /// Appends bytes to the target
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.target.write_all(bytes)?;
        Ok(bytes.len())
    }

    /// Appends `buffer[from..to]` to the target
    pub fn write_range(&mut self, from: usize, to: usize) -> io::Result<usize> {
        if to <= from {
            return Ok(0);
        }
        self.target.write_all(&self.buffer[from..to])?;
        Ok(to - from)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.target.flush()
    }

    /// Matches the longest token of `trie` at the cursor without consuming it
    ///
    /// Returns the token id and its length.
    pub fn peek_token(&mut self, trie: &SimpleTrie) -> io::Result<Option<(usize, usize)>> {
        self.ensure_lookahead(trie.max_length())?;
        let mut cursor = self.position;
        Ok(trie
            .get_operation(&self.buffer, self.length, &mut cursor)
            .map(|index| (index, cursor - self.position)))
    }

    /// Moves the cursor forward by `count` bytes
    pub fn advance(&mut self, count: usize) -> io::Result<()> {
        let mut remaining = count;
        loop {
            let step = remaining.min(self.length - self.position);
            self.position += step;
            remaining -= step;
            if remaining == 0 || !self.advance_buffer(self.position)? {
                return Ok(());
            }
        }
    }

    /// The byte `offset` bytes after the cursor, if the source has one
    pub fn peek_byte(&mut self, offset: usize) -> io::Result<Option<u8>> {
        self.ensure_lookahead(offset + 1)?;
        Ok(self.buffer[..self.length].get(self.position + offset).copied())
    }

    /// Moves the cursor forward until a token of `trie` matches
    ///
    /// With `consume` the cursor ends after the token, otherwise at its start.
    /// Returns the matched token id, or `None` with the source exhausted.
    pub fn seek_source_forward_until(&mut self, trie: &SimpleTrie, consume: bool) -> io::Result<Option<usize>> {
        loop {
            self.ensure_lookahead(trie.max_length())?;
            if self.position >= self.length {
                if !self.advance_buffer(self.length)? {
                    return Ok(None);
                }
                continue;
            }
            let mut cursor = self.position;
            if let Some(index) = trie.get_operation(&self.buffer, self.length, &mut cursor) {
                if consume {
                    self.position = cursor;
                }
                return Ok(Some(index));
            }
            self.position += 1;
        }
    }

    /// Consumes up to and including the next token of `trie`, or to the end of the source
    pub fn seek_source_forward_through(&mut self, trie: &SimpleTrie) -> io::Result<Option<usize>> {
        self.seek_source_forward_until(trie, true)
    }

    /// Consumes tokens of `trie` for as long as they keep matching
    pub fn seek_source_forward_while(&mut self, trie: &SimpleTrie) -> io::Result<()> {
        while let Some((_, len)) = self.peek_token(trie)? {
            self.position += len;
        }
        Ok(())
    }

    /// Truncates the output back to the last token of `trie`
    ///
    /// Without `consume` the token itself is kept. When no token is found the
    /// output is truncated to the byte-order mark. Only code unit boundaries are
    /// considered, so a token never matches across two characters.
    pub fn seek_target_back_until(&mut self, trie: &SimpleTrie, consume: bool) -> io::Result<()> {
        let floor = self.output_floor;
        let unit = self.encoding.unit_width() as u64;
        let overlap = trie.max_length().saturating_sub(1) as u64;
        let total = self.target.written_len()?;
        let mut scan_end = total;
        while scan_end > floor {
            let start = scan_end.saturating_sub(BACK_WINDOW as u64).max(floor);
            let read_start = start.saturating_sub(overlap).max(floor);
            let mut chunk = vec![0; (scan_end - read_start) as usize];
            self.target.read_at(read_start, &mut chunk)?;
            let first = (start - read_start) as usize + 1;
            for end in (first..=chunk.len()).rev() {
                let absolute = read_start + end as u64;
                if (absolute - floor) % unit != 0 {
                    continue;
                }
                if let Some(len) = trie.match_suffix(&chunk[..end]) {
                    let keep = if consume { absolute - len as u64 } else { absolute };
                    return self.target.truncate(keep);
                }
            }
            scan_end = start;
        }
        if total > floor {
            self.target.truncate(floor)?;
        }
        Ok(())
    }

    /// Strips trailing tokens of `trie` from the output
    ///
    /// Stripping stops at the byte-order mark and at the first trailing code
    /// unit that belongs to no token.
    pub fn seek_target_back_while(&mut self, trie: &SimpleTrie) -> io::Result<()> {
        let floor = self.output_floor;
        let unit = self.encoding.unit_width() as u64;
        let total = self.target.written_len()?;
        if total <= floor || (total - floor) % unit != 0 {
            return Ok(());
        }
        let window = BACK_WINDOW.max(trie.max_length()) as u64;
        let mut end = total;
        while end > floor {
            let start = end.saturating_sub(window).max(floor);
            let mut chunk = vec![0; (end - start) as usize];
            self.target.read_at(start, &mut chunk)?;
            let mut kept = chunk.len();
            while let Some(len) = trie.match_suffix(&chunk[..kept]) {
                kept -= len;
            }
            let new_end = start + kept as u64;
            let stripped = new_end != end;
            end = new_end;
            // a token may straddle the window start, look again from the new end
            if !stripped || start == floor || kept >= trie.max_length() {
                break;
            }
        }
        if end != total {
            self.target.truncate(end)?;
        }
        Ok(())
    }
}
