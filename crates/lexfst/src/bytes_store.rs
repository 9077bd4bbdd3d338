// Paged, append-only byte buffer backing an automaton.
//
// Bytes are appended into fixed-size pages. Already written bytes can be
// overwritten, copied, reversed and truncated, which is what node freezing
// needs. Readers address the store by absolute i64 position and walk either
// forward (packed layout) or backward (default layout).

use lexfst_core::CodecError;
use lexfst_core::data_io::{DataInput, DataOutput};

/// Paged byte buffer.
pub struct BytesStore {
    blocks: Vec<Vec<u8>>,
    block_size: usize,
    block_bits: u32,
    block_mask: usize,
    /// Write offset within the last block. `block_size` means the next write
    /// starts a new block.
    next_write: usize,
}

impl BytesStore {
    /// Creates an empty store with pages of `1 << block_bits` bytes.
    pub fn new(block_bits: u32) -> Self {
        debug_assert!((1..=30).contains(&block_bits));
        let block_size = 1usize << block_bits;
        Self {
            blocks: Vec::new(),
            block_size,
            block_bits,
            block_mask: block_size - 1,
            next_write: block_size,
        }
    }

    /// Reads `num_bytes` from `input` into a store whose page size is the
    /// smallest power of two covering `num_bytes`, capped at `max_block_size`.
    pub fn read_from<R: DataInput + ?Sized>(
        input: &mut R,
        num_bytes: u64,
        max_block_size: usize,
    ) -> Result<Self, CodecError> {
        let mut block_size = 2usize;
        let mut block_bits = 1;
        while (block_size as u64) < num_bytes && block_size < max_block_size {
            block_size *= 2;
            block_bits += 1;
        }
        let mut store = Self::new(block_bits);
        let mut left = num_bytes;
        while left > 0 {
            let chunk = left.min(block_size as u64) as usize;
            store.blocks.push(input.read_byte_vec(chunk)?);
            left -= chunk as u64;
        }
        store.next_write = store.blocks.last().map_or(block_size, Vec::len);
        Ok(store)
    }

    #[inline]
    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn position(&self) -> i64 {
        if self.blocks.is_empty() {
            0
        } else {
            ((self.blocks.len() - 1) * self.block_size + self.next_write) as i64
        }
    }

    #[inline]
    fn locate(&self, pos: i64) -> (usize, usize) {
        let pos = pos as usize;
        (pos >> self.block_bits, pos & self.block_mask)
    }

    #[inline]
    pub(crate) fn byte_at(&self, pos: i64) -> u8 {
        let (block, offset) = self.locate(pos);
        self.blocks[block][offset]
    }

    fn new_block(&mut self) {
        self.blocks.push(vec![0u8; self.block_size]);
        self.next_write = 0;
    }

    /// Overwrites one already written byte.
    pub fn write_byte_at(&mut self, dest: i64, b: u8) {
        assert!(dest >= 0 && dest < self.position(), "write at {dest} would grow the store");
        let (block, offset) = self.locate(dest);
        self.blocks[block][offset] = b;
    }

    /// Overwrites already written bytes starting at `dest`.
    pub fn write_bytes_at(&mut self, dest: i64, bytes: &[u8]) {
        let end = dest + bytes.len() as i64;
        assert!(dest >= 0 && end <= self.position(), "write to {dest}..{end} would grow the store");
        let mut written = 0;
        while written < bytes.len() {
            let (block, offset) = self.locate(dest + written as i64);
            let chunk = (self.block_size - offset).min(bytes.len() - written);
            self.blocks[block][offset..offset + chunk]
                .copy_from_slice(&bytes[written..written + chunk]);
            written += chunk;
        }
    }

    /// Copies `len` bytes from `src` to `dest` within the written region.
    /// The ranges may overlap as long as `src < dest`.
    pub fn copy_bytes(&mut self, src: i64, dest: i64, len: usize) {
        debug_assert!(src < dest);
        assert!(dest + len as i64 <= self.position());
        for i in (0..len as i64).rev() {
            let b = self.byte_at(src + i);
            self.write_byte_at(dest + i, b);
        }
    }

    /// Reverses the bytes in `src..=dest` in place.
    pub fn reverse(&mut self, src: i64, dest: i64) {
        assert!(src >= 0 && dest < self.position());
        let (mut lo, mut hi) = (src, dest);
        while lo < hi {
            let a = self.byte_at(lo);
            let b = self.byte_at(hi);
            self.write_byte_at(lo, b);
            self.write_byte_at(hi, a);
            lo += 1;
            hi -= 1;
        }
    }

    /// Appends `len` zero bytes, to be overwritten later.
    pub fn skip_bytes(&mut self, mut len: usize) {
        while len > 0 {
            if self.next_write == self.block_size {
                self.new_block();
            }
            let chunk = (self.block_size - self.next_write).min(len);
            self.next_write += chunk;
            len -= chunk;
        }
    }

    /// Discards everything from `new_len` on.
    pub fn truncate(&mut self, new_len: i64) {
        assert!(new_len >= 0 && new_len <= self.position());
        let mut block_index = (new_len >> self.block_bits) as i64;
        self.next_write = (new_len as usize) & self.block_mask;
        if self.next_write == 0 {
            block_index -= 1;
            self.next_write = self.block_size;
        }
        self.blocks.truncate((block_index + 1) as usize);
        // Reused bytes must read as zero again.
        let next_write = self.next_write;
        if let Some(last) = self.blocks.last_mut() {
            let start = next_write.min(last.len());
            last[start..].fill(0);
        }
        debug_assert_eq!(self.position(), new_len);
    }

    /// Trims the unused tail of the last page. The store stays writable.
    pub fn finish(&mut self) {
        let next_write = self.next_write;
        if let Some(last) = self.blocks.last_mut() {
            if next_write < last.len() {
                last.truncate(next_write);
                last.shrink_to_fit();
            }
        }
    }

    /// Writes the full contents to `out`.
    pub fn write_to<W: DataOutput + ?Sized>(&self, out: &mut W) {
        let Some((last, full)) = self.blocks.split_last() else {
            return;
        };
        for block in full {
            out.write_bytes(block);
        }
        out.write_bytes(&last[..self.next_write.min(last.len())]);
    }

    pub fn ram_bytes_used(&self) -> usize {
        self.blocks.iter().map(Vec::capacity).sum::<usize>() + std::mem::size_of::<Self>()
    }

    pub fn forward_reader(&self) -> ForwardReader<'_> {
        ForwardReader { store: self, pos: 0 }
    }

    pub fn reverse_reader(&self) -> ReverseReader<'_> {
        ReverseReader { store: self, pos: 0 }
    }
}

impl DataOutput for BytesStore {
    #[inline]
    fn write_byte(&mut self, b: u8) {
        if self.next_write == self.block_size {
            self.new_block();
        } else if let Some(last) = self.blocks.last() {
            // A finished page was trimmed; restore it to full size.
            if last.len() < self.block_size {
                let size = self.block_size;
                if let Some(last) = self.blocks.last_mut() {
                    last.resize(size, 0);
                }
            }
        }
        let next = self.next_write;
        if let Some(block) = self.blocks.last_mut() {
            block[next] = b;
        }
        self.next_write += 1;
    }

    fn write_bytes(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.next_write == self.block_size {
                self.new_block();
            }
            let chunk = (self.block_size - self.next_write).min(bytes.len());
            let next = self.next_write;
            let size = self.block_size;
            if let Some(block) = self.blocks.last_mut() {
                if block.len() < size {
                    block.resize(size, 0);
                }
                block[next..next + chunk].copy_from_slice(&bytes[..chunk]);
            }
            self.next_write += chunk;
            bytes = &bytes[chunk..];
        }
    }
}

impl std::fmt::Debug for BytesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BytesStore")
            .field("len", &self.position())
            .field("block_size", &self.block_size)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

/// Cursor over a [`BytesStore`] with absolute positioning.
///
/// Reverse readers decrement the position on every byte read.
pub trait BytesReader: DataInput {
    fn position(&self) -> i64;

    fn set_position(&mut self, pos: i64);

    /// Moves `count` bytes in the reading direction.
    fn skip_bytes(&mut self, count: i64);
}

#[inline]
fn checked_byte(store: &BytesStore, pos: i64) -> Result<u8, CodecError> {
    if pos < 0 || pos >= store.position() {
        return Err(CodecError::UnexpectedEof);
    }
    Ok(store.byte_at(pos))
}

/// Reader moving toward higher positions.
#[derive(Clone)]
pub struct ForwardReader<'a> {
    store: &'a BytesStore,
    pos: i64,
}

impl DataInput for ForwardReader<'_> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let b = checked_byte(self.store, self.pos)?;
        self.pos += 1;
        Ok(b)
    }
}

impl BytesReader for ForwardReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    #[inline]
    fn skip_bytes(&mut self, count: i64) {
        self.pos += count;
    }
}

/// Reader moving toward lower positions.
#[derive(Clone)]
pub struct ReverseReader<'a> {
    store: &'a BytesStore,
    pos: i64,
}

impl DataInput for ReverseReader<'_> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let b = checked_byte(self.store, self.pos)?;
        self.pos -= 1;
        Ok(b)
    }
}

impl BytesReader for ReverseReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        self.pos = pos;
    }

    #[inline]
    fn skip_bytes(&mut self, count: i64) {
        self.pos -= count;
    }
}

/// Either reader, chosen by the automaton's layout.
#[derive(Clone)]
pub enum StoreReader<'a> {
    Forward(ForwardReader<'a>),
    Reverse(ReverseReader<'a>),
}

impl DataInput for StoreReader<'_> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        match self {
            StoreReader::Forward(r) => r.read_byte(),
            StoreReader::Reverse(r) => r.read_byte(),
        }
    }
}

impl BytesReader for StoreReader<'_> {
    #[inline]
    fn position(&self) -> i64 {
        match self {
            StoreReader::Forward(r) => r.position(),
            StoreReader::Reverse(r) => r.position(),
        }
    }

    #[inline]
    fn set_position(&mut self, pos: i64) {
        match self {
            StoreReader::Forward(r) => r.set_position(pos),
            StoreReader::Reverse(r) => r.set_position(pos),
        }
    }

    #[inline]
    fn skip_bytes(&mut self, count: i64) {
        match self {
            StoreReader::Forward(r) => r.skip_bytes(count),
            StoreReader::Reverse(r) => r.skip_bytes(count),
        }
    }
}
