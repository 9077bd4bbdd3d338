// Primitive binary I/O: single bytes, blocks, big-endian fixed-width
// integers and variable-length integers (7 bits per byte, high bit set on
// every byte except the last).

use crate::CodecError;

/// Sink for binary data.
///
/// Writes target in-memory buffers and cannot fail; only `write_byte` is
/// required, the rest are built on top of it.
pub trait DataOutput {
    fn write_byte(&mut self, b: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    /// Writes a 16-bit value, most significant byte first.
    fn write_short(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Writes a 32-bit value, most significant byte first.
    fn write_int(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Writes a variable-length 32-bit value (1 to 5 bytes).
    fn write_vint(&mut self, mut v: u32) {
        while v & !0x7F != 0 {
            self.write_byte(((v & 0x7F) | 0x80) as u8);
            v >>= 7;
        }
        self.write_byte(v as u8);
    }

    /// Writes a variable-length 64-bit value (1 to 10 bytes).
    fn write_vlong(&mut self, mut v: u64) {
        while v & !0x7F != 0 {
            self.write_byte(((v & 0x7F) | 0x80) as u8);
            v >>= 7;
        }
        self.write_byte(v as u8);
    }

    /// Writes a UTF-8 string prefixed by its byte length as a vint.
    fn write_string(&mut self, s: &str) {
        self.write_vint(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }
}

impl DataOutput for Vec<u8> {
    #[inline]
    fn write_byte(&mut self, b: u8) {
        self.push(b);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Source of binary data, the inverse of [`DataOutput`].
pub trait DataInput {
    fn read_byte(&mut self) -> Result<u8, CodecError>;

    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), CodecError> {
        for slot in dst.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }

    fn read_short(&mut self) -> Result<u16, CodecError> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_int(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        for slot in &mut buf {
            *slot = self.read_byte()?;
        }
        Ok(u32::from_be_bytes(buf))
    }

    fn read_vint(&mut self) -> Result<u32, CodecError> {
        let mut b = self.read_byte()?;
        let mut value = u32::from(b & 0x7F);
        let mut shift = 7;
        while b & 0x80 != 0 {
            b = self.read_byte()?;
            if shift == 28 && b & 0xF0 != 0 {
                return Err(CodecError::MalformedVarInt);
            }
            value |= u32::from(b & 0x7F) << shift;
            shift += 7;
        }
        Ok(value)
    }

    fn read_vlong(&mut self) -> Result<u64, CodecError> {
        let mut b = self.read_byte()?;
        let mut value = u64::from(b & 0x7F);
        let mut shift = 7;
        while b & 0x80 != 0 {
            b = self.read_byte()?;
            if shift == 63 && b & 0xFE != 0 {
                return Err(CodecError::MalformedVarInt);
            }
            value |= u64::from(b & 0x7F) << shift;
            shift += 7;
        }
        Ok(value)
    }

    /// Reads `len` bytes into a new buffer.
    ///
    /// The buffer grows as bytes arrive, so a length field larger than the
    /// stream fails with `UnexpectedEof` before it can allocate much.
    fn read_byte_vec(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        const CHUNK: usize = 8192;
        let mut buf = Vec::with_capacity(len.min(CHUNK));
        while buf.len() < len {
            let start = buf.len();
            buf.resize(start + (len - start).min(CHUNK), 0);
            self.read_bytes(&mut buf[start..])?;
        }
        Ok(buf)
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_vint()? as usize;
        let buf = self.read_byte_vec(len)?;
        String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Forward cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteArrayDataInput<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteArrayDataInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor. Positions past the end are clamped to the end.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// Number of bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn eof(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

impl DataInput for ByteArrayDataInput<'_> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let b = *self.bytes.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), CodecError> {
        let end = self.pos + dst.len();
        let src = self
            .bytes
            .get(self.pos..end)
            .ok_or(CodecError::UnexpectedEof)?;
        dst.copy_from_slice(src);
        self.pos = end;
        Ok(())
    }

    fn read_byte_vec(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        let buf = self.bytes[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(buf)
    }
}
