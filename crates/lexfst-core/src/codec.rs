// Versioned file header: magic, codec name, version

use crate::CodecError;
use crate::data_io::{DataInput, DataOutput};

/// Magic number opening every header (written big-endian).
pub const CODEC_MAGIC: u32 = 0x3FD7_6C17;

/// Writes a header identifying `codec` at `version`.
///
/// `codec` must be short ASCII; it is stored as a length-prefixed string.
pub fn write_header<W: DataOutput + ?Sized>(out: &mut W, codec: &str, version: u32) {
    debug_assert!(codec.is_ascii() && codec.len() < 128);
    out.write_int(CODEC_MAGIC);
    out.write_string(codec);
    out.write_int(version);
}

/// Reads and validates a header, returning the stored version.
///
/// Versions outside `min_version..=max_version` are rejected with
/// [`CodecError::FormatTooOld`] or [`CodecError::FormatTooNew`].
pub fn check_header<R: DataInput + ?Sized>(
    input: &mut R,
    codec: &str,
    min_version: u32,
    max_version: u32,
) -> Result<u32, CodecError> {
    let magic = input.read_int()?;
    if magic != CODEC_MAGIC {
        return Err(CodecError::InvalidMagic {
            expected: CODEC_MAGIC,
            actual: magic,
        });
    }
    let actual = input.read_string()?;
    if actual != codec {
        return Err(CodecError::CodecMismatch {
            expected: codec.to_string(),
            actual,
        });
    }
    let version = input.read_int()?;
    if version < min_version {
        return Err(CodecError::FormatTooOld {
            version,
            min: min_version,
        });
    }
    if version > max_version {
        return Err(CodecError::FormatTooNew {
            version,
            max: max_version,
        });
    }
    Ok(version)
}
