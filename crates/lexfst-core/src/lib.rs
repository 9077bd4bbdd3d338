//! Shared building blocks for the lexfst workspace.
//!
//! This crate knows nothing about automata. It provides the binary
//! collaborator the transducer engine persists itself through, plus a few
//! small utilities that several crates need.
//!
//! # Architecture
//!
//! - [`data_io`] -- Byte, fixed-width and variable-length integer I/O traits
//! - [`codec`] -- Versioned file header (magic, codec name, version)
//! - [`packed`] -- Bit-packed integer arrays with on-demand widening
//! - [`labels`] -- Conversions between text and integer label sequences

pub mod codec;
pub mod data_io;
pub mod labels;
pub mod packed;

/// Error type for decoding binary data.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("malformed variable-length integer (too many bytes)")]
    MalformedVarInt,
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid header magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },
    #[error("codec mismatch: expected {expected:?}, got {actual:?}")]
    CodecMismatch { expected: String, actual: String },
    #[error("format version {version} is too old (oldest supported is {min})")]
    FormatTooOld { version: u32, min: u32 },
    #[error("format version {version} is too new (newest supported is {max})")]
    FormatTooNew { version: u32, max: u32 },
}
