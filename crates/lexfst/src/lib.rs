//! Minimal acyclic finite state transducers.
//!
//! An [`Fst`] maps sorted integer label sequences (bytes, UTF-16 units or
//! code points) to values of a pluggable output algebra, storing shared
//! prefixes and shared suffixes only once. Automata are built once from
//! sorted input with [`Builder`], optionally packed into a smaller layout,
//! saved, loaded, and then queried concurrently.
//!
//! # Architecture
//!
//! - [`outputs`] -- Output algebras (byte/int sequences, non-negative ints, pairs, none)
//! - [`bytes_store`] -- Paged byte buffer with forward and reverse readers
//! - [`arc`] -- Arc record and flag bits of the node encoding
//! - [`fst`] -- Node encoding, traversal primitives, save/load
//! - [`node_hash`] -- Suffix deduplication during construction
//! - [`builder`] -- Incremental construction from sorted input
//! - [`config`] -- Builder and pack settings
//! - [`enumerator`] -- Ordered iteration with ceil/floor/exact seeks
//! - [`search`] -- Lookup, reverse lookup and top-N shortest paths
//! - [`dot`] -- Graphviz export
//!
//! ```
//! use lexfst::{Builder, InputType, outputs::PositiveIntOutputs, search};
//!
//! let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs);
//! builder.add_bytes(b"car", 2).unwrap();
//! builder.add_bytes(b"cat", 1).unwrap();
//! let fst = builder.finish().unwrap().unwrap();
//! assert_eq!(search::get_bytes(&fst, b"cat").unwrap(), Some(1));
//! ```

use lexfst_core::CodecError;

pub mod arc;
pub mod builder;
pub mod bytes_store;
pub mod config;
pub mod dot;
pub mod enumerator;
pub mod fst;
pub mod node_hash;
pub mod outputs;
mod pack;
pub mod search;

pub use arc::Arc;
pub use builder::Builder;
pub use config::{BuilderConfig, InputType, PackConfig};
pub use enumerator::{BytesFstEnum, InputOutput, IntsFstEnum};
pub use fst::Fst;

/// Error type for building, packing, saving and loading automata.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("FST is already finished")]
    AlreadyFinished,
    #[error("FST is not finished yet")]
    NotFinished,
    #[error("FST was not built with packing enabled")]
    NotBuiltForPacking,
    #[error("FST was built for packing; pack it before saving")]
    SavePrePacked,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("inputs must be added in strictly increasing order (input #{index} is out of order or duplicated)")]
    InputOutOfOrder { index: u64 },
    #[error("label {label} does not fit input type {input_type:?}")]
    LabelOutOfRange { label: i32, input_type: InputType },
    #[error("arc with label {label} points to a node that is not frozen yet")]
    UnfrozenTarget { label: i32 },
    #[error("arc is the last arc of its node")]
    NoNextArc,
    #[error("too many nodes for a packable FST")]
    TooManyNodes,
    #[error("packing did not converge after {passes} passes")]
    PackDidNotConverge { passes: usize },
    #[error("corrupt FST: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, FstError>;
