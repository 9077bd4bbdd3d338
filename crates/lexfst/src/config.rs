// Builder and pack configuration

use lexfst_core::packed::overhead;

use crate::{FstError, Result};

/// Default page size of the construction byte store (32 KiB).
pub const DEFAULT_BYTES_PAGE_BITS: u32 = 15;

/// Upper bound for page sizes when loading an automaton (1 GiB pages).
pub const DEFAULT_MAX_BLOCK_BITS: u32 = 30;

/// Width of the labels an automaton is built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputType {
    /// Labels `0..=255`, one byte each.
    Byte1,
    /// Labels `0..=65535`, stored as a big-endian short.
    Byte2,
    /// Any non-negative `i32`, stored as a vint.
    Byte4,
}

impl InputType {
    /// Tag byte used in the persisted header.
    pub fn tag(self) -> u8 {
        match self {
            InputType::Byte1 => 0,
            InputType::Byte2 => 1,
            InputType::Byte4 => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(InputType::Byte1),
            1 => Ok(InputType::Byte2),
            2 => Ok(InputType::Byte4),
            other => Err(FstError::Corrupt(format!("invalid input type tag {other}"))),
        }
    }

    /// Largest label this width can store.
    pub fn max_label(self) -> i32 {
        match self {
            InputType::Byte1 => 0xFF,
            InputType::Byte2 => 0xFFFF,
            InputType::Byte4 => i32::MAX,
        }
    }
}

/// Settings for [`Builder`](crate::Builder).
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderConfig {
    pub input_type: InputType,
    /// Deduplicate identical suffixes. Without this the result is a prefix
    /// trie, not a minimal automaton.
    pub share_suffix: bool,
    /// Also deduplicate nodes with more than one arc.
    pub share_non_singleton_nodes: bool,
    /// Only deduplicate suffixes at most this long.
    pub share_max_tail_length: usize,
    /// Address nodes by ordinal and pack the automaton on finish.
    pub will_pack: bool,
    /// Overhead ratio for the packed tables, see [`overhead`].
    pub acceptable_overhead_ratio: f32,
    /// Allow fixed-stride arc arrays for wide nodes.
    pub allow_array_arcs: bool,
    /// log2 of the byte store page size during construction.
    pub bytes_page_bits: u32,
}

impl BuilderConfig {
    pub fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            share_suffix: true,
            share_non_singleton_nodes: true,
            share_max_tail_length: usize::MAX,
            will_pack: false,
            acceptable_overhead_ratio: overhead::COMPACT,
            allow_array_arcs: true,
            bytes_page_bits: DEFAULT_BYTES_PAGE_BITS,
        }
    }

    /// Enables packing on finish with the given overhead ratio.
    pub fn with_packing(mut self, acceptable_overhead_ratio: f32) -> Self {
        self.will_pack = true;
        self.acceptable_overhead_ratio = acceptable_overhead_ratio;
        self
    }

    /// Disables suffix sharing, producing a prefix trie.
    pub fn without_suffix_sharing(mut self) -> Self {
        self.share_suffix = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=30).contains(&self.bytes_page_bits) {
            return Err(FstError::InvalidConfig(format!(
                "bytes_page_bits must be in 1..=30, got {}",
                self.bytes_page_bits
            )));
        }
        validate_ratio(self.acceptable_overhead_ratio)
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::new(InputType::Byte1)
    }
}

/// Settings for [`Fst::pack`](crate::Fst::pack).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackConfig {
    /// Only nodes with at least this many incoming arcs are dereferenced.
    pub min_in_count_deref: u64,
    /// Size of the dereference table.
    pub max_deref_nodes: usize,
    pub acceptable_overhead_ratio: f32,
}

impl PackConfig {
    /// The settings [`Builder`](crate::Builder) uses for an automaton with
    /// `node_count` nodes.
    pub fn for_node_count(node_count: u64, acceptable_overhead_ratio: f32) -> Self {
        Self {
            min_in_count_deref: 3,
            max_deref_nodes: usize::try_from(node_count / 4).unwrap_or(usize::MAX).max(10),
            acceptable_overhead_ratio,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_ratio(self.acceptable_overhead_ratio)
    }
}

fn validate_ratio(ratio: f32) -> Result<()> {
    if !(overhead::COMPACT..=overhead::FASTEST).contains(&ratio) {
        return Err(FstError::InvalidConfig(format!(
            "acceptable_overhead_ratio must be in 0.0..=7.0, got {ratio}"
        )));
    }
    Ok(())
}
