// Arc record and the flag bits of the node encoding

use std::fmt;

/// Arc is final: the path ending with it is accepted.
pub(crate) const BIT_FINAL_ARC: u8 = 1 << 0;
/// Last arc of its node.
pub(crate) const BIT_LAST_ARC: u8 = 1 << 1;
/// Target node is the one written immediately before this node.
pub(crate) const BIT_TARGET_NEXT: u8 = 1 << 2;
/// Target has no arcs; no target is encoded.
pub(crate) const BIT_STOP_NODE: u8 = 1 << 3;
pub(crate) const BIT_ARC_HAS_OUTPUT: u8 = 1 << 4;
pub(crate) const BIT_ARC_HAS_FINAL_OUTPUT: u8 = 1 << 5;
/// Packed layout only: target is encoded relative to the arc.
pub(crate) const BIT_TARGET_DELTA: u8 = 1 << 6;

/// Header byte of a fixed-stride arc array. Never a valid flag byte for the
/// first arc of a node, since a final output implies a final arc.
pub(crate) const ARCS_AS_FIXED_ARRAY: u8 = BIT_ARC_HAS_FINAL_OUTPUT;

/// A transition out of a node, decoded from the byte store.
///
/// Arc records are scratch state: traversal methods on
/// [`Fst`](crate::Fst) overwrite them in place. Clone one (or use
/// [`copy_from`](Arc::copy_from)) to keep a position across calls. A record
/// must not be shared between threads that traverse concurrently.
#[derive(Clone, PartialEq)]
pub struct Arc<V> {
    pub label: i32,
    pub output: V,
    /// Address or ordinal of the target node, or one of the end sentinels.
    pub target: i64,
    /// Output emitted when the path ends at this arc's target.
    pub next_final_output: V,
    /// Node this arc leaves, for reading later siblings.
    pub(crate) node: i64,
    pub(crate) flags: u8,
    pub(crate) next_arc: i64,
    /// Non-zero when the node is encoded as a fixed-stride array.
    pub(crate) pos_arcs_start: i64,
    pub(crate) bytes_per_arc: i64,
    pub(crate) arc_idx: i64,
    pub(crate) num_arcs: i64,
}

impl<V: Clone> Arc<V> {
    pub fn new(no_output: V) -> Self {
        Self {
            label: 0,
            output: no_output.clone(),
            target: 0,
            next_final_output: no_output,
            node: 0,
            flags: 0,
            next_arc: 0,
            pos_arcs_start: 0,
            bytes_per_arc: 0,
            arc_idx: 0,
            num_arcs: 0,
        }
    }

    /// Copies `other` into this record, reusing its allocations.
    pub fn copy_from(&mut self, other: &Arc<V>) {
        self.node = other.node;
        self.label = other.label;
        self.target = other.target;
        self.flags = other.flags;
        self.output.clone_from(&other.output);
        self.next_final_output.clone_from(&other.next_final_output);
        self.next_arc = other.next_arc;
        self.bytes_per_arc = other.bytes_per_arc;
        if other.bytes_per_arc != 0 {
            self.pos_arcs_start = other.pos_arcs_start;
            self.arc_idx = other.arc_idx;
            self.num_arcs = other.num_arcs;
        }
    }
}

impl<V> Arc<V> {
    #[inline]
    pub(crate) fn flag(&self, bit: u8) -> bool {
        self.flags & bit != 0
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.flag(BIT_LAST_ARC)
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.flag(BIT_FINAL_ARC)
    }

    /// Whether the target is a real node rather than an end sentinel.
    #[inline]
    pub fn target_has_arcs(&self) -> bool {
        self.target > 0
    }

    /// Whether this arc's node is encoded as a fixed-stride array.
    #[inline]
    pub fn in_array(&self) -> bool {
        self.bytes_per_arc != 0
    }
}

impl<V: fmt::Debug> fmt::Debug for Arc<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Arc");
        s.field("node", &self.node)
            .field("label", &self.label)
            .field("target", &self.target);
        if self.is_final() {
            s.field("final", &true);
        }
        if self.is_last() {
            s.field("last", &true);
        }
        if self.flag(BIT_TARGET_NEXT) {
            s.field("target_next", &true);
        }
        if self.flag(BIT_STOP_NODE) {
            s.field("stop", &true);
        }
        if self.flag(BIT_ARC_HAS_OUTPUT) {
            s.field("output", &self.output);
        }
        if self.flag(BIT_ARC_HAS_FINAL_OUTPUT) {
            s.field("final_output", &self.next_final_output);
        }
        if self.bytes_per_arc != 0 {
            s.field("arc_array", &format_args!("{} of {}", self.arc_idx, self.num_arcs));
        }
        s.finish()
    }
}
