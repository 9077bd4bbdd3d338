// FST core: node encoding, construction, arc traversal and persistence.
//
// Nodes are frozen one at a time into a BytesStore, deepest suffixes first.
// Each node is written arc by arc, optionally expanded into a fixed-stride
// array, and then reversed in place so that a reverse reader sees its bytes
// in forward order. Packed automata (see pack.rs) are laid out forward and
// read with a forward reader instead.

use std::path::Path;

use lexfst_core::codec;
use lexfst_core::data_io::{ByteArrayDataInput, DataInput, DataOutput};
use lexfst_core::packed::{GrowableWriter, PackedInts, oversize};

use crate::arc::{
    ARCS_AS_FIXED_ARRAY, Arc, BIT_ARC_HAS_FINAL_OUTPUT, BIT_ARC_HAS_OUTPUT, BIT_FINAL_ARC,
    BIT_LAST_ARC, BIT_STOP_NODE, BIT_TARGET_DELTA, BIT_TARGET_NEXT,
};
use crate::builder::UnCompiledNode;
use crate::bytes_store::{BytesReader, BytesStore, StoreReader};
use crate::config::{DEFAULT_MAX_BLOCK_BITS, InputType};
use crate::outputs::Outputs;
use crate::{FstError, Result};

/// Target of a final arc whose node has no outgoing arcs.
pub const FINAL_END_NODE: i64 = -1;
/// Target of a non-final arc whose node has no outgoing arcs.
pub const NON_FINAL_END_NODE: i64 = 0;
/// Label of the pseudo arc that ends an accepted path.
pub const END_LABEL: i32 = -1;

/// Nodes this close to the root become arrays at a lower arc count.
pub(crate) const FIXED_ARRAY_SHALLOW_DISTANCE: usize = 3;
pub(crate) const FIXED_ARRAY_NUM_ARCS_SHALLOW: usize = 5;
pub(crate) const FIXED_ARRAY_NUM_ARCS_DEEP: usize = 10;

const FILE_FORMAT_NAME: &str = "FST";
/// Oldest readable format: 32-bit targets and array strides.
pub(crate) const VERSION_PACKED: u32 = 3;
/// Targets and array strides as variable-length ints.
pub(crate) const VERSION_VINT_TARGET: u32 = 4;
pub(crate) const VERSION_CURRENT: u32 = VERSION_VINT_TARGET;

/// Number of root arcs, by label, kept decoded in memory.
const ROOT_ARC_CACHE_SIZE: usize = 0x80;

/// Largest array header: flag byte plus two 5-byte vints.
const MAX_ARRAY_HEADER_SIZE: usize = 11;

/// A finite state transducer with outputs from algebra `O`.
///
/// Built through [`Builder`](crate::Builder) or loaded with
/// [`Fst::load`]. Once finished it is immutable and can be read from
/// several threads at once, each using its own reader and arcs.
pub struct Fst<O: Outputs> {
    pub(crate) input_type: InputType,
    pub(crate) outputs: O,
    pub(crate) bytes: BytesStore,
    pub(crate) empty_output: Option<O::Value>,
    /// Start node, or -1 until finished.
    pub(crate) start_node: i64,
    last_frozen_node: i64,
    pub(crate) node_count: i64,
    pub(crate) arc_count: i64,
    pub(crate) arc_with_output_count: i64,
    pub(crate) packed: bool,
    /// Packed layout: addresses of the most referenced nodes.
    pub(crate) node_ref_to_address: Option<PackedInts>,
    allow_array_arcs: bool,
    cached_root_arcs: Vec<Option<Arc<O::Value>>>,
    /// Will-pack mode: byte address of each node ordinal.
    pub(crate) node_address: Option<GrowableWriter>,
    /// Will-pack mode: incoming arc count of each node ordinal.
    pub(crate) in_counts: Option<GrowableWriter>,
    version: u32,
    bytes_per_arc: Vec<i64>,
}

impl<O: Outputs> Fst<O> {
    /// Empty automaton ready for [`add_node`](Fst::add_node).
    pub(crate) fn for_building(
        input_type: InputType,
        outputs: O,
        will_pack: bool,
        acceptable_overhead_ratio: f32,
        allow_array_arcs: bool,
        bytes_page_bits: u32,
    ) -> Self {
        let mut bytes = BytesStore::new(bytes_page_bits);
        // Address 0 is reserved for the non-final end node.
        bytes.write_byte(0);
        let (node_address, in_counts) = if will_pack {
            (
                Some(GrowableWriter::new(15, 8, acceptable_overhead_ratio)),
                Some(GrowableWriter::new(1, 8, acceptable_overhead_ratio)),
            )
        } else {
            (None, None)
        };
        Self {
            input_type,
            outputs,
            bytes,
            empty_output: None,
            start_node: -1,
            last_frozen_node: 0,
            node_count: 0,
            arc_count: 0,
            arc_with_output_count: 0,
            packed: false,
            node_ref_to_address: None,
            allow_array_arcs,
            cached_root_arcs: Vec::new(),
            node_address,
            in_counts,
            version: VERSION_CURRENT,
            bytes_per_arc: Vec::new(),
        }
    }

    /// Empty packed automaton; the caller writes the bytes directly.
    pub(crate) fn for_packing(input_type: InputType, outputs: O, block_bits: u32) -> Self {
        let mut fst = Self::for_building(input_type, outputs, false, 0.0, false, block_bits);
        fst.packed = true;
        fst
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Output of the empty input, if the empty input is accepted.
    pub fn empty_output(&self) -> Option<&O::Value> {
        self.empty_output.as_ref()
    }

    pub(crate) fn set_empty_output(&mut self, output: O::Value) {
        self.empty_output = Some(output);
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.start_node != -1
    }

    /// Number of nodes, counting the shared end node.
    pub fn node_count(&self) -> u64 {
        1 + self.node_count as u64
    }

    pub fn arc_count(&self) -> u64 {
        self.arc_count as u64
    }

    pub fn arc_with_output_count(&self) -> u64 {
        self.arc_with_output_count as u64
    }

    /// Approximate memory used, in bytes.
    pub fn size_in_bytes(&self) -> usize {
        let mut size = self.bytes.ram_bytes_used();
        if let Some(table) = &self.node_ref_to_address {
            size += table.ram_bytes_used();
        }
        if let (Some(addresses), Some(counts)) = (&self.node_address, &self.in_counts) {
            size += addresses.ram_bytes_used() + counts.ram_bytes_used();
        }
        size
    }

    /// Reader suited to this automaton's layout.
    pub fn bytes_reader(&self) -> StoreReader<'_> {
        if self.packed {
            StoreReader::Forward(self.bytes.forward_reader())
        } else {
            StoreReader::Reverse(self.bytes.reverse_reader())
        }
    }

    /// Fresh scratch arc.
    pub fn new_arc(&self) -> Arc<O::Value> {
        Arc::new(self.outputs.no_output())
    }

    #[inline]
    fn node_address_of(&self, node: i64) -> i64 {
        match &self.node_address {
            Some(addresses) => addresses.get(node as usize) as i64,
            None => node,
        }
    }

    pub(crate) fn read_label<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<i32> {
        let label = match self.input_type {
            InputType::Byte1 => i32::from(input.read_byte()?),
            InputType::Byte2 => i32::from(input.read_short()?),
            InputType::Byte4 => input.read_vint()? as i32,
        };
        Ok(label)
    }

    fn read_array_stride<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<i64> {
        let stride = if self.packed || self.version >= VERSION_VINT_TARGET {
            input.read_vint()?
        } else {
            input.read_int()?
        };
        Ok(i64::from(stride))
    }

    fn read_unpacked_target<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<i64> {
        let target = if self.version < VERSION_VINT_TARGET {
            i64::from(input.read_int()? as i32)
        } else {
            input.read_vlong()? as i64
        };
        Ok(target)
    }

    fn should_expand(&self, node: &UnCompiledNode<O::Value>) -> bool {
        let num_arcs = node.arcs.len();
        self.allow_array_arcs
            && ((node.depth <= FIXED_ARRAY_SHALLOW_DISTANCE
                && num_arcs >= FIXED_ARRAY_NUM_ARCS_SHALLOW)
                || num_arcs >= FIXED_ARRAY_NUM_ARCS_DEEP)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Freezes `node` into the byte store and returns its address (or its
    /// ordinal in will-pack mode).
    ///
    /// Nodes without arcs are never written; they map to
    /// [`FINAL_END_NODE`] or [`NON_FINAL_END_NODE`]. Every arc target must
    /// already be frozen.
    pub fn add_node(&mut self, node: &UnCompiledNode<O::Value>) -> Result<i64> {
        if self.is_finished() {
            return Err(FstError::AlreadyFinished);
        }
        let num_arcs = node.arcs.len();
        if num_arcs == 0 {
            return Ok(if node.is_final {
                FINAL_END_NODE
            } else {
                NON_FINAL_END_NODE
            });
        }

        let start_address = self.bytes.position();
        let do_fixed_array = self.should_expand(node);
        if do_fixed_array && self.bytes_per_arc.len() < num_arcs {
            self.bytes_per_arc.resize(oversize(num_arcs), 0);
        }

        let mut last_arc_start = start_address;
        let mut max_bytes_per_arc = 0i64;
        for (arc_idx, arc) in node.arcs.iter().enumerate() {
            let target = arc.frozen_target()?;
            let mut flags = 0u8;
            if arc_idx == num_arcs - 1 {
                flags |= BIT_LAST_ARC;
            }
            if self.last_frozen_node == target && !do_fixed_array {
                flags |= BIT_TARGET_NEXT;
            }
            let has_final_output = arc.is_final && !self.outputs.is_no_output(&arc.next_final_output);
            if arc.is_final {
                flags |= BIT_FINAL_ARC;
                if has_final_output {
                    flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                }
            } else {
                debug_assert!(self.outputs.is_no_output(&arc.next_final_output));
            }

            let target_has_arcs = target > 0;
            if !target_has_arcs {
                flags |= BIT_STOP_NODE;
            } else if let Some(in_counts) = &mut self.in_counts {
                let slot = target as usize;
                in_counts.set(slot, in_counts.get(slot) + 1);
            }

            let has_output = !self.outputs.is_no_output(&arc.output);
            if has_output {
                flags |= BIT_ARC_HAS_OUTPUT;
            }

            self.bytes.write_byte(flags);
            write_label(self.input_type, &mut self.bytes, arc.label)?;
            if has_output {
                self.outputs.write(&arc.output, &mut self.bytes);
                self.arc_with_output_count += 1;
            }
            if has_final_output {
                self.outputs.write_final_output(&arc.next_final_output, &mut self.bytes);
            }
            if target_has_arcs && flags & BIT_TARGET_NEXT == 0 {
                self.bytes.write_vlong(target as u64);
            }

            if do_fixed_array {
                let len = self.bytes.position() - last_arc_start;
                self.bytes_per_arc[arc_idx] = len;
                last_arc_start = self.bytes.position();
                max_bytes_per_arc = max_bytes_per_arc.max(len);
            }
        }
        self.arc_count += num_arcs as i64;

        if do_fixed_array {
            debug_assert!(max_bytes_per_arc > 0);
            let mut header = Vec::with_capacity(MAX_ARRAY_HEADER_SIZE);
            header.write_byte(ARCS_AS_FIXED_ARRAY);
            header.write_vint(num_arcs as u32);
            header.write_vint(max_bytes_per_arc as u32);
            let header_len = header.len() as i64;

            // Expand arcs to the uniform stride, back to front so that no
            // arc is overwritten before it has been moved.
            let fixed_array_start = start_address + header_len;
            let mut src_pos = self.bytes.position();
            let mut dest_pos = fixed_array_start + num_arcs as i64 * max_bytes_per_arc;
            debug_assert!(dest_pos >= src_pos);
            if dest_pos > src_pos {
                self.bytes.skip_bytes((dest_pos - src_pos) as usize);
                for arc_idx in (0..num_arcs).rev() {
                    dest_pos -= max_bytes_per_arc;
                    src_pos -= self.bytes_per_arc[arc_idx];
                    if src_pos != dest_pos {
                        debug_assert!(dest_pos > src_pos);
                        let len = self.bytes_per_arc[arc_idx] as usize;
                        self.bytes.copy_bytes(src_pos, dest_pos, len);
                    }
                }
            }
            self.bytes.write_bytes_at(start_address, &header);
        }

        let this_node_address = self.bytes.position() - 1;
        self.bytes.reverse(start_address, this_node_address);

        let node_ref = match (&mut self.node_address, &mut self.in_counts) {
            (Some(addresses), Some(in_counts)) => {
                if self.node_count == i64::from(i32::MAX) {
                    return Err(FstError::TooManyNodes);
                }
                self.node_count += 1;
                let ordinal = self.node_count as usize;
                if ordinal == addresses.len() {
                    addresses.resize(oversize(addresses.len() + 1));
                    in_counts.resize(oversize(in_counts.len() + 1));
                }
                addresses.set(ordinal, this_node_address as u64);
                self.node_count
            }
            _ => {
                self.node_count += 1;
                this_node_address
            }
        };
        self.last_frozen_node = node_ref;
        Ok(node_ref)
    }

    /// Seals the automaton with `start_node` as its root and caches the
    /// root arcs.
    pub fn finish(&mut self, start_node: i64) -> Result<()> {
        if self.is_finished() {
            return Err(FstError::AlreadyFinished);
        }
        let start_node = if start_node == FINAL_END_NODE && self.empty_output.is_some() {
            0
        } else {
            start_node
        };
        self.start_node = start_node;
        self.bytes.finish();
        self.cache_root_arcs()?;
        tracing::debug!(
            nodes = self.node_count(),
            arcs = self.arc_count,
            bytes = self.bytes.position(),
            "finished FST"
        );
        Ok(())
    }

    pub(crate) fn cache_root_arcs(&mut self) -> Result<()> {
        let mut arcs = vec![None; ROOT_ARC_CACHE_SIZE];
        self.read_root_arcs(&mut arcs)?;
        self.cached_root_arcs = arcs;
        Ok(())
    }

    /// Decodes the root arcs whose label is below `arcs.len()` into `arcs`,
    /// indexed by label.
    pub fn read_root_arcs(&self, arcs: &mut [Option<Arc<O::Value>>]) -> Result<()> {
        let mut arc = self.first_arc();
        let mut input = self.bytes_reader();
        if !arc.target_has_arcs() {
            return Ok(());
        }
        let root = arc.target;
        self.read_first_real_target_arc(root, &mut arc, &mut input)?;
        loop {
            debug_assert_ne!(arc.label, END_LABEL);
            match usize::try_from(arc.label) {
                Ok(slot) if slot < arcs.len() => arcs[slot] = Some(arc.clone()),
                _ => break,
            }
            if arc.is_last() {
                break;
            }
            self.read_next_real_arc(&mut arc, &mut input)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Fills `arc` with the virtual arc leading into the start node.
    pub fn get_first_arc(&self, arc: &mut Arc<O::Value>) {
        match &self.empty_output {
            Some(empty) => {
                arc.flags = BIT_FINAL_ARC | BIT_LAST_ARC;
                arc.next_final_output.clone_from(empty);
                if !self.outputs.is_no_output(empty) {
                    arc.flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                }
            }
            None => {
                arc.flags = BIT_LAST_ARC;
                arc.next_final_output = self.outputs.no_output();
            }
        }
        arc.output = self.outputs.no_output();
        // An automaton accepting only the empty input starts at node 0.
        arc.target = self.start_node;
    }

    /// The virtual arc leading into the start node.
    pub fn first_arc(&self) -> Arc<O::Value> {
        let mut arc = self.new_arc();
        self.get_first_arc(&mut arc);
        arc
    }

    /// Follows `follow` and reads the last arc of its target into `arc`.
    ///
    /// If `follow` is final and its target has no arcs, `arc` becomes the
    /// [`END_LABEL`] pseudo arc.
    pub fn read_last_target_arc<R: BytesReader + ?Sized>(
        &self,
        follow: &Arc<O::Value>,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<()> {
        if !follow.target_has_arcs() {
            debug_assert!(follow.is_final());
            arc.label = END_LABEL;
            arc.target = FINAL_END_NODE;
            arc.output.clone_from(&follow.next_final_output);
            arc.flags = BIT_LAST_ARC;
            return Ok(());
        }
        input.set_position(self.node_address_of(follow.target));
        arc.node = follow.target;
        let b = input.read_byte()?;
        if b == ARCS_AS_FIXED_ARRAY {
            arc.num_arcs = i64::from(input.read_vint()?);
            arc.bytes_per_arc = self.read_array_stride(input)?;
            arc.pos_arcs_start = input.position();
            arc.arc_idx = arc.num_arcs - 2;
        } else {
            arc.flags = b;
            arc.bytes_per_arc = 0;
            while !arc.is_last() {
                self.read_label(input)?;
                if arc.flag(BIT_ARC_HAS_OUTPUT) {
                    self.outputs.skip_output(input)?;
                }
                if arc.flag(BIT_ARC_HAS_FINAL_OUTPUT) {
                    self.outputs.skip_final_output(input)?;
                }
                if !arc.flag(BIT_STOP_NODE) && !arc.flag(BIT_TARGET_NEXT) {
                    if self.packed {
                        input.read_vlong()?;
                    } else {
                        self.read_unpacked_target(input)?;
                    }
                }
                arc.flags = input.read_byte()?;
            }
            // Step back onto the last arc's flag byte.
            input.skip_bytes(-1);
            arc.next_arc = input.position();
        }
        self.read_next_real_arc(arc, input)?;
        debug_assert!(arc.is_last());
        Ok(())
    }

    /// Follows `follow` and reads the first arc of its target into `arc`.
    ///
    /// A final `follow` yields the [`END_LABEL`] pseudo arc first, carrying
    /// the final output.
    pub fn read_first_target_arc<R: BytesReader + ?Sized>(
        &self,
        follow: &Arc<O::Value>,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<()> {
        if follow.is_final() {
            arc.output.clone_from(&follow.next_final_output);
            arc.flags = BIT_FINAL_ARC;
            if follow.target <= 0 {
                arc.flags |= BIT_LAST_ARC;
            } else {
                arc.node = follow.target;
                // The next real arc is the first arc of this node.
                arc.next_arc = follow.target;
            }
            arc.target = FINAL_END_NODE;
            arc.label = END_LABEL;
            Ok(())
        } else {
            self.read_first_real_target_arc(follow.target, arc, input)
        }
    }

    /// Reads the first real arc of `node` into `arc`, ignoring finality.
    pub fn read_first_real_target_arc<R: BytesReader + ?Sized>(
        &self,
        node: i64,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<()> {
        let address = self.node_address_of(node);
        input.set_position(address);
        arc.node = node;
        if input.read_byte()? == ARCS_AS_FIXED_ARRAY {
            arc.num_arcs = i64::from(input.read_vint()?);
            arc.bytes_per_arc = self.read_array_stride(input)?;
            arc.arc_idx = -1;
            arc.pos_arcs_start = input.position();
            arc.next_arc = arc.pos_arcs_start;
        } else {
            arc.next_arc = address;
            arc.bytes_per_arc = 0;
        }
        self.read_next_real_arc(arc, input)
    }

    /// Whether `follow`'s target node is encoded as a fixed-stride array.
    pub fn is_expanded_target<R: BytesReader + ?Sized>(
        &self,
        follow: &Arc<O::Value>,
        input: &mut R,
    ) -> Result<bool> {
        if !follow.target_has_arcs() {
            return Ok(false);
        }
        input.set_position(self.node_address_of(follow.target));
        Ok(input.read_byte()? == ARCS_AS_FIXED_ARRAY)
    }

    /// Advances `arc` to its next sibling, stepping from the
    /// [`END_LABEL`] pseudo arc onto the node's first real arc.
    pub fn read_next_arc<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<()> {
        if arc.label == END_LABEL {
            if arc.next_arc <= 0 {
                return Err(FstError::NoNextArc);
            }
            let node = arc.next_arc;
            self.read_first_real_target_arc(node, arc, input)
        } else {
            self.read_next_real_arc(arc, input)
        }
    }

    /// Label of the sibling after `arc`, without moving `arc`.
    pub fn read_next_arc_label<R: BytesReader + ?Sized>(
        &self,
        arc: &Arc<O::Value>,
        input: &mut R,
    ) -> Result<i32> {
        debug_assert!(!arc.is_last());
        if arc.label == END_LABEL {
            let pos = self.node_address_of(arc.next_arc);
            input.set_position(pos);
            if input.read_byte()? == ARCS_AS_FIXED_ARRAY {
                input.read_vint()?;
                self.read_array_stride(input)?;
            } else {
                input.set_position(pos);
            }
        } else if arc.bytes_per_arc != 0 {
            input.set_position(arc.pos_arcs_start);
            input.skip_bytes((1 + arc.arc_idx) * arc.bytes_per_arc);
        } else {
            input.set_position(arc.next_arc);
        }
        input.read_byte()?;
        self.read_label(input)
    }

    /// Decodes the arc following `arc` within the same node. Never
    /// returns the [`END_LABEL`] pseudo arc.
    pub fn read_next_real_arc<R: BytesReader + ?Sized>(
        &self,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<()> {
        if arc.bytes_per_arc != 0 {
            arc.arc_idx += 1;
            debug_assert!(arc.arc_idx < arc.num_arcs);
            input.set_position(arc.pos_arcs_start);
            input.skip_bytes(arc.arc_idx * arc.bytes_per_arc);
        } else {
            input.set_position(arc.next_arc);
        }
        arc.flags = input.read_byte()?;
        arc.label = self.read_label(input)?;

        arc.output = if arc.flag(BIT_ARC_HAS_OUTPUT) {
            self.outputs.read(input)?
        } else {
            self.outputs.no_output()
        };
        arc.next_final_output = if arc.flag(BIT_ARC_HAS_FINAL_OUTPUT) {
            self.outputs.read_final_output(input)?
        } else {
            self.outputs.no_output()
        };

        if arc.flag(BIT_STOP_NODE) {
            arc.target = if arc.flag(BIT_FINAL_ARC) {
                FINAL_END_NODE
            } else {
                NON_FINAL_END_NODE
            };
            arc.next_arc = input.position();
        } else if arc.flag(BIT_TARGET_NEXT) {
            arc.next_arc = input.position();
            if self.node_address.is_none() {
                if !arc.flag(BIT_LAST_ARC) {
                    if arc.bytes_per_arc == 0 {
                        self.seek_to_next_node(input)?;
                    } else {
                        input.set_position(arc.pos_arcs_start);
                        input.skip_bytes(arc.bytes_per_arc * arc.num_arcs);
                    }
                }
                arc.target = input.position();
            } else {
                arc.target = arc.node - 1;
                debug_assert!(arc.target > 0);
            }
        } else {
            arc.target = if self.packed {
                let pos = input.position();
                let code = input.read_vlong()? as i64;
                self.decode_packed_target(arc.flag(BIT_TARGET_DELTA), pos, code)?
            } else {
                self.read_unpacked_target(input)?
            };
            arc.next_arc = input.position();
        }
        Ok(())
    }

    fn decode_packed_target(&self, delta: bool, pos: i64, code: i64) -> Result<i64> {
        if code < 0 {
            return Err(FstError::Corrupt(format!("packed target code {code} overflows")));
        }
        if delta {
            return Ok(pos + code);
        }
        match &self.node_ref_to_address {
            Some(table) if code < table.len() as i64 => Ok(table.get(code as usize) as i64),
            Some(table) => Ok(code - table.len() as i64),
            None => Ok(code),
        }
    }

    /// Finds the arc leaving `follow`'s target with label `label`.
    ///
    /// Returns `Ok(false)` when there is no such arc. Root lookups for
    /// labels below 128 are answered from the root arc cache.
    pub fn find_target_arc<R: BytesReader + ?Sized>(
        &self,
        label: i32,
        follow: &Arc<O::Value>,
        arc: &mut Arc<O::Value>,
        input: &mut R,
    ) -> Result<bool> {
        if label == END_LABEL {
            if !follow.is_final() {
                return Ok(false);
            }
            if follow.target <= 0 {
                arc.flags = BIT_LAST_ARC;
            } else {
                arc.flags = 0;
                arc.next_arc = follow.target;
                arc.node = follow.target;
            }
            arc.output.clone_from(&follow.next_final_output);
            arc.target = FINAL_END_NODE;
            arc.label = END_LABEL;
            return Ok(true);
        }

        if follow.target == self.start_node {
            if let Ok(slot) = usize::try_from(label) {
                if slot < self.cached_root_arcs.len() {
                    return Ok(match &self.cached_root_arcs[slot] {
                        Some(cached) => {
                            arc.copy_from(cached);
                            true
                        }
                        None => false,
                    });
                }
            }
        }

        if !follow.target_has_arcs() {
            return Ok(false);
        }

        input.set_position(self.node_address_of(follow.target));
        arc.node = follow.target;
        if input.read_byte()? == ARCS_AS_FIXED_ARRAY {
            arc.num_arcs = i64::from(input.read_vint()?);
            arc.bytes_per_arc = self.read_array_stride(input)?;
            arc.pos_arcs_start = input.position();
            let mut low = 0i64;
            let mut high = arc.num_arcs - 1;
            while low <= high {
                let mid = (low + high) >> 1;
                input.set_position(arc.pos_arcs_start);
                input.skip_bytes(arc.bytes_per_arc * mid + 1);
                let mid_label = self.read_label(input)?;
                match mid_label.cmp(&label) {
                    std::cmp::Ordering::Less => low = mid + 1,
                    std::cmp::Ordering::Greater => high = mid - 1,
                    std::cmp::Ordering::Equal => {
                        arc.arc_idx = mid - 1;
                        self.read_next_real_arc(arc, input)?;
                        return Ok(true);
                    }
                }
            }
            return Ok(false);
        }

        self.read_first_real_target_arc(follow.target, arc, input)?;
        loop {
            if arc.label == label {
                return Ok(true);
            } else if arc.label > label || arc.is_last() {
                return Ok(false);
            }
            self.read_next_real_arc(arc, input)?;
        }
    }

    /// Skips the remaining arcs of a linearly encoded node.
    fn seek_to_next_node<R: BytesReader + ?Sized>(&self, input: &mut R) -> Result<()> {
        loop {
            let flags = input.read_byte()?;
            self.read_label(input)?;
            if flags & BIT_ARC_HAS_OUTPUT != 0 {
                self.outputs.skip_output(input)?;
            }
            if flags & BIT_ARC_HAS_FINAL_OUTPUT != 0 {
                self.outputs.skip_final_output(input)?;
            }
            if flags & BIT_STOP_NODE == 0 && flags & BIT_TARGET_NEXT == 0 {
                if self.packed {
                    input.read_vlong()?;
                } else {
                    self.read_unpacked_target(input)?;
                }
            }
            if flags & BIT_LAST_ARC != 0 {
                return Ok(());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serializes the automaton.
    pub fn save<W: DataOutput + ?Sized>(&self, out: &mut W) -> Result<()> {
        if !self.is_finished() {
            return Err(FstError::NotFinished);
        }
        if self.node_address.is_some() {
            return Err(FstError::SavePrePacked);
        }
        codec::write_header(out, FILE_FORMAT_NAME, self.version);
        out.write_byte(u8::from(self.packed));
        match &self.empty_output {
            Some(empty) => {
                out.write_byte(1);
                let mut encoded = Vec::new();
                self.outputs.write_final_output(empty, &mut encoded);
                if !self.packed {
                    encoded.reverse();
                }
                out.write_vint(encoded.len() as u32);
                out.write_bytes(&encoded);
            }
            None => out.write_byte(0),
        }
        out.write_byte(self.input_type.tag());
        if self.packed {
            let table = self
                .node_ref_to_address
                .as_ref()
                .ok_or_else(|| FstError::Corrupt("packed FST without dereference table".into()))?;
            out.write_vint(table.bits_per_value());
            out.write_vint(table.len() as u32);
            for i in 0..table.len() {
                out.write_vlong(table.get(i));
            }
        }
        out.write_vlong(self.start_node as u64);
        out.write_vlong(self.node_count as u64);
        out.write_vlong(self.arc_count as u64);
        out.write_vlong(self.arc_with_output_count as u64);
        out.write_vlong(self.bytes.position() as u64);
        self.bytes.write_to(out);
        Ok(())
    }

    /// Serializes into a new byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        Ok(buf)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Loads an automaton saved by [`save`](Fst::save).
    pub fn load<R: DataInput + ?Sized>(input: &mut R, outputs: O) -> Result<Self> {
        Self::load_with_max_block_bits(input, outputs, DEFAULT_MAX_BLOCK_BITS)
    }

    /// Like [`load`](Fst::load), but caps byte store pages at
    /// `1 << max_block_bits` bytes.
    pub fn load_with_max_block_bits<R: DataInput + ?Sized>(
        input: &mut R,
        outputs: O,
        max_block_bits: u32,
    ) -> Result<Self> {
        if !(1..=30).contains(&max_block_bits) {
            return Err(FstError::InvalidConfig(format!(
                "max_block_bits must be in 1..=30, got {max_block_bits}"
            )));
        }
        let version =
            codec::check_header(input, FILE_FORMAT_NAME, VERSION_PACKED, VERSION_VINT_TARGET)?;
        let packed = input.read_byte()? == 1;
        let empty_output = if input.read_byte()? == 1 {
            let len = input.read_vint()? as usize;
            let mut encoded = input.read_byte_vec(len)?;
            if !packed {
                encoded.reverse();
            }
            Some(outputs.read_final_output(&mut ByteArrayDataInput::new(&encoded))?)
        } else {
            None
        };
        let input_type = InputType::from_tag(input.read_byte()?)?;
        let node_ref_to_address = if packed {
            let bits = input.read_vint()?;
            if !(1..=64).contains(&bits) {
                return Err(FstError::Corrupt(format!("invalid dereference width {bits}")));
            }
            let len = input.read_vint()? as usize;
            // Read entries before sizing the table: a bogus count hits EOF first.
            let mut addresses = Vec::new();
            for _ in 0..len {
                addresses.push(input.read_vlong()?);
            }
            let mut table = PackedInts::new(len, bits);
            for (i, address) in addresses.into_iter().enumerate() {
                if address > table.max_value() {
                    return Err(FstError::Corrupt(format!(
                        "dereference entry {address} exceeds {bits} bits"
                    )));
                }
                table.set(i, address);
            }
            Some(table)
        } else {
            None
        };
        let start_node = input.read_vlong()? as i64;
        let node_count = input.read_vlong()? as i64;
        let arc_count = input.read_vlong()? as i64;
        let arc_with_output_count = input.read_vlong()? as i64;
        let num_bytes = input.read_vlong()?;
        let bytes = BytesStore::read_from(input, num_bytes, 1usize << max_block_bits)?;

        tracing::debug!(
            version,
            packed,
            input_type = ?input_type,
            num_bytes,
            "loaded FST"
        );

        let mut fst = Self {
            input_type,
            outputs,
            bytes,
            empty_output,
            start_node,
            last_frozen_node: 0,
            node_count,
            arc_count,
            arc_with_output_count,
            packed,
            node_ref_to_address,
            allow_array_arcs: false,
            cached_root_arcs: Vec::new(),
            node_address: None,
            in_counts: None,
            version,
            bytes_per_arc: Vec::new(),
        };
        fst.cache_root_arcs()?;
        Ok(fst)
    }

    pub fn from_bytes(data: &[u8], outputs: O) -> Result<Self> {
        Self::load(&mut ByteArrayDataInput::new(data), outputs)
    }

    pub fn load_from_path(path: impl AsRef<Path>, outputs: O) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data, outputs)
    }
}

impl<O: Outputs> std::fmt::Debug for Fst<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fst")
            .field("input_type", &self.input_type)
            .field("packed", &self.packed)
            .field("start_node", &self.start_node)
            .field("nodes", &self.node_count())
            .field("arcs", &self.arc_count)
            .field("bytes", &self.bytes.position())
            .finish()
    }
}

/// Writes `label` in the encoding of `input_type`.
pub(crate) fn write_label<W: DataOutput + ?Sized>(
    input_type: InputType,
    out: &mut W,
    label: i32,
) -> Result<()> {
    if label < 0 || label > input_type.max_label() {
        return Err(FstError::LabelOutOfRange { label, input_type });
    }
    match input_type {
        InputType::Byte1 => out.write_byte(label as u8),
        InputType::Byte2 => out.write_short(label as u16),
        InputType::Byte4 => out.write_vint(label as u32),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Builder;
    use crate::builder::{PendingArc, PendingTarget};
    use crate::outputs::{ByteSequenceOutputs, NoOutputs, PositiveIntOutputs};
    use crate::search;

    fn leaf_node(depth: usize, labels: &[i32]) -> UnCompiledNode<u64> {
        let mut node = UnCompiledNode::new(depth, 0);
        for &label in labels {
            node.arcs.push(PendingArc {
                label,
                target: PendingTarget::Frozen(FINAL_END_NODE),
                is_final: true,
                output: u64::from(label as u32),
                next_final_output: 0,
            });
        }
        node
    }

    fn building_fst(allow_array_arcs: bool) -> Fst<PositiveIntOutputs> {
        Fst::for_building(InputType::Byte1, PositiveIntOutputs, false, 0.0, allow_array_arcs, 4)
    }

    #[test]
    fn empty_node_maps_to_sentinels() {
        let mut fst = building_fst(true);
        let mut node = UnCompiledNode::new(1, 0u64);
        assert_eq!(fst.add_node(&node).unwrap(), NON_FINAL_END_NODE);
        node.is_final = true;
        assert_eq!(fst.add_node(&node).unwrap(), FINAL_END_NODE);
        assert_eq!(fst.bytes.position(), 1);
    }

    #[test]
    fn linear_node_round_trip() {
        let mut fst = building_fst(true);
        let addr = fst.add_node(&leaf_node(4, &[b'a' as i32, b'c' as i32])).unwrap();
        fst.finish(addr).unwrap();

        let mut r = fst.bytes_reader();
        let mut arc = fst.new_arc();
        fst.read_first_real_target_arc(addr, &mut arc, &mut r).unwrap();
        assert!(!arc.in_array());
        assert_eq!(arc.label, b'a' as i32);
        assert_eq!(arc.output, u64::from(b'a'));
        assert_eq!(arc.target, FINAL_END_NODE);
        assert!(!arc.is_last());
        assert_eq!(fst.read_next_arc_label(&arc, &mut r).unwrap(), b'c' as i32);
        fst.read_next_arc(&mut arc, &mut r).unwrap();
        assert_eq!(arc.label, b'c' as i32);
        assert!(arc.is_last());
    }

    #[test]
    fn wide_shallow_node_becomes_array() {
        let mut fst = building_fst(true);
        let labels: Vec<i32> = (0..6).map(|i| 200 + i).collect();
        let addr = fst.add_node(&leaf_node(1, &labels)).unwrap();
        fst.finish(addr).unwrap();

        let mut r = fst.bytes_reader();
        let root = fst.first_arc();
        assert!(fst.is_expanded_target(&root, &mut r).unwrap());

        let mut arc = fst.new_arc();
        assert!(fst.find_target_arc(203, &root, &mut arc, &mut r).unwrap());
        assert_eq!(arc.output, 203);
        assert!(!fst.find_target_arc(199, &root, &mut arc, &mut r).unwrap());
        assert!(!fst.find_target_arc(206, &root, &mut arc, &mut r).unwrap());

        let mut last = fst.new_arc();
        fst.read_last_target_arc(&root, &mut last, &mut r).unwrap();
        assert_eq!(last.label, 205);
        assert!(last.is_last());
    }

    #[test]
    fn arrays_disabled_keeps_linear_encoding() {
        let mut fst = building_fst(false);
        let labels: Vec<i32> = (0..12).collect();
        let addr = fst.add_node(&leaf_node(1, &labels)).unwrap();
        fst.finish(addr).unwrap();
        let root = fst.first_arc();
        assert!(!fst.is_expanded_target(&root, &mut fst.bytes_reader()).unwrap());
    }

    #[test]
    fn add_node_after_finish_fails() {
        let mut fst = building_fst(true);
        let addr = fst.add_node(&leaf_node(1, &[1])).unwrap();
        fst.finish(addr).unwrap();
        let err = fst.add_node(&leaf_node(1, &[2])).unwrap_err();
        assert!(matches!(err, FstError::AlreadyFinished));
        assert!(matches!(fst.finish(addr), Err(FstError::AlreadyFinished)));
    }

    #[test]
    fn unfrozen_target_is_rejected() {
        let mut fst = building_fst(true);
        let mut node = leaf_node(1, &[1]);
        node.arcs[0].target = PendingTarget::Unfrozen;
        assert!(matches!(
            fst.add_node(&node),
            Err(FstError::UnfrozenTarget { label: 1 })
        ));
    }

    #[test]
    fn label_wider_than_input_type_is_rejected() {
        let mut fst = building_fst(true);
        assert!(matches!(
            fst.add_node(&leaf_node(1, &[256])),
            Err(FstError::LabelOutOfRange { label: 256, .. })
        ));
    }

    #[test]
    fn next_arc_past_end_label_fails() {
        let mut builder = Builder::new(InputType::Byte1, NoOutputs);
        builder.add_bytes(b"", crate::outputs::NoOutput).unwrap();
        let fst = builder.finish().unwrap().unwrap();
        let mut r = fst.bytes_reader();
        let mut arc = fst.new_arc();
        fst.read_first_target_arc(&fst.first_arc(), &mut arc, &mut r).unwrap();
        assert_eq!(arc.label, END_LABEL);
        assert!(arc.is_last());
        assert!(matches!(fst.read_next_arc(&mut arc, &mut r), Err(FstError::NoNextArc)));
    }

    #[test]
    fn save_requires_finish() {
        let fst = building_fst(true);
        assert!(matches!(fst.to_bytes(), Err(FstError::NotFinished)));
    }

    #[test]
    fn empty_output_round_trips_reversed() {
        let mut builder = Builder::new(InputType::Byte1, ByteSequenceOutputs);
        builder.add_bytes(b"", b"xyz".to_vec()).unwrap();
        builder.add_bytes(b"a", b"q".to_vec()).unwrap();
        let fst = builder.finish().unwrap().unwrap();
        let bytes = fst.to_bytes().unwrap();
        let loaded = Fst::from_bytes(&bytes, ByteSequenceOutputs).unwrap();
        assert_eq!(loaded.empty_output(), Some(&b"xyz".to_vec()));
        assert_eq!(search::get_bytes(&loaded, b"").unwrap(), Some(b"xyz".to_vec()));
        assert_eq!(search::get_bytes(&loaded, b"a").unwrap(), Some(b"q".to_vec()));
    }

    #[test]
    fn load_rejects_bad_block_bits() {
        let err = Fst::load_with_max_block_bits(
            &mut ByteArrayDataInput::new(&[]),
            PositiveIntOutputs,
            31,
        )
        .unwrap_err();
        assert!(matches!(err, FstError::InvalidConfig(_)));
    }

    #[test]
    fn load_rejects_future_version() {
        let mut buf = Vec::new();
        codec::write_header(&mut buf, FILE_FORMAT_NAME, VERSION_CURRENT + 1);
        let err = Fst::from_bytes(&buf, PositiveIntOutputs).unwrap_err();
        assert!(matches!(
            err,
            FstError::Codec(lexfst_core::CodecError::FormatTooNew { .. })
        ));
    }

    #[test]
    fn load_rejects_version_before_3() {
        let words = ["ab", "cd"];
        let mut b = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (i, w) in words.iter().enumerate() {
            b.add_bytes(w.as_bytes(), i as u64).unwrap();
        }
        let mut buf = b.finish().unwrap().unwrap().to_bytes().unwrap();
        // The version is the last int of the header.
        let version_at = 4 + 1 + FILE_FORMAT_NAME.len();
        buf[version_at..version_at + 4].copy_from_slice(&2u32.to_be_bytes());
        let err = Fst::from_bytes(&buf, PositiveIntOutputs).unwrap_err();
        assert!(matches!(
            err,
            FstError::Codec(lexfst_core::CodecError::FormatTooOld { version: 2, min: 3 })
        ));
    }

    #[test]
    fn oversized_dereference_count_fails_cleanly() {
        let mut buf = Vec::new();
        codec::write_header(&mut buf, FILE_FORMAT_NAME, VERSION_CURRENT);
        buf.write_byte(1);
        buf.write_byte(0);
        buf.write_byte(InputType::Byte1.tag());
        buf.write_vint(64);
        buf.write_vint(u32::MAX);
        buf.write_vlong(7);
        let err = Fst::from_bytes(&buf, PositiveIntOutputs).unwrap_err();
        assert!(matches!(
            err,
            FstError::Codec(lexfst_core::CodecError::UnexpectedEof)
        ));
    }

    #[test]
    fn oversized_empty_output_fails_cleanly() {
        let mut buf = Vec::new();
        codec::write_header(&mut buf, FILE_FORMAT_NAME, VERSION_CURRENT);
        buf.write_byte(0);
        buf.write_byte(1);
        buf.write_vint(u32::MAX);
        buf.write_bytes(b"short");
        let err = Fst::from_bytes(&buf, ByteSequenceOutputs).unwrap_err();
        assert!(matches!(
            err,
            FstError::Codec(lexfst_core::CodecError::UnexpectedEof)
        ));
    }

    #[test]
    fn oversized_node_store_fails_cleanly() {
        let mut buf = Vec::new();
        codec::write_header(&mut buf, FILE_FORMAT_NAME, VERSION_CURRENT);
        buf.write_byte(0);
        buf.write_byte(0);
        buf.write_byte(InputType::Byte1.tag());
        for v in [1, 1, 1, 0] {
            buf.write_vlong(v);
        }
        buf.write_vlong(u64::MAX >> 1);
        buf.write_bytes(&[0, 0, 0]);
        let err = Fst::from_bytes(&buf, PositiveIntOutputs).unwrap_err();
        assert!(matches!(
            err,
            FstError::Codec(lexfst_core::CodecError::UnexpectedEof)
        ));
    }

    #[test]
    fn load_reads_version_3_layout() {
        // Root node with one arc 'a' (output 5) to a node with one final arc
        // 'b'; targets as 32-bit ints, bytes stored reversed.
        let mut store = Vec::new();
        store.push(0u8);
        // Node at address 1..=2: 'b' final, stop, last.
        let inner = [BIT_FINAL_ARC | BIT_LAST_ARC | BIT_STOP_NODE, b'b'];
        let inner_start = store.len() as u32;
        store.extend(inner.iter().rev());
        let inner_address = inner_start + inner.len() as u32 - 1;
        // Root: 'a' with output, last, explicit int target.
        let mut root = vec![BIT_LAST_ARC | BIT_ARC_HAS_OUTPUT, b'a', 5];
        root.extend_from_slice(&inner_address.to_be_bytes());
        let root_start = store.len() as u32;
        store.extend(root.iter().rev());
        let root_address = root_start + root.len() as u32 - 1;

        let mut buf = Vec::new();
        codec::write_header(&mut buf, FILE_FORMAT_NAME, VERSION_PACKED);
        buf.write_byte(0);
        buf.write_byte(0);
        buf.write_byte(InputType::Byte1.tag());
        buf.write_vlong(u64::from(root_address));
        buf.write_vlong(2);
        buf.write_vlong(2);
        buf.write_vlong(1);
        buf.write_vlong(store.len() as u64);
        buf.write_bytes(&store);

        let fst = Fst::from_bytes(&buf, PositiveIntOutputs).unwrap();
        assert_eq!(search::get_bytes(&fst, b"ab").unwrap(), Some(5));
        assert_eq!(search::get_bytes(&fst, b"a").unwrap(), None);
        assert_eq!(fst.to_bytes().unwrap(), buf);
    }
}
