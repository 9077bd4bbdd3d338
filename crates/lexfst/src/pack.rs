// Re-layout of a will-pack automaton into the compact forward layout.
//
// Nodes are rewritten in descending ordinal order, so an arc to the node
// frozen just before its source can still use the target-next encoding.
// Every other target becomes either a forward delta from the arc or an
// absolute code: a small ordinal into the dereference table for the most
// referenced nodes, or the node's address offset past the table. Addresses
// depend on the encoded size of every earlier pointer, so passes repeat until
// no node moves.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use lexfst_core::data_io::DataOutput;
use lexfst_core::packed::{GrowableWriter, PackedInts, bits_required, fastest_bits};

use crate::arc::{
    ARCS_AS_FIXED_ARRAY, BIT_ARC_HAS_FINAL_OUTPUT, BIT_ARC_HAS_OUTPUT, BIT_FINAL_ARC, BIT_LAST_ARC,
    BIT_STOP_NODE, BIT_TARGET_DELTA, BIT_TARGET_NEXT,
};
use crate::config::PackConfig;
use crate::fst::{Fst, write_label};
use crate::outputs::Outputs;
use crate::{FstError, Result};

/// Upper bound on layout passes. Real automata settle in a handful.
const MAX_PACK_PASSES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeAndInCount {
    node: u64,
    count: u64,
}

// Higher in-count ranks higher; among equal counts the lower ordinal wins.
impl Ord for NodeAndInCount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for NodeAndInCount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PassStats {
    abs: u64,
    delta: u64,
    top: u64,
    next: u64,
    moved: u64,
}

impl<O: Outputs> Fst<O> {
    /// Builds a new, smaller automaton with the same language and outputs.
    ///
    /// Only automata built with packing enabled (and not yet packed) can be
    /// packed; they carry the per-node address and in-count tables this
    /// needs.
    pub fn pack(&self, config: &PackConfig) -> Result<Fst<O>> {
        config.validate()?;
        let (Some(node_address), Some(in_counts)) = (&self.node_address, &self.in_counts) else {
            return Err(FstError::NotBuiltForPacking);
        };
        if !self.is_finished() {
            return Err(FstError::NotFinished);
        }

        let top_nodes = self.select_top_nodes(in_counts, config);
        let deref_len = top_nodes.len() as i64;

        // First guess: the packed layout reverses node order.
        let node_count = self.node_count as usize;
        let end = self.bytes.position();
        let mut new_address = GrowableWriter::new(
            bits_required(end as u64),
            1 + node_count,
            config.acceptable_overhead_ratio,
        );
        for node in 1..=node_count {
            new_address.set(node, (1 + end - node_address.get(node) as i64) as u64);
        }

        let mut reader = self.bytes_reader();
        let mut arc = self.new_arc();
        let mut passes = 0;
        let mut fst = loop {
            passes += 1;
            if passes > MAX_PACK_PASSES {
                return Err(FstError::PackDidNotConverge {
                    passes: MAX_PACK_PASSES,
                });
            }

            let mut fst = Fst::for_packing(self.input_type, self.outputs.clone(), self.bytes.block_bits());
            let mut stats = PassStats::default();
            let mut changed = false;
            let mut any_neg_delta = false;
            let mut address_error = 0i64;

            for node in (1..=node_count).rev() {
                fst.node_count += 1;
                let address = fst.bytes.position();
                let guessed = new_address.get(node) as i64;
                if address != guessed {
                    address_error = address - guessed;
                    changed = true;
                    new_address.set(node, address as u64);
                    stats.moved += 1;
                }

                let mut bytes_per_arc = 0i64;
                let mut retry = false;
                let node_arc_count = loop {
                    self.read_first_real_target_arc(node as i64, &mut arc, &mut reader)?;
                    let use_arc_array = arc.in_array();
                    if use_arc_array {
                        if bytes_per_arc == 0 {
                            bytes_per_arc = arc.bytes_per_arc;
                        }
                        fst.bytes.write_byte(ARCS_AS_FIXED_ARRAY);
                        fst.bytes.write_vint(arc.num_arcs as u32);
                        fst.bytes.write_vint(bytes_per_arc as u32);
                    }

                    let mut arc_count = 0i64;
                    let mut max_bytes_per_arc = 0i64;
                    loop {
                        let arc_start = fst.bytes.position();
                        arc_count += 1;

                        let mut flags = 0u8;
                        if arc.is_last() {
                            flags |= BIT_LAST_ARC;
                        }
                        if !use_arc_array && node != 1 && arc.target == node as i64 - 1 {
                            flags |= BIT_TARGET_NEXT;
                            if !retry {
                                stats.next += 1;
                            }
                        }
                        let has_final_output =
                            arc.is_final() && !self.outputs.is_no_output(&arc.next_final_output);
                        if arc.is_final() {
                            flags |= BIT_FINAL_ARC;
                            if has_final_output {
                                flags |= BIT_ARC_HAS_FINAL_OUTPUT;
                            }
                        }
                        if !arc.target_has_arcs() {
                            flags |= BIT_STOP_NODE;
                        }
                        let has_output = !self.outputs.is_no_output(&arc.output);
                        if has_output {
                            flags |= BIT_ARC_HAS_OUTPUT;
                        }

                        let write_target = arc.target_has_arcs() && flags & BIT_TARGET_NEXT == 0;
                        let mut target_address = 0i64;
                        let mut abs_ptr = 0i64;
                        if write_target {
                            target_address = new_address.get(arc.target as usize) as i64 + address_error;
                            abs_ptr = match top_nodes.get(&(arc.target as u64)) {
                                Some(&ordinal) => ordinal as i64,
                                None => deref_len + target_address,
                            };
                            // Flag byte and label still precede the pointer.
                            let mut delta = target_address - fst.bytes.position() - 2;
                            if delta < 0 {
                                any_neg_delta = true;
                                delta = 0;
                            }
                            if delta < abs_ptr {
                                flags |= BIT_TARGET_DELTA;
                            }
                        }

                        fst.bytes.write_byte(flags);
                        write_label(self.input_type, &mut fst.bytes, arc.label)?;
                        if has_output {
                            self.outputs.write(&arc.output, &mut fst.bytes);
                            if !retry {
                                fst.arc_with_output_count += 1;
                            }
                        }
                        if has_final_output {
                            self.outputs.write_final_output(&arc.next_final_output, &mut fst.bytes);
                        }

                        if write_target {
                            if flags & BIT_TARGET_DELTA != 0 {
                                let mut delta = target_address - fst.bytes.position();
                                if delta < 0 {
                                    any_neg_delta = true;
                                    delta = 0;
                                }
                                fst.bytes.write_vlong(delta as u64);
                                if !retry {
                                    stats.delta += 1;
                                }
                            } else {
                                fst.bytes.write_vlong(abs_ptr as u64);
                                if !retry {
                                    if abs_ptr >= deref_len {
                                        stats.abs += 1;
                                    } else {
                                        stats.top += 1;
                                    }
                                }
                            }
                        }

                        if use_arc_array {
                            let arc_bytes = fst.bytes.position() - arc_start;
                            max_bytes_per_arc = max_bytes_per_arc.max(arc_bytes);
                            let pad = arc_start + bytes_per_arc - fst.bytes.position();
                            if pad > 0 {
                                fst.bytes.skip_bytes(pad as usize);
                            }
                        }

                        if arc.is_last() {
                            break;
                        }
                        self.read_next_real_arc(&mut arc, &mut reader)?;
                    }

                    if !use_arc_array
                        || max_bytes_per_arc == bytes_per_arc
                        || (retry && max_bytes_per_arc <= bytes_per_arc)
                    {
                        break arc_count;
                    }
                    // Some arc outgrew the stride: rewrite the node wider.
                    bytes_per_arc = max_bytes_per_arc;
                    fst.bytes.truncate(address);
                    retry = true;
                };
                fst.arc_count += node_arc_count;
            }

            tracing::trace!(
                pass = passes,
                moved = stats.moved,
                abs = stats.abs,
                delta = stats.delta,
                top = stats.top,
                next = stats.next,
                negative_deltas = any_neg_delta,
                bytes = fst.bytes.position(),
                "pack pass"
            );
            if !changed {
                break fst;
            }
        };

        let max_address = top_nodes
            .keys()
            .map(|&node| new_address.get(node as usize))
            .max()
            .unwrap_or(0);
        let mut table = PackedInts::new(
            top_nodes.len(),
            fastest_bits(bits_required(max_address), config.acceptable_overhead_ratio),
        );
        for (&node, &ordinal) in &top_nodes {
            table.set(ordinal as usize, new_address.get(node as usize));
        }
        fst.node_ref_to_address = Some(table);
        fst.start_node = if self.start_node > 0 {
            new_address.get(self.start_node as usize) as i64
        } else {
            self.start_node
        };
        fst.empty_output = self.empty_output.clone();
        fst.bytes.finish();
        fst.cache_root_arcs()?;

        tracing::debug!(
            passes,
            deref_nodes = top_nodes.len(),
            bytes_before = end,
            bytes_after = fst.bytes.position(),
            "packed FST"
        );
        Ok(fst)
    }

    /// Picks up to `max_deref_nodes` nodes with the most incoming arcs
    /// (at least `min_in_count_deref`) and assigns them table ordinals,
    /// most referenced first.
    fn select_top_nodes(&self, in_counts: &GrowableWriter, config: &PackConfig) -> HashMap<u64, u64> {
        let node_count = (self.node_count as usize).min(in_counts.len().saturating_sub(1));
        let top_n = config.max_deref_nodes.min(node_count);
        let mut heap: BinaryHeap<Reverse<NodeAndInCount>> = BinaryHeap::with_capacity(top_n + 1);
        if top_n > 0 {
            for node in 1..=node_count {
                let count = in_counts.get(node);
                if count < config.min_in_count_deref {
                    continue;
                }
                let candidate = NodeAndInCount { node: node as u64, count };
                if heap.len() < top_n {
                    heap.push(Reverse(candidate));
                } else if heap.peek().is_some_and(|Reverse(bottom)| candidate.count > bottom.count) {
                    heap.pop();
                    heap.push(Reverse(candidate));
                }
            }
        }

        let mut top_nodes = HashMap::with_capacity(heap.len());
        let mut ordinal = heap.len() as u64;
        while let Some(Reverse(entry)) = heap.pop() {
            ordinal -= 1;
            top_nodes.insert(entry.node, ordinal);
        }
        top_nodes
    }
}
