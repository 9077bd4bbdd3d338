// Open-addressing table of frozen nodes, keyed by node content.
//
// Slots hold node addresses (0 = empty). Lookups compare the unfrozen
// candidate against the frozen bytes, so the table itself stores nothing
// but addresses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use lexfst_core::packed::{GrowableWriter, overhead};

use crate::Result;
use crate::arc::Arc;
use crate::builder::UnCompiledNode;
use crate::fst::Fst;
use crate::outputs::Outputs;

const PRIME: i64 = 31;
const INITIAL_CAPACITY: usize = 16;

/// Deduplicates structurally identical nodes while an automaton is built.
pub struct NodeHash<O: Outputs> {
    table: GrowableWriter,
    count: usize,
    mask: usize,
    scratch: Arc<O::Value>,
}

fn output_hash<V: Hash>(value: &V) -> i64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    i64::from(hasher.finish() as i32)
}

/// Folds one arc into a running node hash.
fn mix_arc<V: Hash>(h: i64, label: i32, target: i64, output: &V, final_output: &V, is_final: bool) -> i64 {
    let mut h = h.wrapping_mul(PRIME).wrapping_add(i64::from(label));
    h = h
        .wrapping_mul(PRIME)
        .wrapping_add(i64::from((target ^ (target >> 32)) as i32));
    h = h.wrapping_mul(PRIME).wrapping_add(output_hash(output));
    h = h.wrapping_mul(PRIME).wrapping_add(output_hash(final_output));
    if is_final {
        h = h.wrapping_add(17);
    }
    h
}

impl<O: Outputs> NodeHash<O> {
    pub fn new(outputs: &O) -> Self {
        Self {
            table: GrowableWriter::new(8, INITIAL_CAPACITY, overhead::COMPACT),
            count: 0,
            mask: INITIAL_CAPACITY - 1,
            scratch: Arc::new(outputs.no_output()),
        }
    }

    /// Number of distinct nodes stored.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the address of a frozen node equal to `node`, freezing
    /// `node` into `fst` first if none exists.
    pub fn add(&mut self, fst: &mut Fst<O>, node: &UnCompiledNode<O::Value>) -> Result<i64> {
        let h = Self::hash_unfrozen(node)?;
        let mut pos = (h as usize) & self.mask;
        let mut probe = 0;
        loop {
            let address = self.table.get(pos) as i64;
            if address == 0 {
                let address = fst.add_node(node)?;
                self.count += 1;
                self.table.set(pos, address as u64);
                if self.count > 2 * self.table.len() / 3 {
                    self.rehash(fst)?;
                }
                return Ok(address);
            }
            if self.nodes_equal(fst, node, address)? {
                return Ok(address);
            }
            probe += 1;
            pos = (pos + probe) & self.mask;
        }
    }

    fn hash_unfrozen(node: &UnCompiledNode<O::Value>) -> Result<i64> {
        let mut h = 0i64;
        for arc in &node.arcs {
            let target = arc.frozen_target()?;
            h = mix_arc(h, arc.label, target, &arc.output, &arc.next_final_output, arc.is_final);
        }
        Ok(h & i64::MAX)
    }

    fn hash_frozen(&mut self, fst: &Fst<O>, address: i64) -> Result<i64> {
        let mut input = fst.bytes_reader();
        let arc = &mut self.scratch;
        fst.read_first_real_target_arc(address, arc, &mut input)?;
        let mut h = 0i64;
        loop {
            h = mix_arc(h, arc.label, arc.target, &arc.output, &arc.next_final_output, arc.is_final());
            if arc.is_last() {
                break;
            }
            fst.read_next_real_arc(arc, &mut input)?;
        }
        Ok(h & i64::MAX)
    }

    fn nodes_equal(
        &mut self,
        fst: &Fst<O>,
        node: &UnCompiledNode<O::Value>,
        address: i64,
    ) -> Result<bool> {
        let mut input = fst.bytes_reader();
        let scratch = &mut self.scratch;
        fst.read_first_real_target_arc(address, scratch, &mut input)?;
        if scratch.in_array() && node.arcs.len() as i64 != scratch.num_arcs {
            return Ok(false);
        }
        for (idx, arc) in node.arcs.iter().enumerate() {
            if arc.label != scratch.label
                || arc.output != scratch.output
                || arc.frozen_target()? != scratch.target
                || arc.next_final_output != scratch.next_final_output
                || arc.is_final != scratch.is_final()
            {
                return Ok(false);
            }
            if scratch.is_last() {
                return Ok(idx == node.arcs.len() - 1);
            }
            fst.read_next_real_arc(scratch, &mut input)?;
        }
        Ok(false)
    }

    fn rehash(&mut self, fst: &Fst<O>) -> Result<()> {
        let new_len = 2 * self.table.len();
        let bits = self.table.bits_per_value();
        let old = std::mem::replace(&mut self.table, GrowableWriter::new(bits, new_len, overhead::COMPACT));
        self.mask = new_len - 1;
        for idx in 0..old.len() {
            let address = old.get(idx) as i64;
            if address != 0 {
                self.insert_frozen(fst, address)?;
            }
        }
        tracing::trace!(capacity = new_len, nodes = self.count, "rehashed node table");
        Ok(())
    }

    fn insert_frozen(&mut self, fst: &Fst<O>, address: i64) -> Result<()> {
        let mut pos = (self.hash_frozen(fst, address)? as usize) & self.mask;
        let mut probe = 0;
        while self.table.get(pos) != 0 {
            probe += 1;
            pos = (pos + probe) & self.mask;
        }
        self.table.set(pos, address as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{PendingArc, PendingTarget};
    use crate::config::InputType;
    use crate::fst::FINAL_END_NODE;
    use crate::outputs::PositiveIntOutputs;

    fn leaf(labels: &[i32], output: u64) -> UnCompiledNode<u64> {
        let mut node = UnCompiledNode::new(2, 0);
        for &label in labels {
            node.arcs.push(PendingArc {
                label,
                target: PendingTarget::Frozen(FINAL_END_NODE),
                is_final: true,
                output,
                next_final_output: 0,
            });
        }
        node
    }

    fn fst() -> Fst<PositiveIntOutputs> {
        Fst::for_building(InputType::Byte1, PositiveIntOutputs, false, 0.0, true, 8)
    }

    #[test]
    fn equal_nodes_share_an_address() {
        let mut fst = fst();
        let mut hash = NodeHash::new(&PositiveIntOutputs);
        let a = hash.add(&mut fst, &leaf(&[1, 2], 0)).unwrap();
        let b = hash.add(&mut fst, &leaf(&[1, 2], 0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash.len(), 1);
    }

    #[test]
    fn outputs_and_arc_counts_distinguish_nodes() {
        let mut fst = fst();
        let mut hash = NodeHash::new(&PositiveIntOutputs);
        let a = hash.add(&mut fst, &leaf(&[1, 2], 0)).unwrap();
        let b = hash.add(&mut fst, &leaf(&[1, 2], 5)).unwrap();
        let c = hash.add(&mut fst, &leaf(&[1], 0)).unwrap();
        let d = hash.add(&mut fst, &leaf(&[1, 2, 3], 0)).unwrap();
        assert_eq!(hash.len(), 4);
        let all = [a, b, c, d];
        for (i, x) in all.iter().enumerate() {
            for y in &all[i + 1..] {
                assert_ne!(x, y);
            }
        }
    }

    #[test]
    fn survives_rehash() {
        let mut fst = fst();
        let mut hash = NodeHash::new(&PositiveIntOutputs);
        let addresses: Vec<i64> = (0..200)
            .map(|i| hash.add(&mut fst, &leaf(&[i % 256], i as u64)).unwrap())
            .collect();
        assert_eq!(hash.len(), 200);
        for i in 0..200 {
            let again = hash.add(&mut fst, &leaf(&[i % 256], i as u64)).unwrap();
            assert_eq!(again, addresses[i as usize]);
        }
        assert_eq!(hash.len(), 200);
    }

    #[test]
    fn frozen_and_unfrozen_hashes_agree() {
        let mut fst = fst();
        let node = leaf(&[3, 9, 12], 4);
        let address = fst.add_node(&node).unwrap();
        let mut hash = NodeHash::new(&PositiveIntOutputs);
        let unfrozen = NodeHash::<PositiveIntOutputs>::hash_unfrozen(&node).unwrap();
        assert_eq!(hash.hash_frozen(&fst, address).unwrap(), unfrozen);
    }
}
