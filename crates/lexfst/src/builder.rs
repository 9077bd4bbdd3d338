// Incremental construction of a minimal FST from sorted input.
//
// The builder keeps a frontier of unfrozen nodes, one per depth along the
// previously added input. When a new input diverges from the previous one,
// every frontier node below the divergence point can no longer change, so it
// is frozen (bottom-up, through the node hash) and replaced in its parent by
// a frozen reference. Outputs are pushed as close to the root as possible:
// each arc on the shared prefix keeps only the common part of the outputs of
// all inputs below it.

use crate::config::{BuilderConfig, InputType, PackConfig};
use crate::fst::Fst;
use crate::node_hash::NodeHash;
use crate::outputs::Outputs;
use crate::{FstError, Result};

/// Target of a pending arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTarget {
    /// The next frontier node, still open for new arcs.
    Unfrozen,
    /// Address (or ordinal) of a frozen node, or an end sentinel.
    Frozen(i64),
}

impl PendingTarget {
    pub fn frozen(self) -> Option<i64> {
        match self {
            PendingTarget::Frozen(node) => Some(node),
            PendingTarget::Unfrozen => None,
        }
    }
}

/// An arc of a node that has not been frozen yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingArc<V> {
    pub label: i32,
    pub target: PendingTarget,
    pub is_final: bool,
    pub output: V,
    pub next_final_output: V,
}

impl<V> PendingArc<V> {
    pub(crate) fn frozen_target(&self) -> Result<i64> {
        self.target
            .frozen()
            .ok_or(FstError::UnfrozenTarget { label: self.label })
    }
}

/// A node under construction: its arcs in label order, the output emitted
/// when a path ends here, and its distance from the root.
#[derive(Debug, Clone)]
pub struct UnCompiledNode<V> {
    pub arcs: Vec<PendingArc<V>>,
    pub output: V,
    pub is_final: bool,
    pub depth: usize,
    no_output: V,
}

impl<V: Clone + PartialEq> UnCompiledNode<V> {
    pub fn new(depth: usize, no_output: V) -> Self {
        Self {
            arcs: Vec::new(),
            output: no_output.clone(),
            is_final: false,
            depth,
            no_output,
        }
    }

    /// Resets the node for reuse at the same depth.
    pub fn clear(&mut self) {
        self.arcs.clear();
        self.output.clone_from(&self.no_output);
        self.is_final = false;
    }

    fn last_arc(&mut self, label: i32) -> &mut PendingArc<V> {
        let idx = self.arcs.len() - 1;
        let arc = &mut self.arcs[idx];
        debug_assert_eq!(arc.label, label);
        arc
    }

    pub fn last_output(&self, label: i32) -> &V {
        let arc = &self.arcs[self.arcs.len() - 1];
        debug_assert_eq!(arc.label, label);
        &arc.output
    }

    pub fn add_arc(&mut self, label: i32) {
        debug_assert!(self.arcs.last().is_none_or(|last| last.label < label));
        self.arcs.push(PendingArc {
            label,
            target: PendingTarget::Unfrozen,
            is_final: false,
            output: self.no_output.clone(),
            next_final_output: self.no_output.clone(),
        });
    }

    pub fn replace_last(&mut self, label: i32, target: i64, next_final_output: V, is_final: bool) {
        let arc = self.last_arc(label);
        debug_assert!(arc.target == PendingTarget::Unfrozen);
        arc.target = PendingTarget::Frozen(target);
        arc.next_final_output = next_final_output;
        arc.is_final = is_final;
    }

    pub fn set_last_output(&mut self, label: i32, output: V) {
        self.last_arc(label).output = output;
    }

    /// Pushes `prefix` onto every arc output and the final output.
    fn prepend_output<O: Outputs<Value = V>>(&mut self, outputs: &O, prefix: &V) {
        for arc in &mut self.arcs {
            arc.output = outputs.add(prefix, &arc.output);
        }
        if self.is_final {
            self.output = outputs.add(prefix, &self.output);
        }
    }
}

/// Builds an [`Fst`] from inputs added in strictly increasing order.
///
/// ```
/// use lexfst::{Builder, InputType, outputs::ByteSequenceOutputs, search};
///
/// let mut builder = Builder::new(InputType::Byte1, ByteSequenceOutputs);
/// builder.add_bytes(b"mop", b"floor".to_vec()).unwrap();
/// builder.add_bytes(b"moth", b"insect".to_vec()).unwrap();
/// let fst = builder.finish().unwrap().unwrap();
/// assert_eq!(search::get_bytes(&fst, b"moth").unwrap(), Some(b"insect".to_vec()));
/// ```
pub struct Builder<O: Outputs> {
    config: BuilderConfig,
    fst: Fst<O>,
    dedup: Option<NodeHash<O>>,
    frontier: Vec<UnCompiledNode<O::Value>>,
    last_input: Vec<i32>,
    input_count: u64,
}

impl<O: Outputs> Builder<O> {
    /// Builder with default settings: suffix sharing and arc arrays on,
    /// no packing.
    pub fn new(input_type: InputType, outputs: O) -> Self {
        Self::from_valid_config(BuilderConfig::new(input_type), outputs)
    }

    pub fn with_config(config: BuilderConfig, outputs: O) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config, outputs))
    }

    fn from_valid_config(config: BuilderConfig, outputs: O) -> Self {
        let dedup = config.share_suffix.then(|| NodeHash::new(&outputs));
        let root = UnCompiledNode::new(0, outputs.no_output());
        let fst = Fst::for_building(
            config.input_type,
            outputs,
            config.will_pack,
            config.acceptable_overhead_ratio,
            config.allow_array_arcs,
            config.bytes_page_bits,
        );
        Self {
            config,
            fst,
            dedup,
            frontier: vec![root],
            last_input: Vec::new(),
            input_count: 0,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Number of inputs added so far.
    pub fn input_count(&self) -> u64 {
        self.input_count
    }

    /// Nodes frozen so far.
    pub fn node_count(&self) -> u64 {
        self.fst.node_count()
    }

    /// Adds `input` with `output`. Inputs must arrive in strictly
    /// increasing lexicographic order; the empty input may only come first.
    pub fn add(&mut self, input: &[i32], output: O::Value) -> Result<()> {
        let max_label = self.config.input_type.max_label();
        if let Some(&label) = input.iter().find(|&&l| l < 0 || l > max_label) {
            return Err(FstError::LabelOutOfRange {
                label,
                input_type: self.config.input_type,
            });
        }
        if self.input_count > 0 && input <= self.last_input.as_slice() {
            return Err(FstError::InputOutOfOrder {
                index: self.input_count,
            });
        }
        self.input_count += 1;

        if input.is_empty() {
            self.frontier[0].is_final = true;
            self.fst.set_empty_output(output);
            return Ok(());
        }

        // Length of the prefix shared with the previous input, plus one.
        let mut shared = 0;
        let shared_stop = self.last_input.len().min(input.len());
        while shared < shared_stop && self.last_input[shared] == input[shared] {
            shared += 1;
        }
        let prefix_len_plus1 = shared + 1;

        if self.frontier.len() < input.len() + 1 {
            let no_output = self.fst.outputs.no_output();
            let start = self.frontier.len();
            self.frontier
                .extend((start..=input.len()).map(|depth| UnCompiledNode::new(depth, no_output.clone())));
        }

        self.freeze_tail(prefix_len_plus1)?;

        for idx in prefix_len_plus1..=input.len() {
            self.frontier[idx - 1].add_arc(input[idx - 1]);
        }

        let outputs = &self.fst.outputs;
        let no_output = outputs.no_output();
        let last_node = &mut self.frontier[input.len()];
        last_node.is_final = true;
        last_node.output.clone_from(&no_output);

        // Push the common output toward the root along the shared prefix.
        let mut output = output;
        for idx in 1..prefix_len_plus1 {
            let (head, tail) = self.frontier.split_at_mut(idx);
            let parent = &mut head[idx - 1];
            let node = &mut tail[0];
            let label = input[idx - 1];
            let last_output = parent.last_output(label);
            let common = if outputs.is_no_output(last_output) {
                no_output.clone()
            } else {
                let common = outputs.common(&output, last_output);
                let word_suffix = outputs.subtract(last_output, &common);
                parent.set_last_output(label, common.clone());
                node.prepend_output(outputs, &word_suffix);
                common
            };
            output = outputs.subtract(&output, &common);
        }
        self.frontier[prefix_len_plus1 - 1].set_last_output(input[prefix_len_plus1 - 1], output);

        self.last_input.clear();
        self.last_input.extend_from_slice(input);
        Ok(())
    }

    /// Adds a byte string as a sequence of byte labels.
    pub fn add_bytes(&mut self, input: &[u8], output: O::Value) -> Result<()> {
        self.add(&lexfst_core::labels::bytes_to_labels(input), output)
    }

    /// Adds a string as UTF-8 bytes, UTF-16 units or code points depending
    /// on the input type.
    pub fn add_str(&mut self, input: &str, output: O::Value) -> Result<()> {
        let labels = match self.config.input_type {
            InputType::Byte1 => lexfst_core::labels::utf8_labels(input),
            InputType::Byte2 => lexfst_core::labels::utf16_labels(input),
            InputType::Byte4 => lexfst_core::labels::utf32_labels(input),
        };
        self.add(&labels, output)
    }

    /// Freezes the frontier nodes deeper than `prefix_len_plus1 - 1`.
    fn freeze_tail(&mut self, prefix_len_plus1: usize) -> Result<()> {
        let down_to = prefix_len_plus1.max(1);
        let last_len = self.last_input.len();
        for idx in (down_to..=last_len).rev() {
            let (head, tail) = self.frontier.split_at_mut(idx);
            let parent = &mut head[idx - 1];
            let node = &mut tail[0];
            let next_final_output = node.output.clone();
            let is_final = node.is_final || node.arcs.is_empty();
            let address = compile_node(
                &mut self.fst,
                self.dedup.as_mut(),
                &self.config,
                node,
                1 + last_len - idx,
            )?;
            parent.replace_last(self.last_input[idx - 1], address, next_final_output, is_final);
        }
        Ok(())
    }

    /// Freezes the remaining frontier and seals the automaton.
    ///
    /// Returns `Ok(None)` if nothing was added. Packs the result when the
    /// builder was configured to.
    pub fn finish(self) -> Result<Option<Fst<O>>> {
        let will_pack = self.config.will_pack;
        let ratio = self.config.acceptable_overhead_ratio;
        let Some(fst) = self.finish_unpacked()? else {
            return Ok(None);
        };
        if will_pack {
            let pack_config = PackConfig::for_node_count(fst.node_count(), ratio);
            return fst.pack(&pack_config).map(Some);
        }
        Ok(Some(fst))
    }

    /// Seals the automaton without packing it, even in will-pack mode.
    pub(crate) fn finish_unpacked(mut self) -> Result<Option<Fst<O>>> {
        self.freeze_tail(0)?;
        if self.frontier[0].arcs.is_empty() && self.fst.empty_output.is_none() {
            return Ok(None);
        }
        let tail_len = self.last_input.len();
        let root = &mut self.frontier[0];
        let start = compile_node(&mut self.fst, self.dedup.as_mut(), &self.config, root, tail_len)?;
        self.fst.finish(start)?;
        tracing::debug!(
            inputs = self.input_count,
            deduplicated = self.dedup.as_ref().map_or(0, NodeHash::len),
            "built FST"
        );
        Ok(Some(self.fst))
    }
}

/// Freezes `node`, through the node hash when sharing applies, and resets
/// it.
fn compile_node<O: Outputs>(
    fst: &mut Fst<O>,
    dedup: Option<&mut NodeHash<O>>,
    config: &BuilderConfig,
    node: &mut UnCompiledNode<O::Value>,
    tail_len: usize,
) -> Result<i64> {
    let shareable = (config.share_non_singleton_nodes || node.arcs.len() <= 1)
        && tail_len <= config.share_max_tail_length;
    let address = match dedup {
        Some(hash) if shareable && !node.arcs.is_empty() => hash.add(fst, node)?,
        _ => fst.add_node(node)?,
    };
    node.clear();
    Ok(address)
}

impl<O: Outputs> std::fmt::Debug for Builder<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("inputs", &self.input_count)
            .field("frontier_depth", &self.last_input.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{NoOutput, NoOutputs, PositiveIntOutputs};
    use crate::search;

    #[test]
    fn rejects_out_of_order_and_duplicates() {
        let mut b = Builder::new(InputType::Byte1, PositiveIntOutputs);
        b.add_bytes(b"b", 1).unwrap();
        assert!(matches!(
            b.add_bytes(b"a", 2),
            Err(FstError::InputOutOfOrder { index: 1 })
        ));
        assert!(matches!(
            b.add_bytes(b"b", 2),
            Err(FstError::InputOutOfOrder { index: 1 })
        ));
        assert!(matches!(
            b.add_bytes(b"", 2),
            Err(FstError::InputOutOfOrder { index: 1 })
        ));
        b.add_bytes(b"ba", 3).unwrap();
        assert_eq!(b.input_count(), 2);
    }

    #[test]
    fn rejects_labels_outside_input_type() {
        let mut b = Builder::new(InputType::Byte1, NoOutputs);
        assert!(matches!(
            b.add(&[300], NoOutput),
            Err(FstError::LabelOutOfRange { label: 300, .. })
        ));
        assert!(matches!(
            b.add(&[-2], NoOutput),
            Err(FstError::LabelOutOfRange { label: -2, .. })
        ));
        let mut wide = Builder::new(InputType::Byte4, NoOutputs);
        wide.add(&[0x10_FFFF], NoOutput).unwrap();
    }

    #[test]
    fn nothing_added_yields_none() {
        let b = Builder::new(InputType::Byte1, PositiveIntOutputs);
        assert!(b.finish().unwrap().is_none());
    }

    #[test]
    fn outputs_are_factored_toward_root() {
        let mut b = Builder::new(InputType::Byte1, PositiveIntOutputs);
        b.add_bytes(b"stop", 10).unwrap();
        b.add_bytes(b"stops", 12).unwrap();
        b.add_bytes(b"sty", 17).unwrap();
        let fst = b.finish().unwrap().unwrap();

        let mut r = fst.bytes_reader();
        let mut arc = fst.new_arc();
        assert!(fst.find_target_arc(b's' as i32, &fst.first_arc(), &mut arc, &mut r).unwrap());
        assert_eq!(arc.output, 10);

        assert_eq!(search::get_bytes(&fst, b"stop").unwrap(), Some(10));
        assert_eq!(search::get_bytes(&fst, b"stops").unwrap(), Some(12));
        assert_eq!(search::get_bytes(&fst, b"sty").unwrap(), Some(17));
        assert_eq!(search::get_bytes(&fst, b"st").unwrap(), None);
    }

    #[test]
    fn shared_suffixes_collapse() {
        let words: [&[u8]; 4] = [b"bat", b"cat", b"hat", b"mat"];
        let mut shared = Builder::new(InputType::Byte1, NoOutputs);
        let config = BuilderConfig::new(InputType::Byte1).without_suffix_sharing();
        let mut trie = Builder::with_config(config, NoOutputs).unwrap();
        for w in words {
            shared.add_bytes(w, NoOutput).unwrap();
            trie.add_bytes(w, NoOutput).unwrap();
        }
        let shared = shared.finish().unwrap().unwrap();
        let trie = trie.finish().unwrap().unwrap();
        // root, "a", "t" plus the end node
        assert_eq!(shared.node_count(), 4);
        assert!(trie.node_count() > shared.node_count());
        for w in words {
            assert!(search::get_bytes(&shared, w).unwrap().is_some());
            assert!(search::get_bytes(&trie, w).unwrap().is_some());
        }
    }

    #[test]
    fn add_str_follows_input_type() {
        let mut b = Builder::new(InputType::Byte4, PositiveIntOutputs);
        b.add_str("añb", 1).unwrap();
        b.add_str("ñ", 2).unwrap();
        let fst = b.finish().unwrap().unwrap();
        assert_eq!(search::get(&fst, &['ñ' as i32]).unwrap(), Some(2));
        assert_eq!(search::get(&fst, &['a' as i32, 'ñ' as i32, 'b' as i32]).unwrap(), Some(1));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = BuilderConfig::new(InputType::Byte1);
        config.bytes_page_bits = 0;
        assert!(matches!(
            Builder::with_config(config, NoOutputs),
            Err(FstError::InvalidConfig(_))
        ));
    }
}
