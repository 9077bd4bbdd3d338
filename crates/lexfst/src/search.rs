// Lookup and search utilities built on the arc traversal primitives.

use std::cmp::Ordering;

use lexfst_core::data_io::DataInput;
use lexfst_core::labels::bytes_to_labels;

use crate::arc::{Arc, BIT_ARC_HAS_OUTPUT};
use crate::bytes_store::{BytesReader, StoreReader};
use crate::fst::{END_LABEL, Fst};
use crate::outputs::{Outputs, PositiveIntOutputs};
use crate::{FstError, Result};

/// Output for `input`, or `None` if the automaton does not accept it.
pub fn get<O: Outputs>(fst: &Fst<O>, input: &[i32]) -> Result<Option<O::Value>> {
    let mut reader = fst.bytes_reader();
    let mut follow = fst.first_arc();
    let mut arc = fst.new_arc();
    let outputs = fst.outputs();
    let mut output = outputs.no_output();
    for &label in input {
        if !fst.find_target_arc(label, &follow, &mut arc, &mut reader)? {
            return Ok(None);
        }
        output = outputs.add(&output, &arc.output);
        std::mem::swap(&mut follow, &mut arc);
    }
    if follow.is_final() {
        Ok(Some(outputs.add(&output, &follow.next_final_output)))
    } else {
        Ok(None)
    }
}

/// [`get`] for byte-labelled automata.
pub fn get_bytes<O: Outputs>(fst: &Fst<O>, input: &[u8]) -> Result<Option<O::Value>> {
    get(fst, &bytes_to_labels(input))
}

/// Reverse lookup: the input whose output is exactly `target`.
///
/// Outputs must be non-decreasing in input order along every path, as
/// they are when each input's output is its ordinal. Returns `None` if no
/// input maps to `target`.
pub fn get_by_output(fst: &Fst<PositiveIntOutputs>, target: u64) -> Result<Option<Vec<i32>>> {
    let mut reader = fst.bytes_reader();
    let mut arc = fst.first_arc();
    let mut output = arc.output;
    let mut result = Vec::new();

    loop {
        if arc.is_final() {
            let final_output = output + arc.next_final_output;
            match final_output.cmp(&target) {
                Ordering::Equal => return Ok(Some(result)),
                Ordering::Greater => return Ok(None),
                Ordering::Less => {}
            }
        }
        if !arc.target_has_arcs() {
            return Ok(None);
        }

        let node = arc.target;
        fst.read_first_real_target_arc(node, &mut arc, &mut reader)?;
        if arc.in_array() {
            let mut low = 0i64;
            let mut high = arc.num_arcs - 1;
            let mut exact = None;
            while low <= high {
                let mid = (low + high) >> 1;
                reader.set_position(arc.pos_arcs_start);
                reader.skip_bytes(arc.bytes_per_arc * mid);
                let flags = reader.read_byte()?;
                fst.read_label(&mut reader)?;
                let min_arc_output = if flags & BIT_ARC_HAS_OUTPUT != 0 {
                    output + fst.outputs().read(&mut reader)?
                } else {
                    output
                };
                match min_arc_output.cmp(&target) {
                    Ordering::Equal => {
                        exact = Some(mid);
                        break;
                    }
                    Ordering::Less => low = mid + 1,
                    Ordering::Greater => high = mid - 1,
                }
            }
            if high == -1 {
                return Ok(None);
            }
            // Without an exact hit, the last arc starting below the target.
            arc.arc_idx = exact.unwrap_or(low - 1) - 1;
            fst.read_next_real_arc(&mut arc, &mut reader)?;
            result.push(arc.label);
            output += arc.output;
        } else {
            let mut prev: Option<Arc<u64>> = None;
            loop {
                let min_arc_output = output + arc.output;
                if min_arc_output == target || (min_arc_output < target && arc.is_last()) {
                    output = min_arc_output;
                    result.push(arc.label);
                    break;
                } else if min_arc_output > target {
                    let Some(prev) = prev else {
                        return Ok(None);
                    };
                    arc = prev;
                    result.push(arc.label);
                    output += arc.output;
                    break;
                }
                prev = Some(arc.clone());
                fst.read_next_real_arc(&mut arc, &mut reader)?;
            }
        }
    }
}

/// Reads the arc leaving `follow`'s target with the smallest label
/// `>= label` into `arc`. Returns `false` if there is none.
pub fn read_ceil_arc<O: Outputs, R: BytesReader + ?Sized>(
    label: i32,
    fst: &Fst<O>,
    follow: &Arc<O::Value>,
    arc: &mut Arc<O::Value>,
    reader: &mut R,
) -> Result<bool> {
    if label == END_LABEL {
        return fst.find_target_arc(END_LABEL, follow, arc, reader);
    }
    if !follow.target_has_arcs() {
        return Ok(false);
    }
    fst.read_first_target_arc(follow, arc, reader)?;
    if arc.in_array() && arc.label != END_LABEL {
        let mut low = arc.arc_idx;
        let mut high = arc.num_arcs - 1;
        while low <= high {
            let mid = (low + high) >> 1;
            reader.set_position(arc.pos_arcs_start);
            reader.skip_bytes(arc.bytes_per_arc * mid + 1);
            let mid_label = fst.read_label(reader)?;
            match mid_label.cmp(&label) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid - 1,
                Ordering::Equal => {
                    arc.arc_idx = mid - 1;
                    fst.read_next_real_arc(arc, reader)?;
                    return Ok(true);
                }
            }
        }
        if low == arc.num_arcs {
            return Ok(false);
        }
        arc.arc_idx = high;
        fst.read_next_real_arc(arc, reader)?;
        return Ok(true);
    }

    fst.read_first_real_target_arc(follow.target, arc, reader)?;
    loop {
        if arc.label >= label {
            return Ok(true);
        } else if arc.is_last() {
            return Ok(false);
        }
        fst.read_next_real_arc(arc, reader)?;
    }
}

/// A partial path in a top-N search.
#[derive(Debug, Clone)]
pub struct FstPath<V> {
    /// Arc to take next.
    pub arc: Arc<V>,
    /// Cost of the labels in `input`.
    pub cost: V,
    pub input: Vec<i32>,
}

/// One completed path.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<V> {
    pub input: Vec<i32>,
    pub output: V,
}

/// Outcome of a top-N search.
#[derive(Debug, Clone, PartialEq)]
pub struct TopResults<V> {
    /// `false` if the queue bound may have pruned a path that belongs in
    /// the results.
    pub is_complete: bool,
    pub top_n: Vec<SearchResult<V>>,
}

type AcceptFn<'a, V> = Box<dyn FnMut(&[i32], &V) -> bool + 'a>;

/// Finds the `top_n` lowest-cost completions from one or more start arcs.
///
/// Costs are compared with `comparator`; equal costs are ordered by input.
/// The search relies on every node having an arc whose output compares
/// equal to the algebra's empty output, which holds for automata built
/// with [`PositiveIntOutputs`].
pub struct TopNSearcher<'a, O: Outputs, C> {
    fst: &'a Fst<O>,
    reader: StoreReader<'a>,
    top_n: usize,
    max_queue_depth: usize,
    comparator: C,
    accept: Option<AcceptFn<'a, O::Value>>,
    /// Pending paths, best first. `None` once no further path can compete.
    queue: Option<Vec<FstPath<O::Value>>>,
}

impl<'a, O, C> TopNSearcher<'a, O, C>
where
    O: Outputs,
    C: Fn(&O::Value, &O::Value) -> Ordering,
{
    pub fn new(fst: &'a Fst<O>, top_n: usize, max_queue_depth: usize, comparator: C) -> Result<Self> {
        if top_n == 0 || max_queue_depth < top_n {
            return Err(FstError::InvalidConfig(format!(
                "top_n must be at least 1 and at most max_queue_depth (top_n={top_n}, max_queue_depth={max_queue_depth})"
            )));
        }
        Ok(Self {
            fst,
            reader: fst.bytes_reader(),
            top_n,
            max_queue_depth,
            comparator,
            accept: None,
            queue: Some(Vec::new()),
        })
    }

    /// Only results for which `accept` returns `true` are kept. Rejected
    /// results make the outcome incomplete once they exceed the queue
    /// slack.
    pub fn with_accept(mut self, accept: impl FnMut(&[i32], &O::Value) -> bool + 'a) -> Self {
        self.accept = Some(Box::new(accept));
        self
    }

    fn compare_paths(&self, a: &FstPath<O::Value>, b: &FstPath<O::Value>) -> Ordering {
        (self.comparator)(&a.cost, &b.cost).then_with(|| a.input.cmp(&b.input))
    }

    /// Queues `path` extended by its arc, if it can still make the cut.
    fn add_if_competitive(&mut self, path: &FstPath<O::Value>) {
        let cost = self.fst.outputs().add(&path.cost, &path.arc.output);
        let Some(queue) = &self.queue else {
            return;
        };
        if queue.len() == self.max_queue_depth {
            if let Some(bottom) = queue.last() {
                match (self.comparator)(&cost, &bottom.cost) {
                    Ordering::Greater => return,
                    Ordering::Equal => {
                        let extended = path.input.iter().copied().chain(std::iter::once(path.arc.label));
                        if bottom.input.iter().copied().cmp(extended) == Ordering::Less {
                            return;
                        }
                    }
                    Ordering::Less => {}
                }
            }
        }

        let mut input = Vec::with_capacity(path.input.len() + 1);
        input.extend_from_slice(&path.input);
        input.push(path.arc.label);
        let new_path = FstPath {
            arc: path.arc.clone(),
            cost,
            input,
        };

        let idx = match &self.queue {
            Some(queue) => queue
                .binary_search_by(|probe| self.compare_paths(probe, &new_path))
                .unwrap_or_else(|idx| idx),
            None => return,
        };
        let max_queue_depth = self.max_queue_depth;
        if let Some(queue) = &mut self.queue {
            queue.insert(idx, new_path);
            if queue.len() > max_queue_depth {
                queue.pop();
            }
        }
    }

    /// Queues one path per arc leaving `node`'s target, each starting from
    /// `start_output` and `input`. The END_LABEL arc of a final target is
    /// only queued when `allow_empty_string` is set.
    pub fn add_start_paths(
        &mut self,
        node: &Arc<O::Value>,
        start_output: O::Value,
        allow_empty_string: bool,
        input: Vec<i32>,
    ) -> Result<()> {
        let mut path = FstPath {
            arc: node.clone(),
            cost: start_output,
            input,
        };
        self.fst.read_first_target_arc(node, &mut path.arc, &mut self.reader)?;
        loop {
            if allow_empty_string || path.arc.label != END_LABEL {
                self.add_if_competitive(&path);
            }
            if path.arc.is_last() {
                return Ok(());
            }
            self.fst.read_next_arc(&mut path.arc, &mut self.reader)?;
        }
    }

    fn accept_result(&mut self, input: &[i32], output: &O::Value) -> bool {
        match &mut self.accept {
            Some(accept) => accept(input, output),
            None => true,
        }
    }

    fn pop_best(&mut self) -> Option<FstPath<O::Value>> {
        let queue = self.queue.as_mut()?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }

    /// Runs the search over the queued start paths.
    pub fn search(&mut self) -> Result<TopResults<O::Value>> {
        let mut results = Vec::new();
        let no_output = self.fst.outputs().no_output();
        let mut reject_count = 0usize;

        while results.len() < self.top_n {
            let Some(mut path) = self.pop_best() else {
                break;
            };

            if path.arc.label == END_LABEL {
                // Queued with allow_empty_string: the start node itself.
                path.input.pop();
                results.push(SearchResult {
                    input: path.input,
                    output: path.cost,
                });
                continue;
            }

            if results.len() == self.top_n - 1 && self.max_queue_depth == self.top_n {
                // Only this path can still produce the last result.
                self.queue = None;
            }

            // Follow the zero-cost arcs down to a final node, queueing the
            // other siblings on the way.
            loop {
                let follow = path.arc.clone();
                self.fst.read_first_target_arc(&follow, &mut path.arc, &mut self.reader)?;

                let mut zero_arc: Option<Arc<O::Value>> = None;
                loop {
                    if (self.comparator)(&no_output, &path.arc.output) == Ordering::Equal {
                        if self.queue.is_none() {
                            zero_arc = Some(path.arc.clone());
                            break;
                        } else if zero_arc.is_none() {
                            zero_arc = Some(path.arc.clone());
                        } else {
                            self.add_if_competitive(&path);
                        }
                    } else if self.queue.is_some() {
                        self.add_if_competitive(&path);
                    }
                    if path.arc.is_last() {
                        break;
                    }
                    self.fst.read_next_arc(&mut path.arc, &mut self.reader)?;
                }

                let Some(zero_arc) = zero_arc else {
                    return Err(FstError::Corrupt(
                        "node has no arc with an empty output".into(),
                    ));
                };
                path.arc = zero_arc;

                if path.arc.label == END_LABEL {
                    let final_output = self.fst.outputs().add(&path.cost, &path.arc.output);
                    if self.accept_result(&path.input, &final_output) {
                        results.push(SearchResult {
                            input: path.input,
                            output: final_output,
                        });
                    } else {
                        reject_count += 1;
                    }
                    break;
                }
                path.input.push(path.arc.label);
                path.cost = self.fst.outputs().add(&path.cost, &path.arc.output);
            }
        }

        let is_complete = reject_count + self.top_n <= self.max_queue_depth;
        tracing::trace!(
            results = results.len(),
            rejected = reject_count,
            is_complete,
            "top-n search finished"
        );
        Ok(TopResults {
            is_complete,
            top_n: results,
        })
    }
}

/// The `top_n` lowest-cost paths from `from`'s target to a final node.
pub fn shortest_paths<O, C>(
    fst: &Fst<O>,
    from: &Arc<O::Value>,
    start_output: O::Value,
    comparator: C,
    top_n: usize,
    allow_empty_string: bool,
) -> Result<TopResults<O::Value>>
where
    O: Outputs,
    C: Fn(&O::Value, &O::Value) -> Ordering,
{
    let mut searcher = TopNSearcher::new(fst, top_n, top_n, comparator)?;
    searcher.add_start_paths(from, start_output, allow_empty_string, Vec::new())?;
    searcher.search()
}
