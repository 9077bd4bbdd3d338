// Ordered cursor over the inputs of an automaton.
//
// The cursor keeps one arc per depth. Slot 0 holds the virtual arc into the
// start node; slot `i` holds the arc taken for the `i`-th label, and the top
// slot of a positioned cursor is always an END_LABEL arc carrying the final
// output. Seeks first rewind to the prefix shared with the previous position,
// so nearby seeks only re-read the nodes that differ.

use std::cmp::Ordering;

use crate::{FstError, Result};
use crate::arc::Arc;
use crate::bytes_store::{BytesReader, StoreReader};
use crate::fst::{END_LABEL, Fst};
use crate::outputs::Outputs;

/// One enumerated entry. Borrows the cursor's buffers until the next move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputOutput<'e, I: ?Sized, V> {
    pub input: &'e I,
    pub output: &'e V,
}

/// Label-level cursor shared by the typed enumerators.
struct FstEnum<'a, O: Outputs> {
    fst: &'a Fst<O>,
    reader: StoreReader<'a>,
    arcs: Vec<Arc<O::Value>>,
    /// Cumulative output per depth.
    output: Vec<O::Value>,
    /// Current labels; slot 0 is unused.
    current: Vec<i32>,
    target: Vec<i32>,
    upto: usize,
    /// Set once `next` has moved past the last input; cleared by seeks.
    exhausted: bool,
}

/// Splits `arcs` into the arc at `upto - 1` and a mutable arc at `upto`.
fn arc_pair<V>(arcs: &mut [Arc<V>], upto: usize) -> (&Arc<V>, &mut Arc<V>) {
    let (head, tail) = arcs.split_at_mut(upto);
    (&head[upto - 1], &mut tail[0])
}

impl<'a, O: Outputs> FstEnum<'a, O> {
    fn new(fst: &'a Fst<O>) -> Self {
        let no_output = fst.outputs().no_output();
        Self {
            fst,
            reader: fst.bytes_reader(),
            arcs: vec![fst.first_arc(), fst.new_arc()],
            output: vec![no_output.clone(), no_output],
            current: vec![0, 0],
            target: Vec::new(),
            upto: 0,
            exhausted: false,
        }
    }

    fn target_label(&self) -> i32 {
        if self.upto - 1 == self.target.len() {
            END_LABEL
        } else {
            self.target[self.upto - 1]
        }
    }

    fn current_label(&self) -> i32 {
        self.current[self.upto]
    }

    fn set_current_label(&mut self, label: i32) {
        self.current[self.upto] = label;
    }

    /// Moves one level deeper, growing the per-depth buffers as needed.
    fn incr(&mut self) {
        self.upto += 1;
        if self.arcs.len() <= self.upto {
            self.arcs.push(self.fst.new_arc());
            self.output.push(self.fst.outputs().no_output());
            self.current.push(0);
        }
    }

    fn read_first_target_arc(&mut self, upto: usize) -> Result<()> {
        let (follow, arc) = arc_pair(&mut self.arcs, upto);
        self.fst.read_first_target_arc(follow, arc, &mut self.reader)
    }

    fn accumulate_output(&mut self) {
        let upto = self.upto;
        self.output[upto] = self
            .fst
            .outputs()
            .add(&self.output[upto - 1], &self.arcs[upto].output);
    }

    /// Pops back to the deepest level shared with the target.
    fn rewind_prefix(&mut self) -> Result<()> {
        if self.upto == 0 {
            self.upto = 1;
            return self.read_first_target_arc(1);
        }
        let current_limit = self.upto;
        self.upto = 1;
        while self.upto < current_limit && self.upto <= self.target.len() + 1 {
            match self.current_label().cmp(&self.target_label()) {
                Ordering::Less => break,
                Ordering::Greater => {
                    let upto = self.upto;
                    self.read_first_target_arc(upto)?;
                    break;
                }
                Ordering::Equal => self.upto += 1,
            }
        }
        Ok(())
    }

    fn do_next(&mut self) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        if self.upto == 0 {
            self.upto = 1;
            self.read_first_target_arc(1)?;
        } else {
            while self.arcs[self.upto].is_last() {
                self.upto -= 1;
                if self.upto == 0 {
                    self.exhausted = true;
                    return Ok(());
                }
            }
            let upto = self.upto;
            self.fst.read_next_arc(&mut self.arcs[upto], &mut self.reader)?;
        }
        self.push_first()
    }

    /// Descends from the current arc via first arcs to the first final
    /// position.
    fn push_first(&mut self) -> Result<()> {
        loop {
            self.accumulate_output();
            let label = self.arcs[self.upto].label;
            if label == END_LABEL {
                return Ok(());
            }
            self.set_current_label(label);
            self.incr();
            let upto = self.upto;
            self.read_first_target_arc(upto)?;
        }
    }

    /// Descends from the current arc via last arcs to the last final
    /// position.
    fn push_last(&mut self) -> Result<()> {
        loop {
            let label = self.arcs[self.upto].label;
            self.set_current_label(label);
            self.accumulate_output();
            if label == END_LABEL {
                return Ok(());
            }
            self.incr();
            let (follow, arc) = arc_pair(&mut self.arcs, self.upto);
            self.fst.read_last_target_arc(follow, arc, &mut self.reader)?;
        }
    }

    /// Matched the target label at this level: descend into the arc.
    /// Returns `false` once the END_LABEL match completes the seek.
    fn descend_match(&mut self, target_label: i32) -> Result<bool> {
        self.accumulate_output();
        if target_label == END_LABEL {
            return Ok(false);
        }
        self.set_current_label(target_label);
        self.incr();
        let upto = self.upto;
        self.read_first_target_arc(upto)?;
        Ok(true)
    }

    /// Dead end after the last arc of a node: resume at the next sibling of
    /// the nearest ancestor that has one.
    fn rollback_to_next_fork(&mut self) -> Result<()> {
        self.upto -= 1;
        loop {
            if self.upto == 0 {
                return Ok(());
            }
            let upto = self.upto;
            if !self.arcs[upto].is_last() {
                self.fst.read_next_arc(&mut self.arcs[upto], &mut self.reader)?;
                return self.push_first();
            }
            self.upto -= 1;
        }
    }

    /// Binary search within an array node, starting at the arc's current
    /// index. Returns `(found, low, high)`.
    fn search_array(&mut self, target_label: i32) -> Result<(bool, i64, i64)> {
        let arc = &self.arcs[self.upto];
        let mut low = arc.arc_idx.max(0);
        let mut high = arc.num_arcs - 1;
        while low <= high {
            let mid = (low + high) >> 1;
            self.reader.set_position(arc.pos_arcs_start);
            self.reader.skip_bytes(arc.bytes_per_arc * mid + 1);
            let mid_label = self.fst.read_label(&mut self.reader)?;
            match mid_label.cmp(&target_label) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid - 1,
                Ordering::Equal => return Ok((true, mid, mid)),
            }
        }
        Ok((false, low, high))
    }

    /// Positions the array arc at `idx`.
    fn read_array_arc(&mut self, idx: i64) -> Result<()> {
        let upto = self.upto;
        let arc = &mut self.arcs[upto];
        arc.arc_idx = idx - 1;
        self.fst.read_next_real_arc(arc, &mut self.reader)
    }

    fn do_seek_ceil(&mut self) -> Result<()> {
        self.exhausted = false;
        self.seek_ceil_path()?;
        // Nothing at or after the target, so nothing for `next` either.
        self.exhausted = self.upto == 0;
        Ok(())
    }

    fn seek_ceil_path(&mut self) -> Result<()> {
        self.rewind_prefix()?;
        let mut target_label = self.target_label();
        loop {
            let arc = &self.arcs[self.upto];
            if arc.in_array() && arc.label != END_LABEL {
                let num_arcs = arc.num_arcs;
                let (found, low, high) = self.search_array(target_label)?;
                if found {
                    self.read_array_arc(low)?;
                    if !self.descend_match(target_label)? {
                        return Ok(());
                    }
                    target_label = self.target_label();
                } else if low == num_arcs {
                    self.read_array_arc(num_arcs - 1)?;
                    return self.rollback_to_next_fork();
                } else {
                    self.read_array_arc(low.max(high))?;
                    return self.push_first();
                }
            } else if arc.label == target_label {
                if !self.descend_match(target_label)? {
                    return Ok(());
                }
                target_label = self.target_label();
            } else if arc.label > target_label {
                return self.push_first();
            } else if arc.is_last() {
                return self.rollback_to_next_fork();
            } else {
                let upto = self.upto;
                self.fst.read_next_arc(&mut self.arcs[upto], &mut self.reader)?;
            }
        }
    }

    /// Every arc at this level is above the target: back up to the nearest
    /// level that has an arc below its target label and take its last path.
    fn walk_back_to_floor(&mut self, mut target_label: i32) -> Result<()> {
        loop {
            self.read_first_target_arc(self.upto)?;
            if self.arcs[self.upto].label < target_label {
                let upto = self.upto;
                while !self.arcs[upto].is_last()
                    && self.fst.read_next_arc_label(&self.arcs[upto], &mut self.reader)? < target_label
                {
                    self.fst.read_next_arc(&mut self.arcs[upto], &mut self.reader)?;
                }
                return self.push_last();
            }
            self.upto -= 1;
            if self.upto == 0 {
                return Ok(());
            }
            target_label = self.target_label();
        }
    }

    fn do_seek_floor(&mut self) -> Result<()> {
        self.exhausted = false;
        self.rewind_prefix()?;
        let mut target_label = self.target_label();
        loop {
            let arc = &self.arcs[self.upto];
            if arc.in_array() && arc.label != END_LABEL {
                let (found, low, high) = self.search_array(target_label)?;
                if found {
                    self.read_array_arc(low)?;
                    if !self.descend_match(target_label)? {
                        return Ok(());
                    }
                    target_label = self.target_label();
                } else if high == -1 {
                    return self.walk_back_to_floor(target_label);
                } else {
                    self.read_array_arc(low.min(high))?;
                    return self.push_last();
                }
            } else if arc.label == target_label {
                if !self.descend_match(target_label)? {
                    return Ok(());
                }
                target_label = self.target_label();
            } else if arc.label > target_label {
                return self.walk_back_to_floor(target_label);
            } else if !arc.is_last() {
                let upto = self.upto;
                if self.fst.read_next_arc_label(&self.arcs[upto], &mut self.reader)? > target_label {
                    return self.push_last();
                }
                self.fst.read_next_arc(&mut self.arcs[upto], &mut self.reader)?;
            } else {
                return self.push_last();
            }
        }
    }

    fn do_seek_exact(&mut self) -> Result<bool> {
        self.exhausted = false;
        self.rewind_prefix()?;
        let mut target_label = self.target_label();
        loop {
            let upto = self.upto;
            let (follow, arc) = arc_pair(&mut self.arcs, upto);
            if !self.fst.find_target_arc(target_label, follow, arc, &mut self.reader)? {
                // Leave a valid arc in this slot for later moves.
                self.read_first_target_arc(upto)?;
                return Ok(false);
            }
            self.accumulate_output();
            if target_label == END_LABEL {
                return Ok(true);
            }
            self.set_current_label(target_label);
            self.incr();
            target_label = self.target_label();
        }
    }

    fn set_target(&mut self, target: impl IntoIterator<Item = i32>) {
        self.target.clear();
        self.target.extend(target);
    }

    /// Labels of the current position, or `None` when exhausted.
    fn current(&self) -> Option<(&[i32], &O::Value)> {
        if self.upto == 0 {
            None
        } else {
            Some((&self.current[1..self.upto], &self.output[self.upto]))
        }
    }
}

/// Enumerates an automaton's inputs as label sequences, in order.
///
/// ```
/// use lexfst::{Builder, InputType, IntsFstEnum, outputs::PositiveIntOutputs};
///
/// let mut builder = Builder::new(InputType::Byte4, PositiveIntOutputs);
/// builder.add(&[1, 2], 5).unwrap();
/// builder.add(&[1, 7], 6).unwrap();
/// let fst = builder.finish().unwrap().unwrap();
///
/// let mut e = IntsFstEnum::new(&fst);
/// let hit = e.seek_ceil(&[1, 3]).unwrap().unwrap();
/// assert_eq!((hit.input, *hit.output), (&[1, 7][..], 6));
/// ```
pub struct IntsFstEnum<'a, O: Outputs> {
    inner: FstEnum<'a, O>,
}

impl<'a, O: Outputs> IntsFstEnum<'a, O> {
    pub fn new(fst: &'a Fst<O>) -> Self {
        Self {
            inner: FstEnum::new(fst),
        }
    }

    pub fn current(&self) -> Option<InputOutput<'_, [i32], O::Value>> {
        self.inner
            .current()
            .map(|(input, output)| InputOutput { input, output })
    }

    pub fn next(&mut self) -> Result<Option<InputOutput<'_, [i32], O::Value>>> {
        self.inner.do_next()?;
        Ok(self.current())
    }

    /// Positions at the smallest input `>= target`.
    pub fn seek_ceil(&mut self, target: &[i32]) -> Result<Option<InputOutput<'_, [i32], O::Value>>> {
        self.inner.set_target(target.iter().copied());
        self.inner.do_seek_ceil()?;
        Ok(self.current())
    }

    /// Positions at the largest input `<= target`.
    pub fn seek_floor(&mut self, target: &[i32]) -> Result<Option<InputOutput<'_, [i32], O::Value>>> {
        self.inner.set_target(target.iter().copied());
        self.inner.do_seek_floor()?;
        Ok(self.current())
    }

    /// Positions at `target` if the automaton accepts it.
    pub fn seek_exact(&mut self, target: &[i32]) -> Result<Option<InputOutput<'_, [i32], O::Value>>> {
        self.inner.set_target(target.iter().copied());
        if self.inner.do_seek_exact()? {
            Ok(self.current())
        } else {
            Ok(None)
        }
    }
}

/// Enumerates a byte-labelled automaton's inputs as byte strings.
pub struct BytesFstEnum<'a, O: Outputs> {
    inner: FstEnum<'a, O>,
    bytes: Vec<u8>,
}

impl<'a, O: Outputs> BytesFstEnum<'a, O> {
    pub fn new(fst: &'a Fst<O>) -> Self {
        Self {
            inner: FstEnum::new(fst),
            bytes: Vec::new(),
        }
    }

    fn sync(&mut self) -> Result<Option<InputOutput<'_, [u8], O::Value>>> {
        let Some((labels, output)) = self.inner.current() else {
            return Ok(None);
        };
        self.bytes.clear();
        for &label in labels {
            let byte = u8::try_from(label).map_err(|_| FstError::LabelOutOfRange {
                label,
                input_type: self.inner.fst.input_type(),
            })?;
            self.bytes.push(byte);
        }
        Ok(Some(InputOutput {
            input: &self.bytes,
            output,
        }))
    }

    pub fn current(&self) -> Option<InputOutput<'_, [u8], O::Value>> {
        let (_, output) = self.inner.current()?;
        Some(InputOutput {
            input: &self.bytes,
            output,
        })
    }

    pub fn next(&mut self) -> Result<Option<InputOutput<'_, [u8], O::Value>>> {
        self.inner.do_next()?;
        self.sync()
    }

    pub fn seek_ceil(&mut self, target: &[u8]) -> Result<Option<InputOutput<'_, [u8], O::Value>>> {
        self.inner.set_target(target.iter().map(|&b| i32::from(b)));
        self.inner.do_seek_ceil()?;
        self.sync()
    }

    pub fn seek_floor(&mut self, target: &[u8]) -> Result<Option<InputOutput<'_, [u8], O::Value>>> {
        self.inner.set_target(target.iter().map(|&b| i32::from(b)));
        self.inner.do_seek_floor()?;
        self.sync()
    }

    pub fn seek_exact(&mut self, target: &[u8]) -> Result<Option<InputOutput<'_, [u8], O::Value>>> {
        self.inner.set_target(target.iter().map(|&b| i32::from(b)));
        if self.inner.do_seek_exact()? {
            self.sync()
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputType;
    use crate::outputs::PositiveIntOutputs;
    use crate::{Builder, Fst};

    fn build(words: &[&str]) -> Fst<PositiveIntOutputs> {
        let mut b = Builder::new(InputType::Byte1, PositiveIntOutputs);
        for (i, w) in words.iter().enumerate() {
            b.add_bytes(w.as_bytes(), i as u64).unwrap();
        }
        b.finish().unwrap().unwrap()
    }

    fn entry(hit: Option<InputOutput<'_, [u8], u64>>) -> Option<(String, u64)> {
        hit.map(|io| (String::from_utf8_lossy(io.input).into_owned(), *io.output))
    }

    const WORDS: [&str; 6] = ["", "aa", "ab", "abc", "b", "bcd"];

    #[test]
    fn next_visits_in_order() {
        let fst = build(&WORDS);
        let mut e = BytesFstEnum::new(&fst);
        let mut seen = Vec::new();
        while let Some(io) = e.next().unwrap() {
            seen.push((io.input.to_vec(), *io.output));
        }
        let expected: Vec<(Vec<u8>, u64)> = WORDS
            .iter()
            .enumerate()
            .map(|(i, w)| (w.as_bytes().to_vec(), i as u64))
            .collect();
        assert_eq!(seen, expected);
        assert!(e.next().unwrap().is_none());
    }

    #[test]
    fn seek_ceil_cases() {
        let fst = build(&WORDS);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.seek_ceil(b"ab").unwrap()), Some(("ab".into(), 2)));
        assert_eq!(entry(e.seek_ceil(b"aba").unwrap()), Some(("abc".into(), 3)));
        assert_eq!(entry(e.seek_ceil(b"abd").unwrap()), Some(("b".into(), 4)));
        assert_eq!(entry(e.seek_ceil(b"a").unwrap()), Some(("aa".into(), 1)));
        assert_eq!(entry(e.seek_ceil(b"c").unwrap()), None);
        assert_eq!(entry(e.seek_ceil(b"").unwrap()), Some(("".into(), 0)));
    }

    #[test]
    fn seek_floor_cases() {
        let fst = build(&WORDS);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.seek_floor(b"abz").unwrap()), Some(("abc".into(), 3)));
        assert_eq!(entry(e.seek_floor(b"ba").unwrap()), Some(("b".into(), 4)));
        assert_eq!(entry(e.seek_floor(b"zzz").unwrap()), Some(("bcd".into(), 5)));
        assert_eq!(entry(e.seek_floor(b"a").unwrap()), Some(("".into(), 0)));
        assert_eq!(entry(e.seek_floor(b"ab").unwrap()), Some(("ab".into(), 2)));
    }

    #[test]
    fn seek_floor_before_everything() {
        let fst = build(&["m", "n"]);
        let mut e = BytesFstEnum::new(&fst);
        assert!(e.seek_floor(b"a").unwrap().is_none());
    }

    #[test]
    fn seek_exact_hits_and_misses() {
        let fst = build(&WORDS);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.seek_exact(b"abc").unwrap()), Some(("abc".into(), 3)));
        assert!(e.seek_exact(b"abd").unwrap().is_none());
        assert!(e.seek_exact(b"a").unwrap().is_none());
        assert_eq!(entry(e.seek_exact(b"bcd").unwrap()), Some(("bcd".into(), 5)));
    }

    #[test]
    fn next_continues_after_seek() {
        let fst = build(&WORDS);
        let mut e = BytesFstEnum::new(&fst);
        e.seek_ceil(b"ab").unwrap();
        assert_eq!(entry(e.next().unwrap()), Some(("abc".into(), 3)));
        assert_eq!(entry(e.next().unwrap()), Some(("b".into(), 4)));
        assert_eq!(e.current().map(|io| *io.output), Some(4));
    }

    #[test]
    fn array_nodes_seek_both_ways() {
        // Root has enough arcs to be stored as an array.
        let words = ["b", "d", "f", "h", "j", "l", "n"];
        let fst = build(&words);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.seek_ceil(b"e").unwrap()), Some(("f".into(), 2)));
        assert_eq!(entry(e.seek_floor(b"e").unwrap()), Some(("d".into(), 1)));
        assert_eq!(entry(e.seek_ceil(b"o").unwrap()), None);
        assert_eq!(entry(e.seek_floor(b"a").unwrap()), None);
        assert_eq!(entry(e.seek_floor(b"z").unwrap()), Some(("n".into(), 6)));
        assert_eq!(entry(e.seek_exact(b"j").unwrap()), Some(("j".into(), 4)));
    }

    #[test]
    fn stays_exhausted_until_repositioned() {
        let fst = build(&["a"]);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.next().unwrap()), Some(("a".into(), 0)));
        for _ in 0..3 {
            assert!(e.next().unwrap().is_none());
            assert!(e.current().is_none());
        }
        // A seek past the end leaves nothing for `next` either.
        assert!(e.seek_ceil(b"b").unwrap().is_none());
        assert!(e.next().unwrap().is_none());
        assert_eq!(entry(e.seek_ceil(b"").unwrap()), Some(("a".into(), 0)));
        assert!(e.next().unwrap().is_none());
    }

    #[test]
    fn only_the_empty_input_is_visited_once() {
        let fst = build(&[""]);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.next().unwrap()), Some(("".into(), 0)));
        assert!(e.next().unwrap().is_none());
        assert!(e.next().unwrap().is_none());
    }

    fn build_labels(input_type: InputType, keys: &[&[i32]]) -> Fst<PositiveIntOutputs> {
        let mut b = Builder::new(input_type, PositiveIntOutputs);
        for (i, key) in keys.iter().enumerate() {
            b.add(key, i as u64).unwrap();
        }
        b.finish().unwrap().unwrap()
    }

    fn ints(hit: Option<InputOutput<'_, [i32], u64>>) -> Option<(Vec<i32>, u64)> {
        hit.map(|io| (io.input.to_vec(), *io.output))
    }

    #[test]
    fn seeks_over_two_byte_labels() {
        let fst = build_labels(InputType::Byte2, &[&[0x100], &[0x100, 0xFFFF], &[0x7FFF]]);
        let mut e = IntsFstEnum::new(&fst);
        assert_eq!(ints(e.seek_ceil(&[0x100, 0x200]).unwrap()), Some((vec![0x100, 0xFFFF], 1)));
        assert_eq!(ints(e.seek_ceil(&[0x101]).unwrap()), Some((vec![0x7FFF], 2)));
        assert_eq!(ints(e.seek_ceil(&[0x8000]).unwrap()), None);
        assert_eq!(ints(e.seek_floor(&[0x7FFE]).unwrap()), Some((vec![0x100, 0xFFFF], 1)));
        assert_eq!(ints(e.seek_floor(&[0xFFFF]).unwrap()), Some((vec![0x7FFF], 2)));
        assert_eq!(ints(e.seek_floor(&[0xFF]).unwrap()), None);
        assert_eq!(ints(e.seek_exact(&[0x100]).unwrap()), Some((vec![0x100], 0)));
        assert!(e.seek_exact(&[0x100, 0xFFFE]).unwrap().is_none());
    }

    #[test]
    fn seeks_over_four_byte_labels() {
        let fst = build_labels(
            InputType::Byte4,
            &[&[300], &[300, 70_000], &[70_000, 5], &[1_000_000]],
        );
        let mut e = IntsFstEnum::new(&fst);
        assert_eq!(ints(e.seek_ceil(&[300, 1]).unwrap()), Some((vec![300, 70_000], 1)));
        assert_eq!(ints(e.seek_ceil(&[70_000]).unwrap()), Some((vec![70_000, 5], 2)));
        assert_eq!(ints(e.seek_ceil(&[2_000_000]).unwrap()), None);
        assert_eq!(ints(e.seek_floor(&[70_000]).unwrap()), Some((vec![300, 70_000], 1)));
        assert_eq!(ints(e.seek_floor(&[999_999, 9]).unwrap()), Some((vec![70_000, 5], 2)));
        assert_eq!(ints(e.seek_floor(&[299]).unwrap()), None);
        assert_eq!(ints(e.seek_exact(&[1_000_000]).unwrap()), Some((vec![1_000_000], 3)));
        assert!(e.seek_exact(&[70_000]).unwrap().is_none());
    }

    #[test]
    fn byte_cursor_rejects_wide_labels() {
        let fst = build_labels(InputType::Byte2, &[&[0x41], &[0x141]]);
        let mut e = BytesFstEnum::new(&fst);
        assert_eq!(entry(e.next().unwrap()), Some(("A".into(), 0)));
        let err = e.next().unwrap_err();
        assert!(matches!(
            err,
            FstError::LabelOutOfRange {
                label: 0x141,
                input_type: InputType::Byte2
            }
        ));
    }
}
