// Graphviz export

use std::io::Write;

use hashbrown::HashSet;

use crate::Result;
use crate::arc::{Arc, BIT_TARGET_NEXT};
use crate::fst::Fst;
use crate::outputs::Outputs;

const EXPANDED_NODE_COLOR: &str = "blue";
const STATE_SHAPE: &str = "circle";
const FINAL_STATE_SHAPE: &str = "doublecircle";

/// Writes `fst` as a Graphviz digraph, breadth first from the start node.
///
/// Array-encoded nodes are drawn blue, arcs to the node written just
/// before them red, and final arcs bold. With `same_rank`, the states of
/// each level share a rank. Without `label_states`, states are drawn as
/// small filled dots.
pub fn to_dot<O: Outputs, W: Write + ?Sized>(
    fst: &Fst<O>,
    out: &mut W,
    same_rank: bool,
    label_states: bool,
) -> Result<()> {
    let outputs = fst.outputs();
    let mut reader = fst.bytes_reader();

    let start = fst.first_arc();
    let mut next_level: Vec<Arc<O::Value>> = vec![start.clone()];
    let mut this_level: Vec<Arc<O::Value>> = Vec::new();
    let mut same_level_states: Vec<i64> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    seen.insert(start.target);

    writeln!(out, "digraph FST {{")?;
    writeln!(
        out,
        "  rankdir = LR; splines=true; concentrate=true; ordering=out; ranksep=2.5; "
    )?;
    if !label_states {
        writeln!(out, "  node [shape=circle, width=.2, height=.2, style=filled]")?;
    }
    emit_state(out, "initial", Some("point"), Some("white"), "")?;

    {
        let color = fst
            .is_expanded_target(&start, &mut reader)?
            .then_some(EXPANDED_NODE_COLOR);
        let final_output = if start.is_final() && !outputs.is_no_output(&start.next_final_output) {
            outputs.output_to_string(&start.next_final_output)
        } else {
            String::new()
        };
        let shape = if start.is_final() { FINAL_STATE_SHAPE } else { STATE_SHAPE };
        emit_state(out, &start.target.to_string(), Some(shape), color, &final_output)?;
    }
    writeln!(out, "  initial -> {}", start.target)?;

    let mut level = 0;
    while !next_level.is_empty() {
        this_level.append(&mut next_level);
        level += 1;
        writeln!(out, "\n  // Transitions and states at level: {level}")?;

        while let Some(mut arc) = this_level.pop() {
            if !arc.target_has_arcs() {
                continue;
            }
            let node = arc.target;
            let color = fst
                .is_expanded_target(&arc, &mut reader)?
                .then_some(EXPANDED_NODE_COLOR);
            fst.read_first_real_target_arc(node, &mut arc, &mut reader)?;
            loop {
                if arc.target >= 0 && seen.insert(arc.target) {
                    let final_output = if outputs.is_no_output(&arc.next_final_output) {
                        String::new()
                    } else {
                        outputs.output_to_string(&arc.next_final_output)
                    };
                    emit_state(out, &arc.target.to_string(), Some(STATE_SHAPE), color, &final_output)?;
                    next_level.push(arc.clone());
                    same_level_states.push(arc.target);
                }

                let mut arc_outputs = String::new();
                if !outputs.is_no_output(&arc.output) {
                    arc_outputs.push('/');
                    arc_outputs.push_str(&outputs.output_to_string(&arc.output));
                }
                if !arc.target_has_arcs()
                    && arc.is_final()
                    && !outputs.is_no_output(&arc.next_final_output)
                {
                    arc_outputs.push_str("/[");
                    arc_outputs.push_str(&outputs.output_to_string(&arc.next_final_output));
                    arc_outputs.push(']');
                }
                let arc_color = if arc.flag(BIT_TARGET_NEXT) { "red" } else { "black" };
                writeln!(
                    out,
                    "  {} -> {} [label=\"{}{}\"{} color=\"{}\"]",
                    node,
                    arc.target,
                    printable_label(arc.label),
                    arc_outputs,
                    if arc.is_final() { " style=\"bold\"" } else { "" },
                    arc_color
                )?;

                if arc.is_last() {
                    break;
                }
                fst.read_next_real_arc(&mut arc, &mut reader)?;
            }
        }

        if same_rank && same_level_states.len() > 1 {
            write!(out, "  {{rank=same; ")?;
            for state in &same_level_states {
                write!(out, "{state}; ")?;
            }
            writeln!(out, " }}")?;
        }
        same_level_states.clear();
    }

    writeln!(out, "  -1 [style=filled, color=black, shape=doublecircle, label=\"\"]\n")?;
    writeln!(out, "  {{rank=sink; -1 }}")?;
    writeln!(out, "}}")?;
    out.flush()?;
    Ok(())
}

fn emit_state<W: Write + ?Sized>(
    out: &mut W,
    name: &str,
    shape: Option<&str>,
    color: Option<&str>,
    label: &str,
) -> Result<()> {
    let shape = shape.map(|s| format!("shape={s}")).unwrap_or_default();
    let color = color.map(|c| format!("color={c}")).unwrap_or_default();
    writeln!(out, "  {name} [{shape} {color} label=\"{label}\" ]")?;
    Ok(())
}

/// Printable ASCII as itself, anything else (and characters that would
/// need escaping inside a dot string) as hex.
fn printable_label(label: i32) -> String {
    match u8::try_from(label) {
        Ok(b) if (0x20..=0x7d).contains(&b) && b != b'"' && b != b'\\' => char::from(b).to_string(),
        _ => format!("0x{label:x}"),
    }
}
