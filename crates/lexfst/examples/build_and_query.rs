// Builds a small word-frequency automaton, packs it, saves and reloads it,
// then runs each kind of query.
//
// Run:
//   cargo run -p lexfst --example build_and_query

use lexfst::config::BuilderConfig;
use lexfst::outputs::PositiveIntOutputs;
use lexfst::search;
use lexfst::{Builder, BytesFstEnum, Fst, FstError, InputType};
use lexfst_core::labels::labels_to_bytes;
use lexfst_core::packed::overhead;

/// Word and rank (lower is more frequent).
const WORDS: &[(&str, u64)] = &[
    ("the", 1),
    ("then", 40),
    ("there", 25),
    ("these", 60),
    ("they", 12),
    ("this", 9),
    ("those", 80),
    ("three", 70),
    ("through", 55),
];

fn main() -> Result<(), FstError> {
    let mut words = WORDS.to_vec();
    words.sort_unstable();

    let config = BuilderConfig::new(InputType::Byte1).with_packing(overhead::DEFAULT);
    let mut builder = Builder::with_config(config, PositiveIntOutputs)?;
    for (word, rank) in &words {
        builder.add_bytes(word.as_bytes(), *rank)?;
    }
    let Some(fst) = builder.finish()? else {
        return Ok(());
    };
    println!(
        "{} words, {} nodes, {} arcs, {} bytes in memory",
        words.len(),
        fst.node_count(),
        fst.arc_count(),
        fst.size_in_bytes()
    );

    let bytes = fst.to_bytes()?;
    let fst = Fst::from_bytes(&bytes, PositiveIntOutputs)?;
    println!("saved and reloaded {} bytes", bytes.len());

    println!("rank of \"they\": {:?}", search::get_bytes(&fst, b"they")?);
    println!("rank of \"thy\": {:?}", search::get_bytes(&fst, b"thy")?);

    let mut e = BytesFstEnum::new(&fst);
    if let Some(io) = e.seek_ceil(b"thes")? {
        println!("first word >= \"thes\": {} ({})", String::from_utf8_lossy(io.input), io.output);
    }
    if let Some(io) = e.seek_floor(b"thes")? {
        println!("last word <= \"thes\": {} ({})", String::from_utf8_lossy(io.input), io.output);
    }

    // Top three completions of "th" by rank.
    let mut reader = fst.bytes_reader();
    let mut follow = fst.first_arc();
    let mut arc = fst.new_arc();
    let mut prefix_output = 0;
    for &b in b"th" {
        if !fst.find_target_arc(i32::from(b), &follow, &mut arc, &mut reader)? {
            return Ok(());
        }
        prefix_output += arc.output;
        std::mem::swap(&mut follow, &mut arc);
    }
    let top = search::shortest_paths(&fst, &follow, prefix_output, |a: &u64, b: &u64| a.cmp(b), 3, true)?;
    for result in &top.top_n {
        let suffix = labels_to_bytes(&result.input);
        println!("  th{} ({})", String::from_utf8_lossy(&suffix), result.output);
    }
    Ok(())
}
