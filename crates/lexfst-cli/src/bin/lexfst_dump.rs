// lexfst-dump: List the contents of an automaton file.
//
// Prints every key and value in key order as `key<TAB>value`, or the
// automaton as a Graphviz digraph with --dot.
//
// Usage:
//   lexfst-dump [OPTIONS] FST
//
// Options:
//   --dot            Print a Graphviz digraph instead of the key list
//   --same-rank      With --dot: put the states of each level on one rank
//   --label-states   With --dot: draw labelled states instead of dots
//   --stats          Print node, arc and size counters to stderr
//   -h, --help       Print help

use std::io::{self, Write};

use lexfst::IntsFstEnum;
use lexfst_cli::{fatal, labels_key};

fn main() {
    lexfst_cli::init_logging();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if lexfst_cli::wants_help(&args) {
        println!("lexfst-dump: List the contents of an automaton file.");
        println!();
        println!("Usage: lexfst-dump [OPTIONS] FST");
        println!();
        println!("Options:");
        println!("  --dot            Print a Graphviz digraph instead of the key list");
        println!("  --same-rank      With --dot: put the states of each level on one rank");
        println!("  --label-states   With --dot: draw labelled states instead of dots");
        println!("  --stats          Print node, arc and size counters to stderr");
        println!("  -h, --help       Print this help");
        return;
    }

    let dot = lexfst_cli::take_flag(&mut args, &["--dot"]);
    let same_rank = lexfst_cli::take_flag(&mut args, &["--same-rank"]);
    let label_states = lexfst_cli::take_flag(&mut args, &["--label-states"]);
    let stats = lexfst_cli::take_flag(&mut args, &["--stats"]);
    let [path] = args.as_slice() else {
        fatal("expected exactly one FST path (see --help)");
    };
    let fst = lexfst_cli::load_fst(path).unwrap_or_else(|e| fatal(&e));

    if stats {
        eprintln!("input type:        {:?}", fst.input_type());
        eprintln!("packed:            {}", fst.is_packed());
        eprintln!("nodes:             {}", fst.node_count());
        eprintln!("arcs:              {}", fst.arc_count());
        eprintln!("arcs with output:  {}", fst.arc_with_output_count());
        eprintln!("bytes in memory:   {}", fst.size_in_bytes());
    }

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    if dot {
        lexfst::dot::to_dot(&fst, &mut out, same_rank, label_states)
            .unwrap_or_else(|e| fatal(&e.to_string()));
        return;
    }

    let input_type = fst.input_type();
    let mut e = IntsFstEnum::new(&fst);
    loop {
        match e.next() {
            Ok(Some(io)) => {
                let _ = writeln!(out, "{}\t{}", labels_key(input_type, io.input), io.output);
            }
            Ok(None) => break,
            Err(err) => fatal(&err.to_string()),
        }
    }
}
