// lexfst-lookup: Look up keys from stdin in an automaton file.
//
// Reads keys from stdin (one per line) and prints one line per key:
//   key<TAB>value       exact match
//   key<TAB>-           no match
// With --ceil or --floor, prints the nearest key at or after (before) the
// query instead:
//   query<TAB>key<TAB>value
//
// Usage:
//   lexfst-lookup [--ceil | --floor] FST

use std::io::{self, BufRead, Write};

use lexfst::IntsFstEnum;
use lexfst_cli::{fatal, key_labels, labels_key};

enum Mode {
    Exact,
    Ceil,
    Floor,
}

fn main() {
    lexfst_cli::init_logging();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if lexfst_cli::wants_help(&args) {
        println!("lexfst-lookup: Look up keys from stdin in an automaton file.");
        println!();
        println!("Usage: lexfst-lookup [--ceil | --floor] FST");
        println!();
        println!("Reads keys from stdin (one per line). Prints:");
        println!("  key<TAB>value          (exact match)");
        println!("  key<TAB>-              (no match)");
        println!("  query<TAB>key<TAB>value (with --ceil or --floor)");
        println!();
        println!("Options:");
        println!("  --ceil       Find the smallest key >= each query");
        println!("  --floor      Find the largest key <= each query");
        println!("  -h, --help   Print this help");
        return;
    }

    let ceil = lexfst_cli::take_flag(&mut args, &["--ceil"]);
    let floor = lexfst_cli::take_flag(&mut args, &["--floor"]);
    let mode = match (ceil, floor) {
        (false, false) => Mode::Exact,
        (true, false) => Mode::Ceil,
        (false, true) => Mode::Floor,
        (true, true) => fatal("--ceil and --floor are mutually exclusive"),
    };
    let [path] = args.as_slice() else {
        fatal("expected exactly one FST path (see --help)");
    };
    let fst = lexfst_cli::load_fst(path).unwrap_or_else(|e| fatal(&e));
    let input_type = fst.input_type();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut e = IntsFstEnum::new(&fst);

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                eprintln!("error reading stdin: {err}");
                break;
            }
        };
        let labels = key_labels(input_type, &line);
        let result = match mode {
            Mode::Exact => lexfst::search::get(&fst, &labels).map(|hit| match hit {
                Some(value) => format!("{line}\t{value}"),
                None => format!("{line}\t-"),
            }),
            Mode::Ceil | Mode::Floor => {
                let hit = if matches!(mode, Mode::Ceil) {
                    e.seek_ceil(&labels)
                } else {
                    e.seek_floor(&labels)
                };
                hit.map(|hit| match hit {
                    Some(io) => format!("{line}\t{}\t{}", labels_key(input_type, io.input), io.output),
                    None => format!("{line}\t-"),
                })
            }
        };
        match result {
            Ok(text) => {
                let _ = writeln!(out, "{text}");
            }
            Err(err) => fatal(&format!("lookup of {line:?} failed: {err}")),
        }
    }
}
