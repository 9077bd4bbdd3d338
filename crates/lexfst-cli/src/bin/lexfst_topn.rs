// lexfst-topn: Complete prefixes with their lowest-valued keys.
//
// Reads prefixes from stdin (one per line) and prints, for each, up to N
// keys starting with it in ascending value order:
//   prefix<TAB>key<TAB>value
// A prefix with no completions prints `prefix<TAB>-`.
//
// Usage:
//   lexfst-topn [-n N] [--queue-depth D] FST
//
// Options:
//   -n, --count N         Completions per prefix (default 5)
//   -q, --queue-depth D   Search queue bound, at least N (default N)
//   -h, --help            Print help

use std::io::{self, BufRead, Write};

use lexfst::search::{TopNSearcher, TopResults};
use lexfst_cli::{IntFst, fatal, key_labels, labels_key};

fn complete(fst: &IntFst, prefix: &[i32], n: usize, depth: usize) -> Result<Option<TopResults<u64>>, lexfst::FstError> {
    let Some((arc, output)) = lexfst_cli::follow_prefix(fst, prefix)? else {
        return Ok(None);
    };
    let mut searcher = TopNSearcher::new(fst, n, depth, |a: &u64, b: &u64| a.cmp(b))?;
    searcher.add_start_paths(&arc, output, true, prefix.to_vec())?;
    searcher.search().map(Some)
}

fn parse_count(value: Option<String>, name: &str) -> Option<usize> {
    value.map(|v| {
        v.parse()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or_else(|| fatal(&format!("{name} must be a positive integer, got {v:?}")))
    })
}

fn main() {
    lexfst_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if lexfst_cli::wants_help(&args) {
        println!("lexfst-topn: Complete prefixes with their lowest-valued keys.");
        println!();
        println!("Usage: lexfst-topn [-n N] [--queue-depth D] FST");
        println!();
        println!("Reads prefixes from stdin (one per line). Prints:");
        println!("  prefix<TAB>key<TAB>value   (one line per completion)");
        println!("  prefix<TAB>-               (no completions)");
        println!();
        println!("Options:");
        println!("  -n, --count N         Completions per prefix (default 5)");
        println!("  -q, --queue-depth D   Search queue bound, at least N (default N)");
        println!("  -h, --help            Print this help");
        return;
    }

    let (count, args) = lexfst_cli::take_option(&args, "--count", "-n");
    let (depth, args) = lexfst_cli::take_option(&args, "--queue-depth", "-q");
    let n = parse_count(count, "--count").unwrap_or(5);
    let depth = parse_count(depth, "--queue-depth").unwrap_or(n);
    if depth < n {
        fatal("--queue-depth must be at least --count");
    }
    let [path] = args.as_slice() else {
        fatal("expected exactly one FST path (see --help)");
    };
    let fst = lexfst_cli::load_fst(path).unwrap_or_else(|e| fatal(&e));
    let input_type = fst.input_type();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error reading stdin: {e}");
                break;
            }
        };
        let prefix = key_labels(input_type, &line);
        let results = complete(&fst, &prefix, n, depth)
            .unwrap_or_else(|e| fatal(&format!("search for {line:?} failed: {e}")));
        match results {
            Some(results) if !results.top_n.is_empty() => {
                for r in &results.top_n {
                    let _ = writeln!(out, "{line}\t{}\t{}", labels_key(input_type, &r.input), r.output);
                }
                if !results.is_complete {
                    tracing::warn!(prefix = %line, "queue bound may have dropped completions");
                }
            }
            _ => {
                let _ = writeln!(out, "{line}\t-");
            }
        }
    }
}
