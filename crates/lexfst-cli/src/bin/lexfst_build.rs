// lexfst-build: Build an automaton file from key/value lines.
//
// Reads `key<TAB>value` lines from stdin. The value is a non-negative
// integer; a line without a tab maps its key to 0. Input is sorted before
// building unless --sorted is given, in which case it must already be in
// label order. Duplicate keys are an error.
//
// Usage:
//   lexfst-build [OPTIONS] OUTPUT
//
// Options:
//   -t, --input-type N   Label width: 1 (UTF-8, default), 2 (UTF-16), 4 (code points)
//   --pack               Pack the automaton after building
//   --no-share           Build a prefix trie without suffix sharing
//   --sorted             Stream already sorted input without buffering
//   -h, --help           Print help

use std::io::{self, BufRead};

use lexfst::config::BuilderConfig;
use lexfst::outputs::PositiveIntOutputs;
use lexfst::{Builder, FstError, InputType};
use lexfst_cli::{fatal, key_labels};
use lexfst_core::packed::overhead;

fn parse_line(line: &str, line_no: usize) -> (&str, u64) {
    match line.split_once('\t') {
        Some((key, value)) => {
            let value = value
                .trim()
                .parse()
                .unwrap_or_else(|_| fatal(&format!("line {line_no}: invalid value {value:?}")));
            (key, value)
        }
        None => (line, 0),
    }
}

fn add(builder: &mut Builder<PositiveIntOutputs>, labels: &[i32], value: u64, key: &str) {
    match builder.add(labels, value) {
        Ok(()) => {}
        Err(FstError::InputOutOfOrder { .. }) => {
            fatal(&format!("key {key:?} is out of order or duplicated"))
        }
        Err(e) => fatal(&format!("key {key:?}: {e}")),
    }
}

fn main() {
    lexfst_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if lexfst_cli::wants_help(&args) {
        println!("lexfst-build: Build an automaton file from key/value lines.");
        println!();
        println!("Usage: lexfst-build [OPTIONS] OUTPUT");
        println!();
        println!("Reads `key<TAB>value` lines from stdin (value defaults to 0).");
        println!();
        println!("Options:");
        println!("  -t, --input-type N   Label width: 1 (UTF-8, default), 2 (UTF-16), 4 (code points)");
        println!("  --pack               Pack the automaton after building");
        println!("  --no-share           Build a prefix trie without suffix sharing");
        println!("  --sorted             Stream already sorted input without buffering");
        println!("  -h, --help           Print this help");
        return;
    }

    let (input_type, mut args) = lexfst_cli::take_option(&args, "--input-type", "-t");
    let input_type = match input_type {
        Some(v) => lexfst_cli::parse_input_type(&v).unwrap_or_else(|e| fatal(&e)),
        None => InputType::Byte1,
    };
    let pack = lexfst_cli::take_flag(&mut args, &["--pack"]);
    let no_share = lexfst_cli::take_flag(&mut args, &["--no-share"]);
    let sorted = lexfst_cli::take_flag(&mut args, &["--sorted"]);
    let [output_path] = args.as_slice() else {
        fatal("expected exactly one OUTPUT path (see --help)");
    };

    let mut config = BuilderConfig::new(input_type);
    if pack {
        config = config.with_packing(overhead::DEFAULT);
    }
    if no_share {
        config = config.without_suffix_sharing();
    }
    let mut builder =
        Builder::with_config(config, PositiveIntOutputs).unwrap_or_else(|e| fatal(&e.to_string()));

    let stdin = io::stdin();
    let mut pending: Vec<(Vec<i32>, u64, String)> = Vec::new();
    for (idx, line) in stdin.lock().lines().enumerate() {
        let line = line.unwrap_or_else(|e| fatal(&format!("error reading stdin: {e}")));
        if line.is_empty() {
            continue;
        }
        let (key, value) = parse_line(&line, idx + 1);
        let labels = key_labels(input_type, key);
        if sorted {
            add(&mut builder, &labels, value, key);
        } else {
            pending.push((labels, value, key.to_string()));
        }
    }

    if !sorted {
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        for (labels, value, key) in &pending {
            add(&mut builder, labels, *value, key);
        }
    }

    let keys = builder.input_count();
    let fst = match builder.finish() {
        Ok(Some(fst)) => fst,
        Ok(None) => fatal("no keys on stdin"),
        Err(e) => fatal(&e.to_string()),
    };
    fst.save_to_path(output_path)
        .unwrap_or_else(|e| fatal(&format!("failed to write {output_path}: {e}")));
    eprintln!(
        "{keys} keys, {} nodes, {} arcs, packed={} -> {output_path}",
        fst.node_count(),
        fst.arc_count(),
        fst.is_packed()
    );
}
