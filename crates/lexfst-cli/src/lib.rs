// lexfst-cli: shared utilities for CLI tools.
//
// Every tool works on automata with non-negative integer outputs, keyed by
// text. The label width stored in the file decides how text maps to labels.

use std::process;

use lexfst::outputs::PositiveIntOutputs;
use lexfst::{Arc, Fst, FstError, InputType};
use lexfst_core::labels;
use tracing_subscriber::EnvFilter;

/// Automaton type the tools read and write.
pub type IntFst = Fst<PositiveIntOutputs>;

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// level of `warn`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load an automaton file, with a readable error.
pub fn load_fst(path: &str) -> Result<IntFst, String> {
    let fst = Fst::load_from_path(path, PositiveIntOutputs)
        .map_err(|e| format!("failed to load {path}: {e}"))?;
    tracing::debug!(path, nodes = fst.node_count(), packed = fst.is_packed(), "loaded automaton");
    Ok(fst)
}

/// Parse `1`, `2` or `4` (bytes per label).
pub fn parse_input_type(value: &str) -> Result<InputType, String> {
    match value {
        "1" => Ok(InputType::Byte1),
        "2" => Ok(InputType::Byte2),
        "4" => Ok(InputType::Byte4),
        other => Err(format!("invalid input type {other:?} (expected 1, 2 or 4)")),
    }
}

/// Labels of `key`: UTF-8 bytes, UTF-16 units or code points.
pub fn key_labels(input_type: InputType, key: &str) -> Vec<i32> {
    match input_type {
        InputType::Byte1 => labels::utf8_labels(key),
        InputType::Byte2 => labels::utf16_labels(key),
        InputType::Byte4 => labels::utf32_labels(key),
    }
}

/// Inverse of [`key_labels`]. Invalid sequences are replaced.
pub fn labels_key(input_type: InputType, input: &[i32]) -> String {
    match input_type {
        InputType::Byte1 => String::from_utf8_lossy(&labels::labels_to_bytes(input)).into_owned(),
        InputType::Byte2 => labels::utf16_to_string_lossy(input),
        InputType::Byte4 => labels::utf32_to_string(input)
            .unwrap_or_else(|| input.iter().map(|l| format!("<{l:x}>")).collect()),
    }
}

/// Walk `prefix` from the root. Returns the arc reached and the output
/// accumulated on the way, or `None` if no key starts with `prefix`.
pub fn follow_prefix(fst: &IntFst, prefix: &[i32]) -> Result<Option<(Arc<u64>, u64)>, FstError> {
    let mut reader = fst.bytes_reader();
    let mut follow = fst.first_arc();
    let mut arc = fst.new_arc();
    let mut output = 0u64;
    for &label in prefix {
        if !fst.find_target_arc(label, &follow, &mut arc, &mut reader)? {
            return Ok(None);
        }
        output += arc.output;
        std::mem::swap(&mut follow, &mut arc);
    }
    Ok(Some((follow, output)))
}

/// Parse a `--name=VALUE`, `--name VALUE` or `-n VALUE` option.
///
/// Returns `(value, remaining_args)`. A missing value is fatal.
pub fn take_option(args: &[String], long: &str, short: &str) -> (Option<String>, Vec<String>) {
    let mut value = None;
    let mut remaining = Vec::new();
    let mut iter = args.iter();
    let prefix = format!("{long}=");

    while let Some(arg) = iter.next() {
        if let Some(v) = arg.strip_prefix(&prefix) {
            value = Some(v.to_string());
        } else if arg == long || arg == short {
            match iter.next() {
                Some(v) => value = Some(v.clone()),
                None => fatal(&format!("{arg} requires a value")),
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    (value, remaining)
}

/// Remove every occurrence of a boolean flag. Returns whether it was present.
pub fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    let before = args.len();
    args.retain(|a| !names.contains(&a.as_str()));
    args.len() != before
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn options_in_every_spelling() {
        let (v, rest) = take_option(&args(&["-n", "5", "x.fst"]), "--count", "-n");
        assert_eq!(v.as_deref(), Some("5"));
        assert_eq!(rest, args(&["x.fst"]));

        let (v, rest) = take_option(&args(&["x.fst", "--count=7"]), "--count", "-n");
        assert_eq!(v.as_deref(), Some("7"));
        assert_eq!(rest, args(&["x.fst"]));

        let (v, _) = take_option(&args(&["x.fst"]), "--count", "-n");
        assert_eq!(v, None);
    }

    #[test]
    fn flags_are_removed() {
        let mut a = args(&["--pack", "out.fst", "--pack"]);
        assert!(take_flag(&mut a, &["--pack"]));
        assert_eq!(a, args(&["out.fst"]));
        assert!(!take_flag(&mut a, &["--no-share"]));
    }

    #[test]
    fn keys_round_trip_through_labels() {
        for ty in [InputType::Byte1, InputType::Byte2, InputType::Byte4] {
            let key = "päivä 😀";
            assert_eq!(labels_key(ty, &key_labels(ty, key)), key);
        }
        assert!(parse_input_type("3").is_err());
    }

    #[test]
    fn prefix_walk_accumulates_output() {
        let mut builder = lexfst::Builder::new(InputType::Byte1, PositiveIntOutputs);
        builder.add_str("bat", 4).unwrap();
        builder.add_str("bee", 9).unwrap();
        let fst = builder.finish().unwrap().unwrap();
        let (arc, output) = follow_prefix(&fst, &key_labels(InputType::Byte1, "be")).unwrap().unwrap();
        assert_eq!(arc.label, i32::from(b'e'));
        assert_eq!(output, 9);
        assert!(follow_prefix(&fst, &key_labels(InputType::Byte1, "c")).unwrap().is_none());
    }
}
