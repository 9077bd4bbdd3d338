//! Save/load and packing: every key must answer the same afterwards.

use lexfst::config::BuilderConfig;
use lexfst::outputs::{ByteSequenceOutputs, IntSequenceOutputs, Outputs, PositiveIntOutputs};
use lexfst::search;
use lexfst::{Builder, BytesFstEnum, Fst, FstError, InputType, PackConfig};
use lexfst_core::CodecError;
use lexfst_core::packed::overhead;

fn words(n: usize) -> Vec<String> {
    let mut words: Vec<String> = (0..n)
        .map(|i| format!("{}{}", ["pre", "post", "sub", "super"][i % 4], i * 7919 % 1000))
        .collect();
    words.sort();
    words.dedup();
    words
}

fn build_with(config: BuilderConfig, words: &[String]) -> Fst<PositiveIntOutputs> {
    let mut builder = Builder::with_config(config, PositiveIntOutputs).unwrap();
    for (i, w) in words.iter().enumerate() {
        builder.add_bytes(w.as_bytes(), (i * 3) as u64).unwrap();
    }
    builder.finish().unwrap().unwrap()
}

fn assert_same_answers<O: Outputs>(a: &Fst<O>, b: &Fst<O>, words: &[String]) {
    for w in words {
        assert_eq!(
            search::get_bytes(a, w.as_bytes()).unwrap(),
            search::get_bytes(b, w.as_bytes()).unwrap(),
            "{w}"
        );
    }
    let mut ea = BytesFstEnum::new(a);
    let mut eb = BytesFstEnum::new(b);
    loop {
        let x = ea.next().unwrap().map(|io| (io.input.to_vec(), io.output.clone()));
        let y = eb.next().unwrap().map(|io| (io.input.to_vec(), io.output.clone()));
        assert_eq!(x, y);
        if x.is_none() {
            break;
        }
    }
}

#[test]
fn saved_bytes_reload_identically() {
    let words = words(500);
    let fst = build_with(BuilderConfig::new(InputType::Byte1), &words);
    let bytes = fst.to_bytes().unwrap();
    let loaded = Fst::from_bytes(&bytes, PositiveIntOutputs).unwrap();

    assert_same_answers(&fst, &loaded, &words);
    assert_eq!(loaded.to_bytes().unwrap(), bytes);
    assert_eq!(loaded.node_count(), fst.node_count());
    assert_eq!(loaded.arc_count(), fst.arc_count());
    assert_eq!(loaded.arc_with_output_count(), fst.arc_with_output_count());
}

#[test]
fn packed_automaton_round_trips() {
    let words = words(800);
    let plain = build_with(BuilderConfig::new(InputType::Byte1), &words);
    let packed = build_with(
        BuilderConfig::new(InputType::Byte1).with_packing(overhead::DEFAULT),
        &words,
    );
    assert!(packed.is_packed());
    assert_same_answers(&plain, &packed, &words);

    let bytes = packed.to_bytes().unwrap();
    let loaded = Fst::from_bytes(&bytes, PositiveIntOutputs).unwrap();
    assert!(loaded.is_packed());
    assert_same_answers(&plain, &loaded, &words);
    assert_eq!(loaded.to_bytes().unwrap(), bytes);
}

#[test]
fn every_overhead_ratio_packs_equivalently() {
    let words = words(300);
    let plain = build_with(BuilderConfig::new(InputType::Byte1), &words);
    for ratio in [overhead::COMPACT, overhead::DEFAULT, overhead::FAST, overhead::FASTEST] {
        let packed = build_with(BuilderConfig::new(InputType::Byte1).with_packing(ratio), &words);
        assert_same_answers(&plain, &packed, &words);
    }
}

#[test]
fn loaded_automaton_cannot_be_packed() {
    let words = words(50);
    let fst = build_with(BuilderConfig::new(InputType::Byte1), &words);
    let loaded = Fst::from_bytes(&fst.to_bytes().unwrap(), PositiveIntOutputs).unwrap();
    let err = loaded.pack(&PackConfig::for_node_count(loaded.node_count(), overhead::COMPACT));
    assert!(matches!(err, Err(FstError::NotBuiltForPacking)));
}

#[test]
fn sequence_outputs_round_trip() {
    let words = words(200);

    let mut builder = Builder::new(InputType::Byte1, ByteSequenceOutputs);
    for w in &words {
        builder.add_bytes(w.as_bytes(), w.to_uppercase().into_bytes()).unwrap();
    }
    let fst = builder.finish().unwrap().unwrap();
    let loaded = Fst::from_bytes(&fst.to_bytes().unwrap(), ByteSequenceOutputs).unwrap();
    assert_same_answers(&fst, &loaded, &words);

    let mut builder = Builder::new(InputType::Byte1, IntSequenceOutputs);
    for w in &words {
        builder.add_bytes(w.as_bytes(), vec![w.len() as i32, 9]).unwrap();
    }
    let fst = builder.finish().unwrap().unwrap();
    let loaded = Fst::from_bytes(&fst.to_bytes().unwrap(), IntSequenceOutputs).unwrap();
    assert_same_answers(&fst, &loaded, &words);
}

#[test]
fn file_round_trip() {
    let words = words(100);
    let fst = build_with(BuilderConfig::new(InputType::Byte1), &words);
    let path = std::env::temp_dir().join(format!("lexfst-round-trip-{}.fst", std::process::id()));
    fst.save_to_path(&path).unwrap();
    let loaded = Fst::load_from_path(&path, PositiveIntOutputs);
    std::fs::remove_file(&path).unwrap();
    assert_same_answers(&fst, &loaded.unwrap(), &words);
}

#[test]
fn small_page_limit_still_loads() {
    let words = words(300);
    let fst = build_with(BuilderConfig::new(InputType::Byte1), &words);
    let bytes = fst.to_bytes().unwrap();
    let mut input = lexfst_core::data_io::ByteArrayDataInput::new(&bytes);
    let loaded = Fst::load_with_max_block_bits(&mut input, PositiveIntOutputs, 4).unwrap();
    assert_same_answers(&fst, &loaded, &words);
}

#[test]
fn truncated_input_is_an_error() {
    let words = words(20);
    let fst = build_with(BuilderConfig::new(InputType::Byte1), &words);
    let bytes = fst.to_bytes().unwrap();
    let err = Fst::from_bytes(&bytes[..bytes.len() - 1], PositiveIntOutputs).unwrap_err();
    assert!(matches!(err, FstError::Codec(CodecError::UnexpectedEof)));

    let mut bad_magic = bytes.clone();
    bad_magic[0] ^= 0xFF;
    let err = Fst::from_bytes(&bad_magic, PositiveIntOutputs).unwrap_err();
    assert!(matches!(err, FstError::Codec(CodecError::InvalidMagic { .. })));
}
