//! Property tests over random key sets and random outputs.

use std::collections::BTreeMap;

use proptest::prelude::*;

use lexfst::config::BuilderConfig;
use lexfst::outputs::{ByteSequenceOutputs, Outputs, PositiveIntOutputs};
use lexfst::search;
use lexfst::{Builder, BytesFstEnum, Fst, InputType};
use lexfst_core::packed::overhead;

fn key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcdxyz".to_vec()), 0..8)
}

fn dictionary() -> impl Strategy<Value = BTreeMap<Vec<u8>, u64>> {
    prop::collection::btree_map(key(), 0u64..1000, 1..120)
}

fn build(entries: &BTreeMap<Vec<u8>, u64>, config: BuilderConfig) -> Fst<PositiveIntOutputs> {
    let mut builder = Builder::with_config(config, PositiveIntOutputs).unwrap();
    for (k, v) in entries {
        builder.add_bytes(k, *v).unwrap();
    }
    builder.finish().unwrap().unwrap()
}

fn enumerate(fst: &Fst<PositiveIntOutputs>) -> Vec<(Vec<u8>, u64)> {
    let mut e = BytesFstEnum::new(fst);
    let mut out = Vec::new();
    while let Some(io) = e.next().unwrap() {
        out.push((io.input.to_vec(), *io.output));
    }
    out
}

proptest! {
    #[test]
    fn lookups_match_the_map(entries in dictionary(), probes in prop::collection::vec(key(), 0..20)) {
        let fst = build(&entries, BuilderConfig::new(InputType::Byte1));
        for (k, v) in &entries {
            prop_assert_eq!(search::get_bytes(&fst, k).unwrap(), Some(*v));
        }
        for probe in &probes {
            prop_assert_eq!(search::get_bytes(&fst, probe).unwrap(), entries.get(probe).copied());
        }
    }

    #[test]
    fn enumeration_is_sorted_and_complete(entries in dictionary()) {
        let fst = build(&entries, BuilderConfig::new(InputType::Byte1));
        let expected: Vec<(Vec<u8>, u64)> = entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(enumerate(&fst), expected);
    }

    #[test]
    fn seeks_agree_with_btree_ranges(entries in dictionary(), target in key()) {
        let fst = build(&entries, BuilderConfig::new(InputType::Byte1));
        let mut e = BytesFstEnum::new(&fst);

        let ceil = e.seek_ceil(&target).unwrap().map(|io| (io.input.to_vec(), *io.output));
        let expected = entries.range(target.clone()..).next().map(|(k, v)| (k.clone(), *v));
        prop_assert_eq!(ceil, expected);

        let floor = e.seek_floor(&target).unwrap().map(|io| (io.input.to_vec(), *io.output));
        let expected = entries.range(..=target.clone()).next_back().map(|(k, v)| (k.clone(), *v));
        prop_assert_eq!(floor, expected);

        let exact = e.seek_exact(&target).unwrap().map(|io| *io.output);
        prop_assert_eq!(exact, entries.get(&target).copied());
    }

    #[test]
    fn packing_preserves_the_language(entries in dictionary()) {
        let plain = build(&entries, BuilderConfig::new(InputType::Byte1));
        let packed = build(&entries, BuilderConfig::new(InputType::Byte1).with_packing(overhead::COMPACT));
        prop_assert!(packed.is_packed());
        prop_assert_eq!(enumerate(&packed), enumerate(&plain));
        for k in entries.keys() {
            prop_assert_eq!(
                search::get_bytes(&packed, k).unwrap(),
                search::get_bytes(&plain, k).unwrap()
            );
        }
    }

    #[test]
    fn save_and_load_preserve_bytes_and_answers(entries in dictionary(), pack in any::<bool>()) {
        let config = if pack {
            BuilderConfig::new(InputType::Byte1).with_packing(overhead::DEFAULT)
        } else {
            BuilderConfig::new(InputType::Byte1)
        };
        let fst = build(&entries, config);
        let bytes = fst.to_bytes().unwrap();
        let loaded = Fst::from_bytes(&bytes, PositiveIntOutputs).unwrap();
        prop_assert_eq!(loaded.to_bytes().unwrap().len(), bytes.len());
        prop_assert_eq!(enumerate(&loaded), enumerate(&fst));
    }

    #[test]
    fn ordinal_reverse_lookup(keys in prop::collection::btree_set(key(), 1..120)) {
        let entries: BTreeMap<Vec<u8>, u64> = keys.into_iter().zip(0u64..).collect();
        let fst = build(&entries, BuilderConfig::new(InputType::Byte1));
        for (k, ordinal) in &entries {
            let labels = search::get_by_output(&fst, *ordinal).unwrap();
            prop_assert_eq!(labels.map(|l| l.iter().map(|&b| b as u8).collect::<Vec<u8>>()), Some(k.clone()));
        }
        prop_assert_eq!(search::get_by_output(&fst, entries.len() as u64).unwrap(), None);
    }

    #[test]
    fn integer_algebra_laws(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
        let o = PositiveIntOutputs;
        let common = o.common(&a, &b);
        prop_assert_eq!(o.add(&common, &o.subtract(&a, &common)), a);
        prop_assert_eq!(o.add(&o.no_output(), &a), a);
        prop_assert_eq!(o.add(&a, &o.no_output()), a);
    }

    #[test]
    fn byte_sequence_algebra_laws(a in prop::collection::vec(any::<u8>(), 0..6), b in prop::collection::vec(any::<u8>(), 0..6)) {
        let o = ByteSequenceOutputs;
        let common = o.common(&a, &b);
        prop_assert!(a.starts_with(&common) && b.starts_with(&common));
        prop_assert_eq!(o.add(&common, &o.subtract(&a, &common)), a.clone());
        prop_assert_eq!(o.add(&o.no_output(), &a), a.clone());
        prop_assert_eq!(o.add(&a, &o.no_output()), a);
    }
}
