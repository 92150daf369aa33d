//! Property test: any interleaving of deletions and appends within one
//! decode call degrades to plain retention once compaction runs.

mod common;

use common::PatchBuilder;
use mirror_client::{FieldKind, Operation, SchemaRegistry, StateDecoder, Value, ROOT_REF};
use proptest::prelude::*;

fn array_decoder() -> StateDecoder {
    let mut registry = SchemaRegistry::new();
    let state = registry.define("State", |t| {
        t.field("items", FieldKind::Array(Box::new(FieldKind::Number)));
    });
    let mut decoder = StateDecoder::new(registry);
    decoder.create_root(state);
    decoder
}

proptest! {
    #[test]
    fn deferred_compaction_matches_plain_retention(
        entries in prop::collection::vec((0u8..100, any::<bool>()), 0..12),
        appended in prop::collection::vec(0u8..100, 0..6),
        reverse_deletes in any::<bool>(),
    ) {
        let mut decoder = array_decoder();

        let mut setup = PatchBuilder::new();
        setup
            .switch(ROOT_REF)
            .record_op(Operation::Add, 0)
            .child_ref(1)
            .switch(1);
        for (index, (value, _)) in entries.iter().enumerate() {
            setup
                .collection_op(Operation::Add, index as u64)
                .number(f64::from(*value));
        }
        decoder.decode(&setup.bytes(), 0).unwrap();

        // deletions in either index order, then appends past the end
        let mut patch = PatchBuilder::new();
        patch.switch(1);
        let mut doomed: Vec<u64> = entries
            .iter()
            .enumerate()
            .filter(|(_, (_, delete))| *delete)
            .map(|(index, _)| index as u64)
            .collect();
        if reverse_deletes {
            doomed.reverse();
        }
        for index in doomed {
            patch.collection_op(Operation::Delete, index);
        }
        for (offset, value) in appended.iter().enumerate() {
            patch
                .collection_op(Operation::Add, (entries.len() + offset) as u64)
                .number(f64::from(*value));
        }
        decoder.decode(&patch.bytes(), 0).unwrap();

        let expected: Vec<Value> = entries
            .iter()
            .filter(|(_, delete)| !*delete)
            .map(|(value, _)| Value::Number(f64::from(*value)))
            .chain(appended.iter().map(|value| Value::Number(f64::from(*value))))
            .collect();
        let array = decoder
            .tracker()
            .get(1)
            .and_then(|instance| instance.as_array())
            .unwrap();
        let actual: Vec<Value> = array.iter().map(|(_, value)| value.clone()).collect();
        prop_assert_eq!(actual, expected);
    }
}
