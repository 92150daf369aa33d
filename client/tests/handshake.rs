//! Integration tests for the reflection handshake: structural matching of
//! the server manifest against locally compiled types.

mod common;

use common::PatchBuilder;
use mirror_client::{
    ByteWriter, FieldKind, HandshakeError, Operation, Room, SchemaRegistry, Value, ROOT_REF,
};

struct ManifestType<'a> {
    type_id: u64,
    parent_id: Option<u64>,
    fields: &'a [(&'a str, &'a str, u64)],
}

fn manifest_bytes(root_type_id: u64, types: &[ManifestType]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_varuint(root_type_id);
    writer.write_varuint(types.len() as u64);
    for declared in types {
        writer.write_varuint(declared.type_id);
        writer.write_varuint(declared.parent_id.map_or(0, |p| p + 1));
        writer.write_varuint(declared.fields.len() as u64);
        for (name, wire_type, index) in declared.fields {
            writer.write_string(name);
            writer.write_string(wire_type);
            writer.write_varuint(*index);
        }
    }
    writer.to_bytes()
}

fn game_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    let player = registry.define("Player", |t| {
        t.field("x", FieldKind::Number).field("y", FieldKind::Number);
    });
    registry.define("State", |t| {
        t.field(
            "players",
            FieldKind::Map(Box::new(FieldKind::Record(Some(player)))),
        );
    });
    registry
}

#[test]
fn matching_manifest_binds_types_and_creates_root() {
    let mut room = Room::new(game_registry());
    let manifest = manifest_bytes(
        7,
        &[
            ManifestType {
                type_id: 3,
                parent_id: None,
                fields: &[("x", "number", 0), ("y", "number", 1)],
            },
            ManifestType {
                type_id: 7,
                parent_id: None,
                fields: &[("players", "map:ref", 0)],
            },
        ],
    );
    room.on_handshake(&manifest, 0).unwrap();

    let state = room.state().expect("root created by handshake");
    assert_eq!(state.field(0), Some(&Value::None));

    // the bound server TypeId resolves inline-typed children
    let mut patch = PatchBuilder::new();
    patch
        .switch(ROOT_REF)
        .record_op(Operation::Add, 0)
        .child_ref(1)
        .switch(1)
        .collection_op(Operation::Add, 0)
        .key("p1")
        .inline_type(3)
        .child_ref(2)
        .switch(2)
        .record_op(Operation::Replace, 0)
        .number(4.0);
    room.receive_patch(&patch.bytes(), 0).unwrap();

    let hero = room.tracker().get(2).and_then(|i| i.as_record()).unwrap();
    assert_eq!(hero.field(0), Some(&Value::Number(4.0)));
}

#[test]
fn mismatched_manifest_fails_before_any_patch() {
    let mut room = Room::new(game_registry());
    let manifest = manifest_bytes(
        7,
        &[ManifestType {
            type_id: 7,
            parent_id: None,
            fields: &[("players", "map:ref", 0), ("round", "uint32", 1)],
        }],
    );
    let err = room.on_handshake(&manifest, 0).unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::SchemaMismatch { type_id: 7, .. }
    ));

    // no root exists, so patches are rejected rather than mis-applied
    let mut patch = PatchBuilder::new();
    patch.switch(ROOT_REF);
    assert!(room.receive_patch(&patch.bytes(), 0).is_err());
}

#[test]
fn server_inheritance_matches_flattened_local_fields() {
    // the local side compiles Player's fields flat; the server declares a
    // Unit parent carrying x/y and a Player child adding name
    let mut registry = SchemaRegistry::new();
    let player = registry.define("Player", |t| {
        t.field("x", FieldKind::Number)
            .field("y", FieldKind::Number)
            .field("name", FieldKind::Str);
    });
    registry.define("State", |t| {
        t.field("hero", FieldKind::Record(Some(player)));
    });

    let mut room = Room::new(registry);
    let manifest = manifest_bytes(
        1,
        &[
            ManifestType {
                type_id: 4,
                parent_id: None,
                fields: &[("x", "number", 0), ("y", "number", 1)],
            },
            ManifestType {
                type_id: 5,
                parent_id: Some(4),
                fields: &[("name", "string", 2)],
            },
            ManifestType {
                type_id: 1,
                parent_id: None,
                fields: &[("hero", "ref", 0)],
            },
        ],
    );
    // type 4 alone matches no local type
    let err = room.on_handshake(&manifest, 0).unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::SchemaMismatch { type_id: 4, .. }
    ));

    // with a matching Unit type compiled locally, the whole manifest binds
    let mut registry = SchemaRegistry::new();
    let unit = registry.define("Unit", |t| {
        t.field("x", FieldKind::Number).field("y", FieldKind::Number);
    });
    registry.define("Player", |t| {
        t.parent(unit).field("name", FieldKind::Str);
    });
    registry.define("State", |t| {
        t.field("hero", FieldKind::Record(None));
    });
    let mut room = Room::new(registry);
    room.on_handshake(&manifest, 0).unwrap();
    assert_eq!(room.registry().local_for_server(5), Some(1));
    assert_eq!(room.registry().local_for_server(4), Some(0));
}

#[test]
fn undeclared_root_type_is_rejected() {
    let mut room = Room::new(game_registry());
    let manifest = manifest_bytes(
        9,
        &[ManifestType {
            type_id: 3,
            parent_id: None,
            fields: &[("x", "number", 0), ("y", "number", 1)],
        }],
    );
    let err = room.on_handshake(&manifest, 0).unwrap_err();
    assert_eq!(err, HandshakeError::UnknownRootType { type_id: 9 });
}

#[test]
fn undeclared_parent_type_is_rejected() {
    let mut room = Room::new(game_registry());
    let manifest = manifest_bytes(
        3,
        &[ManifestType {
            type_id: 3,
            parent_id: Some(99),
            fields: &[("x", "number", 0), ("y", "number", 1)],
        }],
    );
    let err = room.on_handshake(&manifest, 0).unwrap_err();
    assert_eq!(
        err,
        HandshakeError::UnknownParentType {
            type_id: 3,
            parent_id: 99
        }
    );
}

#[test]
fn cyclic_parent_chain_is_rejected() {
    let mut room = Room::new(game_registry());
    // type 3 names itself as parent
    let manifest = manifest_bytes(
        3,
        &[ManifestType {
            type_id: 3,
            parent_id: Some(3),
            fields: &[("x", "number", 0), ("y", "number", 1)],
        }],
    );
    let err = room.on_handshake(&manifest, 0).unwrap_err();
    assert_eq!(err, HandshakeError::CyclicParent { type_id: 3 });

    // a two-type loop is caught as well
    let manifest = manifest_bytes(
        4,
        &[
            ManifestType {
                type_id: 4,
                parent_id: Some(5),
                fields: &[("x", "number", 0)],
            },
            ManifestType {
                type_id: 5,
                parent_id: Some(4),
                fields: &[("y", "number", 1)],
            },
        ],
    );
    let err = room.on_handshake(&manifest, 0).unwrap_err();
    assert_eq!(err, HandshakeError::CyclicParent { type_id: 4 });
}

#[test]
fn overstated_type_count_fails_on_truncation() {
    let mut room = Room::new(game_registry());
    let mut writer = ByteWriter::new();
    writer.write_varuint(0);
    writer.write_varuint(u64::MAX);
    let err = room.on_handshake(&writer.to_bytes(), 0).unwrap_err();
    assert!(matches!(err, HandshakeError::Serde(_)));
}

#[test]
fn truncated_manifest_surfaces_a_decode_error() {
    let mut room = Room::new(game_registry());
    let manifest = manifest_bytes(
        7,
        &[ManifestType {
            type_id: 7,
            parent_id: None,
            fields: &[("players", "map:ref", 0)],
        }],
    );
    let err = room.on_handshake(&manifest[..manifest.len() - 2], 0).unwrap_err();
    assert!(matches!(err, HandshakeError::Serde(_)));
}
