//! # Mirror Client
//! Maintains a locally-decoded mirror of server-authoritative state:
//! applies incremental binary patches against a reference-tracked object
//! graph and dispatches fine-grained change notifications.
//!
//! Transport, authentication, and scene management are collaborators, not
//! concerns of this crate: the transport layer feeds whole patch buffers
//! into [`Room::receive_patch`] (and the one-time handshake into
//! [`Room::on_handshake`]), and application code observes the decoded
//! state through the subscription API.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use mirror_serde::{ByteReader, ByteWriter, SerdeErr};

pub mod decode;
pub mod events;
pub mod legacy;
pub mod reflection;
pub mod schema;

mod room;

pub use decode::{
    ChangeOp, ChangeRecord, DecodeError, FieldAddr, Operation, StateDecoder, ROOT_REF,
    SWITCH_TO_STRUCTURE, TYPE_ID,
};
pub use events::{CallbackRegistry, ChangeHandler, SubscriptionId};
pub use legacy::{
    generate, ListenerId, PatchEvent, PatchHandler, PatchListeners, PatchOp, PatternError,
    TreeMirror, TreePatch, TreeValue,
};
pub use reflection::{
    bind_manifest, HandshakeError, ReflectionField, ReflectionManifest, ReflectionType,
};
pub use room::Room;
pub use schema::{
    ArraySchema, FieldDescriptor, FieldKind, Instance, LocalTypeId, MapSchema, Record, RefId,
    ReferenceTracker, SchemaRegistry, TypeBuilder, TypeDescriptor, Value,
};
