//! The room facade: owns one decoded state graph and exposes patch intake,
//! root-state access, change subscriptions, and teardown to application
//! code. Transport (framing, reconnection) lives outside; this type only
//! consumes the byte buffers the transport hands it.

use log::info;

use crate::{
    decode::{
        change::{ChangeOp, ChangeRecord, FieldAddr},
        decoder::StateDecoder,
        error::DecodeError,
    },
    events::{CallbackRegistry, ChangeHandler, SubscriptionId},
    reflection::{bind_manifest, HandshakeError, ReflectionManifest},
    schema::{
        field::{RefId, Value},
        instance::Instance,
        record::Record,
        ref_tracker::ReferenceTracker,
        registry::SchemaRegistry,
    },
};
use mirror_serde::ByteReader;

pub struct Room {
    decoder: StateDecoder,
    callbacks: CallbackRegistry,
}

impl Room {
    /// A room awaiting its handshake.
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            decoder: StateDecoder::new(registry),
            callbacks: CallbackRegistry::new(),
        }
    }

    /// A room whose root type is already known, e.g. under a pre-agreed
    /// protocol version where no reflection handshake runs.
    pub fn with_root_type(registry: SchemaRegistry, root_type: usize) -> Self {
        let mut room = Self::new(registry);
        room.decoder.create_root(root_type);
        room
    }

    /// Decode the one-time reflection manifest, bind server type ids, and
    /// create the root state. Must run before any patch; a mismatch
    /// surfaces here, never as silently mis-decoded state.
    pub fn on_handshake(&mut self, buffer: &[u8], offset: usize) -> Result<(), HandshakeError> {
        let mut reader = ByteReader::new_at(buffer, offset);
        let manifest = ReflectionManifest::decode(&mut reader)?;
        let root_type = bind_manifest(self.decoder.registry_mut(), &manifest)?;
        self.decoder.create_root(root_type);
        Ok(())
    }

    /// Apply one incremental byte-patch and synchronously dispatch the
    /// resulting change notifications.
    pub fn receive_patch(&mut self, buffer: &[u8], offset: usize) -> Result<(), DecodeError> {
        let changes = self.decoder.decode(buffer, offset)?;
        self.callbacks.dispatch(&changes);
        Ok(())
    }

    /// The decoded root record, live-mutated in place by patches.
    pub fn state(&self) -> Option<&Record> {
        let root = self.decoder.root_ref()?;
        self.decoder.tracker().get(root)?.as_record()
    }

    pub fn tracker(&self) -> &ReferenceTracker {
        self.decoder.tracker()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.decoder.registry()
    }

    /// Resolve a collection-valued field of a record to the collection's
    /// RefId, for use as a subscription target.
    pub fn collection_at(&self, record_ref: RefId, field_index: u8) -> Option<RefId> {
        self.decoder
            .tracker()
            .get(record_ref)?
            .as_record()?
            .field(usize::from(field_index))?
            .as_ref_id()
    }

    /// Subscribe to entry additions on a collection. With `immediate` set,
    /// the handler is first invoked once per existing entry, so a client
    /// joining mid-session observes state that predates its subscriptions.
    pub fn on_add(
        &mut self,
        target: RefId,
        immediate: bool,
        mut handler: ChangeHandler,
    ) -> SubscriptionId {
        if immediate {
            for change in self.existing_entries(target) {
                handler(&change);
            }
        }
        self.callbacks.on_add(target, handler)
    }

    /// Subscribe to entry removals on a collection.
    pub fn on_remove(&mut self, target: RefId, handler: ChangeHandler) -> SubscriptionId {
        self.callbacks.on_remove(target, handler)
    }

    /// Subscribe to entry replacements on a collection.
    pub fn on_change(&mut self, target: RefId, handler: ChangeHandler) -> SubscriptionId {
        self.callbacks.on_change(target, handler)
    }

    /// Subscribe to changes of one scalar field of a record instance,
    /// including its first assignment.
    pub fn on_field_change(
        &mut self,
        target: RefId,
        field_index: u8,
        handler: ChangeHandler,
    ) -> SubscriptionId {
        self.callbacks.on_field_change(target, field_index, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    /// Release all tracked references and subscriptions, e.g. on
    /// disconnect. Idempotent; the registry's compiled types survive for a
    /// fresh handshake.
    pub fn teardown(&mut self) {
        self.decoder.clear();
        self.callbacks.clear();
        info!("room torn down");
    }

    /// Synthesized ADD changes for a collection's current entries, used by
    /// immediate-replay registration.
    fn existing_entries(&self, target: RefId) -> Vec<ChangeRecord> {
        let mut changes = Vec::new();
        match self.decoder.tracker().get(target) {
            Some(Instance::Map(map)) => {
                for (position, (key, value)) in map.iter().enumerate() {
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Key {
                            index: position as u64,
                            key: key.clone(),
                        },
                        op: ChangeOp::Add,
                        value: value.clone(),
                        previous: Value::None,
                    });
                }
            }
            Some(Instance::Array(array)) => {
                for (index, value) in array.iter() {
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Index(index as u64),
                        op: ChangeOp::Add,
                        value: value.clone(),
                        previous: Value::None,
                    });
                }
            }
            _ => {}
        }
        changes
    }
}
