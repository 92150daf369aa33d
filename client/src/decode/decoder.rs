use std::collections::HashSet;

use log::warn;

use mirror_serde::{decode_bool, decode_number, decode_string, decode_varuint, ByteReader};

use crate::{
    decode::{
        change::{ChangeOp, ChangeRecord, FieldAddr},
        error::DecodeError,
        op::{Operation, SWITCH_TO_STRUCTURE, TYPE_ID},
    },
    schema::{
        array_schema::ArraySchema,
        field::{FieldKind, LocalTypeId, RefId, Value},
        instance::Instance,
        map_schema::MapSchema,
        ref_tracker::ReferenceTracker,
        registry::SchemaRegistry,
    },
};

/// The root state's RefId within one state graph.
pub const ROOT_REF: RefId = 0;

/// How far past an array's current end a positional index may land.
/// Gaps up to the index are tombstone-padded, so the slack bounds how much
/// memory one operation can demand.
const MAX_INDEX_SLACK: u64 = 1024;

/// The shape of the current decode target, captured up front so the
/// tracker is not borrowed across value decoding.
enum TargetShape {
    Record(LocalTypeId),
    Map(FieldKind),
    Array(FieldKind),
}

/// The patch state machine: consumes a byte-patch, walks its operation
/// records, mutates the tracked object graph in place, and returns the
/// change log for dispatch.
///
/// Single-threaded and reentrant-unsafe by design: one decode call owns
/// the tracker and every touched container until it returns. The transport
/// layer is responsible for serializing inbound patches.
pub struct StateDecoder {
    registry: SchemaRegistry,
    tracker: ReferenceTracker,
    root: Option<RefId>,
}

impl StateDecoder {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            tracker: ReferenceTracker::new(),
            root: None,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    pub fn tracker(&self) -> &ReferenceTracker {
        &self.tracker
    }

    pub fn root_ref(&self) -> Option<RefId> {
        self.root
    }

    /// Create the root structured record. Called once, by the handshake
    /// (or directly in sessions with pre-bound types).
    pub fn create_root(&mut self, local: LocalTypeId) -> RefId {
        self.tracker.clear();
        let record = self.registry.new_record(local);
        self.tracker.register(ROOT_REF, Instance::Record(record));
        self.root = Some(ROOT_REF);
        ROOT_REF
    }

    /// Release every tracked instance and forget the root. Idempotent.
    pub fn clear(&mut self) {
        self.tracker.clear();
        self.registry.clear_bindings();
        self.root = None;
    }

    /// Apply one byte-patch starting at `offset`, returning the change log
    /// in deposit order. On error, records applied earlier in this call
    /// stay applied.
    pub fn decode(
        &mut self,
        buffer: &[u8],
        offset: usize,
    ) -> Result<Vec<ChangeRecord>, DecodeError> {
        let root = self.root.ok_or(DecodeError::MissingRoot)?;
        let mut reader = ByteReader::new_at(buffer, offset);
        let mut changes = Vec::new();
        let mut touched: HashSet<RefId> = HashSet::new();
        let mut current = root;

        while reader.has_remaining() {
            if reader.peek_u8()? == SWITCH_TO_STRUCTURE {
                reader.read_u8()?;
                let ref_id = decode_varuint(&mut reader)?;
                if !self.tracker.contains(ref_id) {
                    return Err(DecodeError::UnknownRefId { ref_id });
                }
                current = ref_id;
                continue;
            }

            let shape = match self.tracker.get(current) {
                Some(Instance::Record(record)) => TargetShape::Record(record.local_type()),
                Some(Instance::Map(map)) => TargetShape::Map(map.element().clone()),
                Some(Instance::Array(array)) => TargetShape::Array(array.element().clone()),
                None => return Err(DecodeError::UnknownRefId { ref_id: current }),
            };

            let op_byte = reader.read_u8()?;
            match shape {
                TargetShape::Record(local) => {
                    self.decode_record_op(&mut reader, current, local, op_byte, &mut changes)?;
                }
                TargetShape::Map(element) => {
                    touched.insert(current);
                    self.decode_map_op(&mut reader, current, &element, op_byte, &mut changes)?;
                }
                TargetShape::Array(element) => {
                    touched.insert(current);
                    self.decode_array_op(&mut reader, current, &element, op_byte, &mut changes)?;
                }
            }
        }

        // compaction runs exactly once, after every operation of this call
        for ref_id in touched {
            if let Some(instance) = self.tracker.get_mut(ref_id) {
                instance.on_decode_end();
            }
        }

        Ok(changes)
    }

    // Record targets

    fn decode_record_op(
        &mut self,
        reader: &mut ByteReader,
        target: RefId,
        local: LocalTypeId,
        op_byte: u8,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<(), DecodeError> {
        let (operation, field_index) = Operation::unpack_record_op(op_byte);
        let descriptor = self
            .registry
            .fields(local)
            .get(usize::from(field_index))
            .cloned()
            .ok_or_else(|| DecodeError::UnknownFieldIndex {
                type_name: self.registry.type_desc(local).name().to_string(),
                index: field_index,
            })?;
        let addr = FieldAddr::Field {
            index: field_index,
            name: descriptor.name.clone(),
        };

        if operation == Operation::Delete {
            let default = Value::default_for(&descriptor.kind);
            let previous = self.record_mut(target)?.set_field(
                usize::from(field_index),
                default.clone(),
            );
            self.release_previous(&previous, &default);
            changes.push(ChangeRecord {
                ref_id: target,
                addr,
                op: ChangeOp::Delete,
                value: default,
                previous,
            });
            return Ok(());
        }

        let (value, created) = self.decode_value(reader, &descriptor.kind)?;
        let previous = self
            .record_mut(target)?
            .set_field(usize::from(field_index), value.clone());

        if operation == Operation::Replace && previous == value {
            // value-equal for primitives, reference-identical for refs:
            // nothing observable changed
            return Ok(());
        }

        self.retain_value(&value, created, &previous);
        self.release_previous(&previous, &value);
        changes.push(ChangeRecord {
            ref_id: target,
            addr,
            op: match operation {
                Operation::Add => ChangeOp::Add,
                Operation::DeleteAndAdd => ChangeOp::DeleteAndAdd,
                _ => ChangeOp::Replace,
            },
            value,
            previous,
        });
        Ok(())
    }

    // Keyed-collection targets

    fn decode_map_op(
        &mut self,
        reader: &mut ByteReader,
        target: RefId,
        element: &FieldKind,
        op_byte: u8,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<(), DecodeError> {
        let operation = Operation::from_byte(op_byte).ok_or(DecodeError::UnknownOpcode {
            byte: op_byte,
            ref_id: target,
        })?;

        match operation {
            Operation::Clear => {
                let removed = self.map_mut(target)?.clear_entries();
                for (position, (key, previous)) in removed.into_iter().enumerate() {
                    self.release_previous(&previous, &Value::None);
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Key {
                            index: position as u64,
                            key,
                        },
                        op: ChangeOp::Delete,
                        value: Value::None,
                        previous,
                    });
                }
            }
            Operation::Add | Operation::DeleteAndAdd => {
                let index = decode_varuint(reader)?;
                let key = decode_string(reader)?;
                let (value, created) = self.decode_value(reader, element)?;

                // an old entry at this positional index is displaced first
                let displaced = if operation == Operation::DeleteAndAdd {
                    self.map_mut(target)?.delete_by_index(index)
                } else {
                    None
                };
                if let Some((old_key, old_value)) = displaced {
                    if old_key == key {
                        let previous = old_value;
                        self.map_mut(target)?.set_by_index(index, key.clone(), value.clone());
                        self.retain_value(&value, created, &previous);
                        self.release_previous(&previous, &value);
                        changes.push(ChangeRecord {
                            ref_id: target,
                            addr: FieldAddr::Key { index, key },
                            op: ChangeOp::DeleteAndAdd,
                            value,
                            previous,
                        });
                        return Ok(());
                    }
                    // the new slot takes its reference before the displaced
                    // slot drops its own, so an instance moving between
                    // keys is never transiently unreferenced
                    let previous = self
                        .map_mut(target)?
                        .set_by_index(index, key.clone(), value.clone())
                        .unwrap_or(Value::None);
                    self.retain_value(&value, created, &previous);
                    self.release_previous(&previous, &value);
                    self.release_previous(&old_value, &Value::None);
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Key {
                            index,
                            key: old_key,
                        },
                        op: ChangeOp::Delete,
                        value: Value::None,
                        previous: old_value,
                    });
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Key { index, key },
                        op: ChangeOp::Add,
                        value,
                        previous,
                    });
                    return Ok(());
                }

                let previous = self
                    .map_mut(target)?
                    .set_by_index(index, key.clone(), value.clone())
                    .unwrap_or(Value::None);
                self.retain_value(&value, created, &previous);
                self.release_previous(&previous, &value);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Key { index, key },
                    op: ChangeOp::Add,
                    value,
                    previous,
                });
            }
            Operation::Replace => {
                let index = decode_varuint(reader)?;
                let key = self
                    .map_ref(target)?
                    .key_by_index(index)
                    .cloned()
                    .ok_or(DecodeError::UnknownPositionalIndex {
                        index,
                        ref_id: target,
                    })?;
                let (value, created) = self.decode_value(reader, element)?;
                let previous = self
                    .map_ref(target)?
                    .get(&key)
                    .cloned()
                    .unwrap_or(Value::None);
                if previous == value {
                    return Ok(());
                }
                self.map_mut(target)?.set_by_index(index, key.clone(), value.clone());
                self.retain_value(&value, created, &previous);
                self.release_previous(&previous, &value);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Key { index, key },
                    op: ChangeOp::Replace,
                    value,
                    previous,
                });
            }
            Operation::Delete => {
                let index = decode_varuint(reader)?;
                let (key, previous) = self.map_mut(target)?.delete_by_index(index).ok_or(
                    DecodeError::UnknownPositionalIndex {
                        index,
                        ref_id: target,
                    },
                )?;
                self.release_previous(&previous, &Value::None);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Key { index, key },
                    op: ChangeOp::Delete,
                    value: Value::None,
                    previous,
                });
            }
            Operation::DeleteAndMove => {
                return Err(DecodeError::UnknownOpcode {
                    byte: op_byte,
                    ref_id: target,
                });
            }
        }
        Ok(())
    }

    // Ordered-collection targets

    fn decode_array_op(
        &mut self,
        reader: &mut ByteReader,
        target: RefId,
        element: &FieldKind,
        op_byte: u8,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<(), DecodeError> {
        let operation = Operation::from_byte(op_byte).ok_or(DecodeError::UnknownOpcode {
            byte: op_byte,
            ref_id: target,
        })?;

        match operation {
            Operation::Clear => {
                let removed = self.array_mut(target)?.clear_entries();
                for (index, previous) in removed {
                    self.release_previous(&previous, &Value::None);
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Index(index as u64),
                        op: ChangeOp::Delete,
                        value: Value::None,
                        previous,
                    });
                }
            }
            Operation::Add => {
                let index = decode_varuint(reader)?;
                let slot = self.checked_array_index(target, index)?;
                let (value, created) = self.decode_value(reader, element)?;
                let previous = self
                    .array_mut(target)?
                    .add(slot, value.clone())
                    .unwrap_or(Value::None);
                self.retain_value(&value, created, &previous);
                self.release_previous(&previous, &value);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Index(index),
                    op: ChangeOp::Add,
                    value,
                    previous,
                });
            }
            Operation::Replace => {
                let index = decode_varuint(reader)?;
                let slot = self.checked_array_index(target, index)?;
                let (value, created) = self.decode_value(reader, element)?;
                let previous = self
                    .array_ref(target)?
                    .get(slot)
                    .cloned()
                    .unwrap_or(Value::None);
                if previous == value {
                    return Ok(());
                }
                self.array_mut(target)?.replace(slot, value.clone());
                self.retain_value(&value, created, &previous);
                self.release_previous(&previous, &value);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Index(index),
                    op: ChangeOp::Replace,
                    value,
                    previous,
                });
            }
            Operation::Delete => {
                let index = decode_varuint(reader)?;
                // a delete never grows the array, so an oversized index is
                // just a guaranteed-empty slot
                let slot = usize::try_from(index).unwrap_or(usize::MAX);
                let Some(previous) = self.array_mut(target)?.delete(slot) else {
                    warn!(
                        "DELETE of already-empty array slot {} on RefId {}",
                        index, target
                    );
                    return Ok(());
                };
                self.release_previous(&previous, &Value::None);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Index(index),
                    op: ChangeOp::Delete,
                    value: Value::None,
                    previous,
                });
            }
            Operation::DeleteAndAdd => {
                let index = decode_varuint(reader)?;
                let slot = self.checked_array_index(target, index)?;
                let (value, created) = self.decode_value(reader, element)?;
                let previous = self
                    .array_mut(target)?
                    .delete(slot)
                    .unwrap_or(Value::None);
                self.array_mut(target)?.replace(slot, value.clone());
                self.retain_value(&value, created, &previous);
                self.release_previous(&previous, &value);
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Index(index),
                    op: ChangeOp::DeleteAndAdd,
                    value,
                    previous,
                });
            }
            Operation::DeleteAndMove => {
                let index = decode_varuint(reader)?;
                let slot = self.checked_array_index(target, index)?;
                let (value, created) = self.decode_value(reader, element)?;
                let removed = self
                    .array_mut(target)?
                    .delete_and_move(slot, value.clone());
                let moved_same = removed.as_ref().map(Value::as_ref_id)
                    == Some(value.as_ref_id())
                    && value.as_ref_id().is_some();
                if let Some(removed) = removed {
                    if !moved_same {
                        self.release_previous(&removed, &Value::None);
                    }
                    changes.push(ChangeRecord {
                        ref_id: target,
                        addr: FieldAddr::Index(0),
                        op: ChangeOp::Delete,
                        value: Value::None,
                        previous: removed,
                    });
                }
                if !moved_same {
                    self.retain_value(&value, created, &Value::None);
                }
                changes.push(ChangeRecord {
                    ref_id: target,
                    addr: FieldAddr::Index(index),
                    op: ChangeOp::Add,
                    value,
                    previous: Value::None,
                });
            }
        }
        Ok(())
    }

    // Value decoding

    /// Decode one value of the declared kind. For tracked kinds, a known
    /// RefId aliases the existing instance; an unknown one instantiates
    /// and registers a new instance (`created` = true, count 1).
    fn decode_value(
        &mut self,
        reader: &mut ByteReader,
        kind: &FieldKind,
    ) -> Result<(Value, bool), DecodeError> {
        let value = match kind {
            FieldKind::Bool => Value::Bool(decode_bool(reader)?),
            FieldKind::Int8 => Value::Int8(reader.read_i8()?),
            FieldKind::Uint8 => Value::Uint8(reader.read_u8()?),
            FieldKind::Int16 => Value::Int16(reader.read_i16()?),
            FieldKind::Uint16 => Value::Uint16(reader.read_u16()?),
            FieldKind::Int32 => Value::Int32(reader.read_i32()?),
            FieldKind::Uint32 => Value::Uint32(reader.read_u32()?),
            FieldKind::Int64 => Value::Int64(reader.read_i64()?),
            FieldKind::Uint64 => Value::Uint64(reader.read_u64()?),
            FieldKind::Float32 => Value::Float32(reader.read_f32()?),
            FieldKind::Float64 => Value::Float64(reader.read_f64()?),
            FieldKind::Number => Value::Number(decode_number(reader)?),
            FieldKind::Str => Value::Str(decode_string(reader)?),
            FieldKind::Record(declared) => {
                let mut local = *declared;
                if reader.peek_u8()? == TYPE_ID {
                    reader.read_u8()?;
                    let type_id = decode_varuint(reader)?;
                    local = Some(self.registry.local_for_server(type_id).ok_or(
                        DecodeError::UnknownTypeId { type_id },
                    )?);
                }
                let ref_id = decode_varuint(reader)?;
                if self.tracker.contains(ref_id) {
                    return Ok((Value::Ref(ref_id), false));
                }
                let local = local.ok_or(DecodeError::MissingInlineType { ref_id })?;
                let record = self.registry.new_record(local);
                self.tracker.register(ref_id, Instance::Record(record));
                return Ok((Value::Ref(ref_id), true));
            }
            FieldKind::Map(inner) => {
                let ref_id = decode_varuint(reader)?;
                if self.tracker.contains(ref_id) {
                    return Ok((Value::Ref(ref_id), false));
                }
                self.tracker
                    .register(ref_id, Instance::Map(MapSchema::new((**inner).clone())));
                return Ok((Value::Ref(ref_id), true));
            }
            FieldKind::Array(inner) => {
                let ref_id = decode_varuint(reader)?;
                if self.tracker.contains(ref_id) {
                    return Ok((Value::Ref(ref_id), false));
                }
                self.tracker
                    .register(ref_id, Instance::Array(ArraySchema::new((**inner).clone())));
                return Ok((Value::Ref(ref_id), true));
            }
        };
        Ok((value, false))
    }

    // Reference-count bookkeeping

    /// Count the new parent slot for an aliased instance. A freshly
    /// created instance already carries the count from its registration.
    fn retain_value(&mut self, value: &Value, created: bool, previous: &Value) {
        if created {
            return;
        }
        if let Value::Ref(ref_id) = value {
            if previous.as_ref_id() != Some(*ref_id) {
                self.tracker.add_ref(*ref_id);
            }
        }
    }

    /// Drop the parent slot that held `previous`, unless the slot still
    /// holds the same instance.
    fn release_previous(&mut self, previous: &Value, new_value: &Value) {
        if let Value::Ref(ref_id) = previous {
            if new_value.as_ref_id() != Some(*ref_id) {
                self.tracker.remove(*ref_id);
            }
        }
    }

    /// Validate a wire-supplied array index against the target's current
    /// extent plus bounded slack, converting it checked rather than
    /// truncated on 32-bit targets.
    fn checked_array_index(&self, target: RefId, index: u64) -> Result<usize, DecodeError> {
        let len = self.array_ref(target)?.len() as u64;
        if index > len.saturating_add(MAX_INDEX_SLACK) {
            return Err(DecodeError::IndexOutOfRange {
                index,
                ref_id: target,
            });
        }
        usize::try_from(index).map_err(|_| DecodeError::IndexOutOfRange {
            index,
            ref_id: target,
        })
    }

    // Target accessors; a missing or mis-shaped target means the graph no
    // longer matches the patch stream, which is the unknown-RefId failure.

    fn record_mut(&mut self, ref_id: RefId) -> Result<&mut crate::schema::record::Record, DecodeError> {
        self.tracker
            .get_mut(ref_id)
            .and_then(Instance::as_record_mut)
            .ok_or(DecodeError::UnknownRefId { ref_id })
    }

    fn map_ref(&self, ref_id: RefId) -> Result<&MapSchema, DecodeError> {
        self.tracker
            .get(ref_id)
            .and_then(Instance::as_map)
            .ok_or(DecodeError::UnknownRefId { ref_id })
    }

    fn map_mut(&mut self, ref_id: RefId) -> Result<&mut MapSchema, DecodeError> {
        match self.tracker.get_mut(ref_id) {
            Some(Instance::Map(map)) => Ok(map),
            _ => Err(DecodeError::UnknownRefId { ref_id }),
        }
    }

    fn array_ref(&self, ref_id: RefId) -> Result<&ArraySchema, DecodeError> {
        self.tracker
            .get(ref_id)
            .and_then(Instance::as_array)
            .ok_or(DecodeError::UnknownRefId { ref_id })
    }

    fn array_mut(&mut self, ref_id: RefId) -> Result<&mut ArraySchema, DecodeError> {
        match self.tracker.get_mut(ref_id) {
            Some(Instance::Array(array)) => Ok(array),
            _ => Err(DecodeError::UnknownRefId { ref_id }),
        }
    }
}
