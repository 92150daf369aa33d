#![allow(dead_code)]

use mirror_client::{Operation, SWITCH_TO_STRUCTURE, TYPE_ID};
use mirror_serde::ByteWriter;

/// Scripts patch buffers the way the server-side encoder would emit them.
pub struct PatchBuilder {
    writer: ByteWriter,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self {
            writer: ByteWriter::new(),
        }
    }

    pub fn bytes(self) -> Vec<u8> {
        self.writer.to_bytes()
    }

    /// Retarget the decoder at `ref_id`.
    pub fn switch(&mut self, ref_id: u64) -> &mut Self {
        self.writer.write_u8(SWITCH_TO_STRUCTURE);
        self.writer.write_varuint(ref_id);
        self
    }

    /// Record-target opcode: operation packed with the field index.
    pub fn record_op(&mut self, op: Operation, field_index: u8) -> &mut Self {
        self.writer.write_u8(op as u8 | field_index);
        self
    }

    /// Collection-target opcode plus positional index.
    pub fn collection_op(&mut self, op: Operation, index: u64) -> &mut Self {
        self.writer.write_u8(op as u8);
        self.writer.write_varuint(index);
        self
    }

    /// Collection CLEAR carries no index.
    pub fn clear_op(&mut self) -> &mut Self {
        self.writer.write_u8(Operation::Clear as u8);
        self
    }

    pub fn raw_byte(&mut self, byte: u8) -> &mut Self {
        self.writer.write_u8(byte);
        self
    }

    /// A map entry's key, following ADD / DELETE_AND_ADD addressing.
    pub fn key(&mut self, key: &str) -> &mut Self {
        self.writer.write_string(key);
        self
    }

    pub fn number(&mut self, value: f64) -> &mut Self {
        self.writer.write_number(value);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.writer.write_string(value);
        self
    }

    pub fn boolean(&mut self, value: bool) -> &mut Self {
        self.writer.write_bool(value);
        self
    }

    /// A child instance value: its RefId.
    pub fn child_ref(&mut self, ref_id: u64) -> &mut Self {
        self.writer.write_varuint(ref_id);
        self
    }

    /// Inline server type id preceding a polymorphic child RefId.
    pub fn inline_type(&mut self, server_type_id: u64) -> &mut Self {
        self.writer.write_u8(TYPE_ID);
        self.writer.write_varuint(server_type_id);
        self
    }
}
