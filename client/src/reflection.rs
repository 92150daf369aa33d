//! One-time handshake: decodes the server's type manifest and structurally
//! matches it against the locally compiled schema types, binding server
//! type ids for the rest of the connection.
//!
//! This is a hard correctness boundary: every subsequent decode operation
//! is addressed by TypeId, so a manifest that cannot be matched must fail
//! here, before any patch is applied, never by decoding wrong data.

use std::collections::HashMap;

use log::info;
use thiserror::Error;

use mirror_serde::{decode_string, decode_varuint, ByteReader, SerdeErr};

use crate::schema::registry::SchemaRegistry;

/// Pre-allocation cap for wire-declared element counts.
const PREALLOC_LIMIT: u64 = 64;

/// Errors that can occur while decoding or matching the handshake manifest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandshakeError {
    #[error("manifest decode failed: {0}")]
    Serde(#[from] SerdeErr),

    /// The manifest names a root type id it never declares
    #[error("manifest root type {type_id} is not declared in the manifest")]
    UnknownRootType { type_id: u64 },

    /// A declared parent type id is missing from the manifest
    #[error("server type {type_id} names undeclared parent {parent_id}")]
    UnknownParentType { type_id: u64, parent_id: u64 },

    /// A declared parent chain loops back on itself
    #[error("server type {type_id} has a cyclic parent chain")]
    CyclicParent { type_id: u64 },

    /// A server type matched no locally compiled type
    #[error("schema mismatch: server type {type_id} with fields [{summary}] matches no local type")]
    SchemaMismatch { type_id: u64, summary: String },
}

/// One field of a server-declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionField {
    pub name: String,
    pub wire_type: String,
    pub index: u64,
}

/// One server-declared type: its own fields plus an optional parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionType {
    pub type_id: u64,
    pub parent_id: Option<u64>,
    pub fields: Vec<ReflectionField>,
}

/// The decoded handshake payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionManifest {
    pub root_type_id: u64,
    pub types: Vec<ReflectionType>,
}

impl ReflectionManifest {
    /// Decode a manifest: varuint root type id, varuint type count, then
    /// per type its id, parent id + 1 (0 = none), field count, and per
    /// field the name, wire-type string, and declared index.
    pub fn decode(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let root_type_id = decode_varuint(reader)?;
        let type_count = decode_varuint(reader)?;
        // counts come straight off the wire; pre-allocation is capped and
        // an overstated count fails on the per-element reads instead
        let mut types = Vec::with_capacity(type_count.min(PREALLOC_LIMIT) as usize);
        for _ in 0..type_count {
            let type_id = decode_varuint(reader)?;
            let parent_raw = decode_varuint(reader)?;
            let parent_id = parent_raw.checked_sub(1);
            let field_count = decode_varuint(reader)?;
            let mut fields = Vec::with_capacity(field_count.min(PREALLOC_LIMIT) as usize);
            for _ in 0..field_count {
                let name = decode_string(reader)?;
                let wire_type = decode_string(reader)?;
                let index = decode_varuint(reader)?;
                fields.push(ReflectionField {
                    name,
                    wire_type,
                    index,
                });
            }
            types.push(ReflectionType {
                type_id,
                parent_id,
                fields,
            });
        }
        Ok(Self {
            root_type_id,
            types,
        })
    }

    /// A server type's fields flattened along its parent chain,
    /// root-to-leaf, each type's own fields ordered by declared index.
    fn flat_fields(&self, type_id: u64) -> Result<Vec<&ReflectionField>, HandshakeError> {
        let by_id: HashMap<u64, &ReflectionType> =
            self.types.iter().map(|t| (t.type_id, t)).collect();

        let mut chain: Vec<&ReflectionType> = Vec::new();
        let mut cursor = Some(type_id);
        while let Some(current) = cursor {
            if chain.iter().any(|declared| declared.type_id == current) {
                return Err(HandshakeError::CyclicParent { type_id });
            }
            let declared = by_id
                .get(&current)
                .ok_or(HandshakeError::UnknownParentType {
                    type_id,
                    parent_id: current,
                })?;
            chain.push(*declared);
            cursor = declared.parent_id;
        }
        chain.reverse();

        let mut fields = Vec::new();
        for declared in chain {
            let mut own: Vec<&ReflectionField> = declared.fields.iter().collect();
            own.sort_by_key(|field| field.index);
            fields.extend(own);
        }
        Ok(fields)
    }
}

/// Match every server type against the local registry by exact ordered
/// field-name/wire-type correspondence and bind its TypeId. Returns the
/// local type bound to the manifest's root.
pub fn bind_manifest(
    registry: &mut SchemaRegistry,
    manifest: &ReflectionManifest,
) -> Result<usize, HandshakeError> {
    for declared in &manifest.types {
        let server_fields = manifest.flat_fields(declared.type_id)?;
        let matched = registry
            .iter()
            .find(|(_, descriptor)| {
                let local_fields = descriptor.fields();
                local_fields.len() == server_fields.len()
                    && local_fields.iter().zip(server_fields.iter()).all(
                        |(local, server)| {
                            local.name == server.name
                                && local.kind.wire_type() == server.wire_type
                                && u64::from(local.index) == server.index
                        },
                    )
            })
            .map(|(local, _)| local);
        match matched {
            Some(local) => registry.bind_server_type(declared.type_id, local),
            None => {
                let summary = server_fields
                    .iter()
                    .map(|field| format!("{}:{}", field.name, field.wire_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(HandshakeError::SchemaMismatch {
                    type_id: declared.type_id,
                    summary,
                });
            }
        }
    }

    let root_local = registry
        .local_for_server(manifest.root_type_id)
        .ok_or(HandshakeError::UnknownRootType {
            type_id: manifest.root_type_id,
        })?;
    info!(
        "handshake bound {} server type(s); root type {} -> {}",
        manifest.types.len(),
        manifest.root_type_id,
        registry.type_desc(root_local).name()
    );
    Ok(root_local)
}
