use std::collections::HashMap;

use crate::schema::{
    field::{FieldDescriptor, FieldKind, LocalTypeId},
    record::Record,
};

/// One locally compiled record type: its declared fields plus the
/// inheritance-flattened (root-to-leaf) descriptor table the decoder and
/// the handshake matcher consume.
pub struct TypeDescriptor {
    name: String,
    parent: Option<LocalTypeId>,
    flat_fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<LocalTypeId> {
        self.parent
    }

    /// All fields, ancestor fields first, indexed 0..N-1.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.flat_fields
    }
}

/// Builder for one type definition; field indices are assigned in
/// declaration order, continuing after any inherited fields.
pub struct TypeBuilder {
    parent: Option<LocalTypeId>,
    fields: Vec<(String, FieldKind)>,
}

impl TypeBuilder {
    pub fn parent(&mut self, parent: LocalTypeId) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn field(&mut self, name: &str, kind: FieldKind) -> &mut Self {
        self.fields.push((name.to_string(), kind));
        self
    }
}

/// Session-scoped registry of locally compiled types and their one-time
/// binding to server type ids. Passed into the decoder at construction;
/// never a process-wide singleton, so sessions cannot collide and teardown
/// is a plain drop.
pub struct SchemaRegistry {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<String, LocalTypeId>,
    server_to_local: HashMap<u64, LocalTypeId>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            by_name: HashMap::new(),
            server_to_local: HashMap::new(),
        }
    }

    /// Define a type. Inherited fields (if a parent is set) occupy the
    /// leading indices; declared fields follow.
    pub fn define(&mut self, name: &str, build: impl FnOnce(&mut TypeBuilder)) -> LocalTypeId {
        let mut builder = TypeBuilder {
            parent: None,
            fields: Vec::new(),
        };
        build(&mut builder);

        let mut flat_fields: Vec<FieldDescriptor> = match builder.parent {
            Some(parent) => self.types[parent].flat_fields.clone(),
            None => Vec::new(),
        };
        for (field_name, kind) in builder.fields {
            let index = flat_fields.len() as u8;
            flat_fields.push(FieldDescriptor {
                name: field_name,
                kind,
                index,
            });
        }

        let local = self.types.len();
        self.types.push(TypeDescriptor {
            name: name.to_string(),
            parent: builder.parent,
            flat_fields,
        });
        self.by_name.insert(name.to_string(), local);
        local
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_desc(&self, local: LocalTypeId) -> &TypeDescriptor {
        &self.types[local]
    }

    pub fn by_name(&self, name: &str) -> Option<LocalTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn fields(&self, local: LocalTypeId) -> &[FieldDescriptor] {
        &self.types[local].flat_fields
    }

    pub fn new_record(&self, local: LocalTypeId) -> Record {
        Record::new(local, self.fields(local))
    }

    /// Bind a server type id to a local type for the rest of the session.
    pub fn bind_server_type(&mut self, server_id: u64, local: LocalTypeId) {
        self.server_to_local.insert(server_id, local);
    }

    pub fn local_for_server(&self, server_id: u64) -> Option<LocalTypeId> {
        self.server_to_local.get(&server_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalTypeId, &TypeDescriptor)> {
        self.types.iter().enumerate()
    }

    /// Drop all server-id bindings, e.g. on disconnect; the compiled types
    /// themselves remain valid for a new handshake.
    pub fn clear_bindings(&mut self) {
        self.server_to_local.clear();
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::SchemaRegistry;
    use crate::schema::field::FieldKind;

    #[test]
    fn inherited_fields_flatten_root_to_leaf() {
        let mut registry = SchemaRegistry::new();
        let base = registry.define("Entity", |t| {
            t.field("x", FieldKind::Number).field("y", FieldKind::Number);
        });
        let player = registry.define("Player", |t| {
            t.parent(base).field("name", FieldKind::Str);
        });

        let fields = registry.fields(player);
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x", "y", "name"]);
        let indices: Vec<u8> = fields.iter().map(|f| f.index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[test]
    fn records_start_at_defaults() {
        let mut registry = SchemaRegistry::new();
        let local = registry.define("State", |t| {
            t.field("count", FieldKind::Uint32)
                .field("items", FieldKind::Array(Box::new(FieldKind::Number)));
        });
        let record = registry.new_record(local);
        assert_eq!(record.field_count(), 2);
        assert_eq!(
            record.field(0),
            Some(&crate::schema::field::Value::Uint32(0))
        );
        assert_eq!(record.field(1), Some(&crate::schema::field::Value::None));
    }
}
