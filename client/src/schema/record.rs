use crate::schema::field::{FieldDescriptor, LocalTypeId, Value};

/// A decoded structured record: a fixed ordered set of fields addressed by
/// declared index. Field metadata lives in the session registry; the record
/// itself only stores its local type and current values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    local_type: LocalTypeId,
    fields: Vec<Value>,
}

impl Record {
    pub fn new(local_type: LocalTypeId, descriptors: &[FieldDescriptor]) -> Self {
        let fields = descriptors
            .iter()
            .map(|descriptor| Value::default_for(&descriptor.kind))
            .collect();
        Self { local_type, fields }
    }

    pub fn local_type(&self) -> LocalTypeId {
        self.local_type
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Set a field by declared index, returning the previous value.
    /// Index validity is checked by the decoder against the type's
    /// descriptor table before this is called.
    pub fn set_field(&mut self, index: usize, value: Value) -> Value {
        std::mem::replace(&mut self.fields[index], value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.fields.iter().enumerate()
    }
}
