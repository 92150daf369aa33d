/// Server-assigned identity for a decoded record or collection instance.
pub type RefId = u64;

/// Index into the session registry's locally compiled type table.
pub type LocalTypeId = usize;

/// Declared wire type of a schema field or collection element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    /// Variable-length numeric encoding, widened to f64 on decode.
    Number,
    Str,
    /// Nested structured record. `None` marks a polymorphic field whose
    /// concrete type arrives inline with the ADD operation.
    Record(Option<LocalTypeId>),
    Map(Box<FieldKind>),
    Array(Box<FieldKind>),
}

impl FieldKind {
    /// Whether values of this kind are tracked instances (carry a RefId).
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Record(_) | Self::Map(_) | Self::Array(_))
    }

    /// The wire-type string used for structural matching against the
    /// server's reflection manifest.
    pub fn wire_type(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Int8 => "int8".to_string(),
            Self::Uint8 => "uint8".to_string(),
            Self::Int16 => "int16".to_string(),
            Self::Uint16 => "uint16".to_string(),
            Self::Int32 => "int32".to_string(),
            Self::Uint32 => "uint32".to_string(),
            Self::Int64 => "int64".to_string(),
            Self::Uint64 => "uint64".to_string(),
            Self::Float32 => "float32".to_string(),
            Self::Float64 => "float64".to_string(),
            Self::Number => "number".to_string(),
            Self::Str => "string".to_string(),
            Self::Record(_) => "ref".to_string(),
            Self::Map(inner) => format!("map:{}", inner.wire_type()),
            Self::Array(inner) => format!("array:{}", inner.wire_type()),
        }
    }
}

/// One declared field of a structured record type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Declared index within the type's inheritance-flattened field set.
    pub index: u8,
}

/// A decoded field or collection-entry value.
///
/// Nested records and collections are held by RefId; the instances
/// themselves live in the [`ReferenceTracker`](crate::ReferenceTracker).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value: an unset reference field or a deleted slot's default.
    None,
    Bool(bool),
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Number(f64),
    Str(String),
    Ref(RefId),
}

impl Value {
    /// The value a field resets to when a DELETE operation clears it.
    pub fn default_for(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Bool => Self::Bool(false),
            FieldKind::Int8 => Self::Int8(0),
            FieldKind::Uint8 => Self::Uint8(0),
            FieldKind::Int16 => Self::Int16(0),
            FieldKind::Uint16 => Self::Uint16(0),
            FieldKind::Int32 => Self::Int32(0),
            FieldKind::Uint32 => Self::Uint32(0),
            FieldKind::Int64 => Self::Int64(0),
            FieldKind::Uint64 => Self::Uint64(0),
            FieldKind::Float32 => Self::Float32(0.0),
            FieldKind::Float64 => Self::Float64(0.0),
            FieldKind::Number => Self::Number(0.0),
            FieldKind::Str => Self::Str(String::new()),
            FieldKind::Record(_) | FieldKind::Map(_) | FieldKind::Array(_) => Self::None,
        }
    }

    pub fn as_ref_id(&self) -> Option<RefId> {
        match self {
            Self::Ref(ref_id) => Some(*ref_id),
            _ => None,
        }
    }
}
