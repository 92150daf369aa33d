use crate::schema::field::{RefId, Value};

/// What a change did to its slot, from the observer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Add,
    Replace,
    Delete,
    /// A single wire op that removed one entry and added another in place.
    /// Dispatch treats it as a remove followed by an add.
    DeleteAndAdd,
}

/// Which slot of the target instance changed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAddr {
    /// A structured record field, by declared index.
    Field { index: u8, name: String },
    /// A keyed-collection entry; `index` is the wire's positional index.
    Key { index: u64, key: String },
    /// An ordered-collection slot.
    Index(u64),
}

impl FieldAddr {
    /// The map key or record field name, where one exists.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Field { name, .. } => Some(name),
            Self::Key { key, .. } => Some(key),
            Self::Index(_) => None,
        }
    }
}

/// One field-level change produced by a decode call. Transient: built
/// during the call, consumed by dispatch, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// The instance whose slot changed.
    pub ref_id: RefId,
    pub addr: FieldAddr,
    pub op: ChangeOp,
    pub value: Value,
    pub previous: Value,
}
