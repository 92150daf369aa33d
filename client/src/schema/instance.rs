use crate::schema::{
    array_schema::ArraySchema, field::RefId, map_schema::MapSchema, record::Record,
};

/// A tracked container: every decoded record or collection reachable from
/// the root lives in the tracker as one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Record(Record),
    Map(MapSchema),
    Array(ArraySchema),
}

impl Instance {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapSchema> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArraySchema> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// RefIds of every child instance currently referenced by this one.
    /// Used for cascade removal when this instance's own count hits zero.
    pub fn child_refs(&self) -> Vec<RefId> {
        match self {
            Self::Record(record) => record
                .iter()
                .filter_map(|(_, value)| value.as_ref_id())
                .collect(),
            Self::Map(map) => map
                .iter()
                .filter_map(|(_, value)| value.as_ref_id())
                .collect(),
            Self::Array(array) => array
                .iter()
                .filter_map(|(_, value)| value.as_ref_id())
                .collect(),
        }
    }

    /// End-of-decode hook: arrays compact their tombstones; other
    /// containers have nothing to do.
    pub fn on_decode_end(&mut self) {
        if let Self::Array(array) = self {
            array.on_decode_end();
        }
    }
}
