use indexmap::IndexMap;

/// A dynamically-shaped tree value: primitives, ordered lists, and
/// string-keyed maps. Comparison dispatches on the tag; there is no
/// runtime type introspection. List indices render as decimal path
/// segments during diffing, so every key is representable in a path.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<TreeValue>),
    Map(IndexMap<String, TreeValue>),
}

impl TreeValue {
    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Containers of the same tag are comparable key-by-key; everything
    /// else is a replace when unequal.
    pub fn same_container_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::List(_), Self::List(_)) | (Self::Map(_), Self::Map(_))
        )
    }

    /// Keys of a container, list indices stringified; empty for scalars.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Self::Map(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&TreeValue> {
        match self {
            Self::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl From<bool> for TreeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TreeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TreeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TreeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl<T: Into<TreeValue>> FromIterator<T> for TreeValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::List(iter.into_iter().map(Into::into).collect())
    }
}
