pub mod array_schema;
pub mod field;
pub mod instance;
pub mod map_schema;
pub mod record;
pub mod ref_tracker;
pub mod registry;

pub use array_schema::ArraySchema;
pub use field::{FieldDescriptor, FieldKind, LocalTypeId, RefId, Value};
pub use instance::Instance;
pub use map_schema::MapSchema;
pub use record::Record;
pub use ref_tracker::ReferenceTracker;
pub use registry::{SchemaRegistry, TypeBuilder, TypeDescriptor};
