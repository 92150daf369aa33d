pub mod change;
pub mod decoder;
pub mod error;
pub mod op;

pub use change::{ChangeOp, ChangeRecord, FieldAddr};
pub use decoder::{StateDecoder, ROOT_REF};
pub use error::DecodeError;
pub use op::{Operation, SWITCH_TO_STRUCTURE, TYPE_ID};
