//! # Mirror Serde
//! Byte-level wire codec shared by the mirror-client crates: a bounds-checked
//! read cursor, little-endian fixed-width primitives, and the compact
//! variable-length number/string encodings used by the patch protocol.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod byte_reader;
mod byte_writer;
mod error;
mod number;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
pub use error::SerdeErr;
pub use number::{decode_bool, decode_number, decode_string, decode_varuint};
