use thiserror::Error;

use mirror_serde::SerdeErr;

/// Errors that can occur while applying a byte-patch.
///
/// A decode-format error is fatal to the decode call that raised it.
/// Records applied earlier in the same call stay applied; apply-in-place
/// per record makes exact rollback impractical, so partial application on
/// fatal error is a documented limitation, not a bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Malformed wire bytes: bad prefix, out-of-bounds read, bad UTF-8
    #[error("wire decode failed: {0}")]
    Serde(#[from] SerdeErr),

    /// A patch arrived before any root state was created
    #[error("no root state exists; the handshake must run before any patch")]
    MissingRoot,

    /// A non-ADD operation addressed a RefId the tracker does not know.
    /// Indicates encoder/decoder version skew, most likely a local schema
    /// that does not match the server's.
    #[error("operation addressed unregistered RefId {ref_id}")]
    UnknownRefId { ref_id: u64 },

    /// A collection operation byte matched no known operation
    #[error("unknown opcode byte 0x{byte:02x} for collection RefId {ref_id}")]
    UnknownOpcode { byte: u8, ref_id: u64 },

    /// A record operation carried a field index past the type's field table
    #[error("field index {index} out of range for type {type_name}")]
    UnknownFieldIndex { type_name: String, index: u8 },

    /// An inline type id was never bound during the handshake
    #[error("server type id {type_id} has no bound local type")]
    UnknownTypeId { type_id: u64 },

    /// ADD of an unknown RefId on a polymorphic field without an inline type id
    #[error("ADD of RefId {ref_id} carried no inline type id for a polymorphic field")]
    MissingInlineType { ref_id: u64 },

    /// A map operation addressed a positional index with no established key
    #[error("positional index {index} has no key in map RefId {ref_id}")]
    UnknownPositionalIndex { index: u64, ref_id: u64 },

    /// An array operation carried an index far past the collection's end.
    /// Slots up to the index would be tombstone-padded, so an unchecked
    /// index lets a few patch bytes demand unbounded memory.
    #[error("array index {index} on RefId {ref_id} is beyond the permitted growth range")]
    IndexOutOfRange { index: u64, ref_id: u64 },
}
