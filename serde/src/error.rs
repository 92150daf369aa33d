use thiserror::Error;

/// Errors that can occur while decoding wire bytes.
///
/// The reader processes untrusted network data, so every read is
/// bounds-checked up front and a truncated or malformed buffer surfaces
/// here instead of panicking or clamping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// A read would run past the end of the buffer
    #[error("read of {needed} byte(s) at offset {offset} exceeds buffer of length {length}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        length: usize,
    },

    /// A variable-length number began with a marker byte the codec does not know
    #[error("unknown number marker byte 0x{marker:02x} at offset {offset}")]
    UnknownMarker { marker: u8, offset: usize },

    /// A string's bytes were not valid UTF-8
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
}
