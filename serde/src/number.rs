use crate::{byte_reader::ByteReader, error::SerdeErr};

// Variable-length number encoding. Small values fit in a single byte;
// marker bytes escape to wider little-endian representations.

pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;
pub const NEGATIVE_FIXINT_MIN: u8 = 0xe0;

pub const MARKER_F32: u8 = 0xca;
pub const MARKER_F64: u8 = 0xcb;
pub const MARKER_U8: u8 = 0xcc;
pub const MARKER_U16: u8 = 0xcd;
pub const MARKER_U32: u8 = 0xce;
pub const MARKER_U64: u8 = 0xcf;
pub const MARKER_I8: u8 = 0xd0;
pub const MARKER_I16: u8 = 0xd1;
pub const MARKER_I32: u8 = 0xd2;
pub const MARKER_I64: u8 = 0xd3;

pub const FIXSTR_BASE: u8 = 0xa0;
pub const FIXSTR_MAX_LEN: usize = 31;
pub const MARKER_STR8: u8 = 0xd9;
pub const MARKER_STR16: u8 = 0xda;
pub const MARKER_STR32: u8 = 0xdb;

/// Decode one variable-length number to its widest common type.
pub fn decode_number(reader: &mut ByteReader) -> Result<f64, SerdeErr> {
    let offset = reader.position();
    let marker = reader.read_u8()?;
    match marker {
        0x00..=POSITIVE_FIXINT_MAX => Ok(f64::from(marker)),
        NEGATIVE_FIXINT_MIN..=0xff => Ok(f64::from(marker as i8)),
        MARKER_F32 => Ok(f64::from(reader.read_f32()?)),
        MARKER_F64 => reader.read_f64(),
        MARKER_U8 => Ok(f64::from(reader.read_u8()?)),
        MARKER_U16 => Ok(f64::from(reader.read_u16()?)),
        MARKER_U32 => Ok(f64::from(reader.read_u32()?)),
        MARKER_U64 => Ok(reader.read_u64()? as f64),
        MARKER_I8 => Ok(f64::from(reader.read_i8()?)),
        MARKER_I16 => Ok(f64::from(reader.read_i16()?)),
        MARKER_I32 => Ok(f64::from(reader.read_i32()?)),
        MARKER_I64 => Ok(reader.read_i64()? as f64),
        _ => Err(SerdeErr::UnknownMarker { marker, offset }),
    }
}

/// Decode a variable-length number that must be a non-negative integer,
/// e.g. a RefId, field index, or positional index.
pub fn decode_varuint(reader: &mut ByteReader) -> Result<u64, SerdeErr> {
    let offset = reader.position();
    let marker = reader.read_u8()?;
    match marker {
        0x00..=POSITIVE_FIXINT_MAX => Ok(u64::from(marker)),
        MARKER_U8 => Ok(u64::from(reader.read_u8()?)),
        MARKER_U16 => Ok(u64::from(reader.read_u16()?)),
        MARKER_U32 => Ok(u64::from(reader.read_u32()?)),
        MARKER_U64 => reader.read_u64(),
        _ => Err(SerdeErr::UnknownMarker { marker, offset }),
    }
}

/// Decode a length-prefixed UTF-8 string.
pub fn decode_string(reader: &mut ByteReader) -> Result<String, SerdeErr> {
    let offset = reader.position();
    let marker = reader.read_u8()?;
    let length = match marker {
        FIXSTR_BASE..=0xbf => usize::from(marker - FIXSTR_BASE),
        MARKER_STR8 => usize::from(reader.read_u8()?),
        MARKER_STR16 => usize::from(reader.read_u16()?),
        MARKER_STR32 => reader.read_u32()? as usize,
        _ => return Err(SerdeErr::UnknownMarker { marker, offset }),
    };
    let text_offset = reader.position();
    let bytes = reader.read_bytes(length)?;
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => Err(SerdeErr::InvalidUtf8 {
            offset: text_offset,
        }),
    }
}

/// Decode a single-byte boolean; any nonzero byte is true.
pub fn decode_bool(reader: &mut ByteReader) -> Result<bool, SerdeErr> {
    Ok(reader.read_u8()? != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{byte_reader::ByteReader, byte_writer::ByteWriter};

    fn decode_one(bytes: &[u8]) -> f64 {
        let mut reader = ByteReader::new(bytes);
        decode_number(&mut reader).unwrap()
    }

    #[test]
    fn fixint_ranges() {
        assert_eq!(decode_one(&[0x00]), 0.0);
        assert_eq!(decode_one(&[0x7f]), 127.0);
        assert_eq!(decode_one(&[0xff]), -1.0);
        assert_eq!(decode_one(&[0xe0]), -32.0);
    }

    #[test]
    fn escaped_widths() {
        assert_eq!(decode_one(&[MARKER_U8, 0xff]), 255.0);
        assert_eq!(decode_one(&[MARKER_U16, 0xff, 0xff]), 65535.0);
        assert_eq!(decode_one(&[MARKER_I16, 0x00, 0x80]), -32768.0);
        assert_eq!(
            decode_one(&[MARKER_U32, 0xff, 0xff, 0xff, 0xff]),
            4294967295.0
        );
        assert_eq!(decode_one(&[MARKER_I8, 0x80]), -128.0);
    }

    #[test]
    fn floats() {
        let mut bytes = vec![MARKER_F32];
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        assert_eq!(decode_one(&bytes), 1.5);

        let mut bytes = vec![MARKER_F64];
        bytes.extend_from_slice(&f64::NEG_INFINITY.to_le_bytes());
        assert_eq!(decode_one(&bytes), f64::NEG_INFINITY);

        let mut bytes = vec![MARKER_F64];
        bytes.extend_from_slice(&f64::NAN.to_le_bytes());
        assert!(decode_one(&bytes).is_nan());
    }

    #[test]
    fn unknown_marker_fails() {
        let mut reader = ByteReader::new(&[0x81]);
        assert_eq!(
            decode_number(&mut reader),
            Err(SerdeErr::UnknownMarker {
                marker: 0x81,
                offset: 0,
            })
        );
    }

    #[test]
    fn varuint_rejects_signed_and_float_markers() {
        let mut reader = ByteReader::new(&[MARKER_I8, 0xff]);
        assert!(decode_varuint(&mut reader).is_err());
        let mut reader = ByteReader::new(&[MARKER_F64]);
        assert!(decode_varuint(&mut reader).is_err());
    }

    #[test]
    fn truncated_escape_fails() {
        let mut reader = ByteReader::new(&[MARKER_U32, 0x01, 0x02]);
        assert!(decode_number(&mut reader).is_err());
    }

    #[test]
    fn strings() {
        let mut writer = ByteWriter::new();
        writer.write_string("hello");
        let bytes = writer.to_bytes();
        assert_eq!(bytes[0], FIXSTR_BASE + 5);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(decode_string(&mut reader).unwrap(), "hello");
    }

    #[test]
    fn long_string_escapes_prefix() {
        let long = "x".repeat(300);
        let mut writer = ByteWriter::new();
        writer.write_string(&long);
        let bytes = writer.to_bytes();
        assert_eq!(bytes[0], MARKER_STR16);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(decode_string(&mut reader).unwrap(), long);
    }

    #[test]
    fn string_prefix_past_buffer_end_fails() {
        // fixstr claiming 10 bytes with only 2 available
        let mut reader = ByteReader::new(&[FIXSTR_BASE + 10, b'h', b'i']);
        assert!(matches!(
            decode_string(&mut reader),
            Err(SerdeErr::OutOfBounds { .. })
        ));
    }

    #[test]
    fn invalid_utf8_fails() {
        let mut reader = ByteReader::new(&[FIXSTR_BASE + 2, 0xc3, 0x28]);
        assert_eq!(
            decode_string(&mut reader),
            Err(SerdeErr::InvalidUtf8 { offset: 1 })
        );
    }

    #[test]
    fn bools() {
        let mut reader = ByteReader::new(&[0x00, 0x01, 0x2a]);
        assert!(!decode_bool(&mut reader).unwrap());
        assert!(decode_bool(&mut reader).unwrap());
        assert!(decode_bool(&mut reader).unwrap());
    }

    #[test]
    fn writer_picks_narrowest_number() {
        for (value, expected_len) in [
            (0.0, 1),
            (127.0, 1),
            (-1.0, 1),
            (-32.0, 1),
            (128.0, 2),
            (255.0, 2),
            (-33.0, 2),
            (-128.0, 2),
            (256.0, 3),
            (65535.0, 3),
            (-32768.0, 3),
            (65536.0, 5),
            (1.5, 5),
            (4294967296.0, 9),
            (1.1, 9),
        ] {
            let mut writer = ByteWriter::new();
            writer.write_number(value);
            let bytes = writer.to_bytes();
            assert_eq!(bytes.len(), expected_len, "encoding {}", value);
            let mut reader = ByteReader::new(&bytes);
            assert_eq!(decode_number(&mut reader).unwrap(), value);
        }
    }
}
