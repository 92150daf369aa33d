use crate::number::{
    FIXSTR_BASE, FIXSTR_MAX_LEN, MARKER_F32, MARKER_F64, MARKER_I16, MARKER_I32, MARKER_I64,
    MARKER_I8, MARKER_STR16, MARKER_STR32, MARKER_STR8, MARKER_U16, MARKER_U32, MARKER_U64,
    MARKER_U8,
};

/// A growable byte buffer that encodes values the way `ByteReader` decodes
/// them. The core library only ever decodes; this writer exists for tests
/// and tooling that need to script patch and handshake buffers.
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    /// Encode a non-negative integer with the narrowest marker that holds it.
    pub fn write_varuint(&mut self, value: u64) {
        if value <= 0x7f {
            self.write_u8(value as u8);
        } else if value <= u64::from(u8::MAX) {
            self.write_u8(MARKER_U8);
            self.write_u8(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.write_u8(MARKER_U16);
            self.write_u16(value as u16);
        } else if value <= u64::from(u32::MAX) {
            self.write_u8(MARKER_U32);
            self.write_u32(value as u32);
        } else {
            self.write_u8(MARKER_U64);
            self.write_u64(value);
        }
    }

    /// Encode a number with the narrowest representation that round-trips.
    pub fn write_number(&mut self, value: f64) {
        let is_integral = value.is_finite() && value.fract() == 0.0;
        if is_integral && value >= 0.0 && value <= u64::MAX as f64 {
            self.write_varuint(value as u64);
        } else if is_integral && value < 0.0 && value >= i64::MIN as f64 {
            let signed = value as i64;
            if signed >= -32 {
                self.write_i8(signed as i8);
            } else if signed >= i64::from(i8::MIN) {
                self.write_u8(MARKER_I8);
                self.write_i8(signed as i8);
            } else if signed >= i64::from(i16::MIN) {
                self.write_u8(MARKER_I16);
                self.write_i16(signed as i16);
            } else if signed >= i64::from(i32::MIN) {
                self.write_u8(MARKER_I32);
                self.write_i32(signed as i32);
            } else {
                self.write_u8(MARKER_I64);
                self.write_i64(signed);
            }
        } else if f64::from(value as f32) == value {
            self.write_u8(MARKER_F32);
            self.write_f32(value as f32);
        } else {
            self.write_u8(MARKER_F64);
            self.write_f64(value);
        }
    }

    pub fn write_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        if bytes.len() <= FIXSTR_MAX_LEN {
            self.write_u8(FIXSTR_BASE + bytes.len() as u8);
        } else if bytes.len() <= usize::from(u8::MAX) {
            self.write_u8(MARKER_STR8);
            self.write_u8(bytes.len() as u8);
        } else if bytes.len() <= usize::from(u16::MAX) {
            self.write_u8(MARKER_STR16);
            self.write_u16(bytes.len() as u16);
        } else {
            self.write_u8(MARKER_STR32);
            self.write_u32(bytes.len() as u32);
        }
        self.buffer.extend_from_slice(bytes);
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}
