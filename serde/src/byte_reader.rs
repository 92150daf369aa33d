use crate::error::SerdeErr;

/// A mutable read cursor over an immutable byte buffer.
///
/// Every read advances the cursor by exactly the consumed byte count and is
/// bounds-checked before any byte is touched, so a malformed buffer can
/// never cause an over-read. Fixed-width reads are little-endian.
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    cursor: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Start reading at `offset`, e.g. when a transport header precedes the patch.
    pub fn new_at(buffer: &'b [u8], offset: usize) -> Self {
        Self {
            buffer,
            cursor: offset,
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    pub fn has_remaining(&self) -> bool {
        self.cursor < self.buffer.len()
    }

    fn check(&self, needed: usize) -> Result<(), SerdeErr> {
        if self.cursor + needed > self.buffer.len() {
            return Err(SerdeErr::OutOfBounds {
                offset: self.cursor,
                needed,
                length: self.buffer.len(),
            });
        }
        Ok(())
    }

    /// Read the next byte without advancing the cursor.
    pub fn peek_u8(&self) -> Result<u8, SerdeErr> {
        self.check(1)?;
        Ok(self.buffer[self.cursor])
    }

    pub fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        self.check(1)?;
        let value = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8, SerdeErr> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeErr> {
        self.check(2)?;
        let value = u16::from_le_bytes([self.buffer[self.cursor], self.buffer[self.cursor + 1]]);
        self.cursor += 2;
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16, SerdeErr> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        self.check(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buffer[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_i32(&mut self) -> Result<i32, SerdeErr> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        self.check(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buffer[self.cursor..self.cursor + 8]);
        self.cursor += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_i64(&mut self) -> Result<i64, SerdeErr> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, SerdeErr> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, SerdeErr> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        self.check(count)?;
        let slice = &self.buffer[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::ByteReader;
    use crate::error::SerdeErr;

    #[test]
    fn fixed_width_little_endian() {
        let buffer = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert_eq!(reader.read_u32().unwrap(), 0x06050403);
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn out_of_bounds_read_fails() {
        let buffer = [0x01, 0x02];
        let mut reader = ByteReader::new(&buffer);
        let result = reader.read_u32();
        assert_eq!(
            result,
            Err(SerdeErr::OutOfBounds {
                offset: 0,
                needed: 4,
                length: 2,
            })
        );
        // a failed read must not move the cursor
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn peek_does_not_advance() {
        let buffer = [0xff, 0x00];
        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.peek_u8().unwrap(), 0xff);
        assert_eq!(reader.peek_u8().unwrap(), 0xff);
        assert_eq!(reader.read_u8().unwrap(), 0xff);
        assert_eq!(reader.read_u8().unwrap(), 0x00);
    }

    #[test]
    fn offset_start() {
        let buffer = [0xaa, 0xbb, 0x07];
        let mut reader = ByteReader::new_at(&buffer, 2);
        assert_eq!(reader.read_u8().unwrap(), 0x07);
        assert!(!reader.has_remaining());
    }

    #[test]
    fn float_round_trip_bits() {
        let bits = f64::NAN.to_bits().to_le_bytes();
        let mut reader = ByteReader::new(&bits);
        assert!(reader.read_f64().unwrap().is_nan());

        let inf = f32::INFINITY.to_bits().to_le_bytes();
        let mut reader = ByteReader::new(&inf);
        assert_eq!(reader.read_f32().unwrap(), f32::INFINITY);
    }
}
