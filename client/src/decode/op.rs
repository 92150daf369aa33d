/// Retargets the decoder at another RefId; followed by a varuint RefId.
pub const SWITCH_TO_STRUCTURE: u8 = 0xff;

/// Precedes an inline server type id on polymorphic record fields.
pub const TYPE_ID: u8 = 0xd5;

/// Wire operation kinds. For structured-record targets the operation lives
/// in the top two bits of the opcode byte, the field index in the low six;
/// collection targets use the whole byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    Replace = 0,
    Clear = 10,
    Delete = 64,
    DeleteAndMove = 96,
    Add = 128,
    DeleteAndAdd = 192,
}

impl Operation {
    /// The full-byte form used by collection targets.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Replace),
            10 => Some(Self::Clear),
            64 => Some(Self::Delete),
            96 => Some(Self::DeleteAndMove),
            128 => Some(Self::Add),
            192 => Some(Self::DeleteAndAdd),
            _ => None,
        }
    }

    /// The packed form used by record targets: operation in the top two
    /// bits, field index in the low six.
    pub fn unpack_record_op(byte: u8) -> (Self, u8) {
        let operation = match byte & 0xc0 {
            0x40 => Self::Delete,
            0x80 => Self::Add,
            0xc0 => Self::DeleteAndAdd,
            _ => Self::Replace,
        };
        (operation, byte & 0x3f)
    }

    /// Whether a value payload follows the target addressing.
    pub fn carries_value(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Replace | Self::DeleteAndAdd | Self::DeleteAndMove
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Operation;

    #[test]
    fn record_opcode_packing() {
        assert_eq!(
            Operation::unpack_record_op(0x00),
            (Operation::Replace, 0)
        );
        assert_eq!(Operation::unpack_record_op(0x41), (Operation::Delete, 1));
        assert_eq!(Operation::unpack_record_op(0xbf), (Operation::Add, 63));
        assert_eq!(
            Operation::unpack_record_op(0xc2),
            (Operation::DeleteAndAdd, 2)
        );
    }

    #[test]
    fn collection_opcodes() {
        assert_eq!(Operation::from_byte(96), Some(Operation::DeleteAndMove));
        assert_eq!(Operation::from_byte(10), Some(Operation::Clear));
        assert_eq!(Operation::from_byte(1), None);
        assert_eq!(Operation::from_byte(200), None);
    }
}
