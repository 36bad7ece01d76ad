use crate::CAN_PAYLOAD_BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitRangeError {
    #[error("Tried to extract a bit field with a width of zero")]
    ZeroWidth,
    #[error("Bit field starting at ({0:?}) with width ({1:?}) runs past the end of the payload")]
    OutOfRange(u8, u8),
}

/// Checks that `width` bits starting at `start` fit inside one CAN payload.
pub const fn check_range(start: u8, width: u8) -> Result<(), BitRangeError> {
    if width == 0 {
        return Err(BitRangeError::ZeroWidth);
    }

    if start as usize + width as usize > CAN_PAYLOAD_BITS {
        return Err(BitRangeError::OutOfRange(start, width));
    }

    Ok(())
}

/// Extracts an unsigned bit field from an 8 byte payload.
///
/// Bits are numbered from the most significant bit of byte 0 (bit 0) towards
/// the least significant bit of byte 7 (bit 63), and the field is read in that
/// order, so the first bit of the field ends up as its most significant bit.
pub fn extract_bits(data: &[u8; 8], start: u8, width: u8) -> Result<u64, BitRangeError> {
    check_range(start, width)?;

    let word = u64::from_be_bytes(*data);
    let shift = CAN_PAYLOAD_BITS - start as usize - width as usize;

    let mask = match width {
        64 => u64::MAX,
        _ => (1u64 << width) - 1,
    };

    Ok((word >> shift) & mask)
}
