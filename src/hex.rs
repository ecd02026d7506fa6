use crate::FrameParseError;

/* Encoding */

pub fn to_hex_digit(value: u32) -> u8 {
    const HEX_LUT: &[u8] = "0123456789ABCDEF".as_bytes();

    HEX_LUT[(value & 0xF) as usize]
}

pub fn byte_to_hex(byte: u8) -> [u8; 2] {
    [to_hex_digit((byte >> 4) as u32), to_hex_digit(byte as u32)]
}

/// Writes `value` as uppercase hex without leading zeros into `buf`, returning
/// the used tail of the buffer. Zero is written as a single `0`.
pub fn u32_to_hex(value: u32, buf: &mut [u8; 8]) -> &[u8] {
    for (i, slot) in buf.iter_mut().enumerate() {
        *slot = to_hex_digit(value >> (28 - 4 * i as u32));
    }

    let leading = buf.iter().take(7).take_while(|b| **b == b'0').count();

    &buf[leading..]
}

/* Decoding */

pub fn hex_digit_to_u8(byte: u8) -> Result<u8, FrameParseError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => return Err(FrameParseError::IllegalHexDigit(byte)),
    })
}

pub fn dec_digit_to_u8(byte: u8) -> Result<u8, FrameParseError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        _ => return Err(FrameParseError::IllegalDecimalDigit(byte)),
    })
}

pub fn u8_from_hex_nibbles(hex_nibbles: &[u8; 2]) -> Result<u8, FrameParseError> {
    let msn = hex_digit_to_u8(hex_nibbles[0])?;
    let lsn = hex_digit_to_u8(hex_nibbles[1])?;

    Ok((msn << 4) | lsn)
}

/// Fills `out` from the leading `2 * out.len()` hex digits of `hex`. Anything
/// after those digits is ignored.
pub fn decode_hex(hex: &[u8], out: &mut [u8]) -> Result<(), FrameParseError> {
    let needed = out.len() * 2;

    if hex.len() < needed {
        return Err(FrameParseError::NotEnoughHexDigits(needed, hex.len()));
    }

    for (byte, pair) in out.iter_mut().zip(hex[..needed].chunks_exact(2)) {
        *byte = u8_from_hex_nibbles(&[pair[0], pair[1]])?;
    }

    Ok(())
}

/// Decodes 8 hex digits as a big-endian word.
pub fn u32_from_hex(hex: &[u8]) -> Result<u32, FrameParseError> {
    let mut bytes = [0u8; 4];
    decode_hex(hex, &mut bytes)?;

    Ok(u32::from_be_bytes(bytes))
}
