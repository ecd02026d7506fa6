use embedded_can::{ExtendedId, Id, StandardId};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    hex::{byte_to_hex, decode_hex, u32_from_hex, u32_to_hex, u8_from_hex_nibbles},
    word::{read_word, write_word, WORD_SIZE},
    Transport,
};

/// Wire length of one frame in binary mode: id (4) + frame type (1) + RTR (1) + data (8)
pub const BINARY_FRAME_LENGTH: usize = WORD_SIZE + 1 + 1 + 8;

/// Minimum wire length of one frame in hex mode (every binary byte as two digits)
pub const HEX_FRAME_LENGTH: usize = BINARY_FRAME_LENGTH * 2;

/// A classic CAN frame as carried over the serial link.
///
/// The payload is always stored as 8 bytes; bytes past the DLC are zero. Both
/// wire encodings transmit all 8 regardless of the DLC.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFrame {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: Id,
    remote: bool,
    dlc: usize,
    data: [u8; 8],
}

impl CanFrame {
    /// Creates a new data frame. `data` must have a length in the range 0..=8
    /// or else `None` will be returned instead.
    pub fn new_data(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }

        let mut copy = [0u8; 8];
        copy[..data.len()].copy_from_slice(data);

        Some(Self {
            id: id.into(),
            remote: false,
            dlc: data.len(),
            data: copy,
        })
    }

    /// Creates a new remote frame. `dlc` must be in the range 0..=8 or else
    /// `None` will be returned instead.
    pub fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }

        Some(Self {
            id: id.into(),
            remote: true,
            dlc,
            data: [0; 8],
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// The identifier without its standard/extended distinction
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self.id {
            Id::Standard(_) => FrameType::Standard,
            Id::Extended(_) => FrameType::Extended,
        }
    }

    pub fn dlc(&self) -> usize {
        self.dlc
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// The meaningful data bytes (empty for remote frames)
    pub fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc]
        }
    }

    /// All 8 payload bytes, zero padded past the DLC
    pub fn payload(&self) -> &[u8; 8] {
        &self.data
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::new_data(id, data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        CanFrame::new_remote(id, dlc)
    }

    fn is_extended(&self) -> bool {
        self.frame_type() == FrameType::Extended
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameParseError {
    #[error("Received a binary frame of {0:?} bytes (expected 14)")]
    InvalidBinaryLength(usize),
    #[error("Expected at least {0:?} hex digits but got {1:?}")]
    NotEnoughHexDigits(usize, usize),
    #[error("Tried to decode a hex digit but it was out of range ({0:?})")]
    IllegalHexDigit(u8),
    #[error("Tried to decode a decimal digit but it was out of range ({0:?})")]
    IllegalDecimalDigit(u8),
    #[error("Tried to decode frame type but it was invalid ({0:?})")]
    InvalidFrameType(u8),
    #[error("Tried to decode remote request flag but it was invalid ({0:?})")]
    InvalidRemoteFlag(u8),
    #[error("Received a CAN Standard ID ({0:?}) that was out of the valid range (0..=0x7FF)")]
    StandardIdOutOfRange(u32),
    #[error("Received a CAN Extended ID ({0:?}) that was out of the valid range (0..=0x1FFFFFFF)")]
    ExtendedIdOutOfRange(u32),
}

/// Identifier width of a frame, also stored with every mask and filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = FrameParseError, constructor = FrameParseError::InvalidFrameType))]
#[repr(u8)]
pub enum FrameType {
    /// 11-bit identifier
    #[default]
    Standard = 0,
    /// 29-bit identifier
    Extended = 1,
}

impl FrameType {
    pub fn id_from_raw(self, raw: u32) -> Result<Id, FrameParseError> {
        match self {
            Self::Standard => u16::try_from(raw)
                .ok()
                .and_then(StandardId::new)
                .map(Id::Standard)
                .ok_or(FrameParseError::StandardIdOutOfRange(raw)),
            Self::Extended => ExtendedId::new(raw)
                .map(Id::Extended)
                .ok_or(FrameParseError::ExtendedIdOutOfRange(raw)),
        }
    }
}

fn remote_flag(byte: u8) -> Result<bool, FrameParseError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(FrameParseError::InvalidRemoteFlag(byte)),
    }
}

fn build_frame(
    raw_id: u32,
    frame_type: u8,
    remote: u8,
    data: &[u8; 8],
) -> Result<CanFrame, FrameParseError> {
    let frame_type = FrameType::try_from(frame_type)?;
    let remote = remote_flag(remote)?;
    let id = frame_type.id_from_raw(raw_id)?;

    // Both constructors only fail past 8 bytes, which the wire layout rules out
    let frame = if remote {
        CanFrame::new_remote(id, 8)
    } else {
        CanFrame::new_data(id, data)
    };

    frame.ok_or(FrameParseError::InvalidBinaryLength(data.len()))
}

/// How frames are laid out on the serial link while tunneling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameEncoding {
    /// Raw bytes: `id[4] type[1] rtr[1] data[8]`
    Binary,
    /// The binary layout spelled out as hex digits
    #[default]
    Hex,
}

impl FrameEncoding {
    /// Parses one host line (terminator already stripped) into a frame bound
    /// for the bus.
    pub fn decode(self, line: &[u8]) -> Result<CanFrame, FrameParseError> {
        match self {
            Self::Binary => {
                if line.len() != BINARY_FRAME_LENGTH {
                    return Err(FrameParseError::InvalidBinaryLength(line.len()));
                }

                let raw_id = read_word(|index| line[index]);
                let mut data = [0u8; 8];
                data.copy_from_slice(&line[WORD_SIZE + 2..]);

                build_frame(raw_id, line[WORD_SIZE], line[WORD_SIZE + 1], &data)
            }
            Self::Hex => {
                if line.len() < HEX_FRAME_LENGTH {
                    return Err(FrameParseError::NotEnoughHexDigits(
                        HEX_FRAME_LENGTH,
                        line.len(),
                    ));
                }

                let raw_id = u32_from_hex(&line[..8])?;
                let frame_type = u8_from_hex_nibbles(&[line[8], line[9]])?;
                let remote = u8_from_hex_nibbles(&[line[10], line[11]])?;
                let mut data = [0u8; 8];
                decode_hex(&line[12..HEX_FRAME_LENGTH], &mut data)?;

                build_frame(raw_id, frame_type, remote, &data)
            }
        }
    }

    /// Writes a frame received from the bus to the host.
    pub fn encode<T: Transport>(self, frame: &CanFrame, transport: &mut T) {
        match self {
            Self::Binary => {
                write_word(frame.raw_id(), |_, byte| transport.write_byte(byte));
                transport.write_all(frame.payload());
            }
            Self::Hex => {
                let mut id_buf = [0u8; 8];
                transport.write_all(u32_to_hex(frame.raw_id(), &mut id_buf));

                for byte in frame.payload() {
                    transport.write_all(&byte_to_hex(*byte));
                }

                transport.write_all(b"\r\n");
            }
        }
    }
}
