use core::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    hex::{dec_digit_to_u8, u32_from_hex},
    AcceptanceRecord, CanBitRate, FrameEncoding, FrameParseError, FrameType, SerialBaud, Slot,
};

/// A fully validated settings-mode command. Parsing never touches storage or
/// hardware, so a rejected line leaves everything unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Identify,
    GoOnline,
    SelectEncoding(FrameEncoding),
    QueryCanRate,
    SetCanRate(CanBitRate),
    QueryFilters,
    QueryMasks,
    SetAcceptance(Slot, AcceptanceRecord),
    QuerySerialBaud,
    SetSerialBaud(SerialBaud),
}

/// The byte following `AT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = CommandError, constructor = CommandError::UnrecognizedCommand))]
#[repr(u8)]
pub enum CommandKind {
    Identify = b'I',
    GoOnline = b'O',
    Extended = b'+',
}

/// The byte following `AT+`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = CommandError, constructor = CommandError::UnrecognizedVerb))]
#[repr(u8)]
pub enum ExtendedVerb {
    Binary = b'B',
    Hex = b'H',
    CanRate = b'C',
    Filter = b'F',
    Mask = b'M',
    SerialBaud = b'S',
}

/// Everything that turns a settings-mode line into an `ERROR` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    #[error("Line does not start with AT")]
    NotACommand,
    #[error("Received AT without a command")]
    MissingCommand,
    #[error("Received a command with an unrecognized specifier ({0:?})")]
    UnrecognizedCommand(u8),
    #[error("Received an extended command with an unrecognized verb ({0:?})")]
    UnrecognizedVerb(u8),
    #[error("Argument is not a well formed number or record")]
    MalformedArgument,
    #[error("Argument is outside the accepted range")]
    OutOfRange,
    #[error("Hardware refused the new configuration")]
    HardwareRejected,
    #[error("Line exceeded the buffer capacity")]
    Overflow,
}

impl From<FrameParseError> for CommandError {
    fn from(err: FrameParseError) -> Self {
        match err {
            FrameParseError::InvalidFrameType(_) => Self::OutOfRange,
            _ => Self::MalformedArgument,
        }
    }
}

fn parse_decimal<T: FromStr>(args: &[u8]) -> Result<T, CommandError> {
    core::str::from_utf8(args)
        .map_err(|_| CommandError::MalformedArgument)?
        .parse()
        .map_err(|_| CommandError::MalformedArgument)
}

/// `<index digit><frame type digit><8 hex digits>`; hex digits past the eighth
/// are ignored.
fn parse_acceptance(
    args: &[u8],
    slot: fn(u8) -> Result<Slot, CommandError>,
) -> Result<Command, CommandError> {
    let [index, frame_type, value @ ..] = args else {
        return Err(CommandError::MalformedArgument);
    };

    let slot = slot(dec_digit_to_u8(*index)?)?;
    let frame_type = FrameType::try_from(dec_digit_to_u8(*frame_type)?)?;
    let value = u32_from_hex(value)?;

    Ok(Command::SetAcceptance(
        slot,
        AcceptanceRecord { frame_type, value },
    ))
}

impl Command {
    /// Parses a completed settings-mode line (terminator already stripped).
    /// Commands are case-insensitive and a trailing carriage return is
    /// ignored.
    pub fn from_line(line: &[u8]) -> Result<Self, CommandError> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        match line {
            [a, t, ..] if a.eq_ignore_ascii_case(&b'A') && t.eq_ignore_ascii_case(&b'T') => {}
            _ => return Err(CommandError::NotACommand),
        }

        let kind: CommandKind = line
            .get(2)
            .ok_or(CommandError::MissingCommand)?
            .to_ascii_uppercase()
            .try_into()?;

        match kind {
            CommandKind::Identify => Ok(Self::Identify),
            CommandKind::GoOnline => Ok(Self::GoOnline),
            CommandKind::Extended => Self::parse_extended(&line[3..]),
        }
    }

    /// `rest` starts at the verb. A `?` (or nothing) after the verb makes it a
    /// query; otherwise the argument follows, optionally introduced by `=`.
    fn parse_extended(rest: &[u8]) -> Result<Self, CommandError> {
        let verb: ExtendedVerb = rest
            .first()
            .ok_or(CommandError::MissingCommand)?
            .to_ascii_uppercase()
            .try_into()?;

        let is_query = matches!(rest.get(1), None | Some(b'?'));
        let args = &rest[1..];
        let args = args.strip_prefix(b"=").unwrap_or(args);

        Ok(match verb {
            ExtendedVerb::Binary => Self::SelectEncoding(FrameEncoding::Binary),
            ExtendedVerb::Hex => Self::SelectEncoding(FrameEncoding::Hex),
            ExtendedVerb::CanRate if is_query => Self::QueryCanRate,
            ExtendedVerb::CanRate => Self::SetCanRate(
                CanBitRate::from_index(
                    parse_decimal::<u32>(args)?
                        .try_into()
                        .map_err(|_| CommandError::OutOfRange)?,
                )
                .ok_or(CommandError::OutOfRange)?,
            ),
            ExtendedVerb::Filter if is_query => Self::QueryFilters,
            ExtendedVerb::Filter => parse_acceptance(args, Slot::filter)?,
            ExtendedVerb::Mask if is_query => Self::QueryMasks,
            ExtendedVerb::Mask => parse_acceptance(args, Slot::mask)?,
            ExtendedVerb::SerialBaud if is_query => Self::QuerySerialBaud,
            ExtendedVerb::SerialBaud => {
                Self::SetSerialBaud(SerialBaud::from_baud(parse_decimal(args)?)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(index: u8) -> CanBitRate {
        CanBitRate::from_index(index).unwrap()
    }

    #[test]
    fn basic_commands() {
        assert_eq!(Command::from_line(b"ATI"), Ok(Command::Identify));
        assert_eq!(Command::from_line(b"ati\r"), Ok(Command::Identify));
        assert_eq!(Command::from_line(b"AtO"), Ok(Command::GoOnline));
        assert_eq!(Command::from_line(b"AT"), Err(CommandError::MissingCommand));
        assert_eq!(Command::from_line(b"AT+"), Err(CommandError::MissingCommand));
        assert_eq!(
            Command::from_line(b"ATZ"),
            Err(CommandError::UnrecognizedCommand(b'Z'))
        );
        assert_eq!(Command::from_line(b"XYZ"), Err(CommandError::NotACommand));
        assert_eq!(Command::from_line(b"++"), Err(CommandError::NotACommand));
    }

    #[test]
    fn extended_verbs() {
        assert_eq!(
            Command::from_line(b"AT+B"),
            Ok(Command::SelectEncoding(FrameEncoding::Binary))
        );
        assert_eq!(
            Command::from_line(b"at+h"),
            Ok(Command::SelectEncoding(FrameEncoding::Hex))
        );
        assert_eq!(Command::from_line(b"AT+C"), Ok(Command::QueryCanRate));
        assert_eq!(Command::from_line(b"AT+C?"), Ok(Command::QueryCanRate));
        assert_eq!(Command::from_line(b"AT+F?\r"), Ok(Command::QueryFilters));
        assert_eq!(Command::from_line(b"AT+M?"), Ok(Command::QueryMasks));
        assert_eq!(Command::from_line(b"AT+S?"), Ok(Command::QuerySerialBaud));
        assert_eq!(
            Command::from_line(b"AT+X?"),
            Err(CommandError::UnrecognizedVerb(b'X'))
        );
    }

    #[test]
    fn can_rate_arguments() {
        assert_eq!(Command::from_line(b"AT+C=0"), Ok(Command::SetCanRate(rate(0))));
        assert_eq!(Command::from_line(b"AT+C=18\r"), Ok(Command::SetCanRate(rate(18))));
        assert_eq!(Command::from_line(b"AT+C16"), Ok(Command::SetCanRate(rate(16))));
        assert_eq!(Command::from_line(b"AT+C=19"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+C=300"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+C=-1"), Err(CommandError::MalformedArgument));
        assert_eq!(Command::from_line(b"AT+C=abc"), Err(CommandError::MalformedArgument));
        assert_eq!(Command::from_line(b"AT+C="), Err(CommandError::MalformedArgument));
    }

    #[test]
    fn serial_baud_arguments() {
        assert_eq!(
            Command::from_line(b"AT+S=9600"),
            Ok(Command::SetSerialBaud(SerialBaud::from_baud(9600).unwrap()))
        );
        assert_eq!(Command::from_line(b"AT+S=115201"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+S=1199"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+S=0"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+S=fast"), Err(CommandError::MalformedArgument));
    }

    #[test]
    fn acceptance_arguments() {
        assert_eq!(
            Command::from_line(b"AT+M=015DEADBEEF"),
            Ok(Command::SetAcceptance(
                Slot::Mask(0),
                AcceptanceRecord {
                    frame_type: FrameType::Extended,
                    value: 0x5DEA_DBEE,
                }
            ))
        );
        assert_eq!(
            Command::from_line(b"AT+F=50000007FF"),
            Ok(Command::SetAcceptance(
                Slot::Filter(5),
                AcceptanceRecord {
                    frame_type: FrameType::Standard,
                    value: 0x7FF,
                }
            ))
        );
        assert_eq!(Command::from_line(b"AT+M=2000000000"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+F=6000000000"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+F=0200000000"), Err(CommandError::OutOfRange));
        assert_eq!(Command::from_line(b"AT+F=0x00000000"), Err(CommandError::MalformedArgument));
        assert_eq!(Command::from_line(b"AT+F=010000000G"), Err(CommandError::MalformedArgument));
        assert_eq!(Command::from_line(b"AT+F=01000"), Err(CommandError::MalformedArgument));
        assert_eq!(Command::from_line(b"AT+F=0"), Err(CommandError::MalformedArgument));
    }
}
