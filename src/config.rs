use crate::{CanBitRate, FrameEncoding, SerialBaud};

/// Static settings of a bridge. Everything the host can change at runtime
/// lives in persisted storage instead; the rates here are only written when
/// the storage is found blank.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Reported by `ATI`
    pub identification: &'static str,
    /// Encoding used for tunneled frames until `AT+B`/`AT+H` selects another
    pub encoding: FrameEncoding,
    pub serial_baud: SerialBaud,
    pub can_rate: CanBitRate,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            identification: "Serial CAN V2.0",
            encoding: FrameEncoding::Hex,
            serial_baud: SerialBaud::DEFAULT,
            can_rate: CanBitRate::DEFAULT,
        }
    }
}
