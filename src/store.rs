//! Persisted configuration, laid out at fixed storage offsets.
//!
//! ```text
//! 0        initialized marker
//! 1        serial baud divisor (baud / 1200)
//! 2        CAN bit rate index
//! 10, 20   mask 0..=1 records
//! 30..=80  filter 0..=5 records
//! ```
//!
//! Every record takes [`RECORD_STRIDE`] bytes: frame type, then the 4-byte
//! value MSB first, then padding.

use crate::{
    word::{read_word, write_word, WORD_SIZE},
    BridgeConfig, CanBus, CommandError, FrameType, Storage,
};

const ADDR_INITIALIZED: usize = 0;
const ADDR_SERIAL_DIVISOR: usize = 1;
const ADDR_CAN_RATE: usize = 2;
const ADDR_MASK_BASE: usize = 10;
const ADDR_FILTER_BASE: usize = 30;

const INITIALIZED_MARKER: u8 = 0xA5;

pub const RECORD_STRIDE: usize = 10;

/// Bytes of a record that carry data: the type byte and the word
pub const RECORD_SIZE: usize = 1 + WORD_SIZE;

pub const MASK_COUNT: u8 = 2;
pub const FILTER_COUNT: u8 = 6;

/// Bit rates in kbit/s, addressed by their persisted index
pub const CAN_RATES_KBPS: [u16; 19] = [
    0, 5, 10, 20, 25, 31, 33, 40, 50, 80, 83, 95, 100, 125, 200, 250, 500, 666, 1000,
];

pub const SERIAL_BAUD_DIVISOR: u32 = 1200;
pub const MAX_SERIAL_BAUD: u32 = 115_200;

/// An index into [`CAN_RATES_KBPS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanBitRate(u8);

impl CanBitRate {
    /// 500 kbit/s
    pub const DEFAULT: Self = Self(16);

    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < CAN_RATES_KBPS.len() {
            Some(Self(index))
        } else {
            None
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn kbps(self) -> u16 {
        CAN_RATES_KBPS[self.0 as usize]
    }
}

/// A serial baud rate that is a positive multiple of 1200 up to 115200
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialBaud(u8);

impl SerialBaud {
    /// 115200 baud
    pub const DEFAULT: Self = Self(96);

    pub fn from_baud(baud: u32) -> Result<Self, CommandError> {
        if baud == 0 || baud % SERIAL_BAUD_DIVISOR != 0 || baud > MAX_SERIAL_BAUD {
            return Err(CommandError::OutOfRange);
        }

        Ok(Self((baud / SERIAL_BAUD_DIVISOR) as u8))
    }

    pub fn from_divisor(divisor: u8) -> Option<Self> {
        Self::from_baud(divisor as u32 * SERIAL_BAUD_DIVISOR).ok()
    }

    pub fn divisor(self) -> u8 {
        self.0
    }

    pub fn baud(self) -> u32 {
        self.0 as u32 * SERIAL_BAUD_DIVISOR
    }
}

/// One acceptance mask or filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcceptanceRecord {
    pub frame_type: FrameType,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    Mask(u8),
    Filter(u8),
}

impl Slot {
    pub fn mask(index: u8) -> Result<Self, CommandError> {
        if index < MASK_COUNT {
            Ok(Self::Mask(index))
        } else {
            Err(CommandError::OutOfRange)
        }
    }

    pub fn filter(index: u8) -> Result<Self, CommandError> {
        if index < FILTER_COUNT {
            Ok(Self::Filter(index))
        } else {
            Err(CommandError::OutOfRange)
        }
    }

    /// Both masks, then all six filters
    pub fn all() -> impl Iterator<Item = Self> {
        (0..MASK_COUNT)
            .map(Self::Mask)
            .chain((0..FILTER_COUNT).map(Self::Filter))
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Mask(index) | Self::Filter(index) => index,
        }
    }

    /// Label used when the slot is reported to the host
    pub fn label(self) -> &'static str {
        match self {
            Self::Mask(_) => "Mask",
            Self::Filter(_) => "Filt",
        }
    }

    fn address(self) -> usize {
        match self {
            Self::Mask(index) => ADDR_MASK_BASE + index as usize * RECORD_STRIDE,
            Self::Filter(index) => ADDR_FILTER_BASE + index as usize * RECORD_STRIDE,
        }
    }

    /// Pushes `record` into the matching acceptance register of the controller.
    pub fn program<C: CanBus>(
        self,
        can: &mut C,
        record: AcceptanceRecord,
    ) -> Result<(), C::Error> {
        match self {
            Self::Mask(index) => can.program_mask(index, record.frame_type, record.value),
            Self::Filter(index) => can.program_filter(index, record.frame_type, record.value),
        }
    }
}

/// Typed view over the raw storage capability
pub struct ConfigStore<'a, S> {
    storage: &'a mut S,
}

impl<'a, S: Storage> ConfigStore<'a, S> {
    pub fn new(storage: &'a mut S) -> Self {
        Self { storage }
    }

    pub fn is_initialized(&mut self) -> bool {
        self.storage.read_byte(ADDR_INITIALIZED) == INITIALIZED_MARKER
    }

    /// Writes factory defaults and marks the storage as initialized.
    pub fn load_defaults(&mut self, config: &BridgeConfig) {
        self.set_serial_baud(config.serial_baud);
        self.set_can_rate(config.can_rate);

        for slot in Slot::all() {
            self.set_record(slot, AcceptanceRecord::default());
        }

        self.storage.write_byte(ADDR_INITIALIZED, INITIALIZED_MARKER);
    }

    /// `None` if the stored divisor does not describe a valid baud rate
    pub fn serial_baud(&mut self) -> Option<SerialBaud> {
        SerialBaud::from_divisor(self.storage.read_byte(ADDR_SERIAL_DIVISOR))
    }

    pub fn set_serial_baud(&mut self, baud: SerialBaud) {
        self.storage.write_byte(ADDR_SERIAL_DIVISOR, baud.divisor());
    }

    /// `None` if the stored index is past the end of the rate table
    pub fn can_rate(&mut self) -> Option<CanBitRate> {
        CanBitRate::from_index(self.storage.read_byte(ADDR_CAN_RATE))
    }

    pub fn set_can_rate(&mut self, rate: CanBitRate) {
        self.storage.write_byte(ADDR_CAN_RATE, rate.index());
    }

    pub fn record(&mut self, slot: Slot) -> Result<AcceptanceRecord, CommandError> {
        let base = slot.address();
        let frame_type = FrameType::try_from(self.storage.read_byte(base))
            .map_err(|_| CommandError::OutOfRange)?;

        let storage = &mut *self.storage;
        let value = read_word(|index| storage.read_byte(base + 1 + index));

        Ok(AcceptanceRecord { frame_type, value })
    }

    pub fn set_record(&mut self, slot: Slot, record: AcceptanceRecord) {
        let base = slot.address();
        self.storage.write_byte(base, record.frame_type.into());

        let storage = &mut *self.storage;
        write_word(record.value, |index, byte| {
            storage.write_byte(base + 1 + index, byte)
        });
    }

    /// The record's bytes as stored, valid or not
    pub fn raw_record(&mut self, slot: Slot) -> [u8; RECORD_SIZE] {
        let base = slot.address();
        let mut raw = [0; RECORD_SIZE];
        for (offset, byte) in raw.iter_mut().enumerate() {
            *byte = self.storage.read_byte(base + offset);
        }
        raw
    }

    pub fn set_raw_record(&mut self, slot: Slot, raw: &[u8; RECORD_SIZE]) {
        let base = slot.address();
        for (offset, byte) in raw.iter().enumerate() {
            self.storage.write_byte(base + offset, *byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStorage;

    #[test]
    fn rate_table() {
        assert_eq!(CanBitRate::from_index(0).map(CanBitRate::kbps), Some(0));
        assert_eq!(CanBitRate::from_index(16).map(CanBitRate::kbps), Some(500));
        assert_eq!(CanBitRate::from_index(18).map(CanBitRate::kbps), Some(1000));
        assert_eq!(CanBitRate::from_index(19), None);
    }

    #[test]
    fn serial_baud_bounds() {
        assert_eq!(SerialBaud::from_baud(9600).map(SerialBaud::divisor), Ok(8));
        assert_eq!(SerialBaud::from_baud(115_200).map(SerialBaud::divisor), Ok(96));
        assert_eq!(SerialBaud::from_baud(1200).map(SerialBaud::baud), Ok(1200));
        assert_eq!(SerialBaud::from_baud(0), Err(CommandError::OutOfRange));
        assert_eq!(SerialBaud::from_baud(1199), Err(CommandError::OutOfRange));
        assert_eq!(SerialBaud::from_baud(115_201), Err(CommandError::OutOfRange));
        assert_eq!(SerialBaud::from_baud(116_400), Err(CommandError::OutOfRange));
        assert_eq!(SerialBaud::from_divisor(0xFF), None);
    }

    #[test]
    fn slots() {
        assert_eq!(Slot::mask(1), Ok(Slot::Mask(1)));
        assert_eq!(Slot::mask(2), Err(CommandError::OutOfRange));
        assert_eq!(Slot::filter(5), Ok(Slot::Filter(5)));
        assert_eq!(Slot::filter(6), Err(CommandError::OutOfRange));
        assert_eq!(Slot::all().count(), 8);
        assert_eq!(Slot::Filter(5).address(), 80);
        assert_eq!(Slot::Mask(1).address(), 20);
    }

    #[test]
    fn layout_on_storage() {
        let mut storage = MockStorage::default();
        let mut store = ConfigStore::new(&mut storage);

        assert!(!store.is_initialized());
        assert_eq!(store.can_rate(), None);

        store.load_defaults(&BridgeConfig::default());
        assert!(store.is_initialized());

        store.set_record(
            Slot::Filter(2),
            AcceptanceRecord {
                frame_type: FrameType::Extended,
                value: 0x1234_5678,
            },
        );

        assert_eq!(
            store.record(Slot::Filter(2)),
            Ok(AcceptanceRecord {
                frame_type: FrameType::Extended,
                value: 0x1234_5678,
            })
        );
        assert_eq!(store.record(Slot::Filter(1)), Ok(AcceptanceRecord::default()));

        assert_eq!(storage.bytes[0], INITIALIZED_MARKER);
        assert_eq!(&storage.bytes[50..55], &[1, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&storage.bytes[55..60], &[0xFF; 5]);
    }

    #[test]
    fn corrupt_record_type() {
        let mut storage = MockStorage::default();
        let mut store = ConfigStore::new(&mut storage);

        assert_eq!(store.record(Slot::Mask(0)), Err(CommandError::OutOfRange));
    }

    #[test]
    fn raw_record_restores_corrupt_bytes() {
        let mut storage = MockStorage::default();
        let mut store = ConfigStore::new(&mut storage);

        let blank = store.raw_record(Slot::Filter(4));
        assert_eq!(blank, [0xFF; RECORD_SIZE]);

        store.set_record(Slot::Filter(4), AcceptanceRecord::default());
        assert_eq!(store.raw_record(Slot::Filter(4)), [0; RECORD_SIZE]);

        store.set_raw_record(Slot::Filter(4), &blank);
        assert_eq!(store.record(Slot::Filter(4)), Err(CommandError::OutOfRange));
        assert_eq!(&storage.bytes[70..80], &[0xFF; 10]);
    }
}
