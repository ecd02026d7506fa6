//! Recording fakes of the hardware capabilities for unit tests.

use heapless::{Deque, Vec};

use crate::{CanBitRate, CanBus, CanFrame, FrameType, Indicator, Storage, Transport};

#[derive(Debug, Default)]
pub struct MockTransport {
    input: Deque<u8, 512>,
    output: Vec<u8, 2048>,
    pub baud: Option<u32>,
    pub reject_baud: bool,
}

impl MockTransport {
    pub fn feed(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.input.push_back(*byte).unwrap();
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn available(&self) -> usize {
        self.input.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte).unwrap();
    }

    fn reconfigure(&mut self, baud: u32) -> Result<(), ()> {
        if self.reject_baud {
            return Err(());
        }

        self.baud = Some(baud);
        Ok(())
    }
}

/// 128 bytes of erased (0xFF) memory
#[derive(Debug)]
pub struct MockStorage {
    pub bytes: [u8; 128],
    pub writes: usize,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self {
            bytes: [0xFF; 128],
            writes: 0,
        }
    }
}

impl Storage for MockStorage {
    fn read_byte(&mut self, address: usize) -> u8 {
        self.bytes[address]
    }

    fn write_byte(&mut self, address: usize, byte: u8) {
        self.writes += 1;
        self.bytes[address] = byte;
    }
}

#[derive(Debug, Default)]
pub struct MockCan {
    pub rate: Option<CanBitRate>,
    pub reject_configure: bool,
    pub reject_program: bool,
    pub sent: Vec<CanFrame, 16>,
    pub inbound: Deque<CanFrame, 8>,
    pub masks: [Option<(FrameType, u32)>; 2],
    pub filters: [Option<(FrameType, u32)>; 6],
}

impl CanBus for MockCan {
    type Error = ();

    fn configure(&mut self, rate: CanBitRate) -> Result<(), ()> {
        if self.reject_configure {
            return Err(());
        }

        self.rate = Some(rate);
        Ok(())
    }

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), ()> {
        self.sent.push(frame.clone()).map_err(|_| ())
    }

    fn receive(&mut self) -> Option<CanFrame> {
        self.inbound.pop_front()
    }

    fn program_mask(&mut self, index: u8, frame_type: FrameType, value: u32) -> Result<(), ()> {
        if self.reject_program {
            return Err(());
        }

        self.masks[index as usize] = Some((frame_type, value));
        Ok(())
    }

    fn program_filter(&mut self, index: u8, frame_type: FrameType, value: u32) -> Result<(), ()> {
        if self.reject_program {
            return Err(());
        }

        self.filters[index as usize] = Some((frame_type, value));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockIndicator {
    pub on: bool,
    pub history: Vec<bool, 256>,
}

impl Indicator for MockIndicator {
    fn set(&mut self, on: bool) {
        self.on = on;
        let _ = self.history.push(on);
    }
}
