//! Byte-at-a-time serialization of 32-bit words, most significant byte first.
//!
//! The accessor receives the byte index within the word (`0..4`), so the same
//! codec serves random-access storage (`base + index`) and sequential sinks
//! like the serial transport (index ignored).

pub const WORD_SIZE: usize = core::mem::size_of::<u32>();

pub fn read_word(mut read: impl FnMut(usize) -> u8) -> u32 {
    (0..WORD_SIZE).fold(0, |word, index| (word << 8) | read(index) as u32)
}

pub fn write_word(value: u32, mut write: impl FnMut(usize, u8)) {
    for (index, byte) in value.to_be_bytes().into_iter().enumerate() {
        write(index, byte);
    }
}
