use heapless::Vec;

/// Bytes a single line may hold, terminator excluded
pub const LINE_CAPACITY: usize = 30;

const TERMINATOR: u8 = b'\n';
const ESCAPE: u8 = b'+';
const ESCAPE_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineStatus {
    /// More bytes are needed
    Continuing,
    /// [`LineBuffer::line`] holds a complete line
    Complete,
    /// The line outgrew the buffer. Reported once per overlong line; the rest
    /// of it is dropped up to the next terminator or escape.
    Overflow,
}

/// Accumulates host bytes into lines ended by `\n` or by the `+++` escape.
///
/// The terminator is never stored. For the escape the third `+` is dropped,
/// so the completed line ends in `++`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8, LINE_CAPACITY>,
    discarding: bool,
    escape_run: usize,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
            escape_run: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> LineStatus {
        if self.discarding {
            return self.discard(byte);
        }

        if byte == TERMINATOR {
            return LineStatus::Complete;
        }

        if self.buf.push(byte).is_err() {
            // The escape may straddle the end of the buffer
            let trailing = self.buf.iter().rev().take_while(|b| **b == ESCAPE).count();
            self.escape_run = if byte == ESCAPE { trailing } else { 0 };
            self.discarding = true;
            return match self.discard(byte) {
                LineStatus::Continuing => LineStatus::Overflow,
                status => status,
            };
        }

        if self.buf.ends_with(&[ESCAPE; ESCAPE_LENGTH]) {
            self.buf.pop();
            return LineStatus::Complete;
        }

        LineStatus::Continuing
    }

    /// Drops the tail of an overlong line. The escape sequence still gets
    /// through so a flooded data-mode session can always be left.
    fn discard(&mut self, byte: u8) -> LineStatus {
        if byte == TERMINATOR {
            self.discarding = false;
            self.escape_run = 0;
            return LineStatus::Continuing;
        }

        if byte != ESCAPE {
            self.escape_run = 0;
            return LineStatus::Continuing;
        }

        self.escape_run += 1;
        if self.escape_run < ESCAPE_LENGTH {
            return LineStatus::Continuing;
        }

        self.discarding = false;
        self.escape_run = 0;
        self.buf.clear();
        // Two bytes always fit into an empty buffer
        let _ = self.buf.extend_from_slice(&[ESCAPE; ESCAPE_LENGTH - 1]);

        LineStatus::Complete
    }

    /// The bytes of the current line
    pub fn line(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Starts a new line. Does not end the discarding of an overlong line.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}
