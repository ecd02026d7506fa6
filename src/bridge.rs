use crate::{
    capability::write_line, AcceptanceRecord, BridgeConfig, CanBus, Command, CommandError,
    ConfigStore, FrameEncoding, Indicator, LineBuffer, LineStatus, Slot, Storage, Transport,
    FILTER_COUNT, LINE_CAPACITY, MASK_COUNT,
};

/// How completed lines are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Lines are `AT` commands
    #[default]
    Settings,
    /// Lines are frames for the bus, except the `++` escape
    Data,
}

/// Failures while applying the persisted configuration at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    #[error("Transport refused the persisted baud rate ({0:?})")]
    SerialRejected(u32),
    #[error("CAN controller refused the persisted bit rate ({0:?} kbit/s)")]
    CanRateRejected(u16),
}

/// Outcome of a command that did not fail
enum Reply {
    Ok,
    /// Nothing is written, not even `OK`
    Silent,
}

/// The serial/CAN bridge controller.
///
/// Owns the hardware capabilities and all mutable state. Drive it by calling
/// [`Bridge::poll`] from the main loop.
pub struct Bridge<T, S, C, I> {
    config: BridgeConfig,
    mode: Mode,
    line: LineBuffer,
    encoding: FrameEncoding,
    transport: T,
    storage: S,
    can: C,
    indicator: I,
}

impl<T, S, C, I> Bridge<T, S, C, I>
where
    T: Transport,
    S: Storage,
    C: CanBus,
    I: Indicator,
{
    /// Creates a bridge in settings mode and applies the persisted serial and
    /// CAN configuration, writing factory defaults first if the storage is
    /// blank.
    pub fn new(
        config: BridgeConfig,
        transport: T,
        storage: S,
        can: C,
        indicator: I,
    ) -> Result<Self, BridgeError> {
        let mut bridge = Self {
            encoding: config.encoding,
            config,
            mode: Mode::Settings,
            line: LineBuffer::new(),
            transport,
            storage,
            can,
            indicator,
        };

        bridge.apply_persisted()?;
        bridge.indicator.set(true);

        Ok(bridge)
    }

    fn apply_persisted(&mut self) -> Result<(), BridgeError> {
        let mut store = ConfigStore::new(&mut self.storage);

        if !store.is_initialized() {
            info!("storage blank, writing factory defaults");
            store.load_defaults(&self.config);
        }

        let baud = store.serial_baud().unwrap_or_else(|| {
            warn!("persisted baud divisor invalid, using default");
            self.config.serial_baud
        });
        self.transport
            .reconfigure(baud.baud())
            .map_err(|_| BridgeError::SerialRejected(baud.baud()))?;

        let rate = store.can_rate().unwrap_or_else(|| {
            warn!("persisted CAN rate index invalid, using default");
            self.config.can_rate
        });
        self.can
            .configure(rate)
            .map_err(|_| BridgeError::CanRateRejected(rate.kbps()))?;

        for slot in Slot::all() {
            match store.record(slot) {
                Ok(record) => {
                    if slot.program(&mut self.can, record).is_err() {
                        warn!("CAN controller refused acceptance record {}", slot);
                    }
                }
                Err(_) => warn!("skipping corrupt acceptance record {}", slot),
            }
        }

        info!("bridge up at {} baud, {} kbit/s", baud.baud(), rate.kbps());

        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn encoding(&self) -> FrameEncoding {
        self.encoding
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn can(&self) -> &C {
        &self.can
    }

    pub fn can_mut(&mut self) -> &mut C {
        &mut self.can
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn into_parts(self) -> (T, S, C, I) {
        (self.transport, self.storage, self.can, self.indicator)
    }

    /// Runs one tick: consumes every byte the transport has ready, handling
    /// each completed line, then in data mode forwards at most one frame from
    /// the bus to the host.
    pub fn poll(&mut self) {
        while self.transport.available() > 0 {
            let Some(byte) = self.transport.read_byte() else {
                break;
            };

            match self.line.push(byte) {
                LineStatus::Continuing => {}
                LineStatus::Complete => {
                    self.process_line();
                    self.line.reset();
                }
                LineStatus::Overflow => {
                    self.process_overflow();
                    self.line.reset();
                }
            }
        }

        if self.mode == Mode::Data {
            if let Some(frame) = self.can.receive() {
                trace!("bus -> host {}", frame);
                self.encoding.encode(&frame, &mut self.transport);
            }
        }
    }

    fn process_line(&mut self) {
        // Stray terminators and single bytes are not lines
        if self.line.len() < 2 {
            return;
        }

        match self.mode {
            Mode::Data if self.line.line().starts_with(b"++") => {
                self.indicator.set(false);
                info!("leaving data mode");
                self.mode = Mode::Settings;
                self.respond(Ok(Reply::Ok));
            }
            Mode::Data => self.forward_frame(),
            Mode::Settings => {
                self.indicator.set(false);
                let result = Command::from_line(self.line.line())
                    .and_then(|command| self.execute(command));
                self.respond(result);
            }
        }
    }

    fn process_overflow(&mut self) {
        warn!("line exceeded {} bytes", LINE_CAPACITY);

        // Data mode stays silent so the tunneled stream is not corrupted
        if self.mode == Mode::Settings {
            self.indicator.set(false);
            self.respond(Err(CommandError::Overflow));
        }
    }

    fn forward_frame(&mut self) {
        match self.encoding.decode(self.line.line()) {
            Ok(frame) => {
                trace!("host -> bus {}", frame);
                if self.can.transmit(&frame).is_err() {
                    debug!("CAN controller refused frame");
                }
            }
            Err(err) => debug!("dropping malformed frame: {}", err),
        }
    }

    fn respond(&mut self, result: Result<Reply, CommandError>) {
        match result {
            Ok(Reply::Ok) => {
                write_line(&mut self.transport, format_args!("OK"));
                self.indicator.set(true);
            }
            Ok(Reply::Silent) => {}
            Err(err) => {
                debug!("command rejected: {}", err);
                write_line(&mut self.transport, format_args!("ERROR"));
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<Reply, CommandError> {
        debug!("executing {}", command);

        match command {
            Command::Identify => {
                write_line(
                    &mut self.transport,
                    format_args!("{}", self.config.identification),
                );
            }
            Command::GoOnline => {
                info!("entering data mode");
                self.mode = Mode::Data;
                return Ok(Reply::Silent);
            }
            Command::SelectEncoding(encoding) => {
                self.encoding = encoding;
                let name = match encoding {
                    FrameEncoding::Binary => "Binary",
                    FrameEncoding::Hex => "Hex",
                };
                write_line(&mut self.transport, format_args!("{} mode selected.", name));
            }
            Command::QueryCanRate => {
                let rate = ConfigStore::new(&mut self.storage)
                    .can_rate()
                    .ok_or(CommandError::OutOfRange)?;
                write_line(&mut self.transport, format_args!("Rate: {}", rate.kbps()));
            }
            Command::SetCanRate(rate) => {
                self.can
                    .configure(rate)
                    .map_err(|_| CommandError::HardwareRejected)?;
                ConfigStore::new(&mut self.storage).set_can_rate(rate);
            }
            Command::QueryMasks => self.report_records((0..MASK_COUNT).map(Slot::Mask))?,
            Command::QueryFilters => self.report_records((0..FILTER_COUNT).map(Slot::Filter))?,
            Command::SetAcceptance(slot, record) => {
                let mut store = ConfigStore::new(&mut self.storage);
                let previous = store.raw_record(slot);
                store.set_record(slot, record);

                // Program exactly what storage holds
                let programmed = store.record(slot).and_then(|stored| {
                    slot.program(&mut self.can, stored)
                        .map(|()| stored)
                        .map_err(|_| CommandError::HardwareRejected)
                });

                let stored = match programmed {
                    Ok(stored) => stored,
                    Err(err) => {
                        warn!("restoring {} after rejected update", slot);
                        store.set_raw_record(slot, &previous);
                        return Err(err);
                    }
                };

                self.report_record(slot, stored);
            }
            Command::QuerySerialBaud => {
                let baud = ConfigStore::new(&mut self.storage)
                    .serial_baud()
                    .ok_or(CommandError::OutOfRange)?;
                write_line(&mut self.transport, format_args!("Baud: {}", baud.baud()));
            }
            Command::SetSerialBaud(baud) => {
                self.transport
                    .reconfigure(baud.baud())
                    .map_err(|_| CommandError::HardwareRejected)?;
                ConfigStore::new(&mut self.storage).set_serial_baud(baud);
            }
        }

        Ok(Reply::Ok)
    }

    /// Lists `slots`. Nothing is written if any of them is corrupt.
    fn report_records(
        &mut self,
        slots: impl Iterator<Item = Slot> + Clone,
    ) -> Result<(), CommandError> {
        let mut store = ConfigStore::new(&mut self.storage);
        for slot in slots.clone() {
            store.record(slot)?;
        }

        for slot in slots {
            let record = ConfigStore::new(&mut self.storage).record(slot)?;
            self.report_record(slot, record);
        }

        Ok(())
    }

    fn report_record(&mut self, slot: Slot, record: AcceptanceRecord) {
        write_line(
            &mut self.transport,
            format_args!(
                "{}{} - {}: 0x{:X}",
                slot.label(),
                slot.index(),
                u8::from(record.frame_type),
                record.value
            ),
        );
    }
}
