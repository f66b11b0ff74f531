use crate::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireError,
    OneWireResult, RomId,
};

/// Status of the bus as sampled by a reset/presence-detect cycle.
pub trait OneWireStatus {
    /// A device answered the reset with a presence pulse.
    fn presence(&self) -> bool;

    /// The line was still (or again) low immediately after the reset pulse
    /// was released, before the presence-detect window opened.
    fn shortcircuit(&self) -> bool;

    /// The idle logic level of the line, if the master can report it.
    fn logic_level(&self) -> Option<bool> {
        None
    }
}

/// Trait for 1-Wire bus masters.
///
/// This trait defines the basic operations required for 1-Wire communication,
/// such as resetting the bus, writing and reading bytes, and writing and
/// reading bits. Byte transfer is least-significant-bit first. Implementations
/// are expected to fail fast: once a slot misbehaves, the remaining bits of a
/// multi-bit transfer must not be clocked out.
pub trait OneWire {
    /// The status type returned by the reset operation.
    /// This type must implement the [OneWireStatus] trait.
    type Status: OneWireStatus;
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying hardware or
    /// communication.
    type BusError;

    /// Resets the 1-Wire bus and returns the status of the bus.
    ///
    /// # Errors
    /// This method returns an error if the reset operation fails.
    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError>;

    /// Writes a byte to the 1-Wire bus, least-significant bit first.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus, least-significant bit first.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError>;

    /// Writes a single bit to the 1-Wire bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Reads a single bit from the 1-Wire bus.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Writes a sequence of bytes to the bus, stopping at the first failed
    /// slot.
    fn write_bytes(&mut self, bytes: &[u8]) -> OneWireResult<(), Self::BusError> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Fills `buf` with bytes read from the bus, stopping at the first
    /// failed slot.
    fn read_bytes(&mut self, buf: &mut [u8]) -> OneWireResult<(), Self::BusError> {
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }

    /// Addresses devices on the 1-Wire bus.
    ///
    /// Resets the bus, then selects the device whose identifier equals `rom`
    /// (Match-ROM), or every device at once when `rom` is [`None`]
    /// (Skip-ROM). A read operation after a [`None`] address on a bus with
    /// multiple devices returns the wired-AND of all their answers.
    fn address(&mut self, rom: Option<&RomId>) -> OneWireResult<(), Self::BusError> {
        let cmd = if rom.is_some() {
            ONEWIRE_MATCH_ROM_CMD
        } else {
            ONEWIRE_SKIP_ROM_CMD
        };
        self.reset()?;
        self.write_byte(cmd)?;
        if let Some(rom) = rom {
            self.write_bytes(rom.as_bytes())?;
        }
        Ok(())
    }

    /// Resets the bus and selects exactly the device with identifier `rom`.
    fn match_rom(&mut self, rom: &RomId) -> OneWireResult<(), Self::BusError> {
        self.address(Some(rom))
    }

    /// Resets the bus and addresses all devices simultaneously.
    fn skip_rom(&mut self) -> OneWireResult<(), Self::BusError> {
        self.address(None)
    }

    /// Reads the identifier of the single device on the bus.
    ///
    /// # Errors
    /// Returns [`OneWireError::NoDevicePresent`] if the reset detects no
    /// presence pulse.
    fn read_rom(&mut self) -> OneWireResult<RomId, Self::BusError> {
        let status = self.reset()?;
        if !status.presence() {
            return Err(OneWireError::NoDevicePresent);
        }
        self.write_byte(ONEWIRE_READ_ROM_CMD)?;
        let mut bytes = [0u8; 8];
        self.read_bytes(&mut bytes)?;
        Ok(RomId::new(bytes))
    }

    /// Actively drives the line high to source current for power-hungry
    /// device operations. The caller is responsible for restoring the normal
    /// idle state (released line) afterwards.
    fn drive_strong(&mut self) -> OneWireResult<(), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }

    /// Opens a bus-held transaction: waits for a quiet bus, then holds it so
    /// no other controller can start an exchange between the steps of a
    /// multi-request sequence.
    fn begin_transaction(&mut self) -> OneWireResult<(), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }

    /// Re-asserts the hold of an open transaction after an exchange.
    fn hold_transaction(&mut self) -> OneWireResult<(), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }

    /// Releases the bus, closing the current transaction.
    fn end_transaction(&mut self) -> OneWireResult<(), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }
}
