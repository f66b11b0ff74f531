use crate::{ResponderError, SlaveTimings};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

/// Granularity of the bounded line-polling loops.
const POLL_INTERVAL_US: u32 = 2;

/// Byte and buffer transfer over an open slave transaction.
///
/// This is the surface a [`CommandHandler`](crate::CommandHandler) sees: the
/// device has been selected, the master is clocking slots, and the handler
/// may keep exchanging data for as long as the master keeps the transaction
/// alive. All transfer is least-significant-bit first.
pub trait SlaveLink {
    /// Error of the underlying transfer operations.
    type Error;

    /// Reads one byte transmitted by the master.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Answers the master's read slots with one byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Fills `buf` with bytes transmitted by the master.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Answers the master's read slots with a sequence of bytes.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Slot-level access to the line during a reset-triggered transaction.
pub(crate) struct Link<'a, P, D> {
    pin: &'a mut P,
    delay: &'a mut D,
    timings: &'a SlaveTimings,
}

impl<'a, P: InputPin + OutputPin, D: DelayNs> Link<'a, P, D> {
    pub(crate) fn new(pin: &'a mut P, delay: &'a mut D, timings: &'a SlaveTimings) -> Self {
        Link {
            pin,
            delay,
            timings,
        }
    }

    pub(crate) fn pause(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Polls until the line reads `high`, up to `timeout_us`. `Ok(false)`
    /// reports an expired window; only pin failures are errors.
    pub(crate) fn wait_for_level(
        &mut self,
        high: bool,
        timeout_us: u32,
    ) -> Result<bool, ResponderError<P::Error>> {
        let mut remaining = timeout_us;
        loop {
            if self.pin.is_high()? == high {
                return Ok(true);
            }
            if remaining < POLL_INTERVAL_US {
                return Ok(false);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            remaining -= POLL_INTERVAL_US;
        }
    }

    /// Drives the line low for `us`, then releases it.
    pub(crate) fn pulse_low(&mut self, us: u32) -> Result<(), ResponderError<P::Error>> {
        self.pin.set_low()?;
        self.delay.delay_us(us);
        self.pin.set_high()?;
        Ok(())
    }

    /// Receives one bit: waits for the master to open the slot, samples,
    /// and for a 0 waits out the master's hold.
    pub(crate) fn read_bit(&mut self) -> Result<bool, ResponderError<P::Error>> {
        if !self.wait_for_level(false, self.timings.slot_wait_us)? {
            return Err(ResponderError::Timeout);
        }
        self.delay.delay_us(self.timings.sample_delay_us);
        if self.pin.is_low()? {
            if !self.wait_for_level(true, self.timings.recovery_us)? {
                return Err(ResponderError::Reset);
            }
            Ok(false)
        } else {
            Ok(true)
        }
    }

    /// Answers one read slot of the master: holds the line low for a 0,
    /// leaves it released for a 1.
    pub(crate) fn write_bit(&mut self, bit: bool) -> Result<(), ResponderError<P::Error>> {
        if !self.wait_for_level(false, self.timings.slot_wait_us)? {
            return Err(ResponderError::Timeout);
        }
        if bit {
            self.delay.delay_us(self.timings.write_low_us);
        } else {
            self.pulse_low(self.timings.write_low_us)?;
        }
        if !self.wait_for_level(true, self.timings.recovery_us)? {
            return Err(ResponderError::Reset);
        }
        Ok(())
    }
}

impl<P: InputPin + OutputPin, D: DelayNs> SlaveLink for Link<'_, P, D> {
    type Error = ResponderError<P::Error>;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = 0;
        for position in 0..8 {
            if self.read_bit()? {
                byte |= 1 << position;
            }
        }
        Ok(byte)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(byte & 0x01 != 0)?;
            byte >>= 1;
        }
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        for byte in buf.iter_mut() {
            *byte = SlaveLink::read_byte(self)?;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        for &byte in bytes {
            SlaveLink::write_byte(self, byte)?;
        }
        Ok(())
    }
}
