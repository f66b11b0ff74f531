use crate::{BusTimings, LineStatus};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use onewire_bus::{OneWire, OneWireError, OneWireResult};

/// Granularity of the bounded line-polling loops.
const POLL_INTERVAL_US: u32 = 2;

/// A bit-banged 1-Wire bus master over a single GPIO line.
///
/// Takes ownership of a digital pin (implementing both
/// [`InputPin`](embedded_hal::digital::InputPin) and
/// [`OutputPin`](embedded_hal::digital::OutputPin)) and a timer object
/// implementing the [`DelayNs`](embedded_hal::delay::DelayNs) trait. The pin
/// must drive the line open-drain: `set_low` pulls the bus down, `set_high`
/// releases it to the external pull-up.
pub struct GpioMaster<P, D> {
    pub(crate) pin: P,
    pub(crate) delay: D,
    pub(crate) timings: BusTimings,
}

impl<P, D> GpioMaster<P, D> {
    /// Creates a new master on the given pin with default timings.
    pub fn new(pin: P, delay: D) -> Self {
        GpioMaster {
            pin,
            delay,
            timings: BusTimings::default(),
        }
    }

    /// Replaces the bus timing parameters.
    pub fn with_timings(mut self, timings: BusTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Releases the pin and delay provider.
    pub fn into_parts(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P: InputPin + OutputPin, D: DelayNs> GpioMaster<P, D> {
    /// Lets the pull-up (or another device) set the line level.
    fn release_bus(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()
    }

    /// Drives the line low.
    fn pull_bus_low(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }

    /// Releases the line and checks that nothing else is holding it down; a
    /// slot must start from an idle-high bus.
    fn expect_idle_high(&mut self) -> OneWireResult<(), P::Error> {
        self.release_bus()?;
        if self.pin.is_low()? {
            return Err(OneWireError::BusTiming);
        }
        Ok(())
    }

    /// Waits for the line to rise, then requires it to stay high for the
    /// remainder of the window: at most one low-to-high transition within
    /// `window_us`, ending high.
    fn settle_high(&mut self, window_us: u32) -> OneWireResult<(), P::Error> {
        let mut remaining = window_us;
        loop {
            if self.pin.is_high()? {
                break;
            }
            if remaining < POLL_INTERVAL_US {
                return Err(OneWireError::BusTiming);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            remaining -= POLL_INTERVAL_US;
        }
        while remaining >= POLL_INTERVAL_US {
            if self.pin.is_low()? {
                return Err(OneWireError::BusTiming);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            remaining -= POLL_INTERVAL_US;
        }
        Ok(())
    }

    /// Requires the line to be continuously high for the whole window.
    fn line_quiet_for(&mut self, window_us: u32) -> OneWireResult<(), P::Error> {
        let mut remaining = window_us;
        while remaining >= POLL_INTERVAL_US {
            if self.pin.is_low()? {
                return Err(OneWireError::BusTiming);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            remaining -= POLL_INTERVAL_US;
        }
        Ok(())
    }
}

impl<P: InputPin + OutputPin, D: DelayNs> OneWire for GpioMaster<P, D> {
    type Status = LineStatus;

    type BusError = P::Error;

    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
        let t = self.timings;
        critical_section::with(|_| {
            self.pull_bus_low()?;
            self.delay.delay_us(t.reset_low_us);
            self.release_bus()?;
            self.settle_high(t.reset_rise_us)?;
            let mut status = LineStatus::new();
            if self.pin.is_low()? {
                return Ok(status.with_short_detect(true));
            }
            self.delay.delay_us(t.presence_sample_us);
            if self.pin.is_low()? {
                status.set_presence_detect(true);
            }
            self.settle_high(t.presence_recovery_us)?;
            Ok(status)
        })
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        let t = self.timings;
        let (low_us, recovery_us) = if bit {
            (t.write_one_low_us, t.write_one_recovery_us)
        } else {
            (t.write_zero_low_us, t.write_zero_recovery_us)
        };
        critical_section::with(|_| {
            self.expect_idle_high()?;
            self.pull_bus_low()?;
            self.delay.delay_us(low_us);
            self.release_bus()?;
            self.settle_high(recovery_us)
        })
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        let t = self.timings;
        critical_section::with(|_| {
            self.expect_idle_high()?;
            self.pull_bus_low()?;
            self.delay.delay_us(t.read_low_us);
            self.release_bus()?;
            self.delay.delay_us(t.read_sample_us);
            let bit = self.pin.is_high()?;
            self.settle_high(t.read_recovery_us)?;
            Ok(bit)
        })
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(byte & 0x01 != 0)?;
            byte >>= 1;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        let mut byte = 0;
        for position in 0..8 {
            if self.read_bit()? {
                byte |= 1 << position;
            }
        }
        Ok(byte)
    }

    /// Drives the line high through the pin driver to source current for a
    /// power-hungry device operation. This needs a push-pull capable pin
    /// driver; on a pure open-drain configuration it degrades to releasing
    /// the bus.
    fn drive_strong(&mut self) -> OneWireResult<(), Self::BusError> {
        Ok(self.pin.set_high()?)
    }

    fn begin_transaction(&mut self) -> OneWireResult<(), Self::BusError> {
        let t = self.timings;
        for _ in 0..t.transaction_rounds {
            match self.line_quiet_for(t.transaction_idle_us) {
                Ok(()) => return self.hold_transaction(),
                Err(OneWireError::BusTiming) => self.delay.delay_us(t.transaction_retry_us),
                Err(error) => return Err(error),
            }
        }
        Err(OneWireError::BusTiming)
    }

    fn hold_transaction(&mut self) -> OneWireResult<(), Self::BusError> {
        Ok(self.pull_bus_low()?)
    }

    fn end_transaction(&mut self) -> OneWireResult<(), Self::BusError> {
        Ok(self.release_bus()?)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;
    use std::vec::Vec;

    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use onewire_bus::OneWireStatus;

    fn gets(count: u32, state: State) -> Vec<PinTransaction> {
        (0..count).map(|_| PinTransaction::get(state)).collect()
    }

    /// Samples consumed by a successful `settle_high`: `lows` polls before
    /// the rise, one rising sample, then the stay-high confirmation.
    fn settle_ok(lows: u32, window_us: u32) -> Vec<PinTransaction> {
        let mut txns = gets(lows, State::Low);
        let remaining = window_us - lows * POLL_INTERVAL_US;
        txns.push(PinTransaction::get(State::High));
        txns.extend(gets(remaining / POLL_INTERVAL_US, State::High));
        txns
    }

    /// Samples consumed by a `settle_high` whose window expires low.
    fn settle_expired(window_us: u32) -> Vec<PinTransaction> {
        gets(window_us / POLL_INTERVAL_US + 1, State::Low)
    }

    fn read_bit_txns(bit: bool) -> Vec<PinTransaction> {
        let mut txns = vec![
            PinTransaction::set(State::High),
            PinTransaction::get(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(if bit { State::High } else { State::Low }),
        ];
        txns.extend(settle_ok(if bit { 0 } else { 1 }, 45));
        txns
    }

    #[test]
    fn write_zero_slot_waveform() {
        let mut txns = vec![
            PinTransaction::set(State::High),
            PinTransaction::get(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        txns.extend(settle_ok(0, 30));
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        master.write_bit(false).unwrap();
        pin.done();
    }

    #[test]
    fn write_refuses_a_busy_line() {
        let txns = [
            PinTransaction::set(State::High),
            PinTransaction::get(State::Low),
        ];
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        assert!(matches!(
            master.write_bit(true),
            Err(OneWireError::BusTiming)
        ));
        pin.done();
    }

    #[test]
    fn read_byte_assembles_lsb_first() {
        let mut txns = Vec::new();
        for position in 0..8 {
            txns.extend(read_bit_txns(0xa5 & (1 << position) != 0));
        }
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        assert_eq!(master.read_byte().unwrap(), 0xa5);
        pin.done();
    }

    #[test]
    fn reset_detects_presence() {
        let mut txns = vec![
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        txns.extend(settle_ok(0, 7));
        txns.push(PinTransaction::get(State::High)); // not shorted
        txns.push(PinTransaction::get(State::Low)); // presence sample
        txns.extend(settle_ok(2, 420));
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        let status = master.reset().unwrap();
        assert!(status.presence());
        assert!(!status.shortcircuit());
        pin.done();
    }

    #[test]
    fn reset_without_responders_sees_no_presence() {
        let mut txns = vec![
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        txns.extend(settle_ok(0, 7));
        txns.push(PinTransaction::get(State::High));
        txns.push(PinTransaction::get(State::High));
        txns.extend(settle_ok(0, 420));
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        let status = master.reset().unwrap();
        assert!(!status.presence());
        pin.done();
    }

    #[test]
    fn reset_flags_an_early_low_as_short() {
        let mut txns = vec![
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        txns.extend(settle_ok(0, 7));
        txns.push(PinTransaction::get(State::Low));
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        let status = master.reset().unwrap();
        assert!(status.shortcircuit());
        pin.done();
    }

    #[test]
    fn stuck_low_line_fails_within_the_rise_window() {
        let mut txns = vec![
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];
        txns.extend(settle_expired(7));
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        assert!(matches!(master.reset(), Err(OneWireError::BusTiming)));
        pin.done();
    }

    #[test]
    fn transaction_opens_after_a_quiet_line_and_holds_it() {
        let mut txns = gets(500 / POLL_INTERVAL_US, State::High);
        txns.push(PinTransaction::set(State::Low));
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        master.begin_transaction().unwrap();
        pin.done();
    }

    #[test]
    fn transaction_opening_gives_up_on_a_noisy_line() {
        // Every round sees a low sample straight away.
        let txns = gets(8, State::Low);
        let mut pin = PinMock::new(&txns);
        let mut master = GpioMaster::new(pin.clone(), NoopDelay);
        assert!(matches!(
            master.begin_transaction(),
            Err(OneWireError::BusTiming)
        ));
        pin.done();
    }
}
