#![no_std]

/*! # onewire-responder
 *
 * The slave side of a 1-Wire bus on a plain GPIO pin.
 *
 * A responder cannot schedule anything: the master owns the bus timing, and
 * the device must notice a reset pulse whenever it arrives. Instead of
 * busy-watching the line, the responder is driven by two platform interrupt
 * callbacks:
 *
 * - an edge interrupt on the bus pin, forwarded to
 *   [`Responder::on_line_edge`]: a falling edge arms a hardware timer set to
 *   the minimum reset-pulse duration, a rising edge before the timer fires
 *   disarms it (the low pulse belonged to an exchange this device does not
 *   own, or was noise);
 * - the timer compare interrupt, forwarded to [`Responder::on_reset_timer`]:
 *   the line stayed low long enough to be a reset, so the responder answers
 *   with a presence pulse, runs ROM selection, and hands the application
 *   command byte to the [`CommandHandler`].
 *
 * Everything inside the reset handler runs with interrupts masked and every
 * wait is bounded: a wait that expires unwinds with
 * [`ResponderError::Timeout`], and a bus observed low where a bit boundary
 * expected it high is reinterpreted as the start of a new reset pulse
 * ([`ResponderError::Reset`]), which restarts reset handling from the top.
 */

mod error;
mod link;
mod timings;
mod traits;

pub use error::ResponderError;
pub use link::SlaveLink;
pub use timings::SlaveTimings;
pub use traits::{CommandHandler, ResetTimer};

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use link::Link;
use onewire_bus::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SEARCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD,
    RomId,
};

/// Protocol position of a [`Responder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    /// Bus idle, timer stopped.
    Idle,
    /// The line fell and the reset timer is running; a rising edge before it
    /// fires returns to [`ResponderState::Idle`].
    ResetWindow,
    /// Executing a reset-triggered transaction inside the timer interrupt.
    Responding,
}

/// Pin level change reported by the platform's edge interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// The bus line went low.
    Fell,
    /// The bus line went high.
    Rose,
}

/// A 1-Wire slave device on a single GPIO pin.
///
/// Owns the pin, a delay provider, the reset-detection timer and the device's
/// 8-byte ROM identifier. State transitions happen only inside the two
/// interrupt entry points, so ownership never crosses a concurrency boundary.
pub struct Responder<P, D, T> {
    pin: P,
    delay: D,
    timer: T,
    rom: RomId,
    timings: SlaveTimings,
    state: ResponderState,
}

impl<P, D, T> Responder<P, D, T> {
    /// Creates a responder with the given identifier and default timings.
    pub fn new(pin: P, delay: D, timer: T, rom: RomId) -> Self {
        Responder {
            pin,
            delay,
            timer,
            rom,
            timings: SlaveTimings::default(),
            state: ResponderState::Idle,
        }
    }

    /// Replaces the slot timing parameters.
    pub fn with_timings(mut self, timings: SlaveTimings) -> Self {
        self.timings = timings;
        self
    }

    /// The identifier this device answers to.
    pub const fn rom(&self) -> &RomId {
        &self.rom
    }

    /// Current protocol position.
    pub const fn state(&self) -> ResponderState {
        self.state
    }

    /// Releases the pin, delay provider and timer.
    pub fn into_parts(self) -> (P, D, T) {
        (self.pin, self.delay, self.timer)
    }
}

impl<P, D, T> Responder<P, D, T>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    T: ResetTimer,
{
    /// Feeds a pin level change from the platform's edge interrupt.
    pub fn on_line_edge(&mut self, event: LineEvent) {
        match (self.state, event) {
            (ResponderState::Idle, LineEvent::Fell) => {
                self.timer.start();
                self.state = ResponderState::ResetWindow;
            }
            (ResponderState::ResetWindow, LineEvent::Rose) => {
                self.timer.stop();
                self.state = ResponderState::Idle;
            }
            _ => {}
        }
    }

    /// Runs the reset-triggered transaction; call from the timer compare
    /// interrupt.
    ///
    /// While the line is still low a fresh reset pulse may begin at any
    /// point of the exchange; that restarts handling from the presence
    /// pulse instead of being treated as fatal.
    pub fn on_reset_timer<H: CommandHandler>(&mut self, handler: &mut H) {
        self.timer.stop();
        self.state = ResponderState::Responding;
        critical_section::with(|_| {
            loop {
                // The reset pulse must still be in progress; otherwise the
                // line recovered before this interrupt ran and the master has
                // moved on.
                if !matches!(self.pin.is_low(), Ok(true)) {
                    break;
                }
                match self.respond(handler) {
                    Err(ResponderError::Reset) => continue,
                    _ => break,
                }
            }
        });
        self.state = ResponderState::Idle;
    }

    /// One reset-to-command exchange.
    fn respond<H: CommandHandler>(
        &mut self,
        handler: &mut H,
    ) -> Result<(), ResponderError<P::Error>> {
        let rom = self.rom;
        let timings = self.timings;
        let mut link = Link::new(&mut self.pin, &mut self.delay, &self.timings);

        // Wait out the remainder of the master's reset pulse, then answer
        // with the presence pulse.
        if !link.wait_for_level(true, timings.reset_tail_us)? {
            return Err(ResponderError::Timeout);
        }
        link.pause(timings.presence_delay_us);
        link.pulse_low(timings.presence_low_us)?;
        if !link.wait_for_level(true, timings.recovery_us)? {
            return Err(ResponderError::Reset);
        }

        let rom_command = link.read_byte()?;
        if !Self::select(&mut link, &rom, rom_command)? {
            return Ok(());
        }
        let command = link.read_byte()?;
        handler.handle_command(command, &mut link)?;
        Ok(())
    }

    /// Executes one ROM command. Returns whether this device is selected
    /// and should go on to read the application command byte.
    fn select(
        link: &mut Link<'_, P, D>,
        rom: &RomId,
        command: u8,
    ) -> Result<bool, ResponderError<P::Error>> {
        match command {
            ONEWIRE_READ_ROM_CMD => {
                link.write_bytes(rom.as_bytes())?;
                Ok(false)
            }
            ONEWIRE_SKIP_ROM_CMD => Ok(true),
            ONEWIRE_MATCH_ROM_CMD => {
                for &expected in rom.as_bytes() {
                    if link.read_byte()? != expected {
                        // Not this device; stay silent for the rest of the
                        // exchange.
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ONEWIRE_SEARCH_ROM_CMD => {
                for position in 0..RomId::BITS {
                    let bit = rom.bit(position);
                    link.write_bit(bit)?;
                    link.write_bit(!bit)?;
                    // The master's direction choice follows every bit but
                    // the last; disagreement drops this device out of the
                    // remaining passes of the exchange.
                    if position != RomId::BITS - 1 && link.read_bit()? != bit {
                        return Ok(false);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}
