#![no_std]
#![deny(missing_docs)]

/*! # onewire-bitbang
 *
 * A bit-banged 1-Wire bus master over a single [`embedded-hal`](embedded_hal)
 * digital pin.
 *
 * The pin is expected to behave as an open-drain line with an external
 * pull-up: `set_low` drives the line, `set_high` releases it. Every timed
 * slot runs inside a [`critical_section`] so that a concurrently firing
 * interrupt cannot stretch a measured interval, and every wait for a line
 * transition is bounded; a wait window that expires reports
 * [`OneWireError::BusTiming`](onewire_bus::OneWireError) instead of hanging.
 */

pub use onewire_bus::{OneWire, OneWireError, OneWireResult};
mod master;
mod status;
mod timings;

pub use master::GpioMaster;
pub use status::LineStatus;
pub use timings::BusTimings;
