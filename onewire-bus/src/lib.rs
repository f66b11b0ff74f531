#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # onewire-bus
//! A no-std protocol core for the Dallas/Maxim 1-Wire bus.
//!
//! This crate provides a trait-based interface for 1-Wire bus masters, allowing the
//! protocol layers to run on top of any concrete line driver.
//! The [OneWire] trait defines the operations a master must supply, such as resetting
//! the bus, writing and reading bytes, and writing and reading single bits; ROM
//! addressing and buffer transfers are provided on top of them.
//!
//! The crate also provides the device enumeration algorithm in [OneWireSearch], the
//! Maxim checksum accumulators [MaximCrc8] and [MaximCrc16], and a checksum-validated
//! application request layer with bounded retry in [OneWireRequest].

mod consts;
mod crc;
mod error;
mod request;
mod rom;
mod search;
mod traits;
pub use consts::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SEARCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD,
};
pub use crc::{MaximCrc8, MaximCrc16};
pub use error::OneWireError;
pub use request::{OneWireRequest, REQUEST_MAX_RETRIES, RequestFlags};
pub use rom::{RomId, RomList};
pub use search::OneWireSearch;
pub use traits::{OneWire, OneWireStatus};

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;
