//! Command constants for 1-Wire communication.

/// Command to match a specific ROM address in 1-Wire communication.
/// Selects exactly the device whose stored identifier equals the 64 bits
/// that follow; every other device drops off the bus until the next reset.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to skip ROM addressing in 1-Wire communication.
/// Addresses all devices on the bus simultaneously. Safe only when exactly
/// one device is present, or for broadcast writes.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;

/// Command to search for devices on the 1-Wire bus.
pub const ONEWIRE_SEARCH_ROM_CMD: u8 = 0xf0;

/// Command to read the ROM address of the single device on the bus.
/// On a multidrop bus the wired-AND of several responders yields garbage;
/// use the search instead.
pub const ONEWIRE_READ_ROM_CMD: u8 = 0x33;
