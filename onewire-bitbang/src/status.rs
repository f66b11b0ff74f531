use bitfield_struct::bitfield;
use onewire_bus::OneWireStatus;

/// Outcome of a reset/presence-detect cycle on the line.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct LineStatus {
    /// A device pulled the line low during the presence-detect window.
    pub presence_detect: bool,
    /// The line was low again immediately after the reset release, before
    /// the presence-detect window opened. Either the line is shorted or a
    /// device is answering far too early; in both cases the sample taken
    /// later in the window would be meaningless.
    pub short_detect: bool,
    #[bits(6)]
    reserved: u8,
}

impl OneWireStatus for LineStatus {
    fn presence(&self) -> bool {
        self.presence_detect()
    }

    fn shortcircuit(&self) -> bool {
        self.short_detect()
    }
}
