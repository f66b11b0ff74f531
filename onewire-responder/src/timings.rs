/// Slave-side timing parameters, in microseconds.
///
/// The slave never initiates a slot; these values bound how long it follows
/// the master's lead before declaring the exchange dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaveTimings {
    /// Bound on the remainder of the master's reset pulse after the reset
    /// timer fired.
    pub reset_tail_us: u32,
    /// Pause between the reset release and the presence pulse.
    pub presence_delay_us: u32,
    /// Duration of the presence pulse.
    pub presence_low_us: u32,
    /// Window for the line to recover to high after a pulse or slot; a low
    /// line beyond it is a new reset pulse.
    pub recovery_us: u32,
    /// Bound on the wait for the master to open the next bit slot.
    pub slot_wait_us: u32,
    /// Delay from a slot's falling edge to the sample point.
    pub sample_delay_us: u32,
    /// Low time the slave holds when answering a 0.
    pub write_low_us: u32,
}

impl Default for SlaveTimings {
    fn default() -> Self {
        Self {
            reset_tail_us: 400,
            presence_delay_us: 20,
            presence_low_us: 120,
            recovery_us: 250,
            slot_wait_us: 10_000,
            sample_delay_us: 20,
            write_low_us: 20,
        }
    }
}
