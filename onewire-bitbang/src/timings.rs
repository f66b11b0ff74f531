/// Bus timing parameters, all in microseconds.
///
/// The defaults are standard-speed values with generous margins; they assume
/// a pull-up strong enough to recover the line well inside a slot. Shared
/// buses with large capacitance may need longer recovery windows. Exact
/// sub-microsecond tuning is a platform concern and belongs in the delay
/// provider, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTimings {
    /// Duration of the reset pulse.
    pub reset_low_us: u32,
    /// Window for the line to recover to high after the reset release.
    pub reset_rise_us: u32,
    /// Delay from the reset release to the presence-detect sample.
    pub presence_sample_us: u32,
    /// Remainder of the presence-detect window; the line must recover to
    /// high within it.
    pub presence_recovery_us: u32,
    /// Low time of a write-0 slot.
    pub write_zero_low_us: u32,
    /// Recovery window closing a write-0 slot.
    pub write_zero_recovery_us: u32,
    /// Low time of a write-1 slot.
    pub write_one_low_us: u32,
    /// Recovery window closing a write-1 slot.
    pub write_one_recovery_us: u32,
    /// Low time opening a read slot.
    pub read_low_us: u32,
    /// Delay from the read-slot release to the sample point.
    pub read_sample_us: u32,
    /// Remainder of the read slot; the line must recover to high within it.
    pub read_recovery_us: u32,
    /// A transaction opens only once the line has been continuously high
    /// for this long.
    pub transaction_idle_us: u32,
    /// Pause between attempts to observe a quiet line.
    pub transaction_retry_us: u32,
    /// Number of quiet-line attempts before opening a transaction fails.
    pub transaction_rounds: u32,
}

impl Default for BusTimings {
    fn default() -> Self {
        Self {
            reset_low_us: 500,
            reset_rise_us: 7,
            presence_sample_us: 63,
            presence_recovery_us: 420,
            write_zero_low_us: 60,
            write_zero_recovery_us: 30,
            write_one_low_us: 10,
            write_one_recovery_us: 50,
            read_low_us: 2,
            read_sample_us: 13,
            read_recovery_us: 45,
            transaction_idle_us: 500,
            transaction_retry_us: 123,
            transaction_rounds: 8,
        }
    }
}
