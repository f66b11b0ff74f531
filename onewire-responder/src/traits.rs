use crate::SlaveLink;

/// A hardware timer armed at the minimum reset-pulse duration.
///
/// The platform wires its compare interrupt to
/// [`Responder::on_reset_timer`](crate::Responder::on_reset_timer).
/// Restarting an already running timer must not reset the elapsed count;
/// stopping must also clear it.
pub trait ResetTimer {
    /// Starts the timer.
    fn start(&mut self);

    /// Stops the timer and clears its count.
    fn stop(&mut self);
}

/// Application-side collaborator receiving the command byte of an accepted
/// transaction.
pub trait CommandHandler {
    /// Handles one application command. The exchange is still open: further
    /// reads and writes may be performed through `link`. Link errors should
    /// be propagated unchanged so that a reset pulse observed mid-command
    /// restarts reset handling.
    fn handle_command<L: SlaveLink>(&mut self, command: u8, link: &mut L) -> Result<(), L::Error>;
}
