use crate::{
    ONEWIRE_SEARCH_ROM_CMD, OneWire, OneWireError, OneWireStatus, RomId, RomList,
};

/// A structure for searching devices on a 1-Wire bus.
///
/// This structure implements the branch-recording search algorithm for
/// discovering every device sharing the bus. One pass over the 64 identifier
/// bits confirms one device; a bitmap of divergence positions (bits where
/// more than one still-participating device disagreed) records which
/// 1-branches remain unexplored, and each following pass deterministically
/// replays the path down to the highest unexplored divergence and takes it.
/// The whole search therefore costs O(devices × 64) bit slots and finds each
/// device exactly once.
///
/// The search state is scoped to one enumeration: create a fresh value per
/// search, call [`next`](OneWireSearch::next) until it returns `None` (or use
/// [`collect_all`](OneWireSearch::collect_all)), then drop it.
pub struct OneWireSearch<'a, T> {
    onewire: &'a mut T,
    /// Positions whose 1-branch has not been taken yet, one bit per ROM bit.
    diverged: u64,
    /// Replay boundary for the current pass: the divergence taken this pass.
    divergence: Option<u8>,
    /// Identifier confirmed by the previous pass; replayed below the boundary.
    previous: RomId,
    exhausted: bool,
}

impl<'a, T> OneWireSearch<'a, T> {
    /// Creates a new [`OneWireSearch`] instance.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the
    ///   [`OneWire`] trait.
    pub fn new(onewire: &'a mut T) -> Self {
        Self {
            onewire,
            diverged: 0,
            divergence: None,
            previous: RomId::default(),
            exhausted: false,
        }
    }
}

impl<T: OneWire> OneWireSearch<'_, T> {
    /// Runs one search pass and returns the identifier it confirmed.
    ///
    /// Returns `Ok(None)` once every branch has been explored; at that point
    /// the search is complete and the state should be dropped.
    ///
    /// # Errors
    /// * [`OneWireError::NoDevicePresent`] if the reset saw no presence pulse.
    /// * [`OneWireError::ShortCircuit`] if the reset saw the line held low.
    /// * [`OneWireError::ProtocolViolation`] if a bit slot read the
    ///   impossible (1, 1) complement pair: presence was detected but no
    ///   device answered the slot.
    ///
    /// Any error aborts the pass without recording a partial identifier.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<RomId>, OneWireError<T::BusError>> {
        if self.exhausted {
            return Ok(None);
        }
        let status = self.onewire.reset()?;
        if !status.presence() {
            return Err(OneWireError::NoDevicePresent);
        }
        if status.shortcircuit() {
            return Err(OneWireError::ShortCircuit);
        }
        self.onewire.write_byte(ONEWIRE_SEARCH_ROM_CMD)?;

        let mut rom = RomId::default();
        for position in 0..RomId::BITS {
            let id_bit = self.onewire.read_bit()?;
            let complement = self.onewire.read_bit()?;
            let direction = match self.divergence {
                // Below the replay boundary every device found so far agrees;
                // the two bits just read carry no new information.
                Some(boundary) if position < boundary => self.previous.bit(position),
                // The boundary itself: the previous pass took the 0-branch
                // here, this pass takes the 1-branch and retires the marker.
                Some(boundary) if position == boundary => {
                    self.diverged &= !(1u64 << position);
                    true
                }
                _ => match (id_bit, complement) {
                    (false, true) => false,
                    (true, false) => true,
                    // Both values present among the remaining devices: record
                    // the unexplored 1-branch and follow the 0-branch.
                    (false, false) => {
                        self.diverged |= 1u64 << position;
                        false
                    }
                    (true, true) => return Err(OneWireError::ProtocolViolation),
                },
            };
            rom.set_bit(position, direction);
            self.onewire.write_bit(direction)?;
        }

        self.previous = rom;
        // The highest still-marked position seeds the next pass.
        self.divergence = match 63u32.checked_sub(self.diverged.leading_zeros()) {
            Some(position) => Some(position as u8),
            None => {
                self.exhausted = true;
                None
            }
        };
        Ok(Some(rom))
    }

    /// Enumerates the whole bus into a fresh [`RomList`].
    ///
    /// # Errors
    /// In addition to the per-pass errors of [`next`](OneWireSearch::next),
    /// returns [`OneWireError::CapacityExceeded`] when more than `N` devices
    /// share the bus; the list is never silently truncated.
    pub fn collect_all<const N: usize>(
        &mut self,
    ) -> Result<RomList<N>, OneWireError<T::BusError>> {
        let mut list = RomList::new();
        while let Some(rom) = self.next()? {
            if !list.push(rom) {
                return Err(OneWireError::CapacityExceeded);
            }
        }
        Ok(list)
    }
}
