use crate::{MaximCrc8, MaximCrc16, OneWire, OneWireError, OneWireResult, RomId};
use bitfield_struct::bitfield;
use embedded_hal::delay::DelayNs;

/// Maximum number of times a failed request is retried when
/// [`RequestFlags::retry`] is set. The first attempt is not a retry, so a
/// request touches the bus at most `REQUEST_MAX_RETRIES + 1` times.
pub const REQUEST_MAX_RETRIES: u8 = 5;

/// Backoff grows by this much per failed attempt.
const RETRY_BACKOFF_MS: u32 = 2;

/// Ceiling on busy-poll read slots issued by
/// [`RequestFlags::read_until_set`]. At roughly 60 µs per slot this allows
/// several seconds of device busy time before the wait is declared dead.
const BUSY_POLL_SLOT_LIMIT: u32 = 100_000;

/// Per-request configuration bits. Flags compose independently.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct RequestFlags {
    /// The request length is counted in bits; the final partial byte is
    /// written bit-by-bit, least-significant bit first.
    pub length_in_bits: bool,
    /// The request runs as part of an open bus-held transaction: the hold is
    /// re-asserted after success and cycled around retries.
    pub transaction: bool,
    /// After the response, keep issuing read slots until a 1 bit is
    /// observed. Used to poll a device that signals busy by answering 0.
    pub read_until_set: bool,
    /// Expect the last response byte to be a Maxim CRC-8 of the bytes
    /// before it.
    pub expect_crc8: bool,
    /// Expect the last two response bytes to be a Maxim CRC-16 of the bytes
    /// before them, least-significant byte first.
    pub expect_crc16: bool,
    /// Retry the request on failure, up to [`REQUEST_MAX_RETRIES`] times.
    pub retry: bool,
    /// Consider the request failed if every response byte is 0xff.
    pub fail_all_ones: bool,
    /// The device stores its checksum bitwise-inverted; undo the inversion
    /// before validating.
    pub crc_inverted: bool,
}

/// One framed application exchange with a device: ROM selection, request
/// bytes out, response bytes in, then the integrity checks selected by
/// [`RequestFlags`].
///
/// Values are built up in the usual chained style:
///
/// `OneWireRequest::new(&[0xbe]).with_rom(rom).with_flags(flags)`
pub struct OneWireRequest<'a> {
    rom: Option<RomId>,
    flags: RequestFlags,
    payload: &'a [u8],
    payload_bits: Option<u16>,
}

impl<'a> OneWireRequest<'a> {
    /// Creates a request carrying `payload`, addressed to every device
    /// (Skip-ROM) with no flags set.
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            rom: None,
            flags: RequestFlags::new(),
            payload,
            payload_bits: None,
        }
    }

    /// Addresses the request to the device with this identifier (Match-ROM).
    pub fn with_rom(mut self, rom: RomId) -> Self {
        self.rom = Some(rom);
        self
    }

    /// Sets the request flags.
    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Gives the payload length in bits. Implies
    /// [`RequestFlags::length_in_bits`]; at most `payload.len() * 8` bits
    /// are sent.
    pub fn with_bit_length(mut self, bits: u16) -> Self {
        self.flags.set_length_in_bits(true);
        self.payload_bits = Some(bits);
        self
    }

    /// Executes the request, retrying per the flags, and fills `response`
    /// from the bus.
    ///
    /// # Errors
    /// After the retry budget is spent (or immediately, without
    /// [`RequestFlags::retry`]), the last failure is returned verbatim:
    /// a bus error from the master, [`OneWireError::ResponseAllOnes`], or
    /// [`OneWireError::InvalidCrc`].
    pub fn run<T: OneWire, D: DelayNs>(
        &self,
        bus: &mut T,
        delay: &mut D,
        response: &mut [u8],
    ) -> OneWireResult<(), T::BusError> {
        self.run_with(bus, delay, response, self.flags)
    }

    /// Executes the request inside a fresh bus-held transaction. The
    /// transaction is always closed, also when the request fails.
    pub fn run_in_transaction<T: OneWire, D: DelayNs>(
        &self,
        bus: &mut T,
        delay: &mut D,
        response: &mut [u8],
    ) -> OneWireResult<(), T::BusError> {
        if let Err(error) = bus.begin_transaction() {
            let _ = bus.end_transaction();
            return Err(error);
        }
        let result = self.run_with(bus, delay, response, self.flags.with_transaction(true));
        let closed = bus.end_transaction();
        result?;
        closed
    }

    fn run_with<T: OneWire, D: DelayNs>(
        &self,
        bus: &mut T,
        delay: &mut D,
        response: &mut [u8],
        flags: RequestFlags,
    ) -> OneWireResult<(), T::BusError> {
        let mut failures: u32 = 0;
        loop {
            match self.perform(bus, flags, response) {
                Ok(()) => {
                    if flags.transaction() {
                        bus.hold_transaction()?;
                    }
                    return Ok(());
                }
                Err(error) => {
                    failures += 1;
                    if !flags.retry() || failures > REQUEST_MAX_RETRIES as u32 {
                        return Err(error);
                    }
                    if flags.transaction() {
                        bus.end_transaction()?;
                    }
                    delay.delay_ms(failures * RETRY_BACKOFF_MS);
                    if flags.transaction() {
                        bus.begin_transaction()?;
                    }
                }
            }
        }
    }

    /// One attempt: address, write, read, verify.
    fn perform<T: OneWire>(
        &self,
        bus: &mut T,
        flags: RequestFlags,
        response: &mut [u8],
    ) -> OneWireResult<(), T::BusError> {
        bus.address(self.rom.as_ref())?;

        if flags.length_in_bits() {
            let available = (self.payload.len() * 8) as u16;
            let bits = self.payload_bits.unwrap_or(available).min(available);
            let whole = (bits / 8) as usize;
            bus.write_bytes(&self.payload[..whole])?;
            let remainder = bits % 8;
            if remainder != 0 {
                let mut tail = self.payload[whole];
                for _ in 0..remainder {
                    bus.write_bit(tail & 0x01 != 0)?;
                    tail >>= 1;
                }
            }
        } else {
            bus.write_bytes(self.payload)?;
        }

        bus.read_bytes(response)?;

        if flags.read_until_set() {
            let mut budget = BUSY_POLL_SLOT_LIMIT;
            while !bus.read_bit()? {
                budget -= 1;
                if budget == 0 {
                    return Err(OneWireError::BusTiming);
                }
            }
        }

        if flags.fail_all_ones()
            && !response.is_empty()
            && response.iter().all(|&byte| byte == 0xff)
        {
            return Err(OneWireError::ResponseAllOnes);
        }

        if flags.expect_crc8() {
            if flags.crc_inverted() {
                if let Some(last) = response.last_mut() {
                    *last = !*last;
                }
            }
            if !MaximCrc8::validate(response) {
                return Err(OneWireError::InvalidCrc);
            }
        }
        if flags.expect_crc16() {
            if flags.crc_inverted() && response.len() >= 2 {
                let len = response.len();
                response[len - 1] = !response[len - 1];
                response[len - 2] = !response[len - 2];
            }
            if !MaximCrc16::validate(response) {
                return Err(OneWireError::InvalidCrc);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireStatus};
    use core::convert::Infallible;
    use std::collections::VecDeque;
    use std::vec::Vec;

    struct ExchangeStatus;

    impl OneWireStatus for ExchangeStatus {
        fn presence(&self) -> bool {
            true
        }

        fn shortcircuit(&self) -> bool {
            false
        }
    }

    /// Records everything the request layer writes and serves a canned
    /// response, restarting the response from the top at every reset the
    /// way a re-addressed device would.
    #[derive(Default)]
    struct ScriptedExchange {
        written_bytes: Vec<u8>,
        written_bits: Vec<bool>,
        response: Vec<u8>,
        cursor: usize,
        poll_bits: VecDeque<bool>,
        resets: usize,
        transactions: Vec<&'static str>,
    }

    impl ScriptedExchange {
        fn with_response(response: &[u8]) -> Self {
            Self {
                response: response.to_vec(),
                ..Self::default()
            }
        }
    }

    impl OneWire for ScriptedExchange {
        type Status = ExchangeStatus;
        type BusError = Infallible;

        fn reset(&mut self) -> OneWireResult<ExchangeStatus, Infallible> {
            self.resets += 1;
            self.cursor = 0;
            Ok(ExchangeStatus)
        }

        fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Infallible> {
            self.written_bytes.push(byte);
            Ok(())
        }

        fn read_byte(&mut self) -> OneWireResult<u8, Infallible> {
            let byte = self.response[self.cursor];
            self.cursor += 1;
            Ok(byte)
        }

        fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Infallible> {
            self.written_bits.push(bit);
            Ok(())
        }

        fn read_bit(&mut self) -> OneWireResult<bool, Infallible> {
            Ok(self.poll_bits.pop_front().unwrap_or(true))
        }

        fn begin_transaction(&mut self) -> OneWireResult<(), Infallible> {
            self.transactions.push("begin");
            Ok(())
        }

        fn hold_transaction(&mut self) -> OneWireResult<(), Infallible> {
            self.transactions.push("hold");
            Ok(())
        }

        fn end_transaction(&mut self) -> OneWireResult<(), Infallible> {
            self.transactions.push("end");
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    // A response whose last byte is a valid CRC-8 of the bytes before it.
    const GOOD: [u8; 8] = [0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00, 0xa2];

    #[test]
    fn skip_rom_request_round_trips() {
        let mut bus = ScriptedExchange::with_response(&GOOD);
        let mut response = [0u8; 8];
        let flags = RequestFlags::new().with_expect_crc8(true);
        OneWireRequest::new(&[0xbe])
            .with_flags(flags)
            .run(&mut bus, &mut NoDelay, &mut response)
            .unwrap();
        assert_eq!(bus.written_bytes, vec![ONEWIRE_SKIP_ROM_CMD, 0xbe]);
        assert_eq!(response, GOOD);
        assert_eq!(bus.resets, 1);
    }

    #[test]
    fn match_rom_sends_the_identifier() {
        let rom = RomId::new([8, 7, 6, 5, 4, 3, 2, 1]);
        let mut bus = ScriptedExchange::default();
        OneWireRequest::new(&[0x44])
            .with_rom(rom)
            .run(&mut bus, &mut NoDelay, &mut [])
            .unwrap();
        assert_eq!(
            bus.written_bytes,
            vec![ONEWIRE_MATCH_ROM_CMD, 8, 7, 6, 5, 4, 3, 2, 1, 0x44]
        );
    }

    #[test]
    fn corrupted_checksum_fails_without_retry() {
        let mut corrupted = GOOD;
        corrupted[2] ^= 0x10;
        let mut bus = ScriptedExchange::with_response(&corrupted);
        let mut response = [0u8; 8];
        let result = OneWireRequest::new(&[0xbe])
            .with_flags(RequestFlags::new().with_expect_crc8(true))
            .run(&mut bus, &mut NoDelay, &mut response);
        assert_eq!(result, Err(OneWireError::InvalidCrc));
        assert_eq!(bus.resets, 1, "no retry unless requested");
    }

    #[test]
    fn retry_attempts_are_bounded() {
        let mut corrupted = GOOD;
        corrupted[0] ^= 0x01;
        let mut bus = ScriptedExchange::with_response(&corrupted);
        let mut response = [0u8; 8];
        let flags = RequestFlags::new().with_expect_crc8(true).with_retry(true);
        let result = OneWireRequest::new(&[0xbe])
            .with_flags(flags)
            .run(&mut bus, &mut NoDelay, &mut response);
        assert_eq!(result, Err(OneWireError::InvalidCrc));
        assert_eq!(bus.resets, 1 + REQUEST_MAX_RETRIES as usize);
    }

    #[test]
    fn all_ones_response_is_rejected_when_asked() {
        let mut bus = ScriptedExchange::with_response(&[0xff; 4]);
        let mut response = [0u8; 4];
        let result = OneWireRequest::new(&[0xbe])
            .with_flags(RequestFlags::new().with_fail_all_ones(true))
            .run(&mut bus, &mut NoDelay, &mut response);
        assert_eq!(result, Err(OneWireError::ResponseAllOnes));
    }

    #[test]
    fn inverted_checksum_is_restored_before_validation() {
        let mut stored = GOOD;
        stored[7] = !stored[7];
        let mut bus = ScriptedExchange::with_response(&stored);
        let mut response = [0u8; 8];
        let flags = RequestFlags::new()
            .with_expect_crc8(true)
            .with_crc_inverted(true);
        OneWireRequest::new(&[0xbe])
            .with_flags(flags)
            .run(&mut bus, &mut NoDelay, &mut response)
            .unwrap();
        assert_eq!(response, GOOD);
    }

    #[test]
    fn crc16_validation_accepts_generated_checksum() {
        let mut crc = MaximCrc16::default();
        crc.push_bytes(&[0x10, 0x20, 0x30]);
        let [lo, hi] = crc.value().to_le_bytes();
        let mut bus = ScriptedExchange::with_response(&[0x10, 0x20, 0x30, lo, hi]);
        let mut response = [0u8; 5];
        OneWireRequest::new(&[0x0f])
            .with_flags(RequestFlags::new().with_expect_crc16(true))
            .run(&mut bus, &mut NoDelay, &mut response)
            .unwrap();
    }

    #[test]
    fn bit_granular_payload_splits_into_bytes_and_bits() {
        let mut bus = ScriptedExchange::default();
        OneWireRequest::new(&[0x5a, 0x0d])
            .with_bit_length(12)
            .run(&mut bus, &mut NoDelay, &mut [])
            .unwrap();
        assert_eq!(bus.written_bytes, vec![ONEWIRE_SKIP_ROM_CMD, 0x5a]);
        assert_eq!(bus.written_bits, vec![true, false, true, true]);
    }

    #[test]
    fn busy_polling_consumes_zero_bits_until_a_one() {
        let mut bus = ScriptedExchange::default();
        bus.poll_bits = VecDeque::from(vec![false, false, false, true]);
        OneWireRequest::new(&[0x44])
            .with_flags(RequestFlags::new().with_read_until_set(true))
            .run(&mut bus, &mut NoDelay, &mut [])
            .unwrap();
        assert!(bus.poll_bits.is_empty());
    }

    #[test]
    fn transaction_is_closed_even_after_failure() {
        let mut bus = ScriptedExchange::with_response(&[0xff; 2]);
        let mut response = [0u8; 2];
        let result = OneWireRequest::new(&[0xbe])
            .with_flags(RequestFlags::new().with_fail_all_ones(true))
            .run_in_transaction(&mut bus, &mut NoDelay, &mut response);
        assert_eq!(result, Err(OneWireError::ResponseAllOnes));
        assert_eq!(bus.transactions, vec!["begin", "end"]);
    }

    #[test]
    fn successful_transaction_holds_then_closes() {
        let mut bus = ScriptedExchange::default();
        OneWireRequest::new(&[0x44])
            .run_in_transaction(&mut bus, &mut NoDelay, &mut [])
            .unwrap();
        assert_eq!(bus.transactions, vec!["begin", "hold", "end"]);
    }
}
