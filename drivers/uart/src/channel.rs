//! The serial channel: one peripheral, two rings, two interrupt
//! handlers.
//!
//! # Architecture
//! ```text
//! hardware event ──> on_rx_complete ──> rx ring ──> try_get()
//! put()/try_put ──> tx ring ──> on_tx_ready ──> data register
//! ```
//!
//! The channel handle owns both rings and the sticky receive-error
//! slot; the board's interrupt glue calls the
//! [`SerialEvents`] handlers, application code calls everything else.
//! Each ring index is written by exactly one of those contexts
//! (see [`ring_buffer`](crate::ring_buffer)).

use core::hint;
use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use log::{debug, trace, warn};
use static_assertions::const_assert;
use uart_hal::{BaudSelect, LineStatus, SerialEvents, SerialPeripheral};

use crate::ring_buffer::SpscRing;
use crate::{Error, Result};

/// Default receive ring capacity.
pub const DEFAULT_RX_CAPACITY: usize = 32;
/// Default transmit ring capacity.
pub const DEFAULT_TX_CAPACITY: usize = 32;

const_assert!(DEFAULT_RX_CAPACITY.is_power_of_two());
const_assert!(DEFAULT_TX_CAPACITY.is_power_of_two());

bitflags! {
    /// Receive error flags.
    ///
    /// Hardware-reported conditions surface verbatim; BUFFER_OVERFLOW
    /// is the driver's own "rx ring was full, byte dropped" condition.
    /// Any combination may accompany a received byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxFlags: u8 {
        /// Malformed stop bit (hardware framing error).
        const FRAME_ERROR     = 1 << 0;
        /// Hardware lost a byte before the handler drained it.
        const OVERRUN_ERROR   = 1 << 1;
        /// The receive ring was full; the incoming byte was dropped.
        const BUFFER_OVERFLOW = 1 << 2;
    }
}

impl RxFlags {
    fn from_status(status: LineStatus) -> Self {
        let mut flags = RxFlags::empty();
        if status.contains(LineStatus::FRAME_ERROR) {
            flags |= RxFlags::FRAME_ERROR;
        }
        if status.contains(LineStatus::DATA_OVERRUN) {
            flags |= RxFlags::OVERRUN_ERROR;
        }
        flags
    }
}

/// A byte removed from the receive ring, with the last-observed
/// receive error flags.
///
/// The flags are *not* per-byte: they reflect the most recent receive
/// event at the time of the call. If several bytes arrived between
/// consumer calls, only the last event's flags are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub byte: u8,
    pub flags: RxFlags,
}

/// Buffered serial channel over one peripheral.
///
/// # Type Parameters
/// * `P` - The peripheral (see [`SerialPeripheral`])
/// * `RX` / `TX` - Ring capacities, powers of two; each ring holds at
///   most `capacity - 1` bytes
///
/// # Concurrency
/// One instance is shared by the main context and the two interrupt
/// contexts. Interrupt glue calls the [`SerialEvents`] methods and
/// nothing else; application code calls the rest. The receive ring's
/// head is interrupt-owned and its tail application-owned; the
/// transmit ring is partitioned the other way around.
pub struct Uart<
    P,
    const RX: usize = { DEFAULT_RX_CAPACITY },
    const TX: usize = { DEFAULT_TX_CAPACITY },
> where
    P: SerialPeripheral,
{
    peripheral: P,
    rx: SpscRing<u8, RX>,
    tx: SpscRing<u8, TX>,
    /// Flags observed at the most recent receive event, as bits.
    /// Overwritten unconditionally by every `on_rx_complete`.
    last_rx_error: AtomicU8,
}

impl<P, const RX: usize, const TX: usize> Uart<P, RX, TX>
where
    P: SerialPeripheral,
{
    /// Create a channel around a peripheral. Call
    /// [`init`](Self::init) before use.
    pub const fn new(peripheral: P) -> Self {
        Self {
            peripheral,
            rx: SpscRing::new(0),
            tx: SpscRing::new(0),
            last_rx_error: AtomicU8::new(0),
        }
    }

    /// One-time channel initialization.
    ///
    /// Zeroes both rings and the sticky error slot, then runs the
    /// peripheral's setup sequence (which enables the receive-complete
    /// interrupt and global interrupt delivery). Must not be called
    /// again while interrupts are live: the ring reset writes both
    /// sides' indices.
    pub fn init(&self, baud: BaudSelect) {
        self.rx.reset();
        self.tx.reset();
        self.last_rx_error.store(0, Ordering::Release);
        self.peripheral.configure(baud);
        debug!(
            "serial channel up: rx {} / tx {} usable slots, divisor {}{}",
            RX - 1,
            TX - 1,
            baud.divisor(),
            if baud.is_double_speed() { " (2x)" } else { "" },
        );
    }

    /// Remove one byte from the receive ring.
    ///
    /// Returns `None` immediately when nothing is buffered. The
    /// returned flags are the last-observed receive error, which may
    /// belong to a later byte than the one returned (see
    /// [`Received`]).
    pub fn try_get(&self) -> Option<Received> {
        let byte = self.rx.consumer().pop()?;
        let flags = RxFlags::from_bits_truncate(self.last_rx_error.load(Ordering::Acquire));
        Some(Received { byte, flags })
    }

    /// Insert one byte into the transmit ring without blocking.
    ///
    /// On success the transmit-ready interrupt is armed
    /// unconditionally so [`on_tx_ready`](SerialEvents::on_tx_ready)
    /// will drain the ring.
    ///
    /// # Errors
    /// [`Error::BufferFull`] if the ring has no free slot; the byte is
    /// not queued.
    pub fn try_put(&self, byte: u8) -> Result<()> {
        match self.tx.producer().push(byte) {
            Ok(()) => {
                self.peripheral.enable_tx_interrupt();
                Ok(())
            }
            Err(_) => Err(Error::BufferFull { capacity: TX }),
        }
    }

    /// Insert one byte into the transmit ring, spinning while it is
    /// full.
    ///
    /// The spin leaves interrupts enabled, so the transmit handler
    /// keeps draining the ring underneath the waiting caller. This is
    /// the only blocking operation in the driver, and it has no
    /// timeout; use [`try_put`](Self::try_put) or
    /// [`put_timeout`](Self::put_timeout) to stay in control of
    /// worst-case latency.
    pub fn put(&self, byte: u8) {
        while self.try_put(byte).is_err() {
            hint::spin_loop();
        }
    }

    /// Bounded variant of [`put`](Self::put): retry for at most
    /// `max_spins` additional polls of the ring.
    ///
    /// # Errors
    /// [`Error::Timeout`] if no slot freed up within the bound.
    pub fn put_timeout(&self, byte: u8, max_spins: usize) -> Result<()> {
        for _ in 0..=max_spins {
            if self.try_put(byte).is_ok() {
                return Ok(());
            }
            hint::spin_loop();
        }
        Err(Error::Timeout)
    }

    /// Queue every byte of `bytes` for transmission, in order.
    ///
    /// Inherits [`put`](Self::put)'s per-byte blocking behavior.
    pub fn put_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.put(byte);
        }
    }

    /// Queue a string for transmission. See
    /// [`put_bytes`](Self::put_bytes).
    pub fn put_str(&self, s: &str) {
        self.put_bytes(s.as_bytes());
    }

    /// Number of buffered, unread received bytes.
    pub fn available(&self) -> usize {
        self.rx.len()
    }

    /// Discard all buffered received bytes without returning them.
    pub fn flush(&self) {
        let discarded = self.rx.len();
        self.rx.consumer().flush();
        trace!("flushed {} buffered rx bytes", discarded);
    }

    /// Flags observed at the most recent receive event.
    pub fn last_error(&self) -> RxFlags {
        RxFlags::from_bits_truncate(self.last_rx_error.load(Ordering::Acquire))
    }

    /// The underlying peripheral.
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }
}

impl<P, const RX: usize, const TX: usize> SerialEvents for Uart<P, RX, TX>
where
    P: SerialPeripheral,
{
    /// Receive-complete handler. Interrupt context; producer side of
    /// the receive ring.
    ///
    /// Moves one byte plus its latched error flags from the peripheral
    /// into the ring. Exactly one of {byte enqueued, byte dropped}
    /// happens per invocation; the sticky error slot is updated either
    /// way.
    fn on_rx_complete(&self) {
        // Status must be sampled before the data register: draining
        // the data register releases the latched error flags.
        let status = self.peripheral.read_status();
        let byte = self.peripheral.read_data();

        let flags = match self.rx.producer().push(byte) {
            Ok(()) => RxFlags::from_status(status),
            Err(_) => {
                // Ring full: the byte is dropped and the overflow flag
                // masks whatever hardware error bits were latched.
                warn!("rx ring full, dropping received byte");
                RxFlags::BUFFER_OVERFLOW
            }
        };
        self.last_rx_error.store(flags.bits(), Ordering::Release);
    }

    /// Transmit-ready handler. Interrupt context; consumer side of the
    /// transmit ring.
    ///
    /// Hands the next buffered byte to the peripheral (which clears
    /// the interrupt condition), or disarms the transmit-ready
    /// interrupt once the ring has drained. The next `try_put` re-arms
    /// it.
    fn on_tx_ready(&self) {
        match self.tx.consumer().pop() {
            Some(byte) => self.peripheral.write_data(byte),
            None => self.peripheral.disable_tx_interrupt(),
        }
    }
}
