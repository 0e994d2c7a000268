//! Peripheral interface for the buffered serial channel.
//!
//! The driver core in `uart-driver` never touches hardware registers
//! directly. Everything chip-specific — register layout, baud divisor
//! programming, the one-time enable sequence — sits behind
//! [`SerialPeripheral`], and the board's interrupt glue delivers
//! hardware events through [`SerialEvents`].
//!
//! # Modules
//! - [`mock`]: scripted peripheral for host-side driver tests
//!   (feature `mock`)

#![cfg_attr(not(any(test, feature = "mock")), no_std)]

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use bitflags::bitflags;

bitflags! {
    /// Hardware line status flags, sampled from the peripheral's
    /// status register.
    ///
    /// Only the bits the driver core consumes are modeled; chip
    /// implementations translate their own register encoding into
    /// these flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineStatus: u8 {
        /// Malformed stop bit on the incoming byte.
        const FRAME_ERROR  = 1 << 0;
        /// A received byte was lost because the previous one was not
        /// drained from the data register in time.
        const DATA_OVERRUN = 1 << 1;
        /// A received byte is waiting in the data register.
        const RX_COMPLETE  = 1 << 2;
        /// The data register can accept the next byte to transmit.
        const TX_READY     = 1 << 3;
    }
}

/// Baud rate selector.
///
/// An opaque 16-bit value: bit 15 requests the peripheral's doubled
/// sampling-rate mode, the remaining bits carry the divisor. How the
/// divisor is derived from a clock and a target baud rate is the
/// board's concern, not modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudSelect(u16);

impl BaudSelect {
    const DOUBLE_SPEED: u16 = 0x8000;

    /// Selector for normal sampling mode with the given divisor.
    pub const fn normal(divisor: u16) -> Self {
        Self(divisor & !Self::DOUBLE_SPEED)
    }

    /// Selector for doubled sampling-rate mode with the given divisor.
    pub const fn double_speed(divisor: u16) -> Self {
        Self(divisor | Self::DOUBLE_SPEED)
    }

    /// The divisor portion of the selector.
    pub const fn divisor(self) -> u16 {
        self.0 & !Self::DOUBLE_SPEED
    }

    /// Whether the doubled sampling-rate mode is requested.
    pub const fn is_double_speed(self) -> bool {
        self.0 & Self::DOUBLE_SPEED != 0
    }
}

/// Chip-specific serial peripheral.
///
/// All methods take `&self`: one instance is shared between the main
/// execution context and the interrupt handlers, so implementations
/// must be safe to call from both (MMIO register access usually is).
pub trait SerialPeripheral {
    /// One-time peripheral setup.
    ///
    /// Programs the baud divisor (honoring the double-speed bit),
    /// configures an 8N1 frame, enables the receiver and transmitter,
    /// enables the receive-complete interrupt, and enables global
    /// interrupt delivery. The transmit-ready interrupt stays disabled
    /// until the driver arms it.
    fn configure(&self, baud: BaudSelect);

    /// Sample the status register.
    ///
    /// Must be called before [`read_data`](Self::read_data) for the
    /// same receive event: the hardware latches error flags together
    /// with the byte, and draining the data register releases them.
    fn read_status(&self) -> LineStatus;

    /// Drain the received byte from the data register.
    fn read_data(&self) -> u8;

    /// Write a byte to the data register, starting transmission.
    ///
    /// Implicitly clears the transmit-ready condition.
    fn write_data(&self, byte: u8);

    /// Arm the transmit-ready interrupt.
    fn enable_tx_interrupt(&self);

    /// Disarm the transmit-ready interrupt.
    fn disable_tx_interrupt(&self);
}

/// Interrupt-context event handlers.
///
/// The board's interrupt vectors call into this interface; the driver
/// channel implements it. Handlers run in interrupt context and must
/// not block.
pub trait SerialEvents {
    /// The peripheral has received a byte.
    fn on_rx_complete(&self);

    /// The peripheral is ready to accept the next byte to transmit.
    fn on_tx_ready(&self);
}
