//! Interrupt-driven serial channel with receive/transmit ring buffers.
//!
//! Decouples hardware receive/transmit timing from application code by
//! interposing one fixed-capacity ring buffer per direction. The
//! interrupt-context handlers ([`SerialEvents`](uart_hal::SerialEvents)
//! on [`channel::Uart`]) move bytes between the peripheral and the
//! rings; the application-facing calls move bytes between the rings
//! and the caller. No locks: each ring index has exactly one writing
//! context, and cross-context reads go through atomics.
//!
//! # Modules
//! - [`ring_buffer`]: SPSC ring shared between main and interrupt
//!   context
//! - [`channel`]: the channel handle, both interrupt handlers, and the
//!   application API
//!
//! # Example
//! ```no_run
//! use uart_driver::channel::Uart;
//! use uart_hal::BaudSelect;
//! # use uart_hal::mock::MockPeripheral;
//!
//! # let peripheral = MockPeripheral::new();
//! let uart: Uart<_> = Uart::new(peripheral);
//! uart.init(BaudSelect::double_speed(12));
//!
//! uart.put_str("hello\r\n");
//! while let Some(received) = uart.try_get() {
//!     // received.flags carries the last-observed line errors
//!     let _ = received.byte;
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod channel;
pub mod ring_buffer;

pub use channel::{Received, RxFlags, Uart};

// Re-export the peripheral interface for downstream board crates
pub use uart_hal as hal;

use thiserror::Error;

/// Result type for channel operations
pub type Result<T> = core::result::Result<T, Error>;

/// Channel error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Transmit ring buffer is full
    #[error("transmit buffer full (capacity {capacity})")]
    BufferFull { capacity: usize },
    /// Bounded put gave up before the interrupt handler freed a slot
    #[error("timed out waiting for transmit buffer space")]
    Timeout,
}
