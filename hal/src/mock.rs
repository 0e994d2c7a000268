//! Scripted peripheral for host-side driver tests.
//!
//! Receive events are queued up front as `(LineStatus, byte)` pairs;
//! each `read_status` / `read_data` pair consumes one event, and the
//! mock asserts the status register is sampled before the data
//! register, mirroring the hardware latching contract.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{BaudSelect, LineStatus, SerialPeripheral};

#[derive(Default)]
struct MockState {
    /// Scripted receive events, front = next.
    rx_events: VecDeque<(LineStatus, u8)>,
    /// Whether status was sampled for the current event.
    status_sampled: bool,
    /// Bytes the driver handed to the data register.
    transmitted: Vec<u8>,
    /// Transmit-ready interrupt armed?
    tx_irq_enabled: bool,
    /// Selector passed to `configure`, if any.
    configured: Option<BaudSelect>,
}

/// Scripted serial peripheral.
///
/// Interrupts never fire on their own: tests script receive events
/// with [`script_rx`](Self::script_rx) and then invoke the driver's
/// handlers directly, standing in for the interrupt vectors.
pub struct MockPeripheral {
    state: Mutex<MockState>,
}

impl MockPeripheral {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// Queue a receive event: the status flags latched with the byte.
    pub fn script_rx(&self, status: LineStatus, byte: u8) {
        let mut state = self.state.lock().unwrap();
        state.rx_events.push_back((status, byte));
    }

    /// Queue a clean receive event (no error flags).
    pub fn script_rx_byte(&self, byte: u8) {
        self.script_rx(LineStatus::RX_COMPLETE, byte);
    }

    /// Number of scripted receive events not yet drained.
    pub fn pending_rx(&self) -> usize {
        self.state.lock().unwrap().rx_events.len()
    }

    /// Bytes written to the data register so far, in order.
    pub fn transmitted(&self) -> Vec<u8> {
        self.state.lock().unwrap().transmitted.clone()
    }

    /// Whether the transmit-ready interrupt is currently armed.
    pub fn tx_interrupt_enabled(&self) -> bool {
        self.state.lock().unwrap().tx_irq_enabled
    }

    /// The selector passed to `configure`, if it ran.
    pub fn configured_baud(&self) -> Option<BaudSelect> {
        self.state.lock().unwrap().configured
    }
}

impl SerialPeripheral for MockPeripheral {
    fn configure(&self, baud: BaudSelect) {
        let mut state = self.state.lock().unwrap();
        state.configured = Some(baud);
        // Receive-complete irq and global delivery are implied
        // enabled from here on; the mock has nothing to track for
        // them because tests invoke the handlers directly.
    }

    fn read_status(&self) -> LineStatus {
        let mut state = self.state.lock().unwrap();
        state.status_sampled = true;
        match state.rx_events.front().copied() {
            Some((status, _)) => status | LineStatus::RX_COMPLETE,
            None => LineStatus::TX_READY,
        }
    }

    fn read_data(&self) -> u8 {
        let mut state = self.state.lock().unwrap();
        assert!(
            state.status_sampled,
            "data register read before status register"
        );
        state.status_sampled = false;
        match state.rx_events.pop_front() {
            Some((_, byte)) => byte,
            None => 0,
        }
    }

    fn write_data(&self, byte: u8) {
        let mut state = self.state.lock().unwrap();
        state.transmitted.push(byte);
    }

    fn enable_tx_interrupt(&self) {
        self.state.lock().unwrap().tx_irq_enabled = true;
    }

    fn disable_tx_interrupt(&self) {
        self.state.lock().unwrap().tx_irq_enabled = false;
    }
}
