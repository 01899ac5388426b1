//! Interrupt-driven serial transmit path.
//!
//! Outbound bytes go through a fixed ring ([`TxRing`]) drained by the UART
//! transmit-ready interrupt. Task-context code queues whole lines; the
//! interrupt pops one byte per service. The hardware itself lives behind
//! [`UartDriver`] so the library stays host-testable.

use core::fmt::{self, Write as _};

use crate::config::PortConfig;
use crate::tx_ring::TxRing;

/// Size of the transmit ring, per port.
pub const TX_RING_SIZE: usize = 512;
/// Longest response line, including the terminator.
pub const MAX_LINE_LEN: usize = 128;

/// Minimal UART access the library needs from the integrator.
///
/// `write_byte` loads the transmit data register and must only be called when
/// the peripheral can accept a byte. `set_tx_irq` masks or unmasks the
/// transmit-ready interrupt.
pub trait UartDriver {
    fn configure(&mut self, cfg: &PortConfig);
    fn write_byte(&mut self, byte: u8);
    fn set_tx_irq(&mut self, enable: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Busy,
}

/// Transmit side of one port.
pub struct SerialPort {
    ring: TxRing<TX_RING_SIZE>,
    state: TxState,
}

impl SerialPort {
    pub const fn new() -> Self {
        SerialPort {
            ring: TxRing::new(),
            state: TxState::Idle,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Queues `data` and kicks the transmitter if it was idle.
    ///
    /// All-or-nothing: when the ring cannot take the whole slice the queue is
    /// left untouched and the data is dropped.
    pub fn send(&mut self, hw: &mut dyn UartDriver, data: &[u8]) -> bool {
        if self.ring.push(data).is_err() {
            return false;
        }
        if self.state == TxState::Idle {
            self.pump(hw);
        }
        true
    }

    /// Services one transmit-ready interrupt.
    pub fn on_tx_ready(&mut self, hw: &mut dyn UartDriver) {
        self.pump(hw);
    }

    fn pump(&mut self, hw: &mut dyn UartDriver) {
        match self.ring.pop() {
            Some(byte) => {
                hw.write_byte(byte);
                hw.set_tx_irq(true);
                self.state = TxState::Busy;
            }
            None => {
                hw.set_tx_irq(false);
                self.state = TxState::Idle;
            }
        }
    }

    /// Reprograms the UART, dropping anything still queued.
    ///
    /// Used when cycling the baud rate; stale bytes at the old rate are
    /// useless to the peer.
    pub fn reinit(&mut self, hw: &mut dyn UartDriver, cfg: &PortConfig) {
        self.ring.clear();
        self.state = TxState::Idle;
        hw.set_tx_irq(false);
        hw.configure(cfg);
    }
}

/// Formats one response line into a stack buffer and queues it.
///
/// Lines are terminated with `\r\n`. A line that overflows [`MAX_LINE_LEN`]
/// or does not fit the transmit ring is dropped whole and logged; partial
/// lines never reach the wire.
pub struct LineWriter<'a> {
    port: &'a mut SerialPort,
    hw: &'a mut dyn UartDriver,
    buf: [u8; MAX_LINE_LEN],
    used: usize,
    truncated: bool,
}

impl<'a> LineWriter<'a> {
    pub fn new(port: &'a mut SerialPort, hw: &'a mut dyn UartDriver) -> Self {
        LineWriter {
            port,
            hw,
            buf: [0u8; MAX_LINE_LEN],
            used: 0,
            truncated: false,
        }
    }

    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        self.used = 0;
        self.truncated = false;
        let _ = self.write_fmt(args);
        let _ = self.write_str("\r\n");
        if self.truncated {
            log::warn!("response line overflowed, dropped");
            return;
        }
        if !self.port.send(self.hw, &self.buf[..self.used]) {
            log::warn!("tx ring full, response dropped");
        }
    }
}

impl fmt::Write for LineWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.used + bytes.len() > MAX_LINE_LEN {
            self.truncated = true;
            return Err(fmt::Error);
        }
        self.buf[self.used..self.used + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) struct FakeUart {
    pub written: Vec<u8>,
    pub tx_irq: bool,
    pub configured: Vec<PortConfig>,
}

#[cfg(test)]
impl FakeUart {
    pub fn new() -> Self {
        FakeUart {
            written: Vec::new(),
            tx_irq: false,
            configured: Vec::new(),
        }
    }

    /// Repeatedly services the transmit interrupt until the port goes idle.
    pub fn drain(&mut self, port: &mut SerialPort) {
        while self.tx_irq {
            port.on_tx_ready(self);
        }
    }
}

#[cfg(test)]
impl UartDriver for FakeUart {
    fn configure(&mut self, cfg: &PortConfig) {
        self.configured.push(*cfg);
    }

    fn write_byte(&mut self, byte: u8) {
        self.written.push(byte);
    }

    fn set_tx_irq(&mut self, enable: bool) {
        self.tx_irq = enable;
    }
}
