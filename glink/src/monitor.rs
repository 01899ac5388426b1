//! Head liveness monitoring and baud-rate recovery.
//!
//! A periodic timer per port drives two counters. While the head is
//! considered present, every monitor period without a recognized command
//! bumps a wait counter; hitting [`PRESENCE_TIMEOUT`] marks the head absent.
//! While absent, a second counter paces a scan through the plausible baud
//! rates so a head configured at a different rate is eventually heard.
//! Presence transitions are edge-triggered in both directions; the steady
//! state produces no traffic.

use crate::ghead::GheadState;

/// Monitor periods without traffic before the head is declared absent.
pub const PRESENCE_TIMEOUT: u32 = 5;
/// Monitor periods between baud changes while scanning.
pub const BAUD_SCAN_THRESHOLD: u32 = 3;
/// Monitor timer period, in logical timer units.
pub const MONITOR_PERIOD_UNITS: u32 = 100;

/// Next rate in the scan cycle. Rates outside the cycle enter it at 19200.
pub fn next_baud(current: u32) -> u32 {
    match current {
        19_200 => 115_200,
        115_200 => 230_400,
        230_400 => 19_200,
        _ => 19_200,
    }
}

/// Baud-scan progress for one absent port.
#[derive(Debug, Clone, Copy)]
pub struct BaudScan {
    current: u32,
    count: u32,
}

impl BaudScan {
    pub const fn new(initial: u32) -> Self {
        BaudScan {
            current: initial,
            count: 0,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Called when the head talks; the scan stands still while present.
    pub fn note_present(&mut self) {
        self.count = 0;
    }

    /// Advances one monitor period of absence.
    ///
    /// Returns the new baud rate when the threshold is crossed and the port
    /// should be reprogrammed.
    pub fn advance(&mut self) -> Option<u32> {
        self.count += 1;
        if self.count <= BAUD_SCAN_THRESHOLD {
            return None;
        }
        self.count = 0;
        self.current = next_baud(self.current);
        Some(self.current)
    }
}

/// One monitor period elapsed while the head was present.
///
/// Returns true on the present-to-absent edge; the caller reports it once.
pub fn presence_tick(state: &mut GheadState) -> bool {
    if !state.present {
        return false;
    }
    state.wait_count += 1;
    if state.wait_count < PRESENCE_TIMEOUT {
        return false;
    }
    state.present = false;
    state.wait_count = 0;
    true
}

/// A recognized command arrived for this head.
///
/// Returns true on the absent-to-present edge; the caller reports it once.
pub fn presence_refresh(state: &mut GheadState) -> bool {
    state.wait_count = 0;
    if state.present {
        return false;
    }
    state.present = true;
    true
}
