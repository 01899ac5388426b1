//! Glink is the printer-side implementation of the ghead serial protocol
//!
//! A ghead is a removable tool-head controller that talks G-code style lines
//! over a UART. Glink implements the printer side of that link: it parses and
//! validates incoming command lines, tracks per-head state (temperature,
//! sensors, fan, presence), answers queries, and recovers a silent head by
//! cycling through the plausible baud rates.
//!
//! The crate is `no_std` and owns no hardware. Integrators implement two
//! small traits:
//!
//!   * [`UartDriver`], the per-port UART register access
//!   * [`LinkHw`], which hands out drivers and a monotonic clock
//!
//! plus a [`TaskWake`] that flags the cooperative task runner. The usual
//! shape is a static [`SharedLink`] with the receive, transmit and tick
//! interrupt handlers forwarding into it:
//!
//! ```ignore
//! static LINK: SharedLink = SharedLink::new();
//!
//! // boot
//! LINK.setup(GheadLink::new(&BoardConfig::double(), &WAKE));
//! LINK.with(|link| link.init(&mut hw));
//!
//! // UART0 rx interrupt
//! LINK.with(|link| link.on_rx_byte(PortId::Gh0, byte));
//!
//! // main loop, when WAKE has flagged
//! LINK.with(|link| link.run_task(&mut hw));
//! ```
//!
//! Everything is host-testable; the test suites drive the full stack through
//! mock UARTs.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod command;
mod config;
mod decode;
mod ghead;
mod link;
mod mailbox;
mod monitor;
mod parser;
mod serial;
mod timer;
mod tx_ring;

pub use command::{
    classify, CommandAnswer, CommandId, CommandSpec, DecodedParam, FirstParam, BUILTIN_TABLE,
};
pub use config::{gpio, BoardConfig, PortConfig, PortId};
pub use decode::{scan_decimal, scan_int, FixedDecimal};
pub use ghead::{GheadState, VERSION};
pub use link::{Event, GheadLink, LinkHw, SharedLink};
pub use mailbox::{
    MailboxId, MailboxPool, SendError, TaskWake, MAILBOX_DEPTH, MAILBOX_POOL_SIZE,
};
pub use monitor::{
    next_baud, BaudScan, BAUD_SCAN_THRESHOLD, MONITOR_PERIOD_UNITS, PRESENCE_TIMEOUT,
};
pub use parser::{
    CommandRecord, LineParser, ParamSlot, MAX_CRC_DIGITS, MAX_NAME, MAX_PARAMS, MAX_REPLAY,
    MAX_VALUE,
};
pub use serial::{LineWriter, SerialPort, TxState, UartDriver, MAX_LINE_LEN, TX_RING_SIZE};
pub use timer::{
    TimerCallback, TimerId, TimerKind, TimerPool, TimerState, TICKS_PER_UNIT, TIMER_POOL_SIZE,
};
pub use tx_ring::{TxOverflow, TxRing};
