//! Top-level link state and context entry points.
//!
//! [`GheadLink`] owns everything for up to two head ports: transmit rings,
//! receive parsers, head state, the event mailbox and the monitor timers.
//! Hardware access stays behind [`LinkHw`] so the whole stack runs on a host
//! under test.
//!
//! Three execution contexts touch the link:
//! - receive/transmit interrupts call [`GheadLink::on_rx_byte`] and
//!   [`GheadLink::on_tx_ready`];
//! - the periodic tick interrupt calls [`GheadLink::tick`];
//! - the cooperative task calls [`GheadLink::run_task`] when woken.
//!
//! [`SharedLink`] serializes them behind a critical-section mutex; the inner
//! types themselves are plain `&mut self` structures.

use core::cell::RefCell;

use crate::command::{classify, CommandAnswer, CommandSpec, BUILTIN_TABLE};
use crate::config::{BoardConfig, PortConfig, PortId};
use crate::ghead::{dispatch, report_presence, GheadState};
use crate::mailbox::{MailboxId, MailboxPool, TaskWake};
use crate::monitor::{presence_refresh, presence_tick, BaudScan, MONITOR_PERIOD_UNITS};
use crate::parser::{CommandRecord, LineParser};
use crate::serial::{LineWriter, SerialPort, UartDriver};
use crate::timer::{TimerId, TimerKind, TimerPool};

/// Hardware the integrator provides.
pub trait LinkHw {
    fn uart(&mut self, port: PortId) -> &mut dyn UartDriver;
    /// Monotonic 32-bit timestamp echoed into report lines.
    fn clock(&self) -> u32;
}

/// One event-queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A complete command line arrived on this port.
    Recv(PortId),
    /// The port's monitor period elapsed.
    Monitor(PortId),
}

impl Event {
    pub fn to_byte(self) -> u8 {
        match self {
            Event::Recv(port) => port.index() as u8,
            Event::Monitor(port) => 2 + port.index() as u8,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Event> {
        match byte {
            0 | 1 => PortId::from_index(byte as usize).map(Event::Recv),
            2 | 3 => PortId::from_index(byte as usize - 2).map(Event::Monitor),
            _ => None,
        }
    }
}

struct PortSlot {
    cfg: PortConfig,
    serial: SerialPort,
    parser: LineParser,
    /// Completed line awaiting dispatch. While occupied the parser is
    /// blocked, so at most one record is in flight per port.
    pending: Option<CommandRecord>,
    ghead: GheadState,
    scan: BaudScan,
}

/// Everything the timer callbacks need to reach, split from the pool itself
/// so `tick` can thread it through as the callback context.
struct LinkCore {
    ports: [Option<PortSlot>; 2],
    mailboxes: MailboxPool,
    events: Option<MailboxId>,
    table: &'static [CommandSpec],
}

fn monitor_fired(_pool: &mut TimerPool<LinkCore>, _id: TimerId, user: usize, core: &mut LinkCore) {
    let Some(port) = PortId::from_index(user) else {
        return;
    };
    core.post(Event::Monitor(port));
}

impl LinkCore {
    fn post(&mut self, event: Event) {
        let Some(events) = self.events else {
            return;
        };
        if self.mailboxes.send(events, event.to_byte()).is_err() {
            log::warn!("event queue full, dropped {:?}", event);
        }
    }

    fn on_rx_byte(&mut self, port: PortId, byte: u8) {
        let Some(slot) = self.ports[port.index()].as_mut() else {
            return;
        };
        let blocked = slot.pending.is_some();
        if let Some(rec) = slot.parser.feed(byte, blocked) {
            slot.pending = Some(rec);
            self.post(Event::Recv(port));
        }
    }

    fn handle_command(&mut self, port: PortId, hw: &mut dyn LinkHw) {
        let clock = hw.clock();
        let Some(slot) = self.ports[port.index()].as_mut() else {
            return;
        };
        let Some(rec) = slot.pending.take() else {
            return;
        };
        if !rec.crc_valid() {
            log::warn!("port {} checksum mismatch, line dropped", port.index());
            return;
        }
        let Some(id) = classify(self.table, &rec) else {
            log::debug!("port {} unrecognized command", port.index());
            return;
        };
        let ans = CommandAnswer::decode(id, &rec);
        let came_in = presence_refresh(&mut slot.ghead);
        slot.scan.note_present();
        let mut out = LineWriter::new(&mut slot.serial, hw.uart(port));
        if came_in {
            report_presence(&mut out, port, &slot.ghead, clock);
        }
        dispatch(port, &ans, &mut slot.ghead, &mut out, clock);
    }

    fn handle_monitor(&mut self, port: PortId, hw: &mut dyn LinkHw) {
        let clock = hw.clock();
        let Some(slot) = self.ports[port.index()].as_mut() else {
            return;
        };
        if slot.ghead.present {
            if presence_tick(&mut slot.ghead) {
                log::info!("port {} head lost", port.index());
                let mut out = LineWriter::new(&mut slot.serial, hw.uart(port));
                report_presence(&mut out, port, &slot.ghead, clock);
            }
        } else if let Some(baud) = slot.scan.advance() {
            slot.cfg.baud = baud;
            slot.serial.reinit(hw.uart(port), &slot.cfg);
            log::info!("port {} scanning at {} baud", port.index(), baud);
        }
    }

    fn run_task(&mut self, hw: &mut dyn LinkHw) {
        let Some(events) = self.events else {
            return;
        };
        while let Some(msg) = self.mailboxes.read(events) {
            match Event::from_byte(msg) {
                Some(Event::Recv(port)) => self.handle_command(port, hw),
                Some(Event::Monitor(port)) => self.handle_monitor(port, hw),
                None => {}
            }
        }
        // A full event queue drops completion notices; any record still
        // pending here lost its event and is dispatched now.
        for port in PortId::ALL {
            let stuck = self.ports[port.index()]
                .as_ref()
                .is_some_and(|slot| slot.pending.is_some());
            if stuck {
                self.handle_command(port, hw);
            }
        }
    }
}

/// The whole per-board link stack.
pub struct GheadLink {
    core: LinkCore,
    timers: TimerPool<LinkCore>,
}

impl GheadLink {
    /// Builds the link with the stock command table.
    ///
    /// `wake` is invoked whenever an event is queued, from interrupt or tick
    /// context; it should flag the task runner to call
    /// [`run_task`](Self::run_task).
    pub fn new(board: &BoardConfig, wake: &'static dyn TaskWake) -> Self {
        Self::with_table(board, wake, BUILTIN_TABLE)
    }

    pub fn with_table(
        board: &BoardConfig,
        wake: &'static dyn TaskWake,
        table: &'static [CommandSpec],
    ) -> Self {
        let mut core = LinkCore {
            ports: [None, None],
            mailboxes: MailboxPool::new(),
            events: None,
            table,
        };
        core.events = core.mailboxes.create(wake);
        let mut timers = TimerPool::new();
        for port in PortId::ALL {
            let Some(cfg) = board.ports[port.index()] else {
                continue;
            };
            if let Some(id) = timers.create(
                MONITOR_PERIOD_UNITS,
                TimerKind::Periodic,
                monitor_fired,
                port.index(),
            ) {
                timers.start(id);
            }
            core.ports[port.index()] = Some(PortSlot {
                cfg,
                serial: SerialPort::new(),
                parser: LineParser::new(),
                pending: None,
                ghead: GheadState::default(),
                scan: BaudScan::new(cfg.baud),
            });
        }
        GheadLink { core, timers }
    }

    /// Programs every configured port at its default rate.
    pub fn init(&mut self, hw: &mut dyn LinkHw) {
        for port in PortId::ALL {
            if let Some(slot) = self.core.ports[port.index()].as_mut() {
                slot.serial.reinit(hw.uart(port), &slot.cfg);
            }
        }
    }

    /// Feeds one received byte. Receive interrupt context.
    pub fn on_rx_byte(&mut self, port: PortId, byte: u8) {
        self.core.on_rx_byte(port, byte);
    }

    /// Services a transmit-ready interrupt for `port`.
    pub fn on_tx_ready(&mut self, port: PortId, hw: &mut dyn LinkHw) {
        if let Some(slot) = self.core.ports[port.index()].as_mut() {
            slot.serial.on_tx_ready(hw.uart(port));
        }
    }

    /// Advances the timer pool by one base tick. Tick interrupt context.
    pub fn tick(&mut self) {
        self.timers.tick(&mut self.core);
    }

    /// Drains and dispatches queued events. Task context.
    pub fn run_task(&mut self, hw: &mut dyn LinkHw) {
        self.core.run_task(hw);
    }

    /// Last known state of the head on `port`.
    pub fn ghead(&self, port: PortId) -> Option<&GheadState> {
        self.core.ports[port.index()].as_ref().map(|s| &s.ghead)
    }

    /// Current configuration of `port`, reflecting any baud rescans.
    pub fn port_config(&self, port: PortId) -> Option<&PortConfig> {
        self.core.ports[port.index()].as_ref().map(|s| &s.cfg)
    }
}

/// A `GheadLink` shared between interrupt, tick and task context.
///
/// Every entry point takes one critical section for the whole call, which is
/// the only synchronization the inner types assume.
pub struct SharedLink {
    link: critical_section::Mutex<RefCell<Option<GheadLink>>>,
}

impl SharedLink {
    pub const fn new() -> Self {
        SharedLink {
            link: critical_section::Mutex::new(RefCell::new(None)),
        }
    }

    /// Installs the link, typically once at boot before interrupts enable.
    pub fn setup(&self, link: GheadLink) {
        critical_section::with(|cs| {
            *self.link.borrow_ref_mut(cs) = Some(link);
        });
    }

    /// Runs `f` on the link inside a critical section.
    ///
    /// Returns `None` until [`setup`](Self::setup) has installed a link.
    pub fn with<R>(&self, f: impl FnOnce(&mut GheadLink) -> R) -> Option<R> {
        critical_section::with(|cs| self.link.borrow_ref_mut(cs).as_mut().map(f))
    }
}
