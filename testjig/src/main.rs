//! Host-side exerciser for the glink stack.
//!
//! Opens one pty pair per head port and runs the full link over them. Attach
//! any serial terminal (or a scripted head emulator) to the printed slave
//! paths and type command lines at the jig:
//!
//! ```text
//! M5000 S25.1 K0
//! M115
//! ```
//!
//! Reports come back on the same pty. Leaving a port silent long enough
//! shows the absence report and the baud scan reconfigure messages.

use glink::{
    BoardConfig, GheadLink, LinkHw, PortConfig, PortId, TaskWake, UartDriver,
};
use lazy_static::lazy_static;
use std::{
    os::unix::io::RawFd,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

struct SerialEmulator {
    master: RawFd,
    slave: RawFd,
}

impl SerialEmulator {
    fn new() -> Self {
        use nix::fcntl::{fcntl, FcntlArg, OFlag};
        use nix::sys::termios::*;

        let termios: Termios = unsafe { std::mem::zeroed() };

        let ptys = nix::pty::openpty(None, &Some(termios)).expect("Could not allocate pty");
        fcntl(ptys.master, FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .expect("Could not make pty non-blocking");

        SerialEmulator {
            master: ptys.master,
            slave: ptys.slave,
        }
    }

    fn ttyname(&self) -> PathBuf {
        nix::unistd::ttyname(self.slave).expect("Could not get TTY name")
    }

    fn master(&self) -> RawFd {
        self.master
    }
}

impl Drop for SerialEmulator {
    fn drop(&mut self) {
        let _ = nix::unistd::close(self.master);
        let _ = nix::unistd::close(self.slave);
    }
}

/// One emulated UART: bytes go straight to the pty, the transmit interrupt
/// becomes a flag the main loop polls.
struct JigUart {
    fd: RawFd,
    tx_irq: bool,
}

impl UartDriver for JigUart {
    fn configure(&mut self, cfg: &PortConfig) {
        // A pty has no baud rate; just show what the link asked for.
        println!("jig: configure rx={} tx={} baud={}", cfg.rx_pin, cfg.tx_pin, cfg.baud);
    }

    fn write_byte(&mut self, byte: u8) {
        let _ = nix::unistd::write(self.fd, &[byte]);
    }

    fn set_tx_irq(&mut self, enable: bool) {
        self.tx_irq = enable;
    }
}

struct JigHw {
    uarts: [JigUart; 2],
}

impl LinkHw for JigHw {
    fn uart(&mut self, port: PortId) -> &mut dyn UartDriver {
        &mut self.uarts[port.index()]
    }

    fn clock(&self) -> u32 {
        cur_clock()
    }
}

fn cur_clock() -> u32 {
    lazy_static! {
        static ref BEGIN: Instant = Instant::now();
    }
    (BEGIN.elapsed().as_millis() & 0xFFFF_FFFF) as u32
}

static WOKEN: AtomicBool = AtomicBool::new(false);

struct JigWake;

impl TaskWake for JigWake {
    fn wake(&self) {
        WOKEN.store(true, Ordering::SeqCst);
    }
}

static WAKE: JigWake = JigWake;

fn drain_tx(link: &mut GheadLink, hw: &mut JigHw) {
    for port in PortId::ALL {
        while hw.uarts[port.index()].tx_irq {
            link.on_tx_ready(port, hw);
        }
    }
}

fn main() {
    let serials = [SerialEmulator::new(), SerialEmulator::new()];
    for (i, serial) in serials.iter().enumerate() {
        println!("jig: port {} at {}", i, serial.ttyname().display());
    }

    let mut hw = JigHw {
        uarts: [
            JigUart {
                fd: serials[0].master(),
                tx_irq: false,
            },
            JigUart {
                fd: serials[1].master(),
                tx_irq: false,
            },
        ],
    };
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    // One base tick per millisecond.
    let mut ticked = cur_clock();
    let mut recv = [0u8; 128];
    loop {
        for port in PortId::ALL {
            match nix::unistd::read(serials[port.index()].master(), &mut recv) {
                Err(nix::errno::Errno::EWOULDBLOCK) => {}
                Err(e) => panic!("read failed: {e}"),
                Ok(n) => {
                    for &byte in &recv[..n] {
                        link.on_rx_byte(port, byte);
                    }
                }
            }
        }

        let now = cur_clock();
        while ticked < now {
            link.tick();
            ticked += 1;
        }

        if WOKEN.swap(false, Ordering::SeqCst) {
            link.run_task(&mut hw);
        }
        drain_tx(&mut link, &mut hw);
        thread::sleep(Duration::from_millis(1));
    }
}
