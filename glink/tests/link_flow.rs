//! Full-stack tests over a mock UART pair: bytes in through the receive
//! path, task dispatch, bytes back out through the transmit interrupt.

use std::sync::atomic::{AtomicUsize, Ordering};

use glink::{
    BoardConfig, GheadLink, LinkHw, PortConfig, PortId, TaskWake, UartDriver,
    BAUD_SCAN_THRESHOLD, MONITOR_PERIOD_UNITS, PRESENCE_TIMEOUT, TICKS_PER_UNIT,
};

#[derive(Default)]
struct MockUart {
    written: Vec<u8>,
    tx_irq: bool,
    configured: Vec<PortConfig>,
}

impl UartDriver for MockUart {
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

#[derive(Default)]
struct MockHw {
    uarts: [MockUart; 2],
    clock: u32,
}

impl LinkHw for MockHw {
    fn uart(&mut self, port: PortId) -> &mut dyn UartDriver {
        &mut self.uarts[port.index()]
    }

    fn clock(&self) -> u32 {
        self.clock
    }
}

impl MockHw {
    /// Services transmit interrupts until the port runs dry, then returns
    /// the captured output as text.
    fn drain(&mut self, link: &mut GheadLink, port: PortId) -> String {
        while self.uarts[port.index()].tx_irq {
            link.on_tx_ready(port, self);
        }
        let text = String::from_utf8(self.uarts[port.index()].written.clone()).unwrap();
        self.uarts[port.index()].written.clear();
        text
    }
}

struct CountingWake(AtomicUsize);

impl TaskWake for CountingWake {
    fn wake(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn xor(line: &[u8]) -> u8 {
    line.iter().fold(0u8, |crc, b| crc ^ b)
}

fn feed(link: &mut GheadLink, port: PortId, line: &[u8]) {
    for &b in line {
        link.on_rx_byte(port, b);
    }
}

fn feed_with_crc(link: &mut GheadLink, port: PortId, payload: &[u8]) {
    let mut line = payload.to_vec();
    line.extend(format!("*{}\r", xor(payload)).bytes());
    feed(link, port, &line);
}

/// Runs enough base ticks for one monitor period, then the task loop.
fn monitor_period(link: &mut GheadLink, hw: &mut MockHw) {
    for _ in 0..MONITOR_PERIOD_UNITS * TICKS_PER_UNIT {
        link.tick();
    }
    link.run_task(hw);
}

#[test]
fn command_round_trip_with_crc() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw {
        clock: 77,
        ..Default::default()
    };
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed_with_crc(&mut link, PortId::Gh0, b"M5000 S100 K0");
    assert!(WAKE.0.load(Ordering::SeqCst) > 0);

    link.run_task(&mut hw);
    let text = hw.drain(&mut link, PortId::Gh0);
    // First contact raises the presence edge, then the reports follow.
    assert!(text.starts_with("ghead_in_s gh_ptr=0 ghead_s=1 clock=77\r\n"));
    assert!(text.contains("ghead_temp gh_ptr=0 value=1000 clock=77\r\n"));
    assert!(text.contains("ghead_ksensor_s gh_ptr=0 sensor=1 clock=77\r\n"));
    assert_eq!(link.ghead(PortId::Gh0).unwrap().temp_tenths, 1000);
    // The other port saw nothing.
    assert!(hw.uarts[1].written.is_empty());
}

#[test]
fn corrupt_crc_is_dropped_silently() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    let payload = b"M5000 S100 K0";
    let mut line = payload.to_vec();
    line.extend(format!("*{}\r", xor(payload) ^ 1).bytes());
    feed(&mut link, PortId::Gh0, &line);
    link.run_task(&mut hw);

    assert!(hw.drain(&mut link, PortId::Gh0).is_empty());
    assert!(!link.ghead(PortId::Gh0).unwrap().present);
}

#[test]
fn version_query_round_trip() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw {
        clock: 5,
        ..Default::default()
    };
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed(&mut link, PortId::Gh1, b"M115\r");
    link.run_task(&mut hw);
    let text = hw.drain(&mut link, PortId::Gh1);
    assert!(text.contains("ghead_version gh_ptr=1 value=0.1.0915 clock=5\r\n"));
}

#[test]
fn pending_line_blocks_the_parser_until_dispatched() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed(&mut link, PortId::Gh0, b"M115\r");
    // Still pending; this whole line must be ignored.
    feed(&mut link, PortId::Gh0, b"M5001 S70\r");
    link.run_task(&mut hw);
    let text = hw.drain(&mut link, PortId::Gh0);
    assert!(text.contains("ghead_version"));
    assert!(!text.contains("ghead_fanset_s"));
    assert_eq!(link.ghead(PortId::Gh0).unwrap().fan_speed, 0);

    // Unblocked after dispatch.
    feed(&mut link, PortId::Gh0, b"M5001 S70\r");
    link.run_task(&mut hw);
    assert!(hw
        .drain(&mut link, PortId::Gh0)
        .contains("ghead_fanset_s gh_ptr=0 f_speed=70"));
}

#[test]
fn silence_marks_the_head_absent_once() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed(&mut link, PortId::Gh0, b"M115\r");
    link.run_task(&mut hw);
    hw.drain(&mut link, PortId::Gh0);
    assert!(link.ghead(PortId::Gh0).unwrap().present);

    for _ in 0..PRESENCE_TIMEOUT - 1 {
        monitor_period(&mut link, &mut hw);
        assert!(link.ghead(PortId::Gh0).unwrap().present);
    }
    monitor_period(&mut link, &mut hw);
    assert!(!link.ghead(PortId::Gh0).unwrap().present);
    let text = hw.drain(&mut link, PortId::Gh0);
    assert_eq!(text.matches("ghead_in_s").count(), 1);
    assert!(text.contains("ghead_in_s gh_ptr=0 ghead_s=0"));

    // Steady-state absence stays quiet on the report channel.
    monitor_period(&mut link, &mut hw);
    let text = hw.drain(&mut link, PortId::Gh0);
    assert!(!text.contains("ghead_in_s"));
}

#[test]
fn traffic_keeps_the_head_present() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed(&mut link, PortId::Gh0, b"M115\r");
    link.run_task(&mut hw);
    hw.drain(&mut link, PortId::Gh0);

    for _ in 0..3 * PRESENCE_TIMEOUT {
        monitor_period(&mut link, &mut hw);
        feed(&mut link, PortId::Gh0, b"M5000 S25 K0\r");
        link.run_task(&mut hw);
        hw.drain(&mut link, PortId::Gh0);
    }
    assert!(link.ghead(PortId::Gh0).unwrap().present);
}

#[test]
fn absent_port_cycles_through_baud_rates() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);
    // One configure from init, at the default rate.
    assert_eq!(hw.uarts[0].configured.len(), 1);
    assert_eq!(hw.uarts[0].configured[0].baud, 115_200);

    // Never-seen head: the scan advances every BAUD_SCAN_THRESHOLD + 1
    // monitor periods.
    for _ in 0..3 * (BAUD_SCAN_THRESHOLD + 1) {
        monitor_period(&mut link, &mut hw);
    }
    let bauds: Vec<u32> = hw.uarts[0].configured.iter().map(|c| c.baud).collect();
    assert_eq!(bauds, vec![115_200, 230_400, 19_200, 115_200]);
    assert_eq!(
        link.port_config(PortId::Gh0).map(|c| c.baud),
        Some(115_200)
    );
}

#[test]
fn recovered_head_raises_the_presence_edge_again() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed(&mut link, PortId::Gh0, b"M115\r");
    link.run_task(&mut hw);
    hw.drain(&mut link, PortId::Gh0);
    for _ in 0..PRESENCE_TIMEOUT {
        monitor_period(&mut link, &mut hw);
    }
    hw.drain(&mut link, PortId::Gh0);
    assert!(!link.ghead(PortId::Gh0).unwrap().present);

    feed(&mut link, PortId::Gh0, b"M115\r");
    link.run_task(&mut hw);
    let text = hw.drain(&mut link, PortId::Gh0);
    assert!(text.contains("ghead_in_s gh_ptr=0 ghead_s=1"));
    assert!(link.ghead(PortId::Gh0).unwrap().present);
}

#[test]
fn ports_are_fully_independent() {
    static WAKE: CountingWake = CountingWake(AtomicUsize::new(0));
    let mut hw = MockHw::default();
    let mut link = GheadLink::new(&BoardConfig::double(), &WAKE);
    link.init(&mut hw);

    feed(&mut link, PortId::Gh0, b"M5000 S10 K0\r");
    feed(&mut link, PortId::Gh1, b"M5000 S90 K1\r");
    link.run_task(&mut hw);

    assert_eq!(link.ghead(PortId::Gh0).unwrap().temp_tenths, 100);
    assert_eq!(link.ghead(PortId::Gh1).unwrap().temp_tenths, 900);
    assert!(link.ghead(PortId::Gh0).unwrap().sensor_ok);
    assert!(!link.ghead(PortId::Gh1).unwrap().sensor_ok);
    assert!(hw
        .drain(&mut link, PortId::Gh0)
        .contains("ghead_temp gh_ptr=0 value=100"));
    assert!(hw
        .drain(&mut link, PortId::Gh1)
        .contains("ghead_temp gh_ptr=1 value=900"));
}
