//! Polling glink demo for the Raspberry Pi Pico.
//!
//! UART0 (GP0/GP1) and UART1 (GP4/GP5) each carry one head port. Everything
//! runs from the main loop: received bytes are fed into the link, one base
//! tick elapses per millisecond of the hardware timer, and queued transmit
//! bytes are pumped whenever the peripheral has FIFO space.

#![no_std]
#![no_main]

use rp_pico as bsp;

use panic_halt as _;

use bsp::{
    entry,
    hal::{
        clocks::init_clocks_and_plls,
        gpio::{
            bank0::{Gpio0, Gpio1, Gpio4, Gpio5},
            FunctionUart, Pin,
        },
        pac,
        uart::{DataBits, Enabled, StopBits, UartConfig, UartDevice, UartPeripheral, ValidUartPinout},
        watchdog::Watchdog,
        Clock, Sio, Timer,
    },
};
use core::sync::atomic::{AtomicBool, Ordering};
use fugit::{HertzU32, RateExtU32};

use glink::{BoardConfig, GheadLink, LinkHw, PortConfig, PortId, TaskWake, UartDriver};

static WOKEN: AtomicBool = AtomicBool::new(false);

struct DemoWake;

impl TaskWake for DemoWake {
    fn wake(&self) {
        WOKEN.store(true, Ordering::SeqCst);
    }
}

static WAKE: DemoWake = DemoWake;

/// One hardware UART behind the link's driver trait.
///
/// The polling loop stands in for the transmit interrupt, so `set_tx_irq`
/// just records whether the link wants more service calls.
struct DemoUart<D: UartDevice, P: ValidUartPinout<D>> {
    uart: Option<UartPeripheral<Enabled, D, P>>,
    peripheral_freq: HertzU32,
    tx_pending: bool,
}

impl<D: UartDevice, P: ValidUartPinout<D>> DemoUart<D, P> {
    fn new(uart: UartPeripheral<Enabled, D, P>, peripheral_freq: HertzU32) -> Self {
        DemoUart {
            uart: Some(uart),
            peripheral_freq,
            tx_pending: false,
        }
    }

    fn read_pending(&mut self, buf: &mut [u8]) -> usize {
        match self.uart.as_mut() {
            Some(uart) => uart.read_raw(buf).unwrap_or(0),
            None => 0,
        }
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>> UartDriver for DemoUart<D, P> {
    fn configure(&mut self, cfg: &PortConfig) {
        // Reprogramming the rate means bouncing the peripheral through its
        // disabled state.
        if let Some(uart) = self.uart.take() {
            let config = UartConfig::new(cfg.baud.Hz(), DataBits::Eight, None, StopBits::One);
            self.uart = uart.disable().enable(config, self.peripheral_freq).ok();
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if let Some(uart) = self.uart.as_mut() {
            let _ = uart.write_raw(&[byte]);
        }
    }

    fn set_tx_irq(&mut self, enable: bool) {
        self.tx_pending = enable;
    }
}

type Uart0 = DemoUart<pac::UART0, (Pin<Gpio0, FunctionUart>, Pin<Gpio1, FunctionUart>)>;
type Uart1 = DemoUart<pac::UART1, (Pin<Gpio4, FunctionUart>, Pin<Gpio5, FunctionUart>)>;

struct DemoHw {
    uart0: Uart0,
    uart1: Uart1,
    timer: Timer,
}

impl LinkHw for DemoHw {
    fn uart(&mut self, port: PortId) -> &mut dyn UartDriver {
        match port {
            PortId::Gh0 => &mut self.uart0,
            PortId::Gh1 => &mut self.uart1,
        }
    }

    fn clock(&self) -> u32 {
        self.timer.get_counter_low()
    }
}

#[entry]
fn main() -> ! {
    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // External high-speed crystal on the pico board is 12Mhz
    let external_xtal_freq_hz = bsp::XOSC_CRYSTAL_FREQ;
    let clocks = init_clocks_and_plls(
        external_xtal_freq_hz,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let sio = Sio::new(pac.SIO);
    let pins = bsp::Pins::new(pac.IO_BANK0, pac.PADS_BANK0, sio.gpio_bank0, &mut pac.RESETS);
    let peripheral_freq = clocks.peripheral_clock.freq();

    let board = BoardConfig::double();
    let default_config = |port: PortId| {
        let baud = board.ports[port.index()].map(|c| c.baud).unwrap_or(115_200);
        UartConfig::new(baud.Hz(), DataBits::Eight, None, StopBits::One)
    };

    let uart0 = UartPeripheral::new(
        pac.UART0,
        (
            pins.gpio0.into_mode::<FunctionUart>(),
            pins.gpio1.into_mode::<FunctionUart>(),
        ),
        &mut pac.RESETS,
    )
    .enable(default_config(PortId::Gh0), peripheral_freq)
    .unwrap();
    let uart1 = UartPeripheral::new(
        pac.UART1,
        (
            pins.gpio4.into_mode::<FunctionUart>(),
            pins.gpio5.into_mode::<FunctionUart>(),
        ),
        &mut pac.RESETS,
    )
    .enable(default_config(PortId::Gh1), peripheral_freq)
    .unwrap();

    let timer = Timer::new(pac.TIMER, &mut pac.RESETS);
    let mut hw = DemoHw {
        uart0: DemoUart::new(uart0, peripheral_freq),
        uart1: DemoUart::new(uart1, peripheral_freq),
        timer,
    };

    let mut link = GheadLink::new(&board, &WAKE);
    link.init(&mut hw);

    // The timer counts microseconds; one link base tick per millisecond.
    let mut ticked = hw.timer.get_counter_low() / 1000;
    let mut recv = [0u8; 32];
    loop {
        let n = hw.uart0.read_pending(&mut recv);
        for &byte in &recv[..n] {
            link.on_rx_byte(PortId::Gh0, byte);
        }
        let n = hw.uart1.read_pending(&mut recv);
        for &byte in &recv[..n] {
            link.on_rx_byte(PortId::Gh1, byte);
        }

        let now = hw.timer.get_counter_low() / 1000;
        while ticked < now {
            link.tick();
            ticked += 1;
        }

        if WOKEN.swap(false, Ordering::SeqCst) {
            link.run_task(&mut hw);
        }

        for port in PortId::ALL {
            while match port {
                PortId::Gh0 => hw.uart0.tx_pending,
                PortId::Gh1 => hw.uart1.tx_pending,
            } {
                link.on_tx_ready(port, &mut hw);
            }
        }
    }
}
