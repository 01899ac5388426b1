//! Per-head state and command dispatch.
//!
//! Each port tracks the last reported condition of its head: presence,
//! temperature, filament sensor, seating and fan speed. Dispatch updates this
//! state from a decoded command and writes report lines back through the
//! port's transport. Temperature is kept in tenths of a degree; no floating
//! point is involved anywhere.

use crate::command::{CommandAnswer, CommandId};
use crate::config::PortId;
use crate::decode::FixedDecimal;
use crate::serial::LineWriter;

/// Firmware version string reported for version queries.
pub const VERSION: &str = "0.1.0915";

/// Last known condition of one head.
#[derive(Debug, Clone, Copy, Default)]
pub struct GheadState {
    /// Whether the head is currently considered attached and talking.
    pub present: bool,
    /// Temperature in tenths of a degree.
    pub temp_tenths: i32,
    pub temp: FixedDecimal,
    /// Filament sensor: true when filament is detected.
    pub sensor_ok: bool,
    /// Head seating switch.
    pub head_seated: bool,
    pub fan_speed: u8,
    /// Monitor periods since the last recognized command.
    pub wait_count: u32,
}

pub fn report_temp(out: &mut LineWriter<'_>, port: PortId, state: &GheadState, clock: u32) {
    out.line(format_args!(
        "ghead_temp gh_ptr={} value={} clock={}",
        port.index(),
        state.temp_tenths,
        clock
    ));
}

pub fn report_ksensor(out: &mut LineWriter<'_>, port: PortId, state: &GheadState, clock: u32) {
    out.line(format_args!(
        "ghead_ksensor_s gh_ptr={} sensor={} clock={}",
        port.index(),
        u8::from(state.sensor_ok),
        clock
    ));
}

pub fn report_location(out: &mut LineWriter<'_>, port: PortId, state: &GheadState, clock: u32) {
    out.line(format_args!(
        "ghead_location_s gh_ptr={} location={} clock={}",
        port.index(),
        u8::from(state.head_seated),
        clock
    ));
}

pub fn report_presence(out: &mut LineWriter<'_>, port: PortId, state: &GheadState, clock: u32) {
    out.line(format_args!(
        "ghead_in_s gh_ptr={} ghead_s={} clock={}",
        port.index(),
        u8::from(state.present),
        clock
    ));
}

pub fn report_fanset(out: &mut LineWriter<'_>, port: PortId, state: &GheadState, clock: u32) {
    out.line(format_args!(
        "ghead_fanset_s gh_ptr={} f_speed={} clock={}",
        port.index(),
        state.fan_speed,
        clock
    ));
}

pub fn report_respond(out: &mut LineWriter<'_>, port: PortId, mode: u8, val: u8, clock: u32) {
    out.line(format_args!(
        "ghead_respond_s gh_ptr={} mode={} val={} clock={}",
        port.index(),
        mode,
        val,
        clock
    ));
}

fn report_version(out: &mut LineWriter<'_>, port: PortId, clock: u32) {
    out.line(format_args!(
        "ghead_version gh_ptr={} value={} clock={}",
        port.index(),
        VERSION,
        clock
    ));
}

/// Restart acknowledgement code, head restart plus a report to the host.
const RESPOND_RESTART: u8 = b'R' + b'H';

/// Applies one recognized command to the head state and emits its reports.
///
/// Runs in task context after CRC validation and classification. `clock` is
/// the integrator's monotonic timestamp, echoed into every report line.
pub fn dispatch(
    port: PortId,
    ans: &CommandAnswer<'_>,
    state: &mut GheadState,
    out: &mut LineWriter<'_>,
    clock: u32,
) {
    match ans.id {
        CommandId::Temperature => {
            if let Some(temp) = ans.seen_decimal(b'S') {
                state.temp = temp;
                state.temp_tenths = temp.scaled(10);
                report_temp(out, port, state, clock);
            }
            if let Some(k) = ans.seen(b'K') {
                state.sensor_ok = k == 0;
                report_ksensor(out, port, state, clock);
            }
        }
        CommandId::SetFanSpeed => {
            if let Some(speed) = ans.seen(b'S') {
                state.fan_speed = speed as u8;
                report_fanset(out, port, state, clock);
            }
        }
        CommandId::CheckHeadStatus => {
            if let Some(s) = ans.seen(b'S') {
                state.head_seated = s != 0;
                report_location(out, port, state, clock);
            }
        }
        CommandId::CheckSensorStatus => {
            if let Some(s) = ans.seen(b'S') {
                state.sensor_ok = s != 0;
                report_ksensor(out, port, state, clock);
            }
        }
        CommandId::ToolNormal => {
            // Multiplexed status line; only the temperature and sensor
            // sub-forms carry state.
            if ans.seen(b'H').is_some() {
                if let Some(temp) = ans.seen_decimal(b'T') {
                    state.temp = temp;
                    state.temp_tenths = temp.scaled(10);
                    report_temp(out, port, state, clock);
                }
                if let Some(k) = ans.seen(b'K') {
                    state.sensor_ok = k != 0;
                    report_respond(out, port, b'K', u8::from(state.sensor_ok), clock);
                }
            }
        }
        CommandId::Restart | CommandId::RestartNormal => {
            report_respond(out, port, RESPOND_RESTART, 0, clock);
            // Ask the freshly restarted head for its firmware version.
            out.line(format_args!("M5100 CV"));
        }
        CommandId::Version => report_version(out, port, clock),
        // Remaining ids only refresh liveness, handled by the caller.
        _ => {}
    }
}
