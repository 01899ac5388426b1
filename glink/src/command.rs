//! Command classification and parameter decoding.
//!
//! A completed [`CommandRecord`] is matched against an ordered name table to
//! produce a [`CommandId`], then decoded into an ephemeral [`CommandAnswer`]
//! holding each parameter's tag, raw bytes, integer reading and fixed-point
//! decimal reading. The table is plain data so integrators can swap in their
//! own catalog; [`BUILTIN_TABLE`] covers the stock ghead command set.

use heapless::Vec;

use crate::decode::{scan_decimal, scan_int, FixedDecimal};
use crate::parser::{CommandRecord, MAX_PARAMS};

/// Semantic identity of a classified command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    /// Periodic temperature / sensor report from the head (`M5000`).
    Temperature,
    /// Acknowledgement of a fan speed change (`M5001`).
    SetFanSpeed,
    /// Head seating status report (`M5002`).
    CheckHeadStatus,
    /// Filament sensor status report (`M5003`).
    CheckSensorStatus,
    /// 24V rail switch command and query (`M5004`, with and without `S`).
    Set24vSwitch,
    Check24vSwitch,
    /// 3.3V rail switch command and query (`M5005`, with and without `S`).
    Set3v3Switch,
    Check3v3Switch,
    /// Automatic temperature streaming control (`M9999`).
    AutoTemp,
    /// Multiplexed tool-head status line (`M5100`).
    ToolNormal,
    /// Head restarted and is announcing itself (`M5105`).
    Restart,
    /// Hot-end EEPROM read reply (`M5106`).
    HeatendRead,
    /// Hot-end EEPROM write reply (`M5107`).
    HeatendWrite,
    /// EEPROM format acknowledgement (`M5108`).
    FormatEeprom,
    /// Error-mode configuration acknowledgement (`M5109`).
    ErrModeSet,
    /// Firmware version query (`M115`).
    Version,
    /// Bench test hook (`MTEST`).
    BenchTest,
    /// Normal-mode restart announcement (`MSTART`).
    RestartNormal,
}

/// Constraint on the first parameter slot, used to tell apart commands that
/// share a name (a bare `M5004` is a query, `M5004 S1` is a switch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstParam {
    /// No constraint.
    Any,
    /// The command must carry no parameters.
    None,
    /// The first parameter must carry this tag with a non-empty value.
    Tag(u8),
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub first_param: FirstParam,
    pub id: CommandId,
}

const fn spec(name: &'static str, first_param: FirstParam, id: CommandId) -> CommandSpec {
    CommandSpec {
        name,
        first_param,
        id,
    }
}

/// Stock command catalog. Scanned in order; the first match wins.
pub const BUILTIN_TABLE: &[CommandSpec] = &[
    spec("M5000", FirstParam::Any, CommandId::Temperature),
    spec("M5001", FirstParam::Any, CommandId::SetFanSpeed),
    spec("M5002", FirstParam::Any, CommandId::CheckHeadStatus),
    spec("M5003", FirstParam::Any, CommandId::CheckSensorStatus),
    spec("M5004", FirstParam::Tag(b'S'), CommandId::Set24vSwitch),
    spec("M5004", FirstParam::None, CommandId::Check24vSwitch),
    spec("M5005", FirstParam::Tag(b'S'), CommandId::Set3v3Switch),
    spec("M5005", FirstParam::None, CommandId::Check3v3Switch),
    spec("M9999", FirstParam::Any, CommandId::AutoTemp),
    spec("M5100", FirstParam::Any, CommandId::ToolNormal),
    spec("M5105", FirstParam::Any, CommandId::Restart),
    spec("M5106", FirstParam::Any, CommandId::HeatendRead),
    spec("M5107", FirstParam::Any, CommandId::HeatendWrite),
    spec("M5108", FirstParam::Any, CommandId::FormatEeprom),
    spec("M5109", FirstParam::Any, CommandId::ErrModeSet),
    spec("M115", FirstParam::Any, CommandId::Version),
    spec("MTEST", FirstParam::Any, CommandId::BenchTest),
    spec("MSTART", FirstParam::Any, CommandId::RestartNormal),
];

/// Matches a record against `table` by exact name comparison.
///
/// Returns `None` for names not in the table; such commands are never
/// dispatched and produce no response.
pub fn classify(table: &[CommandSpec], rec: &CommandRecord) -> Option<CommandId> {
    table
        .iter()
        .find(|entry| {
            if rec.name() != entry.name.as_bytes() {
                return false;
            }
            match entry.first_param {
                FirstParam::Any => true,
                FirstParam::None => rec.params().is_empty(),
                FirstParam::Tag(tag) => rec
                    .params()
                    .first()
                    .is_some_and(|p| p.tag == tag && !p.value.is_empty()),
            }
        })
        .map(|entry| entry.id)
}

/// One decoded parameter of a classified command.
#[derive(Debug, Clone, Copy)]
pub struct DecodedParam<'a> {
    pub tag: u8,
    pub raw: &'a [u8],
    /// Integer reading: the numeric value when the parameter looks like a
    /// short number, or the letter code when it is a bare `A..=Z` value.
    pub int_val: Option<i32>,
    pub decimal: FixedDecimal,
}

/// Ephemeral decoded view of one command, discarded after dispatch.
pub struct CommandAnswer<'a> {
    pub id: CommandId,
    pub params: Vec<DecodedParam<'a>, MAX_PARAMS>,
}

impl<'a> CommandAnswer<'a> {
    pub fn decode(id: CommandId, rec: &'a CommandRecord) -> Self {
        let mut params = Vec::new();
        for slot in rec.params() {
            if slot.value.is_empty() {
                continue;
            }
            let raw: &[u8] = &slot.value;
            let first = raw[0];
            let numeric = (first.is_ascii_digit() || first == b'-') && raw.len() < 10;
            let decoded = DecodedParam {
                tag: slot.tag,
                raw,
                int_val: if numeric {
                    Some(scan_int(raw))
                } else if first.is_ascii_uppercase() {
                    Some(first as i32)
                } else {
                    None
                },
                decimal: if numeric {
                    scan_decimal(raw)
                } else {
                    FixedDecimal::default()
                },
            };
            // Slot count already bounded by the record.
            let _ = params.push(decoded);
        }
        CommandAnswer { id, params }
    }

    fn find(&self, tag: u8) -> Option<&DecodedParam<'a>> {
        self.params.iter().find(|p| p.tag == tag)
    }

    /// Integer value of the first parameter carrying `tag`.
    pub fn seen(&self, tag: u8) -> Option<i32> {
        self.find(tag).and_then(|p| p.int_val)
    }

    /// Fixed-point decimal value of the first parameter carrying `tag`.
    pub fn seen_decimal(&self, tag: u8) -> Option<FixedDecimal> {
        self.find(tag).filter(|p| p.int_val.is_some()).map(|p| p.decimal)
    }

    /// Raw bytes of the first parameter carrying `tag`.
    pub fn seen_raw(&self, tag: u8) -> Option<&'a [u8]> {
        self.find(tag).map(|p| p.raw)
    }
}
