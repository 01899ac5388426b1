//! Byte-at-a-time command line parser.
//!
//! Incoming lines follow a G-code derived grammar, one command per line:
//!
//! ```text
//! M<name> [<LETTER><value>[ <LETTER><value>]*][*<crc-decimal>]
//! ```
//!
//! terminated by `\r`, `\n` or NUL. The parser is a finite-state machine fed
//! one byte at a time from the receive interrupt. A finished line becomes a
//! [`CommandRecord`]; any grammar violation or field overflow silently
//! discards the partial line and resumes scanning for the next `M`, so a
//! half-formed line is never surfaced downstream.
//!
//! The optional `*<crc>` trailer is a decimal rendering (up to three digits)
//! of an 8-bit XOR checksum over every byte from the leading `M` up to, but
//! not including, the `*`. The raw bytes are mirrored into a replay buffer
//! while parsing so the checksum can be recomputed on completion.

use heapless::Vec;

use crate::decode::scan_int;

/// Maximum command name length, including the leading `M`.
pub const MAX_NAME: usize = 14;
/// Maximum length of one parameter value.
pub const MAX_VALUE: usize = 65;
/// Maximum number of parameter slots per command.
pub const MAX_PARAMS: usize = 5;
/// Capacity of the raw replay buffer used for CRC verification.
pub const MAX_REPLAY: usize = 64;
/// Maximum captured CRC digits (the checksum is 0..=255).
pub const MAX_CRC_DIGITS: usize = 3;

fn is_terminator(b: u8) -> bool {
    b == b'\r' || b == b'\n' || b == 0
}

/// One parsed parameter: a single-letter type tag plus its value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub tag: u8,
    pub value: Vec<u8, MAX_VALUE>,
}

/// A completed (or in-progress) command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    name: Vec<u8, MAX_NAME>,
    params: Vec<ParamSlot, MAX_PARAMS>,
    replay: Vec<u8, MAX_REPLAY>,
    crc_text: Vec<u8, MAX_CRC_DIGITS>,
    has_crc: bool,
}

impl CommandRecord {
    const fn empty() -> Self {
        CommandRecord {
            name: Vec::new(),
            params: Vec::new(),
            replay: Vec::new(),
            crc_text: Vec::new(),
            has_crc: false,
        }
    }

    /// Command name bytes, including the leading `M`.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn params(&self) -> &[ParamSlot] {
        &self.params
    }

    /// Looks up the first parameter carrying `tag`. Repeated tags are not
    /// supported; the first match wins.
    pub fn param(&self, tag: u8) -> Option<&ParamSlot> {
        self.params.iter().find(|p| p.tag == tag)
    }

    pub fn has_crc(&self) -> bool {
        self.has_crc
    }

    /// Verifies the CRC trailer, if one was captured.
    ///
    /// Lines without a trailer always pass. The expected value is the
    /// decimal text after `*`; the actual value is the XOR fold of the
    /// replayed line bytes.
    pub fn crc_valid(&self) -> bool {
        if !self.has_crc {
            return true;
        }
        let expected = scan_int(&self.crc_text) as u8;
        let actual = self.replay.iter().fold(0u8, |crc, b| crc ^ b);
        expected == actual
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Idle,
    Name,
    ParamTag,
    ParamValue,
    Crc,
}

/// The per-port receive state machine.
pub struct LineParser {
    step: Step,
    cur: CommandRecord,
}

impl LineParser {
    pub const fn new() -> Self {
        LineParser {
            step: Step::Idle,
            cur: CommandRecord::empty(),
        }
    }

    fn discard(&mut self) {
        self.cur = CommandRecord::empty();
        self.step = Step::Idle;
    }

    fn complete(&mut self) -> Option<CommandRecord> {
        self.step = Step::Idle;
        Some(core::mem::replace(&mut self.cur, CommandRecord::empty()))
    }

    fn replay(&mut self, b: u8) {
        // Lines longer than the replay window cannot checksum correctly;
        // excess bytes are simply not recorded.
        let _ = self.cur.replay.push(b);
    }

    /// Feeds one received byte.
    ///
    /// Runs synchronously in the receive interrupt. While `blocked` is true
    /// (a previous line is still pending dispatch) no new line may start and
    /// incoming bytes are ignored, which bounds memory to one in-flight
    /// record per port. Returns the finished record when the byte completed
    /// a line.
    pub fn feed(&mut self, byte: u8, blocked: bool) -> Option<CommandRecord> {
        match self.step {
            Step::Idle => {
                if byte == b'M' && !blocked {
                    self.cur = CommandRecord::empty();
                    let _ = self.cur.name.push(byte);
                    self.replay(byte);
                    self.step = Step::Name;
                }
                None
            }
            Step::Name => {
                if is_terminator(byte) {
                    // Bare command, no parameters.
                    self.complete()
                } else if byte == b' ' {
                    self.replay(byte);
                    self.step = Step::ParamTag;
                    None
                } else if byte > b'Z' {
                    self.discard();
                    None
                } else if self.cur.name.push(byte).is_err() {
                    self.discard();
                    None
                } else {
                    self.replay(byte);
                    None
                }
            }
            Step::ParamTag => {
                if byte.is_ascii_uppercase() {
                    let slot = ParamSlot {
                        tag: byte,
                        value: Vec::new(),
                    };
                    // Entered only while a slot is free, so this cannot fail.
                    let _ = self.cur.params.push(slot);
                    self.replay(byte);
                    self.step = Step::ParamValue;
                    None
                } else if is_terminator(byte) {
                    // Trailing bare parameter marker.
                    self.complete()
                } else {
                    self.discard();
                    None
                }
            }
            Step::ParamValue => {
                if byte == b'*' {
                    self.cur.has_crc = true;
                    self.cur.crc_text.clear();
                    self.step = Step::Crc;
                    None
                } else if is_terminator(byte) {
                    self.complete()
                } else if byte == b' ' {
                    if self.cur.params.len() < MAX_PARAMS {
                        self.replay(byte);
                        self.step = Step::ParamTag;
                        None
                    } else {
                        self.complete()
                    }
                } else if byte <= b'~' {
                    let pushed = match self.cur.params.last_mut() {
                        Some(slot) => slot.value.push(byte).is_ok(),
                        None => false,
                    };
                    if pushed {
                        self.replay(byte);
                    } else {
                        self.discard();
                    }
                    None
                } else {
                    self.discard();
                    None
                }
            }
            Step::Crc => {
                if byte.is_ascii_digit() && self.cur.crc_text.len() < MAX_CRC_DIGITS {
                    let _ = self.cur.crc_text.push(byte);
                    None
                } else if is_terminator(byte) || self.cur.crc_text.len() >= MAX_CRC_DIGITS {
                    self.complete()
                } else {
                    // Stray bytes in the trailer are skipped.
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_line(parser: &mut LineParser, line: &[u8]) -> Option<CommandRecord> {
        let mut done = None;
        for &b in line {
            if let Some(rec) = parser.feed(b, false) {
                assert!(done.is_none(), "more than one record from a single line");
                done = Some(rec);
            }
        }
        done
    }

    fn xor(line: &[u8]) -> u8 {
        line.iter().fold(0u8, |crc, b| crc ^ b)
    }

    #[test]
    fn stream_without_m_never_completes() {
        let mut parser = LineParser::new();
        assert!(feed_line(&mut parser, b"G28 X0 Y0\r\nT0 S1\n\0").is_none());
    }

    #[test]
    fn minimal_line_yields_bare_record() {
        let mut parser = LineParser::new();
        let rec = feed_line(&mut parser, b"M115\r").unwrap();
        assert_eq!(rec.name(), b"M115");
        assert!(rec.params().is_empty());
        assert!(!rec.has_crc());
        assert!(rec.crc_valid());
    }

    #[test]
    fn parameters_are_captured_per_slot() {
        let mut parser = LineParser::new();
        let rec = feed_line(&mut parser, b"M5100 H0 T25.5\n").unwrap();
        assert_eq!(rec.name(), b"M5100");
        assert_eq!(rec.params().len(), 2);
        assert_eq!(&rec.param(b'H').unwrap().value[..], b"0");
        assert_eq!(&rec.param(b'T').unwrap().value[..], b"25.5");
        assert!(rec.param(b'S').is_none());
    }

    #[test]
    fn valid_crc_trailer_passes() {
        let mut parser = LineParser::new();
        let payload = b"M5000 S100 K0";
        let mut line = payload.to_vec();
        line.extend(format!("*{}\r", xor(payload)).bytes());
        let rec = feed_line(&mut parser, &line).unwrap();
        assert!(rec.has_crc());
        assert!(rec.crc_valid());
        assert_eq!(&rec.param(b'S').unwrap().value[..], b"100");
        assert_eq!(&rec.param(b'K').unwrap().value[..], b"0");
    }

    #[test]
    fn wrong_crc_trailer_fails_verification() {
        let mut parser = LineParser::new();
        let payload = b"M5000 S100 K0";
        let mut line = payload.to_vec();
        line.extend(format!("*{}\r", xor(payload) ^ 1).bytes());
        let rec = feed_line(&mut parser, &line).unwrap();
        assert!(!rec.crc_valid());
    }

    #[test]
    fn crc_capture_stops_after_three_digits() {
        let mut parser = LineParser::new();
        // The fourth digit terminates the trailer instead of extending it.
        let rec = feed_line(&mut parser, b"M5000 S1*1234").unwrap();
        assert!(rec.has_crc());
        assert!(!rec.crc_valid());
    }

    #[test]
    fn lowercase_in_name_discards_the_line() {
        let mut parser = LineParser::new();
        assert!(feed_line(&mut parser, b"M5a00 S1\r").is_none());
        // The parser recovered and accepts the next line.
        assert!(feed_line(&mut parser, b"M115\r").is_some());
    }

    #[test]
    fn oversized_name_discards_the_line() {
        let mut parser = LineParser::new();
        assert!(feed_line(&mut parser, b"M12345678901234X\r").is_none());
        assert!(feed_line(&mut parser, b"M115\r").is_some());
    }

    #[test]
    fn oversized_value_discards_the_line() {
        let mut parser = LineParser::new();
        let mut line = b"M5000 S".to_vec();
        line.extend(core::iter::repeat(b'1').take(MAX_VALUE + 1));
        line.push(b'\r');
        assert!(feed_line(&mut parser, &line).is_none());
        assert!(feed_line(&mut parser, b"M115\r").is_some());
    }

    #[test]
    fn punctuated_values_append_byte_by_byte() {
        let mut parser = LineParser::new();
        let rec = feed_line(&mut parser, b"M5106 H0 A1f V0.5\r").unwrap();
        assert_eq!(&rec.param(b'A').unwrap().value[..], b"1f");
        assert_eq!(&rec.param(b'V').unwrap().value[..], b"0.5");
    }

    #[test]
    fn sixth_parameter_space_completes_the_line() {
        let mut parser = LineParser::new();
        let rec = feed_line(&mut parser, b"M5100 A1 B2 C3 D4 E5 F6\r").unwrap();
        assert_eq!(rec.params().len(), MAX_PARAMS);
        assert!(rec.param(b'F').is_none());
    }

    #[test]
    fn blocked_parser_ignores_new_lines() {
        let mut parser = LineParser::new();
        for &b in b"M115\r" {
            assert!(parser.feed(b, true).is_none());
        }
        // Unblocked again, a fresh line parses normally.
        assert!(feed_line(&mut parser, b"M115\r").is_some());
    }

    #[test]
    fn trailing_bare_tag_marker_completes() {
        let mut parser = LineParser::new();
        let rec = feed_line(&mut parser, b"M5004 \r").unwrap();
        assert_eq!(rec.name(), b"M5004");
        assert!(rec.params().is_empty());
    }
}
