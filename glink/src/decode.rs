//! Numeric decoding of parameter values.
//!
//! Parameter values arrive as short ASCII strings. Each one is decoded two
//! ways: as a plain integer when it looks like one, and through a fixed-point
//! decimal scanner that avoids floating point entirely, keeping the integer
//! and fractional digits separate.

/// Fixed-point decimal value.
///
/// `int_part` holds the magnitude before the point, `frac_part` the digits
/// after it as a plain integer, with `frac_digits` recording how many there
/// were (so `12.05` and `12.5` stay distinguishable). The sign lives in
/// `negative`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedDecimal {
    pub int_part: i32,
    pub frac_part: i32,
    pub frac_digits: u8,
    pub negative: bool,
}

impl FixedDecimal {
    /// True when at least one digit after the decimal point was seen.
    pub fn has_frac(&self) -> bool {
        self.frac_digits > 0
    }

    fn frac_digit(&self, n: u8) -> i32 {
        if n >= self.frac_digits {
            return 0;
        }
        let mut v = self.frac_part;
        for _ in 0..(self.frac_digits - 1 - n) {
            v /= 10;
        }
        v % 10
    }

    /// Collapses the value to a signed integer in units of `1/scale`.
    ///
    /// Supported scales are 1, 10 and 100; anything else falls back to the
    /// integer part. `scan_decimal(b"25.1").scaled(10)` is `251`. Values too
    /// large for the scale saturate instead of wrapping.
    pub fn scaled(&self, scale: u32) -> i32 {
        let v = match scale {
            1 => self.int_part,
            10 => self
                .int_part
                .saturating_mul(10)
                .saturating_add(self.frac_digit(0)),
            100 => self
                .int_part
                .saturating_mul(100)
                .saturating_add(self.frac_digit(0) * 10)
                .saturating_add(self.frac_digit(1)),
            _ => self.int_part,
        };
        if self.negative {
            v.saturating_neg()
        } else {
            v
        }
    }
}

/// Scans a fixed-point decimal prefix of `bytes`.
///
/// Accepts an optional run of spaces before the first significant digit, an
/// optional leading minus, digits, and at most one decimal point. Scanning
/// stops at the second point or at any other unexpected byte, keeping what
/// was parsed so far; a value with no recognized numeric prefix decodes to
/// zero.
pub fn scan_decimal(bytes: &[u8]) -> FixedDecimal {
    let mut val = FixedDecimal::default();
    let mut seen_point = false;
    let mut significant = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'0'..=b'9' => {
                if b >= b'1' {
                    significant = true;
                }
                let d = (b - b'0') as i32;
                if seen_point {
                    val.frac_part = val.frac_part.saturating_mul(10).saturating_add(d);
                    val.frac_digits += 1;
                } else {
                    val.int_part = val.int_part.saturating_mul(10).saturating_add(d);
                }
            }
            b'.' => {
                if seen_point {
                    break;
                }
                seen_point = true;
            }
            b'-' if i == 0 => val.negative = true,
            b' ' if !significant => continue,
            _ => break,
        }
    }
    val
}

/// Plain ASCII integer scan, `atoi` style.
///
/// Reads an optional leading minus and then digits, stopping at the first
/// byte that is neither. An empty or non-numeric prefix yields 0.
pub fn scan_int(bytes: &[u8]) -> i32 {
    let mut val: i32 = 0;
    let mut negative = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'-' if i == 0 => negative = true,
            b'0'..=b'9' => val = val.wrapping_mul(10).wrapping_add((b - b'0') as i32),
            _ => break,
        }
    }
    if negative {
        -val
    } else {
        val
    }
}
