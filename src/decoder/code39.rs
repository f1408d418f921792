//! Code 39
//!
//! Each character is nine runs, three of them wide, followed by a narrow
//! inter-character gap. Symbols are framed by `*`. Widths are classified by
//! raising a narrow/wide threshold until exactly three runs are wide.

use super::{SymbologyDecoder, has_quiet_zone};
use crate::error::DecodeError;
use crate::models::{BarPattern, CodeResult, DecodedCode, Direction};

const ALPHABET: &[u8; 44] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. *$/+%";

/// Wide-run bitmasks; bit 8 is the first bar
const ENCODINGS: [u16; 44] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, 0x109, 0x049, 0x148,
    0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, 0x103, 0x043, 0x142, 0x013, 0x112, 0x052,
    0x007, 0x106, 0x046, 0x016, 0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4,
    0x094, 0x0A8, 0x0A2, 0x08A, 0x02A,
];

/// Check value order; `*` has no value
const CHECK_ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

const ASTERISK: u16 = 0x094;
const ASTERISK_INDEX: u16 = 39;
/// Start, one character, stop, with gaps
const MIN_RUNS: usize = 9 * 3 + 2;
const MIN_WIDE_RATIO: f32 = 1.5;
const WIDE_MODULES: u8 = 3;

/// Code 39 reader (`code_39`), or with a verified mod-43 check character (`code_39_mod43`)
#[derive(Debug, Default, Clone, Copy)]
pub struct Code39Reader {
    check_digit: bool,
}

impl Code39Reader {
    /// Reader without a check character
    pub fn new() -> Self {
        Self { check_digit: false }
    }

    /// Reader that requires and strips a trailing mod-43 check character
    pub fn with_check_digit() -> Self {
        Self { check_digit: true }
    }

    fn find_start(&self, pattern: &BarPattern) -> Option<(usize, DecodedCode)> {
        let widths = pattern.widths();
        for i in 0..pattern.len().saturating_sub(8) {
            if !pattern.is_bar(i) {
                continue;
            }
            let Some((bits, error)) = classify(&widths[i..i + 9]) else {
                continue;
            };
            if bits != ASTERISK || !has_quiet_zone(pattern, i, pattern.sum(i, 9) as f32, 0.25) {
                continue;
            }
            let code = DecodedCode {
                code: ASTERISK_INDEX,
                start: pattern.offset(i),
                end: pattern.end(i + 8),
                error,
            };
            return Some((i, code));
        }
        None
    }
}

impl SymbologyDecoder for Code39Reader {
    fn format(&self) -> &'static str {
        if self.check_digit {
            "code_39_mod43"
        } else {
            "code_39"
        }
    }

    fn decode_forward(&self, pattern: &BarPattern) -> Result<CodeResult, DecodeError> {
        if pattern.len() < MIN_RUNS {
            return Err(DecodeError::TooShort);
        }
        let (start_run, start_info) = self.find_start(pattern).ok_or(DecodeError::NoStartPattern)?;
        let widths = pattern.widths();

        let mut codes = Vec::new();
        // skip the gap after each character
        let mut pos = start_run + 10;
        let end_info = loop {
            if pos + 9 > pattern.len() {
                return Err(DecodeError::NoStopPattern);
            }
            let (bits, error) =
                classify(&widths[pos..pos + 9]).ok_or(DecodeError::InvalidCode { position: pos })?;
            let index = ENCODINGS
                .iter()
                .position(|&e| e == bits)
                .ok_or(DecodeError::InvalidCode { position: pos })?;
            let code = DecodedCode {
                code: index as u16,
                start: pattern.offset(pos),
                end: pattern.end(pos + 8),
                error,
            };
            if bits == ASTERISK {
                let after = pos + 9;
                let quiet = after >= pattern.len()
                    || pattern.width(after) as f32 >= pattern.sum(pos, 9) as f32 / 4.0;
                if !quiet {
                    return Err(DecodeError::NoStopPattern);
                }
                break code;
            }
            codes.push(code);
            pos += 10;
        };

        if codes.is_empty() || (self.check_digit && codes.len() < 2) {
            return Err(DecodeError::TooShort);
        }
        let mut text: String = codes.iter().map(|c| char::from(ALPHABET[c.code as usize])).collect();

        if self.check_digit {
            let check = text.pop().ok_or(DecodeError::TooShort)?;
            let expected = mod43(&text).ok_or(DecodeError::InvalidCode { position: start_run })?;
            let actual = check_value(check).ok_or(DecodeError::InvalidCode { position: pos })?;
            if expected != actual {
                return Err(DecodeError::ChecksumMismatch {
                    expected: expected as u32,
                    actual: actual as u32,
                });
            }
        }

        Ok(CodeResult {
            code: text,
            format: self.format().to_string(),
            codeset: None,
            start: start_info.start,
            end: end_info.end,
            start_info,
            decoded_codes: codes,
            end_info,
            direction: Direction::Forward,
            checksum_valid: self.check_digit,
        })
    }
}

/// Classify nine runs into a wide-run bitmask and its width error.
///
/// The error is the mean deviation from the narrow and wide class means, in
/// narrow widths.
fn classify(widths: &[u32]) -> Option<(u16, f32)> {
    let mut max_narrow = 0;
    loop {
        max_narrow = widths.iter().copied().filter(|&w| w > max_narrow).min()?;
        let wide = widths.iter().filter(|&&w| w > max_narrow).count();
        if wide < 3 {
            return None;
        }
        if wide > 3 {
            continue;
        }

        let (mut narrow_sum, mut wide_sum) = (0u32, 0u32);
        let mut bits = 0u16;
        for &w in widths {
            bits <<= 1;
            if w > max_narrow {
                bits |= 1;
                wide_sum += w;
            } else {
                narrow_sum += w;
            }
        }
        let narrow_mean = narrow_sum as f32 / 6.0;
        let wide_mean = wide_sum as f32 / 3.0;
        if wide_mean < narrow_mean * MIN_WIDE_RATIO {
            return None;
        }
        let deviation: f32 = widths
            .iter()
            .map(|&w| {
                let mean = if w > max_narrow { wide_mean } else { narrow_mean };
                (w as f32 - mean).abs()
            })
            .sum();
        return Some((bits, deviation / (9.0 * narrow_mean)));
    }
}

fn check_value(c: char) -> Option<u8> {
    CHECK_ALPHABET
        .iter()
        .position(|&a| char::from(a) == c)
        .map(|i| i as u8)
}

fn mod43(text: &str) -> Option<u8> {
    let mut sum = 0u32;
    for c in text.chars() {
        sum += check_value(c)? as u32;
    }
    Some((sum % 43) as u8)
}

/// Module widths for `*text*`, 3:1 wide ratio, optional mod-43 check character.
///
/// Returns `None` when `text` holds characters outside the Code 39 set.
pub fn encode(text: &str, with_check: bool) -> Option<Vec<u8>> {
    let mut body = text.to_string();
    if with_check {
        let check = mod43(text)?;
        body.push(char::from(CHECK_ALPHABET[check as usize]));
    }

    let mut modules = Vec::with_capacity((body.len() + 2) * 10);
    push_char(&mut modules, ASTERISK);
    for c in body.chars() {
        if c == '*' {
            return None;
        }
        let index = ALPHABET.iter().position(|&a| char::from(a) == c)?;
        modules.push(1);
        push_char(&mut modules, ENCODINGS[index]);
    }
    modules.push(1);
    push_char(&mut modules, ASTERISK);
    Some(modules)
}

fn push_char(modules: &mut Vec<u8>, bits: u16) {
    for k in (0..9).rev() {
        modules.push(if (bits >> k) & 1 == 1 { WIDE_MODULES } else { 1 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::modules_to_pattern;

    /// Deterministic pseudo-random values for sweeps
    fn lcg(seed: &mut u32) -> u32 {
        *seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
        *seed >> 16
    }

    #[test]
    fn test_round_trip_sweep() {
        let mut seed = 3u32;
        for len in 1..=16usize {
            let text: String = (0..len)
                .map(|_| char::from(CHECK_ALPHABET[(lcg(&mut seed) % 43) as usize]))
                .collect();
            let readers = [
                (Code39Reader::new(), encode(&text, false).unwrap()),
                (Code39Reader::with_check_digit(), encode(&text, true).unwrap()),
            ];
            for (reader, modules) in readers {
                for unit in [1, 2, 3] {
                    let pattern = modules_to_pattern(&modules, unit, 10);
                    let forward = reader.decode(&pattern).unwrap();
                    assert_eq!(forward.code, text, "{} unit {}", reader.format(), unit);
                    assert_eq!(forward.checksum_valid, reader.check_digit);

                    let reverse = reader.decode(&pattern.reversed()).unwrap();
                    assert_eq!(reverse.code, text, "{} unit {} reversed", reader.format(), unit);
                    assert_eq!(reverse.direction, Direction::Reverse);
                }
            }
        }
    }

    #[test]
    fn test_every_encoding_has_three_wide() {
        for e in ENCODINGS {
            assert_eq!(e.count_ones(), 3);
        }
    }

    #[test]
    fn test_decode() {
        let pattern = modules_to_pattern(&encode("CODE-39", false).unwrap(), 2, 10);
        let result = Code39Reader::new().decode(&pattern).unwrap();
        assert_eq!(result.code, "CODE-39");
        assert_eq!(result.format, "code_39");
        assert!(!result.checksum_valid);
        assert_eq!(result.decoded_codes.len(), 7);
    }

    #[test]
    fn test_decode_reversed() {
        let pattern = modules_to_pattern(&encode("A1 B2", false).unwrap(), 3, 10);
        let result = Code39Reader::new().decode(&pattern.reversed()).unwrap();
        assert_eq!(result.code, "A1 B2");
        assert_eq!(result.direction, Direction::Reverse);
    }

    #[test]
    fn test_mod43_check() {
        // CODE39 sums to 12 + 24 + 13 + 14 + 3 + 9 = 75; 75 mod 43 = 32 -> W
        assert_eq!(mod43("CODE39"), Some(32));
        let pattern = modules_to_pattern(&encode("CODE39", true).unwrap(), 2, 10);
        let result = Code39Reader::with_check_digit().decode(&pattern).unwrap();
        assert_eq!(result.code, "CODE39");
        assert_eq!(result.format, "code_39_mod43");
        assert!(result.checksum_valid);

        // the plain reader keeps the check character as data
        let plain = Code39Reader::new().decode(&pattern).unwrap();
        assert_eq!(plain.code, "CODE39W");
        assert_eq!(plain.format, "code_39");
    }

    #[test]
    fn test_mod43_mismatch() {
        let pattern = modules_to_pattern(&encode("CODE39X", false).unwrap(), 2, 10);
        assert_eq!(
            Code39Reader::with_check_digit().decode(&pattern).unwrap_err(),
            DecodeError::ChecksumMismatch {
                expected: 32,
                actual: 33
            }
        );
    }

    #[test]
    fn test_classify_rejects_low_ratio() {
        assert!(classify(&[2, 2, 2, 2, 2, 2, 2, 2, 2]).is_none());
        assert!(classify(&[4, 5, 4, 4, 5, 4, 4, 5, 4]).is_none());
        let (bits, error) = classify(&[2, 2, 2, 6, 6, 2, 6, 2, 2]).unwrap();
        assert_eq!(bits, 0x034);
        assert!(error < 1e-6);
    }

    #[test]
    fn test_encode_rejects_lowercase() {
        assert!(encode("abc", false).is_none());
        assert!(encode("A*B", false).is_none());
    }
}
