//! Code 128
//!
//! Symbols are six runs (three bars, three spaces) spanning 11 modules; the
//! stop pattern has a seventh run and spans 13. The check value is the start
//! value plus each data value weighted by its position, mod 103.

use super::{SymbologyDecoder, best_match, has_quiet_zone, pattern_error};
use crate::error::DecodeError;
use crate::models::{BarPattern, CodeResult, DecodedCode, Direction};

/// Run widths for values 0..=105; 103..=105 are START A/B/C.
const PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1], [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1], [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2],
];

/// Stop pattern, including the terminating bar
const STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];
/// First six stop runs; also 11 modules wide and outside the data codebook
const STOP_HEAD: [u8; 6] = [2, 3, 3, 1, 1, 1];

const FNC3: u16 = 96;
const FNC2: u16 = 97;
const SHIFT: u16 = 98;
const CODE_C: u16 = 99;
const CODE_B: u16 = 100;
const CODE_A: u16 = 101;
const FNC1: u16 = 102;
const START_A: u16 = 103;
const START_B: u16 = 104;
const START_C: u16 = 105;
const STOP_CODE: u16 = 106;

/// Start, check and stop
const MIN_RUNS: usize = 6 + 6 + 7;
/// Start patterns must match tightly; a reversed stop differs by 0.33
const MAX_START_ERROR: f32 = 0.25;
const MAX_CODE_ERROR: f32 = 0.5;
const MAX_STOP_ERROR: f32 = 0.4;
/// Minimum blank space before the start pattern
const QUIET_MODULES: f32 = 5.0;

/// Group separator emitted for FNC1 after the first position
const GS: char = '\u{1d}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn from_start(value: u16) -> Option<Self> {
        match value {
            START_A => Some(CodeSet::A),
            START_B => Some(CodeSet::B),
            START_C => Some(CodeSet::C),
            _ => None,
        }
    }

    /// The value that switches into this set
    fn switch_value(self) -> u8 {
        match self {
            CodeSet::A => CODE_A as u8,
            CodeSet::B => CODE_B as u8,
            CodeSet::C => CODE_C as u8,
        }
    }
}

/// Code 128 reader (`code_128`)
#[derive(Debug, Default, Clone, Copy)]
pub struct Code128Reader;

impl Code128Reader {
    /// Create a reader
    pub fn new() -> Self {
        Self
    }

    fn find_start(&self, pattern: &BarPattern) -> Option<(usize, DecodedCode)> {
        let widths = pattern.widths();
        let starts = &PATTERNS[START_A as usize..=START_C as usize];
        for i in 0..=pattern.len().saturating_sub(6) {
            if i + 6 > pattern.len() || !pattern.is_bar(i) {
                continue;
            }
            let (index, error) = best_match(&widths[i..i + 6], starts);
            if error > MAX_START_ERROR {
                continue;
            }
            let module = pattern.sum(i, 6) as f32 / 11.0;
            if !has_quiet_zone(pattern, i, module, QUIET_MODULES) {
                continue;
            }
            let code = DecodedCode {
                code: START_A + index as u16,
                start: pattern.offset(i),
                end: pattern.end(i + 5),
                error,
            };
            return Some((i, code));
        }
        None
    }
}

impl SymbologyDecoder for Code128Reader {
    fn format(&self) -> &'static str {
        "code_128"
    }

    fn decode_forward(&self, pattern: &BarPattern) -> Result<CodeResult, DecodeError> {
        if pattern.len() < MIN_RUNS {
            return Err(DecodeError::TooShort);
        }
        let (start_run, start_info) = self.find_start(pattern).ok_or(DecodeError::NoStartPattern)?;
        let widths = pattern.widths();
        let data_run = start_run + 6;

        let mut codes = Vec::new();
        let mut pos = data_run;
        let end_info = loop {
            if pos + 6 > pattern.len() {
                return Err(DecodeError::NoStopPattern);
            }
            let (value, error) = best_match(&widths[pos..pos + 6], &PATTERNS[..START_A as usize]);
            if pattern_error(&widths[pos..pos + 6], &STOP_HEAD) < error {
                if pos + 7 > pattern.len() {
                    return Err(DecodeError::NoStopPattern);
                }
                let stop_error = pattern_error(&widths[pos..pos + 7], &STOP);
                if stop_error > MAX_STOP_ERROR {
                    return Err(DecodeError::InvalidCode { position: pos });
                }
                break DecodedCode {
                    code: STOP_CODE,
                    start: pattern.offset(pos),
                    end: pattern.end(pos + 6),
                    error: stop_error,
                };
            }
            if error > MAX_CODE_ERROR {
                return Err(DecodeError::InvalidCode { position: pos });
            }
            codes.push(DecodedCode {
                code: value as u16,
                start: pattern.offset(pos),
                end: pattern.end(pos + 5),
                error,
            });
            pos += 6;
        };

        // a check value alone carries no data
        let Some((check, data)) = codes.split_last().filter(|(_, data)| !data.is_empty()) else {
            return Err(DecodeError::TooShort);
        };
        let values: Vec<u16> = data.iter().map(|c| c.code).collect();
        let expected = checksum(start_info.code, &values);
        if expected != check.code {
            return Err(DecodeError::ChecksumMismatch {
                expected: expected as u32,
                actual: check.code as u32,
            });
        }

        let set = CodeSet::from_start(start_info.code).ok_or(DecodeError::NoStartPattern)?;
        let text = values_to_text(set, &values, data_run)?;
        Ok(CodeResult {
            code: text,
            format: self.format().to_string(),
            codeset: Some(set.switch_value()),
            start: start_info.start,
            end: end_info.end,
            start_info,
            decoded_codes: codes,
            end_info,
            direction: Direction::Forward,
            checksum_valid: true,
        })
    }
}

fn checksum(start: u16, data: &[u16]) -> u16 {
    let weighted: u32 = data
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as u32 + 1) * v as u32)
        .sum();
    ((start as u32 + weighted) % 103) as u16
}

/// Interpret data values; `first_run` locates errors in the pattern
fn values_to_text(start: CodeSet, values: &[u16], first_run: usize) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(values.len() * 2);
    let mut set = start;
    let mut shifted: Option<CodeSet> = None;

    for (i, &v) in values.iter().enumerate() {
        let active = shifted.take().unwrap_or(set);
        match (active, v) {
            (_, FNC1) => {
                if i > 0 {
                    out.push(GS);
                }
            }
            (CodeSet::C, 0..=99) => {
                out.push(char::from(b'0' + (v / 10) as u8));
                out.push(char::from(b'0' + (v % 10) as u8));
            }
            (CodeSet::C, CODE_B) => set = CodeSet::B,
            (CodeSet::C, CODE_A) => set = CodeSet::A,
            (CodeSet::A, 0..=63) => out.push(char::from(v as u8 + 32)),
            (CodeSet::A, 64..=95) => out.push(char::from(v as u8 - 64)),
            (CodeSet::B, 0..=95) => out.push(char::from(v as u8 + 32)),
            (_, FNC3 | FNC2) => {}
            (CodeSet::A, SHIFT) => shifted = Some(CodeSet::B),
            (CodeSet::B, SHIFT) => shifted = Some(CodeSet::A),
            (_, CODE_C) => set = CodeSet::C,
            (CodeSet::A, CODE_B) => set = CodeSet::B,
            (CodeSet::B, CODE_A) => set = CodeSet::A,
            // FNC4
            (CodeSet::A, CODE_A) | (CodeSet::B, CODE_B) => {}
            _ => {
                return Err(DecodeError::InvalidCode {
                    position: first_run + 6 * i,
                });
            }
        }
    }
    Ok(out)
}

/// Codeword values for `text`: start, data and check.
///
/// Even-length digit strings use set C, printable ASCII set B, and text with
/// control characters set A. Returns `None` for empty or non-encodable text.
pub fn encode_values(text: &str) -> Option<Vec<u16>> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let (start, data): (u16, Vec<u16>) =
        if bytes.len() % 2 == 0 && bytes.iter().all(u8::is_ascii_digit) {
            let pairs = bytes
                .chunks(2)
                .map(|p| ((p[0] - b'0') * 10 + (p[1] - b'0')) as u16)
                .collect();
            (START_C, pairs)
        } else if bytes.iter().all(|b| (32..128).contains(b)) {
            (START_B, bytes.iter().map(|&b| (b - 32) as u16).collect())
        } else if bytes.iter().all(|&b| b < 96) {
            let values = bytes
                .iter()
                .map(|&b| if b < 32 { b as u16 + 64 } else { b as u16 - 32 })
                .collect();
            (START_A, values)
        } else {
            return None;
        };

    let check = checksum(start, &data);
    let mut values = Vec::with_capacity(data.len() + 2);
    values.push(start);
    values.extend(data);
    values.push(check);
    Some(values)
}

/// Module widths for a value sequence, stop pattern appended
pub fn modules_for_values(values: &[u16]) -> Option<Vec<u8>> {
    let mut modules = Vec::with_capacity(values.len() * 6 + 7);
    for &v in values {
        modules.extend_from_slice(PATTERNS.get(v as usize)?);
    }
    modules.extend_from_slice(&STOP);
    Some(modules)
}

/// Module widths encoding `text`
pub fn encode(text: &str) -> Option<Vec<u8>> {
    modules_for_values(&encode_values(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::modules_to_pattern;

    fn pattern_for(text: &str, unit: u32) -> BarPattern {
        modules_to_pattern(&encode(text).unwrap(), unit, 10)
    }

    /// Deterministic pseudo-random values for sweeps
    fn lcg(seed: &mut u32) -> u32 {
        *seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
        *seed >> 16
    }

    #[test]
    fn test_round_trip_sweep() {
        let mut seed = 7u32;
        for len in 1..=24usize {
            let printable: String = (0..len)
                .map(|_| char::from(32 + (lcg(&mut seed) % 95) as u8))
                .collect();
            let digits: String = (0..2 * len)
                .map(|_| char::from(b'0' + (lcg(&mut seed) % 10) as u8))
                .collect();
            let mut control: Vec<u8> = (0..len).map(|_| (lcg(&mut seed) % 96) as u8).collect();
            control[len / 2] = (lcg(&mut seed) % 32) as u8;
            let control = String::from_utf8(control).unwrap();

            for (text, set) in [(printable, None), (digits, Some(99)), (control, Some(101))] {
                for unit in [1, 3] {
                    let pattern = pattern_for(&text, unit);
                    let forward = Code128Reader.decode(&pattern).unwrap();
                    assert_eq!(forward.code, text, "unit {}", unit);
                    assert_eq!(forward.direction, Direction::Forward);
                    if set.is_some() {
                        assert_eq!(forward.codeset, set);
                    }

                    let reverse = Code128Reader.decode(&pattern.reversed()).unwrap();
                    assert_eq!(reverse.code, text, "unit {} reversed", unit);
                    assert_eq!(reverse.direction, Direction::Reverse);
                }
            }
        }
    }

    #[test]
    fn test_patterns_span_eleven_modules() {
        for p in PATTERNS.iter() {
            assert_eq!(p.iter().map(|&m| m as u32).sum::<u32>(), 11);
        }
    }

    #[test]
    fn test_decode_set_c() {
        let result = Code128Reader.decode(&pattern_for("123456", 2)).unwrap();
        assert_eq!(result.code, "123456");
        assert_eq!(result.format, "code_128");
        assert_eq!(result.codeset, Some(99));
        assert_eq!(result.direction, Direction::Forward);
        assert!(result.checksum_valid);
        // three data values plus the check value
        assert_eq!(result.decoded_codes.len(), 4);
        assert_eq!(result.start, 20);
    }

    #[test]
    fn test_decode_set_b_text() {
        let result = Code128Reader.decode(&pattern_for("Hello-42", 3)).unwrap();
        assert_eq!(result.code, "Hello-42");
        assert_eq!(result.codeset, Some(100));
    }

    #[test]
    fn test_decode_set_a_control() {
        let result = Code128Reader.decode(&pattern_for("A\tB", 2)).unwrap();
        assert_eq!(result.code, "A\tB");
        assert_eq!(result.codeset, Some(101));
    }

    #[test]
    fn test_shift_and_fnc1() {
        // FNC1 (leading, dropped), 'a', SHIFT, tab from set A, CODE C, 42, FNC1
        let data = [FNC1, 65, SHIFT, 73, CODE_C, 42, FNC1];
        let mut values = vec![START_B];
        values.extend_from_slice(&data);
        values.push(checksum(START_B, &data));
        let pattern = modules_to_pattern(&modules_for_values(&values).unwrap(), 2, 10);
        let result = Code128Reader.decode(&pattern).unwrap();
        assert_eq!(result.code, "a\t42\u{1d}");
    }

    #[test]
    fn test_reverse_reading() {
        let forward = pattern_for("123456", 2);
        let result = Code128Reader.decode(&forward.reversed()).unwrap();
        assert_eq!(result.code, "123456");
        assert_eq!(result.direction, Direction::Reverse);
        // the stop pattern now comes first in scanline order
        assert!(result.end_info.start < result.start_info.start);
        assert_eq!(result.start, 20);
    }

    #[test]
    fn test_single_corrupted_value_fails_checksum() {
        let mut values = encode_values("123456").unwrap();
        let check = *values.last().unwrap();
        values[2] = 35;
        let pattern = modules_to_pattern(&modules_for_values(&values).unwrap(), 2, 10);
        let err = Code128Reader.decode(&pattern).unwrap_err();
        let expected = checksum(START_C, &[12, 35, 56]);
        assert_eq!(
            err,
            DecodeError::ChecksumMismatch {
                expected: expected as u32,
                actual: check as u32
            }
        );
    }

    #[test]
    fn test_jittered_widths() {
        let modules = encode("ABC123").unwrap();
        let mut widths = vec![40];
        for (i, &m) in modules.iter().enumerate() {
            let base = m as u32 * 4;
            widths.push(match i % 3 {
                0 => base + 1,
                1 => base - 1,
                _ => base,
            });
        }
        widths.push(40);
        let pattern = BarPattern::from_widths(false, widths);
        assert_eq!(Code128Reader.decode(&pattern).unwrap().code, "ABC123");
    }

    #[test]
    fn test_missing_stop() {
        let full = pattern_for("123456", 2);
        let kept = full.widths()[..full.len() - 8].to_vec();
        let pattern = BarPattern::from_widths(false, kept);
        assert_eq!(
            Code128Reader.decode(&pattern).unwrap_err(),
            DecodeError::NoStopPattern
        );
    }

    #[test]
    fn test_no_start_and_too_short() {
        let flat = BarPattern::from_widths(false, vec![2; 40]);
        assert_eq!(
            Code128Reader.decode(&flat).unwrap_err(),
            DecodeError::NoStartPattern
        );
        let short = BarPattern::from_widths(false, vec![2; 5]);
        assert_eq!(Code128Reader.decode(&short).unwrap_err(), DecodeError::TooShort);
    }

    #[test]
    fn test_symbol_without_data_is_rejected() {
        // START C followed directly by its own check value (105 mod 103)
        let values = [START_C, 2];
        assert_eq!(checksum(START_C, &[]), 2);
        let pattern = modules_to_pattern(&modules_for_values(&values).unwrap(), 2, 10);
        assert_eq!(
            Code128Reader.decode_forward(&pattern).unwrap_err(),
            DecodeError::TooShort
        );
        assert!(Code128Reader.decode(&pattern).is_err());
    }

    #[test]
    fn test_encode_rejects_non_ascii() {
        assert!(encode_values("").is_none());
        assert!(encode_values("h\u{e9}llo").is_none());
        assert_eq!(encode_values("12").unwrap(), vec![START_C, 12, (105 + 12) % 103]);
    }
}
