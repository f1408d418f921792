//! EAN-13, EAN-8 and UPC-A
//!
//! Digits are four runs over seven modules. The left half of an EAN-13 mixes
//! L and G codes, and the mix encodes the implicit first digit; everything
//! else uses L widths (R codes are L with colours swapped, which run widths
//! cannot see). UPC-A is EAN-13 with a leading zero.

use super::{SymbologyDecoder, best_match, has_quiet_zone, pattern_error};
use crate::error::DecodeError;
use crate::models::{BarPattern, CodeResult, DecodedCode, Direction};

/// L (and R) run widths, space first on the left half
const L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// G run widths: L read backwards
const G_PATTERNS: [[u8; 4]; 10] = [
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

/// G positions of the six left digits (bit 5 = first) for each first digit
const FIRST_DIGIT_PARITY: [u8; 10] = [0, 11, 13, 14, 19, 25, 28, 21, 22, 26];

const SIDE_GUARD: [u8; 3] = [1, 1, 1];
const MIDDLE_GUARD: [u8; 5] = [1, 1, 1, 1, 1];

/// Offset added to G-coded digits in decoded codes
const G_OFFSET: u16 = 10;
const GUARD_CODE: u16 = 100;

const MAX_GUARD_ERROR: f32 = 0.3;
const MAX_DIGIT_ERROR: f32 = 0.45;
const QUIET_MODULES: f32 = 5.0;

/// Which EAN family member a reader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EanVariant {
    /// 13 digits, first digit from left-half parity
    Ean13,
    /// 8 digits, all L on the left
    Ean8,
    /// 12 digits; an EAN-13 whose first digit is 0
    UpcA,
}

impl EanVariant {
    fn digits_per_half(self) -> usize {
        match self {
            EanVariant::Ean13 | EanVariant::UpcA => 6,
            EanVariant::Ean8 => 4,
        }
    }

    fn modules(self) -> u32 {
        3 + 7 * self.digits_per_half() as u32 * 2 + 5 + 3
    }

    fn runs(self) -> usize {
        3 + 4 * self.digits_per_half() * 2 + 5 + 3
    }
}

/// Reader for one EAN variant (`ean_13`, `ean_8` or `upc_a`)
#[derive(Debug, Clone, Copy)]
pub struct EanReader {
    variant: EanVariant,
}

impl EanReader {
    /// Create a reader for `variant`
    pub fn new(variant: EanVariant) -> Self {
        Self { variant }
    }

    /// EAN-13 reader
    pub fn ean13() -> Self {
        Self::new(EanVariant::Ean13)
    }

    /// EAN-8 reader
    pub fn ean8() -> Self {
        Self::new(EanVariant::Ean8)
    }

    /// UPC-A reader
    pub fn upc_a() -> Self {
        Self::new(EanVariant::UpcA)
    }

    /// Decode a symbol whose start guard begins at run `start`
    fn decode_at(&self, pattern: &BarPattern, start: usize) -> Result<CodeResult, DecodeError> {
        let widths = pattern.widths();
        if start + self.variant.runs() > pattern.len() {
            return Err(DecodeError::NoStopPattern);
        }
        let module = pattern.sum(start, self.variant.runs()) as f32 / self.variant.modules() as f32;
        let half = self.variant.digits_per_half();
        let start_info = DecodedCode {
            code: GUARD_CODE,
            start: pattern.offset(start),
            end: pattern.end(start + 2),
            error: pattern_error(&widths[start..start + 3], &SIDE_GUARD),
        };

        let mut codes = Vec::with_capacity(half * 2);
        let mut digits = Vec::with_capacity(half * 2 + 1);
        let mut parity = 0u8;
        let mut pos = start + 3;

        for _ in 0..half {
            let (digit, is_g, error) = match_digit(&widths[pos..pos + 4]);
            if error > MAX_DIGIT_ERROR || (is_g && self.variant == EanVariant::Ean8) {
                return Err(DecodeError::InvalidCode { position: pos });
            }
            parity = (parity << 1) | is_g as u8;
            codes.push(DecodedCode {
                code: digit as u16 + if is_g { G_OFFSET } else { 0 },
                start: pattern.offset(pos),
                end: pattern.end(pos + 3),
                error,
            });
            digits.push(digit as u8);
            pos += 4;
        }

        if pattern_error(&widths[pos..pos + 5], &MIDDLE_GUARD) > MAX_GUARD_ERROR {
            return Err(DecodeError::InvalidCode { position: pos });
        }
        pos += 5;

        for _ in 0..half {
            let (digit, is_g, error) = match_digit(&widths[pos..pos + 4]);
            if error > MAX_DIGIT_ERROR || is_g {
                return Err(DecodeError::InvalidCode { position: pos });
            }
            codes.push(DecodedCode {
                code: digit as u16,
                start: pattern.offset(pos),
                end: pattern.end(pos + 3),
                error,
            });
            digits.push(digit as u8);
            pos += 4;
        }

        let end_error = pattern_error(&widths[pos..pos + 3], &SIDE_GUARD);
        if end_error > MAX_GUARD_ERROR || !has_trailing_quiet_zone(pattern, pos + 3, module) {
            return Err(DecodeError::NoStopPattern);
        }
        let end_info = DecodedCode {
            code: GUARD_CODE,
            start: pattern.offset(pos),
            end: pattern.end(pos + 2),
            error: end_error,
        };

        if self.variant != EanVariant::Ean8 {
            let first = FIRST_DIGIT_PARITY
                .iter()
                .position(|&p| p == parity)
                .ok_or(DecodeError::InvalidCode { position: start + 3 })?;
            digits.insert(0, first as u8);
        }

        let (body, check) = digits.split_at(digits.len() - 1);
        let expected = check_digit(body);
        if expected != check[0] {
            return Err(DecodeError::ChecksumMismatch {
                expected: expected as u32,
                actual: check[0] as u32,
            });
        }

        if self.variant == EanVariant::UpcA {
            if digits[0] != 0 {
                return Err(DecodeError::InvalidCode { position: start + 3 });
            }
            digits.remove(0);
        }

        Ok(CodeResult {
            code: digits.iter().map(|&d| char::from(b'0' + d)).collect(),
            format: self.format().to_string(),
            codeset: None,
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

impl SymbologyDecoder for EanReader {
    fn format(&self) -> &'static str {
        match self.variant {
            EanVariant::Ean13 => "ean_13",
            EanVariant::Ean8 => "ean_8",
            EanVariant::UpcA => "upc_a",
        }
    }

    /// Tries every guard-like triple that follows a quiet zone and keeps the
    /// failure that got furthest.
    fn decode_forward(&self, pattern: &BarPattern) -> Result<CodeResult, DecodeError> {
        if pattern.len() < self.variant.runs() {
            return Err(DecodeError::TooShort);
        }
        let widths = pattern.widths();
        let mut failure = DecodeError::NoStartPattern;
        for i in 0..=pattern.len() - 3 {
            if !pattern.is_bar(i) || pattern_error(&widths[i..i + 3], &SIDE_GUARD) > MAX_GUARD_ERROR {
                continue;
            }
            let module = pattern.sum(i, 3) as f32 / 3.0;
            if !has_quiet_zone(pattern, i, module, QUIET_MODULES) {
                continue;
            }
            match self.decode_at(pattern, i) {
                Ok(result) => return Ok(result),
                Err(err) if super::error_rank(&err) > super::error_rank(&failure) => failure = err,
                Err(_) => {}
            }
        }
        Err(failure)
    }
}

/// Best digit over L and G codes: (digit, is G, error)
fn match_digit(widths: &[u32]) -> (usize, bool, f32) {
    let (l_digit, l_error) = best_match(widths, &L_PATTERNS);
    let (g_digit, g_error) = best_match(widths, &G_PATTERNS);
    if g_error < l_error {
        (g_digit, true, g_error)
    } else {
        (l_digit, false, l_error)
    }
}

fn has_trailing_quiet_zone(pattern: &BarPattern, index: usize, module: f32) -> bool {
    index >= pattern.len() || pattern.width(index) as f32 >= module * QUIET_MODULES
}

/// Mod-10 check digit; weights alternate 3 and 1 from the rightmost body digit
fn check_digit(body: &[u8]) -> u8 {
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn parse_digits(text: &str) -> Option<Vec<u8>> {
    text.bytes()
        .map(|b| b.is_ascii_digit().then(|| b - b'0'))
        .collect()
}

/// Body digits plus check digit; the check is computed when absent
fn complete(text: &str, len: usize) -> Option<Vec<u8>> {
    let mut digits = parse_digits(text)?;
    if digits.len() == len - 1 {
        digits.push(check_digit(&digits));
    }
    (digits.len() == len).then_some(digits)
}

fn layout(left: &[u8], right: &[u8], parity: u8) -> Vec<u8> {
    let mut modules = Vec::with_capacity(3 + 4 * (left.len() + right.len()) + 5 + 3);
    modules.extend_from_slice(&SIDE_GUARD);
    for (i, &d) in left.iter().enumerate() {
        let is_g = (parity >> (left.len() - 1 - i)) & 1 == 1;
        let table = if is_g { &G_PATTERNS } else { &L_PATTERNS };
        modules.extend_from_slice(&table[d as usize]);
    }
    modules.extend_from_slice(&MIDDLE_GUARD);
    for &d in right {
        modules.extend_from_slice(&L_PATTERNS[d as usize]);
    }
    modules.extend_from_slice(&SIDE_GUARD);
    modules
}

/// Module widths for an EAN-13 given 12 digits (check appended) or 13 (used as is)
pub fn encode_ean13(text: &str) -> Option<Vec<u8>> {
    let digits = complete(text, 13)?;
    let parity = FIRST_DIGIT_PARITY[digits[0] as usize];
    Some(layout(&digits[1..7], &digits[7..], parity))
}

/// Module widths for an EAN-8 given 7 or 8 digits
pub fn encode_ean8(text: &str) -> Option<Vec<u8>> {
    let digits = complete(text, 8)?;
    Some(layout(&digits[..4], &digits[4..], 0))
}

/// Module widths for a UPC-A given 11 or 12 digits
pub fn encode_upc_a(text: &str) -> Option<Vec<u8>> {
    encode_ean13(&format!("0{text}"))
}
