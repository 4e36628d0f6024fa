//! PGN value normalization
//!
//! Upstream file formats disagree on how a PGN is written: `0xF004`, `F004`,
//! `61444`. This module turns any of them into a `{hex, decimal}` pair that
//! denotes the same number. It never fails; tokens it cannot read come back
//! unchanged and flagged as degraded.

use serde::Serialize;

/// A PGN token in canonical hex and decimal form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedPgn {
    /// `0x` + uppercase hex digits, or the original token when degraded
    pub hex: String,
    /// Base-10 digits, or the original token when degraded
    pub decimal: String,
    /// The token exactly as received
    pub original: String,
    /// Numeric value when normalization succeeded
    #[serde(skip)]
    value: Option<u64>,
}

impl NormalizedPgn {
    /// Numeric value of the PGN, `None` when the token could not be read
    pub fn value(&self) -> Option<u64> {
        self.value
    }

    /// True when the token could not be read as hex or decimal
    pub fn is_degraded(&self) -> bool {
        self.value.is_none()
    }

    fn degraded(token: &str) -> Self {
        Self {
            hex: token.to_string(),
            decimal: token.to_string(),
            original: token.to_string(),
            value: None,
        }
    }
}

/// Normalize a PGN token
///
/// Rules, first match wins:
/// 1. `0x`/`0X` prefix or any of `a-f`/`A-F` → base 16. The hex digits are
///    kept as written (uppercased), so `0x00f004` becomes `0x00F004`.
/// 2. Only ASCII digits → base 10, hex is `0x` + natural-width uppercase hex.
/// 3. Anything else (including empty input and overflow) → degraded, both
///    forms echo the original token.
///
/// Surrounding whitespace is ignored when parsing.
pub fn normalize_pgn(token: &str) -> NormalizedPgn {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return NormalizedPgn::degraded(token);
    }

    let prefixed = trimmed
        .get(..2)
        .map_or(false, |head| head.eq_ignore_ascii_case("0x"));
    let has_hex_letter = trimmed.chars().any(|c| matches!(c, 'a'..='f' | 'A'..='F'));

    if prefixed || has_hex_letter {
        let digits = if prefixed { &trimmed[2..] } else { trimmed };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            log::trace!("PGN token {:?} is not valid hex", token);
            return NormalizedPgn::degraded(token);
        }
        return match u64::from_str_radix(digits, 16) {
            Ok(value) => NormalizedPgn {
                hex: format!("0x{}", digits.to_ascii_uppercase()),
                decimal: value.to_string(),
                original: token.to_string(),
                value: Some(value),
            },
            Err(_) => NormalizedPgn::degraded(token),
        };
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return match trimmed.parse::<u64>() {
            Ok(value) => NormalizedPgn {
                hex: format!("0x{:X}", value),
                decimal: value.to_string(),
                original: token.to_string(),
                value: Some(value),
            },
            Err(_) => NormalizedPgn::degraded(token),
        };
    }

    log::trace!("PGN token {:?} is neither hex nor decimal", token);
    NormalizedPgn::degraded(token)
}

/// Canonical catalog hex form: `0x` + uppercase hex, at least four digits
pub fn canonical_hex(pgn: u32) -> String {
    format!("0x{:04X}", pgn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_token() {
        let pgn = normalize_pgn("61444");
        assert_eq!(pgn.hex, "0xF004");
        assert_eq!(pgn.decimal, "61444");
        assert_eq!(pgn.original, "61444");
        assert_eq!(pgn.value(), Some(61444));
        assert!(!pgn.is_degraded());
    }

    #[test]
    fn test_prefixed_hex_token() {
        let pgn = normalize_pgn("0xfef1");
        assert_eq!(pgn.hex, "0xFEF1");
        assert_eq!(pgn.decimal, "65265");

        let upper = normalize_pgn("0XFEF1");
        assert_eq!(upper.decimal, "65265");
    }

    #[test]
    fn test_bare_hex_token_with_letters() {
        let pgn = normalize_pgn("00F004");
        assert_eq!(pgn.hex, "0x00F004");
        assert_eq!(pgn.decimal, "61444");
    }

    #[test]
    fn test_digits_only_is_decimal_not_hex() {
        // "1000" has no hex letter and no prefix, so it is read as base 10
        let pgn = normalize_pgn("1000");
        assert_eq!(pgn.decimal, "1000");
        assert_eq!(pgn.hex, "0x3E8");
    }

    #[test]
    fn test_zero() {
        let pgn = normalize_pgn("0");
        assert_eq!(pgn.hex, "0x0");
        assert_eq!(pgn.decimal, "0");
    }

    #[test]
    fn test_round_trip_across_values() {
        for n in [0u64, 1, 255, 256, 61444, 65265, 0x3FFFF, u64::from(u32::MAX)] {
            let from_hex = normalize_pgn(&format!("0x{:X}", n));
            assert_eq!(from_hex.decimal, n.to_string());

            let from_dec = normalize_pgn(&n.to_string());
            assert_eq!(from_dec.hex, format!("0x{:X}", n));
        }
    }

    #[test]
    fn test_degraded_tokens_echo_original() {
        for token in ["", "   ", "not-a-number", "0x", "0xZZ", "12.5", "-4"] {
            let pgn = normalize_pgn(token);
            assert!(pgn.is_degraded(), "{:?} should be degraded", token);
            assert_eq!(pgn.hex, token);
            assert_eq!(pgn.decimal, token);
            assert_eq!(pgn.original, token);
        }
    }

    #[test]
    fn test_overflow_degrades() {
        let token = "99999999999999999999999";
        let pgn = normalize_pgn(token);
        assert!(pgn.is_degraded());
        assert_eq!(pgn.decimal, token);
    }

    #[test]
    fn test_whitespace_is_trimmed_for_parsing() {
        let pgn = normalize_pgn(" 61444 ");
        assert_eq!(pgn.decimal, "61444");
        assert_eq!(pgn.original, " 61444 ");
    }

    #[test]
    fn test_canonical_hex_padding() {
        assert_eq!(canonical_hex(0), "0x0000");
        assert_eq!(canonical_hex(65265), "0xFEF1");
        assert_eq!(canonical_hex(0x1FECA), "0x1FECA");
    }
}
