//! SPN bit-field decoding
//!
//! Derives everything presentation layers need from an SPN definition: the
//! absolute bit span inside the PGN payload, the linear raw → physical
//! transform, and the physical range the field can express. This is the
//! only place these formulas live.
//!
//! The decoder never touches payload bytes. Raw values come from callers.

use crate::catalog::SpnDefinition;
use crate::types::DefinitionError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Marker rendered wherever a value cannot be computed
pub const NOT_AVAILABLE: &str = "N/A";

/// Closed interval of absolute bit positions within a PGN payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BitRange {
    pub start: u64,
    pub end: u64,
}

impl BitRange {
    /// Number of bits covered
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// `physical = resolution * raw + offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinearTransform {
    pub resolution: Decimal,
    pub offset: Decimal,
}

impl LinearTransform {
    /// Apply the transform, `None` on arithmetic overflow
    pub fn apply(&self, raw: u64) -> Option<Decimal> {
        self.resolution
            .checked_mul(Decimal::from(raw))?
            .checked_add(self.offset)
    }
}

impl fmt::Display for LinearTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolution = self.resolution.normalize();
        let offset = self.offset.normalize();
        if offset.is_sign_negative() && !offset.is_zero() {
            write!(f, "{} × raw - {}", resolution, offset.abs())
        } else {
            write!(f, "{} × raw + {}", resolution, offset)
        }
    }
}

/// Outcome of converting one raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum PhysicalValue {
    Computed(Decimal),
    Unavailable,
}

impl PhysicalValue {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            PhysicalValue::Computed(v) => Some(*v),
            PhysicalValue::Unavailable => None,
        }
    }

    /// Text form rounded half-to-even at `precision` decimal places
    pub fn to_display(&self, precision: u32) -> String {
        match self {
            PhysicalValue::Computed(v) => round_for_display(*v, precision),
            PhysicalValue::Unavailable => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Physical values at the two ends of the raw range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhysicalRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl PhysicalRange {
    pub fn to_display(&self, precision: u32) -> String {
        format!(
            "{} to {}",
            round_for_display(self.min, precision),
            round_for_display(self.max, precision)
        )
    }
}

/// Everything derived from one definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedField {
    pub bit_range: BitRange,
    pub transform: Option<LinearTransform>,
    pub physical_range: Option<PhysicalRange>,
}

impl DecodedField {
    /// Formula text, or the unavailable marker
    pub fn formula(&self) -> String {
        self.transform
            .map(|t| t.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// Round half-to-even and drop trailing zeros
pub fn round_for_display(value: Decimal, precision: u32) -> String {
    value
        .round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
        .normalize()
        .to_string()
}

/// Bit-field decoder - derives spans and physical values from SPN definitions
pub struct SpnDecoder;

impl SpnDecoder {
    /// Check the bit-field invariants of a definition
    ///
    /// Called once when the catalog is built; decoding assumes it passed.
    pub fn validate(def: &SpnDefinition) -> Result<(), DefinitionError> {
        if def.start_byte < 1 {
            return Err(DefinitionError::InvalidStartByte {
                spn: def.spn,
                start_byte: def.start_byte,
            });
        }
        if def.start_bit > 7 {
            return Err(DefinitionError::InvalidStartBit {
                spn: def.spn,
                start_bit: def.start_bit,
            });
        }
        if def.bit_length == 0 {
            return Err(DefinitionError::ZeroBitLength { spn: def.spn });
        }
        Ok(())
    }

    /// Absolute bit span: `(start_byte - 1) * 8 + start_bit` for `bit_length` bits
    pub fn bit_range(def: &SpnDefinition) -> BitRange {
        let start = u64::from(def.start_byte.saturating_sub(1)) * 8 + u64::from(def.start_bit);
        let end = start + u64::from(def.bit_length.max(1)) - 1;
        BitRange { start, end }
    }

    /// Linear transform, present only when both resolution and offset are
    pub fn transform(def: &SpnDefinition) -> Option<LinearTransform> {
        match (def.resolution, def.offset) {
            (Some(resolution), Some(offset)) => Some(LinearTransform { resolution, offset }),
            _ => None,
        }
    }

    /// Largest raw value the field can hold, `None` beyond 64 bits
    pub fn max_raw(def: &SpnDefinition) -> Option<u64> {
        match def.bit_length {
            0 => None,
            64 => Some(u64::MAX),
            len if len < 64 => Some((1u64 << len) - 1),
            _ => None,
        }
    }

    /// Convert a raw field value to its physical value
    ///
    /// Unavailable when the definition has no transform or `raw` does not
    /// fit in `bit_length` bits.
    pub fn physical_value(def: &SpnDefinition, raw: u64) -> PhysicalValue {
        let Some(transform) = Self::transform(def) else {
            return PhysicalValue::Unavailable;
        };

        if let Some(max) = Self::max_raw(def) {
            if raw > max {
                log::debug!(
                    "SPN {}: raw value {} exceeds {}-bit field",
                    def.spn,
                    raw,
                    def.bit_length
                );
                return PhysicalValue::Unavailable;
            }
        }

        transform
            .apply(raw)
            .map(PhysicalValue::Computed)
            .unwrap_or(PhysicalValue::Unavailable)
    }

    /// Physical values for raw 0 and the all-ones raw value, ordered
    pub fn physical_range(def: &SpnDefinition) -> Option<PhysicalRange> {
        let transform = Self::transform(def)?;
        let max_raw = Self::max_raw(def)?;
        let low = transform.apply(0)?;
        let high = transform.apply(max_raw)?;
        Some(PhysicalRange {
            min: low.min(high),
            max: low.max(high),
        })
    }

    /// Derive span, transform and range in one go
    pub fn decode(def: &SpnDefinition) -> DecodedField {
        DecodedField {
            bit_range: Self::bit_range(def),
            transform: Self::transform(def),
            physical_range: Self::physical_range(def),
        }
    }
}
