//! Textual resource quantity parsing
//!
//! The usage source reports CPU as `<float>n` (nanocores) and memory as
//! `<float>Ki` (kibibytes). Any other unit is rejected rather than
//! converted so a misconfigured upstream cannot silently skew scores.

use crate::error::ParseError;

/// CPU unit suffix (nanocores)
pub const CPU_UNIT: &str = "n";

/// Memory unit suffix (kibibytes)
pub const MEMORY_UNIT: &str = "Ki";

/// Parse a quantity that must end in `unit`.
///
/// The bare literal `"0"` is accepted for every unit since that is how a
/// zero quantity is serialized.
pub fn parse_quantity(quantity: &str, unit: &'static str) -> Result<f64, ParseError> {
    if quantity == "0" {
        return Ok(0.0);
    }

    let number = quantity
        .strip_suffix(unit)
        .ok_or_else(|| ParseError::MissingUnit {
            quantity: quantity.to_string(),
            unit,
        })?;

    let value: f64 = number.parse().map_err(|_| ParseError::InvalidNumber {
        quantity: quantity.to_string(),
    })?;

    if !value.is_finite() {
        return Err(ParseError::NonFinite {
            quantity: quantity.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ParseError::Negative {
            quantity: quantity.to_string(),
        });
    }

    Ok(value)
}

/// Parse CPU usage in nanocores
pub fn parse_cpu_nanocores(quantity: &str) -> Result<f64, ParseError> {
    parse_quantity(quantity, CPU_UNIT)
}

/// Parse memory usage in kibibytes
pub fn parse_memory_kib(quantity: &str) -> Result<f64, ParseError> {
    parse_quantity(quantity, MEMORY_UNIT)
}
