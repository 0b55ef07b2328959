//! Value/type encoding: domain checks and canonical display forms.

use crate::error::{DescriptorError, Result};
use crate::model::{Field, FieldType, Value};

/// Widest zero padding applied to a hex display (4096 bits).
const MAX_PADDED_DIGITS: usize = 1024;

/// Display forms produced for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Canonical display of the declared value, if any.
    pub value: Option<String>,
    /// Description of the values the field can hold.
    pub range: String,
}

/// Check a field's declared value against its type and produce display forms.
///
/// The field's fixed-point range must already be known to be valid
/// (`high >= low`); the layout resolver checks that first. Set ranges are
/// address ranges and are filled in by the layout resolver; this returns an
/// empty range for sets.
pub fn encode_field(field: &Field) -> Result<Encoded> {
    let path = field.path.as_str();
    let bounds = declared_bounds(field)?;

    let value = match &field.value {
        None => None,
        Some(value) => {
            let display = encode_value(&field.field_type, value, path)?;
            if let (Some((min, max)), Some(x)) = (bounds, numeric(value)) {
                if x < min || x > max {
                    return Err(DescriptorError::mismatch(
                        path,
                        format!("value {value} lies outside the declared range {min} to {max}"),
                    ));
                }
            }
            Some(display)
        }
    };

    let mut range = match bounds {
        Some((min, max)) => format!("{min} to {max}"),
        None => domain_text(&field.field_type),
    };
    if let (Some(unit), true) = (&field.unit, field.field_type.is_numeric()) {
        range.push(' ');
        range.push_str(unit);
    }

    Ok(Encoded { value, range })
}

/// Canonical address display: `0x` plus uppercase hex, padded to the width of `address_max`.
pub fn format_address(address: u64, address_max: u64) -> String {
    format!("0x{:0width$X}", address, width = hex_digits(address_max))
}

/// Range text for a set spanning `units` addressable units from `start`.
pub fn set_range(start: u64, units: u64, address_max: u64) -> String {
    if units == 0 {
        return "empty".to_string();
    }
    let last = start.saturating_add(units - 1);
    format!(
        "{} to {}",
        format_address(start, address_max),
        format_address(last, address_max)
    )
}

fn hex_digits(n: u64) -> usize {
    if n == 0 {
        1
    } else {
        (64 - n.leading_zeros() as usize).div_ceil(4)
    }
}

/// Declared `min`/`max` bounds, validated for numeric types only.
fn declared_bounds(field: &Field) -> Result<Option<(f64, f64)>> {
    if field.min.is_none() && field.max.is_none() {
        return Ok(None);
    }
    if !field.field_type.is_numeric() {
        tracing::warn!(
            path = %field.path,
            field_type = %field.field_type,
            "min/max ignored on non-numeric field"
        );
        return Ok(None);
    }
    let (domain_min, domain_max) = numeric_domain(&field.field_type);
    let min = field.min.unwrap_or(domain_min);
    let max = field.max.unwrap_or(domain_max);
    if min > max {
        return Err(DescriptorError::mismatch(
            &field.path,
            format!("declared min {min} exceeds declared max {max}"),
        ));
    }
    Ok(Some((min, max)))
}

fn encode_value(field_type: &FieldType, value: &Value, path: &str) -> Result<String> {
    let mismatch = || {
        DescriptorError::mismatch(
            path,
            format!("value {value} does not match the field type {field_type}"),
        )
    };

    match *field_type {
        FieldType::Set => Err(DescriptorError::mismatch(path, "a set cannot carry a value")),

        FieldType::String(length) => {
            let Value::String(s) = value else {
                return Err(mismatch());
            };
            if !s.is_ascii() {
                return Err(DescriptorError::mismatch(
                    path,
                    format!("string {s:?} contains non-ASCII characters"),
                ));
            }
            if s.len() as u64 > length {
                return Err(DescriptorError::mismatch(
                    path,
                    format!("string of {} characters is longer than {field_type}", s.len()),
                ));
            }
            Ok(format!("\"{s}\""))
        }

        FieldType::Unsigned(bits) | FieldType::Vector(bits) => {
            let n = match value {
                Value::Unsigned(n) => *n,
                Value::Signed(_) => {
                    return Err(DescriptorError::mismatch(
                        path,
                        format!("negative value {value} cannot be stored in {field_type}"),
                    ))
                }
                _ => return Err(mismatch()),
            };
            if let Some(max) = pow2_minus_one(bits) {
                if u128::from(n) > max {
                    return Err(DescriptorError::mismatch(
                        path,
                        format!("value {n} requires more than the {bits} bits of {field_type}"),
                    ));
                }
            }
            if matches!(field_type, FieldType::Vector(_)) && bits <= 32 {
                Ok(format!("0b{:0width$b}", n, width = bits as usize))
            } else {
                Ok(hex_padded(u128::from(n), bits))
            }
        }

        FieldType::Signed(bits) => {
            let n: i128 = match value {
                Value::Unsigned(n) => i128::from(*n),
                Value::Signed(n) => i128::from(*n),
                _ => return Err(mismatch()),
            };
            match twos_complement(n, bits) {
                Some(raw) => Ok(format!("{n} ({})", hex_padded(raw, bits))),
                None if bits >= 128 => Ok(n.to_string()),
                None => Err(DescriptorError::mismatch(
                    path,
                    format!("value {n} does not fit the {bits} bits of {field_type}"),
                )),
            }
        }

        FieldType::UFixed { high, low } | FieldType::SFixed { high, low } => {
            let x = match numeric(value) {
                Some(x) if x.is_finite() => x,
                _ => return Err(mismatch()),
            };
            let (min, max) = numeric_domain(field_type);
            if x < min || x > max {
                return Err(DescriptorError::mismatch(
                    path,
                    format!("value {x} cannot be represented by {field_type} ({min} to {max})"),
                ));
            }
            let bits = (i128::from(high) - i128::from(low) + 1) as u64;
            let quantized = (x / 2f64.powf(low as f64)).round();
            if bits >= 128 || quantized.abs() >= 1e38 {
                return Ok(format!("{x}"));
            }
            let raw = match field_type {
                FieldType::UFixed { .. } => Some(quantized as u128),
                _ => twos_complement(quantized as i128, bits),
            };
            match raw {
                Some(raw) => Ok(format!("{x} ({})", hex_padded(raw, bits))),
                None => Ok(format!("{x}")),
            }
        }
    }
}

/// The representable interval of a numeric type, as floating point.
fn numeric_domain(field_type: &FieldType) -> (f64, f64) {
    match *field_type {
        FieldType::Unsigned(bits) | FieldType::Vector(bits) => (0.0, 2f64.powf(bits as f64) - 1.0),
        FieldType::Signed(bits) => {
            let half = 2f64.powf(bits as f64 - 1.0);
            (-half, half - 1.0)
        }
        FieldType::UFixed { high, low } => (
            0.0,
            2f64.powf(high as f64 + 1.0) - 2f64.powf(low as f64),
        ),
        FieldType::SFixed { high, low } => (
            -2f64.powf(high as f64),
            2f64.powf(high as f64) - 2f64.powf(low as f64),
        ),
        FieldType::Set | FieldType::String(_) => (0.0, 0.0),
    }
}

fn domain_text(field_type: &FieldType) -> String {
    match *field_type {
        FieldType::Set => String::new(),
        FieldType::String(n) => format!("{n} ASCII characters"),
        FieldType::Unsigned(bits) | FieldType::Vector(bits) => match pow2_minus_one(bits) {
            Some(max) => format!("0 to {max}"),
            None => format!("0 to 2^{bits} - 1"),
        },
        FieldType::Signed(bits) => {
            let magnitude = bits.saturating_sub(1);
            match pow2_minus_one(magnitude) {
                Some(max) => format!("-{} to {max}", max + 1),
                None => format!("-2^{magnitude} to 2^{magnitude} - 1"),
            }
        }
        FieldType::UFixed { low, .. } | FieldType::SFixed { low, .. } => {
            let (min, max) = numeric_domain(field_type);
            format!("{min} to {max} (step 2^{low})")
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Unsigned(n) => Some(*n as f64),
        Value::Signed(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        Value::String(_) => None,
    }
}

/// `2^bits - 1`, or `None` when it does not fit in a `u128`.
fn pow2_minus_one(bits: u64) -> Option<u128> {
    match bits {
        0 => Some(0),
        1..=127 => Some((1u128 << bits) - 1),
        128 => Some(u128::MAX),
        _ => None,
    }
}

/// The `bits`-wide two's-complement pattern of `n`, or `None` if it does not fit.
fn twos_complement(n: i128, bits: u64) -> Option<u128> {
    if bits == 0 || bits >= 128 {
        return None;
    }
    let half = 1i128 << (bits - 1);
    if n < -half || n >= half {
        return None;
    }
    let modulus = 1u128 << bits;
    Some(if n < 0 {
        modulus - n.unsigned_abs()
    } else {
        n as u128
    })
}

/// `0x` plus uppercase hex, zero-padded to `ceil(bits / 4)` digits.
///
/// Padding stops at [`MAX_PADDED_DIGITS`]; wider fields show the bare digits.
fn hex_padded(n: u128, bits: u64) -> String {
    let digits = format!("{n:X}");
    let width = usize::try_from(bits.div_ceil(4))
        .unwrap_or(usize::MAX)
        .min(MAX_PADDED_DIGITS);
    let pad = width.saturating_sub(digits.len());
    format!("0x{}{digits}", "0".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldAccess;

    fn field(field_type: FieldType, value: Option<Value>) -> Field {
        Field {
            name: "f".into(),
            path: "contains[0]".into(),
            address: None,
            access: FieldAccess::Unspecified,
            field_type,
            contains: Vec::new(),
            value,
            unit: None,
            min: None,
            max: None,
        }
    }

    fn is_mismatch(result: Result<Encoded>) -> bool {
        matches!(result, Err(DescriptorError::ValueTypeMismatch { .. }))
    }

    #[test]
    fn string_value() {
        let enc = encode_field(&field(
            FieldType::String(20),
            Some(Value::String("My Great Memory Map".into())),
        ))
        .unwrap();
        assert_eq!(enc.value.as_deref(), Some("\"My Great Memory Map\""));
        assert_eq!(enc.range, "20 ASCII characters");
    }

    #[test]
    fn string_too_long() {
        let f = field(FieldType::String(3), Some(Value::String("abcd".into())));
        assert!(is_mismatch(encode_field(&f)));
    }

    #[test]
    fn string_non_ascii() {
        let f = field(FieldType::String(8), Some(Value::String("größe".into())));
        assert!(is_mismatch(encode_field(&f)));
    }

    #[test]
    fn unsigned_bounds() {
        let ok = field(FieldType::Unsigned(8), Some(Value::Unsigned(255)));
        assert_eq!(encode_field(&ok).unwrap().value.as_deref(), Some("0xFF"));
        let over = field(FieldType::Unsigned(8), Some(Value::Unsigned(256)));
        assert!(is_mismatch(encode_field(&over)));
        let negative = field(FieldType::Unsigned(8), Some(Value::Signed(-1)));
        assert!(is_mismatch(encode_field(&negative)));
        let wide = field(FieldType::Unsigned(64), Some(Value::Unsigned(u64::MAX)));
        assert!(encode_field(&wide).is_ok());
    }

    #[test]
    fn unsigned_range_text() {
        let f = field(FieldType::Unsigned(12), None);
        assert_eq!(encode_field(&f).unwrap().range, "0 to 4095");
    }

    #[test]
    fn vector_binary_display() {
        let f = field(FieldType::Vector(4), Some(Value::Unsigned(5)));
        assert_eq!(encode_field(&f).unwrap().value.as_deref(), Some("0b0101"));
        let wide = field(FieldType::Vector(40), Some(Value::Unsigned(5)));
        assert_eq!(
            encode_field(&wide).unwrap().value.as_deref(),
            Some("0x0000000005")
        );
    }

    #[test]
    fn signed_bounds_and_display() {
        let f = field(FieldType::Signed(8), Some(Value::Signed(-3)));
        assert_eq!(encode_field(&f).unwrap().value.as_deref(), Some("-3 (0xFD)"));
        let f = field(FieldType::Signed(8), Some(Value::Unsigned(127)));
        assert_eq!(encode_field(&f).unwrap().value.as_deref(), Some("127 (0x7F)"));
        assert!(is_mismatch(encode_field(&field(
            FieldType::Signed(8),
            Some(Value::Unsigned(128))
        ))));
        assert!(is_mismatch(encode_field(&field(
            FieldType::Signed(8),
            Some(Value::Signed(-129))
        ))));
        assert_eq!(
            encode_field(&field(FieldType::Signed(8), None)).unwrap().range,
            "-128 to 127"
        );
    }

    #[test]
    fn ufixed_domain() {
        let t = FieldType::UFixed { high: 3, low: -4 };
        let max = 16.0 - 0.0625;
        let ok = field(t, Some(Value::Float(max)));
        assert_eq!(encode_field(&ok).unwrap().value.as_deref(), Some("15.9375 (0xFF)"));
        assert!(is_mismatch(encode_field(&field(t, Some(Value::Float(16.0))))));
        assert!(is_mismatch(encode_field(&field(t, Some(Value::Float(-0.5))))));
        assert!(is_mismatch(encode_field(&field(t, Some(Value::String("1".into()))))));
    }

    #[test]
    fn sfixed_domain() {
        let t = FieldType::SFixed { high: 3, low: -4 };
        let ok = field(t, Some(Value::Float(-8.0)));
        assert_eq!(encode_field(&ok).unwrap().value.as_deref(), Some("-8 (0x80)"));
        assert!(is_mismatch(encode_field(&field(t, Some(Value::Float(8.0))))));
        let int = field(t, Some(Value::Signed(-1)));
        assert_eq!(encode_field(&int).unwrap().value.as_deref(), Some("-1 (0xF0)"));
    }

    #[test]
    fn set_rejects_value() {
        let f = field(FieldType::Set, Some(Value::Unsigned(1)));
        assert!(is_mismatch(encode_field(&f)));
    }

    #[test]
    fn declared_bounds_apply() {
        let mut f = field(FieldType::Unsigned(16), Some(Value::Unsigned(500)));
        f.min = Some(0.0);
        f.max = Some(100.0);
        f.unit = Some("mV".into());
        assert!(is_mismatch(encode_field(&f)));

        f.value = Some(Value::Unsigned(50));
        let enc = encode_field(&f).unwrap();
        assert_eq!(enc.range, "0 to 100 mV");

        f.min = Some(200.0);
        assert!(is_mismatch(encode_field(&f)));
    }

    #[test]
    fn bounds_ignored_on_strings() {
        let mut f = field(FieldType::String(4), None);
        f.min = Some(1.0);
        assert_eq!(encode_field(&f).unwrap().range, "4 ASCII characters");
    }

    #[test]
    fn wide_unsigned_display_is_bounded() {
        let f = field(FieldType::Unsigned(256), Some(Value::Unsigned(0xAB)));
        let value = encode_field(&f).unwrap().value.unwrap();
        assert_eq!(value.len(), 2 + 64);
        assert!(value.ends_with("000AB"));

        let f = field(FieldType::Unsigned(300_000), Some(Value::Unsigned(1)));
        let value = encode_field(&f).unwrap().value.unwrap();
        assert_eq!(value.len(), 2 + MAX_PADDED_DIGITS);

        let f = field(FieldType::Vector(u64::MAX), Some(Value::Unsigned(7)));
        let value = encode_field(&f).unwrap().value.unwrap();
        assert_eq!(value.len(), 2 + MAX_PADDED_DIGITS);
        assert!(value.ends_with('7'));
    }

    #[test]
    fn zero_width_signed_has_a_domain() {
        assert_eq!(domain_text(&FieldType::Signed(0)), "-1 to 0");
        assert_eq!(domain_text(&FieldType::Signed(1)), "-1 to 0");
    }

    #[test]
    fn address_display_width() {
        assert_eq!(format_address(0x13, 0xFFFF), "0x0013");
        assert_eq!(format_address(0, 0), "0x0");
        assert_eq!(format_address(0x1F, 0xFF_FFFF), "0x00001F");
        assert_eq!(set_range(0, 20, 0xFFFF), "0x0000 to 0x0013");
        assert_eq!(set_range(4, 0, 0xFFFF), "empty");
    }
}
