use bigdecimal::{BigDecimal, RoundingMode};
use serde::Serializer;

/// Decimal places stored for every monetary column.
pub const SCALE: i64 = 2;

/// Widest scale accepted from clients before rounding.
const MAX_INPUT_SCALE: i64 = 18;

/// Digits left of the decimal point in a NUMERIC(10, 2) column.
const INTEGER_DIGITS: i64 = 8;

/// Largest value a NUMERIC(10, 2) column holds.
pub fn max_value() -> BigDecimal {
    normalize(&(BigDecimal::from(9_999_999_999i64) / BigDecimal::from(100)))
}

/// Round half-up to cents and pin the scale, so `7.5` and `7.50` compare and print alike.
pub fn normalize(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(SCALE, RoundingMode::HalfUp)
}

/// Cheap magnitude check for client input. Must pass before [`normalize`],
/// which rescales and would otherwise build a power of ten as large as the
/// exponent in e.g. `1e2000000000`.
pub fn within_input_bounds(value: &BigDecimal) -> bool {
    let (_, scale) = value.as_bigint_and_exponent();
    if !(-INTEGER_DIGITS..=MAX_INPUT_SCALE).contains(&scale) {
        return false;
    }
    (value.digits() as i64) - scale <= INTEGER_DIGITS
}

pub fn fits_column(value: &BigDecimal) -> bool {
    *value >= BigDecimal::from(0) && *value <= max_value()
}

pub fn line_value(unit_value: &BigDecimal, quantity: i32) -> BigDecimal {
    normalize(&(unit_value * BigDecimal::from(quantity)))
}

pub fn total<'a>(values: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    let sum: BigDecimal = values.into_iter().sum();
    normalize(&sum)
}

/// Serde `serialize_with` for money columns. Postgres hands NUMERIC back with
/// its own digit grouping, so the scale is pinned on the way out.
pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&normalize(value))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn normalize_rounds_half_up_to_cents() {
        assert_eq!(normalize(&dec("12.345")).to_string(), "12.35");
        assert_eq!(normalize(&dec("12.344")).to_string(), "12.34");
        assert_eq!(normalize(&dec("7.5")).to_string(), "7.50");
        assert_eq!(normalize(&dec("3")).to_string(), "3.00");
    }

    #[test]
    fn line_value_is_exact() {
        assert_eq!(line_value(&dec("2.50"), 3), dec("7.50"));
        assert_eq!(line_value(&dec("0.10"), 3).to_string(), "0.30");
    }

    #[test]
    fn total_sums_exactly() {
        let lines = [dec("0.10"), dec("0.20"), dec("0.30")];
        assert_eq!(total(lines.iter()).to_string(), "0.60");
    }

    #[test]
    fn serializes_with_two_places() {
        #[derive(serde::Serialize)]
        struct Row {
            #[serde(serialize_with = "serialize")]
            value: BigDecimal,
        }
        let json = serde_json::to_value(Row { value: dec("7.5000") }).unwrap();
        assert_eq!(json["value"], "7.50");
        let json = serde_json::to_value(Row { value: dec("2") }).unwrap();
        assert_eq!(json["value"], "2.00");
    }

    #[test]
    fn exponent_notation_is_rejected_before_rescaling() {
        assert!(!within_input_bounds(&dec("1e2000000000")));
        assert!(!within_input_bounds(&dec("1e-2000000000")));
        assert!(!within_input_bounds(&dec("123456789")));
        assert!(within_input_bounds(&dec("99999999.99")));
        assert!(within_input_bounds(&dec("2.5e1")));
        assert!(within_input_bounds(&dec("3.455")));
        assert!(within_input_bounds(&dec("0")));
    }

    #[test]
    fn column_bounds() {
        assert!(fits_column(&dec("0.00")));
        assert!(fits_column(&dec("99999999.99")));
        assert!(!fits_column(&dec("100000000.00")));
        assert!(!fits_column(&dec("-0.01")));
    }
}
