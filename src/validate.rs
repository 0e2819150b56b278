//! Input coercion shared by the resource controllers. Clients send ids and
//! prices either as JSON numbers or as numeric strings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::ApiError;

/// Trimmed, non-empty text or `InvalidInput` naming the field.
pub fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::invalid_input(format!("{field} is required"))),
    }
}

/// Blank strings collapse to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn coerce_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub fn required_id(value: Option<&Value>, field: &str) -> Result<i64, ApiError> {
    let value = value.ok_or_else(|| ApiError::invalid_input(format!("{field} is required")))?;
    coerce_id(value)
        .ok_or_else(|| ApiError::invalid_input(format!("{field} must be a positive integer")))
}

/// Largest value a `NUMERIC(12, 2)` price column holds.
pub fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Positive, at most two decimal places, and within `max_price()`.
pub fn positive_price(value: Option<&Value>, field: &str) -> Result<Decimal, ApiError> {
    let value = value.ok_or_else(|| ApiError::invalid_input(format!("{field} is required")))?;
    let price = match coerce_decimal(value) {
        Some(price) if price > Decimal::ZERO => price.normalize(),
        _ => {
            return Err(ApiError::invalid_input(format!(
                "{field} must be a positive number"
            )))
        }
    };
    if price.scale() > 2 {
        return Err(ApiError::invalid_input(format!(
            "{field} must have at most two decimal places"
        )));
    }
    if price > max_price() {
        return Err(ApiError::invalid_input(format!(
            "{field} must not exceed {}",
            max_price()
        )));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(coerce_id(&json!(12)), Some(12));
        assert_eq!(coerce_id(&json!(" 12 ")), Some(12));
        assert_eq!(coerce_id(&json!(0)), None);
        assert_eq!(coerce_id(&json!(-3)), None);
        assert_eq!(coerce_id(&json!(1.5)), None);
        assert_eq!(coerce_id(&json!("abc")), None);
        assert_eq!(coerce_id(&json!(null)), None);
        assert_eq!(coerce_id(&json!([1])), None);
    }

    #[test]
    fn price_must_be_positive() {
        assert_eq!(
            positive_price(Some(&json!(10)), "precio").unwrap(),
            Decimal::from(10)
        );
        assert_eq!(
            positive_price(Some(&json!("19.99")), "precio").unwrap(),
            Decimal::from_str("19.99").unwrap()
        );
        assert!(positive_price(Some(&json!(0)), "precio").is_err());
        assert!(positive_price(Some(&json!(-1)), "precio").is_err());
        assert!(positive_price(Some(&json!("cheap")), "precio").is_err());
        assert!(positive_price(None, "precio").is_err());
    }

    #[test]
    fn price_must_fit_the_column() {
        assert!(positive_price(Some(&json!(0.001)), "precio").is_err());
        assert!(positive_price(Some(&json!("19.999")), "precio").is_err());
        assert!(positive_price(Some(&json!(1e20)), "precio").is_err());
        assert!(positive_price(Some(&json!("10000000000")), "precio").is_err());

        assert_eq!(
            positive_price(Some(&json!("9999999999.99")), "precio").unwrap(),
            max_price()
        );
        assert_eq!(
            positive_price(Some(&json!("12.500")), "precio").unwrap(),
            Decimal::from_str("12.5").unwrap()
        );
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(required_text(Some(" T ".into()), "titulo").unwrap(), "T");
        let err = required_text(Some("   ".into()), "titulo").unwrap_err();
        assert_eq!(err.to_string(), "titulo is required");
        assert!(required_text(None, "titulo").is_err());
    }
}
