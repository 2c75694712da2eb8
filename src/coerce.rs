use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Resolves any user or stored value to a finite number. Anything that is not
/// a finite number (or text/bool that reads as one) becomes 0.
pub fn to_finite_number_or_zero(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().map(finite_or_zero).unwrap_or(0.0),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return 0.0;
            }
            text.parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
        }
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn to_year(value: &Value) -> i32 {
    let number = to_finite_number_or_zero(value).trunc();
    number.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

fn to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_finite_number_or_zero(&value))
}

pub fn number_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|value| to_finite_number_or_zero(&value)))
}

pub fn year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_year(&value))
}

pub fn year_opt<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|value| to_year(&value)))
}

pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_text(value))
}

pub fn text_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(to_text))
}
