//! Built-in coercion functions for [`Annotation::coerce`](super::Annotation::coerce).

use super::{CoercionError, Value};

pub fn lower(s: &str) -> Result<Value, CoercionError> {
    Ok(Value::Str(s.to_lowercase()))
}

pub fn upper(s: &str) -> Result<Value, CoercionError> {
    Ok(Value::Str(s.to_uppercase()))
}

pub fn int(s: &str) -> Result<Value, CoercionError> {
    s.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| CoercionError::new(s, "integer"))
}

pub fn float(s: &str) -> Result<Value, CoercionError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::Float)
        .ok_or_else(|| CoercionError::new(s, "number"))
}

/// Accepts the usual chat spellings of yes and no.
pub fn boolean(s: &str) -> Result<Value, CoercionError> {
    match s.to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "on" | "enable" | "enabled" => Ok(Value::Bool(true)),
        "no" | "n" | "false" | "f" | "0" | "off" | "disable" | "disabled" => {
            Ok(Value::Bool(false))
        }
        _ => Err(CoercionError::new(s, "boolean")),
    }
}

/// Rejects empty or whitespace-only tokens.
pub fn non_empty(s: &str) -> Result<Value, CoercionError> {
    if s.trim().is_empty() {
        Err(CoercionError::new(s, "non-empty text"))
    } else {
        Ok(Value::Str(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(int("42"), Ok(Value::Int(42)));
        assert_eq!(int(" -7 "), Ok(Value::Int(-7)));
        assert!(int("4.2").is_err());
        assert_eq!(float("4.5"), Ok(Value::Float(4.5)));
        assert!(float("nan").is_err());
        assert!(float("abc").is_err());
    }

    #[test]
    fn booleans() {
        assert_eq!(boolean("Yes"), Ok(Value::Bool(true)));
        assert_eq!(boolean("off"), Ok(Value::Bool(false)));
        let err = boolean("maybe").unwrap_err();
        assert_eq!(err.to_string(), "cannot interpret \"maybe\" as boolean");
    }

    #[test]
    fn case_and_emptiness() {
        assert_eq!(lower("MiXeD"), Ok(Value::Str("mixed".into())));
        assert_eq!(upper("abc"), Ok(Value::Str("ABC".into())));
        assert!(non_empty("  ").is_err());
        assert!(non_empty("x").is_ok());
    }
}
