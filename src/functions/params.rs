//! Parameter types for registered functions.
//!
//! Each parameter carries an explicit [`ParamType`] tag. The console uses the
//! tag to coerce typed input, the server uses it to validate decoded values.

use serde_json::Value;
use thiserror::Error;

/// Declared type of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Any finite number
    Real,
    /// Signed 64-bit integer
    Integer,
    /// Arbitrary text
    Text,
    /// Sequence of strings
    TextList,
}

/// Error returned when console input cannot be coerced to a parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {input:?}")]
pub struct CoercionError {
    pub expected: &'static str,
    pub input: String,
}

impl ParamType {
    /// Type name shown in help output and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Real => "float",
            Self::Integer => "int",
            Self::Text => "str",
            Self::TextList => "list[str]",
        }
    }

    /// Coerce one line of user input to a JSON value of this type.
    ///
    /// `TextList` input is split on whitespace and must contain at least one word.
    pub fn parse(&self, input: &str) -> Result<Value, CoercionError> {
        let err = || CoercionError {
            expected: self.name(),
            input: input.to_string(),
        };

        match self {
            Self::Real => {
                let x: f64 = input.trim().parse().map_err(|_| err())?;
                if !x.is_finite() {
                    return Err(err());
                }
                Ok(Value::from(x))
            }
            Self::Integer => input
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| err()),
            Self::Text => Ok(Value::String(input.to_string())),
            Self::TextList => {
                let words: Vec<Value> = input
                    .split_whitespace()
                    .map(|w| Value::String(w.to_string()))
                    .collect();
                if words.is_empty() {
                    return Err(err());
                }
                Ok(Value::Array(words))
            }
        }
    }

    /// Whether a decoded JSON value is acceptable for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Real => value.is_number(),
            Self::Integer => value.is_i64(),
            Self::Text => value.is_string(),
            Self::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed parameter of a registered function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
}

impl ParamSpec {
    pub const fn new(name: &'static str, ty: ParamType) -> Self {
        Self { name, ty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_real_accepts_integers_and_decimals() {
        assert_eq!(ParamType::Real.parse("3").unwrap(), json!(3.0));
        assert_eq!(ParamType::Real.parse(" -2.5 ").unwrap(), json!(-2.5));
    }

    #[test]
    fn parse_real_rejects_garbage_and_non_finite() {
        assert!(ParamType::Real.parse("abc").is_err());
        assert!(ParamType::Real.parse("inf").is_err());
        assert!(ParamType::Real.parse("NaN").is_err());
    }

    #[test]
    fn parse_integer_rejects_fractions() {
        assert_eq!(ParamType::Integer.parse("4").unwrap(), json!(4));
        let err = ParamType::Integer.parse("4.5").unwrap_err();
        assert_eq!(err.expected, "int");
        assert_eq!(err.to_string(), "expected int, got \"4.5\"");
    }

    #[test]
    fn parse_text_keeps_input_verbatim() {
        assert_eq!(ParamType::Text.parse(" a b ").unwrap(), json!(" a b "));
    }

    #[test]
    fn parse_text_list_splits_on_whitespace() {
        assert_eq!(
            ParamType::TextList.parse("cherry  apple\tbanana").unwrap(),
            json!(["cherry", "apple", "banana"])
        );
        assert!(ParamType::TextList.parse("   ").is_err());
    }

    #[test]
    fn accepts_checks_json_shape() {
        assert!(ParamType::Real.accepts(&json!(1)));
        assert!(ParamType::Real.accepts(&json!(1.5)));
        assert!(!ParamType::Real.accepts(&json!("1.5")));
        assert!(ParamType::Integer.accepts(&json!(-3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::TextList.accepts(&json!(["a", "b"])));
        assert!(ParamType::TextList.accepts(&json!([])));
        assert!(!ParamType::TextList.accepts(&json!(["a", 1])));
    }
}
