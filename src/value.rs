//! Dynamically typed values stored in the variable environment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A variable value: integer, float or text.
///
/// Serialized untagged so that a saved environment is a plain JSON object
/// (`{"a": 5, "pi": 3.14, "HOME": "/home/me"}`); integers and floats keep
/// their type across a round trip because serde_json writes `5.0` for floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Failure of a single operation on two values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("unsupported operand type(s) for {op}: '{lhs}' and '{rhs}'")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("bad operand type for unary {op}: '{operand}'")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
    #[error("repeated string would exceed {max} bytes")]
    StringTooLong { max: usize },
}

/// Longest string a repetition may produce.
pub const MAX_STRING_LEN: usize = 1 << 28;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Str(_) => None,
        }
    }

    fn mismatch(op: &'static str, lhs: &Value, rhs: &Value) -> ValueError {
        ValueError::TypeMismatch {
            op,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }
    }

    /// Applies a numeric operation, staying in integers when both sides are
    /// integers and `int_op` is given.
    fn numeric(
        &self,
        rhs: &Value,
        op: &'static str,
        int_op: Option<fn(i64, i64) -> Result<Value, ValueError>>,
        float_op: fn(f64, f64) -> Result<Value, ValueError>,
    ) -> Result<Value, ValueError> {
        if let (Value::Int(a), Value::Int(b), Some(int_op)) = (self, rhs, int_op) {
            return int_op(*a, *b);
        }
        match (self.as_float(), rhs.as_float()) {
            (Some(a), Some(b)) => float_op(a, b),
            _ => Err(Self::mismatch(op, self, rhs)),
        }
    }

    pub fn add(&self, rhs: &Value) -> Result<Value, ValueError> {
        if let (Value::Str(a), Value::Str(b)) = (self, rhs) {
            return Ok(Value::Str(format!("{a}{b}")));
        }
        self.numeric(
            rhs,
            "+",
            Some(|a, b| {
                a.checked_add(b)
                    .map(Value::Int)
                    .ok_or(ValueError::Overflow("+"))
            }),
            |a, b| Ok(Value::Float(a + b)),
        )
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.numeric(
            rhs,
            "-",
            Some(|a, b| {
                a.checked_sub(b)
                    .map(Value::Int)
                    .ok_or(ValueError::Overflow("-"))
            }),
            |a, b| Ok(Value::Float(a - b)),
        )
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value, ValueError> {
        match (self, rhs) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                repeat(s, *n).map(Value::Str)
            }
            _ => self.numeric(
                rhs,
                "*",
                Some(|a, b| {
                    a.checked_mul(b)
                        .map(Value::Int)
                        .ok_or(ValueError::Overflow("*"))
                }),
                |a, b| Ok(Value::Float(a * b)),
            ),
        }
    }

    /// True division: the result is always a float.
    pub fn div(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.numeric(rhs, "/", None, |a, b| {
            if b == 0.0 {
                Err(ValueError::DivisionByZero)
            } else {
                Ok(Value::Float(a / b))
            }
        })
    }

    /// Modulo with the sign of the divisor.
    pub fn rem(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.numeric(
            rhs,
            "%",
            Some(|a, b| {
                if b == 0 {
                    return Err(ValueError::DivisionByZero);
                }
                let r = a.checked_rem(b).ok_or(ValueError::Overflow("%"))?;
                Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }),
            |a, b| {
                if b == 0.0 {
                    return Err(ValueError::DivisionByZero);
                }
                let r = a % b;
                Ok(Value::Float(if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    r + b
                } else {
                    r
                }))
            },
        )
    }

    pub fn pow(&self, rhs: &Value) -> Result<Value, ValueError> {
        self.numeric(
            rhs,
            "**",
            Some(|a, b| {
                if b < 0 {
                    if a == 0 {
                        return Err(ValueError::DivisionByZero);
                    }
                    return Ok(Value::Float((a as f64).powf(b as f64)));
                }
                u32::try_from(b)
                    .ok()
                    .and_then(|exp| a.checked_pow(exp))
                    .map(Value::Int)
                    .ok_or(ValueError::Overflow("**"))
            }),
            |a, b| {
                if a == 0.0 && b < 0.0 {
                    Err(ValueError::DivisionByZero)
                } else {
                    Ok(Value::Float(a.powf(b)))
                }
            },
        )
    }

    pub fn neg(&self) -> Result<Value, ValueError> {
        match self {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or(ValueError::Overflow("-")),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Str(_) => Err(ValueError::BadOperand {
                op: "-",
                operand: "str",
            }),
        }
    }

    pub fn pos(&self) -> Result<Value, ValueError> {
        match self {
            Value::Str(_) => Err(ValueError::BadOperand {
                op: "+",
                operand: "str",
            }),
            other => Ok(other.clone()),
        }
    }
}

/// `s` repeated `count` times; a non-positive count gives the empty string.
fn repeat(s: &str, count: i64) -> Result<String, ValueError> {
    let Ok(n) = usize::try_from(count) else {
        return Ok(String::new());
    };
    match s.len().checked_mul(n) {
        Some(len) if len <= MAX_STRING_LEN => Ok(s.repeat(n)),
        _ => Err(ValueError::StringTooLong {
            max: MAX_STRING_LEN,
        }),
    }
}

/// Float text in the shortest form that still reads back as a float.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{x:?}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic_stays_int() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(Value::Int(2).mul(&Value::Int(3)), Ok(Value::Int(6)));
        assert_eq!(Value::Int(2).pow(&Value::Int(10)), Ok(Value::Int(1024)));
    }

    #[test]
    fn test_division_is_always_float() {
        assert_eq!(Value::Int(10).div(&Value::Int(4)), Ok(Value::Float(2.5)));
        assert_eq!(Value::Int(10).div(&Value::Int(2)), Ok(Value::Float(5.0)));
        assert_eq!(
            Value::Int(1).div(&Value::Int(0)),
            Err(ValueError::DivisionByZero)
        );
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(Value::Int(-7).rem(&Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(Value::Int(7).rem(&Value::Int(-3)), Ok(Value::Int(-2)));
        assert_eq!(Value::Int(7).rem(&Value::Int(3)), Ok(Value::Int(1)));
        assert_eq!(
            Value::Float(-7.5).rem(&Value::Int(2)),
            Ok(Value::Float(0.5))
        );
    }

    #[test]
    fn test_negative_exponent_gives_float() {
        assert_eq!(Value::Int(2).pow(&Value::Int(-1)), Ok(Value::Float(0.5)));
    }

    #[test]
    fn test_mixed_numbers_promote_to_float() {
        assert_eq!(Value::Int(1).add(&Value::Float(0.5)), Ok(Value::Float(1.5)));
    }

    #[test]
    fn test_string_concat_and_repeat() {
        assert_eq!(Value::from("ab").add(&Value::from("cd")), Ok("abcd".into()));
        assert_eq!(Value::from("ab").mul(&Value::Int(3)), Ok("ababab".into()));
        assert_eq!(Value::Int(2).mul(&Value::from("x")), Ok("xx".into()));
        assert_eq!(Value::from("x").mul(&Value::Int(-2)), Ok("".into()));
    }

    #[test]
    fn test_repeat_is_bounded() {
        let too_long = Err(ValueError::StringTooLong {
            max: MAX_STRING_LEN,
        });
        assert_eq!(Value::from("ab").mul(&Value::Int(i64::MAX)), too_long);
        assert_eq!(Value::Int(10_000_000_000_000).mul(&Value::from("x")), too_long);
        assert_eq!(Value::from("").mul(&Value::Int(i64::MAX)), Ok("".into()));

        let limit = i64::try_from(MAX_STRING_LEN).unwrap();
        assert!(Value::from("x").mul(&Value::Int(limit + 1)).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            Value::from("a").add(&Value::Int(1)),
            Err(ValueError::TypeMismatch {
                op: "+",
                lhs: "str",
                rhs: "int"
            })
        );
        assert!(Value::from("a").mul(&Value::Float(2.0)).is_err());
        assert!(Value::from("a").neg().is_err());
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            Value::Int(i64::MAX).add(&Value::Int(1)),
            Err(ValueError::Overflow("+"))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(150).to_string(), "150");
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
        assert_eq!(Value::Float(0.1).to_string(), "0.1");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }

    #[test]
    fn test_json_keeps_numeric_types() {
        let values = vec![Value::Int(5), Value::Float(5.0), Value::from("5")];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[5,5.0,"5"]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
