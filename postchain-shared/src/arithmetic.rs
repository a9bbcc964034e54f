/// Arithmetic engine for post values
///
/// A post derives its value from its parent's value by applying one of four
/// operations with its own operand. This module owns the operation type and
/// the pure computation; it knows nothing about posts or storage.
///
/// # Example
///
/// ```
/// use postchain_shared::arithmetic::{compute, Operation};
///
/// assert_eq!(compute(5.0, Operation::Add, 3.0), 8.0);
/// assert_eq!(compute(8.0, Operation::Multiply, 2.0), 16.0);
///
/// let op: Operation = "/".parse().unwrap();
/// assert_eq!(op, Operation::Divide);
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arithmetic operation applied to a parent's value
///
/// Serialized as its symbol (`"+"`, `"-"`, `"*"`, `"/"`), both on the wire and
/// in the `posts.operation` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `+`
    #[serde(rename = "+")]
    Add,

    /// `-`
    #[serde(rename = "-")]
    Subtract,

    /// `*`
    #[serde(rename = "*")]
    Multiply,

    /// `/`
    #[serde(rename = "/")]
    Divide,
}

impl Operation {
    /// All operations, in symbol order
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    /// Returns the operation symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operation symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operation '{0}', expected one of + - * /")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operation::Add),
            "-" => Ok(Operation::Subtract),
            "*" => Ok(Operation::Multiply),
            "/" => Ok(Operation::Divide),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

impl TryFrom<String> for Operation {
    type Error = UnknownOperation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Applies `operation` to `parent_value` with `operand`
///
/// Callers must never pass `Operation::Divide` with a zero operand; post
/// validation rejects that combination before any value is computed.
pub fn compute(parent_value: f64, operation: Operation, operand: f64) -> f64 {
    match operation {
        Operation::Add => parent_value + operand,
        Operation::Subtract => parent_value - operand,
        Operation::Multiply => parent_value * operand,
        Operation::Divide => {
            debug_assert!(operand != 0.0, "division by zero must be rejected upstream");
            parent_value / operand
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5.0, Operation::Add, 3.0, 8.0)]
    #[case(5.0, Operation::Subtract, 3.0, 2.0)]
    #[case(8.0, Operation::Multiply, 2.0, 16.0)]
    #[case(9.0, Operation::Divide, 3.0, 3.0)]
    #[case(-4.0, Operation::Multiply, 0.0, 0.0)]
    #[case(1.0, Operation::Divide, 4.0, 0.25)]
    fn test_compute(
        #[case] parent: f64,
        #[case] operation: Operation,
        #[case] operand: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(compute(parent, operation, operand), expected);
    }

    #[test]
    fn test_parse_symbols() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_parse_unknown_symbol() {
        let err = "%".parse::<Operation>().unwrap_err();
        assert_eq!(err, UnknownOperation("%".to_string()));
    }

    #[test]
    fn test_serde_uses_symbols() {
        let json = serde_json::to_string(&Operation::Multiply).unwrap();
        assert_eq!(json, "\"*\"");

        let op: Operation = serde_json::from_str("\"-\"").unwrap();
        assert_eq!(op, Operation::Subtract);

        assert!(serde_json::from_str::<Operation>("\"^\"").is_err());
    }
}
