//! Calculator operations.
//!
//! The four arithmetic routes share one operation enum. Route tokens are
//! kept in their original wire form (`soma`, `subtracao`, `multiplicacao`,
//! `divisao`) for compatibility with existing clients.

use std::str::FromStr;

use crate::error::{Error, Result};

/// An arithmetic operation over two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Addition (`soma`).
    Add,
    /// Subtraction (`subtracao`).
    Subtract,
    /// Multiplication (`multiplicacao`).
    Multiply,
    /// Division (`divisao`).
    Divide,
}

impl Operation {
    /// Applies the operation to the given operands.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DivisionByZero`] when dividing by zero. All other
    /// results follow IEEE 754 double semantics.
    pub fn apply(self, a: f64, b: f64) -> Result<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide => {
                if b == 0.0 {
                    Err(Error::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }
        }
    }

    /// Returns the wire token for this operation.
    #[must_use]
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Add => "soma",
            Self::Subtract => "subtracao",
            Self::Multiply => "multiplicacao",
            Self::Divide => "divisao",
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "soma" => Ok(Self::Add),
            "subtracao" => Ok(Self::Subtract),
            "multiplicacao" => Ok(Self::Multiply),
            "divisao" => Ok(Self::Divide),
            other => Err(Error::invalid_parameter(format!(
                "unknown operation: {other}"
            ))),
        }
    }
}
