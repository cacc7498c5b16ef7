//! Angle expressions for rotation gates.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A numeric angle expression as written in the source program.
///
/// Expressions are kept unevaluated so logs can show `pi/2` instead of
/// `1.5707963267948966`; [`as_f64`](Self::as_f64) folds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Evaluate to a finite `f64`.
    ///
    /// Returns `None` on division by zero or a non-finite result.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            ParameterExpression::Constant(v) => *v,
            ParameterExpression::Pi => PI,
            ParameterExpression::Neg(e) => -e.as_f64()?,
            ParameterExpression::Add(a, b) => a.as_f64()? + b.as_f64()?,
            ParameterExpression::Sub(a, b) => a.as_f64()? - b.as_f64()?,
            ParameterExpression::Mul(a, b) => a.as_f64()? * b.as_f64()?,
            ParameterExpression::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                a.as_f64()? / divisor
            }
        };
        value.is_finite().then_some(value)
    }

    /// Fold the expression into a single constant when possible.
    pub fn simplify(&self) -> Self {
        match self.as_f64() {
            Some(v) => ParameterExpression::Constant(v),
            None => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Sub(a, b) => write!(f, "({a} - {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_pi_over_two() {
        let p = ParameterExpression::pi() / ParameterExpression::constant(2.0);
        assert!((p.as_f64().unwrap() - PI / 2.0).abs() < 1e-12);
        assert_eq!(p.to_string(), "(pi / 2)");
    }

    #[test]
    fn test_division_by_zero_is_unevaluable() {
        let p = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert_eq!(p.as_f64(), None);
        assert_eq!(p.simplify(), p);
    }

    #[test]
    fn test_simplify_folds() {
        let p = -(ParameterExpression::constant(2.0) + ParameterExpression::constant(3.0));
        assert_eq!(p.simplify(), ParameterExpression::Constant(-5.0));
    }
}
