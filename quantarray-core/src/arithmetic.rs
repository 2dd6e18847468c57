//! Dimension-aware arithmetic and comparison for [`Quantity`].
//!
//! Every binary operation has the same shape: derive the result dimensionality from the
//! operands, then combine the magnitudes elementwise (with NumPy-style broadcasting)
//! into a fresh buffer. The dimensionality check always runs first, so no magnitude
//! work happens for an undefined combination.

use crate::dimension::Dimensionality;
use crate::error::{QuantityError, Result};
use crate::operand::Operand;
use crate::quantity::Quantity;
use core::ops::{Add, Div, Mul, Neg, Sub};
use ndarray::{ArrayD, ArrayViewD, Zip};

// ─────────────────────────────────────────────────────────────────────────────
// Broadcasting
// ─────────────────────────────────────────────────────────────────────────────

/// Common shape of two arrays under NumPy broadcasting rules.
pub(crate) fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Option<Vec<usize>> {
    let ndim = lhs.len().max(rhs.len());
    let mut shape = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let l = lhs.len().checked_sub(i + 1).map_or(1, |axis| lhs[axis]);
        let r = rhs.len().checked_sub(i + 1).map_or(1, |axis| rhs[axis]);
        let len = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => return None,
        };
        shape.push(len);
    }
    shape.reverse();
    Some(shape)
}

/// Applies `op` elementwise over the broadcast of `lhs` and `rhs`.
pub(crate) fn zip_with<T>(
    lhs: ArrayViewD<'_, f64>,
    rhs: ArrayViewD<'_, f64>,
    op: impl Fn(f64, f64) -> T,
) -> Result<ArrayD<T>> {
    let mismatch = || QuantityError::ShapeMismatch {
        lhs: lhs.shape().to_vec(),
        rhs: rhs.shape().to_vec(),
    };
    let shape = broadcast_shape(lhs.shape(), rhs.shape()).ok_or_else(mismatch)?;
    let l = lhs.broadcast(shape.as_slice()).ok_or_else(mismatch)?;
    let r = rhs.broadcast(shape.as_slice()).ok_or_else(mismatch)?;
    Ok(Zip::from(l).and(r).map_collect(|&a, &b| op(a, b)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Arithmetic
// ─────────────────────────────────────────────────────────────────────────────

impl Quantity {
    /// Elementwise sum. Both sides must have identical dimensionalities.
    ///
    /// A bare number or array is only accepted when `self` is dimensionless.
    ///
    /// ```rust
    /// use quantarray_core::Quantity;
    ///
    /// let a = Quantity::new([1.0, 2.0], "m").unwrap();
    /// let b = Quantity::new([0.5, 0.5], "m").unwrap();
    /// let sum = a.add(&b).unwrap();
    /// assert_eq!(sum.magnitude().as_slice().unwrap(), &[1.5, 2.5]);
    ///
    /// assert!(a.add(1.0).is_err());
    /// ```
    pub fn add<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Quantity> {
        self.additive(other.into(), Dimensionality::add, |a, b| a + b)
    }

    /// Elementwise difference, with the same unit rules as [`Quantity::add`].
    pub fn sub<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Quantity> {
        self.additive(other.into(), Dimensionality::sub, |a, b| a - b)
    }

    /// Elementwise product. Dimensionalities multiply when `other` is a quantity.
    pub fn mul<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Quantity> {
        let other = other.into();
        let dims = match &other {
            Operand::Quantity(q) => self.dimensionality() * q.dimensionality(),
            Operand::Scalar(_) | Operand::Array(_) => self.dimensionality().clone(),
        };
        let magnitude = zip_with(self.magnitude.view(), other.magnitude().view(), |a, b| a * b)?;
        Ok(Quantity::from_parts(magnitude, dims))
    }

    /// Elementwise true division. Dimensionalities divide when `other` is a quantity.
    ///
    /// ```rust
    /// use quantarray_core::Quantity;
    ///
    /// let d = Quantity::new(5.0, "meter").unwrap();
    /// let t = Quantity::new(2.0, "second").unwrap();
    /// let v = d.div(&t).unwrap();
    /// assert_eq!(v.units(), "m/s");
    /// assert_eq!(v.magnitude().sum(), 2.5);
    /// ```
    pub fn div<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Quantity> {
        let other = other.into();
        let dims = match &other {
            Operand::Quantity(q) => self.dimensionality() / q.dimensionality(),
            Operand::Scalar(_) | Operand::Array(_) => self.dimensionality().clone(),
        };
        let magnitude = zip_with(self.magnitude.view(), other.magnitude().view(), |a, b| a / b)?;
        Ok(Quantity::from_parts(magnitude, dims))
    }

    /// Elementwise power.
    ///
    /// The exponent must not carry units. A dimensioned base can only be raised to a
    /// uniform exponent, since a single dimensionality has to describe every element.
    pub fn pow<'a>(&self, exponent: impl Into<Operand<'a>>) -> Result<Quantity> {
        let exponent = exponent.into();
        if let Operand::Quantity(q) = &exponent {
            if !q.dimensionality().is_dimensionless() {
                return Err(QuantityError::DimensionedExponent { units: q.units() });
            }
        }

        let values = exponent.magnitude();
        let dims = if self.dimensionality().is_dimensionless() {
            Dimensionality::dimensionless()
        } else {
            let mut iter = values.iter();
            let first = iter
                .next()
                .copied()
                .ok_or(QuantityError::NonUniformExponent)?;
            if !first.is_finite() {
                return Err(QuantityError::NonFiniteExponent { exponent: first });
            }
            if iter.any(|&value| value != first) {
                return Err(QuantityError::NonUniformExponent);
            }
            self.dimensionality().powf(first)
        };

        let magnitude = zip_with(self.magnitude.view(), values.view(), f64::powf)?;
        Ok(Quantity::from_parts(magnitude, dims))
    }

    /// Raises every element, and the dimensionality, to `exponent`.
    ///
    /// Infallible; a non-finite exponent shows up in the units (`m**NaN`). Use
    /// [`Quantity::pow`] to have it rejected.
    pub fn powf(&self, exponent: f64) -> Quantity {
        Quantity::from_parts(
            self.magnitude.mapv(|value| value.powf(exponent)),
            self.dimensionality().powf(exponent),
        )
    }

    /// `other * self`, computed as `self * other`.
    ///
    /// Multiplication is assumed to commute for every operand kind.
    pub fn rmul<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Quantity> {
        self.mul(other)
    }

    /// `other / self`, computed as `other * self**-1`.
    pub fn rdiv<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Quantity> {
        let inverse = self.powf(-1.0);
        match other.into() {
            Operand::Quantity(q) => q.mul(&inverse),
            other => inverse.rmul(other),
        }
    }

    fn additive(
        &self,
        other: Operand<'_>,
        combine: fn(&Dimensionality, &Dimensionality) -> Dimensionality,
        op: fn(f64, f64) -> f64,
    ) -> Result<Quantity> {
        let dims = match &other {
            Operand::Quantity(q) => {
                if self.dimensionality() != q.dimensionality() {
                    return Err(QuantityError::IncompatibleUnits {
                        from: q.units(),
                        to: self.units(),
                    });
                }
                combine(self.dimensionality(), q.dimensionality())
            }
            Operand::Scalar(_) | Operand::Array(_) => {
                if !self.dimensionality().is_dimensionless() {
                    return Err(QuantityError::UnitlessOperand { units: self.units() });
                }
                Dimensionality::dimensionless()
            }
        };
        let magnitude = zip_with(self.magnitude.view(), other.magnitude().view(), op)?;
        Ok(Quantity::from_parts(magnitude, dims))
    }

    fn map_values(&self, f: impl Fn(f64) -> f64) -> Quantity {
        Quantity::from_parts(self.magnitude.mapv(f), self.dimensionality().clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Comparison
// ─────────────────────────────────────────────────────────────────────────────

/// Elementwise comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
}

impl Comparison {
    fn apply(self, a: f64, b: f64) -> bool {
        match self {
            Comparison::Less => a < b,
            Comparison::LessEqual => a <= b,
            Comparison::Equal => a == b,
            Comparison::NotEqual => a != b,
            Comparison::Greater => a > b,
            Comparison::GreaterEqual => a >= b,
        }
    }
}

/// Simplifies both sides and checks that they share a dimensionality.
fn prepare_compatible_units(lhs: &Quantity, rhs: &Quantity) -> Result<(Quantity, Quantity)> {
    let (l, r) = (lhs.simplified(), rhs.simplified());
    if l.dimensionality() != r.dimensionality() {
        return Err(QuantityError::IncompatibleUnits {
            from: l.units(),
            to: r.units(),
        });
    }
    Ok((l, r))
}

impl Quantity {
    /// Compares elementwise after reducing both sides to base units.
    ///
    /// Returns one boolean per (broadcast) element, never a single truth value.
    ///
    /// ```rust
    /// use quantarray_core::{Comparison, Quantity};
    ///
    /// let a = Quantity::new([1.0, 2.0], "km").unwrap();
    /// let b = Quantity::new([1500.0, 1500.0], "m").unwrap();
    /// let less = a.compare(&b, Comparison::Less).unwrap();
    /// assert_eq!(less.as_slice().unwrap(), &[true, false]);
    ///
    /// let t = Quantity::new([1.0, 2.0], "s").unwrap();
    /// assert!(a.compare(&t, Comparison::Less).is_err());
    /// ```
    pub fn compare(&self, other: &Quantity, op: Comparison) -> Result<ArrayD<bool>> {
        let (l, r) = prepare_compatible_units(self, other)?;
        zip_with(l.magnitude.view(), r.magnitude.view(), |a, b| op.apply(a, b))
    }

    /// Elementwise `<`.
    pub fn lt(&self, other: &Quantity) -> Result<ArrayD<bool>> {
        self.compare(other, Comparison::Less)
    }

    /// Elementwise `<=`.
    pub fn le(&self, other: &Quantity) -> Result<ArrayD<bool>> {
        self.compare(other, Comparison::LessEqual)
    }

    /// Elementwise `==`.
    pub fn eq(&self, other: &Quantity) -> Result<ArrayD<bool>> {
        self.compare(other, Comparison::Equal)
    }

    /// Elementwise `!=`.
    pub fn ne(&self, other: &Quantity) -> Result<ArrayD<bool>> {
        self.compare(other, Comparison::NotEqual)
    }

    /// Elementwise `>`.
    pub fn gt(&self, other: &Quantity) -> Result<ArrayD<bool>> {
        self.compare(other, Comparison::Greater)
    }

    /// Elementwise `>=`.
    pub fn ge(&self, other: &Quantity) -> Result<ArrayD<bool>> {
        self.compare(other, Comparison::GreaterEqual)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operator implementations
// ─────────────────────────────────────────────────────────────────────────────

impl<'a> Add<&'a Quantity> for &Quantity {
    type Output = Result<Quantity>;
    fn add(self, rhs: &'a Quantity) -> Result<Quantity> {
        Quantity::add(self, rhs)
    }
}

impl<'a> Sub<&'a Quantity> for &Quantity {
    type Output = Result<Quantity>;
    fn sub(self, rhs: &'a Quantity) -> Result<Quantity> {
        Quantity::sub(self, rhs)
    }
}

impl<'a> Mul<&'a Quantity> for &Quantity {
    type Output = Result<Quantity>;
    fn mul(self, rhs: &'a Quantity) -> Result<Quantity> {
        Quantity::mul(self, rhs)
    }
}

impl<'a> Div<&'a Quantity> for &Quantity {
    type Output = Result<Quantity>;
    fn div(self, rhs: &'a Quantity) -> Result<Quantity> {
        Quantity::div(self, rhs)
    }
}

impl Mul<f64> for &Quantity {
    type Output = Quantity;
    fn mul(self, rhs: f64) -> Quantity {
        self.map_values(|value| value * rhs)
    }
}

impl Mul<&Quantity> for f64 {
    type Output = Quantity;
    fn mul(self, rhs: &Quantity) -> Quantity {
        rhs * self
    }
}

impl Div<f64> for &Quantity {
    type Output = Quantity;
    fn div(self, rhs: f64) -> Quantity {
        self.map_values(|value| value / rhs)
    }
}

impl Div<&Quantity> for f64 {
    type Output = Quantity;
    fn div(self, rhs: &Quantity) -> Quantity {
        &rhs.powf(-1.0) * self
    }
}

impl Neg for &Quantity {
    type Output = Quantity;
    fn neg(self) -> Quantity {
        self.map_values(|value| -value)
    }
}
