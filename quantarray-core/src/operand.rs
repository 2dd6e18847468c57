//! Tagged inputs accepted by quantity constructors and operators.
//!
//! Instead of inspecting operand types at runtime, every entry point takes one of these
//! enums. `From` impls keep call sites short: `Quantity::new([1.0, 2.0], "meter")`.

use crate::dimension::Dimensionality;
use crate::quantity::Quantity;
use ndarray::{arr0, Array, Array1, ArrayD, ArrayViewD, CowArray, Dimension, IxDyn};

/// Right-hand side of an arithmetic operation.
#[derive(Clone, Debug)]
pub enum Operand<'a> {
    /// Another quantity; its dimensionality takes part in the result.
    Quantity(&'a Quantity),
    /// A bare number.
    Scalar(f64),
    /// A bare array, broadcast against the quantity's magnitude.
    Array(ArrayViewD<'a, f64>),
}

impl Operand<'_> {
    /// Numeric payload, as an array (0-d for scalars).
    pub(crate) fn magnitude(&self) -> CowArray<'_, f64, IxDyn> {
        match self {
            Operand::Quantity(q) => CowArray::from(q.magnitude().view()),
            Operand::Scalar(value) => CowArray::from(arr0(*value).into_dyn()),
            Operand::Array(array) => CowArray::from(array.view()),
        }
    }
}

impl<'a> From<&'a Quantity> for Operand<'a> {
    fn from(q: &'a Quantity) -> Self {
        Operand::Quantity(q)
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

impl<'a, D: Dimension> From<&'a Array<f64, D>> for Operand<'a> {
    fn from(array: &'a Array<f64, D>) -> Self {
        Operand::Array(array.view().into_dyn())
    }
}

impl<'a> From<ArrayViewD<'a, f64>> for Operand<'a> {
    fn from(view: ArrayViewD<'a, f64>) -> Self {
        Operand::Array(view)
    }
}

/// Numeric payload of a new quantity.
#[derive(Clone, Debug)]
pub enum QuantityData<'a> {
    /// Raw values. The array is moved in; callers that keep theirs pass a clone.
    Array(ArrayD<f64>),
    /// An existing quantity, copied (and converted, if new units are given).
    Quantity(&'a Quantity),
}

impl<D: Dimension> From<Array<f64, D>> for QuantityData<'_> {
    fn from(array: Array<f64, D>) -> Self {
        QuantityData::Array(array.into_dyn())
    }
}

impl From<Vec<f64>> for QuantityData<'_> {
    fn from(values: Vec<f64>) -> Self {
        QuantityData::Array(Array1::from(values).into_dyn())
    }
}

impl From<&[f64]> for QuantityData<'_> {
    fn from(values: &[f64]) -> Self {
        QuantityData::Array(Array1::from(values.to_vec()).into_dyn())
    }
}

impl<const N: usize> From<[f64; N]> for QuantityData<'_> {
    fn from(values: [f64; N]) -> Self {
        QuantityData::Array(Array1::from(values.to_vec()).into_dyn())
    }
}

impl From<f64> for QuantityData<'_> {
    fn from(value: f64) -> Self {
        QuantityData::Array(arr0(value).into_dyn())
    }
}

impl<'a> From<&'a Quantity> for QuantityData<'a> {
    fn from(q: &'a Quantity) -> Self {
        QuantityData::Quantity(q)
    }
}

/// How the units of a new quantity are specified.
#[derive(Clone, Debug, Default)]
pub enum UnitSpec<'a> {
    /// Inherit from a quantity payload, otherwise dimensionless.
    #[default]
    Empty,
    /// A unit expression resolved through the registry. `""` means dimensionless.
    Name(&'a str),
    /// Use the dimensionality of an existing quantity.
    Quantity(&'a Quantity),
    /// Use this dimensionality directly.
    Dimensionality(Dimensionality),
    /// No dimensionality yet; bound on first access. Protected quantities only.
    Deferred,
}

impl UnitSpec<'_> {
    /// Whether these units mean "no explicit units", in which case a quantity payload
    /// keeps its own.
    pub fn is_empty(&self) -> bool {
        match self {
            UnitSpec::Empty | UnitSpec::Deferred => true,
            UnitSpec::Name(name) => name.trim().is_empty(),
            UnitSpec::Dimensionality(dims) => dims.is_dimensionless(),
            UnitSpec::Quantity(_) => false,
        }
    }
}

impl<'a> From<&'a str> for UnitSpec<'a> {
    fn from(name: &'a str) -> Self {
        UnitSpec::Name(name)
    }
}

impl<'a> From<&'a String> for UnitSpec<'a> {
    fn from(name: &'a String) -> Self {
        UnitSpec::Name(name.as_str())
    }
}

impl<'a> From<&'a Quantity> for UnitSpec<'a> {
    fn from(q: &'a Quantity) -> Self {
        UnitSpec::Quantity(q)
    }
}

impl From<Dimensionality> for UnitSpec<'_> {
    fn from(dims: Dimensionality) -> Self {
        UnitSpec::Dimensionality(dims)
    }
}

impl From<&Dimensionality> for UnitSpec<'_> {
    fn from(dims: &Dimensionality) -> Self {
        UnitSpec::Dimensionality(dims.clone())
    }
}
