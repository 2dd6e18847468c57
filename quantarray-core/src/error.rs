//! Error types for quantity operations.

use thiserror::Error;

/// Result type for quantity and registry operations.
pub type Result<T> = std::result::Result<T, QuantityError>;

/// Errors raised by dimensionality checks, unit conversion, and the unit registry.
///
/// Every error is returned at the point of violation. Nothing is retried or logged
/// on the caller's behalf.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantityError {
    /// Two dimensionalities that must match do not, even after simplification.
    #[error("Unable to convert between units of \"{from}\" and \"{to}\"")]
    IncompatibleUnits {
        /// Units of the left-hand (or source) side.
        from: String,
        /// Units of the right-hand (or target) side.
        to: String,
    },

    /// Attempted to reassign the units of a protected quantity.
    #[error("can not modify protected units")]
    ProtectedUnits,

    /// Attempted to write into the magnitude of a protected quantity.
    #[error("can not assign into a protected quantity")]
    ReadOnly,

    /// A quantity used as a unit does not have unit magnitude.
    #[error("units must have unit magnitude, got {magnitude}")]
    InvalidUnitMagnitude {
        /// Rendering of the offending magnitude.
        magnitude: String,
    },

    /// A dimensioned quantity was added to (or subtracted from) a bare number or array.
    #[error("can not combine a plain number with a quantity in \"{units}\"")]
    UnitlessOperand {
        /// Units of the dimensioned operand.
        units: String,
    },

    /// An exponent carried units.
    #[error("exponent must be dimensionless, got units of \"{units}\"")]
    DimensionedExponent {
        /// Units of the exponent.
        units: String,
    },

    /// A dimensioned quantity was raised to an array of differing exponents.
    #[error("a dimensioned quantity can only be raised to a uniform exponent")]
    NonUniformExponent,

    /// A dimensioned quantity was raised to NaN or an infinity.
    #[error("a dimensioned quantity can not be raised to {exponent}")]
    NonFiniteExponent {
        /// The offending exponent.
        exponent: f64,
    },

    /// A unit specification is not usable in this position.
    #[error("invalid unit specification: {0}")]
    InvalidUnitSpec(String),

    /// Two magnitudes could not be broadcast to a common shape.
    #[error("operands could not be broadcast together with shapes {lhs:?} and {rhs:?}")]
    ShapeMismatch {
        /// Shape of the left operand.
        lhs: Vec<usize>,
        /// Shape of the right operand.
        rhs: Vec<usize>,
    },

    /// An index lies outside its axis.
    #[error("index {index} is out of bounds for axis {axis} with size {len}")]
    IndexOutOfBounds {
        /// Requested index.
        index: isize,
        /// Axis being indexed.
        axis: usize,
        /// Length of that axis.
        len: usize,
    },

    /// More indices than the array has axes.
    #[error("too many indices for array of dimension {ndim}")]
    TooManyIndices {
        /// Number of axes of the indexed array.
        ndim: usize,
    },

    /// A slice with a zero step.
    #[error("slice step cannot be zero (axis {axis})")]
    ZeroStep {
        /// Axis being sliced.
        axis: usize,
    },

    /// The registry has no unit under this name.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// A unit expression could not be parsed.
    #[error("invalid unit expression \"{expr}\": {reason}")]
    InvalidExpression {
        /// The expression as given.
        expr: String,
        /// What went wrong.
        reason: String,
    },

    /// A unit name, symbol or alias is already taken.
    #[error("unit already defined: {0}")]
    DuplicateUnit(String),

    /// Unit definitions could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl QuantityError {
    pub(crate) fn invalid_expression(expr: &str, reason: impl Into<String>) -> Self {
        QuantityError::InvalidExpression {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}
