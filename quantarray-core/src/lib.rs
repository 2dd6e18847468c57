//! Core types for unit-aware numeric arrays.
//!
//! `quantarray-core` pairs an [`ndarray`] array of `f64` with a [`Dimensionality`], a
//! composition of unit atoms raised to exponents, and keeps the two consistent through
//! arithmetic, comparison, conversion, indexing and iteration.
//!
//! # Building blocks
//!
//! - [`Atom`]: a named unit, either a base unit or one derived from base units.
//! - [`Dimensionality`]: atoms to exponents, with `*`, `/` and powers.
//! - [`Quantity`]: the array plus its dimensionality.
//! - [`UnitRegistry`]: resolves unit expressions such as `"km/h"` to reference quantities.
//!
//! # Example
//!
//! ```rust
//! use quantarray_core::Quantity;
//!
//! let distance = Quantity::new([1.0, 2.0], "meter").unwrap();
//! let extra = Quantity::new([100.0, 200.0], "centimeter")
//!     .unwrap()
//!     .rescale("meter")
//!     .unwrap();
//! let total = distance.add(&extra).unwrap();
//! assert_eq!(total.magnitude().as_slice().unwrap(), &[2.0, 4.0]);
//!
//! let time = Quantity::new(2.0, "second").unwrap();
//! let speed = total.div(&time).unwrap();
//! assert_eq!(speed.units(), "m/s");
//!
//! // Mixing incompatible units is an error, never a silent conversion.
//! assert!(distance.add(&time).is_err());
//! ```
//!
//! # Errors
//!
//! Every fallible operation returns [`Result`], with [`QuantityError`] describing what
//! went wrong. Plain-number operator sugar (`&q * 2.0`, `-&q`) cannot fail and returns
//! a [`Quantity`] directly.

#![deny(missing_docs)]
// Not `forbid`: ndarray's `s![]` expands to an inner `allow(unsafe_code)`.
#![deny(unsafe_code)]

mod arithmetic;
mod dimension;
mod error;
mod iter;
mod operand;
mod quantity;
pub mod registry;

pub use arithmetic::Comparison;
pub use dimension::{Atom, Dimensionality, Iter, Reference};
pub use error::{QuantityError, Result};
pub use iter::QuantityIter;
pub use operand::{Operand, QuantityData, UnitSpec};
pub use quantity::Quantity;
pub use registry::{unit_registry, UnitDefinition, UnitDefinitions, UnitRegistry};

// Re-export the array engine so callers can build inputs without a direct dependency.
pub use ndarray;
