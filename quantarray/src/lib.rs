//! Physical quantities as unit-checked n-dimensional arrays.
//!
//! `quantarray` is the user-facing crate in this workspace. It re-exports the full API of
//! `quantarray-core`.
//!
//! A value is a [`Quantity`]: an `ndarray` array of `f64` together with its units. Units are
//! tracked at runtime, so they can come from strings, configuration files or user input.
//!
//! # What this crate solves
//!
//! - Refuses to mix incompatible dimensions (you can't add metres to seconds).
//! - Derives the units of every product, quotient and power.
//! - Converts between compatible units, in place or into a copy.
//! - Compares quantities in different but compatible units (`1 km == 1000 m`).
//!
//! # What this crate does not try to solve
//!
//! - Compile-time unit checking: a unit error is a [`QuantityError`], not a type error.
//! - Affine units such as degrees Celsius. Every unit is a pure scale of base units.
//! - Element types other than `f64`.
//!
//! # Quick start
//!
//! ```rust
//! use quantarray::Quantity;
//!
//! let d = Quantity::new([100.0, 250.0], "km").unwrap();
//! let t = Quantity::new(2.0, "hour").unwrap();
//! let v = d.div(&t).unwrap();
//! assert_eq!(v.units(), "km/h");
//!
//! let v = v.rescale("m/s").unwrap();
//! assert!((v.magnitude()[[0]] - 50.0 / 3.6).abs() < 1e-9);
//! ```
//!
//! Custom units can be defined at runtime, or loaded from a TOML file with
//! [`UnitRegistry::load_definitions`]:
//!
//! ```rust
//! use quantarray::{unit_registry, Quantity};
//!
//! unit_registry()
//!     .define("smoot", "smoot", &["smoots"], Some("1.7018*m"))
//!     .unwrap();
//!
//! let bridge = Quantity::new(364.4, "smoots").unwrap();
//! let m = bridge.rescale("m").unwrap();
//! assert!((m.magnitude().sum() - 620.14).abs() < 0.01);
//! ```
//!
//! # Panics and errors
//!
//! Nothing in the public API panics on bad input. Unit mismatches, bad unit expressions,
//! shape mismatches and out-of-range indices are all reported as [`QuantityError`].
//! Element arithmetic follows IEEE-754 (NaN and infinities propagate).
//!
//! # SemVer and stability
//!
//! This workspace is currently `0.x`. Expect breaking changes between minor versions until `1.0`.
#![forbid(unsafe_code)]

pub use quantarray_core::*;
