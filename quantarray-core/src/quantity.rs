//! Quantity type: construction and unit management.

use crate::dimension::{Atom, Dimensionality};
use crate::error::{QuantityError, Result};
use crate::operand::{QuantityData, UnitSpec};
use crate::registry::unit_registry;
use core::fmt;
use ndarray::ArrayD;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::sync::Arc;

/// Where a quantity keeps its dimensionality.
///
/// Mutable quantities own theirs and replace it wholesale on a unit change. Protected
/// quantities share an immutable one, or bind it lazily on first read. Clones of a
/// deferred quantity share the cell, so they all bind the same atom.
#[derive(Clone, Debug)]
enum DimsSlot {
    Owned(Dimensionality),
    Shared(Arc<Dimensionality>),
    Deferred(Arc<OnceCell<Dimensionality>>),
}

impl DimsSlot {
    fn get(&self, magnitude: &ArrayD<f64>) -> &Dimensionality {
        match self {
            DimsSlot::Owned(dims) => dims,
            DimsSlot::Shared(dims) => dims,
            DimsSlot::Deferred(cell) => cell.get_or_init(|| self_unit(magnitude)),
        }
    }
}

/// A fresh base atom standing for the quantity itself, e.g. `(2.5)`.
fn self_unit(magnitude: &ArrayD<f64>) -> Dimensionality {
    let symbol = format!("({magnitude})");
    log::trace!("binding deferred units to {}", symbol);
    Dimensionality::from_atom(Atom::base(symbol.clone(), symbol))
}

/// An n-dimensional `f64` array tagged with a [`Dimensionality`].
///
/// Arithmetic recomputes the dimensionality of every result and refuses to combine
/// incompatible units; comparisons and conversions go through the simplified
/// (base-unit) form so that `1 km` and `1000 m` compare equal.
///
/// ```rust
/// use quantarray_core::Quantity;
///
/// let d = Quantity::new([1.0, 2.0], "kilometer").unwrap();
/// let m = d.rescale("meter").unwrap();
/// assert_eq!(m.units(), "m");
/// assert_eq!(m.magnitude().as_slice().unwrap(), &[1000.0, 2000.0]);
/// ```
///
/// A quantity is a plain value: mutating one requires `&mut`, so concurrent mutation
/// is ruled out by the borrow checker rather than by locking.
#[derive(Clone, Debug)]
pub struct Quantity {
    pub(crate) magnitude: ArrayD<f64>,
    dims: DimsSlot,
    mutable: bool,
}

impl Quantity {
    /// Creates a mutable quantity.
    ///
    /// `data` is deep-copied. When `data` is itself a quantity and `units` is not empty,
    /// the values are converted into `units` first.
    ///
    /// ```rust
    /// use quantarray_core::{Quantity, UnitSpec};
    ///
    /// let m = Quantity::new(1500.0, "m").unwrap();
    /// let km = Quantity::new(&m, "km").unwrap();
    /// assert!((km.magnitude().sum() - 1.5).abs() < 1e-12);
    ///
    /// let same = Quantity::new(&m, UnitSpec::Empty).unwrap();
    /// assert_eq!(same.units(), "m");
    /// ```
    pub fn new<'a>(
        data: impl Into<QuantityData<'a>>,
        units: impl Into<UnitSpec<'a>>,
    ) -> Result<Self> {
        Self::with_mutability(data, units, true)
    }

    /// Creates a protected quantity whose units and values cannot be changed.
    pub fn protected<'a>(
        data: impl Into<QuantityData<'a>>,
        units: impl Into<UnitSpec<'a>>,
    ) -> Result<Self> {
        Self::with_mutability(data, units, false)
    }

    /// Creates a quantity with an explicit mutability flag.
    ///
    /// [`UnitSpec::Deferred`] is only accepted when `mutable` is false. Such a quantity
    /// becomes its own unit: on first read its dimensionality binds to a fresh base atom
    /// named after the magnitude.
    ///
    /// ```rust
    /// use quantarray_core::{Quantity, UnitSpec};
    ///
    /// let q = Quantity::protected(2.5, UnitSpec::Deferred).unwrap();
    /// assert_eq!(q.units(), "(2.5)");
    /// assert!(!q.dimensionality().is_dimensionless());
    /// ```
    pub fn with_mutability<'a>(
        data: impl Into<QuantityData<'a>>,
        units: impl Into<UnitSpec<'a>>,
        mutable: bool,
    ) -> Result<Self> {
        let units = units.into();

        let (magnitude, dims) = match data.into() {
            QuantityData::Quantity(source) if units.is_empty() => (
                source.magnitude.clone(),
                Some(source.dimensionality().clone()),
            ),
            QuantityData::Quantity(source) => {
                let converted = source.rescale(units.clone())?;
                (converted.magnitude, resolve_dims(units)?)
            }
            QuantityData::Array(array) => (array, resolve_dims(units)?),
        };

        let dims = match dims {
            Some(dims) if mutable => DimsSlot::Owned(dims),
            Some(dims) => DimsSlot::Shared(Arc::new(dims)),
            None if mutable => {
                return Err(QuantityError::InvalidUnitSpec(
                    "deferred units require a protected quantity".to_string(),
                ))
            }
            None => DimsSlot::Deferred(Arc::new(OnceCell::new())),
        };

        Ok(Self {
            magnitude,
            dims,
            mutable,
        })
    }

    /// Assembles a mutable quantity from parts already known to be consistent.
    pub(crate) fn from_parts(magnitude: ArrayD<f64>, dims: Dimensionality) -> Self {
        Self {
            magnitude,
            dims: DimsSlot::Owned(dims),
            mutable: true,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// The raw numeric values, without unit semantics.
    pub fn magnitude(&self) -> &ArrayD<f64> {
        &self.magnitude
    }

    /// Consumes the quantity and returns its values.
    pub fn into_magnitude(self) -> ArrayD<f64> {
        self.magnitude
    }

    /// The dimensionality. Callers get a shared borrow and can never alter it in place.
    pub fn dimensionality(&self) -> &Dimensionality {
        self.dims.get(&self.magnitude)
    }

    /// Whether units and values may be changed.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Shape of the magnitude.
    pub fn shape(&self) -> &[usize] {
        self.magnitude.shape()
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.magnitude.ndim()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    /// Whether the magnitude holds no elements.
    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Units
    // ─────────────────────────────────────────────────────────────────────────

    /// Canonical rendering of the dimensionality, e.g. `"m/s**2"`.
    pub fn units(&self) -> String {
        self.dimensionality().to_string()
    }

    /// Converts the values in place and adopts the target units.
    ///
    /// The target is a unit expression or a quantity of unit magnitude. Fails with
    /// [`QuantityError::ProtectedUnits`] on protected quantities and with
    /// [`QuantityError::IncompatibleUnits`] when the simplified dimensionalities differ.
    /// On failure the values are left untouched.
    pub fn set_units<'a>(&mut self, units: impl Into<UnitSpec<'a>>) -> Result<()> {
        if !self.mutable {
            return Err(QuantityError::ProtectedUnits);
        }

        let target = unit_quantity(units.into())?;
        if target.magnitude.iter().any(|&value| value != 1.0) {
            return Err(QuantityError::InvalidUnitMagnitude {
                magnitude: target.magnitude.to_string(),
            });
        }

        let current = self.dimensionality().simplified();
        let wanted = target.dimensionality().simplified();
        if current.dims != wanted.dims {
            return Err(QuantityError::IncompatibleUnits {
                from: current.dims.to_string(),
                to: wanted.dims.to_string(),
            });
        }

        let scale = current.factor / wanted.factor;
        log::trace!(
            "converting {} -> {} (x{})",
            self.dimensionality(),
            target.dimensionality(),
            scale
        );
        self.magnitude.mapv_inplace(|value| value * scale);
        self.dims = DimsSlot::Owned(target.dimensionality().clone());
        Ok(())
    }

    /// Returns a converted copy; `self` is never modified.
    ///
    /// Works on protected quantities too, since the copy is mutable.
    pub fn rescale<'a>(&self, units: impl Into<UnitSpec<'a>>) -> Result<Quantity> {
        let mut copy = Quantity::new(self, UnitSpec::Empty)?;
        copy.set_units(units)?;
        Ok(copy)
    }

    /// The same quantity expressed purely in base units.
    ///
    /// ```rust
    /// use quantarray_core::Quantity;
    ///
    /// let q = Quantity::new(2.0, "km/h").unwrap().simplified();
    /// assert_eq!(q.units(), "m/s");
    /// assert!((q.magnitude().sum() - 2000.0 / 3600.0).abs() < 1e-12);
    /// ```
    pub fn simplified(&self) -> Quantity {
        let reference = self.dimensionality().simplified();
        Quantity::from_parts(
            self.magnitude.mapv(|value| value * reference.factor),
            reference.dims,
        )
    }
}

/// Dimensionality named by a `UnitSpec`, or `None` for the deferred sentinel.
fn resolve_dims(units: UnitSpec<'_>) -> Result<Option<Dimensionality>> {
    let dims = match units {
        UnitSpec::Empty => Dimensionality::dimensionless(),
        UnitSpec::Name(name) => unit_registry().lookup(name)?.dimensionality().clone(),
        UnitSpec::Quantity(q) => q.dimensionality().clone(),
        UnitSpec::Dimensionality(dims) => dims,
        UnitSpec::Deferred => return Ok(None),
    };
    Ok(Some(dims))
}

/// The quantity a `UnitSpec` designates when used as a conversion target.
fn unit_quantity(units: UnitSpec<'_>) -> Result<Cow<'_, Quantity>> {
    match units {
        UnitSpec::Empty => Ok(Cow::Owned(unit_registry().lookup("dimensionless")?)),
        UnitSpec::Name(name) => Ok(Cow::Owned(unit_registry().lookup(name)?)),
        UnitSpec::Quantity(q) => Ok(Cow::Borrowed(q)),
        UnitSpec::Dimensionality(dims) => Ok(Cow::Owned(Quantity::from_parts(
            ndarray::arr0(1.0).into_dyn(),
            dims,
        ))),
        UnitSpec::Deferred => Err(QuantityError::InvalidUnitSpec(
            "deferred units can not be a conversion target".to_string(),
        )),
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.magnitude, self.units())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn new_from_name() {
        let q = Quantity::new([1.0, 2.0, 3.0], "meter").unwrap();
        assert_eq!(q.units(), "m");
        assert_eq!(q.shape(), &[3]);
        assert!(q.is_mutable());
    }

    #[test]
    fn empty_name_is_dimensionless() {
        let q = Quantity::new(4.0, "").unwrap();
        assert!(q.dimensionality().is_dimensionless());
        assert_eq!(q.units(), "dimensionless");
    }

    #[test]
    fn inherits_units_from_quantity_data() {
        let src = Quantity::new([1.0], "second").unwrap();
        let copy = Quantity::new(&src, UnitSpec::Empty).unwrap();
        assert_eq!(copy.units(), "s");
        assert_eq!(copy.magnitude(), src.magnitude());
    }

    #[test]
    fn converts_quantity_data_to_new_units() {
        let src = Quantity::new([1500.0, 250.0], "meter").unwrap();
        let km = Quantity::new(&src, "kilometer").unwrap();
        assert_eq!(km.units(), "km");
        assert_relative_eq!(km.magnitude()[[0]], 1.5);
        assert_relative_eq!(km.magnitude()[[1]], 0.25);
    }

    #[test]
    fn units_from_quantity_and_dimensionality() {
        let unit = Quantity::new(3.0, "m/s").unwrap();
        let q = Quantity::new(array![1.0, 2.0], &unit).unwrap();
        assert_eq!(q.units(), "m/s");

        let atom = Atom::base("widget", "wd");
        let q = Quantity::new(1.0, Dimensionality::from_atom(atom)).unwrap();
        assert_eq!(q.units(), "wd");
    }

    #[test]
    fn construction_copies_buffer() {
        let data = array![1.0, 2.0];
        let q = Quantity::new(data.clone(), "m").unwrap();
        let mut copy = Quantity::new(&q, UnitSpec::Empty).unwrap();
        copy.set_units("cm").unwrap();
        assert_eq!(q.magnitude(), &data.into_dyn());
    }

    #[test]
    fn unknown_unit_fails() {
        let err = Quantity::new(1.0, "parsnip").unwrap_err();
        assert_eq!(err, QuantityError::UnknownUnit("parsnip".to_string()));
    }

    #[test]
    fn deferred_requires_protected() {
        let err = Quantity::new(1.0, UnitSpec::Deferred).unwrap_err();
        assert!(matches!(err, QuantityError::InvalidUnitSpec(_)));

        let q = Quantity::protected(1.0, UnitSpec::Deferred).unwrap();
        assert!(!q.is_mutable());
    }

    #[test]
    fn deferred_quantity_is_its_own_unit() {
        let deferred = Quantity::protected(2.5, UnitSpec::Deferred).unwrap();
        let plain = Quantity::protected(2.5, UnitSpec::Empty).unwrap();

        assert!(!deferred.dimensionality().is_dimensionless());
        assert_ne!(deferred.dimensionality(), plain.dimensionality());
        assert_eq!(deferred.units(), "(2.5)");

        let (atom, exp) = deferred.dimensionality().iter().next().unwrap();
        assert!(atom.is_base());
        assert_eq!(exp, 1.0);
        assert_eq!(deferred.dimensionality().simplified().dims, *deferred.dimensionality());

        assert!(deferred.add(&plain).is_err());
        assert!(deferred.rescale(UnitSpec::Empty).is_err());
    }

    #[test]
    fn deferred_binding_is_stable() {
        let deferred = Quantity::protected([1.0, 2.0], UnitSpec::Deferred).unwrap();
        let early_clone = deferred.clone();
        let first = deferred.dimensionality().clone();

        assert_eq!(deferred.dimensionality(), &first);
        assert_eq!(early_clone.dimensionality(), &first);
        assert_eq!(deferred.clone().dimensionality(), &first);

        let copy = Quantity::new(&deferred, UnitSpec::Empty).unwrap();
        assert_eq!(copy.dimensionality(), &first);

        let other = Quantity::protected([1.0, 2.0], UnitSpec::Deferred).unwrap();
        assert_ne!(other.dimensionality(), &first);
        assert_eq!(other.units(), deferred.units());
    }

    #[test]
    fn set_units_converts_in_place() {
        let mut q = Quantity::new([1.0, 2.5], "meter").unwrap();
        q.set_units("centimeter").unwrap();
        assert_eq!(q.units(), "cm");
        assert_relative_eq!(q.magnitude()[[0]], 100.0, epsilon = 1e-9);
        assert_relative_eq!(q.magnitude()[[1]], 250.0, epsilon = 1e-9);
    }

    #[test]
    fn set_units_rejects_incompatible() {
        let mut q = Quantity::new([1.0], "meter").unwrap();
        let err = q.set_units("second").unwrap_err();
        assert_eq!(
            err,
            QuantityError::IncompatibleUnits {
                from: "m".to_string(),
                to: "s".to_string(),
            }
        );
        assert_eq!(q.units(), "m");
        assert_eq!(q.magnitude()[[0]], 1.0);
    }

    #[test]
    fn set_units_requires_unit_magnitude() {
        let mut q = Quantity::new([1.0], "meter").unwrap();
        let two_km = Quantity::new(2.0, "km").unwrap();
        let err = q.set_units(&two_km).unwrap_err();
        assert!(matches!(err, QuantityError::InvalidUnitMagnitude { .. }));

        let err = q.set_units("1000*m").unwrap_err();
        assert!(matches!(err, QuantityError::InvalidUnitMagnitude { .. }));

        let km = Quantity::new(1.0, "km").unwrap();
        q.set_units(&km).unwrap();
        assert_relative_eq!(q.magnitude()[[0]], 0.001);
    }

    #[test]
    fn protected_units_cannot_change() {
        let mut q = Quantity::protected([5.0], "meter").unwrap();
        assert_eq!(q.set_units("cm"), Err(QuantityError::ProtectedUnits));
        assert_eq!(q.magnitude()[[0]], 5.0);
        assert_eq!(q.units(), "m");

        let converted = q.rescale("cm").unwrap();
        assert!(converted.is_mutable());
        assert_relative_eq!(converted.magnitude()[[0]], 500.0, epsilon = 1e-9);
    }

    #[test]
    fn rescale_leaves_original() {
        let q = Quantity::new([3.0], "hour").unwrap();
        let s = q.rescale("second").unwrap();
        assert_eq!(q.units(), "h");
        assert_eq!(q.magnitude()[[0]], 3.0);
        assert_relative_eq!(s.magnitude()[[0]], 10800.0);
    }

    #[test]
    fn rescale_to_dimensionality() {
        let q = Quantity::new([250.0], "cm").unwrap();
        let m = Quantity::new(1.0, "m").unwrap();
        let out = q.rescale(m.dimensionality()).unwrap();
        assert_eq!(out.units(), "m");
        assert_relative_eq!(out.magnitude()[[0]], 2.5);
    }

    #[test]
    fn simplified_reduces_to_base_units() {
        let q = Quantity::new([1.0], "N").unwrap().simplified();
        assert_eq!(q.units(), "kg*m/s**2");
        assert_eq!(q.magnitude()[[0]], 1.0);

        let q = Quantity::new([3.0], "km").unwrap().simplified();
        assert_eq!(q.units(), "m");
        assert_relative_eq!(q.magnitude()[[0]], 3000.0);
    }

    #[test]
    fn display_joins_magnitude_and_units() {
        let q = Quantity::new(2.5, "m/s").unwrap();
        assert_eq!(q.to_string(), "2.5*m/s");
    }
}
