//! Atoms and dimensionalities.
//!
//! A [`Dimensionality`] is a product of unit [`Atom`]s raised to real exponents, e.g.
//! `m * s**-2`. Atoms with a zero exponent are pruned on every operation, so equality
//! and iteration only ever see atoms that actually contribute.
//!
//! Exponents are rationals carried as `f64`. Every stored exponent is snapped onto the
//! nearest fraction with a denominator up to [`MAX_DENOMINATOR`], so residue such as
//! `0.1 + 0.2 - 0.3` cancels to an exact zero and `m**(1/3)` cubed is exactly `m`.

use core::cmp::Ordering;
use core::fmt::{self, Write as _};
use core::hash::{Hash, Hasher};
use core::ops::{Div, Mul};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Largest denominator an exponent is snapped onto.
const MAX_DENOMINATOR: u32 = 64;

/// Distance below which an exponent counts as lying on a fraction.
const EXPONENT_TOLERANCE: f64 = 1e-9;

/// The fraction `n/d` (smallest `d` first) within tolerance of `exp`, or `exp` itself.
///
/// Non-finite exponents pass through untouched.
fn snap_exponent(exp: f64) -> f64 {
    if !exp.is_finite() {
        return exp;
    }
    for den in 1..=MAX_DENOMINATOR {
        let den = f64::from(den);
        let num = (exp * den).round();
        if (exp - num / den).abs() < EXPONENT_TOLERANCE {
            return num / den;
        }
    }
    exp
}

// ─────────────────────────────────────────────────────────────────────────────
// Atoms
// ─────────────────────────────────────────────────────────────────────────────

struct AtomDef {
    name: String,
    symbol: String,
    reference: Option<Reference>,
}

/// An irreducible unit reference used as a key in a [`Dimensionality`].
///
/// Atoms carry identity: two atoms are equal only if they come from the same definition,
/// regardless of their names. Cloning is cheap and preserves identity.
///
/// ```rust
/// use quantarray_core::Atom;
///
/// let a = Atom::base("meter", "m");
/// let b = Atom::base("meter", "m");
/// assert_eq!(a, a.clone());
/// assert_ne!(a, b);
/// ```
#[derive(Clone)]
pub struct Atom(Arc<AtomDef>);

impl Atom {
    /// Creates a base unit, i.e. one that simplifies to itself.
    pub fn base(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self(Arc::new(AtomDef {
            name: name.into(),
            symbol: symbol.into(),
            reference: None,
        }))
    }

    /// Creates a unit defined as `reference.factor` times the base units in `reference.dims`.
    pub fn derived(name: impl Into<String>, symbol: impl Into<String>, reference: Reference) -> Self {
        Self(Arc::new(AtomDef {
            name: name.into(),
            symbol: symbol.into(),
            reference: Some(reference),
        }))
    }

    /// Full unit name, e.g. `"meter"`.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Printable symbol, e.g. `"m"`.
    pub fn symbol(&self) -> &str {
        &self.0.symbol
    }

    /// The reduction of this unit onto base units, or `None` for a base unit.
    pub fn reference(&self) -> Option<&Reference> {
        self.0.reference.as_ref()
    }

    /// Whether this atom is a base unit.
    pub fn is_base(&self) -> bool {
        self.0.reference.is_none()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Atom {}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbol()
            .cmp(other.symbol())
            .then_with(|| self.name().cmp(other.name()))
            .then_with(|| Arc::as_ptr(&self.0).cmp(&Arc::as_ptr(&other.0)))
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.symbol())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A scale factor together with a dimensionality: `factor * dims`.
///
/// Used both as the base-unit reduction of an [`Atom`] and as the result of
/// simplifying a [`Dimensionality`].
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    /// Numeric scale.
    pub factor: f64,
    /// Unit composition the factor applies to.
    pub dims: Dimensionality,
}

impl Reference {
    /// A reference with the given factor and no units.
    pub fn scalar(factor: f64) -> Self {
        Self {
            factor,
            dims: Dimensionality::dimensionless(),
        }
    }

    /// Re-expresses this reference in base units.
    pub fn simplified(&self) -> Reference {
        let base = self.dims.simplified();
        Reference {
            factor: self.factor * base.factor,
            dims: base.dims,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dimensionality
// ─────────────────────────────────────────────────────────────────────────────

/// A composition of atoms raised to exponents.
///
/// ```rust
/// use quantarray_core::{Atom, Dimensionality};
///
/// let m = Dimensionality::from_atom(Atom::base("meter", "m"));
/// let s = Dimensionality::from_atom(Atom::base("second", "s"));
///
/// let accel = &m / &s.powf(2.0);
/// assert_eq!(accel.to_string(), "m/s**2");
/// assert!((&(&accel * &s.powf(2.0)) / &m).is_dimensionless());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dimensionality {
    exponents: BTreeMap<Atom, f64>,
}

impl Dimensionality {
    /// The empty composition.
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// A single atom with exponent 1.
    pub fn from_atom(atom: Atom) -> Self {
        let mut dims = Self::default();
        dims.accumulate(atom, 1.0);
        dims
    }

    /// Whether no atoms remain. This is the "falsy" state of a dimensionality.
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Number of atoms with a non-zero exponent.
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    /// Same as [`Dimensionality::is_dimensionless`].
    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Exponent of `atom`, zero when absent.
    pub fn exponent(&self, atom: &Atom) -> f64 {
        self.exponents.get(atom).copied().unwrap_or(0.0)
    }

    /// Iterates over `(atom, exponent)` pairs in rendering order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.exponents.iter())
    }

    /// Sum of exponents per atom.
    pub fn mul(&self, other: &Dimensionality) -> Dimensionality {
        let mut out = self.clone();
        for (atom, exp) in other.iter() {
            out.accumulate(atom.clone(), exp);
        }
        out
    }

    /// Difference of exponents per atom.
    pub fn div(&self, other: &Dimensionality) -> Dimensionality {
        let mut out = self.clone();
        for (atom, exp) in other.iter() {
            out.accumulate(atom.clone(), -exp);
        }
        out
    }

    /// Every exponent multiplied by `exp`. Fractional exponents are allowed.
    pub fn powf(&self, exp: f64) -> Dimensionality {
        self.iter()
            .map(|(atom, e)| (atom.clone(), e * exp))
            .collect()
    }

    /// Dimensionality of a sum. Only defined for equal operands; the caller checks.
    pub fn add(&self, other: &Dimensionality) -> Dimensionality {
        debug_assert_eq!(self, other, "adding unequal dimensionalities");
        self.clone()
    }

    /// Dimensionality of a difference. Only defined for equal operands; the caller checks.
    pub fn sub(&self, other: &Dimensionality) -> Dimensionality {
        debug_assert_eq!(self, other, "subtracting unequal dimensionalities");
        self.clone()
    }

    /// Reduces the composition onto base units.
    ///
    /// Each derived atom contributes its reference factor raised to its exponent; base
    /// atoms are kept as they are.
    pub fn simplified(&self) -> Reference {
        let mut factor = 1.0;
        let mut dims = Dimensionality::dimensionless();
        for (atom, exp) in self.iter() {
            match atom.reference() {
                Some(reference) => {
                    let reference = reference.simplified();
                    factor *= reference.factor.powf(exp);
                    for (base, base_exp) in reference.dims.iter() {
                        dims.accumulate(base.clone(), base_exp * exp);
                    }
                }
                None => dims.accumulate(atom.clone(), exp),
            }
        }
        Reference { factor, dims }
    }

    fn accumulate(&mut self, atom: Atom, exp: f64) {
        match self.exponents.entry(atom) {
            btree_map::Entry::Occupied(mut entry) => {
                let sum = snap_exponent(*entry.get() + exp);
                if sum == 0.0 {
                    entry.remove();
                } else {
                    *entry.get_mut() = sum;
                }
            }
            btree_map::Entry::Vacant(entry) => {
                let exp = snap_exponent(exp);
                if exp != 0.0 {
                    entry.insert(exp);
                }
            }
        }
    }
}

impl FromIterator<(Atom, f64)> for Dimensionality {
    fn from_iter<I: IntoIterator<Item = (Atom, f64)>>(iter: I) -> Self {
        let mut dims = Dimensionality::default();
        for (atom, exp) in iter {
            dims.accumulate(atom, exp);
        }
        dims
    }
}

impl From<Atom> for Dimensionality {
    fn from(atom: Atom) -> Self {
        Dimensionality::from_atom(atom)
    }
}

impl<'a> Mul<&'a Dimensionality> for &'a Dimensionality {
    type Output = Dimensionality;
    fn mul(self, rhs: &'a Dimensionality) -> Dimensionality {
        Dimensionality::mul(self, rhs)
    }
}

impl<'a> Div<&'a Dimensionality> for &'a Dimensionality {
    type Output = Dimensionality;
    fn div(self, rhs: &'a Dimensionality) -> Dimensionality {
        Dimensionality::div(self, rhs)
    }
}

/// Renders the canonical form: positive exponents joined by `*`, then each negative
/// exponent as `/atom`. `**n` is appended when `|n| != 1`.
///
/// A NaN exponent is written out (`m**NaN`) so it can never pass for dimensionless.
impl fmt::Display for Dimensionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("dimensionless");
        }

        let mut out = String::new();
        for (atom, exp) in self.iter().filter(|(_, exp)| exp.is_nan() || *exp > 0.0) {
            if !out.is_empty() {
                out.push('*');
            }
            push_term(&mut out, atom.symbol(), exp)?;
        }
        if out.is_empty() {
            out.push('1');
        }
        for (atom, exp) in self.iter().filter(|(_, exp)| *exp < 0.0) {
            out.push('/');
            push_term(&mut out, atom.symbol(), -exp)?;
        }
        f.write_str(&out)
    }
}

fn push_term(out: &mut String, symbol: &str, exp: f64) -> fmt::Result {
    out.push_str(symbol);
    if exp != 1.0 {
        write!(out, "**{}", exp)?;
    }
    Ok(())
}

/// Iterator over the `(atom, exponent)` pairs of a [`Dimensionality`].
#[derive(Clone)]
pub struct Iter<'a>(btree_map::Iter<'a, Atom, f64>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Atom, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(atom, exp)| (atom, *exp))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Dimensionality {
    type Item = (&'a Atom, f64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn atoms() -> (Atom, Atom, Atom) {
        (
            Atom::base("meter", "m"),
            Atom::base("second", "s"),
            Atom::base("kilogram", "kg"),
        )
    }

    #[test]
    fn multiply_sums_exponents() {
        let (m, s, _) = atoms();
        let a: Dimensionality = [(m.clone(), 1.0), (s.clone(), -1.0)].into_iter().collect();
        let b: Dimensionality = [(s.clone(), -1.0)].into_iter().collect();
        let product = &a * &b;
        assert_eq!(product.exponent(&m), 1.0);
        assert_eq!(product.exponent(&s), -2.0);
    }

    #[test]
    fn divide_negates_second_operand() {
        let (m, s, _) = atoms();
        let a = Dimensionality::from_atom(m.clone());
        let b = Dimensionality::from_atom(s.clone());
        let q = &a / &b;
        assert_eq!(q.exponent(&m), 1.0);
        assert_eq!(q.exponent(&s), -1.0);
    }

    #[test]
    fn zero_exponents_are_pruned() {
        let (m, s, _) = atoms();
        let a: Dimensionality = [(m.clone(), 1.0), (s.clone(), 2.0)].into_iter().collect();
        let b = Dimensionality::from_atom(m.clone());
        let q = &a / &b;
        assert_eq!(q.len(), 1);
        assert_eq!(q.iter().count(), 1);
        assert_eq!(q, Dimensionality::from_atom(s.clone()).powf(2.0));

        let none: Dimensionality = [(m, 0.0)].into_iter().collect();
        assert!(none.is_dimensionless());
        assert_eq!(none, Dimensionality::dimensionless());
    }

    #[test]
    fn power_accepts_fractions() {
        let (m, _, _) = atoms();
        let area = Dimensionality::from_atom(m.clone()).powf(2.0);
        let root = area.powf(0.5);
        assert_eq!(root, Dimensionality::from_atom(m));
        assert!(area.powf(0.0).is_dimensionless());
    }

    #[test]
    fn identity_laws() {
        let (m, s, kg) = atoms();
        let d: Dimensionality = [(kg, 1.0), (m, 2.0), (s, -2.0)].into_iter().collect();
        assert_eq!(d.powf(1.0), d);
        assert_eq!(&(&d * &d) / &d, d);
        assert_eq!(d.add(&d), d);
        assert_eq!(d.sub(&d), d);
    }

    #[test]
    fn atoms_compare_by_identity() {
        let a = Atom::base("meter", "m");
        let b = Atom::base("meter", "m");
        assert_ne!(Dimensionality::from_atom(a.clone()), Dimensionality::from_atom(b));
        assert_eq!(Dimensionality::from_atom(a.clone()), Dimensionality::from_atom(a));
    }

    #[test]
    fn iteration_is_restartable() {
        let (m, s, _) = atoms();
        let d: Dimensionality = [(m, 1.0), (s, -1.0)].into_iter().collect();
        let first: Vec<_> = d.iter().map(|(a, e)| (a.symbol().to_string(), e)).collect();
        let second: Vec<_> = (&d).into_iter().map(|(a, e)| (a.symbol().to_string(), e)).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![("m".to_string(), 1.0), ("s".to_string(), -1.0)]);
    }

    #[test]
    fn rendering() {
        let (m, s, kg) = atoms();
        let dm = Dimensionality::from_atom(m.clone());
        let ds = Dimensionality::from_atom(s.clone());
        let dkg = Dimensionality::from_atom(kg);

        assert_eq!(Dimensionality::dimensionless().to_string(), "dimensionless");
        assert_eq!(dm.to_string(), "m");
        assert_eq!((&dm / &ds).to_string(), "m/s");
        assert_eq!((&dm / &ds.powf(2.0)).to_string(), "m/s**2");
        assert_eq!(
            (&(&dkg * &dm.powf(2.0)) / &ds.powf(2.0)).to_string(),
            "kg*m**2/s**2"
        );
        assert_eq!(ds.powf(-1.0).to_string(), "1/s");
        assert_eq!(dm.powf(0.5).to_string(), "m**0.5");
    }

    #[test]
    fn simplify_reduces_derived_atoms() {
        let m = Atom::base("meter", "m");
        let km = Atom::derived(
            "kilometer",
            "km",
            Reference {
                factor: 1000.0,
                dims: Dimensionality::from_atom(m.clone()),
            },
        );
        let d: Dimensionality = [(km, 2.0)].into_iter().collect();
        let reduced = d.simplified();
        assert_relative_eq!(reduced.factor, 1.0e6);
        assert_eq!(reduced.dims, Dimensionality::from_atom(m).powf(2.0));
    }

    #[test]
    fn base_atoms_simplify_to_themselves() {
        let (m, _, _) = atoms();
        let d = Dimensionality::from_atom(m);
        let reduced = d.simplified();
        assert_eq!(reduced.factor, 1.0);
        assert_eq!(reduced.dims, d);
    }

    #[test]
    fn simplify_follows_chained_definitions() {
        let s = Atom::base("second", "s");
        let min = Atom::derived(
            "minute",
            "min",
            Reference {
                factor: 60.0,
                dims: Dimensionality::from_atom(s.clone()),
            },
        );
        let h = Atom::derived(
            "hour",
            "h",
            Reference {
                factor: 60.0,
                dims: Dimensionality::from_atom(min),
            },
        );
        let reduced = Dimensionality::from_atom(h).powf(-1.0).simplified();
        assert_relative_eq!(reduced.factor, 1.0 / 3600.0);
        assert_eq!(reduced.dims, Dimensionality::from_atom(s).powf(-1.0));
    }

    #[test]
    fn fractional_residue_cancels() {
        let (m, _, _) = atoms();
        let dm = Dimensionality::from_atom(m.clone());
        let d = &(&dm.powf(0.1) * &dm.powf(0.2)) / &dm.powf(0.3);
        assert!(d.is_dimensionless());
        assert_eq!(d.to_string(), "dimensionless");

        let third = dm.powf(1.0 / 3.0);
        assert_eq!(&(&third * &third) * &third, dm);
        assert_eq!(third.powf(3.0), dm);
        assert_eq!(dm.powf(0.7).powf(10.0).exponent(&m), 7.0);
    }

    #[test]
    fn irregular_exponents_are_kept() {
        let (m, _, _) = atoms();
        let d = Dimensionality::from_atom(m.clone()).powf(std::f64::consts::PI);
        assert_eq!(d.exponent(&m), std::f64::consts::PI);
        assert_eq!(snap_exponent(0.5 + 1e-12), 0.5);
        assert_eq!(snap_exponent(-2.0 - 1e-12), -2.0);
    }

    #[test]
    fn non_finite_exponents_render_explicitly() {
        let (m, s, _) = atoms();
        let nan = Dimensionality::from_atom(m).powf(f64::NAN);
        assert!(!nan.is_dimensionless());
        assert_eq!(nan.to_string(), "m**NaN");

        let inf = Dimensionality::from_atom(s).powf(f64::NEG_INFINITY);
        assert_eq!(inf.to_string(), "1/s**inf");
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Property-based tests
    // ─────────────────────────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_equality_is_an_equivalence(e1 in -4i32..5, e2 in -4i32..5) {
            let (m, s, _) = atoms();
            let a: Dimensionality = [(m.clone(), f64::from(e1)), (s.clone(), f64::from(e2))]
                .into_iter()
                .collect();
            let b = a.clone();
            let c = &(&a * &b) / &b;
            prop_assert_eq!(&a, &a);
            prop_assert_eq!(&a == &b, &b == &a);
            prop_assert!(a == b && b == c && a == c);
        }

        #[test]
        fn prop_power_distributes(e in -4i32..5, p in -3i32..4) {
            let (m, _, _) = atoms();
            let d = Dimensionality::from_atom(m.clone()).powf(f64::from(e));
            let powered = d.powf(f64::from(p));
            prop_assert_eq!(powered.exponent(&m), f64::from(e * p));
            prop_assert_eq!(powered.is_dimensionless(), e * p == 0);
        }

        #[test]
        fn prop_fractional_laws_hold(
            n1 in -12i32..13,
            n2 in -12i32..13,
            d1 in prop::sample::select(vec![2i32, 3, 4, 5, 10]),
            d2 in prop::sample::select(vec![2i32, 3, 4, 5, 10]),
        ) {
            let (m, s, _) = atoms();
            let a = f64::from(n1) / f64::from(d1);
            let b = f64::from(n2) / f64::from(d2);
            let d: Dimensionality = [(m.clone(), a), (s.clone(), b)].into_iter().collect();
            let other: Dimensionality = [(m.clone(), b), (s.clone(), a)].into_iter().collect();

            prop_assert_eq!(&(&(&d * &other) / &other), &d);
            prop_assert!((&d / &d).is_dimensionless());
            prop_assert!((&d * &d.powf(-1.0)).is_dimensionless());
            prop_assert_eq!(&d.powf(1.0), &d);
        }
    }
}
