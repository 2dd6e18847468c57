//! Unit registry: maps unit expressions to reference quantities.
//!
//! Lookup keys are unit names, symbols and aliases. A lookup accepts any expression
//! over those keys (`"km/h"`, `"kg*m/s**2"`, `"1000*m"`), so the canonical rendering of a
//! [`Dimensionality`] can always be looked up again.
//!
//! The built-in table is generated at build time from `units.csv`. Further units can be
//! added with [`UnitRegistry::define`] or loaded from TOML (see [`UnitDefinitions`]).
//!
//! # Conversion
//!
//! Every derived unit stores its reduction to base units when it is defined, so
//! converting between two units is a single scale:
//!
//! ```text
//! v_dst = v_src * (src.factor / dst.factor)
//! ```

mod config;
mod parser;

pub use config::{UnitDefinition, UnitDefinitions};

use crate::dimension::{Atom, Dimensionality, Reference};
use crate::error::{QuantityError, Result};
use crate::quantity::Quantity;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

// ─────────────────────────────────────────────────────────────────────────────
// Built-in units
// ─────────────────────────────────────────────────────────────────────────────

/// A row of the built-in unit table.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinUnit {
    /// Long name.
    pub name: &'static str,
    /// Rendering symbol.
    pub symbol: &'static str,
    /// Additional lookup keys.
    pub aliases: &'static [&'static str],
    /// Expression over earlier rows; `None` for a base unit.
    pub definition: Option<&'static str>,
}

/// The built-in unit table, in definition order.
pub static BUILTIN_UNITS: &[BuiltinUnit] = include!(concat!(env!("OUT_DIR"), "/builtin_units.rs"));

static UNIT_REGISTRY: Lazy<UnitRegistry> = Lazy::new(UnitRegistry::with_builtin_units);

/// The process-wide registry used by [`Quantity::new`] and friends.
pub fn unit_registry() -> &'static UnitRegistry {
    &UNIT_REGISTRY
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// A set of named units.
///
/// Safe to share between threads: lookups take a read lock, definitions a write lock.
///
/// ```rust
/// use quantarray_core::unit_registry;
///
/// let registry = unit_registry();
/// registry.define("furlong", "fur", &["furlongs"], Some("201.168*m")).unwrap();
///
/// let fur = registry.lookup("furlongs").unwrap();
/// assert_eq!(fur.units(), "fur");
/// assert!(!fur.is_mutable());
///
/// let meters = fur.rescale("m").unwrap();
/// assert!((meters.magnitude().sum() - 201.168).abs() < 1e-9);
/// ```
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: RwLock<HashMap<String, Atom>>,
}

impl UnitRegistry {
    /// A registry with no units at all. Only `dimensionless` and numbers resolve.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every row of [`BUILTIN_UNITS`].
    ///
    /// Rows that fail to define are skipped with a warning.
    pub fn with_builtin_units() -> Self {
        let registry = Self::empty();
        for unit in BUILTIN_UNITS {
            if let Err(e) = registry.define(unit.name, unit.symbol, unit.aliases, unit.definition)
            {
                log::warn!("skipping built-in unit {}: {}", unit.name, e);
            }
        }
        registry
    }

    /// Resolves a unit expression to a protected reference quantity.
    ///
    /// The magnitude is the expression's numeric factor, 1 for a plain unit name.
    /// An empty expression means `dimensionless`.
    ///
    /// ```rust
    /// use quantarray_core::unit_registry;
    ///
    /// let km = unit_registry().lookup("kilometer").unwrap();
    /// assert_eq!(km.units(), "km");
    /// assert_eq!(km.magnitude().sum(), 1.0);
    ///
    /// assert!(unit_registry().lookup("").unwrap().dimensionality().is_dimensionless());
    /// assert!(unit_registry().lookup("parsnip").is_err());
    /// ```
    pub fn lookup(&self, expr: &str) -> Result<Quantity> {
        let reference = self.evaluate(expr)?;
        Quantity::protected(reference.factor, reference.dims)
    }

    /// Evaluates a unit expression without reducing it to base units.
    pub fn evaluate(&self, expr: &str) -> Result<Reference> {
        let expr = match expr.trim() {
            "" => "dimensionless",
            trimmed => trimmed,
        };
        let units = self.units.read();
        parser::evaluate(expr, |name| units.get(name).cloned())
    }

    /// The atom registered under a name, symbol or alias.
    pub fn get(&self, key: &str) -> Option<Atom> {
        self.units.read().get(key).cloned()
    }

    /// Whether `key` names a unit.
    pub fn contains(&self, key: &str) -> bool {
        self.units.read().contains_key(key)
    }

    /// Every registered key, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers a unit under its name, symbol and aliases.
    ///
    /// With a `definition` the unit is derived, and the definition is reduced to base
    /// units right away. Without one it becomes a new base unit.
    ///
    /// # Errors
    /// - [`QuantityError::DuplicateUnit`] if any key is already taken.
    /// - [`QuantityError::InvalidExpression`] if a key is not an identifier or the
    ///   definition does not parse.
    /// - [`QuantityError::UnknownUnit`] if the definition uses an unknown unit.
    pub fn define(
        &self,
        name: &str,
        symbol: &str,
        aliases: &[&str],
        definition: Option<&str>,
    ) -> Result<Atom> {
        let mut keys: Vec<&str> = Vec::with_capacity(aliases.len() + 2);
        for key in [name, symbol].iter().chain(aliases) {
            if !keys.contains(key) {
                keys.push(*key);
            }
        }

        let mut units = self.units.write();
        for key in &keys {
            if !parser::is_identifier(key) {
                return Err(QuantityError::invalid_expression(
                    key,
                    "unit names must be identifiers",
                ));
            }
            if *key == "dimensionless" || units.contains_key(*key) {
                return Err(QuantityError::DuplicateUnit(key.to_string()));
            }
        }

        let atom = match definition {
            Some(expr) => {
                let reference = parser::evaluate(expr, |key| units.get(key).cloned())?;
                Atom::derived(name, symbol, reference.simplified())
            }
            None => Atom::base(name, symbol),
        };

        for key in keys {
            units.insert(key.to_string(), atom.clone());
        }
        log::debug!(
            "defined unit {} ({}) = {}",
            name,
            symbol,
            atom.reference()
                .map(|r| format!("{}*{}", r.factor, r.dims))
                .unwrap_or_else(|| "base".to_string())
        );
        Ok(atom)
    }

    /// Defines every unit in `definitions`, in order. Returns how many were added.
    ///
    /// Stops at the first failure; units defined before it stay registered.
    pub fn load(&self, definitions: &UnitDefinitions) -> Result<usize> {
        for unit in &definitions.units {
            let aliases: Vec<&str> = unit.aliases.iter().map(String::as_str).collect();
            self.define(
                &unit.name,
                &unit.symbol,
                &aliases,
                unit.definition.as_deref(),
            )?;
        }
        Ok(definitions.units.len())
    }

    /// Loads unit definitions from a TOML file.
    pub fn load_definitions<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let definitions = UnitDefinitions::from_file(path.as_ref())?;
        let count = self.load(&definitions)?;
        log::debug!(
            "loaded {} unit definitions from {}",
            count,
            path.as_ref().display()
        );
        Ok(count)
    }

    /// Loads unit definitions from TOML text.
    pub fn load_definitions_str(&self, content: &str) -> Result<usize> {
        let definitions = UnitDefinitions::from_toml_str(content)?;
        let count = self.load(&definitions)?;
        log::debug!("loaded {} unit definitions", count);
        Ok(count)
    }

    /// The base-unit form of an expression: `factor * dims` with only base atoms.
    pub fn simplify(&self, expr: &str) -> Result<Reference> {
        Ok(self.evaluate(expr)?.simplified())
    }

    /// Whether two expressions reduce to the same base dimensionality.
    pub fn compatible(&self, a: &str, b: &str) -> Result<bool> {
        Ok(self.simplify(a)?.dims == self.simplify(b)?.dims)
    }

    /// The dimensionality `key**1`, if `key` is registered.
    pub fn dimensionality(&self, key: &str) -> Option<Dimensionality> {
        self.get(key).map(Dimensionality::from_atom)
    }
}
