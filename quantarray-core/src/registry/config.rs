//! Custom unit definitions from TOML files.
//!
//! ```toml
//! [[unit]]
//! name = "furlong"
//! symbol = "fur"
//! aliases = ["furlongs"]
//! definition = "201.168*m"
//! ```

use crate::error::{QuantityError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A set of unit definitions, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinitions {
    /// The `[[unit]]` tables.
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitDefinition>,
}

/// One `[[unit]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Long name, e.g. `"furlong"`.
    pub name: String,
    /// Symbol used when rendering, e.g. `"fur"`.
    pub symbol: String,
    /// Additional lookup keys.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Unit expression in terms of already-known units. Absent for a new base unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl UnitDefinitions {
    /// Parses definitions from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            QuantityError::Config(format!("Failed to parse unit definitions: {}", e))
        })
    }

    /// Reads and parses a TOML definitions file.
    ///
    /// # Errors
    /// [`QuantityError::Config`] if the file cannot be read or is not valid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            QuantityError::Config(format!(
                "Failed to read unit definitions {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Renders the definitions back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| {
            QuantityError::Config(format!("Failed to serialize unit definitions: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FURLONG: &str = r#"
[[unit]]
name = "furlong"
symbol = "fur"
aliases = ["furlongs"]
definition = "201.168*m"

[[unit]]
name = "widget"
symbol = "wd"
"#;

    #[test]
    fn parses_unit_tables() {
        let defs = UnitDefinitions::from_toml_str(FURLONG).unwrap();
        assert_eq!(defs.units.len(), 2);
        assert_eq!(defs.units[0].name, "furlong");
        assert_eq!(defs.units[0].aliases, vec!["furlongs".to_string()]);
        assert_eq!(defs.units[0].definition.as_deref(), Some("201.168*m"));
        assert!(defs.units[1].aliases.is_empty());
        assert!(defs.units[1].definition.is_none());
    }

    #[test]
    fn empty_document_has_no_units() {
        let defs = UnitDefinitions::from_toml_str("").unwrap();
        assert!(defs.units.is_empty());
    }

    #[test]
    fn missing_symbol_is_a_config_error() {
        let err = UnitDefinitions::from_toml_str("[[unit]]\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, QuantityError::Config(_)));
    }

    #[test]
    fn reads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FURLONG.as_bytes()).unwrap();
        let defs = UnitDefinitions::from_file(file.path()).unwrap();
        assert_eq!(defs.units[1].symbol, "wd");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UnitDefinitions::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, QuantityError::Config(_)));
    }

    #[test]
    fn survives_toml_round_trip() {
        let defs = UnitDefinitions::from_toml_str(FURLONG).unwrap();
        let text = defs.to_toml_string().unwrap();
        assert_eq!(UnitDefinitions::from_toml_str(&text).unwrap(), defs);
    }
}
