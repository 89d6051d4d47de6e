//! # Impact Database
//!
//! Environmental-impact coefficients keyed by database identifier. The core
//! reads them through the [`DatabaseReader`] trait; [`ImpactDatabase`] is the
//! in-memory implementation, filled from JSON or from the built-in KBOB
//! subset in [`kbob`].
//!
//! ## Indicators
//!
//! Factors are stored per indicator name. The KBOB indicators are available
//! as constants in [`indicators`]; other databases may add their own names.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::database::{indicators, kbob, DatabaseReader};
//!
//! let db = kbob::builtin_kbob_database();
//! let concrete = db.get_material_data("KBOB_CONCRETE_C30_37").unwrap();
//! assert_eq!(concrete.density_kg_m3, Some(2400.0));
//! assert!(concrete.factor(indicators::GWP).is_some());
//! ```

pub mod kbob;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{LcaError, LcaResult};
use crate::units::ReferenceUnit;

/// Indicator names used by the KBOB data set
pub mod indicators {
    /// Global warming potential (kg CO2-eq)
    pub const GWP: &str = "gwp";
    /// Non-renewable primary energy (MJ)
    pub const PENRE: &str = "penre";
    /// Swiss ecological scarcity points (UBP)
    pub const UBP: &str = "ubp";

    /// All KBOB indicators in display order
    pub const ALL: [&str; 3] = [GWP, PENRE, UBP];

    /// Unit label of an indicator total, if known
    pub fn unit(indicator: &str) -> &'static str {
        match indicator {
            GWP => "kg CO2-eq",
            PENRE => "MJ",
            UBP => "UBP",
            _ => "",
        }
    }
}

/// One environmental-impact record.
///
/// ## JSON Example
///
/// ```json
/// {
///   "id": "KBOB_CONCRETE_C30_37",
///   "name": "Concrete C30/37",
///   "category": "Concrete",
///   "density_kg_m3": 2400.0,
///   "unit": "kg",
///   "factors": { "gwp": 0.1, "penre": 0.6, "ubp": 157.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    /// Database identifier (lookup key)
    pub id: String,

    /// Display name
    pub name: String,

    /// Material group (e.g. "Concrete", "Insulation")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Density for volume to mass conversion (kg/m³)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_kg_m3: Option<f64>,

    /// Unit the factors are expressed per
    #[serde(default)]
    pub unit: ReferenceUnit,

    /// Impact factor per reference unit, keyed by indicator name
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
}

impl DatabaseEntry {
    /// Create an entry without density or factors
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit: ReferenceUnit) -> Self {
        DatabaseEntry {
            id: id.into(),
            name: name.into(),
            category: None,
            density_kg_m3: None,
            unit,
            factors: BTreeMap::new(),
        }
    }

    /// Set the density (builder pattern)
    pub fn with_density(mut self, kg_m3: f64) -> Self {
        self.density_kg_m3 = Some(kg_m3);
        self
    }

    /// Set the category (builder pattern)
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add an indicator factor (builder pattern)
    pub fn with_factor(mut self, indicator: impl Into<String>, value: f64) -> Self {
        self.factors.insert(indicator.into(), value);
        self
    }

    /// Factor for one indicator
    pub fn factor(&self, indicator: &str) -> Option<f64> {
        self.factors.get(indicator).copied()
    }
}

impl std::fmt::Display for DatabaseEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Read-only keyed access to impact data.
///
/// `lookup` distinguishes a missing entry (`Ok(None)`) from a database that
/// cannot be queried (`Err(DatabaseUnavailable)`).
pub trait DatabaseReader: Sync {
    /// Database name (e.g. "KBOB")
    fn name(&self) -> &str;

    /// Look up one entry by identifier
    fn lookup(&self, id: &str) -> LcaResult<Option<&DatabaseEntry>>;

    /// All entries, in a stable order
    fn entries(&self) -> LcaResult<Vec<&DatabaseEntry>>;

    /// Number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an entry, treating a missing id as `DatabaseMiss`
    fn get_material_data(&self, id: &str) -> LcaResult<&DatabaseEntry> {
        self.lookup(id)?.ok_or_else(|| LcaError::database_miss(id))
    }
}

/// Serialized form of an [`ImpactDatabase`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseFile {
    name: String,
    #[serde(default)]
    version: Option<String>,
    entries: Vec<DatabaseEntry>,
}

/// Impact database held in memory, ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct ImpactDatabase {
    /// Database name (e.g. "KBOB")
    pub name: String,

    /// Data set version (e.g. "2022")
    pub version: Option<String>,

    entries: BTreeMap<String, DatabaseEntry>,
}

impl ImpactDatabase {
    /// Create an empty database
    pub fn new(name: impl Into<String>) -> Self {
        ImpactDatabase {
            name: name.into(),
            version: None,
            entries: BTreeMap::new(),
        }
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, entry: DatabaseEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Add an entry (builder pattern)
    pub fn with_entry(mut self, entry: DatabaseEntry) -> Self {
        self.insert(entry);
        self
    }

    /// Entries whose name or id contains `pattern` (case-insensitive)
    pub fn search(&self, pattern: &str) -> Vec<&DatabaseEntry> {
        let pattern = pattern.to_lowercase();
        self.entries
            .values()
            .filter(|e| {
                e.name.to_lowercase().contains(&pattern) || e.id.to_lowercase().contains(&pattern)
            })
            .collect()
    }

    /// Entries of one category (case-insensitive)
    pub fn entries_in_category(&self, category: &str) -> Vec<&DatabaseEntry> {
        self.entries
            .values()
            .filter(|e| {
                e.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .collect()
    }

    /// Parse a database from JSON
    pub fn from_json(json: &str) -> LcaResult<Self> {
        let file: DatabaseFile = serde_json::from_str(json)?;
        let mut db = ImpactDatabase::new(file.name);
        db.version = file.version;
        for entry in file.entries {
            if entry.id.trim().is_empty() {
                return Err(LcaError::invalid_input("id", "", "Database entry id must not be empty"));
            }
            db.insert(entry);
        }
        Ok(db)
    }

    /// Serialize the database to pretty JSON
    pub fn to_json(&self) -> LcaResult<String> {
        let file = DatabaseFile {
            name: self.name.clone(),
            version: self.version.clone(),
            entries: self.entries.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Load a database from a JSON file
    pub fn load_from_json(path: &Path) -> LcaResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LcaError::file_error("read", path.display().to_string(), e.to_string())
        })?;
        Self::from_json(&contents).map_err(|e| match e {
            LcaError::SerializationError { reason } => LcaError::SerializationError {
                reason: format!("Invalid database JSON in {}: {}", path.display(), reason),
            },
            other => other,
        })
    }
}

impl DatabaseReader for ImpactDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, id: &str) -> LcaResult<Option<&DatabaseEntry>> {
        Ok(self.entries.get(id))
    }

    fn entries(&self) -> LcaResult<Vec<&DatabaseEntry>> {
        Ok(self.entries.values().collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> ImpactDatabase {
        ImpactDatabase::new("Test")
            .with_entry(
                DatabaseEntry::new("C30", "Concrete C30/37", ReferenceUnit::Kilogram)
                    .with_density(2400.0)
                    .with_category("Concrete")
                    .with_factor(indicators::GWP, 0.1),
            )
            .with_entry(
                DatabaseEntry::new("GLASS", "Float glass", ReferenceUnit::SquareMeter)
                    .with_category("Glass")
                    .with_factor(indicators::GWP, 43.0),
            )
    }

    #[test]
    fn test_lookup_and_miss() {
        let db = sample_db();
        assert_eq!(db.len(), 2);
        assert!(db.lookup("C30").unwrap().is_some());
        assert!(db.lookup("c30").unwrap().is_none());

        let err = db.get_material_data("NOPE").unwrap_err();
        assert_eq!(err, LcaError::database_miss("NOPE"));
    }

    #[test]
    fn test_entries_sorted_by_id() {
        let db = sample_db();
        let ids: Vec<&str> = db.entries().unwrap().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["C30", "GLASS"]);
    }

    #[test]
    fn test_search_and_category() {
        let db = sample_db();
        assert_eq!(db.search("concrete").len(), 1);
        assert_eq!(db.search("glass")[0].id, "GLASS");
        assert_eq!(db.entries_in_category("concrete").len(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let db = sample_db();
        let json = db.to_json().unwrap();
        let parsed = ImpactDatabase::from_json(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get_material_data("GLASS").unwrap().unit, ReferenceUnit::SquareMeter);
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{ "name": "Mini", "entries": [ { "id": "X", "name": "Thing" } ] }"#;
        let db = ImpactDatabase::from_json(json).unwrap();
        let entry = db.get_material_data("X").unwrap();
        assert_eq!(entry.unit, ReferenceUnit::Kilogram);
        assert!(entry.factors.is_empty());
        assert!(entry.density_kg_m3.is_none());
    }

    #[test]
    fn test_json_rejects_blank_id() {
        let json = r#"{ "name": "Mini", "entries": [ { "id": " ", "name": "Thing" } ] }"#;
        assert!(ImpactDatabase::from_json(json).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = ImpactDatabase::from_json("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
