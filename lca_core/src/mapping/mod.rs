//! # Material Mapping
//!
//! Links model material names to impact database identifiers.
//!
//! [`auto_map_materials`] proposes a mapping by running an ordered chain of
//! [`MaterialMatcher`] strategies over every discovered material; the first
//! strategy that returns a confident match wins. Materials no strategy can
//! place unambiguously are left out, so the caller can map them by hand:
//!
//! ```rust
//! use lca_core::database::kbob::builtin_kbob_database;
//! use lca_core::discovery::discover_materials;
//! use lca_core::mapping::auto_map_materials;
//! use lca_core::model::{Element, InMemoryModel};
//!
//! let model = InMemoryModel::new("IFC4")
//!     .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete C30/37").with_volume(12.0))
//!     .with_element(Element::new("c1", "IfcColumn").with_direct("Steel Reinforcement").with_volume(0.1));
//!
//! let db = builtin_kbob_database();
//! let materials = discover_materials(&model).unwrap();
//! let mut mapping = auto_map_materials(&materials, &db).unwrap();
//! assert_eq!(mapping.get("Concrete C30/37"), Some("KBOB_CONCRETE_C30_37"));
//!
//! // Manual overrides only fill gaps
//! mapping.insert_if_absent("Steel Reinforcement", "KBOB_STEEL_REINFORCING");
//! assert_eq!(mapping.len(), 2);
//! ```

pub mod matchers;

pub use matchers::{ExactNameMatcher, MaterialMatcher, SynonymMatcher, TokenOverlapMatcher};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::database::{DatabaseEntry, DatabaseReader};
use crate::discovery::MaterialRecord;
use crate::errors::{LcaError, LcaResult};

// ============================================================================
// Mapping
// ============================================================================

/// Material name → database identifier, ordered by material name.
///
/// Serializes as a plain JSON object:
///
/// ```json
/// { "Concrete C30/37": "KBOB_CONCRETE_C30_37", "Brick": "KBOB_BRICK" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialMapping {
    entries: BTreeMap<String, String>,
}

impl MaterialMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a material, returning the identifier it replaced
    pub fn insert(&mut self, material: impl Into<String>, database_id: impl Into<String>) -> Option<String> {
        self.entries.insert(material.into(), database_id.into())
    }

    /// Map a material only if it has no mapping yet. Returns true if inserted.
    pub fn insert_if_absent(&mut self, material: impl Into<String>, database_id: impl Into<String>) -> bool {
        let material = material.into();
        if self.entries.contains_key(&material) {
            return false;
        }
        self.entries.insert(material, database_id.into());
        true
    }

    pub fn get(&self, material: &str) -> Option<&str> {
        self.entries.get(material).map(String::as_str)
    }

    pub fn remove(&mut self, material: &str) -> Option<String> {
        self.entries.remove(material)
    }

    pub fn contains(&self, material: &str) -> bool {
        self.entries.contains_key(material)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (material, database id) pairs in material-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy of this mapping with `overrides` applied on top
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> MaterialMapping {
        let mut mapping = self.clone();
        for (material, id) in overrides {
            mapping.entries.insert(material.clone(), id.clone());
        }
        mapping
    }

    /// Keys that name no discovered material
    pub fn stale_keys(&self, materials: &[MaterialRecord]) -> Vec<String> {
        let known: BTreeSet<&str> = materials.iter().map(|m| m.name.as_str()).collect();
        self.entries
            .keys()
            .filter(|k| !known.contains(k.as_str()))
            .cloned()
            .collect()
    }

    /// Drop keys that name no discovered material. Returns the dropped keys.
    pub fn retain_discovered(&mut self, materials: &[MaterialRecord]) -> Vec<String> {
        let stale = self.stale_keys(materials);
        for key in &stale {
            self.entries.remove(key);
        }
        stale
    }

    /// Mapped identifiers the database has no entry for, sorted and deduplicated
    pub fn unknown_targets<D: DatabaseReader + ?Sized>(&self, database: &D) -> LcaResult<Vec<String>> {
        let mut unknown = BTreeSet::new();
        for id in self.entries.values() {
            if database.lookup(id)?.is_none() {
                unknown.insert(id.clone());
            }
        }
        Ok(unknown.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MaterialMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MaterialMapping {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ============================================================================
// Automatic mapping
// ============================================================================

/// Default similarity threshold for the token-overlap strategy
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Tuning of the automatic mapper.
///
/// ## JSON Example
///
/// ```json
/// { "similarity_threshold": 0.6, "use_synonyms": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Minimum similarity (0-1] for a fuzzy match
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,

    /// Try the synonym table after the direct strategies
    #[serde(default = "default_use_synonyms")]
    pub use_synonyms: bool,
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_use_synonyms() -> bool {
    true
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            use_synonyms: true,
        }
    }
}

impl MapperConfig {
    /// Check the threshold is within (0, 1]
    pub fn validate(&self) -> LcaResult<()> {
        let t = self.similarity_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(LcaError::invalid_input(
                "similarity_threshold",
                t.to_string(),
                "must be greater than 0 and at most 1",
            ));
        }
        Ok(())
    }

    /// Strategy chain in evaluation order
    fn matchers(&self) -> Vec<Box<dyn MaterialMatcher>> {
        let mut chain: Vec<Box<dyn MaterialMatcher>> = vec![
            Box::new(ExactNameMatcher),
            Box::new(TokenOverlapMatcher {
                threshold: self.similarity_threshold,
            }),
        ];
        if self.use_synonyms {
            chain.push(Box::new(SynonymMatcher {
                threshold: self.similarity_threshold,
            }));
        }
        chain
    }
}

/// Outcome of the matcher chain for one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDecision {
    /// Model material name
    pub material: String,

    /// Chosen database identifier, if any strategy was confident
    pub database_id: Option<String>,

    /// Name of the strategy that produced the match
    pub matcher: Option<String>,
}

/// Run the matcher chain for every material and report which strategy, if
/// any, matched it.
///
/// # Errors
///
/// * `LcaError::DatabaseUnavailable` - the database cannot be enumerated
/// * `LcaError::InvalidInput` - the similarity threshold is out of range
pub fn explain_matches<D: DatabaseReader + ?Sized>(
    materials: &[MaterialRecord],
    database: &D,
    config: &MapperConfig,
) -> LcaResult<Vec<MatchDecision>> {
    config.validate()?;
    let candidates = enumerate(database)?;
    let chain = config.matchers();

    Ok(materials
        .iter()
        .map(|record| {
            let hit = chain
                .iter()
                .find_map(|m| m.find_match(&record.name, &candidates).map(|id| (id, m.name())));
            MatchDecision {
                material: record.name.clone(),
                database_id: hit.as_ref().map(|(id, _)| id.clone()),
                matcher: hit.map(|(_, name)| name.to_string()),
            }
        })
        .collect())
}

/// Propose a mapping with the default [`MapperConfig`].
///
/// # Errors
///
/// * `LcaError::DatabaseUnavailable` - the database cannot be enumerated
pub fn auto_map_materials<D: DatabaseReader + ?Sized>(
    materials: &[MaterialRecord],
    database: &D,
) -> LcaResult<MaterialMapping> {
    auto_map_materials_with(materials, database, &MapperConfig::default())
}

/// Propose a mapping for `materials`.
///
/// Unmapped materials are omitted. The result only depends on the material
/// names and the database contents, and every mapped identifier exists in
/// the database.
pub fn auto_map_materials_with<D: DatabaseReader + ?Sized>(
    materials: &[MaterialRecord],
    database: &D,
    config: &MapperConfig,
) -> LcaResult<MaterialMapping> {
    Ok(explain_matches(materials, database, config)?
        .into_iter()
        .filter_map(|d| d.database_id.map(|id| (d.material, id)))
        .collect())
}

fn enumerate<D: DatabaseReader + ?Sized>(database: &D) -> LcaResult<Vec<&DatabaseEntry>> {
    database.entries().map_err(|e| match e {
        LcaError::DatabaseUnavailable { .. } => e,
        other => LcaError::database_unavailable(format!(
            "cannot enumerate '{}': {}",
            database.name(),
            other
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::kbob::builtin_kbob_database;
    use crate::model::AssociationType;

    fn record(name: &str) -> MaterialRecord {
        MaterialRecord {
            name: name.to_string(),
            usage_count: 1,
            association_type: AssociationType::Direct,
            element_types: vec!["IfcWall".to_string()],
        }
    }

    fn records(names: &[&str]) -> Vec<MaterialRecord> {
        names.iter().map(|n| record(n)).collect()
    }

    #[test]
    fn test_auto_map_strategies() {
        let db = builtin_kbob_database();
        let materials = records(&[
            "Concrete C30/37",
            "Beton C25/30",
            "Mineral Wool",
            "Steel Reinforcement",
            "Concrete",
        ]);
        let mapping = auto_map_materials(&materials, &db).unwrap();

        assert_eq!(mapping.get("Concrete C30/37"), Some("KBOB_CONCRETE_C30_37"));
        assert_eq!(mapping.get("Beton C25/30"), Some("KBOB_CONCRETE_C25_30"));
        assert_eq!(mapping.get("Mineral Wool"), Some("KBOB_INSULATION_MINERAL_WOOL"));
        assert!(!mapping.contains("Steel Reinforcement"));
        assert!(!mapping.contains("Concrete"));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_explain_reports_strategy() {
        let db = builtin_kbob_database();
        let decisions =
            explain_matches(&records(&["clay brick", "Beton C25/30", "Unobtainium"]), &db, &MapperConfig::default())
                .unwrap();
        assert_eq!(decisions[0].matcher.as_deref(), Some("exact"));
        assert_eq!(decisions[1].matcher.as_deref(), Some("synonym"));
        assert_eq!(decisions[2].database_id, None);
        assert_eq!(decisions[2].matcher, None);
    }

    #[test]
    fn test_synonyms_can_be_disabled() {
        let db = builtin_kbob_database();
        let config = MapperConfig {
            use_synonyms: false,
            ..MapperConfig::default()
        };
        let mapping = auto_map_materials_with(&records(&["Beton C25/30"]), &db, &config).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_invalid_threshold() {
        let db = builtin_kbob_database();
        let config = MapperConfig {
            similarity_threshold: 0.0,
            ..MapperConfig::default()
        };
        let err = auto_map_materials_with(&records(&["Brick"]), &db, &config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_auto_map_is_deterministic_and_valid() {
        let db = builtin_kbob_database();
        let materials = records(&["Glued laminated timber", "Gypsum Plasterboard", "Ziegel", "EPS"]);
        let first = auto_map_materials(&materials, &db).unwrap();
        let second = auto_map_materials(&materials, &db).unwrap();
        assert_eq!(first, second);
        assert!(first.unknown_targets(&db).unwrap().is_empty());
    }

    #[test]
    fn test_insert_if_absent() {
        let mut mapping = MaterialMapping::new();
        assert!(mapping.insert_if_absent("Steel Reinforcement", "KBOB_STEEL_REINFORCING"));
        assert!(!mapping.insert_if_absent("Steel Reinforcement", "KBOB_STEEL_STRUCTURAL"));
        assert_eq!(mapping.get("Steel Reinforcement"), Some("KBOB_STEEL_REINFORCING"));
    }

    #[test]
    fn test_overrides_leave_original_untouched() {
        let base: MaterialMapping = [("Concrete C30/37", "KBOB_CONCRETE_C30_37"), ("Brick", "KBOB_BRICK")]
            .into_iter()
            .collect();
        let overrides = BTreeMap::from([("Concrete C30/37".to_string(), "KBOB_CONCRETE_RC".to_string())]);
        let scenario = base.with_overrides(&overrides);

        assert_eq!(scenario.get("Concrete C30/37"), Some("KBOB_CONCRETE_RC"));
        assert_eq!(scenario.get("Brick"), Some("KBOB_BRICK"));
        assert_eq!(base.get("Concrete C30/37"), Some("KBOB_CONCRETE_C30_37"));
    }

    #[test]
    fn test_stale_keys() {
        let mut mapping: MaterialMapping =
            [("Brick", "KBOB_BRICK"), ("Old Render", "KBOB_PLASTER")].into_iter().collect();
        let materials = records(&["Brick"]);
        assert_eq!(mapping.stale_keys(&materials), vec!["Old Render".to_string()]);
        assert_eq!(mapping.retain_discovered(&materials), vec!["Old Render".to_string()]);
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_unknown_targets() {
        let db = builtin_kbob_database();
        let mapping: MaterialMapping = [("A", "KBOB_BRICK"), ("B", "NOPE"), ("C", "NOPE")].into_iter().collect();
        assert_eq!(mapping.unknown_targets(&db).unwrap(), vec!["NOPE".to_string()]);
    }

    #[test]
    fn test_mapping_serializes_as_object() {
        let mapping: MaterialMapping = [("Brick", "KBOB_BRICK")].into_iter().collect();
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"Brick":"KBOB_BRICK"}"#);
        let parsed: MaterialMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mapping);
    }
}
