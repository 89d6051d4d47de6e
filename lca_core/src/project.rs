//! # Project Data Structures
//!
//! `LcaProject` is the root container of an LCA study: the curated material
//! mapping, the substitution rules and material comparisons, and the
//! settings used to produce them. The building model and impact database
//! are not part of the project; they are supplied when a run starts.
//! Projects serialize to `.lca` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! LcaProject
//! ├── meta: ProjectMetadata (version, id, name, author, timestamps)
//! ├── settings: ProjectSettings (database, indicators, mapper tuning)
//! ├── mapping: MaterialMapping (material name → database id)
//! ├── substitution_rules: Vec<SubstitutionRule>
//! └── comparisons: Vec<MaterialComparison>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use lca_core::project::LcaProject;
//!
//! let mut project = LcaProject::new("Office Block B", "A. Planner");
//! project.mapping.insert("Concrete C30/37", "KBOB_CONCRETE_C30_37");
//!
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! assert!(json.contains("KBOB_CONCRETE_C30_37"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{run_analysis, AnalysisResult};
use crate::database::{indicators, DatabaseReader};
use crate::discovery::MaterialRecord;
use crate::errors::LcaResult;
use crate::mapping::{auto_map_materials_with, MapperConfig, MaterialMapping};
use crate::model::BuildingModel;
use crate::optioneering::{MaterialComparison, OptioneeringEngine, SubstitutionRule};

/// Current schema version for .lca files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container, serialized to `.lca` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcaProject {
    pub meta: ProjectMetadata,

    #[serde(default)]
    pub settings: ProjectSettings,

    /// Curated material mapping (auto-mapped plus manual entries)
    #[serde(default)]
    pub mapping: MaterialMapping,

    /// Rule scenarios, in evaluation order
    #[serde(default)]
    pub substitution_rules: Vec<SubstitutionRule>,

    /// Comparison scenarios, in evaluation order
    #[serde(default)]
    pub comparisons: Vec<MaterialComparison>,
}

impl LcaProject {
    /// Create an empty project.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lca_core::project::{LcaProject, SCHEMA_VERSION};
    ///
    /// let project = LcaProject::new("Office Block B", "A. Planner");
    /// assert_eq!(project.meta.version, SCHEMA_VERSION);
    /// assert!(project.mapping.is_empty());
    /// ```
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        LcaProject {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                id: Uuid::new_v4(),
                name: name.into(),
                author: author.into(),
                created: now,
                modified: now,
            },
            settings: ProjectSettings::default(),
            mapping: MaterialMapping::new(),
            substitution_rules: Vec::new(),
            comparisons: Vec::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Map a material by hand, replacing any earlier entry
    pub fn map_material(&mut self, material: impl Into<String>, database_id: impl Into<String>) {
        self.mapping.insert(material, database_id);
        self.touch();
    }

    /// Add auto-mapper suggestions for materials that have no mapping yet.
    ///
    /// Existing entries, manual or automatic, are kept. Returns the number
    /// of entries added.
    pub fn apply_auto_mapping<D: DatabaseReader + ?Sized>(
        &mut self,
        materials: &[MaterialRecord],
        database: &D,
    ) -> LcaResult<usize> {
        let suggested = auto_map_materials_with(materials, database, &self.settings.mapper)?;
        let mut added = 0;
        for (material, id) in suggested.iter() {
            if self.mapping.insert_if_absent(material, id) {
                added += 1;
            }
        }
        if added > 0 {
            self.touch();
        }
        Ok(added)
    }

    pub fn add_substitution_rule(&mut self, rule: SubstitutionRule) {
        self.substitution_rules.push(rule);
        self.touch();
    }

    pub fn add_comparison(&mut self, comparison: MaterialComparison) {
        self.comparisons.push(comparison);
        self.touch();
    }

    /// Run the baseline analysis with the project mapping
    pub fn analyse<M, D>(&self, model: &M, database: &D) -> LcaResult<AnalysisResult>
    where
        M: BuildingModel + ?Sized,
        D: DatabaseReader + ?Sized,
    {
        run_analysis(model, &self.mapping, database)
    }

    /// Optioneering engine loaded with the project's mapping, rules and
    /// comparisons
    pub fn optioneering<'a, M, D>(&self, model: &'a M, database: &'a D) -> OptioneeringEngine<'a, M, D>
    where
        M: BuildingModel + ?Sized,
        D: DatabaseReader + ?Sized,
    {
        let mut engine = OptioneeringEngine::new(model, database, self.mapping.clone());
        for rule in &self.substitution_rules {
            engine.add_substitution_rule(rule.clone());
        }
        for comparison in &self.comparisons {
            engine.add_comparison(comparison.clone());
        }
        engine
    }
}

impl Default for LcaProject {
    fn default() -> Self {
        LcaProject::new("", "")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub id: Uuid,

    /// Building or study name
    pub name: String,

    /// Responsible author
    pub author: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Project-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Impact database the mapping refers to (e.g. "KBOB")
    pub database: String,

    /// Indicators reported by default, in display order
    pub indicators: Vec<String>,

    /// Auto-mapper tuning
    #[serde(default)]
    pub mapper: MapperConfig,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            database: "KBOB".to_string(),
            indicators: indicators::ALL.iter().map(|s| s.to_string()).collect(),
            mapper: MapperConfig::default(),
        }
    }
}
