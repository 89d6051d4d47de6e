//! # lca_core - Building Life Cycle Assessment Engine
//!
//! `lca_core` computes the embodied environmental impact of a building from
//! its BIM model and compares design alternatives ("optioneering"). All
//! inputs and outputs are JSON-serializable, so results can be handed to
//! reporting tools, dashboards or other services unchanged.
//!
//! ## Design Philosophy
//!
//! - **Read-only collaborators**: the building model and the impact database
//!   are accessed through the [`model::BuildingModel`] and
//!   [`database::DatabaseReader`] traits and never modified
//! - **JSON-First**: all result types implement Serialize/Deserialize
//! - **Rich Errors**: structured error types; data-quality problems are
//!   counted and reported instead of aborting a run
//!
//! ## Quick Start
//!
//! ```rust
//! use lca_core::prelude::*;
//!
//! let model = InMemoryModel::new("IFC4")
//!     .with_element(Element::new("slab-1", "IfcSlab").with_direct("Concrete C30/37").with_volume(10.0))
//!     .with_element(Element::new("wall-1", "IfcWall").with_layers([("Clay brick", 0.15), ("Mineral Wool", 0.1)]).with_volume(5.0));
//! let db = builtin_kbob_database();
//!
//! let materials = discover_materials(&model).unwrap();
//! let mapping = auto_map_materials(&materials, &db).unwrap();
//! let baseline = run_analysis(&model, &mapping, &db).unwrap();
//!
//! let mut engine = OptioneeringEngine::new(&model, &db, mapping);
//! engine.add_material_comparison("Concrete C30/37", ["KBOB_CONCRETE_RC"], "Concrete Options");
//! let scenarios = engine.run().unwrap();
//!
//! assert!(baseline.total(indicators::GWP) > 0.0);
//! assert!(scenarios[0].delta(indicators::GWP).unwrap() < 0.0);
//! ```
//!
//! ## Modules
//!
//! - [`model`] - building model contract, elements and material associations
//! - [`database`] - impact database contract, entries and the built-in KBOB subset
//! - [`discovery`] - material inventory, usage summary and model validation
//! - [`mapping`] - material → database mapping and the automatic mapper
//! - [`analysis`] - impact calculation
//! - [`optioneering`] - substitution scenarios against a baseline
//! - [`project`] - persistent study container
//! - [`file_io`] - atomic project saves and locking
//! - [`units`] - type-safe unit wrappers and reference-unit conversion
//! - [`errors`] - structured error types
//!
//! ## Features
//!
//! - `parallel` - evaluate optioneering scenarios on a rayon thread pool

pub mod analysis;
pub mod database;
pub mod discovery;
pub mod errors;
pub mod file_io;
pub mod mapping;
pub mod model;
pub mod optioneering;
pub mod project;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use errors::{LcaError, LcaResult};
pub use file_io::{load_project, save_project, FileLock};
pub use project::{LcaProject, ProjectMetadata, ProjectSettings};

/// Everything needed for a typical discovery → mapping → analysis → optioneering run
pub mod prelude {
    pub use crate::analysis::{run_analysis, AnalysisResult, SkipReason};
    pub use crate::database::kbob::builtin_kbob_database;
    pub use crate::database::{indicators, DatabaseEntry, DatabaseReader, ImpactDatabase};
    pub use crate::discovery::{discover_materials, material_summary, validate_model_for_lca};
    pub use crate::errors::{LcaError, LcaResult};
    pub use crate::mapping::{auto_map_materials, MapperConfig, MaterialMapping};
    pub use crate::model::{BuildingModel, Element, InMemoryModel};
    pub use crate::optioneering::{
        MaterialComparison, OptioneeringEngine, OptioneeringStudy, ScenarioResult, SubstitutionRule,
    };
    pub use crate::project::LcaProject;
}
