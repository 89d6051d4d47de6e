//! # Optioneering
//!
//! Compares design alternatives against a baseline analysis. Each scenario
//! is the baseline mapping with a set of material substitutions applied,
//! analysed from scratch and reported as a delta per indicator.
//!
//! Scenarios come from two sources:
//!
//! - [`SubstitutionRule`] - a named set of substitutions, one scenario
//! - [`MaterialComparison`] - one material against a list of alternative
//!   database entries, one scenario per alternative
//!
//! Scenarios never see each other's substitutions, and a scenario whose
//! replacement is not in the database fails on its own without stopping
//! the others.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::database::{indicators, kbob::builtin_kbob_database};
//! use lca_core::mapping::MaterialMapping;
//! use lca_core::model::{Element, InMemoryModel};
//! use lca_core::optioneering::{OptioneeringEngine, SubstitutionRule};
//!
//! let model = InMemoryModel::new("IFC4")
//!     .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete C30/37").with_volume(10.0));
//! let db = builtin_kbob_database();
//! let baseline: MaterialMapping = [("Concrete C30/37", "KBOB_CONCRETE_C30_37")].into_iter().collect();
//!
//! let mut engine = OptioneeringEngine::new(&model, &db, baseline);
//! engine.add_substitution_rule(
//!     SubstitutionRule::new("Recycled Concrete").with_substitution("Concrete C30/37", "KBOB_CONCRETE_RC"),
//! );
//!
//! let scenarios = engine.run().unwrap();
//! assert_eq!(scenarios.len(), 1);
//! assert!(scenarios[0].delta(indicators::GWP).unwrap() < 0.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::analysis::{run_analysis, AnalysisResult};
use crate::database::{indicators, DatabaseReader};
use crate::errors::{LcaError, LcaResult};
use crate::mapping::MaterialMapping;
use crate::model::BuildingModel;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ============================================================================
// Scenario definitions
// ============================================================================

/// A named set of material substitutions evaluated as one scenario.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Timber Structure",
///   "description": "Replace concrete slabs with CLT",
///   "substitutions": { "Concrete C30/37": "KBOB_TIMBER_CLT" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Material name → replacement database identifier
    pub substitutions: BTreeMap<String, String>,
}

impl SubstitutionRule {
    /// Create a rule without substitutions
    pub fn new(name: impl Into<String>) -> Self {
        SubstitutionRule {
            name: name.into(),
            description: String::new(),
            substitutions: BTreeMap::new(),
        }
    }

    /// Set the description (builder pattern)
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a substitution (builder pattern)
    pub fn with_substitution(mut self, material: impl Into<String>, database_id: impl Into<String>) -> Self {
        self.substitutions.insert(material.into(), database_id.into());
        self
    }
}

/// One material compared against several alternative database entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialComparison {
    pub name: String,

    /// Model material name being replaced
    pub material: String,

    /// Replacement database identifiers, in evaluation order
    pub alternatives: Vec<String>,
}

impl MaterialComparison {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        material: impl Into<String>,
        alternatives: impl IntoIterator<Item = S>,
    ) -> Self {
        MaterialComparison {
            name: name.into(),
            material: material.into(),
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }
    }

    /// Scenario name for one alternative
    pub fn scenario_name(&self, alternative: &str) -> String {
        format!("{}: {}", self.name, alternative)
    }
}

/// Where a scenario came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ScenarioOrigin {
    Rule { rule: String },
    Comparison { comparison: String, alternative: String },
}

// ============================================================================
// Scenario results
// ============================================================================

/// Completed analysis or the error that stopped the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ScenarioOutcome {
    Completed {
        analysis: Box<AnalysisResult>,
        /// Scenario total - baseline total, per indicator
        deltas: BTreeMap<String, f64>,
        /// Delta as a percentage of the baseline, where the baseline is non-zero
        percent_changes: BTreeMap<String, f64>,
    },
    Failed {
        error: LcaError,
    },
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub description: String,
    pub origin: ScenarioOrigin,

    /// Substitutions applied on top of the baseline mapping
    pub substitutions: BTreeMap<String, String>,

    pub outcome: ScenarioOutcome,
}

impl ScenarioResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScenarioOutcome::Completed { .. })
    }

    /// Scenario analysis, if completed
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match &self.outcome {
            ScenarioOutcome::Completed { analysis, .. } => Some(&**analysis),
            ScenarioOutcome::Failed { .. } => None,
        }
    }

    /// Error, if failed
    pub fn error(&self) -> Option<&LcaError> {
        match &self.outcome {
            ScenarioOutcome::Completed { .. } => None,
            ScenarioOutcome::Failed { error } => Some(error),
        }
    }

    /// Scenario total for an indicator
    pub fn total(&self, indicator: &str) -> Option<f64> {
        self.analysis().map(|a| a.total(indicator))
    }

    /// Change against the baseline for an indicator
    pub fn delta(&self, indicator: &str) -> Option<f64> {
        match &self.outcome {
            ScenarioOutcome::Completed { deltas, .. } => deltas.get(indicator).copied(),
            ScenarioOutcome::Failed { .. } => None,
        }
    }

    /// Relative change in percent (None for a zero baseline)
    pub fn percent_change(&self, indicator: &str) -> Option<f64> {
        match &self.outcome {
            ScenarioOutcome::Completed { percent_changes, .. } => percent_changes.get(indicator).copied(),
            ScenarioOutcome::Failed { .. } => None,
        }
    }
}

/// Baseline plus every scenario of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptioneeringStudy {
    pub baseline: AnalysisResult,
    pub scenarios: Vec<ScenarioResult>,
}

impl OptioneeringStudy {
    /// Completed scenario with the lowest total for an indicator
    pub fn best_scenario(&self, indicator: &str) -> Option<&ScenarioResult> {
        self.scenarios
            .iter()
            .filter_map(|s| s.total(indicator).map(|t| (s, t)))
            .fold(None, |best: Option<(&ScenarioResult, f64)>, (s, t)| match best {
                Some((_, b)) if b <= t => best,
                _ => Some((s, t)),
            })
            .map(|(s, _)| s)
    }

    pub fn failed_scenarios(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.scenarios.iter().filter(|s| !s.is_success())
    }

    /// Plain-text comparison table for one indicator
    pub fn generate_report(&self, indicator: &str) -> String {
        let unit = indicators::unit(indicator);
        let mut out = String::new();
        let _ = writeln!(out, "Optioneering: {} [{}]", indicator.to_uppercase(), unit);
        let _ = writeln!(out, "{}", "=".repeat(72));
        let _ = writeln!(out, "{:<40} {:>14} {:>14}", "Baseline", format!("{:.1}", self.baseline.total(indicator)), "");

        for s in &self.scenarios {
            match &s.outcome {
                ScenarioOutcome::Completed { .. } => {
                    let total = s.total(indicator).unwrap_or(0.0);
                    let delta = s.delta(indicator).unwrap_or(0.0);
                    let pct = s
                        .percent_change(indicator)
                        .map(|p| format!(" ({:+.1}%)", p))
                        .unwrap_or_default();
                    let _ = writeln!(out, "{:<40} {:>14.1} {:>+14.1}{}", s.name, total, delta, pct);
                }
                ScenarioOutcome::Failed { error } => {
                    let _ = writeln!(out, "{:<40} FAILED: {}", s.name, error);
                }
            }
        }

        if let Some(best) = self.best_scenario(indicator) {
            let _ = writeln!(out);
            let _ = writeln!(out, "Best option: {}", best.name);
        }
        out
    }
}

// ============================================================================
// Engine
// ============================================================================

/// A scenario ready for evaluation
struct PlannedScenario {
    name: String,
    description: String,
    origin: ScenarioOrigin,
    substitutions: BTreeMap<String, String>,
}

/// Evaluates substitution rules and material comparisons against a
/// baseline mapping.
pub struct OptioneeringEngine<'a, M: BuildingModel + ?Sized, D: DatabaseReader + ?Sized> {
    model: &'a M,
    database: &'a D,
    baseline_mapping: MaterialMapping,
    rules: Vec<SubstitutionRule>,
    comparisons: Vec<MaterialComparison>,
}

impl<'a, M: BuildingModel + ?Sized, D: DatabaseReader + ?Sized> OptioneeringEngine<'a, M, D> {
    pub fn new(model: &'a M, database: &'a D, baseline_mapping: MaterialMapping) -> Self {
        OptioneeringEngine {
            model,
            database,
            baseline_mapping,
            rules: Vec::new(),
            comparisons: Vec::new(),
        }
    }

    pub fn baseline_mapping(&self) -> &MaterialMapping {
        &self.baseline_mapping
    }

    /// Register a rule; scenarios run in registration order
    pub fn add_substitution_rule(&mut self, rule: SubstitutionRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Register a comparison of `material` against each alternative
    pub fn add_material_comparison<S: Into<String>>(
        &mut self,
        material: impl Into<String>,
        alternatives: impl IntoIterator<Item = S>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.comparisons
            .push(MaterialComparison::new(name, material, alternatives));
        self
    }

    /// Register a prepared comparison
    pub fn add_comparison(&mut self, comparison: MaterialComparison) -> &mut Self {
        self.comparisons.push(comparison);
        self
    }

    /// Number of scenarios `run` will produce
    pub fn scenario_count(&self) -> usize {
        self.rules.len()
            + self
                .comparisons
                .iter()
                .map(|c| c.alternatives.len())
                .sum::<usize>()
    }

    /// Evaluate every scenario against a fresh baseline.
    ///
    /// # Errors
    ///
    /// * `LcaError::ModelAccess` / `LcaError::DatabaseUnavailable` - abort the
    ///   whole run; all other errors only fail their scenario
    pub fn run(&self) -> LcaResult<Vec<ScenarioResult>> {
        Ok(self.run_study()?.scenarios)
    }

    /// Like [`run`](Self::run), also returning the baseline analysis
    pub fn run_study(&self) -> LcaResult<OptioneeringStudy> {
        let baseline = run_analysis(self.model, &self.baseline_mapping, self.database)?;
        let planned = self.plan();

        #[cfg(feature = "parallel")]
        let evaluated: Vec<LcaResult<ScenarioResult>> =
            planned.into_par_iter().map(|p| self.evaluate(p, &baseline)).collect();

        #[cfg(not(feature = "parallel"))]
        let evaluated: Vec<LcaResult<ScenarioResult>> =
            planned.into_iter().map(|p| self.evaluate(p, &baseline)).collect();

        let scenarios = evaluated.into_iter().collect::<LcaResult<Vec<_>>>()?;
        Ok(OptioneeringStudy { baseline, scenarios })
    }

    /// Rules first, then comparison alternatives, each in insertion order
    fn plan(&self) -> Vec<PlannedScenario> {
        let mut planned = Vec::with_capacity(self.scenario_count());
        for rule in &self.rules {
            planned.push(PlannedScenario {
                name: rule.name.clone(),
                description: rule.description.clone(),
                origin: ScenarioOrigin::Rule {
                    rule: rule.name.clone(),
                },
                substitutions: rule.substitutions.clone(),
            });
        }
        for comparison in &self.comparisons {
            for alternative in &comparison.alternatives {
                planned.push(PlannedScenario {
                    name: comparison.scenario_name(alternative),
                    description: format!("Replace '{}' with '{}'", comparison.material, alternative),
                    origin: ScenarioOrigin::Comparison {
                        comparison: comparison.name.clone(),
                        alternative: alternative.clone(),
                    },
                    substitutions: BTreeMap::from([(comparison.material.clone(), alternative.clone())]),
                });
            }
        }
        planned
    }

    fn evaluate(&self, planned: PlannedScenario, baseline: &AnalysisResult) -> LcaResult<ScenarioResult> {
        let outcome = match self.analyse(&planned.substitutions) {
            Ok(analysis) => {
                let (deltas, percent_changes) = compare_totals(baseline, &analysis);
                ScenarioOutcome::Completed {
                    analysis: Box::new(analysis),
                    deltas,
                    percent_changes,
                }
            }
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => ScenarioOutcome::Failed { error },
        };

        Ok(ScenarioResult {
            name: planned.name,
            description: planned.description,
            origin: planned.origin,
            substitutions: planned.substitutions,
            outcome,
        })
    }

    fn analyse(&self, substitutions: &BTreeMap<String, String>) -> LcaResult<AnalysisResult> {
        for id in substitutions.values() {
            self.database.get_material_data(id)?;
        }
        let mapping = self.baseline_mapping.with_overrides(substitutions);
        run_analysis(self.model, &mapping, self.database)
    }
}

/// Per-indicator deltas over the union of both result's indicators, plus
/// percent changes where the baseline total is non-zero
fn compare_totals(
    baseline: &AnalysisResult,
    scenario: &AnalysisResult,
) -> (BTreeMap<String, f64>, BTreeMap<String, f64>) {
    let names: BTreeSet<&String> = baseline.totals.keys().chain(scenario.totals.keys()).collect();
    let mut deltas = BTreeMap::new();
    let mut percent = BTreeMap::new();
    for indicator in names {
        let base = baseline.total(indicator);
        let delta = scenario.total(indicator) - base;
        deltas.insert(indicator.clone(), delta);
        if base != 0.0 {
            percent.insert(indicator.clone(), delta / base * 100.0);
        }
    }
    (deltas, percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::kbob::builtin_kbob_database;
    use crate::model::{Element, InMemoryModel};

    fn model() -> InMemoryModel {
        InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete C30/37").with_volume(10.0))
            .with_element(Element::new("w1", "IfcWall").with_direct("Brick").with_volume(2.0))
    }

    fn baseline() -> MaterialMapping {
        [("Concrete C30/37", "KBOB_CONCRETE_C30_37"), ("Brick", "KBOB_BRICK")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_scenario_order_and_names() {
        let model = model();
        let db = builtin_kbob_database();
        let mut engine = OptioneeringEngine::new(&model, &db, baseline());
        engine
            .add_substitution_rule(SubstitutionRule::new("Recycled Concrete").with_substitution("Concrete C30/37", "KBOB_CONCRETE_RC"))
            .add_material_comparison(
                "Concrete C30/37",
                ["KBOB_CONCRETE_C25_30", "KBOB_CONCRETE_C35_45"],
                "Concrete Options",
            );
        assert_eq!(engine.scenario_count(), 3);

        let names: Vec<String> = engine.run().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "Recycled Concrete",
                "Concrete Options: KBOB_CONCRETE_C25_30",
                "Concrete Options: KBOB_CONCRETE_C35_45",
            ]
        );
    }

    #[test]
    fn test_deltas_and_percent() {
        let model = model();
        let db = builtin_kbob_database();
        let mut engine = OptioneeringEngine::new(&model, &db, baseline());
        engine.add_material_comparison("Concrete C30/37", ["KBOB_CONCRETE_C35_45"], "Stronger");
        let study = engine.run_study().unwrap();
        let scenario = &study.scenarios[0];

        let expected = scenario.total(indicators::GWP).unwrap() - study.baseline.total(indicators::GWP);
        assert_eq!(scenario.delta(indicators::GWP), Some(expected));
        assert!(expected > 0.0);
        assert!(scenario.percent_change(indicators::GWP).unwrap() > 0.0);
        assert_eq!(
            scenario.origin,
            ScenarioOrigin::Comparison {
                comparison: "Stronger".to_string(),
                alternative: "KBOB_CONCRETE_C35_45".to_string()
            }
        );
    }

    #[test]
    fn test_missing_replacement_fails_only_that_scenario() {
        let model = model();
        let db = builtin_kbob_database();
        let mut engine = OptioneeringEngine::new(&model, &db, baseline());
        engine
            .add_substitution_rule(SubstitutionRule::new("Bogus").with_substitution("Brick", "KBOB_UNOBTAINIUM"))
            .add_substitution_rule(SubstitutionRule::new("Timber").with_substitution("Concrete C30/37", "KBOB_TIMBER_CLT"));

        let study = engine.run_study().unwrap();
        assert!(!study.scenarios[0].is_success());
        assert_eq!(study.scenarios[0].error().map(|e| e.error_code()), Some("DATABASE_MISS"));
        assert!(study.scenarios[1].is_success());
        assert_eq!(study.failed_scenarios().count(), 1);
    }

    #[test]
    fn test_best_scenario() {
        let model = model();
        let db = builtin_kbob_database();
        let mut engine = OptioneeringEngine::new(&model, &db, baseline());
        engine.add_material_comparison(
            "Concrete C30/37",
            ["KBOB_CONCRETE_C35_45", "KBOB_CONCRETE_RC", "KBOB_CONCRETE_C25_30"],
            "Concrete Options",
        );
        let study = engine.run_study().unwrap();
        let best = study.best_scenario(indicators::GWP).unwrap();
        assert_eq!(best.name, "Concrete Options: KBOB_CONCRETE_RC");

        let report = study.generate_report(indicators::GWP);
        assert!(report.contains("Best option: Concrete Options: KBOB_CONCRETE_RC"));
    }

    #[test]
    fn test_empty_engine() {
        let model = model();
        let db = builtin_kbob_database();
        let engine = OptioneeringEngine::new(&model, &db, baseline());
        let study = engine.run_study().unwrap();
        assert!(study.scenarios.is_empty());
        assert!(study.best_scenario(indicators::GWP).is_none());
    }

    #[test]
    fn test_scenario_json_tags() {
        let model = model();
        let db = builtin_kbob_database();
        let mut engine = OptioneeringEngine::new(&model, &db, baseline());
        engine.add_substitution_rule(SubstitutionRule::new("Bogus").with_substitution("Brick", "NOPE"));
        let scenarios = engine.run().unwrap();
        let json = serde_json::to_string(&scenarios[0]).unwrap();
        assert!(json.contains("\"status\":\"Failed\""));
        assert!(json.contains("\"kind\":\"Rule\""));
    }
}
