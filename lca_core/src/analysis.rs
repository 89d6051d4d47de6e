//! # Analysis Engine
//!
//! Turns a building model, a material mapping and an impact database into
//! per-material and total environmental impacts.
//!
//! For every element the engine resolves its material shares, looks each
//! mapped material up in the database, converts the share-weighted element
//! quantities into the entry's reference unit and multiplies by every
//! indicator factor:
//!
//! ```text
//! impact = reference quantity × factor
//! reference quantity (kg) = volume (m³) × density (kg/m³)
//! ```
//!
//! Data-quality problems never abort a run. Each (element, material) pair
//! that cannot contribute is recorded as a [`SkippedContribution`] with a
//! [`SkipReason`], and counted in [`Coverage`]. Only a model or database
//! that cannot be used at all ends the run with an error.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::analysis::run_analysis;
//! use lca_core::database::{indicators, kbob::builtin_kbob_database};
//! use lca_core::mapping::MaterialMapping;
//! use lca_core::model::{Element, InMemoryModel};
//!
//! let model = InMemoryModel::new("IFC4")
//!     .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete C30/37").with_volume(10.0));
//! let mapping: MaterialMapping = [("Concrete C30/37", "KBOB_CONCRETE_C30_37")].into_iter().collect();
//!
//! let result = run_analysis(&model, &mapping, &builtin_kbob_database()).unwrap();
//! assert!((result.total(indicators::GWP) - 2400.0).abs() < 1e-9);
//! assert_eq!(result.coverage.contributing_elements, 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::database::{indicators, DatabaseReader};
use crate::errors::{LcaError, LcaResult};
use crate::mapping::MaterialMapping;
use crate::model::{ensure_model_access, resolve_element, BuildingModel};
use crate::units::{find_quantity, to_reference_quantity, QuantityKind, ReferenceUnit};

// ============================================================================
// Result types
// ============================================================================

/// Why an (element, material) pair did not contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkipReason {
    /// The element has no material association
    NoMaterial,
    /// The material has no mapping entry
    UnmappedMaterial,
    /// The mapped identifier is not in the database
    DatabaseMiss,
    /// The element carries no quantities
    MissingQuantity,
    /// The quantity the factors need is negative or not finite
    InvalidQuantity,
    /// The element lacks the quantity kind the factors are expressed per
    UnitMismatch,
    /// Mass-based factors, but the entry has no usable density
    MissingDensity,
}

impl SkipReason {
    pub fn display_name(&self) -> &'static str {
        match self {
            SkipReason::NoMaterial => "no material",
            SkipReason::UnmappedMaterial => "unmapped material",
            SkipReason::DatabaseMiss => "database miss",
            SkipReason::MissingQuantity => "missing quantity",
            SkipReason::InvalidQuantity => "invalid quantity",
            SkipReason::UnitMismatch => "unit mismatch",
            SkipReason::MissingDensity => "missing density",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One pair that was left out of the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedContribution {
    /// Element identifier
    pub element_id: String,

    /// Material name (`None` for [`SkipReason::NoMaterial`])
    pub material: Option<String>,

    pub reason: SkipReason,

    /// Human-readable detail
    pub detail: String,
}

/// Aggregated quantities and impacts of one material.
///
/// ## JSON Example
///
/// ```json
/// {
///   "database_id": "KBOB_CONCRETE_C30_37",
///   "database_name": "Concrete C30/37",
///   "reference_unit": "kg",
///   "elements": 2,
///   "volume_m3": 10.0,
///   "area_m2": 0.0,
///   "length_m": 0.0,
///   "reference_quantity": 24000.0,
///   "impacts": { "gwp": 2400.0, "penre": 14400.0, "ubp": 3768000.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialImpact {
    /// Mapped database identifier
    pub database_id: String,

    /// Display name of the database entry
    pub database_name: String,

    /// Unit of `reference_quantity`
    pub reference_unit: ReferenceUnit,

    /// Number of contributing elements
    pub elements: usize,

    /// Share-weighted quantities of the contributing elements
    pub volume_m3: f64,
    pub area_m2: f64,
    pub length_m: f64,

    /// Quantity in the entry's reference unit
    pub reference_quantity: f64,

    /// Impact per indicator
    pub impacts: BTreeMap<String, f64>,
}

impl MaterialImpact {
    /// Impact for one indicator (0 if the entry has no such factor)
    pub fn impact(&self, indicator: &str) -> f64 {
        self.impacts.get(indicator).copied().unwrap_or(0.0)
    }
}

/// Element and contribution counts of a run.
///
/// `total_elements == contributing_elements + skipped_elements`. An element
/// contributes as soon as one of its materials does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub total_elements: usize,
    pub contributing_elements: usize,
    pub skipped_elements: usize,

    /// Skipped (element, material) pairs per reason
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,
}

impl Coverage {
    /// contributing / total (0 for an empty model)
    pub fn ratio(&self) -> f64 {
        if self.total_elements == 0 {
            0.0
        } else {
            self.contributing_elements as f64 / self.total_elements as f64
        }
    }

    /// Skipped pairs for one reason
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped_by_reason.get(&reason).copied().unwrap_or(0)
    }
}

/// Output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Unique run identifier
    pub run_id: Uuid,

    /// When the run was computed
    pub computed_at: DateTime<Utc>,

    /// Name of the database the factors came from
    pub database: String,

    /// Mapping the run used
    pub mapping: MaterialMapping,

    /// Per-material results, keyed by model material name
    pub materials: BTreeMap<String, MaterialImpact>,

    /// Overall impact per indicator
    pub totals: BTreeMap<String, f64>,

    pub coverage: Coverage,

    /// Pairs left out of the totals, in model order
    pub skipped: Vec<SkippedContribution>,

    /// Mapping keys that name no material of the model
    pub stale_mappings: Vec<String>,
}

impl AnalysisResult {
    /// Total for one indicator (0 if no material has that factor)
    pub fn total(&self, indicator: &str) -> f64 {
        self.totals.get(indicator).copied().unwrap_or(0.0)
    }

    /// Materials ordered by descending impact for an indicator
    pub fn ranked_materials(&self, indicator: &str) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .materials
            .iter()
            .map(|(name, m)| (name.as_str(), m.impact(indicator)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Plain-text report of totals, the heaviest materials and coverage
    pub fn generate_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "LCA Analysis Summary ({})", self.database);
        let _ = writeln!(out, "{}", "=".repeat(40));

        for (indicator, total) in &self.totals {
            let _ = writeln!(
                out,
                "Total {:<6} {:>14.1} {}",
                indicator.to_uppercase(),
                total,
                indicators::unit(indicator)
            );
        }

        let ranked = self.ranked_materials(indicators::GWP);
        if !ranked.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Materials by GWP:");
            let total = self.total(indicators::GWP);
            for (name, gwp) in ranked {
                let pct = if total != 0.0 { gwp / total * 100.0 } else { 0.0 };
                let _ = writeln!(out, "  {:<32} {:>12.1} kg CO2-eq ({:>5.1}%)", name, gwp, pct);
            }
        }

        let c = &self.coverage;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Coverage: {} of {} elements contribute ({:.0}%)",
            c.contributing_elements,
            c.total_elements,
            c.ratio() * 100.0
        );
        for (reason, count) in &c.skipped_by_reason {
            let _ = writeln!(out, "  skipped ({}): {}", reason, count);
        }
        if !self.stale_mappings.is_empty() {
            let _ = writeln!(out, "Stale mappings: {}", self.stale_mappings.join(", "));
        }
        out
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Run an LCA analysis.
///
/// # Errors
///
/// * `LcaError::ModelAccess` - the model cannot be used for LCA
/// * `LcaError::DatabaseUnavailable` - the database cannot be queried
pub fn run_analysis<M, D>(model: &M, mapping: &MaterialMapping, database: &D) -> LcaResult<AnalysisResult>
where
    M: BuildingModel + ?Sized,
    D: DatabaseReader + ?Sized,
{
    ensure_model_access(model)?;

    let mut materials: BTreeMap<String, MaterialImpact> = BTreeMap::new();
    let mut coverage = Coverage::default();
    let mut skipped = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    let elements = model.elements()?;
    coverage.total_elements = elements.len();

    for element in elements {
        let shares = resolve_element(element);
        if shares.is_empty() {
            skipped.push(SkippedContribution {
                element_id: element.id.clone(),
                material: None,
                reason: SkipReason::NoMaterial,
                detail: format!("{} has no material association", element.element_type),
            });
            coverage.skipped_elements += 1;
            continue;
        }

        let mut contributed = false;
        for share in &shares {
            seen.insert(share.material.clone());
            let skip = |reason: SkipReason, detail: String| SkippedContribution {
                element_id: element.id.clone(),
                material: Some(share.material.clone()),
                reason,
                detail,
            };

            let Some(database_id) = mapping.get(&share.material) else {
                skipped.push(skip(SkipReason::UnmappedMaterial, "material is not mapped".to_string()));
                continue;
            };

            let Some(entry) = database.lookup(database_id)? else {
                skipped.push(skip(
                    SkipReason::DatabaseMiss,
                    LcaError::database_miss(database_id).to_string(),
                ));
                continue;
            };

            if !element.has_quantities() {
                skipped.push(skip(SkipReason::MissingQuantity, "element has no quantities".to_string()));
                continue;
            }

            let reference_quantity =
                match to_reference_quantity(&share.quantities, entry.unit, entry.density_kg_m3, &entry.id) {
                    Ok(q) => q,
                    Err(e @ LcaError::InvalidInput { .. }) => {
                        skipped.push(skip(SkipReason::InvalidQuantity, e.to_string()));
                        continue;
                    }
                    Err(e @ LcaError::UnitMismatch { .. }) => {
                        skipped.push(skip(SkipReason::UnitMismatch, e.to_string()));
                        continue;
                    }
                    Err(e @ LcaError::UnitConversion { .. }) => {
                        skipped.push(skip(SkipReason::MissingDensity, e.to_string()));
                        continue;
                    }
                    Err(e) => return Err(e),
                };

            let impact = materials
                .entry(share.material.clone())
                .or_insert_with(|| MaterialImpact {
                    database_id: entry.id.clone(),
                    database_name: entry.name.clone(),
                    reference_unit: entry.unit,
                    elements: 0,
                    volume_m3: 0.0,
                    area_m2: 0.0,
                    length_m: 0.0,
                    reference_quantity: 0.0,
                    impacts: BTreeMap::new(),
                });
            impact.elements += 1;
            impact.volume_m3 += find_quantity(&share.quantities, QuantityKind::Volume).unwrap_or(0.0);
            impact.area_m2 += find_quantity(&share.quantities, QuantityKind::Area).unwrap_or(0.0);
            impact.length_m += find_quantity(&share.quantities, QuantityKind::Length).unwrap_or(0.0);
            impact.reference_quantity += reference_quantity;
            for (indicator, factor) in &entry.factors {
                *impact.impacts.entry(indicator.clone()).or_insert(0.0) += reference_quantity * factor;
            }
            contributed = true;
        }

        if contributed {
            coverage.contributing_elements += 1;
        } else {
            coverage.skipped_elements += 1;
        }
    }

    for s in &skipped {
        *coverage.skipped_by_reason.entry(s.reason).or_insert(0) += 1;
    }

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for impact in materials.values() {
        for (indicator, value) in &impact.impacts {
            *totals.entry(indicator.clone()).or_insert(0.0) += value;
        }
    }

    let stale_mappings = mapping
        .iter()
        .map(|(material, _)| material)
        .filter(|m| !seen.contains(*m))
        .map(str::to_string)
        .collect();

    Ok(AnalysisResult {
        run_id: Uuid::new_v4(),
        computed_at: Utc::now(),
        database: database.name().to_string(),
        mapping: mapping.clone(),
        materials,
        totals,
        coverage,
        skipped,
        stale_mappings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseEntry, ImpactDatabase};
    use crate::model::{Element, InMemoryModel};

    fn test_db() -> ImpactDatabase {
        ImpactDatabase::new("Test")
            .with_entry(
                DatabaseEntry::new("CONCRETE", "Concrete", ReferenceUnit::Kilogram)
                    .with_density(2400.0)
                    .with_factor(indicators::GWP, 0.1),
            )
            .with_entry(
                DatabaseEntry::new("BRICK", "Brick", ReferenceUnit::Kilogram)
                    .with_density(1000.0)
                    .with_factor(indicators::GWP, 0.2),
            )
            .with_entry(
                DatabaseEntry::new("GLASS", "Glass", ReferenceUnit::SquareMeter).with_factor(indicators::GWP, 40.0),
            )
            .with_entry(DatabaseEntry::new("NODENSITY", "Mystery", ReferenceUnit::Kilogram).with_factor(indicators::GWP, 1.0))
    }

    fn mapping() -> MaterialMapping {
        [("Concrete", "CONCRETE"), ("Brick", "BRICK"), ("Glass", "GLASS")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_single_slab() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(10.0));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();

        let concrete = &result.materials["Concrete"];
        assert_eq!(concrete.reference_quantity, 24_000.0);
        assert!((concrete.impact(indicators::GWP) - 2400.0).abs() < 1e-9);
        assert!((result.total(indicators::GWP) - 2400.0).abs() < 1e-9);
        assert_eq!(result.coverage.total_elements, 1);
        assert_eq!(result.coverage.contributing_elements, 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_layered_wall_shares() {
        // 0.25 m wall: 0.2 m concrete + 0.05 m brick, 10 m³
        let model = InMemoryModel::new("IFC4").with_element(
            Element::new("w1", "IfcWall")
                .with_layers([("Concrete", 0.2), ("Brick", 0.05)])
                .with_volume(10.0),
        );
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();

        assert!((result.materials["Concrete"].volume_m3 - 8.0).abs() < 1e-9);
        assert!((result.materials["Brick"].volume_m3 - 2.0).abs() < 1e-9);
        // 8 × 2400 × 0.1 + 2 × 1000 × 0.2
        assert!((result.total(indicators::GWP) - 2320.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_based_factor() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("win", "IfcWindow").with_direct("Glass").with_area(2.5));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();
        assert_eq!(result.materials["Glass"].reference_unit, ReferenceUnit::SquareMeter);
        assert!((result.total(indicators::GWP) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_skip_reasons() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("a", "IfcDoor").with_area(2.0))
            .with_element(Element::new("b", "IfcWall").with_direct("Timber").with_volume(1.0))
            .with_element(Element::new("c", "IfcWall").with_direct("Stone").with_volume(1.0))
            .with_element(Element::new("d", "IfcSlab").with_direct("Concrete"))
            .with_element(Element::new("e", "IfcWindow").with_direct("Glass").with_volume(0.1))
            .with_element(Element::new("f", "IfcWall").with_direct("Mystery").with_volume(1.0));
        let mut map = mapping();
        map.insert("Stone", "NOPE");
        map.insert("Mystery", "NODENSITY");

        let result = run_analysis(&model, &map, &test_db()).unwrap();
        let reasons: Vec<SkipReason> = result.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::NoMaterial,
                SkipReason::UnmappedMaterial,
                SkipReason::DatabaseMiss,
                SkipReason::MissingQuantity,
                SkipReason::UnitMismatch,
                SkipReason::MissingDensity,
            ]
        );
        assert_eq!(result.coverage.skipped_elements, 6);
        assert_eq!(result.coverage.contributing_elements, 0);
        assert_eq!(result.coverage.skipped(SkipReason::UnitMismatch), 1);
        assert!(result.materials.is_empty());
        assert_eq!(result.total(indicators::GWP), 0.0);
    }

    #[test]
    fn test_invalid_quantities_skipped() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(10.0))
            .with_element(Element::new("s2", "IfcSlab").with_direct("Concrete").with_volume(f64::NAN).with_area(3.0))
            .with_element(Element::new("s3", "IfcSlab").with_direct("Concrete").with_volume(-5.0).with_area(3.0));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();

        let gwp = result.total(indicators::GWP);
        assert!(gwp.is_finite());
        assert!((gwp - 2400.0).abs() < 1e-9);
        assert_eq!(result.coverage.contributing_elements, 1);
        assert_eq!(result.coverage.skipped_elements, 2);
        assert_eq!(result.coverage.skipped(SkipReason::InvalidQuantity), 2);
        let ids: Vec<&str> = result.skipped.iter().map(|s| s.element_id.as_str()).collect();
        assert_eq!(ids, ["s2", "s3"]);
        assert_eq!(result.materials["Concrete"].elements, 1);
        assert!((result.materials["Concrete"].volume_m3 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_quantity_of_unused_kind_ignored() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(10.0).with_area(f64::NAN));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();
        assert!((result.total(indicators::GWP) - 2400.0).abs() < 1e-9);
        assert_eq!(result.materials["Concrete"].area_m2, 0.0);
    }

    #[test]
    fn test_partial_element_still_contributes() {
        let model = InMemoryModel::new("IFC4").with_element(
            Element::new("w1", "IfcWall")
                .with_layers([("Concrete", 0.2), ("Render", 0.02)])
                .with_volume(1.0),
        );
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();
        assert_eq!(result.coverage.contributing_elements, 1);
        assert_eq!(result.coverage.skipped_elements, 0);
        assert_eq!(result.coverage.skipped(SkipReason::UnmappedMaterial), 1);
    }

    #[test]
    fn test_stale_mappings_reported() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(1.0));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();
        assert_eq!(result.stale_mappings, vec!["Brick".to_string(), "Glass".to_string()]);
    }

    #[test]
    fn test_rejects_unsupported_model() {
        let model = InMemoryModel::new("CIS/2");
        let err = run_analysis(&model, &mapping(), &test_db()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_summary_text() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(10.0))
            .with_element(Element::new("d1", "IfcDoor"));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();
        let text = result.generate_summary();
        assert!(text.contains("LCA Analysis Summary (Test)"));
        assert!(text.contains("Concrete"));
        assert!(text.contains("1 of 2 elements"));
        assert!(text.contains("no material"));
    }

    #[test]
    fn test_result_json_roundtrip() {
        let model = InMemoryModel::new("IFC4")
            .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(10.0))
            .with_element(Element::new("d1", "IfcDoor"));
        let result = run_analysis(&model, &mapping(), &test_db()).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"NoMaterial\":1"));
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
