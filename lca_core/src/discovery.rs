//! # Material Discovery
//!
//! Scans a building model and builds the material inventory that mapping
//! and analysis work from, plus two read-only diagnostics on top of the same
//! traversal:
//!
//! - [`discover_materials`] - one [`MaterialRecord`] per distinct material
//! - [`material_summary`] - usage, volume and element types per material
//! - [`validate_model_for_lca`] - material and quantity coverage of the model
//!
//! ## Example
//!
//! ```rust
//! use lca_core::discovery::discover_materials;
//! use lca_core::model::{Element, InMemoryModel};
//!
//! let model = InMemoryModel::new("IFC4")
//!     .with_element(Element::new("s1", "IfcSlab").with_direct("concrete").with_volume(12.0))
//!     .with_element(Element::new("w1", "IfcWall").with_layers([("Brick", 0.2), ("Concrete", 0.1)]));
//!
//! let records = discover_materials(&model).unwrap();
//! let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
//! assert_eq!(names, vec!["Brick", "Concrete", "concrete"]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::LcaResult;
use crate::model::{ensure_model_access, resolve_element, AssociationType, BuildingModel};
use crate::units::{find_quantity, QuantityKind};

/// Coverage below which the validation report warns
const LOW_COVERAGE_WARNING: f64 = 0.8;

/// A distinct material found in the model.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Concrete C30/37",
///   "usage_count": 14,
///   "association_type": "Direct",
///   "element_types": ["IfcColumn", "IfcSlab"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    /// Material name (unique key)
    pub name: String,

    /// Number of elements referencing the material
    pub usage_count: usize,

    /// Association kind of the first element the material was found on
    pub association_type: AssociationType,

    /// Distinct element types using the material, sorted
    pub element_types: Vec<String>,
}

/// Per-material usage summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSummary {
    /// Number of elements referencing the material
    pub elements: usize,

    /// Share-weighted volume across all elements (m³)
    pub total_volume_m3: f64,

    /// Distinct element types, sorted
    pub element_types: Vec<String>,

    /// Number of layered constructions the material is a layer of
    pub layered_constructions: usize,
}

struct RecordBuilder {
    name: String,
    usage_count: usize,
    association_type: AssociationType,
    element_types: BTreeSet<String>,
}

/// Discover every distinct material of the model.
///
/// Usage counts count each element once per material, even when a material
/// occurs in several layers of that element. Records are sorted by
/// case-insensitive name.
///
/// # Errors
///
/// * `LcaError::ModelAccess` - unsupported schema or no material support
pub fn discover_materials<M: BuildingModel + ?Sized>(model: &M) -> LcaResult<Vec<MaterialRecord>> {
    ensure_model_access(model)?;

    let mut builders: BTreeMap<String, RecordBuilder> = BTreeMap::new();
    for element in model.elements()? {
        for share in resolve_element(element) {
            let builder = builders
                .entry(share.material.clone())
                .or_insert_with(|| RecordBuilder {
                    name: share.material.clone(),
                    usage_count: 0,
                    association_type: share.association,
                    element_types: BTreeSet::new(),
                });
            builder.usage_count += 1;
            builder.element_types.insert(element.element_type.clone());
        }
    }

    let mut records: Vec<MaterialRecord> = builders
        .into_values()
        .map(|b| MaterialRecord {
            name: b.name,
            usage_count: b.usage_count,
            association_type: b.association_type,
            element_types: b.element_types.into_iter().collect(),
        })
        .collect();

    records.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(records)
}

/// Summarize material usage across the model, keyed by material name.
///
/// # Errors
///
/// * `LcaError::ModelAccess` - unsupported schema or no material support
pub fn material_summary<M: BuildingModel + ?Sized>(
    model: &M,
) -> LcaResult<BTreeMap<String, MaterialSummary>> {
    ensure_model_access(model)?;

    let mut summaries: BTreeMap<String, (MaterialSummary, BTreeSet<String>)> = BTreeMap::new();
    for element in model.elements()? {
        for share in resolve_element(element) {
            let (summary, types) = summaries.entry(share.material.clone()).or_insert_with(|| {
                (
                    MaterialSummary {
                        elements: 0,
                        total_volume_m3: 0.0,
                        element_types: Vec::new(),
                        layered_constructions: 0,
                    },
                    BTreeSet::new(),
                )
            });
            summary.elements += 1;
            summary.total_volume_m3 += find_quantity(&share.quantities, QuantityKind::Volume).unwrap_or(0.0);
            if share.association == AssociationType::Layered {
                summary.layered_constructions += 1;
            }
            types.insert(element.element_type.clone());
        }
    }

    Ok(summaries
        .into_iter()
        .map(|(name, (mut summary, types))| {
            summary.element_types = types.into_iter().collect();
            (name, summary)
        })
        .collect())
}

// ============================================================================
// Validation
// ============================================================================

/// Read-only diagnostic of how well a model supports an LCA run.
///
/// ## JSON Example
///
/// ```json
/// {
///   "valid": true,
///   "schema": "IFC4",
///   "total_elements": 40,
///   "elements_with_materials": 36,
///   "elements_with_quantities": 40,
///   "material_coverage": 0.9,
///   "quantity_coverage": 1.0,
///   "warnings": ["4 of 40 elements have no material association"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// At least one element carries a material and one carries quantities
    pub valid: bool,

    /// Schema identifier reported by the model
    pub schema: String,

    pub total_elements: usize,
    pub elements_with_materials: usize,
    pub elements_with_quantities: usize,

    /// elements_with_materials / total_elements (0 for an empty model)
    pub material_coverage: f64,

    /// elements_with_quantities / total_elements (0 for an empty model)
    pub quantity_coverage: f64,

    /// Human-readable findings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Elements lacking a material association
    pub fn elements_without_materials(&self) -> usize {
        self.total_elements - self.elements_with_materials
    }
}

/// Check material and quantity coverage of a model.
///
/// # Errors
///
/// * `LcaError::ModelAccess` - unsupported schema or no material support
///
/// # Example
///
/// ```rust
/// use lca_core::discovery::validate_model_for_lca;
/// use lca_core::model::{Element, InMemoryModel};
///
/// let model = InMemoryModel::new("IFC4")
///     .with_element(Element::new("s1", "IfcSlab").with_direct("Concrete").with_volume(12.0))
///     .with_element(Element::new("d1", "IfcDoor").with_area(2.1));
///
/// let report = validate_model_for_lca(&model).unwrap();
/// assert!(report.valid);
/// assert_eq!(report.material_coverage, 0.5);
/// assert!(!report.warnings.is_empty());
/// ```
pub fn validate_model_for_lca<M: BuildingModel + ?Sized>(model: &M) -> LcaResult<ValidationReport> {
    ensure_model_access(model)?;

    let elements = model.elements()?;
    let total_elements = elements.len();
    let elements_with_materials = elements
        .iter()
        .filter(|e| !resolve_element(e).is_empty())
        .count();
    let elements_with_quantities = elements.iter().filter(|e| e.has_quantities()).count();

    let ratio = |n: usize| {
        if total_elements == 0 {
            0.0
        } else {
            n as f64 / total_elements as f64
        }
    };
    let material_coverage = ratio(elements_with_materials);
    let quantity_coverage = ratio(elements_with_quantities);

    let mut warnings = Vec::new();
    if total_elements == 0 {
        warnings.push("Model contains no elements".to_string());
    } else {
        if elements_with_materials < total_elements {
            warnings.push(format!(
                "{} of {} elements have no material association",
                total_elements - elements_with_materials,
                total_elements
            ));
        }
        if elements_with_quantities < total_elements {
            warnings.push(format!(
                "{} of {} elements have no quantities",
                total_elements - elements_with_quantities,
                total_elements
            ));
        }
        if material_coverage < LOW_COVERAGE_WARNING {
            warnings.push(format!(
                "Material coverage {:.0}% is below {:.0}%, results will underestimate impacts",
                material_coverage * 100.0,
                LOW_COVERAGE_WARNING * 100.0
            ));
        }
        if quantity_coverage < LOW_COVERAGE_WARNING {
            warnings.push(format!(
                "Quantity coverage {:.0}% is below {:.0}%, export base quantities from the authoring tool",
                quantity_coverage * 100.0,
                LOW_COVERAGE_WARNING * 100.0
            ));
        }
    }

    Ok(ValidationReport {
        valid: elements_with_materials > 0 && elements_with_quantities > 0,
        schema: model.schema().to_string(),
        total_elements,
        elements_with_materials,
        elements_with_quantities,
        material_coverage,
        quantity_coverage,
        warnings,
    })
}
