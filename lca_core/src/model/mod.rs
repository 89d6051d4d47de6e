//! # Building Model
//!
//! The core never parses IFC itself. It reads a building model through the
//! [`BuildingModel`] trait, which an IFC backend implements on top of its own
//! entity graph. [`InMemoryModel`] is the reference implementation used by
//! tests, the CLI demo and any caller that has already extracted elements.
//!
//! ## Material associations
//!
//! IFC attaches materials to elements in three ways, mirrored by
//! [`MaterialAssociation`]:
//!
//! - **Direct**: a single `IfcMaterial`
//! - **Layered**: an `IfcMaterialLayerSet` (ordered layers with thickness)
//! - **Constituents**: an `IfcMaterialConstituentSet` (named, weighted parts)
//!
//! All components resolve associations through [`resolve_element`], so
//! discovery and analysis always agree on which materials an element holds.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::model::{BuildingModel, Element, InMemoryModel};
//!
//! let model = InMemoryModel::new("IFC4")
//!     .with_element(Element::new("wall-1", "IfcWall").with_direct("Concrete C30/37").with_volume(4.2))
//!     .with_element(Element::new("slab-1", "IfcSlab").with_direct("Concrete C30/37").with_volume(18.0));
//!
//! assert_eq!(model.elements().unwrap().len(), 2);
//! assert_eq!(model.elements_of_type("IfcSlab").unwrap().len(), 1);
//! ```

pub mod resolution;

pub use resolution::{resolve_element, AssociationType, MaterialShare};

use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};
use crate::units::Quantity;

/// IFC schema identifiers the core knows how to read materials from
pub const SUPPORTED_SCHEMAS: [&str; 3] = ["IFC2X3", "IFC4", "IFC4X3"];

/// Read-only access to a building model.
///
/// `Sync` is required so scenario evaluation can share one model across
/// threads.
pub trait BuildingModel: Sync {
    /// Schema/version identifier (e.g. "IFC4")
    fn schema(&self) -> &str;

    /// Whether the backend can resolve material associations at all
    fn has_material_support(&self) -> bool;

    /// All physical elements, in a stable order
    fn elements(&self) -> LcaResult<Vec<&Element>>;

    /// Elements of one type (e.g. "IfcWall"), case-insensitive
    fn elements_of_type(&self, element_type: &str) -> LcaResult<Vec<&Element>> {
        Ok(self
            .elements()?
            .into_iter()
            .filter(|e| e.element_type.eq_ignore_ascii_case(element_type))
            .collect())
    }
}

/// Fail with `ModelAccess` unless the model can be used for LCA.
pub fn ensure_model_access<M: BuildingModel + ?Sized>(model: &M) -> LcaResult<()> {
    let schema = model.schema();
    if !SUPPORTED_SCHEMAS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(schema))
    {
        return Err(LcaError::model_access(
            schema,
            format!("unsupported schema, expected one of {}", SUPPORTED_SCHEMAS.join(", ")),
        ));
    }
    if !model.has_material_support() {
        return Err(LcaError::model_access(
            schema,
            "model backend does not expose material associations",
        ));
    }
    Ok(())
}

// ============================================================================
// Elements
// ============================================================================

/// One layer of a layered construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLayer {
    /// Material name
    pub material: String,
    /// Layer thickness in meters
    pub thickness_m: f64,
}

/// One member of a material constituent set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConstituent {
    /// Constituent name (e.g. "Frame", "Glazing")
    pub name: String,
    /// Material name
    pub material: String,
    /// Share of the element (0-1); IFC makes this optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f64>,
}

/// How an element references its material(s).
///
/// ## JSON Serialization
///
/// ```json
/// { "kind": "Direct", "material": "Concrete C30/37" }
/// { "kind": "Layered", "layers": [ { "material": "Brick", "thickness_m": 0.15 } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MaterialAssociation {
    /// Single material
    Direct { material: String },
    /// Ordered layer set
    Layered { layers: Vec<MaterialLayer> },
    /// Constituent set
    Constituents { constituents: Vec<MaterialConstituent> },
}

/// One physical building component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element identifier (IFC GlobalId)
    pub id: String,

    /// IFC entity type (e.g. "IfcWall", "IfcSlab")
    pub element_type: String,

    /// Material association, if any
    #[serde(default)]
    pub association: Option<MaterialAssociation>,

    /// Quantities from the element's quantity sets
    #[serde(default)]
    pub quantities: Vec<Quantity>,
}

impl Element {
    /// Create an element without materials or quantities
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Element {
            id: id.into(),
            element_type: element_type.into(),
            association: None,
            quantities: Vec::new(),
        }
    }

    /// Associate a single material (builder pattern)
    pub fn with_direct(mut self, material: impl Into<String>) -> Self {
        self.association = Some(MaterialAssociation::Direct {
            material: material.into(),
        });
        self
    }

    /// Associate a layer set given as (material, thickness in m) pairs
    pub fn with_layers<S: Into<String>>(mut self, layers: impl IntoIterator<Item = (S, f64)>) -> Self {
        self.association = Some(MaterialAssociation::Layered {
            layers: layers
                .into_iter()
                .map(|(material, thickness_m)| MaterialLayer {
                    material: material.into(),
                    thickness_m,
                })
                .collect(),
        });
        self
    }

    /// Associate a constituent set given as (name, material, fraction) triples
    pub fn with_constituents<S: Into<String>, T: Into<String>>(
        mut self,
        constituents: impl IntoIterator<Item = (S, T, Option<f64>)>,
    ) -> Self {
        self.association = Some(MaterialAssociation::Constituents {
            constituents: constituents
                .into_iter()
                .map(|(name, material, fraction)| MaterialConstituent {
                    name: name.into(),
                    material: material.into(),
                    fraction,
                })
                .collect(),
        });
        self
    }

    /// Add a quantity (builder pattern)
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantities.push(quantity);
        self
    }

    pub fn with_volume(self, m3: f64) -> Self {
        self.with_quantity(Quantity::volume(m3))
    }

    pub fn with_area(self, m2: f64) -> Self {
        self.with_quantity(Quantity::area(m2))
    }

    pub fn with_length(self, m: f64) -> Self {
        self.with_quantity(Quantity::length(m))
    }

    /// True if the association names at least one material
    pub fn has_material(&self) -> bool {
        match &self.association {
            None => false,
            Some(MaterialAssociation::Direct { material }) => !material.trim().is_empty(),
            Some(MaterialAssociation::Layered { layers }) => {
                layers.iter().any(|l| !l.material.trim().is_empty())
            }
            Some(MaterialAssociation::Constituents { constituents }) => {
                constituents.iter().any(|c| !c.material.trim().is_empty())
            }
        }
    }

    /// True if the element carries at least one positive quantity
    pub fn has_quantities(&self) -> bool {
        self.quantities.iter().any(|q| q.value > 0.0)
    }
}

// ============================================================================
// In-memory model
// ============================================================================

/// Building model held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryModel {
    /// Schema identifier (e.g. "IFC4")
    pub schema: String,

    /// Elements in model order
    pub elements: Vec<Element>,

    /// Set to false to emulate a backend without material support
    #[serde(default = "default_material_support")]
    pub material_support: bool,
}

fn default_material_support() -> bool {
    true
}

impl InMemoryModel {
    /// Create an empty model for a schema
    pub fn new(schema: impl Into<String>) -> Self {
        InMemoryModel {
            schema: schema.into(),
            elements: Vec::new(),
            material_support: true,
        }
    }

    /// Add an element (builder pattern)
    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Add an element
    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Parse a model from its JSON representation
    pub fn from_json(json: &str) -> LcaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl BuildingModel for InMemoryModel {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn has_material_support(&self) -> bool {
        self.material_support
    }

    fn elements(&self) -> LcaResult<Vec<&Element>> {
        Ok(self.elements.iter().collect())
    }
}
