//! Association resolution shared by discovery, validation and analysis.
//!
//! Every association kind is flattened into a list of [`MaterialShare`]s:
//! one entry per distinct material of the element, with the fraction of the
//! element it accounts for and the element quantities scaled by that
//! fraction. Shares of one element always sum to 1.

use serde::{Deserialize, Serialize};

use super::{Element, MaterialAssociation};
use crate::units::Quantity;

/// How a material was attached to the element it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationType {
    /// Single direct material
    Direct,
    /// Layer of a layered construction
    Layered,
    /// Member of a constituent set
    Constituent,
}

impl AssociationType {
    pub fn display_name(&self) -> &'static str {
        match self {
            AssociationType::Direct => "direct",
            AssociationType::Layered => "layered",
            AssociationType::Constituent => "constituent",
        }
    }
}

impl std::fmt::Display for AssociationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One material's part of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialShare {
    /// Material name as written in the model
    pub material: String,
    /// Fraction of the element (0-1)
    pub share: f64,
    /// Association kind the material came from
    pub association: AssociationType,
    /// Element quantities multiplied by `share`
    pub quantities: Vec<Quantity>,
}

/// Flatten an element's material association into weighted shares.
///
/// - Direct: one share of 1.0
/// - Layered: thickness / total thickness (equal split if the total is zero)
/// - Constituents: fraction / sum of fractions (equal split if any fraction
///   is missing or the sum is zero)
///
/// Blank material names are ignored. A material appearing several times in
/// one element is merged into a single share, in first-occurrence order.
///
/// # Example
///
/// ```rust
/// use lca_core::model::{resolve_element, Element};
///
/// let wall = Element::new("w1", "IfcWall")
///     .with_layers([("Brick", 0.15), ("Mineral Wool", 0.05)])
///     .with_volume(8.0);
///
/// let shares = resolve_element(&wall);
/// assert_eq!(shares.len(), 2);
/// assert!((shares[0].share - 0.75).abs() < 1e-12);
/// assert!((shares[0].quantities[0].value - 6.0).abs() < 1e-12);
/// ```
pub fn resolve_element(element: &Element) -> Vec<MaterialShare> {
    let weighted: Vec<(&str, f64)> = match &element.association {
        None => Vec::new(),
        Some(MaterialAssociation::Direct { material }) => {
            if material.trim().is_empty() {
                Vec::new()
            } else {
                vec![(material.as_str(), 1.0)]
            }
        }
        Some(MaterialAssociation::Layered { layers }) => {
            let layers: Vec<(&str, f64)> = layers
                .iter()
                .filter(|l| !l.material.trim().is_empty())
                .map(|l| (l.material.as_str(), sanitize_weight(l.thickness_m)))
                .collect();
            normalize(layers)
        }
        Some(MaterialAssociation::Constituents { constituents }) => {
            let members: Vec<(&str, Option<f64>)> = constituents
                .iter()
                .filter(|c| !c.material.trim().is_empty())
                .map(|c| (c.material.as_str(), c.fraction))
                .collect();
            if members.iter().all(|(_, f)| f.is_some()) {
                normalize(
                    members
                        .into_iter()
                        .map(|(m, f)| (m, sanitize_weight(f.unwrap_or(0.0))))
                        .collect(),
                )
            } else {
                normalize(members.into_iter().map(|(m, _)| (m, 0.0)).collect())
            }
        }
    };

    let association = match &element.association {
        Some(MaterialAssociation::Layered { .. }) => AssociationType::Layered,
        Some(MaterialAssociation::Constituents { .. }) => AssociationType::Constituent,
        _ => AssociationType::Direct,
    };

    let mut shares: Vec<MaterialShare> = Vec::with_capacity(weighted.len());
    for (material, share) in weighted {
        match shares.iter_mut().find(|s| s.material == material) {
            Some(existing) => existing.share += share,
            None => shares.push(MaterialShare {
                material: material.to_string(),
                share,
                association,
                quantities: Vec::new(),
            }),
        }
    }

    for share in &mut shares {
        share.quantities = element
            .quantities
            .iter()
            .map(|q| q.scaled(share.share))
            .collect();
    }

    shares
}

/// Negative or non-finite weights count as zero
fn sanitize_weight(w: f64) -> f64 {
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

/// Divide weights by their sum; equal split when the sum is zero
fn normalize(weights: Vec<(&str, f64)>) -> Vec<(&str, f64)> {
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    let count = weights.len() as f64;
    weights
        .into_iter()
        .map(|(m, w)| {
            if total > 0.0 {
                (m, w / total)
            } else {
                (m, 1.0 / count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share_sum(shares: &[MaterialShare]) -> f64 {
        shares.iter().map(|s| s.share).sum()
    }

    #[test]
    fn test_direct_share() {
        let e = Element::new("b1", "IfcBeam").with_direct("Steel").with_volume(0.4);
        let shares = resolve_element(&e);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].share, 1.0);
        assert_eq!(shares[0].association, AssociationType::Direct);
        assert_eq!(shares[0].quantities[0].value, 0.4);
    }

    #[test]
    fn test_no_association() {
        let e = Element::new("d1", "IfcDoor").with_area(2.0);
        assert!(resolve_element(&e).is_empty());
    }

    #[test]
    fn test_blank_direct_material_ignored() {
        let e = Element::new("d1", "IfcDoor").with_direct("  ");
        assert!(resolve_element(&e).is_empty());
    }

    #[test]
    fn test_layers_by_thickness() {
        let e = Element::new("w1", "IfcWall")
            .with_layers([("Plaster", 0.02), ("Brick", 0.18), ("Plaster", 0.02), ("EPS", 0.18)])
            .with_volume(10.0)
            .with_area(25.0);
        let shares = resolve_element(&e);

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].material, "Plaster");
        assert!((shares[0].share - 0.1).abs() < 1e-12);
        assert!((shares[1].share - 0.45).abs() < 1e-12);
        assert!((share_sum(&shares) - 1.0).abs() < 1e-12);
        assert!((shares[0].quantities[1].value - 2.5).abs() < 1e-12);
        assert!(shares.iter().all(|s| s.association == AssociationType::Layered));
    }

    #[test]
    fn test_zero_thickness_layers_split_equally() {
        let e = Element::new("w1", "IfcWall")
            .with_layers([("A", 0.0), ("B", 0.0)])
            .with_volume(4.0);
        let shares = resolve_element(&e);
        assert_eq!(shares[0].share, 0.5);
        assert_eq!(shares[1].quantities[0].value, 2.0);
    }

    #[test]
    fn test_constituent_fractions_normalized() {
        let e = Element::new("win", "IfcWindow")
            .with_constituents([("Frame", "Aluminium", Some(1.0)), ("Glazing", "Glass", Some(3.0))])
            .with_area(2.0);
        let shares = resolve_element(&e);
        assert!((shares[0].share - 0.25).abs() < 1e-12);
        assert!((shares[1].share - 0.75).abs() < 1e-12);
        assert_eq!(shares[0].association, AssociationType::Constituent);
    }

    #[test]
    fn test_constituent_missing_fraction_splits_equally() {
        let e = Element::new("win", "IfcWindow")
            .with_constituents([("Frame", "Timber", Some(0.2)), ("Glazing", "Glass", None)]);
        let shares = resolve_element(&e);
        assert_eq!(shares[0].share, 0.5);
        assert_eq!(shares[1].share, 0.5);
    }
}
