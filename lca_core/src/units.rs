//! # Unit Types
//!
//! Type-safe wrappers for the SI quantities an LCA run handles. Element
//! quantities arrive in canonical units (m³, m², m); impact factors are
//! expressed per reference unit (kg, m³, m² or m). This module converts the
//! former into the latter.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::units::{CubicMeters, KgPerCubicMeter, Kilograms};
//!
//! let volume = CubicMeters(10.0);
//! let mass: Kilograms = volume.to_mass(KgPerCubicMeter(2400.0));
//! assert_eq!(mass.0, 24_000.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::errors::{LcaError, LcaResult};

// ============================================================================
// Quantity Units
// ============================================================================

/// Volume in cubic meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubicMeters(pub f64);

/// Mass in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

/// Density in kilograms per cubic meter
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KgPerCubicMeter(pub f64);

impl CubicMeters {
    /// Convert to mass using a density
    pub fn to_mass(self, density: KgPerCubicMeter) -> Kilograms {
        Kilograms(self.0 * density.0)
    }
}

impl Kilograms {
    /// Convert back to volume using a density
    pub fn to_volume(self, density: KgPerCubicMeter) -> CubicMeters {
        CubicMeters(self.0 / density.0)
    }
}

// ============================================================================
// Quantity Kinds
// ============================================================================

/// Kind of a measured element quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuantityKind {
    Volume,
    Area,
    Length,
}

impl QuantityKind {
    /// Canonical unit symbol
    pub fn unit_symbol(&self) -> &'static str {
        match self {
            QuantityKind::Volume => "m³",
            QuantityKind::Area => "m²",
            QuantityKind::Length => "m",
        }
    }

    /// Lowercase name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            QuantityKind::Volume => "volume",
            QuantityKind::Area => "area",
            QuantityKind::Length => "length",
        }
    }
}

impl std::fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A measured element quantity in its canonical unit.
///
/// ## JSON Example
///
/// ```json
/// { "kind": "Volume", "value": 12.5 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Volume, area or length
    pub kind: QuantityKind,
    /// Magnitude in m³, m² or m
    pub value: f64,
}

impl Quantity {
    pub fn volume(value: f64) -> Self {
        Quantity {
            kind: QuantityKind::Volume,
            value,
        }
    }

    pub fn area(value: f64) -> Self {
        Quantity {
            kind: QuantityKind::Area,
            value,
        }
    }

    pub fn length(value: f64) -> Self {
        Quantity {
            kind: QuantityKind::Length,
            value,
        }
    }

    /// Finite and non-negative
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }

    /// Scale the magnitude (used for layer and constituent shares)
    pub fn scaled(self, factor: f64) -> Self {
        Quantity {
            kind: self.kind,
            value: self.value * factor,
        }
    }
}

/// Find the first valid quantity of a given kind
pub fn find_quantity(quantities: &[Quantity], kind: QuantityKind) -> Option<f64> {
    quantities.iter().find(|q| q.kind == kind && q.is_valid()).map(|q| q.value)
}

// ============================================================================
// Reference Units
// ============================================================================

/// Unit that an impact database entry's factors are expressed per.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceUnit {
    /// Factors per kilogram (the KBOB default for building materials)
    #[default]
    #[serde(rename = "kg")]
    Kilogram,
    /// Factors per cubic meter
    #[serde(rename = "m3")]
    CubicMeter,
    /// Factors per square meter (glazing, membranes, boards)
    #[serde(rename = "m2")]
    SquareMeter,
    /// Factors per running meter (pipes, profiles)
    #[serde(rename = "m")]
    Meter,
}

impl ReferenceUnit {
    /// Element quantity kind needed to feed factors in this unit
    pub fn required_kind(&self) -> QuantityKind {
        match self {
            ReferenceUnit::Kilogram | ReferenceUnit::CubicMeter => QuantityKind::Volume,
            ReferenceUnit::SquareMeter => QuantityKind::Area,
            ReferenceUnit::Meter => QuantityKind::Length,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ReferenceUnit::Kilogram => "kg",
            ReferenceUnit::CubicMeter => "m³",
            ReferenceUnit::SquareMeter => "m²",
            ReferenceUnit::Meter => "m",
        }
    }
}

impl std::fmt::Display for ReferenceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Convert an element's quantities into the amount of reference unit the
/// factors of `material_id` apply to.
///
/// Mass-based factors take the element volume times the entry density.
/// Area and length factors only accept an element quantity of that same
/// kind.
///
/// # Errors
///
/// * `LcaError::UnitConversion` - mass factors, but density is missing or zero
/// * `LcaError::UnitMismatch` - the element has no quantity of the needed kind
/// * `LcaError::InvalidInput` - the quantity of the needed kind is negative or not finite
///
/// # Example
///
/// ```rust
/// use lca_core::units::{to_reference_quantity, Quantity, ReferenceUnit};
///
/// let quantities = [Quantity::volume(10.0), Quantity::area(40.0)];
/// let kg = to_reference_quantity(&quantities, ReferenceUnit::Kilogram, Some(2400.0), "C30/37").unwrap();
/// assert_eq!(kg, 24_000.0);
///
/// let m2 = to_reference_quantity(&quantities, ReferenceUnit::SquareMeter, None, "Glass").unwrap();
/// assert_eq!(m2, 40.0);
/// ```
pub fn to_reference_quantity(
    quantities: &[Quantity],
    unit: ReferenceUnit,
    density: Option<f64>,
    material_id: &str,
) -> LcaResult<f64> {
    let kind = unit.required_kind();
    if let Some(bad) = quantities.iter().find(|q| q.kind == kind && !q.is_valid()) {
        return Err(LcaError::invalid_input(
            format!("{} of {}", kind.name(), material_id),
            bad.value.to_string(),
            "quantity must be finite and non-negative",
        ));
    }
    let value = find_quantity(quantities, kind).ok_or_else(|| {
        let found: Vec<&str> = quantities.iter().map(|q| q.kind.name()).collect();
        let found = if found.is_empty() {
            "no quantities".to_string()
        } else {
            found.join(", ")
        };
        LcaError::unit_mismatch(material_id, unit.symbol(), found)
    })?;

    match unit {
        ReferenceUnit::Kilogram => match density {
            Some(d) if d > 0.0 && d.is_finite() => {
                Ok(CubicMeters(value).to_mass(KgPerCubicMeter(d)).0)
            }
            _ => Err(LcaError::missing_density(material_id)),
        },
        ReferenceUnit::CubicMeter | ReferenceUnit::SquareMeter | ReferenceUnit::Meter => Ok(value),
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }
        }
    };
}

impl_arithmetic!(CubicMeters);
impl_arithmetic!(Kilograms);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_to_mass() {
        let mass = CubicMeters(10.0).to_mass(KgPerCubicMeter(2400.0));
        assert_eq!(mass.0, 24_000.0);
    }

    #[test]
    fn test_mass_volume_roundtrip() {
        let density = KgPerCubicMeter(7850.0);
        let volume = CubicMeters(0.37);
        let back = volume.to_mass(density).to_volume(density);
        assert!((back.0 - volume.0).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let a = Kilograms(10.0);
        let b = Kilograms(4.0);
        assert_eq!((a + b).0, 14.0);
        assert_eq!((a - b).0, 6.0);
        assert_eq!((a * 2.0).value(), 20.0);
        assert_eq!((a / 2.0).value(), 5.0);
    }

    #[test]
    fn test_reference_quantity_per_volume() {
        let q = [Quantity::volume(3.0)];
        let v = to_reference_quantity(&q, ReferenceUnit::CubicMeter, None, "x").unwrap();
        assert_eq!(v, 3.0);
    }

    #[test]
    fn test_reference_quantity_missing_density() {
        let q = [Quantity::volume(3.0)];
        let err = to_reference_quantity(&q, ReferenceUnit::Kilogram, Some(0.0), "x").unwrap_err();
        assert!(matches!(err, LcaError::UnitConversion { .. }));
        let err = to_reference_quantity(&q, ReferenceUnit::Kilogram, None, "x").unwrap_err();
        assert!(matches!(err, LcaError::UnitConversion { .. }));
    }

    #[test]
    fn test_reference_quantity_mismatch() {
        let q = [Quantity::area(12.0)];
        let err = to_reference_quantity(&q, ReferenceUnit::Kilogram, Some(2400.0), "x").unwrap_err();
        match err {
            LcaError::UnitMismatch { expected, found, .. } => {
                assert_eq!(expected, "kg");
                assert_eq!(found, "area");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reference_quantity_rejects_invalid_values() {
        for bad in [f64::NAN, f64::INFINITY, -5.0] {
            let q = [Quantity::volume(bad), Quantity::area(3.0)];
            let err = to_reference_quantity(&q, ReferenceUnit::Kilogram, Some(2400.0), "x").unwrap_err();
            assert!(matches!(err, LcaError::InvalidInput { .. }), "{bad}: {err:?}");
            assert_eq!(find_quantity(&q, QuantityKind::Volume), None);
        }

        // Invalid quantities of another kind do not matter
        let q = [Quantity::volume(2.0), Quantity::area(f64::NAN)];
        assert_eq!(to_reference_quantity(&q, ReferenceUnit::CubicMeter, None, "x").unwrap(), 2.0);
        assert_eq!(to_reference_quantity(&[Quantity::volume(0.0)], ReferenceUnit::CubicMeter, None, "x").unwrap(), 0.0);
    }

    #[test]
    fn test_reference_unit_serialization() {
        let json = serde_json::to_string(&ReferenceUnit::SquareMeter).unwrap();
        assert_eq!(json, "\"m2\"");
        let parsed: ReferenceUnit = serde_json::from_str("\"kg\"").unwrap();
        assert_eq!(parsed, ReferenceUnit::Kilogram);
    }

    #[test]
    fn test_quantity_scaling() {
        let q = Quantity::volume(8.0).scaled(0.25);
        assert_eq!(q.kind, QuantityKind::Volume);
        assert_eq!(q.value, 2.0);
    }
}
