//! Built-in KBOB subset
//!
//! A small selection of materials from the Swiss KBOB "Ökobilanzdaten im
//! Baubereich" list, enough to run analyses and optioneering studies without
//! an external database file. Values are rounded and per kilogram unless the
//! entry says otherwise; load the full data set with
//! [`ImpactDatabase::load_from_json`](super::ImpactDatabase::load_from_json)
//! for project work.

use super::{indicators, DatabaseEntry, ImpactDatabase};
use crate::units::ReferenceUnit;

/// Data set version of the built-in subset
pub const BUILTIN_VERSION: &str = "builtin-kbob-2022";

/// Get a database with common KBOB materials pre-loaded
pub fn builtin_kbob_database() -> ImpactDatabase {
    let mut db = ImpactDatabase::new("KBOB");

    // (id, name, category, density kg/m³, gwp, penre, ubp), all per kg
    let per_kg = [
        ("KBOB_CONCRETE_C25_30", "Concrete C25/30", "Concrete", 2400.0, 0.0900, 0.55, 140.0),
        ("KBOB_CONCRETE_C30_37", "Concrete C30/37", "Concrete", 2400.0, 0.1000, 0.60, 157.0),
        ("KBOB_CONCRETE_C35_45", "Concrete C35/45", "Concrete", 2400.0, 0.1120, 0.66, 170.0),
        ("KBOB_CONCRETE_RC", "Recycled concrete RC-C", "Concrete", 2350.0, 0.0820, 0.52, 135.0),
        ("KBOB_STEEL_REINFORCING", "Reinforcing steel", "Metal", 7850.0, 0.68, 9.2, 2200.0),
        ("KBOB_STEEL_STRUCTURAL", "Structural steel section", "Metal", 7850.0, 0.73, 11.5, 2530.0),
        ("KBOB_ALUMINIUM", "Aluminium sheet", "Metal", 2700.0, 8.6, 140.0, 17000.0),
        ("KBOB_TIMBER_CLT", "Cross-laminated timber CLT", "Timber", 470.0, 0.25, 4.4, 780.0),
        ("KBOB_TIMBER_GLULAM", "Glued laminated timber", "Timber", 460.0, 0.23, 3.9, 690.0),
        ("KBOB_BRICK", "Clay brick", "Masonry", 1100.0, 0.25, 2.8, 420.0),
        ("KBOB_INSULATION_MINERAL_WOOL", "Mineral wool insulation", "Insulation", 40.0, 1.20, 19.0, 1900.0),
        ("KBOB_INSULATION_EPS", "Expanded polystyrene EPS", "Insulation", 20.0, 3.40, 95.0, 4900.0),
        ("KBOB_GYPSUM_BOARD", "Gypsum plasterboard", "Boards", 850.0, 0.29, 4.8, 480.0),
        ("KBOB_PLASTER", "Lime cement plaster", "Plaster", 1800.0, 0.17, 1.6, 220.0),
    ];

    for (id, name, category, density, gwp, penre, ubp) in per_kg {
        db.insert(
            DatabaseEntry::new(id, name, ReferenceUnit::Kilogram)
                .with_category(category)
                .with_density(density)
                .with_factor(indicators::GWP, gwp)
                .with_factor(indicators::PENRE, penre)
                .with_factor(indicators::UBP, ubp),
        );
    }

    // Glazing is listed per m² of pane
    db.insert(
        DatabaseEntry::new("KBOB_GLASS_TRIPLE", "Triple insulating glazing", ReferenceUnit::SquareMeter)
            .with_category("Glass")
            .with_factor(indicators::GWP, 43.0)
            .with_factor(indicators::PENRE, 600.0)
            .with_factor(indicators::UBP, 70_000.0),
    );

    db.version = Some(BUILTIN_VERSION.to_string());
    db
}
