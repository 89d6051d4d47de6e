//! # IfcLCA CLI
//!
//! Command line driver for the `lca_core` pipeline: validation, material
//! discovery, automatic mapping, analysis and optioneering.
//!
//! ```text
//! lca_cli [--model model.json] [--database kbob.json] [--save study.lca] [--json]
//! ```
//!
//! Without `--model` a small demo building is analysed. Without
//! `--database` the built-in KBOB subset is used.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lca_core::discovery::ValidationReport;
use lca_core::file_io::save_project;
use lca_core::mapping::explain_matches;
use lca_core::optioneering::{MaterialComparison, OptioneeringStudy, SubstitutionRule};
use lca_core::prelude::*;

/// Run validation, mapping, analysis and optioneering on a building model.
#[derive(Debug, Parser)]
#[command(name = "lca_cli", about = "Building life cycle assessment and optioneering")]
struct Args {
    /// Building model JSON; the demo building is used when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Impact database JSON; the built-in KBOB subset is used when omitted.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Save the project file to this path.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print the study as JSON after the text report.
    #[arg(long)]
    json: bool,
}

/// Small office building with every association kind and a few data gaps
fn demo_model() -> InMemoryModel {
    InMemoryModel::new("IFC4")
        .with_element(Element::new("2O2Fr$t4X7Zf8NOew3FLOH", "IfcSlab").with_direct("Concrete C30/37").with_volume(86.4))
        .with_element(Element::new("1hOSvn6df7F8_7GcBWlRGQ", "IfcSlab").with_direct("Concrete C30/37").with_volume(86.4))
        .with_element(Element::new("3cUkl32yn9qRSPvBJVyWYp", "IfcColumn").with_direct("Concrete C30/37").with_volume(1.62))
        .with_element(Element::new("0DWgwt6o1FOx7466fPk$jl", "IfcColumn").with_direct("Concrete C30/37").with_volume(1.62))
        .with_element(
            Element::new("2XQ$n5SLP5MBLyL442paFx", "IfcReinforcingBar").with_direct("Steel Reinforcement").with_volume(0.9),
        )
        .with_element(
            Element::new("1Oms875aH3Wg$9l65H2ZGw", "IfcWall")
                .with_layers([("Verputz", 0.015), ("Ziegel", 0.175), ("Mineral Wool", 0.16), ("Verputz", 0.01)])
                .with_volume(14.4)
                .with_area(40.0),
        )
        .with_element(
            Element::new("0JfbPZ2Wz4iOS0Cj1CrIdT", "IfcWall")
                .with_layers([("Gypsum plasterboard", 0.025), ("Mineral Wool", 0.05), ("Gypsum plasterboard", 0.025)])
                .with_volume(2.5)
                .with_area(25.0),
        )
        .with_element(
            Element::new("3vB2YO$MX4xv5uCqZZG05x", "IfcWindow")
                .with_constituents([("Frame", "Aluminum", Some(0.15)), ("Glazing", "Verglasung", Some(0.85))])
                .with_area(3.6),
        )
        .with_element(Element::new("1kTvXnbbzCWw8lcMd1dR4o", "IfcDoor").with_area(2.1))
}

fn print_validation(report: &ValidationReport) {
    println!("Model validation ({})", report.schema);
    println!("  Elements:              {}", report.total_elements);
    println!("  With materials:        {} ({:.0}%)", report.elements_with_materials, report.material_coverage * 100.0);
    println!("  With quantities:       {} ({:.0}%)", report.elements_with_quantities, report.quantity_coverage * 100.0);
    for warning in &report.warnings {
        println!("  ! {}", warning);
    }
    println!();
}

fn print_study(study: &OptioneeringStudy) {
    println!("{}", study.baseline.generate_summary());
    for indicator in indicators::ALL {
        println!("{}", study.generate_report(indicator));
    }
}

fn run(args: &Args) -> LcaResult<()> {
    let model = match &args.model {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| LcaError::file_error("read", path.display().to_string(), e.to_string()))?;
            InMemoryModel::from_json(&json)?
        }
        None => demo_model(),
    };
    let db = match &args.database {
        Some(path) => ImpactDatabase::load_from_json(path)?,
        None => builtin_kbob_database(),
    };

    let report = validate_model_for_lca(&model)?;
    print_validation(&report);
    if !report.valid {
        return Err(LcaError::invalid_input("model", report.schema, "model has no usable materials or quantities"));
    }

    let materials = discover_materials(&model)?;
    let mut project = LcaProject::new("IfcLCA demo", "lca_cli");
    project.settings.database = db.name().to_string();

    println!("Materials ({}):", materials.len());
    for decision in explain_matches(&materials, &db, &project.settings.mapper)? {
        match (&decision.database_id, &decision.matcher) {
            (Some(id), Some(matcher)) => println!("  {:<28} -> {} [{}]", decision.material, id, matcher),
            _ => println!("  {:<28} -> (unmapped)", decision.material),
        }
    }
    println!();

    project.apply_auto_mapping(&materials, &db)?;
    if project.mapping.insert_if_absent("Steel Reinforcement", "KBOB_STEEL_REINFORCING") {
        println!("Manual mapping: Steel Reinforcement -> KBOB_STEEL_REINFORCING");
        println!();
    }

    project.add_substitution_rule(
        SubstitutionRule::new("Recycled Concrete")
            .with_description("Use recycled concrete RC-C for all C30/37 members")
            .with_substitution("Concrete C30/37", "KBOB_CONCRETE_RC"),
    );
    project.add_substitution_rule(
        SubstitutionRule::new("Timber Structure")
            .with_description("Replace concrete slabs and columns with CLT")
            .with_substitution("Concrete C30/37", "KBOB_TIMBER_CLT"),
    );
    project.add_comparison(MaterialComparison::new(
        "Concrete Options",
        "Concrete C30/37",
        ["KBOB_CONCRETE_C25_30", "KBOB_CONCRETE_RC", "KBOB_CONCRETE_C35_45"],
    ));

    let study = project.optioneering(&model, &db).run_study()?;
    print_study(&study);

    if let Some(path) = &args.save {
        save_project(&project, path)?;
        println!("Project saved to {}", path.display());
    }

    if args.json {
        println!("JSON Output:");
        println!("{}", serde_json::to_string_pretty(&study)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    println!("IfcLCA - Building Life Cycle Assessment");
    println!("=======================================");
    println!();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_with_separate_and_inline_values() {
        let args = Args::try_parse_from(["lca_cli", "--model=office.json", "--database", "kbob.json", "--json"]).unwrap();
        assert_eq!(args.model, Some(PathBuf::from("office.json")));
        assert_eq!(args.database, Some(PathBuf::from("kbob.json")));
        assert_eq!(args.save, None);
        assert!(args.json);
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["lca_cli"]).unwrap();
        assert!(args.model.is_none());
        assert!(args.database.is_none());
        assert!(!args.json);
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let err = Args::try_parse_from(["lca_cli", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_missing_value_rejected() {
        let err = Args::try_parse_from(["lca_cli", "--model"]).unwrap_err();
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_demo_model_is_valid() {
        let report = validate_model_for_lca(&demo_model()).unwrap();
        assert!(report.valid);
    }
}
