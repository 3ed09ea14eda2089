//! # is456 CLI
//!
//! Command-line front end for the IS 456 beam design engine.
//!
//! ```text
//! is456 design beam.json            # design reinforcement
//! is456 check beam.json             # verify supplied reinforcement
//! is456 optimize beam.json          # cheapest compliant bars
//! is456 smart beam.json             # design + cost + sensitivity report
//! is456 new-project job.is456.json  # empty project file
//! is456 batch job.is456.json        # design every beam, in parallel
//! ```
//!
//! Inputs are JSON (`-` reads stdin). `--settings file.toml` overrides the
//! default design settings; `--json` prints machine output only.
//!
//! Exit status: 0 when everything passes, 1 when a design does not comply,
//! 2 on errors.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use is456_core::api::{BeamCheckInput, BeamDesignInput, BeamDesignResult, Designer};
use is456_core::calculations::compliance::ComplianceSummary;
use is456_core::calculations::optimizer::OptimalDesign;
use is456_core::errors::{ApiError, CalcError};
use is456_core::file_io::{load_project_with_lock_check, load_settings, save_project, FileLock};
use is456_core::project::Project;
use is456_core::settings::DesignSettings;
use is456_core::smart::SmartReport;

#[derive(Parser)]
#[command(name = "is456")]
#[command(version, about = "IS 456 reinforced-concrete beam design")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Design settings TOML overriding the defaults
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Print JSON only
    #[arg(long, global = true)]
    json: bool,
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Design reinforcement for one beam
    Design {
        /// Beam JSON (`-` for stdin)
        input: PathBuf,
    },
    /// Check reinforcement supplied in the input's `provided` block
    Check {
        /// Beam JSON with `provided` (`-` for stdin)
        input: PathBuf,
    },
    /// Find the cheapest compliant tension bars
    Optimize {
        /// Beam JSON (`-` for stdin)
        input: PathBuf,
    },
    /// Design, cost, sensitivity and constructability report
    Smart {
        /// Beam JSON (`-` for stdin)
        input: PathBuf,
    },
    /// Create an empty project file
    NewProject {
        /// Project file to create
        output: PathBuf,
        #[arg(long, default_value = "")]
        engineer: String,
        #[arg(long, default_value = "")]
        job_id: String,
        #[arg(long, default_value = "")]
        client: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Design every beam in a project file
    Batch {
        /// Project file
        project: PathBuf,
    },
}

/// Log filter from RUST_LOG, else from the verbosity flag
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) => {
            if cli.json {
                match serde_json::to_string_pretty(&error) {
                    Ok(json) => println!("{json}"),
                    Err(_) => eprintln!("{error}"),
                }
            } else {
                eprintln!("error [{}]: {}", error.code, error.message);
                eprintln!("  clause:     {}", error.clause);
                eprintln!("  suggestion: {}", error.suggestion);
            }
            ExitCode::from(2)
        }
    }
}

/// Runs the command; `Ok(false)` means a design did not comply
fn run(cli: &Cli) -> Result<bool, ApiError> {
    match &cli.command {
        Commands::Design { input } => {
            let beam: BeamDesignInput = read_json(input)?;
            let result = designer(cli, None)?.design(&beam)?;
            emit(cli, &result, print_design)?;
            Ok(result.passed)
        }
        Commands::Check { input } => {
            let beam: BeamCheckInput = read_json(input)?;
            let result = designer(cli, None)?.check(&beam)?;
            emit(cli, &result, print_design)?;
            Ok(result.passed)
        }
        Commands::Optimize { input } => {
            let beam: BeamDesignInput = read_json(input)?;
            let optimal = designer(cli, None)?.optimize(&beam)?;
            emit(cli, &optimal, print_optimal)?;
            Ok(optimal.feasible)
        }
        Commands::Smart { input } => {
            let beam: BeamDesignInput = read_json(input)?;
            let report = designer(cli, None)?.smart(&beam)?;
            emit(cli, &report, print_smart)?;
            Ok(report.design.passed)
        }
        Commands::NewProject {
            output,
            engineer,
            job_id,
            client,
            force,
        } => {
            if output.exists() && !force {
                return Err(CalcError::file_error(
                    "create",
                    output.display().to_string(),
                    "File exists; pass --force to overwrite",
                )
                .into());
            }
            let mut project = Project::new(engineer.as_str(), job_id.as_str(), client.as_str());
            if let Some(path) = &cli.settings {
                project.settings = load_settings(path)?;
            }
            let _lock = FileLock::acquire(output, user_id())?;
            save_project(&project, output)?;
            if !cli.json {
                println!("Created {}", output.display());
            }
            Ok(true)
        }
        Commands::Batch { project } => batch(cli, project),
    }
}

fn user_id() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn designer(
    cli: &Cli,
    project_settings: Option<&DesignSettings>,
) -> Result<Designer<'static>, ApiError> {
    let settings = match (&cli.settings, project_settings) {
        (Some(path), _) => load_settings(path)?,
        (None, Some(settings)) => settings.clone(),
        (None, None) => DesignSettings::default(),
    };
    Designer::standard(settings)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ApiError> {
    let mut contents = String::new();
    let display = path.display().to_string();
    let read = if display == "-" {
        std::io::stdin().read_to_string(&mut contents).map(|_| ())
    } else {
        std::fs::read_to_string(path).map(|text| contents = text)
    };
    read.map_err(|e| CalcError::file_error("read", display.clone(), e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| {
        CalcError::SerializationError {
            reason: format!("Invalid input JSON in {display}: {e}"),
        }
        .into()
    })
}

fn emit<T: Serialize>(cli: &Cli, value: &T, human: fn(&T)) -> Result<(), ApiError> {
    if cli.json {
        let json = serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError {
            reason: e.to_string(),
        })?;
        println!("{json}");
    } else {
        human(value);
    }
    Ok(())
}

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn print_compliance(summary: &ComplianceSummary) {
    println!("  {:<11} {:<6} {:>6}  {:<14} message", "check", "", "util", "governing");
    for check in &summary.checks {
        println!(
            "  {:<11} {:<6} {:>6.2}  {:<14} {}",
            check.category.to_string(),
            verdict(check.passed),
            check.utilization,
            check.governing_case_label,
            check.message
        );
        println!("  {:<11} {:<6} {:>6}  {:<14} [{}]", "", "", "", "", check.clause);
    }
}

fn print_design(result: &BeamDesignResult) {
    let g = &result.geometry;
    println!("Beam {} ({})", result.label, result.materials.display_name());
    println!(
        "  {} b={:.0} D={:.0} d={:.0} span={:.0} mm",
        g.section.display_name(),
        g.width_mm,
        g.total_depth_mm,
        g.effective_depth_mm,
        g.span_mm
    );
    println!(
        "  Ast required {:.0} mm², Asc required {:.0} mm², Mu,lim {:.1} kN·m",
        result.flexure.ast_required_mm2, result.flexure.asc_required_mm2, result.flexure.mu_lim_knm
    );
    match &result.detailing {
        Some(d) => {
            println!(
                "  Bottom {} ({:.0} mm²), top {}",
                d.bottom.description(),
                d.bottom.area_mm2,
                d.top.description()
            );
            for zone in &d.stirrup_zones {
                println!(
                    "  Stirrups {:?} {:.0}-{:.0} mm: {}φ {}L @ {:.0} ({} no.)",
                    zone.kind,
                    zone.start_mm,
                    zone.end_mm,
                    zone.diameter_mm,
                    zone.legs,
                    zone.spacing_mm,
                    zone.count
                );
            }
            println!(
                "  Ld {:.0} mm, lap {:.0} mm, steel {:.1} kg",
                d.development_length_mm,
                d.lap_length_mm,
                d.total_steel_weight_kg()
            );
        }
        None => println!("  No buildable bar arrangement"),
    }
    print_compliance(&result.compliance);
    if result.redesign_history.len() > 1 {
        for step in &result.redesign_history {
            println!(
                "  redesign {}: D={:.0} {}",
                step.iteration,
                step.total_depth_mm,
                verdict(step.passed)
            );
        }
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
    println!("Result: {}", verdict(result.passed));
}

fn print_optimal(optimal: &OptimalDesign) {
    println!(
        "{:>3}  {:<40} {:>10} {:>6}  status",
        "#", "arrangement", "cost", "util"
    );
    for c in &optimal.candidates {
        let marker = if c.index == optimal.chosen_index { "*" } else { " " };
        println!(
            "{:>2}{marker}  {:<40} {:>10.0} {:>6.2}  {}",
            c.index,
            c.description,
            c.cost.total_cost,
            c.max_utilization,
            if c.compliant {
                "ok".to_string()
            } else {
                c.failed_categories.join(",")
            }
        );
    }
    let chosen = optimal.chosen();
    println!(
        "Chosen: {} at {:.0} {} ({:.0} per m)",
        chosen.description, chosen.cost.total_cost, chosen.cost.currency, chosen.cost.cost_per_m
    );
    if let Some(diagnostic) = &optimal.diagnostic {
        println!("warning: {diagnostic}");
    }
}

fn print_smart(report: &SmartReport) {
    print_design(&report.design);
    if let Some(optimal) = &report.optimization {
        let chosen = optimal.chosen();
        println!(
            "Optimized: {} at {:.0} {}",
            chosen.description, chosen.cost.total_cost, chosen.cost.currency
        );
    }
    println!("Sensitivity:");
    for case in &report.sensitivity {
        println!(
            "  {:?} {:<5} -> {} {}",
            case.parameter,
            case.variation,
            verdict(case.passed),
            case.max_utilization
                .map(|u| format!("(util {u:.2})"))
                .or_else(|| case.error.clone())
                .unwrap_or_default()
        );
    }
    if let Some(score) = &report.constructability {
        println!("Constructability ({}): {:.0}/100", report.scorer, score.score);
    }
    for note in &report.recommendations {
        println!("  - {note}");
    }
}

#[derive(Serialize)]
struct BatchLine {
    id: String,
    label: String,
    passed: bool,
    failed_categories: Vec<String>,
    error: Option<ApiError>,
}

fn batch(cli: &Cli, path: &Path) -> Result<bool, ApiError> {
    let (project, lock) = load_project_with_lock_check(path)?;
    if let Some(lock) = lock {
        tracing::warn!(user = %lock.user_id, "project is open elsewhere; reading only");
    }
    let designer = designer(cli, Some(&project.settings))?;

    let beams: Vec<_> = project.beams.iter().collect();
    let lines: Vec<BatchLine> = beams
        .par_iter()
        .map(|(id, beam)| match designer.design(beam) {
            Ok(result) => BatchLine {
                id: id.to_string(),
                label: beam.label.clone(),
                passed: result.passed,
                failed_categories: result.failed_categories(),
                error: None,
            },
            Err(error) => BatchLine {
                id: id.to_string(),
                label: beam.label.clone(),
                passed: false,
                failed_categories: Vec::new(),
                error: Some(error),
            },
        })
        .collect();

    let passed = lines.iter().filter(|l| l.passed).count();
    if cli.json {
        emit(cli, &lines, |_| {})?;
    } else {
        for line in &lines {
            let detail = match &line.error {
                Some(error) => format!("error: {}", error.message),
                None => line.failed_categories.join(", "),
            };
            println!("{:<12} {}  {}", line.label, verdict(line.passed), detail);
        }
        println!("{passed}/{} beams pass", lines.len());
    }
    Ok(passed == lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["is456", "design", "beam.json", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Design { ref input } if input == Path::new("beam.json")
        ));
    }

    #[test]
    fn test_new_project_arguments() {
        let cli = Cli::try_parse_from([
            "is456",
            "new-project",
            "job.is456.json",
            "--engineer",
            "A. Rao",
            "--job-id",
            "25-042",
        ])
        .unwrap();
        match cli.command {
            Commands::NewProject { engineer, job_id, client, force, .. } => {
                assert_eq!(engineer, "A. Rao");
                assert_eq!(job_id, "25-042");
                assert_eq!(client, "");
                assert!(!force);
            }
            _ => panic!("expected new-project"),
        }
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["is456", "check"]).is_err());
    }
}
