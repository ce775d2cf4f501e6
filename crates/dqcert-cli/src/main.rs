#![doc = include_str!("../README.md")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use dqcert_check::{Certifier, CertifyConfig, CheckFailure, DependencyScheme, Verdict};
use dqcert_core::{parse_dqdimacs, parse_model};
use miette::{Context, IntoDiagnostic};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "dqcert",
    version,
    about = "Certify a candidate Skolem model of a DQBF formula"
)]
struct Cli {
    /// Formula file in DQDIMACS format.
    formula: PathBuf,

    /// Candidate model file.
    model: PathBuf,

    /// Check that each existential is uniquely defined by its dependencies.
    #[arg(long = "check-def")]
    check_def: bool,

    /// Check that every universal assignment extends to satisfy the model.
    #[arg(long = "check-cons")]
    check_cons: bool,

    /// Use the declared dependency sets instead of the extended closure.
    #[arg(long = "std-dep")]
    std_dep: bool,

    /// Optional JSON report output path.
    #[arg(long)]
    json_report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    formula: String,
    model: String,
    config: &'a CertifyConfig,
    verdict: &'a Verdict,
}

fn config_from_cli(cli: &Cli) -> CertifyConfig {
    CertifyConfig {
        check_definability: cli.check_def,
        check_consistency: cli.check_cons,
        dependency_scheme: if cli.std_dep {
            DependencyScheme::Standard
        } else {
            DependencyScheme::Extended
        },
    }
}

fn write_report(path: &Path, report: &CheckReport) -> miette::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    let json = serde_json::to_string_pretty(report).into_diagnostic()?;
    fs::write(path, json).into_diagnostic()?;
    Ok(())
}

fn print_verdict(verdict: &Verdict) {
    match verdict {
        Verdict::Certified => println!("Model validated!"),
        Verdict::Refuted { failure } => {
            println!("{failure}");
            if let CheckFailure::ClauseNotEntailed {
                universal_assignment,
                existential_assignment,
                ..
            } = failure
            {
                println!("Universal assignment: {universal_assignment:?}");
                println!("Existential assignment: {existential_assignment:?}");
            }
        }
    }
}

fn main() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let formula_text = fs::read_to_string(&cli.formula)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read formula file {}", cli.formula.display()))?;
    let model_text = fs::read_to_string(&cli.model)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read model file {}", cli.model.display()))?;

    let formula = parse_dqdimacs(&formula_text)
        .map_err(miette::Report::from)
        .wrap_err_with(|| format!("malformed formula file {}", cli.formula.display()))?;
    let model = parse_model(&model_text)
        .map_err(miette::Report::from)
        .wrap_err_with(|| format!("malformed model file {}", cli.model.display()))?;

    let certifier = Certifier::new(config_from_cli(&cli));
    let verdict = certifier
        .certify(&formula, &model)
        .into_diagnostic()
        .wrap_err("certification aborted")?;

    if let Some(path) = &cli.json_report {
        let report = CheckReport {
            formula: cli.formula.display().to_string(),
            model: cli.model.display().to_string(),
            config: certifier.config(),
            verdict: &verdict,
        };
        write_report(path, &report)?;
    }

    print_verdict(&verdict);
    Ok(if verdict.is_certified() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_the_config() {
        let cli = Cli::parse_from(["dqcert", "f.dqdimacs", "m.cnf", "--check-def", "--std-dep"]);
        let config = config_from_cli(&cli);
        assert!(config.check_definability);
        assert!(!config.check_consistency);
        assert_eq!(config.dependency_scheme, DependencyScheme::Standard);
    }

    #[test]
    fn extended_dependencies_are_the_default_scheme() {
        let cli = Cli::parse_from(["dqcert", "f.dqdimacs", "m.cnf"]);
        let config = config_from_cli(&cli);
        assert_eq!(config.dependency_scheme, DependencyScheme::Extended);
    }

    #[test]
    fn report_serializes_config_and_verdict() {
        let config = CertifyConfig::default();
        let verdict = Verdict::Certified;
        let report = CheckReport {
            formula: "f.dqdimacs".into(),
            model: "m.cnf".into(),
            config: &config,
            verdict: &verdict,
        };
        let json = serde_json::to_value(&report).expect("report should serialize");
        assert_eq!(json["config"]["dependency_scheme"], "extended");
        assert_eq!(json["verdict"]["verdict"], "certified");
    }
}
