use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use trailmark_core::{
    validate_document, BddConfig, Diagnostic, DiagnosticLevel, ScenarioDocument,
};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(author, version, about = "Trailmark scenario document tooling")]
struct TrailmarkCli {
    /// TOML file overriding timeout, poll interval, capture directory or label tag
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a scenario document and print the steps it would schedule
    Plan {
        /// Path to a YAML or JSON scenario document
        input: PathBuf,
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Validate a scenario document and print its diagnostics
    Check {
        /// Path to a YAML or JSON scenario document
        input: PathBuf,
        /// Output JSON instead of a human-readable list
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = TrailmarkCli::parse();
    init_logging(cli.debug);

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "effective configuration");

    match cli.command {
        Command::Plan { input, json } => {
            let document = ScenarioDocument::load(&input)?;
            let diagnostics = validate_document(&document);
            let has_errors = diagnostics.iter().any(Diagnostic::is_error);
            if has_errors {
                output_diagnostics(&diagnostics, json)?;
                anyhow::bail!("validation failed");
            }
            let plan = document.plan(&config)?;
            if json {
                let payload = json!({
                    "plan": plan,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_diagnostics(&diagnostics);
                println!("{plan}");
            }
        }
        Command::Check { input, json } => {
            let document = ScenarioDocument::load(&input)?;
            let diagnostics = validate_document(&document);
            output_diagnostics(&diagnostics, json)?;
            if diagnostics.iter().any(Diagnostic::is_error) {
                anyhow::bail!("validation failed");
            }
            if !json && diagnostics.is_empty() {
                println!("{}: ok", input.display());
            }
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BddConfig> {
    match path {
        Some(path) => Ok(BddConfig::load(path)?),
        None => Ok(BddConfig::default()),
    }
}

fn output_diagnostics(diagnostics: &[Diagnostic], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
    } else {
        print_diagnostics(diagnostics);
    }
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    println!("Diagnostics:");
    for diagnostic in diagnostics {
        let level = match diagnostic.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warn",
        };
        match &diagnostic.location {
            Some(location) => println!("  - [{level}] {location}: {}", diagnostic.message),
            None => println!("  - [{level}] {}", diagnostic.message),
        }
    }
    println!();
}
