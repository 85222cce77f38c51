use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use common::LintConfig;
use inspector::rules::all_rules;
use inspector::{pipeline, Dispatcher, FileReport, LintResult, ParserHost};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specwarden")]
#[command(about = "Static checks for RSpec expectation chains", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect spec files and report offenses.
    Check {
        /// Spec file or project directory.
        path: PathBuf,
        /// Configuration file (overrides SPECWARDEN_CONFIG and .specwarden.toml).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Report format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List active rules and the configured runner methods.
    Rules {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<ExitCode> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env: {}", e);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Check {
            path,
            config,
            format,
        } => cmd_check(path, config.as_deref(), *format),
        Commands::Rules { config } => cmd_rules(config.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn cmd_check(path: &Path, config: Option<&Path>, format: Format) -> anyhow::Result<ExitCode> {
    let config = LintConfig::load(config)?;
    let dispatcher = Dispatcher::new(all_rules(), &config);
    let mut host = ParserHost::new()?;
    tracing::debug!(
        path = %path.display(),
        rules = dispatcher.rules().count(),
        runners = config.runners.len(),
        "check"
    );

    let result = pipeline::run(path, &mut host, &dispatcher, &config)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text(&result),
    }

    Ok(if result.offense_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_text(result: &LintResult) {
    for report in &result.files {
        for line in offense_lines(report) {
            println!("{line}");
        }
    }

    let offending_files = result
        .files
        .iter()
        .filter(|f| !f.offenses.is_empty())
        .count();

    println!();
    println!("+------------------------------------------+");
    println!("| SPECWARDEN CHECK                         |");
    println!("+------------------------------------------+");
    println!("| Files inspected : {:>22} |", result.inspected);
    println!("| Files skipped   : {:>22} |", result.skipped);
    println!("| Offending files : {:>22} |", offending_files);
    println!("| Offenses        : {:>22} |", result.offense_count());
    println!("+------------------------------------------+");
}

/// `path:line:col: C: Rule/Name: message`, one per offense.
fn offense_lines(report: &FileReport) -> Vec<String> {
    report
        .offenses
        .iter()
        .map(|o| {
            format!(
                "{}:{}:{}: {}: {}: {}",
                report.path,
                o.span.line,
                o.span.column,
                o.severity.code(),
                o.rule,
                o.message
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// rules
// ---------------------------------------------------------------------------

fn cmd_rules(config: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = LintConfig::load(config)?;
    let dispatcher = Dispatcher::new(all_rules(), &config);

    let mut any = false;
    for (rule, severity) in dispatcher.rules() {
        any = true;
        println!("{} [{}]", rule.name(), severity);
        println!("  on send: {}", rule.restrict_on_send().join(", "));
    }
    if !any {
        println!("No rules enabled.");
    }

    let runners: Vec<&str> = dispatcher.runners().iter().collect();
    println!("\nRunners: {}", runners.join(", "));

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use common::{Offense, Severity, Span};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_arguments() {
        let cli = Cli::try_parse_from(["specwarden", "check", "spec", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Check {
                path,
                config,
                format,
            } => {
                assert_eq!(path, PathBuf::from("spec"));
                assert!(config.is_none());
                assert!(format == Format::Json);
            }
            Commands::Rules { .. } => panic!("expected check"),
        }
    }

    #[test]
    fn test_offense_line_format() {
        let report = FileReport {
            path: "spec/models/user_spec.rb".to_string(),
            offenses: vec![Offense {
                rule: "RSpec/ExpectationTargetMethod",
                severity: Severity::Convention,
                span: Span::new(30, 38, 2, 21),
                message: "Use `.to`, `.not_to` or `.to_not` to set an expectation.",
            }],
        };

        assert_eq!(
            offense_lines(&report),
            vec![
                "spec/models/user_spec.rb:2:21: C: RSpec/ExpectationTargetMethod: \
                 Use `.to`, `.not_to` or `.to_not` to set an expectation."
                    .to_string()
            ]
        );
    }
}
