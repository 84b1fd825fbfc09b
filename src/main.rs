// SPDX-License-Identifier: PMPL-1.0-or-later
//! wcagfixbot CLI - WCAG 2.1 accessibility audit and auto-remediation

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wcagfixbot::analyzers;
use wcagfixbot::config::{self, Config};
use wcagfixbot::fixer;
use wcagfixbot::issue::IssueType;
use wcagfixbot::report::{generate_comparison_report, generate_fix_summary, generate_report, OutputFormat};
use wcagfixbot::scanner::{self, Page};

/// WCAG 2.1 accessibility rule engine with auto-remediation
#[derive(Parser)]
#[command(name = "wcagfixbot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(clap::Args)]
struct CommonArgs {
    /// Configuration file (YAML, or TOML by extension)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: FormatArg,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single HTML file
    Analyze {
        /// File to analyze
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Analyze every HTML file in a directory
    Check {
        /// Directory to scan
        dir: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Apply automatic fixes to an HTML file
    Fix {
        /// File to fix
        file: PathBuf,

        /// Where to write the fixed HTML (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Rewrite the input file
        #[arg(long, conflicts_with = "output")]
        in_place: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Scan with and without fixes and report what the fixes changed
    Compare {
        /// HTML file or directory
        path: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List analyzers and the issue taxonomy
    Rules,

    /// Write a default configuration file
    Init {
        /// Destination (YAML, or TOML by extension)
        #[arg(default_value = ".wcagfixbot/config.yml")]
        path: PathBuf,
    },
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI
    Sarif,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Sarif => OutputFormat::Sarif,
        }
    }
}

fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("wcagfixbot=debug")
    } else {
        EnvFilter::try_new(format!("wcagfixbot={}", level))
            .unwrap_or_else(|_| EnvFilter::new("wcagfixbot=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration and start logging
fn setup(common: &CommonArgs) -> anyhow::Result<Config> {
    let path = common.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    init_logging(common.verbose, &config.log.level);
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, common } => {
            let config = setup(&common)?;
            let report = scanner::scan_file(&file, &config)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            println!("{}", generate_report(std::slice::from_ref(&report), common.format.into()));

            if report.has_blocking() {
                std::process::exit(1);
            }
        }

        Commands::Check { dir, output, common } => {
            let config = setup(&common)?;
            let reports = scanner::scan_directory(&dir, &config)?;
            let report = generate_report(&reports, common.format.into());
            write_output(&report, output.as_deref())?;

            if reports.iter().any(|r| r.has_blocking()) {
                std::process::exit(1);
            }
        }

        Commands::Fix { file, output, in_place, common } => {
            let config = setup(&common)?;
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let fixed = fixer::fix_html(&html, &config);

            let destination = if in_place { Some(file.as_path()) } else { output.as_deref() };
            match destination {
                Some(path) => {
                    std::fs::write(path, &fixed.html)?;
                    eprintln!("Fixed HTML written to {}", path.display());
                }
                None => println!("{}", fixed.html),
            }

            match OutputFormat::from(common.format) {
                OutputFormat::Text => eprint!("{}", generate_fix_summary(&fixed)),
                _ => eprintln!("{}", serde_json::to_string_pretty(&fixed.attempts)?),
            }

            let rescan = scanner::scan_html(&file.display().to_string(), &fixed.html, &config);
            if rescan.has_blocking() {
                std::process::exit(1);
            }
        }

        Commands::Compare { path, common } => {
            let config = setup(&common)?;
            let pages = Page::load(&path)
                .with_context(|| format!("Failed to read pages from {}", path.display()))?;
            let session = scanner::run_session(&pages, &config);
            println!("{}", generate_comparison_report(&session.comparison, common.format.into()));

            if session.aborted {
                eprintln!("Session budget exhausted; some pages were not compared");
            }
            if session.comparison.has_blocking() {
                std::process::exit(1);
            }
        }

        Commands::Rules => print_rules(),

        Commands::Init { path } => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            config::write_default_config(&path)?;
            eprintln!("Default configuration written to {}", path.display());
        }
    }

    Ok(())
}

fn print_rules() {
    println!("Analyzers:");
    for analyzer in analyzers::analyzers() {
        println!("  {:<32} {}", analyzer.name(), analyzer.description());
    }

    println!("\nIssue types:");
    for issue_type in IssueType::ALL {
        let meta = issue_type.meta();
        let criterion = if meta.criterion.is_empty() { "-" } else { meta.criterion };
        let fix = meta.fix.map(|k| k.as_str()).unwrap_or("manual");
        println!(
            "  {:<30} {:<9} {:<7} {}",
            issue_type.as_str(),
            meta.severity.to_string(),
            criterion,
            fix
        );
    }
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
