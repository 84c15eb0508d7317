// SPDX-License-Identifier: PMPL-1.0-or-later
//! Auditbot CLI - WCAG accessibility auditor with reversible CSS fixes

use anyhow::{Context, Result};
use auditbot::config::{default_config_path, Config};
use auditbot::fixes::store::FileStore;
use auditbot::fixes::{FixPayload, Platform, Website};
use auditbot::recommend::{recommend, OpenAiClient, Recommendation};
use auditbot::report::{generate_report, OutputFormat};
use auditbot::{scanner, Auditor, FixEngine, TestResult};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// WCAG accessibility auditor with reversible CSS remediation
#[derive(Parser)]
#[command(name = "auditbot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/auditbot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test a live URL
    Test {
        url: String,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Ask the completion API for remediation advice
        #[arg(long)]
        recommend: bool,
    },

    /// Test every HTML file under a directory
    Scan {
        dir: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate, apply, revert and list CSS fixes
    Fix {
        #[command(subcommand)]
        action: FixAction,
    },
}

#[derive(Subcommand)]
enum FixAction {
    /// Test a URL and print the fixes its issues map to
    Generate { url: String },

    /// Test a URL and apply every matching fix to a WordPress site
    Apply {
        url: String,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// Remove an applied fix
    Revert {
        fix_id: String,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// List fixes applied to a site
    List {
        #[command(flatten)]
        site: SiteArgs,
    },
}

#[derive(clap::Args)]
struct SiteArgs {
    /// Site identifier used to key the custom CSS store
    #[arg(long)]
    site_id: String,

    /// WordPress REST API base URL
    #[arg(long, default_value = "")]
    api_url: String,

    /// Treat the site as a generic (non-WordPress) platform
    #[arg(long)]
    generic: bool,
}

impl SiteArgs {
    fn website(&self, url: &str) -> Website {
        let platform = if self.generic {
            Platform::Generic
        } else {
            Platform::WordPress {
                api_url: self.api_url.clone(),
                credentials: None,
            }
        };
        Website::new(&self.site_id, url, platform)
    }
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

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("auditbot=debug")
    } else {
        EnvFilter::new("auditbot=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let auditor = Auditor::new(&config)?;

    match cli.command {
        Commands::Test { url, format, output, recommend: advise } => {
            let result = auditor.test_accessibility(&url).await?;
            let recommendations = if advise {
                recommendations_for(&config, &result).await?
            } else {
                Vec::new()
            };

            let report = generate_report(std::slice::from_ref(&result), &recommendations, format.into());
            write_output(&report, output.as_deref())?;

            if result.has_critical() {
                std::process::exit(1);
            }
        }

        Commands::Scan { dir, format, output } => {
            let results = scanner::scan_directory(&auditor, &dir)?;
            let report = generate_report(&results, &[], format.into());
            write_output(&report, output.as_deref())?;

            if results.iter().any(TestResult::has_critical) {
                std::process::exit(1);
            }
        }

        Commands::Fix { action } => {
            let store = Arc::new(FileStore::new(&config.store.directory));
            let engine = FixEngine::new(store);
            run_fix(&auditor, &engine, action).await?;
        }
    }

    Ok(())
}

async fn recommendations_for(config: &Config, result: &TestResult) -> Result<Vec<Recommendation>> {
    let client = OpenAiClient::from_env(&config.recommendations)?;
    Ok(recommend(&client, &result.issues, config.recommendations.max_issues).await)
}

/// Fixes for every issue that matches a template
fn generate_fixes(engine: &FixEngine, result: &TestResult) -> Vec<FixPayload> {
    result
        .issues
        .iter()
        .filter_map(|issue| match engine.generate_fix(issue) {
            Ok(fix) => Some(fix),
            Err(e) => {
                info!("No fix for {}: {}", issue.id, e);
                None
            }
        })
        .collect()
}

async fn run_fix(auditor: &Auditor, engine: &FixEngine, action: FixAction) -> Result<()> {
    match action {
        FixAction::Generate { url } => {
            let result = auditor.test_accessibility(&url).await?;
            let fixes = generate_fixes(engine, &result);
            println!("{}", serde_json::to_string_pretty(&fixes)?);
        }

        FixAction::Apply { url, site } => {
            let result = auditor.test_accessibility(&url).await?;
            let website = site.website(&url);
            let mut failed = 0;

            for fix in generate_fixes(engine, &result) {
                let outcome = engine.apply_fix(&website, &fix).await;
                if !outcome.success {
                    failed += 1;
                    warn!("Fix {} not applied", fix.id);
                }
                println!("{}", serde_json::to_string(&outcome)?);
            }

            if failed > 0 {
                std::process::exit(1);
            }
        }

        FixAction::Revert { fix_id, site } => {
            let outcome = engine.revert_fix(&site.website(""), &fix_id).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                std::process::exit(1);
            }
        }

        FixAction::List { site } => {
            let applied = engine.list_applied_fixes(&site.website("")).await;
            println!("{}", serde_json::to_string_pretty(&applied)?);
            if !applied.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
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
