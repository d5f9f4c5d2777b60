//! testsel - test-case selection CLI
//!
//! Loads a case catalog and a run configuration, then reports which cases
//! the configured `testcase` rules select.
//!
//! ## Commands
//!
//! - `list`: Print the selected cases (or every case with `--all`)
//! - `check`: Validate the rules and print the selection summary

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use testsel_core::{
    install_global, load_catalog, CasePlan, CaseRegistry, LogFormat, OverrideMode, RunConfig,
    SelectionEngine, SelectionPlan,
};

#[derive(Parser)]
#[command(name = "testsel")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rule-driven test-case selection", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Run configuration file (YAML) holding the `testcase` rules
    #[arg(short, long, global = true, env = "TESTSEL_CONFIG")]
    config: Option<PathBuf>,

    /// Case catalog file (YAML, `cases:` list); defaults to the config's `catalog`
    #[arg(long, global = true, env = "TESTSEL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Write falsy override values (0, "", false) instead of skipping them
    #[arg(long, global = true)]
    explicit_overrides: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List selected cases
    List {
        /// Ignore the rules and list every registered case
        #[arg(short, long)]
        all: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the rules and summarize the selection
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    testsel_core::init_tracing(LogFormat::from_json_flag(cli.json_logs), level);

    let config = match &cli.config {
        Some(path) => RunConfig::load(path).context("Failed to load run configuration")?,
        None => RunConfig::default(),
    };
    let registry = install_global(resolve_registry(cli.catalog.as_deref(), &config)?)
        .context("Failed to register case catalog")?;
    info!(cases = registry.len(), "Registered case catalog");

    let mode = if cli.explicit_overrides {
        OverrideMode::Explicit
    } else {
        OverrideMode::SkipFalsy
    };
    let engine = SelectionEngine::new(registry).with_override_mode(mode);

    match cli.command {
        Commands::List { all, json } => cmd_list(&engine, &config, all, json),
        Commands::Check => cmd_check(&engine, &config),
    }
}

/// Catalog file wins over an inline `catalog` in the run configuration.
fn resolve_registry(catalog: Option<&Path>, config: &RunConfig) -> Result<CaseRegistry> {
    if let Some(path) = catalog {
        return load_catalog(path).context("Failed to load case catalog");
    }
    config
        .inline_registry()
        .context("Invalid inline catalog")?
        .context("No case catalog: pass --catalog or declare `catalog` in the run configuration")
}

fn cmd_list(engine: &SelectionEngine, config: &RunConfig, all: bool, json: bool) -> Result<()> {
    // --all ignores the rules: an empty rule list selects every case
    let rules = if all { &[][..] } else { config.rules() };
    let plan = engine
        .select(rules)
        .context("Failed to select test cases")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ListOutput::new(&plan))?);
        return Ok(());
    }

    for case in &plan {
        println!("{}", format_case(case));
    }
    println!();
    println!("Cases: {}", plan.len());
    Ok(())
}

fn cmd_check(engine: &SelectionEngine, config: &RunConfig) -> Result<()> {
    let rules = config.rules();
    let enabled = rules
        .iter()
        .filter(|r| r.get("enable").and_then(|v| v.as_bool()) != Some(false))
        .count();

    let plan = engine
        .select(rules)
        .context("Selection rules are invalid")?;

    println!("Rules: {} ({} enabled)", rules.len(), enabled);
    println!("Selected: {}", plan.len());
    println!("Plan digest: {}", plan.digest());
    println!("\n✓ Configuration is valid");
    Ok(())
}

/// One listing line: descriptor metadata followed by effective settings.
fn format_case(plan: &CasePlan) -> String {
    let case = &plan.descriptor;
    let s = &plan.settings;
    format!(
        "case: {}, suite: {}, area: {}, category: {}, tags: {}, priority: {} \
         [times: {}, retry: {}, new env: {}, ignore failure: {}, environment: {}, action: {}]",
        case.name,
        case.suite,
        case.area,
        case.category,
        case.tags.join(","),
        case.priority,
        s.times,
        s.retry,
        s.use_new_environment,
        s.ignore_failure,
        s.environment.as_deref().unwrap_or("-"),
        plan.action,
    )
}

#[derive(Serialize)]
struct ListOutput<'a> {
    count: usize,
    digest: String,
    cases: &'a SelectionPlan,
}

impl<'a> ListOutput<'a> {
    fn new(plan: &'a SelectionPlan) -> Self {
        Self {
            count: plan.len(),
            digest: plan.digest(),
            cases: plan,
        }
    }
}
