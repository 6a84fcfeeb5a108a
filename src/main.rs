//! evibus CLI: pose Datalog queries against rule files and tool wrappers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use evibus::config::BusConfig;
use evibus::engine::Engine;
use evibus::interpret::ToolRegistry;
use evibus::parser;

#[derive(Parser)]
#[command(name = "evibus", version, about = "Evidential tool bus Datalog engine")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule files or directories to load before running a command.
    #[arg(short = 'r', long = "rules", global = true)]
    rules: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Syntax-check rule files without running anything.
    Parse {
        /// Files to check.
        files: Vec<PathBuf>,
    },

    /// Pose a goal and print the claims that answer it.
    Query {
        /// The goal literal, e.g. "path(a, X)".
        goal: String,

        /// Seconds to wait for the goal to complete.
        #[arg(long, default_value = "10")]
        timeout: u64,

        /// Print the derivation explanation for each claim.
        #[arg(long)]
        explain: bool,

        /// Save the logic state to this file afterwards.
        #[arg(long)]
        save_state: Option<PathBuf>,
    },

    /// Print the claims stored in a saved logic state.
    Claims {
        /// The state snapshot to read.
        state: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BusConfig::load(path).into_diagnostic()?,
        None => BusConfig::default(),
    };

    let filter = config
        .log_filter
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::from_default_env());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Parse { files } => {
            let mut failed = false;
            for file in files {
                match parser::parse_file(&file) {
                    Ok(statements) => {
                        println!("{}: {} statements", file.display(), statements.len());
                    }
                    Err(err) => {
                        failed = true;
                        eprintln!("{}: {err}", file.display());
                    }
                }
            }
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Query {
            goal,
            timeout,
            explain,
            save_state,
        } => {
            let registry = if config.async_wrappers {
                ToolRegistry::with_builtins().with_async_dispatch()
            } else {
                ToolRegistry::with_builtins()
            };
            let engine = Engine::new(Arc::new(registry));

            for path in rule_sources(&cli.rules, &config) {
                if path.is_dir() {
                    engine.load_rules_dir(&path).into_diagnostic()?;
                } else {
                    engine.load_rules(&path).into_diagnostic()?;
                }
            }

            let goal = parser::parse_literal(&goal).into_diagnostic()?;
            engine.add_goal(&goal).into_diagnostic()?;
            let completed = engine.wait_completed(&goal, Duration::from_secs(timeout));
            if !completed {
                eprintln!("goal did not complete within {timeout}s");
            }

            let claims = engine.get_claims_matching_goal(&goal);
            if claims.is_empty() {
                println!("no claims for {goal}");
            }
            for claim in &claims {
                println!("{claim}");
                if explain {
                    println!("  {}", engine.claim_explanation(&claim.literal));
                }
            }
            for subst in engine.get_substitutions(&goal) {
                println!("{subst}");
            }

            if let Some(path) = save_state.or(config.state_file) {
                engine.save_state(&path).into_diagnostic()?;
            }
            Ok(())
        }

        Commands::Claims { state } => {
            let saved = evibus::persist::read(&state).into_diagnostic()?;
            for claim in &saved.claims {
                println!("{claim}");
            }
            Ok(())
        }
    }
}

fn rule_sources(flags: &[PathBuf], config: &BusConfig) -> Vec<PathBuf> {
    let mut sources = flags.to_vec();
    if let Some(dir) = &config.rules_dir {
        sources.push(dir.clone());
    }
    sources
}
