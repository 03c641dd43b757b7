//! cutwise - machining parameter recommendations from the command line
//!
//! # Usage
//!
//! ```bash
//! # Recommend parameters for one setup
//! cutwise --catalog shop.toml recommend --session cell-1 \
//!     --material 6061 --tool em12 --machine vmc --mode roughing
//!
//! # Report what the operator actually ran
//! cutwise --catalog shop.toml feedback --session cell-1 \
//!     --parameter feed --recommended 0.10 --actual 0.08 --outcome success
//!
//! # Feed a wear measurement for one physical tool
//! cutwise wear measure --tool-instance T-17 --wear 0.06
//!
//! # Print the effective engine configuration
//! cutwise config show
//! ```
//!
//! # Environment Variables
//!
//! - `CUTWISE_CONFIG`: engine config TOML (default: ./cutwise.toml, then built-in)
//! - `CUTWISE_CATALOG`: profile catalog TOML
//! - `CUTWISE_STATE_DIR`: sled directory for learned state
//! - `RUST_LOG`: logging level (default: info)
//!
//! Results are JSON on stdout; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use cutwise::{
    AdaptedParameter, CuttingService, EngineConfig, FeedbackOutcome, InMemoryCatalog,
    MachiningMode, ObjectivePreset, RecommendRequest, SledStore, StateStore,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "cutwise")]
#[command(about = "Machining parameter recommendations with adaptive learning")]
#[command(version)]
struct CliArgs {
    /// Engine configuration TOML (overrides the standard search order)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Profile catalog TOML (materials, tools, machines, holders, workholding)
    #[arg(long, global = true, env = "CUTWISE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Directory for learned state (beliefs, tool-life history, wear filters)
    #[arg(long, global = true, env = "CUTWISE_STATE_DIR", default_value = "cutwise-state")]
    state_dir: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Recommend cutting parameters
    Recommend {
        #[arg(long, default_value = "default")]
        session: String,
        #[arg(long)]
        material: String,
        #[arg(long)]
        tool: String,
        #[arg(long)]
        machine: String,
        #[arg(long)]
        holder: Option<String>,
        #[arg(long)]
        workholding: Option<String>,
        /// roughing, finishing, slotting, adaptive, profiling
        #[arg(long, default_value = "roughing")]
        mode: MachiningMode,
        /// productivity, tool_life, surface_finish, balanced
        #[arg(long, default_value = "balanced")]
        objective: ObjectivePreset,
        #[arg(long)]
        thin_wall: bool,
        /// Physical tool instance with wear history
        #[arg(long)]
        tool_instance: Option<String>,
        /// Cut length (mm); enables cycle-time and tool-life distributions
        #[arg(long)]
        cut_length: Option<f64>,
        /// Sample learned corrections with this seed instead of using their means
        #[arg(long)]
        explore_seed: Option<u64>,
    },

    /// Report the value an operator actually ran
    Feedback {
        #[arg(long, default_value = "default")]
        session: String,
        /// speed, feed, doc
        #[arg(long)]
        parameter: AdaptedParameter,
        #[arg(long)]
        recommended: f64,
        #[arg(long)]
        actual: f64,
        /// success, acceptable, tool_breakage, chatter, poor_finish
        #[arg(long)]
        outcome: FeedbackOutcome,
    },

    /// Record an observed tool life at a cutting speed
    ToolLife {
        #[arg(long, default_value = "default")]
        session: String,
        /// Cutting speed (m/min)
        #[arg(long)]
        speed: f64,
        /// Observed tool life (min)
        #[arg(long)]
        life: f64,
    },

    /// Tool wear tracking
    #[command(subcommand)]
    Wear(WearCommand),

    /// Engine configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(clap::Subcommand, Debug)]
enum WearCommand {
    /// Fold in one flank-wear measurement (mm)
    Measure {
        #[arg(long)]
        tool_instance: String,
        #[arg(long)]
        wear: f64,
    },
    /// Current estimate for a tool instance
    Show {
        #[arg(long)]
        tool_instance: String,
    },
    /// Fresh cutting edge
    Reset {
        #[arg(long)]
        tool_instance: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Validate a configuration file
    Validate { path: PathBuf },
}

// ============================================================================
// Setup
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load engine config from {}", p.display())),
        None => Ok(EngineConfig::load()),
    }
}

fn build_service(args: &CliArgs, config: &EngineConfig) -> Result<CuttingService> {
    let catalog = match &args.catalog {
        Some(path) => InMemoryCatalog::load_from_file(path)
            .with_context(|| format!("Failed to load profile catalog from {}", path.display()))?,
        None => InMemoryCatalog::new(),
    };
    let store: Arc<dyn StateStore> = Arc::new(
        SledStore::open(&args.state_dir)
            .with_context(|| format!("Failed to open state store at {}", args.state_dir.display()))?,
    );
    Ok(CuttingService::from_config(config, Arc::new(catalog)).with_store(store))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(args.config.as_deref())?;

    match &args.command {
        SubCommand::Config(ConfigCommand::Show) => {
            print!("{}", config.to_toml().context("Failed to render config")?);
        }
        SubCommand::Config(ConfigCommand::Validate { path }) => {
            EngineConfig::load_from_file(path)
                .with_context(|| format!("{} is not a valid engine config", path.display()))?;
            info!(path = %path.display(), "Config is valid");
        }
        SubCommand::Recommend {
            session,
            material,
            tool,
            machine,
            holder,
            workholding,
            mode,
            objective,
            thin_wall,
            tool_instance,
            cut_length,
            explore_seed,
        } => {
            if args.catalog.is_none() {
                bail!("recommend needs a profile catalog (--catalog or CUTWISE_CATALOG)");
            }
            let service = build_service(&args, &config)?;
            let request = RecommendRequest {
                session_id: session.clone(),
                material_id: material.clone(),
                tool_id: tool.clone(),
                machine_id: machine.clone(),
                holder_id: holder.clone(),
                workholding_id: workholding.clone(),
                mode: *mode,
                objective: *objective,
                thin_wall: *thin_wall,
                tool_instance_id: tool_instance.clone(),
                cut_length_mm: *cut_length,
                explore_seed: *explore_seed,
            };
            let document = service.recommend(&request).context("Recommendation failed")?;
            print_json(&document)?;
        }
        SubCommand::Feedback {
            session,
            parameter,
            recommended,
            actual,
            outcome,
        } => {
            let service = build_service(&args, &config)?;
            let posterior = service
                .submit_feedback(session, *parameter, *recommended, *actual, *outcome)
                .context("Feedback rejected")?;
            print_json(&posterior)?;
        }
        SubCommand::ToolLife { session, speed, life } => {
            let service = build_service(&args, &config)?;
            let points = service
                .record_tool_life(session, *speed, *life)
                .context("Tool-life observation rejected")?;
            print_json(&serde_json::json!({ "session": session, "observations": points }))?;
        }
        SubCommand::Wear(cmd) => {
            let service = build_service(&args, &config)?;
            match cmd {
                WearCommand::Measure { tool_instance, wear } => {
                    let estimate = service
                        .report_wear_measurement(tool_instance, *wear)
                        .context("Wear measurement rejected")?;
                    print_json(&estimate)?;
                }
                WearCommand::Show { tool_instance } => {
                    let estimate = service.wear_estimate(tool_instance)?;
                    print_json(&estimate)?;
                }
                WearCommand::Reset { tool_instance } => {
                    let was_tracked = service.reset_tool(tool_instance)?;
                    print_json(&serde_json::json!({ "tool_instance": tool_instance, "reset": was_tracked }))?;
                }
            }
        }
    }

    Ok(())
}
