//! Sentinel CLI - run incidents through the orchestrator
//!
//! Reads a raw incident payload, normalizes it, drives it through the full
//! pipeline with the simulated tools and the mock model, and writes the
//! per-run artifacts (`trace.jsonl`, `episode.json`) under the output
//! directory. Exits non-zero when the run terminates in FAILED.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sentinel_agents::{default_handlers, MockModel};
use sentinel_engine::{AutoApprovalGate, Orchestrator};
use sentinel_policy::ApprovalPolicy;
use sentinel_registry::ToolRegistry;
use sentinel_tools::register_builtin_tools;
use sentinel_trace::NdjsonFileSink;
use sentinel_types::{PermissionLevel, RiskLevel, RunStatus, TaskSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sentinel - incident diagnosis and remediation orchestrator
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Diagnose and remediate operational incidents", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, env = "SENTINEL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "SENTINEL_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one incident through the pipeline
    Run {
        /// Raw payload file; "-" reads stdin
        input: PathBuf,

        /// Which entry channel the payload came from
        #[arg(short, long, value_enum, default_value_t = Source::Alert)]
        source: Source,

        /// Directory receiving per-run artifacts
        #[arg(short, long, env = "SENTINEL_OUTPUT_DIR", default_value = "runs")]
        output_dir: PathBuf,

        /// Permission level the run's tool calls are made with
        #[arg(short, long, value_enum, default_value_t = Permission::Operator)]
        permission: Permission,

        /// Risk level at or above which plans need approval
        #[arg(long, value_enum, default_value_t = Threshold::RiskyWrite)]
        approval_threshold: Threshold,

        /// Deny every plan that reaches the approval gate
        #[arg(long)]
        deny_writes: bool,

        /// Forbid all write actions regardless of approval
        #[arg(long)]
        read_only: bool,
    },
    /// List the registered tools
    Tools,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Alert,
    Ticket,
    Chat,
    Cron,
}

impl From<Source> for TaskSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Alert => TaskSource::Alert,
            Source::Ticket => TaskSource::Ticket,
            Source::Chat => TaskSource::Chat,
            Source::Cron => TaskSource::Cron,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Permission {
    Guest,
    Operator,
    Admin,
}

impl From<Permission> for PermissionLevel {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Guest => PermissionLevel::Guest,
            Permission::Operator => PermissionLevel::Operator,
            Permission::Admin => PermissionLevel::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Threshold {
    ReadOnly,
    SafeWrite,
    RiskyWrite,
}

impl From<Threshold> for RiskLevel {
    fn from(threshold: Threshold) -> Self {
        match threshold {
            Threshold::ReadOnly => RiskLevel::ReadOnly,
            Threshold::SafeWrite => RiskLevel::SafeWrite,
            Threshold::RiskyWrite => RiskLevel::RiskyWrite,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match cli.command {
        Command::Tools => list_tools(),
        Command::Run {
            input,
            source,
            output_dir,
            permission,
            approval_threshold,
            deny_writes,
            read_only,
        } => {
            run_incident(
                &input,
                source.into(),
                &output_dir,
                permission.into(),
                approval_threshold.into(),
                deny_writes,
                read_only,
            )
            .await
        }
    }
}

fn list_tools() -> anyhow::Result<()> {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry)?;
    for name in registry.tool_names() {
        // Registered above, so the spec lookup cannot miss.
        if let Some(spec) = registry.spec(&name) {
            println!(
                "{:<20} {:<11} {:<9} {}",
                spec.name, spec.risk_level, spec.required_permission, spec.description
            );
        }
    }
    Ok(())
}

async fn run_incident(
    input: &Path,
    source: TaskSource,
    output_dir: &Path,
    permission: PermissionLevel,
    approval_threshold: RiskLevel,
    deny_writes: bool,
    read_only: bool,
) -> anyhow::Result<()> {
    let raw: serde_json::Value = if input == Path::new("-") {
        serde_json::from_reader(std::io::stdin()).context("parsing stdin payload")?
    } else {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("reading {}", input.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", input.display()))?
    };

    let mut task = sentinel_ingest::ingest(&raw, source)?;
    if read_only {
        task.constraints.read_only = true;
    }

    let run_dir = output_dir.join(task.task_id.to_string());
    let sink = NdjsonFileSink::open(run_dir.join("trace.jsonl"))?;

    let registry = ToolRegistry::new();
    register_builtin_tools(&registry)?;

    let mut builder = Orchestrator::builder(Arc::new(registry))
        .with_sink(Arc::new(sink))
        .with_approval_policy(ApprovalPolicy::new(approval_threshold))
        .with_caller_permission(permission);
    for handler in default_handlers(Arc::new(MockModel::new())) {
        builder = builder.with_handler(handler);
    }
    if deny_writes {
        builder = builder.with_gate(Arc::new(AutoApprovalGate::denying(
            "writes denied by --deny-writes",
        )));
    }
    let orchestrator = builder.build();

    let episode = orchestrator.run(task).await?;

    let episode_path = run_dir.join("episode.json");
    std::fs::write(&episode_path, serde_json::to_vec_pretty(&episode)?)
        .with_context(|| format!("writing {}", episode_path.display()))?;

    println!("run     {}", episode.run_id);
    match &episode.status {
        RunStatus::Completed => println!("status  completed ({})", episode.report.status),
        RunStatus::Failed { failure } => println!("status  failed ({})", failure),
    }
    println!("report  {}", episode.report.summary);
    println!("trace   {}", run_dir.join("trace.jsonl").display());
    println!("episode {}", episode_path.display());

    if let RunStatus::Failed { failure } = &episode.status {
        eprintln!("run failed: {}", failure);
        std::process::exit(1);
    }
    Ok(())
}
