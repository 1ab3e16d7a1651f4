//! Greenroom - swarm coordination CLI
//!
//! The `greenroom` command drives a self-contained swarm round for
//! inspection and tuning. Nothing here persists; the core is an
//! in-memory library and the CLI exists to exercise it end to end.
//!
//! ## Commands
//!
//! - `demo`: run a scripted production round (register agents, hold a
//!   vote, assign and complete tasks) and print the resulting reports
//! - `weights`: print the voting weight / abstention table for a sweep
//!   of confidence values

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};

use greenroom_core::{
    init_tracing, AgentHandle, ConfidenceModel, MessageBus, SwarmConfig, SwarmCoordinator,
    SwarmSnapshot, TaskSpec, VotingSystem, METRICS,
};

#[derive(Parser)]
#[command(name = "greenroom")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Swarm coordination core for a content-production pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted swarm round and print the final reports
    Demo {
        /// Number of production agents to register
        #[arg(long, default_value_t = 4)]
        agents: usize,

        /// Number of tasks to push through the swarm
        #[arg(long, default_value_t = 6)]
        tasks: usize,
    },

    /// Print the voting weight and abstention decision for a sweep of
    /// overall confidence values
    Weights {
        /// Sweep step size
        #[arg(long, default_value_t = 0.1)]
        step: f64,
    },
}

/// The specialties the demo swarm staffs, cycled over the agent count.
const SPECIALTIES: &[&str] = &["clip-selection", "seo", "thumbnail", "humor"];

fn run_demo(agents: usize, tasks: usize) -> Result<()> {
    let cfg = SwarmConfig::default();
    let bus = Arc::new(MessageBus::new(&cfg));
    let voting = VotingSystem::new(bus.clone(), &cfg);
    let coord = SwarmCoordinator::new(bus.clone(), &cfg);

    let mut handles = Vec::with_capacity(agents);
    for i in 0..agents {
        let specialty = SPECIALTIES[i % SPECIALTIES.len()];
        let id = format!("{specialty}-{i}");
        bus.register_agent(id.clone());
        let handle = AgentHandle::new(
            id,
            ConfidenceModel::new(&cfg)
                .with_overall(0.4 + 0.1 * (i % 4) as f64)
                .with_domains([(specialty, 0.8)]),
        );
        coord.register_agent(handle.clone());
        handles.push(handle);
    }
    info!(agents = agents, "swarm registered");

    // Hold a release-timing vote across the whole swarm.
    let proposal = voting.create_proposal(
        "coordinator",
        "Release timing",
        "Post the short now or after the full episode drops?",
        vec!["now".into(), "later".into()],
        Some("seo".into()),
    )?;
    for (i, handle) in handles.iter().enumerate() {
        let decision = if i % 3 == 0 { "now" } else { "later" };
        voting.cast_vote_with(&proposal, handle, decision);
        voting.log_conversation(
            &proposal,
            handle.agent_id(),
            format!("leaning {decision}"),
            "argument",
        );
    }
    let outcome = voting.close_proposal(&proposal)?;
    for handle in &handles {
        if let Some(aligned) = outcome.aligned.get(handle.agent_id()) {
            let mut model = handle.lock_confidence();
            model.record_vote_outcome(*aligned);
            model.recompute_overall();
        }
    }

    // Push tasks through assignment and completion.
    for i in 0..tasks {
        let task_type = SPECIALTIES[i % SPECIALTIES.len()];
        let task = TaskSpec::new(format!("task-{i}"), task_type)
            .with_complexity(0.2 + 0.1 * (i % 5) as f64);
        if let Some(agent) = coord.assign_task(task) {
            // every third task fails, so the health report has texture
            let success = i % 3 != 2;
            coord.report_task_completion(
                &format!("task-{i}"),
                &agent,
                success,
                json!({ "round": i }),
            );
        }
    }

    let report = json!({
        "vote": {
            "proposal_id": outcome.proposal_id,
            "winners": outcome.winners,
            "summary": outcome.summary,
        },
        "status": coord.get_swarm_status(),
        "snapshot": SwarmSnapshot::capture(&bus, &voting, &coord),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    METRICS.flush();
    Ok(())
}

fn run_weights(step: f64) -> Result<()> {
    anyhow::ensure!(step > 0.0 && step <= 1.0, "step must be in (0, 1]");

    let cfg = SwarmConfig::default();
    let mut rows = Vec::new();
    let mut overall = 0.0_f64;
    while overall <= 1.0 + 1e-9 {
        let model = ConfidenceModel::new(&cfg).with_overall(overall);
        rows.push(json!({
            "overall": (overall * 100.0).round() / 100.0,
            "weight": model.get_voting_weight(None),
            "abstains": model.should_abstain(None),
        }));
        overall += step;
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Demo { agents, tasks } => run_demo(agents, tasks),
        Commands::Weights { step } => run_weights(step),
    }
}
