//! Concurrency properties: shared registries must not lose updates
//! under parallel callers.

use std::sync::Arc;
use std::thread;

use serde_json::json;

use greenroom_core::{
    AgentMessage, Ballot, MessageBus, MessageKind, Recipient, SwarmConfig, SwarmCoordinator,
    TaskSpec, VotingSystem,
};
use greenroom_core::{AgentHandle, ConfidenceModel};

const THREADS: usize = 16;

#[test]
fn parallel_votes_are_all_recorded() {
    let cfg = SwarmConfig::default();
    let bus = Arc::new(MessageBus::new(&cfg));
    let voting = Arc::new(VotingSystem::new(bus, &cfg));

    let proposal = voting
        .create_proposal(
            "coord",
            "Stress round",
            "",
            vec!["yes".into(), "no".into()],
            None,
        )
        .unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let voting = voting.clone();
            let proposal = proposal.clone();
            thread::spawn(move || {
                let decision = if i % 2 == 0 { "yes" } else { "no" };
                assert!(voting.cast_vote(
                    &proposal,
                    &format!("agent-{i}"),
                    Ballot::new(decision, 1.0, 0.5),
                ));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let summary = voting.get_vote_summary(&proposal).unwrap();
    assert_eq!(summary.total_votes, THREADS);
    assert_eq!(summary.results["yes"].count + summary.results["no"].count, THREADS);
}

#[test]
fn parallel_sends_preserve_every_message() {
    let bus = Arc::new(MessageBus::default());
    bus.register_agent("sink");

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let bus = bus.clone();
            thread::spawn(move || {
                let m = AgentMessage::new(
                    format!("sender-{i}"),
                    Recipient::Agent("sink".into()),
                    MessageKind::Chatter,
                    json!({ "i": i }),
                );
                assert!(bus.send_message(m));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(bus.get_messages("sink").len(), THREADS);
}

#[test]
fn parallel_assignment_never_double_books_a_task() {
    let cfg = SwarmConfig::default();
    let bus = Arc::new(MessageBus::new(&cfg));
    let coord = Arc::new(SwarmCoordinator::new(bus, &cfg));
    for i in 0..4 {
        coord.register_agent(AgentHandle::new(
            format!("agent-{i}"),
            ConfidenceModel::default(),
        ));
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let coord = coord.clone();
            thread::spawn(move || {
                coord
                    .assign_task(TaskSpec::new(format!("t-{i}"), "x"))
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let active = coord.active_tasks();
    assert_eq!(active.len(), THREADS);

    // every task has exactly one owner, and load spread across agents
    let status = coord.get_swarm_status();
    let total_load: usize = status.agents.iter().map(|a| a.active_tasks).sum();
    assert_eq!(total_load, THREADS);
    assert!(status.agents.iter().all(|a| a.active_tasks > 0));
}
