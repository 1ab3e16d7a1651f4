//! Integration tests for task assignment and swarm health reporting.

use std::sync::Arc;

use serde_json::json;

use greenroom_core::{
    AgentHandle, ConfidenceModel, MessageBus, SwarmConfig, SwarmCoordinator, TaskSpec,
};

fn coordinator() -> SwarmCoordinator {
    SwarmCoordinator::new(Arc::new(MessageBus::default()), &SwarmConfig::default())
}

fn editor(id: &str, domain: &str, conf: f64) -> AgentHandle {
    AgentHandle::new(
        id,
        ConfidenceModel::default()
            .with_overall(0.6)
            .with_domains([(domain, conf)]),
    )
}

// ── Scenario: no agents registered ──

#[test]
fn assignment_with_no_agents_returns_none() {
    let coord = coordinator();
    assert!(coord.assign_task(TaskSpec::new("t-1", "clip-selection")).is_none());
}

// ── P7: deterministic tie-break ──

#[test]
fn equal_composite_scores_always_pick_first_registered() {
    for _ in 0..10 {
        let coord = coordinator();
        coord.register_agent(AgentHandle::new(
            "first",
            ConfidenceModel::default().with_overall(0.7),
        ));
        coord.register_agent(AgentHandle::new(
            "second",
            ConfidenceModel::default().with_overall(0.7),
        ));
        assert_eq!(
            coord.assign_task(TaskSpec::new("t-1", "x")).as_deref(),
            Some("first")
        );
    }
}

// ── Domain-aware routing ──

#[test]
fn tasks_route_to_matching_specialists() {
    let coord = coordinator();
    coord.register_agent(editor("clipper", "clip-selection", 0.9));
    coord.register_agent(editor("seo", "seo", 0.9));
    coord.register_agent(editor("thumbs", "thumbnail", 0.9));

    assert_eq!(
        coord.assign_task(TaskSpec::new("t-1", "clip-selection")).as_deref(),
        Some("clipper")
    );
    assert_eq!(
        coord
            .assign_task(TaskSpec::new("t-2", "metadata").with_context("seo"))
            .as_deref(),
        Some("seo")
    );
    assert_eq!(
        coord.assign_task(TaskSpec::new("t-3", "thumbnail")).as_deref(),
        Some("thumbs")
    );
}

// ── Load balancing ──

#[test]
fn busy_agents_yield_to_idle_peers() {
    let coord = coordinator();
    coord.register_agent(AgentHandle::new("a", ConfidenceModel::default()));
    coord.register_agent(AgentHandle::new("b", ConfidenceModel::default()));

    let first = coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();
    let second = coord.assign_task(TaskSpec::new("t-2", "x")).unwrap();
    assert_ne!(first, second);
}

// ── Completion lifecycle ──

#[test]
fn completion_moves_task_and_updates_confidence() {
    let coord = coordinator();
    let handle = AgentHandle::new("a", ConfidenceModel::default());
    coord.register_agent(handle.clone());

    coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();
    assert_eq!(coord.active_tasks().len(), 1);

    assert!(coord.report_task_completion("t-1", "a", true, json!({"clip": "ep42-03.mp4"})));
    assert!(coord.active_tasks().is_empty());

    let finished = coord.finished_tasks();
    assert_eq!(finished.len(), 1);
    assert!(finished[0].success);
    assert_eq!(finished[0].result["clip"], "ep42-03.mp4");

    // success pushed the rolling window above neutral
    assert!(handle.lock_confidence().overall() > 0.5);
}

#[test]
fn duplicate_completion_report_is_rejected() {
    let coord = coordinator();
    coord.register_agent(AgentHandle::new("a", ConfidenceModel::default()));
    coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();

    assert!(coord.report_task_completion("t-1", "a", true, json!(null)));
    assert!(!coord.report_task_completion("t-1", "a", true, json!(null)));
    assert_eq!(coord.finished_tasks().len(), 1);
}

// ── Requeue ──

#[test]
fn requeued_task_is_assignable_again() {
    let coord = coordinator();
    coord.register_agent(AgentHandle::new("a", ConfidenceModel::default()));

    let spec = TaskSpec::new("t-1", "x");
    coord.assign_task(spec.clone()).unwrap();
    let recovered = coord.requeue_task("t-1").unwrap();
    assert_eq!(recovered, spec);

    // a completion report for the requeued task is a no-op
    assert!(!coord.report_task_completion("t-1", "a", true, json!(null)));

    assert!(coord.assign_task(recovered).is_some());
}

// ── Swarm status ──

#[test]
fn status_reflects_outcomes_without_nan() {
    let coord = coordinator();
    coord.register_agent(AgentHandle::new("a", ConfidenceModel::default()));

    let empty = coord.get_swarm_status();
    assert_eq!(empty.success_rate, 0.0);
    assert_eq!(empty.agents.len(), 1);

    for (i, ok) in [true, false, true, true].into_iter().enumerate() {
        let id = format!("t-{i}");
        coord.assign_task(TaskSpec::new(id.clone(), "x")).unwrap();
        coord.report_task_completion(&id, "a", ok, json!(null));
    }

    let status = coord.get_swarm_status();
    assert_eq!(status.completed_tasks, 3);
    assert_eq!(status.failed_tasks, 1);
    assert!((status.success_rate - 0.75).abs() < 1e-9);
    assert_eq!(status.agents[0].active_tasks, 0);
}
