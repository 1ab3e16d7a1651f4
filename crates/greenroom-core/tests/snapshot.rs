//! Integration test for the dashboard snapshot surface.

use std::sync::Arc;

use serde_json::json;

use greenroom_core::{
    AgentHandle, Ballot, ConfidenceModel, MessageBus, SwarmConfig, SwarmCoordinator,
    SwarmSnapshot, TaskSpec, VotingSystem,
};

#[test]
fn snapshot_is_computable_across_mixed_states() {
    let cfg = SwarmConfig::default();
    let bus = Arc::new(MessageBus::new(&cfg));
    let voting = VotingSystem::new(bus.clone(), &cfg);
    let coord = SwarmCoordinator::new(bus.clone(), &cfg);

    for id in ["clipper", "seo"] {
        bus.register_agent(id);
        coord.register_agent(AgentHandle::new(id, ConfidenceModel::default()));
    }

    // healthy proposal, plus one that accumulated validation errors
    let healthy = voting
        .create_proposal("clipper", "t1", "", vec!["yes".into(), "no".into()], None)
        .unwrap();
    voting.cast_vote(&healthy, "clipper", Ballot::new("yes", 1.0, 0.6));

    let messy = voting
        .create_proposal("seo", "t2", "", vec!["a".into()], None)
        .unwrap();
    voting.cast_vote(&messy, "seo", Ballot::new("off-menu", 1.0, 0.6));
    voting.close_proposal(&messy).unwrap();

    // one active task, one failed task
    coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();
    let second = coord.assign_task(TaskSpec::new("t-2", "x")).unwrap();
    coord.report_task_completion("t-2", &second, false, json!({"err": "encoder"}));

    let snap = SwarmSnapshot::capture(&bus, &voting, &coord);
    assert_eq!(snap.registered_agents, 2);
    assert_eq!(snap.open_proposals, 1);
    assert_eq!(snap.completed_proposals, 1);
    assert_eq!(snap.active_tasks, 1);
    assert_eq!(snap.finished_tasks, 1);
    assert_eq!(snap.agents.len(), 2);

    // serializable for the dashboard
    let rendered = serde_json::to_value(&snap).unwrap();
    assert_eq!(rendered["registered_agents"], 2);
}
