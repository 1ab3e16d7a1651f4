//! Read-only snapshot over the whole coordination core.
//!
//! Consumed by dashboards; pure read, no side effects, and always
//! computable even while individual proposals or tasks are in an error
//! state.

use serde::{Deserialize, Serialize};

use super::bus::MessageBus;
use super::coordinator::{AgentLoad, SwarmCoordinator};
use super::voting::VotingSystem;

/// Point-in-time view of bus, voting system, and coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmSnapshot {
    /// Agents registered on the bus.
    pub registered_agents: usize,
    /// Messages retained in the bus history.
    pub history_len: usize,
    pub open_proposals: usize,
    pub completed_proposals: usize,
    pub active_tasks: usize,
    pub finished_tasks: usize,
    /// Coordinator-registered agents with confidence and load.
    pub agents: Vec<AgentLoad>,
}

impl SwarmSnapshot {
    /// Capture the current state of all three components.
    pub fn capture(
        bus: &MessageBus,
        voting: &VotingSystem,
        coordinator: &SwarmCoordinator,
    ) -> Self {
        let (open, completed) = voting.proposal_counts();
        let status = coordinator.get_swarm_status();
        Self {
            registered_agents: bus.agent_count(),
            history_len: bus.history().len(),
            open_proposals: open,
            completed_proposals: completed,
            active_tasks: status.active_tasks,
            finished_tasks: status.completed_tasks + status.failed_tasks,
            agents: status.agents,
        }
    }
}
