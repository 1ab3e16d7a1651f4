//! Task-to-agent assignment and swarm-wide health reporting.
//!
//! The coordinator is the single source of truth for which agent owns
//! which task. Assignment scores every registered agent by domain
//! match, current load, and overall confidence; the whole
//! pick-then-mark runs under one lock so two concurrent assignments
//! can never both select an agent whose load is about to change.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::bus::MessageBus;
use super::config::SwarmConfig;
use super::confidence::AgentHandle;
use super::message::{AgentMessage, MessageKind, Recipient};
use crate::metrics::METRICS;
use crate::obs;

/// A unit of work submitted to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_id: String,
    /// Kind of work, e.g. "clip-selection", "thumbnail", "seo-pass".
    pub task_type: String,
    /// Optional tag matched against agent domains alongside `task_type`.
    pub context: Option<String>,
    /// Optional difficulty hint in [0, 1].
    pub complexity: Option<f64>,
    /// Arbitrary caller metadata, passed through to the assignee.
    pub metadata: serde_json::Value,
}

impl TaskSpec {
    /// A task with no context, complexity, or metadata.
    pub fn new(task_id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_type: task_type.into(),
            context: None,
            complexity: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach a context tag (builder pattern).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a difficulty hint, clamped into [0, 1].
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = Some(complexity.clamp(0.0, 1.0));
        self
    }

    /// Attach caller metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A task currently owned by exactly one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub spec: TaskSpec,
    pub assigned_agent: String,
    pub assigned_at: DateTime<Utc>,
}

/// A task that has been reported complete or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedTask {
    pub spec: TaskSpec,
    pub assigned_agent: String,
    pub assigned_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    /// Result payload supplied by the reporting caller.
    pub result: serde_json::Value,
}

/// Per-agent line in the swarm status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLoad {
    pub agent_id: String,
    pub overall_confidence: f64,
    pub active_tasks: usize,
}

/// Aggregate swarm health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmStatus {
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    /// completed / (completed + failed); 0.0 before any task finishes.
    pub success_rate: f64,
    /// Wall-clock seconds since the coordinator was constructed.
    pub runtime_secs: f64,
    pub agents: Vec<AgentLoad>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    /// Registration order is the assignment tie-break.
    agents: Vec<AgentHandle>,
    active: BTreeMap<String, ActiveTask>,
    finished: Vec<FinishedTask>,
}

/// Assigns tasks to the best-fit agent and tracks their lifecycle.
#[derive(Debug)]
pub struct SwarmCoordinator {
    bus: Arc<MessageBus>,
    state: Mutex<CoordinatorState>,
    started_at: DateTime<Utc>,
    blend: [f64; 3],
}

impl SwarmCoordinator {
    /// Create a coordinator that announces assignments over `bus`.
    pub fn new(bus: Arc<MessageBus>, config: &SwarmConfig) -> Self {
        Self {
            bus,
            state: Mutex::new(CoordinatorState::default()),
            started_at: Utc::now(),
            blend: config.assignment_blend,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an agent for assignment. Registration order is retained
    /// and breaks scoring ties deterministically.
    ///
    /// Re-registering an id replaces the old handle in place.
    pub fn register_agent(&self, handle: AgentHandle) {
        let mut state = self.lock();
        match state
            .agents
            .iter_mut()
            .find(|h| h.agent_id() == handle.agent_id())
        {
            Some(existing) => *existing = handle,
            None => state.agents.push(handle),
        }
    }

    /// Remove an agent from the assignment pool.
    ///
    /// Tasks it already owns stay active until reported.
    pub fn unregister_agent(&self, agent_id: &str) {
        self.lock().agents.retain(|h| h.agent_id() != agent_id);
    }

    /// Best confidence among the agent's domains that match the task's
    /// context or type, case-insensitively in either direction.
    fn domain_match(handle: &AgentHandle, task: &TaskSpec) -> f64 {
        let needles: Vec<String> = task
            .context
            .iter()
            .map(|c| c.to_lowercase())
            .chain(std::iter::once(task.task_type.to_lowercase()))
            .collect();
        let model = handle.lock_confidence();
        model
            .domains()
            .iter()
            .filter(|(name, _)| {
                let name = name.to_lowercase();
                needles
                    .iter()
                    .any(|n| n.contains(&name) || name.contains(n))
            })
            .map(|(_, conf)| *conf)
            .fold(0.0, f64::max)
    }

    fn composite_score(&self, handle: &AgentHandle, task: &TaskSpec, load: usize) -> f64 {
        let [w_domain, w_load, w_conf] = self.blend;
        let domain = Self::domain_match(handle, task);
        let load_factor = 1.0 / (1.0 + load as f64);
        let overall = handle.lock_confidence().overall();
        // A harder task amplifies the confidence gap between agents.
        let conf_term = match task.complexity {
            Some(c) => 1.0 - c * (1.0 - overall),
            None => overall,
        };
        w_domain * domain + w_load * load_factor + w_conf * conf_term
    }

    /// Assign a task to the highest-scoring registered agent.
    ///
    /// Ties go to the earliest-registered agent. Returns `None` when no
    /// agents are registered; never an error. The winning agent also
    /// receives a `TaskAssignment` message if it is on the bus.
    pub fn assign_task(&self, task: TaskSpec) -> Option<String> {
        let assigned = {
            let mut state = self.lock();
            if state.agents.is_empty() {
                warn!(task_id = %task.task_id, "assignment skipped: no agents registered");
                return None;
            }

            let loads: BTreeMap<&str, usize> = state.agents.iter().map(|h| {
                let id = h.agent_id();
                let n = state
                    .active
                    .values()
                    .filter(|t| t.assigned_agent == id)
                    .count();
                (id, n)
            }).collect();

            let mut best: Option<(&AgentHandle, f64)> = None;
            for handle in &state.agents {
                let load = loads.get(handle.agent_id()).copied().unwrap_or(0);
                let score = self.composite_score(handle, &task, load);
                // strict greater-than keeps the first-registered on ties
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((handle, score));
                }
            }

            let (winner, score) = best?;
            let agent_id = winner.agent_id().to_string();
            obs::emit_task_assigned(&task.task_id, &agent_id, score);
            state.active.insert(
                task.task_id.clone(),
                ActiveTask {
                    spec: task.clone(),
                    assigned_agent: agent_id.clone(),
                    assigned_at: Utc::now(),
                },
            );
            agent_id
        };

        METRICS.inc_tasks_assigned();
        self.bus.send_message(AgentMessage::new(
            "coordinator",
            Recipient::Agent(assigned.clone()),
            MessageKind::TaskAssignment,
            json!({
                "task_id": task.task_id,
                "task_type": task.task_type,
                "context": task.context,
                "metadata": task.metadata,
            }),
        ));
        Some(assigned)
    }

    /// Report a task outcome.
    ///
    /// The task must be active and assigned to `agent_id`; anything else
    /// is a logged no-op returning `false`. A valid report moves the
    /// task to the finished list and feeds the outcome into the agent's
    /// confidence model.
    pub fn report_task_completion(
        &self,
        task_id: &str,
        agent_id: &str,
        success: bool,
        result: serde_json::Value,
    ) -> bool {
        let mut state = self.lock();
        let Some(active) = state.active.remove(task_id) else {
            warn!(task_id = %task_id, agent_id = %agent_id, "completion report for unknown task");
            return false;
        };
        if active.assigned_agent != agent_id {
            warn!(
                task_id = %task_id,
                agent_id = %agent_id,
                assigned = %active.assigned_agent,
                "completion report from wrong agent",
            );
            state.active.insert(task_id.to_string(), active);
            return false;
        }

        state.finished.push(FinishedTask {
            spec: active.spec,
            assigned_agent: active.assigned_agent,
            assigned_at: active.assigned_at,
            finished_at: Utc::now(),
            success,
            result,
        });

        if let Some(handle) = state.agents.iter().find(|h| h.agent_id() == agent_id) {
            let mut model = handle.lock_confidence();
            model.record_outcome(success);
            model.recompute_overall();
        }

        obs::emit_task_finished(task_id, agent_id, success);
        METRICS.inc_tasks_finished();
        true
    }

    /// Pull an active task back out of the swarm.
    ///
    /// Returns the original [`TaskSpec`] so the caller can resubmit it via
    /// [`assign_task`](Self::assign_task); `None` for unknown ids.
    pub fn requeue_task(&self, task_id: &str) -> Option<TaskSpec> {
        let removed = self.lock().active.remove(task_id);
        match removed {
            Some(active) => {
                warn!(task_id = %task_id, was_assigned = %active.assigned_agent, "task requeued");
                Some(active.spec)
            }
            None => None,
        }
    }

    /// Snapshot of currently active tasks.
    pub fn active_tasks(&self) -> Vec<ActiveTask> {
        self.lock().active.values().cloned().collect()
    }

    /// Snapshot of finished tasks, oldest first.
    pub fn finished_tasks(&self) -> Vec<FinishedTask> {
        self.lock().finished.clone()
    }

    /// Aggregate swarm health.
    ///
    /// The success rate is 0.0 (never NaN) before any task finishes.
    pub fn get_swarm_status(&self) -> SwarmStatus {
        let state = self.lock();
        let completed = state.finished.iter().filter(|t| t.success).count();
        let failed = state.finished.len() - completed;
        let success_rate = if state.finished.is_empty() {
            0.0
        } else {
            completed as f64 / state.finished.len() as f64
        };

        let agents = state
            .agents
            .iter()
            .map(|h| AgentLoad {
                agent_id: h.agent_id().to_string(),
                overall_confidence: h.lock_confidence().overall(),
                active_tasks: state
                    .active
                    .values()
                    .filter(|t| t.assigned_agent == h.agent_id())
                    .count(),
            })
            .collect();

        SwarmStatus {
            active_tasks: state.active.len(),
            completed_tasks: completed,
            failed_tasks: failed,
            success_rate,
            runtime_secs: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
            agents,
        }
    }

    /// Registered agent ids with current overall confidence, in
    /// registration order.
    pub fn agent_confidences(&self) -> Vec<(String, f64)> {
        self.lock()
            .agents
            .iter()
            .map(|h| (h.agent_id().to_string(), h.lock_confidence().overall()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::confidence::ConfidenceModel;
    use serde_json::json;

    fn coordinator() -> SwarmCoordinator {
        SwarmCoordinator::new(Arc::new(MessageBus::default()), &SwarmConfig::default())
    }

    fn agent(id: &str, overall: f64) -> AgentHandle {
        AgentHandle::new(id, ConfidenceModel::default().with_overall(overall))
    }

    #[test]
    fn test_empty_registry_returns_none() {
        let coord = coordinator();
        assert_eq!(coord.assign_task(TaskSpec::new("t-1", "clip-selection")), None);
    }

    #[test]
    fn test_equal_scores_pick_first_registered() {
        let coord = coordinator();
        coord.register_agent(agent("first", 0.6));
        coord.register_agent(agent("second", 0.6));
        for i in 0..5 {
            // report completion so load resets between rounds
            let id = format!("t-{i}");
            let picked = coord
                .assign_task(TaskSpec::new(id.clone(), "clip-selection"))
                .unwrap();
            assert_eq!(picked, "first");
            assert!(coord.report_task_completion(&id, "first", true, json!(null)));
        }
    }

    #[test]
    fn test_domain_match_beats_load_tie() {
        let coord = coordinator();
        coord.register_agent(agent("generalist", 0.6));
        coord.register_agent(AgentHandle::new(
            "editor",
            ConfidenceModel::default()
                .with_overall(0.6)
                .with_domains([("clip-selection", 0.9)]),
        ));
        let picked = coord.assign_task(TaskSpec::new("t-1", "clip-selection"));
        assert_eq!(picked.as_deref(), Some("editor"));
    }

    #[test]
    fn test_load_shifts_assignment() {
        let coord = coordinator();
        coord.register_agent(agent("a", 0.6));
        coord.register_agent(agent("b", 0.6));
        assert_eq!(
            coord.assign_task(TaskSpec::new("t-1", "x")).as_deref(),
            Some("a")
        );
        // a now carries a task, so b wins the next identical one
        assert_eq!(
            coord.assign_task(TaskSpec::new("t-2", "x")).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_context_matches_domains() {
        let coord = coordinator();
        coord.register_agent(agent("generalist", 0.6));
        coord.register_agent(AgentHandle::new(
            "comic",
            ConfidenceModel::default()
                .with_overall(0.6)
                .with_domains([("humor", 0.95)]),
        ));
        let task = TaskSpec::new("t-1", "script-pass").with_context("humor");
        assert_eq!(coord.assign_task(task).as_deref(), Some("comic"));
    }

    #[test]
    fn test_completion_feeds_confidence() {
        let coord = coordinator();
        let handle = agent("a", 0.5);
        coord.register_agent(handle.clone());
        coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();
        assert!(coord.report_task_completion("t-1", "a", false, json!({"err": "render"})));

        let model = handle.lock_confidence();
        // one failure in the window drags overall below neutral
        assert!(model.overall() < 0.5);
    }

    #[test]
    fn test_mismatched_report_is_noop() {
        let coord = coordinator();
        coord.register_agent(agent("a", 0.5));
        coord.register_agent(agent("b", 0.5));
        coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();

        assert!(!coord.report_task_completion("t-1", "b", true, json!(null)));
        assert!(!coord.report_task_completion("ghost", "a", true, json!(null)));
        assert_eq!(coord.active_tasks().len(), 1);
    }

    #[test]
    fn test_requeue_returns_spec() {
        let coord = coordinator();
        coord.register_agent(agent("a", 0.5));
        let spec = TaskSpec::new("t-1", "x").with_context("humor");
        coord.assign_task(spec.clone()).unwrap();

        assert_eq!(coord.requeue_task("t-1"), Some(spec.clone()));
        assert!(coord.active_tasks().is_empty());
        // and it can be assigned again
        assert!(coord.assign_task(spec).is_some());
    }

    #[test]
    fn test_status_success_rate() {
        let coord = coordinator();
        coord.register_agent(agent("a", 0.5));

        let status = coord.get_swarm_status();
        assert_eq!(status.success_rate, 0.0); // no completions, not NaN

        for (i, ok) in [true, true, false].into_iter().enumerate() {
            let id = format!("t-{i}");
            coord.assign_task(TaskSpec::new(id.clone(), "x")).unwrap();
            coord.report_task_completion(&id, "a", ok, json!(null));
        }
        let status = coord.get_swarm_status();
        assert_eq!(status.completed_tasks, 2);
        assert_eq!(status.failed_tasks, 1);
        assert!((status.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!(status.runtime_secs >= 0.0);
    }

    #[test]
    fn test_assignment_announced_on_bus() {
        let bus = Arc::new(MessageBus::default());
        bus.register_agent("a");
        let coord = SwarmCoordinator::new(bus.clone(), &SwarmConfig::default());
        coord.register_agent(agent("a", 0.5));
        coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();

        let inbox = bus.get_messages("a");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, MessageKind::TaskAssignment);
    }

    #[test]
    fn test_unregister_keeps_active_tasks() {
        let coord = coordinator();
        coord.register_agent(agent("a", 0.5));
        coord.assign_task(TaskSpec::new("t-1", "x")).unwrap();
        coord.unregister_agent("a");

        assert_eq!(coord.active_tasks().len(), 1);
        // completion still accepted; confidence feedback is skipped
        assert!(coord.report_task_completion("t-1", "a", true, json!(null)));
    }
}
