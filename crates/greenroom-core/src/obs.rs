//! Structured observability hooks for swarm lifecycle events.
//!
//! Emission functions for the key moments: proposal opened/closed,
//! vote cast/rejected, task assigned/finished, message dropped.
//!
//! Events are emitted at `info!` level (filterable via `RUST_LOG`);
//! rejections and drops at `warn!`.

use tracing::{info, warn};

/// RAII guard that enters a swarm-scoped tracing span.
pub struct SwarmSpan {
    _span: tracing::span::EnteredSpan,
}

impl SwarmSpan {
    /// Create and enter a span tagged with a swarm label.
    pub fn enter(swarm: &str) -> Self {
        let span = tracing::info_span!("greenroom.swarm", swarm = %swarm);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a proposal opened for voting.
pub fn emit_proposal_opened(proposal_id: &str, proposer: &str, title: &str) {
    info!(
        event = "proposal.opened",
        proposal_id = %proposal_id,
        proposer = %proposer,
        title = %title,
    );
}

/// Emit event: a proposal closed or expired, with its winning options.
pub fn emit_proposal_closed(proposal_id: &str, how: &str, winners: &[String]) {
    info!(
        event = "proposal.closed",
        proposal_id = %proposal_id,
        how = %how,
        winners = ?winners,
    );
}

/// Emit event: a validated vote was recorded.
pub fn emit_vote_cast(proposal_id: &str, agent_id: &str, decision: &str, weight: f64) {
    info!(
        event = "vote.cast",
        proposal_id = %proposal_id,
        agent_id = %agent_id,
        decision = %decision,
        weight = weight,
    );
}

/// Emit event: a vote failed validation (warning level).
pub fn emit_vote_rejected(proposal_id: &str, agent_id: &str, reason: &str) {
    warn!(
        event = "vote.rejected",
        proposal_id = %proposal_id,
        agent_id = %agent_id,
        reason = %reason,
    );
}

/// Emit event: a task was assigned with its composite score.
pub fn emit_task_assigned(task_id: &str, agent_id: &str, score: f64) {
    info!(
        event = "task.assigned",
        task_id = %task_id,
        agent_id = %agent_id,
        score = score,
    );
}

/// Emit event: a task was reported complete or failed.
pub fn emit_task_finished(task_id: &str, agent_id: &str, success: bool) {
    info!(
        event = "task.finished",
        task_id = %task_id,
        agent_id = %agent_id,
        success = success,
    );
}

/// Emit event: a message addressed to an unknown agent was dropped
/// (warning level).
pub fn emit_message_dropped(sender: &str, recipient: &str) {
    warn!(
        event = "message.dropped",
        sender = %sender,
        recipient = %recipient,
    );
}
