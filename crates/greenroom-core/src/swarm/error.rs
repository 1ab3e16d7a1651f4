//! Error taxonomy for the swarm coordination core.
//!
//! Soft lookup failures (unknown recipient on send, unknown proposal on a
//! read path) are reported through return values, not errors, so one
//! misbehaving caller cannot take the bus or coordinator down for others.
//! `SwarmError` covers the cases where an operation cannot produce a
//! meaningful result at all.

/// Errors produced by the swarm coordination core.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error("proposal options must not be empty")]
    EmptyOptions,

    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("proposal {proposal_id} is {status} and no longer accepts changes")]
    ProposalNotOpen {
        proposal_id: String,
        status: String,
    },

    #[error("agent not registered: {0}")]
    AgentNotRegistered(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task {task_id} is not assigned to {agent_id}")]
    AssignmentMismatch { task_id: String, agent_id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for swarm operations.
pub type SwarmResult<T> = std::result::Result<T, SwarmError>;
