//! Swarm coordination core for the production pipeline.
//!
//! Four cooperating components, built leaves-first:
//!
//! - **[`ConfidenceModel`]** — turns an agent's outcome history into a
//!   voting weight and an abstention decision.
//! - **[`MessageBus`]** — point-to-point, broadcast, and channel
//!   delivery between registered agents, with a bounded history.
//! - **[`VotingSystem`]** — weighted, validated vote proposals with
//!   attendance, conversation, and audit logs.
//! - **[`SwarmCoordinator`]** — composite-score task assignment and
//!   swarm health reporting.
//!
//! All components are lock-guarded and synchronous: every operation is
//! a bounded in-memory update, so the core embeds equally well under a
//! single control loop or many caller threads.

pub mod bus;
pub mod config;
pub mod confidence;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod proposal;
pub mod snapshot;
pub mod voting;

pub use bus::MessageBus;
pub use config::SwarmConfig;
pub use confidence::{AgentHandle, ConfidenceModel};
pub use coordinator::{
    ActiveTask, AgentLoad, FinishedTask, SwarmCoordinator, SwarmStatus, TaskSpec,
};
pub use error::{SwarmError, SwarmResult};
pub use message::{AgentMessage, MessageKind, Recipient};
pub use proposal::{
    Attendance, Ballot, ConversationEntry, ProposalStatus, VoteProposal, VoteRejection,
};
pub use snapshot::SwarmSnapshot;
pub use voting::{OptionTally, VoteOutcome, VoteSummary, VotingSystem};
