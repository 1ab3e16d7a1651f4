//! Greenroom Core Library
//!
//! Coordination core for a swarm of content-production agents: an
//! in-process message bus, confidence-weighted democratic voting, and
//! load-aware task assignment, plus the observability surface over all
//! three.

pub mod metrics;
pub mod obs;
pub mod swarm;
pub mod telemetry;

pub use swarm::{
    ActiveTask, AgentHandle, AgentLoad, AgentMessage, Attendance, Ballot, ConfidenceModel,
    ConversationEntry, FinishedTask, MessageBus, MessageKind, OptionTally, ProposalStatus,
    Recipient, SwarmConfig, SwarmCoordinator, SwarmError, SwarmResult, SwarmSnapshot, SwarmStatus,
    TaskSpec, VoteOutcome, VoteProposal, VoteRejection, VoteSummary, VotingSystem,
};

pub use metrics::METRICS;
pub use obs::SwarmSpan;
pub use telemetry::init_tracing;
