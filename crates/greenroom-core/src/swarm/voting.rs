//! Democratic decision aggregation with validation, weighting, and
//! auditability.
//!
//! The [`VotingSystem`] owns every proposal, validates each vote against
//! the proposal's option set and status, and computes weighted tallies.
//! Vote-related notices (proposal opened, proposal closed) go out over
//! the [`MessageBus`] so agents learn about decision points the same way
//! they learn about everything else.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::bus::MessageBus;
use super::config::SwarmConfig;
use super::confidence::AgentHandle;
use super::error::{SwarmError, SwarmResult};
use super::message::{AgentMessage, MessageKind, Recipient};
use super::proposal::{Attendance, Ballot, ConversationEntry, ProposalStatus, VoteProposal, VoteRejection};
use crate::metrics::METRICS;
use crate::obs;

/// Per-option slice of a tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTally {
    /// Summed weight of votes for this option.
    pub weight: f64,
    /// Number of votes for this option.
    pub count: usize,
    /// Share of the total cast weight, in [0, 100].
    pub percentage: f64,
}

/// Weighted tally over a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub proposal_id: String,
    pub status: ProposalStatus,
    /// Number of recorded votes (one per agent).
    pub total_votes: usize,
    /// Summed weight across all options.
    pub total_weight: f64,
    /// Tally per option, every option present.
    pub results: BTreeMap<String, OptionTally>,
    /// Share of bus-registered agents that did not vote, in [0, 1].
    pub abstention_rate: f64,
}

/// Result of closing a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub proposal_id: String,
    /// Strictly-max-weight options. More than one entry is an exact
    /// tie, left to the caller to break.
    pub winners: Vec<String>,
    pub summary: VoteSummary,
    /// For each voter, whether its decision landed in `winners`.
    ///
    /// The caller feeds this into each agent's
    /// `ConfidenceModel::record_vote_outcome`; applying the feedback only
    /// at close time keeps the tally free of self-referential weighting.
    pub aligned: BTreeMap<String, bool>,
}

#[derive(Debug, Default)]
struct VotingState {
    open: BTreeMap<String, VoteProposal>,
    completed: BTreeMap<String, VoteProposal>,
}

/// Registry and engine for vote proposals.
#[derive(Debug)]
pub struct VotingSystem {
    bus: Arc<MessageBus>,
    state: Mutex<VotingState>,
    default_expiry_secs: Option<u64>,
}

impl VotingSystem {
    /// Create a voting system that announces proposals over `bus`.
    pub fn new(bus: Arc<MessageBus>, config: &SwarmConfig) -> Self {
        Self {
            bus,
            state: Mutex::new(VotingState::default()),
            default_expiry_secs: config.proposal_expiry_secs,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VotingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a proposal with the default expiry and broadcast a
    /// vote request.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::EmptyOptions`] when `options` is empty
    /// after de-duplication.
    pub fn create_proposal(
        &self,
        proposer: &str,
        title: &str,
        description: &str,
        options: Vec<String>,
        context: Option<String>,
    ) -> SwarmResult<String> {
        self.create_proposal_with_expiry(
            proposer,
            title,
            description,
            options,
            context,
            self.default_expiry_secs,
        )
    }

    /// Open a proposal with an explicit lifetime (`None` never expires).
    pub fn create_proposal_with_expiry(
        &self,
        proposer: &str,
        title: &str,
        description: &str,
        options: Vec<String>,
        context: Option<String>,
        expiry_secs: Option<u64>,
    ) -> SwarmResult<String> {
        let proposal = VoteProposal::new(
            proposer,
            title,
            description,
            options,
            context,
            expiry_secs,
            Utc::now(),
        );
        if proposal.options.is_empty() {
            return Err(SwarmError::EmptyOptions);
        }

        let proposal_id = proposal.proposal_id.clone();
        let notice = AgentMessage::new(
            proposer,
            Recipient::Broadcast,
            MessageKind::VoteRequest,
            json!({
                "proposal_id": proposal_id,
                "title": proposal.title,
                "options": proposal.options,
                "context": proposal.context,
            }),
        );

        self.lock().open.insert(proposal_id.clone(), proposal);
        obs::emit_proposal_opened(&proposal_id, proposer, title);
        self.bus.send_message(notice);
        Ok(proposal_id)
    }

    /// If the proposal's lifetime elapsed, mark it expired and archive it.
    /// Returns the map the proposal now lives in.
    fn settle_expiry<'a>(
        state: &'a mut VotingState,
        proposal_id: &str,
    ) -> Option<&'a mut VoteProposal> {
        let expired = state
            .open
            .get(proposal_id)
            .is_some_and(|p| p.is_expired_at(Utc::now()));
        if expired {
            // remove/insert keeps the archival collection authoritative
            if let Some(mut p) = state.open.remove(proposal_id) {
                p.status = ProposalStatus::Expired;
                obs::emit_proposal_closed(proposal_id, "expired", &[]);
                state.completed.insert(proposal_id.to_string(), p);
            }
        }
        if state.open.contains_key(proposal_id) {
            return state.open.get_mut(proposal_id);
        }
        state.completed.get_mut(proposal_id)
    }

    /// Record a pre-computed ballot for an agent.
    ///
    /// Returns `false` — with a `validation_errors` entry on the
    /// proposal where one exists — when the proposal is unknown, no
    /// longer open, or the decision is not in the option set. A rejected
    /// vote never touches `votes`. An accepted vote overwrites any prior
    /// ballot from the same agent and marks it present.
    pub fn cast_vote(&self, proposal_id: &str, agent_id: &str, ballot: Ballot) -> bool {
        let mut state = self.lock();
        let Some(proposal) = Self::settle_expiry(&mut state, proposal_id) else {
            warn!(proposal_id = %proposal_id, agent_id = %agent_id, "vote on unknown proposal");
            METRICS.inc_votes_rejected();
            return false;
        };

        if !proposal.status.is_open() {
            proposal.validation_errors.push(VoteRejection {
                agent_id: agent_id.to_string(),
                attempted_decision: ballot.decision,
                reason: format!("proposal {}", proposal.status),
                timestamp: Utc::now(),
            });
            obs::emit_vote_rejected(proposal_id, agent_id, "proposal not open");
            METRICS.inc_votes_rejected();
            return false;
        }

        if !proposal.options.contains(&ballot.decision) {
            proposal.validation_errors.push(VoteRejection {
                agent_id: agent_id.to_string(),
                attempted_decision: ballot.decision,
                reason: "decision not in option set".to_string(),
                timestamp: Utc::now(),
            });
            obs::emit_vote_rejected(proposal_id, agent_id, "decision not in option set");
            METRICS.inc_votes_rejected();
            return false;
        }

        obs::emit_vote_cast(proposal_id, agent_id, &ballot.decision, ballot.weight);
        proposal.votes.insert(agent_id.to_string(), ballot);
        proposal
            .attendance
            .insert(agent_id.to_string(), Attendance::Present);
        METRICS.inc_votes_cast();
        true
    }

    /// Cast a vote on an agent's behalf, deriving the ballot from its
    /// confidence model.
    ///
    /// The proposal's `context` tag selects the domain for weighting.
    /// When the model says to abstain, attendance is recorded as
    /// [`Attendance::Abstained`] and no vote is cast.
    pub fn cast_vote_with(&self, proposal_id: &str, agent: &AgentHandle, decision: &str) -> bool {
        let context = {
            let state = self.lock();
            state
                .open
                .get(proposal_id)
                .and_then(|p| p.context.clone())
        };
        let (abstain, ballot) = {
            let model = agent.lock_confidence();
            let domain = context.as_deref();
            (
                model.should_abstain(domain),
                Ballot::new(
                    decision,
                    model.get_voting_weight(domain),
                    model.overall(),
                ),
            )
        };
        if abstain {
            self.record_attendance(proposal_id, agent.agent_id(), Attendance::Abstained);
            return false;
        }
        self.cast_vote(proposal_id, agent.agent_id(), ballot)
    }

    /// Record an agent's attendance on an open proposal.
    pub fn record_attendance(&self, proposal_id: &str, agent_id: &str, status: Attendance) -> bool {
        let mut state = self.lock();
        let Some(proposal) = Self::settle_expiry(&mut state, proposal_id) else {
            return false;
        };
        if !proposal.status.is_open() {
            return false;
        }
        proposal.attendance.insert(agent_id.to_string(), status);
        true
    }

    /// Append to a proposal's discussion log.
    pub fn log_conversation(
        &self,
        proposal_id: &str,
        agent_id: &str,
        text: impl Into<String>,
        kind: impl Into<String>,
    ) -> bool {
        let mut state = self.lock();
        let Some(proposal) = Self::settle_expiry(&mut state, proposal_id) else {
            return false;
        };
        if !proposal.status.is_open() {
            return false;
        }
        proposal.conversation_log.push(ConversationEntry {
            agent_id: agent_id.to_string(),
            text: text.into(),
            kind: kind.into(),
            timestamp: Utc::now(),
        });
        true
    }

    fn summarize(proposal: &VoteProposal, registered_agents: usize) -> VoteSummary {
        let total_weight = proposal.total_weight();
        let weights = proposal.weight_by_option();

        let mut results = BTreeMap::new();
        for option in &proposal.options {
            let weight = weights.get(option).copied().unwrap_or(0.0);
            let count = proposal
                .votes
                .values()
                .filter(|b| &b.decision == option)
                .count();
            let percentage = if total_weight > 0.0 {
                weight / total_weight * 100.0
            } else {
                0.0
            };
            results.insert(
                option.clone(),
                OptionTally {
                    weight,
                    count,
                    percentage,
                },
            );
        }

        let abstention_rate = if registered_agents > 0 {
            let non_voters = registered_agents.saturating_sub(proposal.votes.len());
            non_voters as f64 / registered_agents as f64
        } else {
            0.0
        };

        VoteSummary {
            proposal_id: proposal.proposal_id.clone(),
            status: proposal.status,
            total_votes: proposal.votes.len(),
            total_weight,
            results,
            abstention_rate,
        }
    }

    /// Weighted tally for a proposal in any status.
    ///
    /// Percentages are computed against total cast weight; the
    /// abstention rate against currently bus-registered agents.
    pub fn get_vote_summary(&self, proposal_id: &str) -> Option<VoteSummary> {
        let registered = self.bus.agent_count();
        let mut state = self.lock();
        let proposal = Self::settle_expiry(&mut state, proposal_id)?;
        Some(Self::summarize(proposal, registered))
    }

    /// Close a proposal, compute the outcome, and broadcast a vote notice.
    ///
    /// The proposal becomes read-only and moves to the archival
    /// collection.
    ///
    /// # Errors
    ///
    /// [`SwarmError::ProposalNotFound`] for unknown ids and
    /// [`SwarmError::ProposalNotOpen`] when it already closed or expired.
    pub fn close_proposal(&self, proposal_id: &str) -> SwarmResult<VoteOutcome> {
        let registered = self.bus.agent_count();
        let outcome = {
            let mut state = self.lock();
            let Some(settled) = Self::settle_expiry(&mut state, proposal_id) else {
                return Err(SwarmError::ProposalNotFound(proposal_id.to_string()));
            };
            if !settled.status.is_open() {
                return Err(SwarmError::ProposalNotOpen {
                    proposal_id: proposal_id.to_string(),
                    status: settled.status.to_string(),
                });
            }

            let mut proposal = state
                .open
                .remove(proposal_id)
                .ok_or_else(|| SwarmError::ProposalNotFound(proposal_id.to_string()))?;
            proposal.status = ProposalStatus::Closed;

            let winners = proposal.winning_options();
            let aligned: BTreeMap<String, bool> = proposal
                .votes
                .iter()
                .map(|(agent, ballot)| (agent.clone(), winners.contains(&ballot.decision)))
                .collect();
            let summary = Self::summarize(&proposal, registered);

            obs::emit_proposal_closed(proposal_id, "closed", &winners);
            state.completed.insert(proposal_id.to_string(), proposal);

            VoteOutcome {
                proposal_id: proposal_id.to_string(),
                winners,
                summary,
                aligned,
            }
        };

        self.bus.send_message(AgentMessage::new(
            "voting-system",
            Recipient::Broadcast,
            MessageKind::VoteNotice,
            json!({
                "proposal_id": outcome.proposal_id,
                "winners": outcome.winners,
                "total_votes": outcome.summary.total_votes,
            }),
        ));
        Ok(outcome)
    }

    /// Snapshot of a proposal in any status.
    pub fn get_proposal(&self, proposal_id: &str) -> Option<VoteProposal> {
        let mut state = self.lock();
        Self::settle_expiry(&mut state, proposal_id).map(|p| p.clone())
    }

    /// Ids of proposals still accepting votes.
    pub fn open_proposals(&self) -> Vec<String> {
        self.lock().open.keys().cloned().collect()
    }

    /// (open, completed) proposal counts.
    pub fn proposal_counts(&self) -> (usize, usize) {
        let state = self.lock();
        (state.open.len(), state.completed.len())
    }
}
