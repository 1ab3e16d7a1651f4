//! Vote proposals — the aggregate for one democratic decision point.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes, attendance, and conversation.
    Open,
    /// Explicitly closed; read-only.
    Closed,
    /// Lifetime elapsed before close; read-only.
    Expired,
}

impl ProposalStatus {
    /// Whether the proposal still accepts changes.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// One agent's recorded vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    /// The chosen option; always a member of the proposal's option set.
    pub decision: String,
    /// Influence multiplier, strictly positive.
    pub weight: f64,
    /// The agent's confidence in its decision, in [0, 1].
    pub confidence: f64,
}

impl Ballot {
    /// A ballot with the given weight and confidence.
    pub fn new(decision: impl Into<String>, weight: f64, confidence: f64) -> Self {
        Self {
            decision: decision.into(),
            weight: weight.max(f64::MIN_POSITIVE),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Attendance status, tracked separately from voting.
///
/// `Abstained` means the agent showed up and declined to vote on
/// confidence grounds; `Absent` means it never engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Present,
    Absent,
    Abstained,
}

/// One entry in a proposal's free-text discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub agent_id: String,
    pub text: String,
    /// Caller-defined category, e.g. "argument", "question", "joke-pitch".
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

/// Diagnostic for a vote that was rejected by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRejection {
    pub agent_id: String,
    pub attempted_decision: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// A single democratic decision point with a fixed option set.
///
/// Created open; votes, attendance, and conversation accumulate until
/// the proposal is closed or expires, after which it is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteProposal {
    pub proposal_id: String,
    pub proposer: String,
    pub title: String,
    pub description: String,
    /// Non-empty, de-duplicated, in first-appearance order.
    pub options: Vec<String>,
    /// Optional classification tag, matched against agent domains.
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Deadline after which votes are rejected. `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub status: ProposalStatus,
    /// Last validated vote per agent.
    pub votes: BTreeMap<String, Ballot>,
    pub attendance: BTreeMap<String, Attendance>,
    /// Append-only discussion log.
    pub conversation_log: Vec<ConversationEntry>,
    /// Append-only rejected-vote diagnostics.
    pub validation_errors: Vec<VoteRejection>,
}

impl VoteProposal {
    /// Create an open proposal. Options are de-duplicated preserving
    /// first-appearance order; the caller has already rejected empty sets.
    pub(crate) fn new(
        proposer: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        options: Vec<String>,
        context: Option<String>,
        expiry_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(options.len());
        for opt in options {
            if !deduped.contains(&opt) {
                deduped.push(opt);
            }
        }
        Self {
            proposal_id: Uuid::new_v4().to_string(),
            proposer: proposer.into(),
            title: title.into(),
            description: description.into(),
            options: deduped,
            context,
            created_at: now,
            expires_at: expiry_secs.map(|s| now + chrono::Duration::seconds(s as i64)),
            status: ProposalStatus::Open,
            votes: BTreeMap::new(),
            attendance: BTreeMap::new(),
            conversation_log: Vec::new(),
            validation_errors: Vec::new(),
        }
    }

    /// Whether the proposal's lifetime has elapsed at the given time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Total weight cast so far across all options.
    pub fn total_weight(&self) -> f64 {
        self.votes.values().map(|b| b.weight).sum()
    }

    /// Summed weight per option, for every option in the set.
    pub fn weight_by_option(&self) -> BTreeMap<String, f64> {
        let mut weights: BTreeMap<String, f64> =
            self.options.iter().map(|o| (o.clone(), 0.0)).collect();
        for ballot in self.votes.values() {
            if let Some(w) = weights.get_mut(&ballot.decision) {
                *w += ballot.weight;
            }
        }
        weights
    }

    /// Options carrying the strictly greatest total weight.
    ///
    /// More than one entry means an exact tie; the decision is the
    /// caller's, never silently broken here. Empty when no votes were
    /// cast.
    pub fn winning_options(&self) -> Vec<String> {
        if self.votes.is_empty() {
            return Vec::new();
        }
        let weights = self.weight_by_option();
        let max = weights.values().cloned().fold(f64::MIN, f64::max);
        self.options
            .iter()
            .filter(|o| weights.get(*o).is_some_and(|w| (*w - max).abs() < 1e-12))
            .cloned()
            .collect()
    }
}
