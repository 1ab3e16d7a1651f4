//! Per-agent confidence tracking and the agent registration handle.
//!
//! A [`ConfidenceModel`] turns an agent's outcome history into a single
//! decision signal: a voting weight and an abstention decision. The
//! model is owned by its agent; the core only reads it through an
//! [`AgentHandle`].

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::config::SwarmConfig;

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Rolling confidence state for one agent.
///
/// `overall` is recomputed deterministically from four factors
/// (recent outcomes, voting accuracy, communication effectiveness,
/// mean domain confidence). Each factor defaults to a neutral 0.5
/// when it has no data, so a fresh model neither starves nor inflates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceModel {
    overall: f64,
    domains: BTreeMap<String, f64>,
    tools: BTreeMap<String, f64>,
    recent_performance: VecDeque<bool>,
    window: usize,
    total_votes: u64,
    successful_votes: u64,
    total_communications: u64,
    effective_communications: u64,
    abstention_threshold: f64,
    min_weight: f64,
    max_weight: f64,
    blend: [f64; 4],
}

impl Default for ConfidenceModel {
    fn default() -> Self {
        Self::new(&SwarmConfig::default())
    }
}

impl ConfidenceModel {
    /// Create a fresh model at neutral confidence.
    pub fn new(config: &SwarmConfig) -> Self {
        Self {
            overall: 0.5,
            domains: BTreeMap::new(),
            tools: BTreeMap::new(),
            recent_performance: VecDeque::with_capacity(config.performance_window),
            window: config.performance_window.max(1),
            total_votes: 0,
            successful_votes: 0,
            total_communications: 0,
            effective_communications: 0,
            abstention_threshold: config.abstention_threshold,
            min_weight: config.min_voting_weight,
            max_weight: config.max_voting_weight,
            blend: config.confidence_blend,
        }
    }

    /// Seed domain confidences (builder pattern). Values are clamped into [0, 1].
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        for (name, v) in domains {
            self.domains.insert(name.into(), clamp_unit(v));
        }
        self
    }

    /// Seed tool confidences (builder pattern). Values are clamped into [0, 1].
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        for (name, v) in tools {
            self.tools.insert(name.into(), clamp_unit(v));
        }
        self
    }

    /// Force the overall score, clamped into [0, 1].
    ///
    /// Intended for seeding simulations; real callers let
    /// [`recompute_overall`](Self::recompute_overall) derive it.
    pub fn with_overall(mut self, overall: f64) -> Self {
        self.overall = clamp_unit(overall);
        self
    }

    /// Current overall confidence, always in [0, 1].
    pub fn overall(&self) -> f64 {
        self.overall
    }

    /// Confidence for a named domain, if tracked.
    pub fn domain(&self, name: &str) -> Option<f64> {
        self.domains.get(name).copied()
    }

    /// Confidence for a named tool, if tracked.
    pub fn tool(&self, name: &str) -> Option<f64> {
        self.tools.get(name).copied()
    }

    /// Tracked domain names and confidences.
    pub fn domains(&self) -> &BTreeMap<String, f64> {
        &self.domains
    }

    /// Record a task outcome into the rolling window (oldest evicted).
    ///
    /// Does not recompute `overall`; call
    /// [`recompute_overall`](Self::recompute_overall) when the batch of
    /// updates is done.
    pub fn record_outcome(&mut self, success: bool) {
        if self.recent_performance.len() == self.window {
            self.recent_performance.pop_front();
        }
        self.recent_performance.push_back(success);
    }

    /// Record whether a cast vote ended up aligned with the closed
    /// proposal's winning option.
    pub fn record_vote_outcome(&mut self, success: bool) {
        self.total_votes += 1;
        if success {
            self.successful_votes += 1;
        }
    }

    /// Record whether a sent message achieved its purpose.
    pub fn record_communication(&mut self, effective: bool) {
        self.total_communications += 1;
        if effective {
            self.effective_communications += 1;
        }
    }

    fn recent_ratio(&self) -> f64 {
        if self.recent_performance.is_empty() {
            return 0.5;
        }
        let ok = self.recent_performance.iter().filter(|s| **s).count();
        ok as f64 / self.recent_performance.len() as f64
    }

    fn vote_ratio(&self) -> f64 {
        if self.total_votes == 0 {
            return 0.5;
        }
        self.successful_votes as f64 / self.total_votes as f64
    }

    fn comm_ratio(&self) -> f64 {
        if self.total_communications == 0 {
            return 0.5;
        }
        self.effective_communications as f64 / self.total_communications as f64
    }

    fn domain_mean(&self) -> f64 {
        if self.domains.is_empty() {
            return 0.5;
        }
        self.domains.values().sum::<f64>() / self.domains.len() as f64
    }

    /// Recompute `overall` from the weighted blend of the four factors.
    ///
    /// Returns the new value.
    pub fn recompute_overall(&mut self) -> f64 {
        let [w_recent, w_vote, w_comm, w_domain] = self.blend;
        self.overall = clamp_unit(
            w_recent * self.recent_ratio()
                + w_vote * self.vote_ratio()
                + w_comm * self.comm_ratio()
                + w_domain * self.domain_mean(),
        );
        self.overall
    }

    /// Whether this agent should sit a vote out.
    ///
    /// Uses the domain confidence when `domain` is given and tracked,
    /// the overall score otherwise. Unknown domains fall back to
    /// overall rather than erroring.
    pub fn should_abstain(&self, domain: Option<&str>) -> bool {
        let score = domain
            .and_then(|d| self.domains.get(d).copied())
            .unwrap_or(self.overall);
        score < self.abstention_threshold
    }

    /// Voting weight derived from confidence, clamped so no agent ever
    /// contributes zero or unbounded influence.
    ///
    /// With a tracked domain the weight is the mean of overall and the
    /// domain confidence; unknown domains fall back to overall alone.
    pub fn get_voting_weight(&self, domain: Option<&str>) -> f64 {
        let base = match domain.and_then(|d| self.domains.get(d).copied()) {
            Some(dc) => (self.overall + dc) / 2.0,
            None => self.overall,
        };
        base.clamp(self.min_weight, self.max_weight)
    }
}

/// The registration contract between an external agent and the core.
///
/// The agent keeps a clone of the inner `Arc`; the bus, voting system,
/// and coordinator read (and, on completion reports, update) the model
/// through the handle. The core never owns agent lifecycle.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    agent_id: String,
    confidence: Arc<Mutex<ConfidenceModel>>,
}

impl AgentHandle {
    /// Wrap an agent id and its confidence model.
    pub fn new(agent_id: impl Into<String>, confidence: ConfidenceModel) -> Self {
        Self {
            agent_id: agent_id.into(),
            confidence: Arc::new(Mutex::new(confidence)),
        }
    }

    /// Stable agent identifier.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Shared reference to the confidence model.
    pub fn confidence(&self) -> &Arc<Mutex<ConfidenceModel>> {
        &self.confidence
    }

    /// Lock the model, recovering from poisoning.
    ///
    /// A panic in another thread mid-update leaves counters merely
    /// stale, never structurally broken, so recovery is safe.
    pub fn lock_confidence(&self) -> MutexGuard<'_, ConfidenceModel> {
        self.confidence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
