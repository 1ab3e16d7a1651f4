//! Tunables for the swarm coordination core.

use serde::{Deserialize, Serialize};

/// Configuration shared by the bus, voting system, and coordinator.
///
/// Constructed by the embedding application; `Default` gives the values
/// the production pipeline runs with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Maximum number of messages retained in the bus history.
    pub history_capacity: usize,
    /// Rolling window size for per-agent outcome tracking.
    pub performance_window: usize,
    /// Below this overall (or domain) confidence an agent abstains.
    pub abstention_threshold: f64,
    /// Lower clamp for voting weight — no agent contributes zero influence.
    pub min_voting_weight: f64,
    /// Upper clamp for voting weight — no agent contributes unbounded influence.
    pub max_voting_weight: f64,
    /// Blend weights for `recompute_overall`:
    /// recent outcomes, voting accuracy, communication effectiveness, domain mean.
    pub confidence_blend: [f64; 4],
    /// Default proposal lifetime in seconds. `None` means proposals never expire.
    pub proposal_expiry_secs: Option<u64>,
    /// Assignment score blend: domain match, inverse load, overall confidence.
    pub assignment_blend: [f64; 3],
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            performance_window: 20,
            abstention_threshold: 0.3,
            min_voting_weight: 0.1,
            max_voting_weight: 2.0,
            confidence_blend: [0.4, 0.2, 0.2, 0.2],
            proposal_expiry_secs: None,
            assignment_blend: [0.5, 0.3, 0.2],
        }
    }
}
