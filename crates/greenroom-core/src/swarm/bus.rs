//! In-process message bus with per-agent queues and a bounded history.
//!
//! Delivery is synchronous and at-least-once within the process:
//! `send_message` enqueues into every resolved recipient queue before
//! returning. Per-recipient ordering is FIFO in send order; nothing is
//! guaranteed across different recipients.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::config::SwarmConfig;
use super::message::{AgentMessage, Recipient};
use crate::metrics::METRICS;
use crate::obs;

#[derive(Debug, Default)]
struct BusState {
    queues: BTreeMap<String, VecDeque<AgentMessage>>,
    channels: BTreeMap<String, BTreeSet<String>>,
    history: VecDeque<AgentMessage>,
}

/// Routes point-to-point, broadcast, and channel messages between
/// registered agents.
///
/// All shared state sits behind one mutex; every operation is a bounded
/// in-memory update, so callers never block on anything external.
#[derive(Debug)]
pub struct MessageBus {
    state: Mutex<BusState>,
    history_capacity: usize,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(&SwarmConfig::default())
    }
}

impl MessageBus {
    /// Create an empty bus.
    pub fn new(config: &SwarmConfig) -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            history_capacity: config.history_capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // Queues and history stay structurally valid across a panic in
        // another caller; recovering from poisoning keeps the bus
        // serving the remaining agents.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an agent, creating its inbound queue if absent.
    ///
    /// Idempotent; re-registration keeps any queued messages.
    pub fn register_agent(&self, agent_id: impl Into<String>) {
        let agent_id = agent_id.into();
        let mut state = self.lock();
        state.queues.entry(agent_id.clone()).or_default();
        debug!(agent_id = %agent_id, "agent registered on bus");
    }

    /// Remove an agent, its queue, and its channel subscriptions.
    pub fn unregister_agent(&self, agent_id: &str) {
        let mut state = self.lock();
        state.queues.remove(agent_id);
        for subscribers in state.channels.values_mut() {
            subscribers.remove(agent_id);
        }
        debug!(agent_id = %agent_id, "agent unregistered from bus");
    }

    /// Subscribe a registered agent to a channel.
    ///
    /// Returns `false` (and subscribes nothing) when the agent is not
    /// registered.
    pub fn subscribe_to_channel(&self, agent_id: &str, channel: impl Into<String>) -> bool {
        let mut state = self.lock();
        if !state.queues.contains_key(agent_id) {
            warn!(agent_id = %agent_id, "subscribe rejected: agent not registered");
            return false;
        }
        state
            .channels
            .entry(channel.into())
            .or_default()
            .insert(agent_id.to_string());
        true
    }

    /// Deliver a message to its resolved recipients.
    ///
    /// - exact agent id: that queue only; unknown agent drops the
    ///   message and returns `false`.
    /// - broadcast: every registered queue, the sender's included.
    /// - channel: every subscriber; an unknown channel is a successful
    ///   no-op (there is simply nobody to deliver to).
    ///
    /// The message lands in the bounded history regardless of delivery
    /// outcome, so dropped traffic stays inspectable.
    pub fn send_message(&self, message: AgentMessage) -> bool {
        let mut state = self.lock();

        if state.history.len() == self.history_capacity {
            state.history.pop_front();
        }
        state.history.push_back(message.clone());

        let delivered = match &message.recipient {
            Recipient::Agent(id) => match state.queues.get_mut(id) {
                Some(queue) => {
                    queue.push_back(message.clone());
                    1
                }
                None => {
                    obs::emit_message_dropped(&message.sender, id);
                    return false;
                }
            },
            Recipient::Broadcast => {
                let msg = message.clone();
                let n = state.queues.len();
                for queue in state.queues.values_mut() {
                    queue.push_back(msg.clone());
                }
                n
            }
            Recipient::Channel(name) => {
                let subscribers = state.channels.get(name).cloned().unwrap_or_default();
                for sub in &subscribers {
                    if let Some(queue) = state.queues.get_mut(sub) {
                        queue.push_back(message.clone());
                    }
                }
                subscribers.len()
            }
        };

        METRICS.add_messages_delivered(delivered as u64);
        true
    }

    /// Drain and return the agent's queued messages, oldest first.
    ///
    /// Unknown agents get an empty vec, not an error.
    pub fn get_messages(&self, agent_id: &str) -> Vec<AgentMessage> {
        let mut state = self.lock();
        match state.queues.get_mut(agent_id) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Ids of all registered agents, in sorted order.
    pub fn registered_agents(&self) -> Vec<String> {
        self.lock().queues.keys().cloned().collect()
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.lock().queues.len()
    }

    /// Undrained queue depth for an agent (0 for unknown agents).
    pub fn queue_depth(&self, agent_id: &str) -> usize {
        self.lock().queues.get(agent_id).map_or(0, VecDeque::len)
    }

    /// Snapshot of the retained message history, oldest first.
    pub fn history(&self) -> Vec<AgentMessage> {
        self.lock().history.iter().cloned().collect()
    }
}
