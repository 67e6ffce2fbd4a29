//! Runtime configuration.

use std::path::PathBuf;

use peril_protocol::routing::war_queue;
use peril_retry::RetryPolicy;

/// War-recognition queue topology.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WarQueue {
    /// Every player reads its own durable `war.<username>` queue, so both
    /// parties of a war see every recognition.
    #[default]
    PerPlayer,
    /// All players compete on one durable queue. Each recognition reaches a
    /// single player; a non-party requeues it for the others.
    Shared(String),
}

impl WarQueue {
    /// Queue name `username` consumes war recognitions from.
    pub fn queue_name(&self, username: &str) -> String {
        match self {
            Self::PerPlayer => war_queue(username),
            Self::Shared(name) => name.clone(),
        }
    }
}

/// Settings shared by [`PerilClient`](crate::PerilClient) and
/// [`PerilServer`](crate::PerilServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerilConfig {
    /// Budget applied to every requeue decision.
    pub retry: RetryPolicy,

    /// Where war recognitions are read from.
    pub war_queue: WarQueue,

    /// File the server's log collector appends to.
    pub log_path: PathBuf,
}

impl Default for PerilConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            war_queue: WarQueue::default(),
            log_path: PathBuf::from("game.log"),
        }
    }
}

impl PerilConfig {
    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry.validated();
        self
    }

    /// Sets the war queue topology.
    pub fn war_queue(mut self, war_queue: WarQueue) -> Self {
        self.war_queue = war_queue;
        self
    }

    /// Sets the game log file.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }
}
