//! Client configuration.

use crate::scenario::DEFAULT_FEEDBACK_GOAL;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Configuration for the scenario client and session driver.
///
/// Use the builder methods to customize, or [`ClientConfig::from_env`]
/// to pick up environment overrides.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the scenario backend
    pub base_url: String,
    /// Number of feedback entries after which a session completes.
    /// The backend product default is 10.
    pub feedback_goal: usize,
    /// Seconds without a chunk before a stream fails with a timeout
    pub idle_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            feedback_goal: DEFAULT_FEEDBACK_GOAL,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus `LIFEBOAT_API_URL` and `LIFEBOAT_FEEDBACK_GOAL`
    /// environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("LIFEBOAT_API_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(goal) = std::env::var("LIFEBOAT_FEEDBACK_GOAL") {
            match goal.parse() {
                Ok(parsed) => config.feedback_goal = parsed,
                Err(_) => {
                    tracing::warn!(value = %goal, "ignoring invalid LIFEBOAT_FEEDBACK_GOAL");
                }
            }
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_feedback_goal(mut self, goal: usize) -> Self {
        self.feedback_goal = goal;
        self
    }

    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}
