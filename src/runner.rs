//! Session driver.
//!
//! Connects the scenario client's event stream to the session reducer.
//! Every stream request is tagged with the session epoch current at the
//! moment it is issued; events are applied through the epoch guard, so a
//! stream superseded by a retry or a newer page can finish draining
//! without corrupting state.

use futures_util::StreamExt;

use crate::client::{ClientError, ScenarioClient};
use crate::config::ClientConfig;
use crate::models::{
    HistoryEntry, ReportSummary, SaveScenarioRequest, ScenarioMeta, ScenarioRequest,
};
use crate::scenario::{ScenarioSession, SessionSummary};
use crate::sse::{Choice, StreamEvent};

/// Owns a client and one scenario session, exposing the user-facing
/// actions: start, choose, retry, confirm, save.
pub struct SessionRunner {
    client: ScenarioClient,
    session: ScenarioSession,
    report: ReportSummary,
    scenario: ScenarioMeta,
}

impl SessionRunner {
    pub fn new(config: &ClientConfig, report: ReportSummary, scenario: ScenarioMeta) -> Self {
        Self {
            client: ScenarioClient::new(config),
            session: ScenarioSession::new(config.feedback_goal),
            report,
            scenario,
        }
    }

    pub fn session(&self) -> &ScenarioSession {
        &self.session
    }

    pub fn client(&self) -> &ScenarioClient {
        &self.client
    }

    /// Browse one page back; returns the session for rendering.
    pub fn go_back(&mut self) -> &ScenarioSession {
        self.session.go_back();
        &self.session
    }

    /// Browse one page forward; returns the session for rendering.
    pub fn go_forward(&mut self) -> &ScenarioSession {
        self.session.go_forward();
        &self.session
    }

    /// Stream the first page. Returns the summary if the feedback goal
    /// was reached while streaming.
    pub async fn start(&mut self) -> Option<SessionSummary> {
        let epoch = self.session.epoch();
        self.run_stream(epoch, Vec::new()).await
    }

    /// Commit a delivered choice on the latest page and stream the next
    /// one. No-op when browsing history or when the page is already
    /// committed.
    pub async fn choose(&mut self, choice: Choice) -> Option<SessionSummary> {
        let (history, epoch) = self.session.select_choice(choice)?;
        self.run_stream(epoch, history).await
    }

    /// Commit a free-text choice and stream the next page.
    pub async fn choose_custom(&mut self, text: &str) -> Option<SessionSummary> {
        let (history, epoch) = self.session.select_custom_choice(text)?;
        self.run_stream(epoch, history).await
    }

    /// Throw the session away and stream a fresh first page. Any events
    /// the superseded stream still delivers are rejected by the epoch
    /// guard.
    pub async fn retry(&mut self) -> Option<SessionSummary> {
        let epoch = self.session.retry();
        self.run_stream(epoch, Vec::new()).await
    }

    /// Explicit early completion. `None` while confirm is blocked
    /// (streaming, or an unresolved error).
    pub fn confirm(&mut self) -> Option<SessionSummary> {
        if self.session.can_confirm() {
            Some(self.session.complete())
        } else {
            None
        }
    }

    /// Persist a completed session to the backend.
    pub async fn save(&self, summary: &SessionSummary) -> Result<(), ClientError> {
        let request = SaveScenarioRequest::from_summary(
            self.scenario.clone(),
            self.report.clone(),
            summary,
        );
        self.client.save_scenario(&request).await
    }

    async fn run_stream(
        &mut self,
        epoch: u64,
        history: Vec<HistoryEntry>,
    ) -> Option<SessionSummary> {
        let request = ScenarioRequest {
            report: self.report.clone(),
            scenario: self.scenario.clone(),
            history,
        };

        let mut events = match self.client.stream_scenario(&request).await {
            Ok(events) => events,
            Err(e) => {
                self.session.apply(
                    epoch,
                    StreamEvent::Error {
                        message: e.to_string(),
                    },
                );
                return None;
            }
        };

        // Drain to the terminal event before checking the goal: a
        // survival rate or trailing feedback can arrive after the
        // goal-reaching entry and must land in the summary
        while let Some(event) = events.next().await {
            self.session.apply(epoch, event);
        }

        if self.session.should_auto_complete() {
            tracing::info!(
                feedback = self.session.feedback_count(),
                "feedback goal reached, completing session"
            );
            return Some(self.session.complete());
        }
        None
    }
}
