//! Scenario session reducer
//!
//! A session is an append-only sequence of pages plus the last-known
//! survival rate. Stream events mutate state only through
//! [`ScenarioSession::apply`], which compares the epoch the event's
//! stream was started with against the session's current epoch. A retry
//! or a committed choice bumps the epoch, so anything a superseded
//! stream delivers afterwards is rejected before it can touch a page.

use chrono::Utc;
use serde::Serialize;

use crate::models::HistoryEntry;
use crate::scenario::choices::merge_choices;
use crate::scenario::page::ScenarioPage;
use crate::sse::{Choice, Feedback, StreamEvent, SurvivalRate};

/// Default number of feedback entries after which a session completes.
pub const DEFAULT_FEEDBACK_GOAL: usize = 10;

/// One `{situation, choice, feedback}` triple of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub situation: String,
    pub choice: String,
    pub feedback: Feedback,
}

/// Serialized outcome of a session, handed to the save request builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub entries: Vec<SummaryEntry>,
    pub survival_rate: Option<SurvivalRate>,
}

/// Branching sequence of scenario pages with epoch-guarded streaming.
///
/// Streaming always targets the last page; `current_page_index` only
/// drives history browsing.
#[derive(Debug)]
pub struct ScenarioSession {
    pages: Vec<ScenarioPage>,
    survival_rate: Option<SurvivalRate>,
    current_page_index: usize,
    epoch: u64,
    is_streaming: bool,
    error: Option<String>,
    feedback_goal: usize,
    completed: bool,
}

impl ScenarioSession {
    /// Create a session with one empty page, ready for its first stream
    /// at epoch 0.
    pub fn new(feedback_goal: usize) -> Self {
        Self {
            pages: vec![ScenarioPage::default()],
            survival_rate: None,
            current_page_index: 0,
            epoch: 0,
            is_streaming: true,
            error: None,
            feedback_goal,
            completed: false,
        }
    }

    /// Epoch the next stream request must carry.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Apply one stream event tagged with the epoch of the stream that
    /// produced it. Events from superseded streams are dropped.
    pub fn apply(&mut self, epoch: u64, event: StreamEvent) {
        if epoch != self.epoch {
            tracing::debug!(
                stale = epoch,
                current = self.epoch,
                kind = event.event_type_name(),
                "dropping event from superseded stream"
            );
            return;
        }

        match event {
            StreamEvent::Situation { text } => {
                let page = self
                    .pages
                    .last_mut()
                    .expect("session always holds at least one page");
                page.situation.push_str(&text);
                // Narrative arriving means the choice phase has not
                // started (or restarted); stale candidates are cleared
                page.choices.clear();
            }
            StreamEvent::ChoiceFragment { choices } => {
                let page = self
                    .pages
                    .last_mut()
                    .expect("session always holds at least one page");
                page.choices = merge_choices(std::mem::take(&mut page.choices), choices);
                self.is_streaming = false;
            }
            StreamEvent::Feedback(feedback) => {
                // Feedback evaluates the choice that triggered the
                // current generation, i.e. the previous page
                let target = self.pages.len().saturating_sub(2);
                if let Some(page) = self.pages.get_mut(target) {
                    page.feedback = Some(feedback);
                }
            }
            StreamEvent::SurvivalRate(rate) => {
                self.survival_rate = Some(rate);
            }
            StreamEvent::Done => {
                self.is_streaming = false;
            }
            StreamEvent::Error { message } => {
                tracing::warn!(%message, "scenario stream failed");
                self.error = Some(message);
                self.is_streaming = false;
            }
        }
    }

    /// Commit a choice on the latest page.
    ///
    /// Pushes a fresh empty page, bumps the epoch, and returns the
    /// conversation history the follow-up stream request must carry.
    /// Returns `None` when browsing history or when the page is already
    /// committed.
    pub fn select_choice(&mut self, choice: Choice) -> Option<(Vec<HistoryEntry>, u64)> {
        if self.current_page_index != self.pages.len() - 1 {
            return None;
        }
        let current = &mut self.pages[self.current_page_index];
        if current.selected_choice.is_some() {
            return None;
        }

        let history = self.build_history(Some(&choice));

        self.pages[self.current_page_index].selected_choice = Some(choice);
        self.pages.push(ScenarioPage::default());
        self.current_page_index = self.pages.len() - 1;
        self.error = None;
        self.is_streaming = true;
        self.epoch += 1;
        Some((history, self.epoch))
    }

    /// Commit a free-text choice. Empty or whitespace-only text is
    /// rejected.
    pub fn select_custom_choice(&mut self, text: &str) -> Option<(Vec<HistoryEntry>, u64)> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let choice = Choice::new(
            format!("custom-{}", Utc::now().timestamp_millis()),
            trimmed,
        );
        self.select_choice(choice)
    }

    /// Discard everything and start over: one empty page, cleared error
    /// and survival rate, new epoch. Events from the superseded stream
    /// no longer apply.
    pub fn retry(&mut self) -> u64 {
        self.pages = vec![ScenarioPage::default()];
        self.current_page_index = 0;
        self.survival_rate = None;
        self.error = None;
        self.is_streaming = true;
        self.completed = false;
        self.epoch += 1;
        self.epoch
    }

    /// Ordered `{situation, choice}` pairs for every page up to the
    /// current one that has both. The page being committed right now may
    /// pass its just-chosen choice as `override_choice` before it is
    /// written to state.
    fn build_history(&self, override_choice: Option<&Choice>) -> Vec<HistoryEntry> {
        let upto = self.current_page_index;
        self.pages
            .iter()
            .take(upto + 1)
            .enumerate()
            .filter_map(|(index, page)| {
                if page.situation.is_empty() {
                    return None;
                }
                let selected = if index == upto {
                    override_choice.or(page.selected_choice.as_ref())
                } else {
                    page.selected_choice.as_ref()
                }?;
                Some(HistoryEntry {
                    situation: page.situation.clone(),
                    choice: selected.text.clone(),
                })
            })
            .collect()
    }

    // History browsing. Navigation never changes the streaming target.

    pub fn go_back(&mut self) {
        self.current_page_index = self.current_page_index.saturating_sub(1);
    }

    pub fn go_forward(&mut self) {
        self.current_page_index = (self.current_page_index + 1).min(self.pages.len() - 1);
    }

    pub fn pages(&self) -> &[ScenarioPage] {
        &self.pages
    }

    pub fn current_page(&self) -> &ScenarioPage {
        &self.pages[self.current_page_index]
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    /// True when viewing the page that streams; selection is only
    /// permitted here.
    pub fn is_latest_page(&self) -> bool {
        self.current_page_index == self.pages.len() - 1
    }

    pub fn survival_rate(&self) -> Option<&SurvivalRate> {
        self.survival_rate.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Confirm is blocked while streaming and after an error until a
    /// retry succeeds.
    pub fn can_confirm(&self) -> bool {
        !self.is_streaming && self.error.is_none()
    }

    pub fn feedback_count(&self) -> usize {
        self.pages.iter().filter(|p| p.feedback.is_some()).count()
    }

    /// True once enough feedback entries accumulated and the session has
    /// not been completed yet.
    pub fn should_auto_complete(&self) -> bool {
        !self.completed && self.feedback_count() >= self.feedback_goal
    }

    /// Mark the session complete and return its summary.
    pub fn complete(&mut self) -> SessionSummary {
        self.completed = true;
        self.summary()
    }

    /// `{situation, choice, feedback}` triples for all committed pages,
    /// in original order, plus the last-known survival rate.
    pub fn summary(&self) -> SessionSummary {
        let entries = self
            .pages
            .iter()
            .filter_map(|page| {
                let selected = page.selected_choice.as_ref()?;
                let feedback = page.feedback.clone()?;
                Some(SummaryEntry {
                    situation: page.situation.clone(),
                    choice: selected.text.clone(),
                    feedback,
                })
            })
            .collect();
        SessionSummary {
            entries,
            survival_rate: self.survival_rate.clone(),
        }
    }
}

impl Default for ScenarioSession {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_GOAL)
    }
}
