//! Single scenario page model

use serde::Serialize;

use crate::sse::{Choice, Feedback};

/// One situation/decision unit within a branching scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioPage {
    /// Accumulated narrative text; append-only while streaming
    pub situation: String,
    /// Deduplicated-by-id, first-seen order
    pub choices: Vec<Choice>,
    /// Set exactly once, when the user commits a choice
    pub selected_choice: Option<Choice>,
    /// Attached asynchronously while the next page streams
    pub feedback: Option<Feedback>,
}

/// Lifecycle of a page, derived from its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Empty,
    Streaming,
    ChoicesReady,
    Committed,
}

impl ScenarioPage {
    pub fn state(&self) -> PageState {
        if self.selected_choice.is_some() {
            PageState::Committed
        } else if !self.choices.is_empty() {
            PageState::ChoicesReady
        } else if !self.situation.is_empty() {
            PageState::Streaming
        } else {
            PageState::Empty
        }
    }
}
