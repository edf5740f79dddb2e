//! Scenario stream event types
//!
//! Contains the StreamEvent enum with all logical event kinds the
//! scenario backend emits, plus the raw wire frame produced by the
//! demultiplexer.

use serde::{Deserialize, Serialize};

/// A single SSE wire unit: the event name currently in effect (if any)
/// paired with one data line. Produced by [`FrameDemux`](super::FrameDemux)
/// and consumed by [`classify`](super::classify) within one parse pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub event_name: Option<String>,
    pub data_line: String,
}

/// One selectable action within a scenario page.
///
/// Identity is `id`: fragments sharing an id describe the same logical
/// choice whose text grows as more tokens stream in. Once the stream
/// moves past choice events the text is final and is never truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Evaluation of a previously selected choice.
///
/// Every field defaults to empty; the classifier only emits a feedback
/// event when at least one field carries text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feedback {
    pub evaluation: String,
    pub comment: String,
    pub better_choice: String,
    pub survival_impact: String,
    pub chosen_action: String,
}

impl Feedback {
    /// True when no field carries any text.
    pub fn is_empty(&self) -> bool {
        self.evaluation.is_empty()
            && self.comment.is_empty()
            && self.better_choice.is_empty()
            && self.survival_impact.is_empty()
            && self.chosen_action.is_empty()
    }
}

/// Aggregate survival percentage. Last write wins within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalRate {
    pub rate: f64,
    pub change: String,
}

/// Typed events produced by classifying raw SSE frames.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Narrative text to append to the current page's situation
    Situation { text: String },
    /// Zero or more partial/complete choice candidates
    ChoiceFragment { choices: Vec<Choice> },
    /// Evaluation of the previously selected choice
    Feedback(Feedback),
    /// Updated aggregate survival percentage
    SurvivalRate(SurvivalRate),
    /// Terminal marker for the current page's stream
    Done,
    /// Terminal failure marker
    Error { message: String },
}

impl StreamEvent {
    /// Returns the event kind as a string for debugging purposes.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            StreamEvent::Situation { .. } => "situation",
            StreamEvent::ChoiceFragment { .. } => "choice",
            StreamEvent::Feedback(_) => "feedback",
            StreamEvent::SurvivalRate(_) => "survival_rate",
            StreamEvent::Done => "done",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// True for events that end the current page's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}
