//! Scenario page state machine
//!
//! Maintains the branching sequence of situation/choice pages produced
//! by the scenario stream: incremental choice merging, selection commits,
//! feedback attribution, history navigation, and the epoch guard that
//! discards events from superseded streams.
//!
//! # Module structure
//! - `choices` - Choice fragment merge algorithm
//! - `page` - Single page model and its derived state
//! - `session` - Session reducer (pages, survival rate, epoch)

mod choices;
mod page;
mod session;

pub use choices::merge_choices;
pub use page::{PageState, ScenarioPage};
pub use session::{ScenarioSession, SessionSummary, SummaryEntry, DEFAULT_FEEDBACK_GOAL};
