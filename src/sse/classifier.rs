//! Event classifier and payload normalizer
//!
//! Turns one raw SSE frame into zero or one typed [`StreamEvent`]. The
//! backend's event framing is inconsistent: sometimes the JSON payload
//! carries its own `type`, sometimes only the `event:` line does, and
//! sometimes neither and the content shape must be guessed. Classification
//! therefore applies an ordered set of rules with explicit precedence
//! (done flag, then explicit type, then content-shape heuristics) so that
//! format drift degrades to a best-effort situation/choice interpretation
//! instead of dropping data.
//!
//! Classification never fails: malformed JSON falls back to a raw-text
//! interpretation and unrecognized JSON shapes are silently dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::sse::events::{Choice, Feedback, RawFrame, StreamEvent, SurvivalRate};
use crate::sse::payloads::{ChoiceObjectPayload, SurvivalRatePayload};

/// Literal data payload marking end of stream. Never JSON-parsed.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Strips leading enumeration markers such as `1. `, `2)` or `- ` from
/// choice lines without touching the semantic content.
static ORDINAL_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\d-]+[.)-]?\s*").expect("invalid ordinal prefix regex"));

/// Classify one raw frame into a typed event.
///
/// Returns `None` for payloads that carry nothing actionable (empty text,
/// unrecognized JSON shapes).
pub fn classify(frame: &RawFrame) -> Option<StreamEvent> {
    if frame.data_line == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<Value>(&frame.data_line) {
        Ok(parsed) => classify_json(frame.event_name.as_deref(), &parsed),
        Err(_) => classify_raw_text(frame.event_name.as_deref(), &frame.data_line),
    }
}

/// Non-JSON payloads: per-choice events like `choice_0` carry the line as
/// a single choice text, a bare `choice` event is split into enumerated
/// choices, anything else non-empty is narrative.
fn classify_raw_text(event_name: Option<&str>, data: &str) -> Option<StreamEvent> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(name) = event_name {
        if name.starts_with("choice") && name != "choice" {
            return Some(StreamEvent::ChoiceFragment {
                choices: vec![Choice::new(name, trimmed)],
            });
        }
        if name == "choice" {
            let choices = split_choice_lines(data);
            if choices.is_empty() {
                return None;
            }
            return Some(StreamEvent::ChoiceFragment { choices });
        }
    }

    Some(StreamEvent::Situation {
        text: data.to_string(),
    })
}

fn classify_json(event_name: Option<&str>, parsed: &Value) -> Option<StreamEvent> {
    let Some(obj) = parsed.as_object() else {
        tracing::debug!(payload = %parsed, "dropping non-object JSON payload");
        return None;
    };

    // Done flag takes priority over every other field
    match obj.get("done") {
        Some(Value::Bool(true)) => return Some(StreamEvent::Done),
        Some(Value::String(s)) if s == "true" => return Some(StreamEvent::Done),
        _ => {}
    }

    // The payload's own type wins over the wire event name
    let raw_type = obj
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .or(event_name)
        .unwrap_or_default()
        .to_string();
    let effective_type = if raw_type.starts_with("choice") {
        "choice"
    } else {
        raw_type.as_str()
    };

    if effective_type == "situation" {
        return first_non_empty_str(obj, &["content", "situation"])
            .map(|text| StreamEvent::Situation { text });
    }

    if effective_type == "choice" {
        // Per-choice events like `choice_1` carry exactly one choice
        // keyed by the full type string
        if raw_type.starts_with("choice") && raw_type != "choice" {
            let text = first_non_empty_str(obj, &["content", "choice", "text", "label"])?;
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            return Some(StreamEvent::ChoiceFragment {
                choices: vec![Choice::new(raw_type, text)],
            });
        }
        return Some(StreamEvent::ChoiceFragment {
            choices: choices_from_object(obj),
        });
    }

    if effective_type == "feedback" || has_feedback_field(obj) {
        // Probed field by field: one malformed field must not erase the
        // rest of the feedback
        let feedback = Feedback {
            evaluation: string_field(obj, "evaluation"),
            comment: string_field(obj, "comment"),
            better_choice: string_field(obj, "better_choice"),
            survival_impact: string_field(obj, "survival_impact"),
            chosen_action: string_field(obj, "chosen_action"),
        };
        if feedback.is_empty() {
            return None;
        }
        return Some(StreamEvent::Feedback(feedback));
    }

    if effective_type == "survival_rate" || obj.contains_key("survival_rate") {
        let payload: SurvivalRatePayload =
            serde_json::from_value(Value::Object(obj.clone())).unwrap_or_default();
        let rate = payload.survival_rate.as_ref().and_then(coerce_f64)?;
        if !rate.is_finite() {
            return None;
        }
        return Some(StreamEvent::SurvivalRate(SurvivalRate {
            rate,
            change: payload.change.unwrap_or_default(),
        }));
    }

    // Shape heuristic: an untyped payload carrying a choices array is
    // still a choice fragment
    if matches!(obj.get("choices"), Some(Value::Array(_))) {
        return Some(StreamEvent::ChoiceFragment {
            choices: choices_from_object(obj),
        });
    }

    // Fallback: content without a recognizable type is narrative
    if let Some(text) = first_non_empty_str(obj, &["content", "situation"]) {
        return Some(StreamEvent::Situation { text });
    }

    tracing::debug!(?event_name, "dropping unrecognized JSON payload");
    None
}

/// Choices from a bare `choice`-typed (or untyped) object: a normalized
/// `choices` array wins, otherwise the content is split on newlines.
fn choices_from_object(obj: &Map<String, Value>) -> Vec<Choice> {
    let normalized = normalize_choices(obj.get("choices"));
    if normalized.is_empty() {
        let content = first_non_empty_str(obj, &["content", "choice"]).unwrap_or_default();
        split_choice_lines(&content)
    } else {
        normalized
    }
}

fn has_feedback_field(obj: &Map<String, Value>) -> bool {
    ["chosen_action", "evaluation", "comment", "better_choice"]
        .iter()
        .any(|key| obj.contains_key(*key))
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn first_non_empty_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalize a `choices` array whose elements may be strings or objects.
/// Entries with empty text are skipped; missing ids fall back to the
/// element index.
fn normalize_choices(value: Option<&Value>) -> Vec<Choice> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut normalized = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => {
                let text = s.trim();
                if !text.is_empty() {
                    normalized.push(Choice::new(index.to_string(), text));
                }
            }
            Value::Object(obj) => {
                let payload: ChoiceObjectPayload =
                    serde_json::from_value(Value::Object(obj.clone())).unwrap_or_default();
                let text = payload
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .or(payload.label.as_deref().map(str::trim))
                    .unwrap_or_default();
                if text.is_empty() {
                    continue;
                }
                let id = match payload.id {
                    Some(Value::String(s)) => s,
                    Some(Value::Number(n)) => n.to_string(),
                    _ => index.to_string(),
                };
                normalized.push(Choice::new(id, text));
            }
            _ => {}
        }
    }
    normalized
}

/// Split newline-delimited choice text into one choice per non-empty
/// line, stripping leading ordinal markers. Ids are zero-based line
/// indices over the non-empty lines.
fn split_choice_lines(content: &str) -> Vec<Choice> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            let stripped = ORDINAL_PREFIX_REGEX.replace(line, "");
            let text = stripped.trim();
            Choice::new(
                index.to_string(),
                if text.is_empty() { line } else { text },
            )
        })
        .collect()
}
