//! SSE payload deserialization structs
//!
//! Internal structs used to deserialize JSON data payloads from the
//! scenario stream. Field sets mirror the backend's loosely specified
//! shapes; everything is optional and defaults to absent.

use serde::Deserialize;

/// Survival rate payload. The backend sends `survival_rate` as either a
/// number or a numeric string, so it is captured raw and coerced later.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SurvivalRatePayload {
    #[serde(default)]
    pub survival_rate: Option<serde_json::Value>,
    #[serde(default)]
    pub change: Option<String>,
}

/// One element of a `choices` array when the backend sends objects.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChoiceObjectPayload {
    /// May arrive as a string or a number
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}
