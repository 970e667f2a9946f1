//! Public protocol structs for the HTTP API (serde ready).
//! Every response is wrapped in `Envelope`: `{"ok": true, "data": ...}` or
//! `{"ok": false, "error": {"code": ..., "message": ...}}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::dates::CalendarDay;
use crate::domain::{Attempt, Feedback, ItemKind, LearningItem, Level, PrepOutline, TaskKind};
use crate::error::ApiError;
use crate::fill_in::FillInQuestion;
use crate::srs::ReviewState;

pub const MAX_ATTEMPT_CHARS: usize = 20_000;
pub const MAX_PREP_FIELD_CHARS: usize = 2_000;
pub const MAX_TERM_CHARS: usize = 200;
pub const MAX_UPCOMING_DAYS: u32 = 365;

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn err(code: &str, message: String) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody { code: code.to_string(), message }),
        }
    }
}

/// Successful response body.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { ok: true, data: Some(data), error: None })
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::Validation(r.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError::Validation(r.body_text())
    }
}

/// Trimmed, non-empty and at most `max_chars` characters.
fn require_text(field: &str, value: &str, max_chars: usize) -> Result<(), ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ApiError::Validation(format!("{field} exceeds {max_chars} characters")));
    }
    Ok(())
}

//
// Requests
//

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub kind: Option<TaskKind>,
    pub level: Option<Level>,
}

#[derive(Debug, Deserialize)]
pub struct AttemptIn {
    pub task_id: String,
    pub text: String,
    #[serde(default)]
    pub level: Option<Level>,
}

impl AttemptIn {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_text("task_id", &self.task_id, 200)?;
        require_text("text", &self.text, MAX_ATTEMPT_CHARS)
    }
}

#[derive(Debug, Deserialize)]
pub struct FillInQuery {
    pub level: Option<Level>,
}

#[derive(Debug, Deserialize)]
pub struct PrepIn {
    pub topic: String,
    #[serde(flatten)]
    pub outline: PrepOutline,
    #[serde(default)]
    pub level: Level,
}

impl PrepIn {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_text("topic", &self.topic, MAX_PREP_FIELD_CHARS)?;
        require_text("point", &self.outline.point, MAX_PREP_FIELD_CHARS)?;
        require_text("reason", &self.outline.reason, MAX_PREP_FIELD_CHARS)?;
        require_text("example", &self.outline.example, MAX_PREP_FIELD_CHARS)?;
        require_text("point_restated", &self.outline.point_restated, MAX_PREP_FIELD_CHARS)
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemIn {
    pub kind: ItemKind,
    pub term: String,
    pub meaning: String,
    #[serde(default)]
    pub example: Option<String>,
}

impl ItemIn {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_text("term", &self.term, MAX_TERM_CHARS)?;
        require_text("meaning", &self.meaning, MAX_PREP_FIELD_CHARS)?;
        if let Some(ex) = &self.example {
            if ex.chars().count() > MAX_PREP_FIELD_CHARS {
                return Err(ApiError::Validation(format!("example exceeds {MAX_PREP_FIELD_CHARS} characters")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_upcoming_days")]
    pub days: u32,
}

fn default_upcoming_days() -> u32 {
    7
}

impl UpcomingQuery {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.days > MAX_UPCOMING_DAYS {
            return Err(ApiError::Validation(format!("days must be at most {MAX_UPCOMING_DAYS}")));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewIn {
    pub item_id: String,
    pub correct: bool,
}

//
// Responses
//

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub llm_enabled: bool,
    pub development_auth: bool,
}

#[derive(Debug, Serialize)]
pub struct AttemptOut {
    pub attempt: Attempt,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Serialize)]
pub struct FillInOut {
    pub attempt_id: String,
    pub questions: Vec<FillInQuestion>,
}

/// Unpersisted model output (PREP evaluation, generated essay).
#[derive(Debug, Serialize)]
pub struct LlmOut {
    pub schema_version: String,
    pub result: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ItemOut {
    pub item: LearningItem,
    pub review: Option<ReviewState>,
    pub due: bool,
}

#[derive(Debug, Serialize)]
pub struct DueOut {
    pub today: CalendarDay,
    pub items: Vec<ItemOut>,
}

#[derive(Debug, Serialize)]
pub struct UpcomingOut {
    pub today: CalendarDay,
    /// Last day of the window, inclusive.
    pub until: CalendarDay,
    pub items: Vec<ItemOut>,
}

#[derive(Debug, Serialize)]
pub struct ReviewStatsOut {
    pub today: CalendarDay,
    pub items: usize,
    pub due_today: usize,
    pub mastered: usize,
    pub total_correct: u32,
    pub total_wrong: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_validation() {
        let good = AttemptIn { task_id: "t".into(), text: "Some essay".into(), level: None };
        assert!(good.validate().is_ok());

        let blank = AttemptIn { task_id: "t".into(), text: "   ".into(), level: None };
        assert!(matches!(blank.validate(), Err(ApiError::Validation(_))));

        let huge = AttemptIn { task_id: "t".into(), text: "a".repeat(MAX_ATTEMPT_CHARS + 1), level: None };
        assert!(matches!(huge.validate(), Err(ApiError::Validation(m)) if m.contains("exceeds")));
    }

    #[test]
    fn prep_body_is_flat() {
        let body: PrepIn = serde_json::from_str(
            r#"{"topic":"Cities","point":"p","reason":"r","example":"e","point_restated":"pr","level":"advanced"}"#,
        )
        .unwrap();
        assert_eq!(body.outline.point_restated, "pr");
        assert_eq!(body.level, Level::Advanced);
        assert!(body.validate().is_ok());

        let missing: PrepIn =
            serde_json::from_str(r#"{"topic":"Cities","point":"p","reason":"","example":"e","point_restated":"pr"}"#).unwrap();
        assert_eq!(missing.level, Level::Intermediate);
        assert!(missing.validate().is_err());
    }

    #[test]
    fn error_envelope_shape() {
        let v = serde_json::to_value(Envelope::<()>::err("NOT_FOUND", "task not found".into())).unwrap();
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"]["code"], "NOT_FOUND");
        assert!(v.get("data").is_none());
    }
}
