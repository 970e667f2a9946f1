//! Core behaviours behind the HTTP handlers.
//!
//! This includes:
//!   - recording attempts and requesting model feedback for them
//!   - fill-in follow-up questions
//!   - PREP evaluation and model essays
//!   - the vocabulary/idiom review queue

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dates::{add_days, today, CalendarDay};
use crate::domain::{Attempt, Feedback, FeedbackKind, LearningItem, Level, PrepOutline};
use crate::error::ApiError;
use crate::openai::{LlmError, LlmJson};
use crate::prompts::{
  essay_generation_prompt, prep_evaluation_prompt, speaking_evaluation_prompt,
  writing_feedback_prompt, LlmPrompt,
};
use crate::protocol::{
  AttemptIn, AttemptOut, DueOut, FillInOut, ItemIn, ItemOut, LlmOut, ReviewStatsOut, UpcomingOut,
};
use crate::srs::{advance, is_due, ReviewState, MAX_STAGE};
use crate::state::AppState;

async fn call_llm(state: &AppState, prompt: &LlmPrompt) -> Result<LlmJson, ApiError> {
  let oa = state.openai.as_ref().ok_or(LlmError::Disabled)?;
  Ok(oa.complete_json(prompt).await?)
}

// -------- Attempts & feedback --------

#[instrument(level = "info", skip(state, body), fields(%learner_id, task_id = %body.task_id, text_len = body.text.len()))]
pub async fn record_attempt(state: &AppState, learner_id: &str, body: AttemptIn) -> Result<Attempt, ApiError> {
  body.validate()?;
  let task = state.store.get_task(&body.task_id).await.ok_or(ApiError::NotFound("task"))?;
  let attempt = Attempt {
    id: Uuid::new_v4().to_string(),
    learner_id: learner_id.to_string(),
    task_id: task.id,
    text: body.text.trim().to_string(),
    level: body.level.unwrap_or(task.level),
    created_at: Utc::now(),
  };
  state.store.insert_attempt(attempt.clone()).await;
  info!(target: "ielts", id = %attempt.id, "Attempt recorded");
  Ok(attempt)
}

pub async fn attempt_with_feedback(state: &AppState, learner_id: &str, attempt_id: &str) -> Result<AttemptOut, ApiError> {
  let attempt = state.store.get_attempt(learner_id, attempt_id).await.ok_or(ApiError::NotFound("attempt"))?;
  let feedback = state.store.get_feedback(attempt_id).await;
  Ok(AttemptOut { attempt, feedback })
}

/// Ask the model for feedback on an attempt and persist it. Nothing is written
/// unless the reply satisfies the response contract.
#[instrument(level = "info", skip(state), fields(%learner_id, %attempt_id))]
pub async fn request_feedback(state: &AppState, learner_id: &str, attempt_id: &str) -> Result<Feedback, ApiError> {
  let attempt = state.store.get_attempt(learner_id, attempt_id).await.ok_or(ApiError::NotFound("attempt"))?;
  let task = state.store.get_task(&attempt.task_id).await.ok_or(ApiError::NotFound("task"))?;

  let (kind, prompt) = if task.kind.is_speaking() {
    (FeedbackKind::Speaking, speaking_evaluation_prompt(&state.prompts, &task, &attempt.text, attempt.level))
  } else {
    (FeedbackKind::Writing, writing_feedback_prompt(&state.prompts, &task, &attempt.text, attempt.level))
  };

  let reply = call_llm(state, &prompt).await?;
  let fb = Feedback {
    attempt_id: attempt.id,
    kind,
    schema_version: reply.schema_version,
    payload: reply.value,
    created_at: Utc::now(),
  };
  state.store.put_feedback(fb.clone()).await;
  info!(target: "ielts", attempt_id = %fb.attempt_id, kind = ?fb.kind, "Feedback persisted");
  Ok(fb)
}

#[instrument(level = "info", skip(state), fields(%learner_id, %attempt_id))]
pub async fn fill_in_for_attempt(
  state: &AppState,
  learner_id: &str,
  attempt_id: &str,
  level: Option<Level>,
) -> Result<FillInOut, ApiError> {
  let attempt = state.store.get_attempt(learner_id, attempt_id).await.ok_or(ApiError::NotFound("attempt"))?;
  let questions = state
    .questions
    .generate(&attempt.text, &attempt.id, level.unwrap_or(attempt.level));
  Ok(FillInOut { attempt_id: attempt.id, questions })
}

// -------- PREP --------

#[instrument(level = "info", skip(state, prep), fields(topic_len = topic.len(), ?level))]
pub async fn evaluate_prep(state: &AppState, prep: &PrepOutline, topic: &str, level: Level) -> Result<LlmOut, ApiError> {
  let reply = call_llm(state, &prep_evaluation_prompt(&state.prompts, prep, topic, level)).await?;
  Ok(LlmOut { schema_version: reply.schema_version, result: reply.value })
}

#[instrument(level = "info", skip(state, prep), fields(topic_len = topic.len(), ?level))]
pub async fn generate_essay(state: &AppState, prep: &PrepOutline, topic: &str, level: Level) -> Result<LlmOut, ApiError> {
  let reply = call_llm(state, &essay_generation_prompt(&state.prompts, prep, topic, level)).await?;
  Ok(LlmOut { schema_version: reply.schema_version, result: reply.value })
}

// -------- Review queue --------

fn item_out(item: LearningItem, review: Option<ReviewState>, today: CalendarDay) -> ItemOut {
  // An item without a state has never been scheduled and counts as new.
  let due = review.as_ref().map_or(true, |r| is_due(r.next_review_on, today));
  ItemOut { item, review, due }
}

#[instrument(level = "info", skip(state, body), fields(%learner_id, kind = ?body.kind, term_len = body.term.len()))]
pub async fn add_item(state: &AppState, learner_id: &str, body: ItemIn) -> Result<ItemOut, ApiError> {
  body.validate()?;
  let today = today();
  let item = LearningItem {
    id: Uuid::new_v4().to_string(),
    learner_id: learner_id.to_string(),
    kind: body.kind,
    term: body.term.trim().to_string(),
    meaning: body.meaning.trim().to_string(),
    example: body.example.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
    created_at: Utc::now(),
  };
  let initial = advance(None, false, today);
  state.store.insert_item(item.clone(), initial.clone()).await;
  Ok(item_out(item, Some(initial), today))
}

pub async fn list_items(state: &AppState, learner_id: &str) -> Vec<ItemOut> {
  let today = today();
  state
    .store
    .list_items(learner_id)
    .await
    .into_iter()
    .map(|(item, review)| item_out(item, review, today))
    .collect()
}

pub async fn due_items(state: &AppState, learner_id: &str, today: CalendarDay) -> DueOut {
  let mut items: Vec<ItemOut> = state
    .store
    .list_items(learner_id)
    .await
    .into_iter()
    .map(|(item, review)| item_out(item, review, today))
    .filter(|i| i.due)
    .collect();
  // Most overdue first; never-scheduled items lead.
  items.sort_by_key(|i| i.review.as_ref().map(|r| r.next_review_on));
  DueOut { today, items }
}

/// Items that come due on or before `today + days`, soonest first.
pub async fn upcoming_items(state: &AppState, learner_id: &str, today: CalendarDay, days: u32) -> Result<UpcomingOut, ApiError> {
  let until = add_days(today, i64::from(days))?;
  let mut items: Vec<ItemOut> = state
    .store
    .list_items(learner_id)
    .await
    .into_iter()
    .filter(|(_, review)| review.as_ref().map_or(true, |r| is_due(r.next_review_on, until)))
    .map(|(item, review)| item_out(item, review, today))
    .collect();
  items.sort_by_key(|i| i.review.as_ref().map(|r| r.next_review_on));
  Ok(UpcomingOut { today, until, items })
}

/// Record one review outcome. The first review of an unscheduled item starts
/// from the new-item state so every outcome is counted.
#[instrument(level = "info", skip(state), fields(%learner_id, %item_id, %correct, %today))]
pub async fn record_review(
  state: &AppState,
  learner_id: &str,
  item_id: &str,
  correct: bool,
  today: CalendarDay,
) -> Result<ItemOut, ApiError> {
  let (item, next) = state
    .store
    .update_review(learner_id, item_id, |prior| {
      let base = prior.cloned().unwrap_or_else(|| advance(None, correct, today));
      advance(Some(&base), correct, today)
    })
    .await
    .ok_or(ApiError::NotFound("item"))?;
  info!(target: "ielts", %item_id, stage = next.stage, next_review_on = %next.next_review_on, reviews = next.reviews(), "Review recorded");
  Ok(item_out(item, Some(next), today))
}

pub async fn review_stats(state: &AppState, learner_id: &str, today: CalendarDay) -> ReviewStatsOut {
  let rows = state.store.list_items(learner_id).await;
  let mut out = ReviewStatsOut {
    today,
    items: rows.len(),
    due_today: 0,
    mastered: 0,
    total_correct: 0,
    total_wrong: 0,
  };
  for (_, review) in &rows {
    match review {
      Some(r) => {
        if is_due(r.next_review_on, today) {
          out.due_today += 1;
        }
        if r.stage == MAX_STAGE {
          out.mastered += 1;
        }
        out.total_correct += r.total_correct;
        out.total_wrong += r.total_wrong;
      }
      None => out.due_today += 1,
    }
  }
  out
}
