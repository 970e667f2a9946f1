//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler authenticates via `Learner`, is instrumented, and answers with
//! the uniform envelope.

use std::sync::Arc;

use axum::{
  extract::{
    rejection::{JsonRejection, QueryRejection},
    Path, Query, State,
  },
  Json,
};
use tracing::{info, instrument};

use crate::auth::Learner;
use crate::dates::today;
use crate::domain::{Attempt, Feedback, Task};
use crate::error::ApiError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> Json<Envelope<HealthOut>> {
  ok(HealthOut {
    ok: true,
    llm_enabled: state.openai.is_some(),
    development_auth: state.auth.is_development(),
  })
}

// -------- Tasks --------

#[instrument(level = "info", skip(state, _learner, q))]
pub async fn http_list_tasks(
  State(state): State<Arc<AppState>>,
  _learner: Learner,
  q: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Vec<Task>> {
  let Query(q) = q?;
  Ok(ok(state.store.list_tasks(q.kind, q.level).await))
}

#[instrument(level = "info", skip(state, _learner, q))]
pub async fn http_random_task(
  State(state): State<Arc<AppState>>,
  _learner: Learner,
  q: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Task> {
  let Query(q) = q?;
  let task = state.choose_task(q.kind, q.level).await.ok_or(ApiError::NotFound("task"))?;
  info!(target: "ielts", id = %task.id, "HTTP task served");
  Ok(ok(task))
}

#[instrument(level = "info", skip(state, _learner))]
pub async fn http_get_task(
  State(state): State<Arc<AppState>>,
  _learner: Learner,
  Path(id): Path<String>,
) -> ApiResult<Task> {
  let task = state.store.get_task(&id).await.ok_or(ApiError::NotFound("task"))?;
  Ok(ok(task))
}

// -------- Attempts --------

#[instrument(level = "info", skip(state, learner, body), fields(learner = %learner.id))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  body: Result<Json<AttemptIn>, JsonRejection>,
) -> ApiResult<Attempt> {
  let Json(body) = body?;
  Ok(ok(logic::record_attempt(&state, &learner.id, body).await?))
}

#[instrument(level = "info", skip(state, learner), fields(learner = %learner.id))]
pub async fn http_list_attempts(State(state): State<Arc<AppState>>, learner: Learner) -> ApiResult<Vec<Attempt>> {
  Ok(ok(state.store.list_attempts(&learner.id).await))
}

#[instrument(level = "info", skip(state, learner), fields(learner = %learner.id))]
pub async fn http_get_attempt(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  Path(id): Path<String>,
) -> ApiResult<AttemptOut> {
  Ok(ok(logic::attempt_with_feedback(&state, &learner.id, &id).await?))
}

#[instrument(level = "info", skip(state, learner), fields(learner = %learner.id))]
pub async fn http_post_feedback(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  Path(id): Path<String>,
) -> ApiResult<Feedback> {
  let fb = logic::request_feedback(&state, &learner.id, &id).await?;
  info!(target: "ielts", attempt_id = %id, schema_version = %fb.schema_version, "HTTP feedback served");
  Ok(ok(fb))
}

#[instrument(level = "info", skip(state, learner, q), fields(learner = %learner.id))]
pub async fn http_get_fill_in(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  Path(id): Path<String>,
  q: Result<Query<FillInQuery>, QueryRejection>,
) -> ApiResult<FillInOut> {
  let Query(q) = q?;
  Ok(ok(logic::fill_in_for_attempt(&state, &learner.id, &id, q.level).await?))
}

// -------- PREP --------

#[instrument(level = "info", skip(state, _learner, body))]
pub async fn http_post_prep_evaluate(
  State(state): State<Arc<AppState>>,
  _learner: Learner,
  body: Result<Json<PrepIn>, JsonRejection>,
) -> ApiResult<LlmOut> {
  let Json(body) = body?;
  body.validate()?;
  Ok(ok(logic::evaluate_prep(&state, &body.outline, &body.topic, body.level).await?))
}

#[instrument(level = "info", skip(state, _learner, body))]
pub async fn http_post_essay_generate(
  State(state): State<Arc<AppState>>,
  _learner: Learner,
  body: Result<Json<PrepIn>, JsonRejection>,
) -> ApiResult<LlmOut> {
  let Json(body) = body?;
  body.validate()?;
  Ok(ok(logic::generate_essay(&state, &body.outline, &body.topic, body.level).await?))
}

// -------- Vocabulary / idiom reviews --------

#[instrument(level = "info", skip(state, learner, body), fields(learner = %learner.id))]
pub async fn http_post_item(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  body: Result<Json<ItemIn>, JsonRejection>,
) -> ApiResult<ItemOut> {
  let Json(body) = body?;
  Ok(ok(logic::add_item(&state, &learner.id, body).await?))
}

#[instrument(level = "info", skip(state, learner), fields(learner = %learner.id))]
pub async fn http_list_items(State(state): State<Arc<AppState>>, learner: Learner) -> ApiResult<Vec<ItemOut>> {
  Ok(ok(logic::list_items(&state, &learner.id).await))
}

#[instrument(level = "info", skip(state, learner), fields(learner = %learner.id))]
pub async fn http_get_due(State(state): State<Arc<AppState>>, learner: Learner) -> ApiResult<DueOut> {
  Ok(ok(logic::due_items(&state, &learner.id, today()).await))
}

#[instrument(level = "info", skip(state, learner, q), fields(learner = %learner.id))]
pub async fn http_get_upcoming(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  q: Result<Query<UpcomingQuery>, QueryRejection>,
) -> ApiResult<UpcomingOut> {
  let Query(q) = q?;
  q.validate()?;
  Ok(ok(logic::upcoming_items(&state, &learner.id, today(), q.days).await?))
}

#[instrument(level = "info", skip(state, learner, body), fields(learner = %learner.id))]
pub async fn http_post_review(
  State(state): State<Arc<AppState>>,
  learner: Learner,
  body: Result<Json<ReviewIn>, JsonRejection>,
) -> ApiResult<ItemOut> {
  let Json(body) = body?;
  Ok(ok(logic::record_review(&state, &learner.id, &body.item_id, body.correct, today()).await?))
}

#[instrument(level = "info", skip(state, learner), fields(learner = %learner.id))]
pub async fn http_get_review_stats(State(state): State<Arc<AppState>>, learner: Learner) -> ApiResult<ReviewStatsOut> {
  Ok(ok(logic::review_stats(&state, &learner.id, today()).await))
}
