//! Loading app configuration (prompts + optional task bank) from TOML.
//!
//! See `AppConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Level, TaskKind};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub tasks: Vec<TaskCfg>,
}

/// Task entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct TaskCfg {
  #[serde(default)] pub id: Option<String>,
  pub kind: TaskKind,
  #[serde(default)] pub level: Level,
  #[serde(default)] pub title: Option<String>,
  pub prompt: String,
}

/// Prompt templates used by the prompt builders. Placeholders use `{key}`.
/// Every user template asks for a JSON object carrying `schema_version`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Writing feedback
  pub feedback_system: String,
  pub feedback_user_template: String,
  // PREP outline evaluation
  pub prep_eval_system: String,
  pub prep_eval_user_template: String,
  // Model essay from a PREP outline
  pub essay_system: String,
  pub essay_user_template: String,
  // Speaking transcript evaluation
  pub speaking_system: String,
  pub speaking_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      feedback_system: "You are a certified IELTS writing examiner. Assess strictly against the public band descriptors. Respond ONLY with a JSON object.".into(),
      feedback_user_template: "Task type: {task_kind}\nTask prompt:\n{task_prompt}\n\nCandidate answer:\n{answer}\n\nLearner level: {level} (target band {target_band}).\n\nReturn JSON: {\"schema_version\": \"{schema_version}\", \"overall_band\": string, \"criteria\": {\"task_response\": {\"band\": string, \"comment\": string}, \"coherence_cohesion\": {\"band\": string, \"comment\": string}, \"lexical_resource\": {\"band\": string, \"comment\": string}, \"grammar\": {\"band\": string, \"comment\": string}}, \"strengths\": [string], \"improvements\": [string], \"corrections\": [{\"original\": string, \"corrected\": string, \"reason\": string}], \"vocabulary_suggestions\": [{\"term\": string, \"meaning\": string}]}. Bands use half-band steps written as strings, e.g. \"6.5\".".into(),
      prep_eval_system: "You are an IELTS writing coach who reviews PREP outlines (Point, Reason, Example, Point restated). Be concise and concrete. Respond ONLY with a JSON object.".into(),
      prep_eval_user_template: "Essay question: {topic}\n\nPoint: {point}\nReason: {reason}\nExample: {example}\nPoint restated: {point_restated}\n\nLearner level: {level} (target band {target_band}).\n\nReturn JSON: {\"schema_version\": \"{schema_version}\", \"score\": number (0-10), \"sections\": {\"point\": string, \"reason\": string, \"example\": string, \"point_restated\": string}, \"logic_gaps\": [string], \"improved_outline\": {\"point\": string, \"reason\": string, \"example\": string, \"point_restated\": string}}.".into(),
      essay_system: "You are an IELTS writing tutor producing model answers at a requested band. Respond ONLY with a JSON object.".into(),
      essay_user_template: "Essay question: {topic}\n\nBuild a Writing Task 2 essay of about {word_count} words from this PREP outline, keeping the learner's ideas.\nPoint: {point}\nReason: {reason}\nExample: {example}\nPoint restated: {point_restated}\n\nWrite at band {target_band} for a {level} learner.\n\nReturn JSON: {\"schema_version\": \"{schema_version}\", \"title\": string, \"essay\": string, \"paragraphs\": [{\"role\": string, \"text\": string}], \"key_phrases\": [{\"phrase\": string, \"meaning\": string}]}.".into(),
      speaking_system: "You are a certified IELTS speaking examiner. Judge only what the transcript shows; pronunciation is inferred from the text and flagged as an estimate. Respond ONLY with a JSON object.".into(),
      speaking_user_template: "Part: {task_kind}\nQuestion / cue card:\n{task_prompt}\n\nCandidate transcript:\n{transcript}\n\nLearner level: {level} (target band {target_band}).\n\nReturn JSON: {\"schema_version\": \"{schema_version}\", \"overall_band\": string, \"criteria\": {\"fluency_coherence\": {\"band\": string, \"comment\": string}, \"lexical_resource\": {\"band\": string, \"comment\": string}, \"grammar\": {\"band\": string, \"comment\": string}, \"pronunciation_estimate\": {\"band\": string, \"comment\": string}}, \"improvements\": [string], \"sample_answer\": string, \"useful_idioms\": [{\"term\": string, \"meaning\": string}]}.".into(),
    }
  }
}

/// Attempt to load `AppConfig` from IELTS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("IELTS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "ielts_backend", %path, tasks = cfg.tasks.len(), "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "ielts_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "ielts_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}
