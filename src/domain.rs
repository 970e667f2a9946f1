//! Domain models: practice tasks, attempts, feedback and vocabulary items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which IELTS paper a task belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
  WritingTask1,
  WritingTask2,
  SpeakingPart1,
  SpeakingPart2,
  SpeakingPart3,
}

impl TaskKind {
  pub fn is_speaking(self) -> bool {
    matches!(self, TaskKind::SpeakingPart1 | TaskKind::SpeakingPart2 | TaskKind::SpeakingPart3)
  }

  pub fn label(self) -> &'static str {
    match self {
      TaskKind::WritingTask1 => "Writing Task 1",
      TaskKind::WritingTask2 => "Writing Task 2",
      TaskKind::SpeakingPart1 => "Speaking Part 1",
      TaskKind::SpeakingPart2 => "Speaking Part 2",
      TaskKind::SpeakingPart3 => "Speaking Part 3",
    }
  }
}

/// Learner proficiency used to pitch prompts and exercises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
  Beginner,
  #[default]
  Intermediate,
  Advanced,
}

impl Level {
  /// Target band range quoted to the model.
  pub fn target_band(self) -> &'static str {
    match self {
      Level::Beginner => "4.5-5.5",
      Level::Intermediate => "6.0-6.5",
      Level::Advanced => "7.0-8.0",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Level::Beginner => "beginner",
      Level::Intermediate => "intermediate",
      Level::Advanced => "advanced",
    }
  }
}

/// Where did we get the task from?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
  LocalBank, // from the TOML bank
  Seed,      // built-in
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
  pub id: String,
  pub kind: TaskKind,
  pub level: Level,
  pub title: String,
  pub prompt: String,
  pub source: TaskSource,
}

/// One submitted essay or speaking transcript.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attempt {
  pub id: String,
  pub learner_id: String,
  pub task_id: String,
  pub text: String,
  pub level: Level,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
  Writing,
  Speaking,
}

/// Model feedback for an attempt; `payload` is the JSON object the model returned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feedback {
  pub attempt_id: String,
  pub kind: FeedbackKind,
  pub schema_version: String,
  pub payload: serde_json::Value,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
  Vocab,
  Idiom,
}

/// A word or idiom in a learner's review queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningItem {
  pub id: String,
  pub learner_id: String,
  pub kind: ItemKind,
  pub term: String,
  pub meaning: String,
  #[serde(default)]
  pub example: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// PREP outline: Point, Reason, Example, Point restated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PrepOutline {
  pub point: String,
  pub reason: String,
  pub example: String,
  pub point_restated: String,
}
