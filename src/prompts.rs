//! Prompt builders for the model-backed features.
//!
//! Each builder is a pure function of the configured templates and its inputs;
//! the result carries the generation parameters the client should use.

use crate::config::Prompts;
use crate::domain::{Level, PrepOutline, Task};
use crate::util::fill_template;

pub const WRITING_FEEDBACK_SCHEMA: &str = "writing_feedback.v1";
pub const PREP_EVALUATION_SCHEMA: &str = "prep_evaluation.v1";
pub const ESSAY_GENERATION_SCHEMA: &str = "essay_generation.v1";
pub const SPEAKING_EVALUATION_SCHEMA: &str = "speaking_evaluation.v1";

#[derive(Clone, Debug, PartialEq)]
pub struct LlmPrompt {
  pub system: String,
  pub user: String,
  pub temperature: f32,
  pub max_tokens: u32,
}

fn essay_word_count(level: Level) -> &'static str {
  match level {
    Level::Beginner => "250",
    Level::Intermediate => "280",
    Level::Advanced => "300",
  }
}

pub fn writing_feedback_prompt(prompts: &Prompts, task: &Task, answer: &str, level: Level) -> LlmPrompt {
  let user = fill_template(
    &prompts.feedback_user_template,
    &[
      ("task_kind", task.kind.label()),
      ("task_prompt", &task.prompt),
      ("answer", answer),
      ("level", level.as_str()),
      ("target_band", level.target_band()),
      ("schema_version", WRITING_FEEDBACK_SCHEMA),
    ],
  );
  LlmPrompt { system: prompts.feedback_system.clone(), user, temperature: 0.2, max_tokens: 2000 }
}

pub fn prep_evaluation_prompt(prompts: &Prompts, prep: &PrepOutline, topic: &str, level: Level) -> LlmPrompt {
  let user = fill_template(
    &prompts.prep_eval_user_template,
    &[
      ("topic", topic),
      ("point", &prep.point),
      ("reason", &prep.reason),
      ("example", &prep.example),
      ("point_restated", &prep.point_restated),
      ("level", level.as_str()),
      ("target_band", level.target_band()),
      ("schema_version", PREP_EVALUATION_SCHEMA),
    ],
  );
  LlmPrompt { system: prompts.prep_eval_system.clone(), user, temperature: 0.3, max_tokens: 1200 }
}

pub fn essay_generation_prompt(prompts: &Prompts, prep: &PrepOutline, topic: &str, level: Level) -> LlmPrompt {
  let user = fill_template(
    &prompts.essay_user_template,
    &[
      ("topic", topic),
      ("word_count", essay_word_count(level)),
      ("point", &prep.point),
      ("reason", &prep.reason),
      ("example", &prep.example),
      ("point_restated", &prep.point_restated),
      ("level", level.as_str()),
      ("target_band", level.target_band()),
      ("schema_version", ESSAY_GENERATION_SCHEMA),
    ],
  );
  LlmPrompt { system: prompts.essay_system.clone(), user, temperature: 0.7, max_tokens: 2500 }
}

pub fn speaking_evaluation_prompt(prompts: &Prompts, task: &Task, transcript: &str, level: Level) -> LlmPrompt {
  let user = fill_template(
    &prompts.speaking_user_template,
    &[
      ("task_kind", task.kind.label()),
      ("task_prompt", &task.prompt),
      ("transcript", transcript),
      ("level", level.as_str()),
      ("target_band", level.target_band()),
      ("schema_version", SPEAKING_EVALUATION_SCHEMA),
    ],
  );
  LlmPrompt { system: prompts.speaking_system.clone(), user, temperature: 0.2, max_tokens: 1800 }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{TaskKind, TaskSource};

  fn task(kind: TaskKind) -> Task {
    Task {
      id: "t1".into(),
      kind,
      level: Level::Intermediate,
      title: "Remote work".into(),
      prompt: "Is working from home good for society?".into(),
      source: TaskSource::Seed,
    }
  }

  fn prep() -> PrepOutline {
    PrepOutline {
      point: "Remote work benefits employees".into(),
      reason: "It removes commuting".into(),
      example: "My sister saves two hours a day".into(),
      point_restated: "So remote work improves wellbeing".into(),
    }
  }

  #[test]
  fn feedback_prompt_fills_every_placeholder() {
    let p = writing_feedback_prompt(&Prompts::default(), &task(TaskKind::WritingTask2), "My essay.", Level::Advanced);
    assert!(p.user.contains("Writing Task 2"));
    assert!(p.user.contains("Is working from home good for society?"));
    assert!(p.user.contains("My essay."));
    assert!(p.user.contains("7.0-8.0"));
    assert!(p.user.contains(WRITING_FEEDBACK_SCHEMA));
    assert!(!p.user.contains("{answer}") && !p.user.contains("{schema_version}"));
    assert_eq!(p.system, Prompts::default().feedback_system);
  }

  #[test]
  fn prep_and_essay_prompts_carry_the_outline() {
    let prompts = Prompts::default();
    let eval = prep_evaluation_prompt(&prompts, &prep(), "Remote work", Level::Beginner);
    let essay = essay_generation_prompt(&prompts, &prep(), "Remote work", Level::Beginner);
    for p in [&eval, &essay] {
      assert!(p.user.contains("My sister saves two hours a day"));
      assert!(p.user.contains("So remote work improves wellbeing"));
      assert!(p.user.contains("4.5-5.5"));
    }
    assert!(eval.user.contains(PREP_EVALUATION_SCHEMA));
    assert!(essay.user.contains(ESSAY_GENERATION_SCHEMA));
    assert!(essay.user.contains("about 250 words"));
    assert!(essay.temperature > eval.temperature);
  }

  #[test]
  fn speaking_prompt_uses_transcript() {
    let p = speaking_evaluation_prompt(&Prompts::default(), &task(TaskKind::SpeakingPart2), "Well, I think...", Level::Intermediate);
    assert!(p.user.contains("Speaking Part 2"));
    assert!(p.user.contains("Well, I think..."));
    assert!(p.user.contains(SPEAKING_EVALUATION_SCHEMA));
  }

  #[test]
  fn learner_text_with_placeholder_syntax_is_kept_verbatim() {
    let p = writing_feedback_prompt(
      &Prompts::default(),
      &task(TaskKind::WritingTask2),
      "My essay mentions {level} literally.",
      Level::Advanced,
    );
    assert!(p.user.contains("My essay mentions {level} literally."));
    assert!(p.user.contains("Learner level: advanced"));

    let mut outline = prep();
    outline.point = "Point that quotes {reason} and {schema_version}".into();
    let eval = prep_evaluation_prompt(&Prompts::default(), &outline, "Topic {target_band}", Level::Beginner);
    assert!(eval.user.contains("Point: Point that quotes {reason} and {schema_version}"));
    assert!(eval.user.contains("Essay question: Topic {target_band}"));
    assert!(eval.user.contains("Reason: It removes commuting"));
  }

  #[test]
  fn builders_are_pure() {
    let prompts = Prompts::default();
    let t = task(TaskKind::WritingTask1);
    assert_eq!(
      writing_feedback_prompt(&prompts, &t, "x", Level::Beginner),
      writing_feedback_prompt(&prompts, &t, "x", Level::Beginner)
    );
  }
}
