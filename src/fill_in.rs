//! Follow-up fill-in exercises picked from a small template bank.
//!
//! The rules are plain substring and sentence-length checks over the learner's
//! text. `QuestionGenerator` is the seam a model-driven generator plugs into.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::Level;

pub const MAX_QUESTIONS: usize = 3;

const CONNECTORS: [&str; 6] = [
  "however", "therefore", "moreover", "furthermore", "nevertheless", "consequently",
];

const BASIC_WORDS: [&str; 8] = ["important", "good", "bad", "poor", "big", "small", "many", "much"];

/// Mean words per sentence below which the text counts as choppy.
const SHORT_SENTENCE_MEAN: f64 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  ConnectorChoice,
  LexicalReplacement,
  GrammarCombination,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
  pub id: String,
  pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInQuestion {
  pub id: String,
  pub attempt_id: String,
  pub question_type: QuestionType,
  pub question_text: String,
  pub options: Vec<QuestionOption>,
  pub correct_answer: String,
}

pub trait QuestionGenerator: Send + Sync {
  /// Between 1 and `MAX_QUESTIONS` questions for one attempt.
  fn generate(&self, text: &str, attempt_id: &str, level: Level) -> Vec<FillInQuestion>;
}

/// Rule-based generator backed by `generate_fill_in_questions`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicGenerator;

impl QuestionGenerator for HeuristicGenerator {
  fn generate(&self, text: &str, attempt_id: &str, level: Level) -> Vec<FillInQuestion> {
    generate_fill_in_questions(text, attempt_id, level)
  }
}

struct Template {
  question_type: QuestionType,
  question_text: &'static str,
  options: [(&'static str, &'static str); 4],
  correct_answer: &'static str,
}

const CONNECTOR_TEMPLATE: Template = Template {
  question_type: QuestionType::ConnectorChoice,
  question_text: "The city invested heavily in public transport. ____, traffic congestion has fallen sharply.",
  options: [("a", "However"), ("b", "Therefore"), ("c", "Moreover"), ("d", "Nevertheless")],
  correct_answer: "b",
};

const LEXICAL_TEMPLATE: Template = Template {
  question_type: QuestionType::LexicalReplacement,
  question_text: "Choose the most precise word: Access to education is a ____ factor in a country's long-term prosperity.",
  options: [("a", "crucial"), ("b", "big"), ("c", "good"), ("d", "nice")],
  correct_answer: "a",
};

const COMBINATION_TEMPLATE: Template = Template {
  question_type: QuestionType::GrammarCombination,
  question_text: "Combine the sentences \"Many students work part-time. They have less time to study.\" into one: ____ many students work part-time, they have less time to study.",
  options: [("a", "Because"), ("b", "Although"), ("c", "Unless"), ("d", "Despite")],
  correct_answer: "a",
};

const DEFAULT_TEMPLATE: Template = Template {
  question_type: QuestionType::ConnectorChoice,
  question_text: "Online courses offer a great deal of flexibility. ____, they demand strong self-discipline from learners.",
  options: [("a", "However"), ("b", "Therefore"), ("c", "Furthermore"), ("d", "Consequently")],
  correct_answer: "a",
};

impl Template {
  fn render(&self, attempt_id: &str, position: usize) -> FillInQuestion {
    FillInQuestion {
      id: format!("{attempt_id}-q{}", position + 1),
      attempt_id: attempt_id.to_string(),
      question_type: self.question_type,
      question_text: self.question_text.to_string(),
      options: self
        .options
        .iter()
        .map(|(id, text)| QuestionOption { id: id.to_string(), text: text.to_string() })
        .collect(),
      correct_answer: self.correct_answer.to_string(),
    }
  }
}

/// Mean whitespace-separated words per non-empty sentence; 0.0 when there are none.
fn mean_sentence_words(text: &str) -> f64 {
  let counts: Vec<usize> = text
    .split(['.', '!', '?'])
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| s.split_whitespace().count())
    .collect();
  if counts.is_empty() {
    return 0.0;
  }
  counts.iter().sum::<usize>() as f64 / counts.len() as f64
}

/// Pick up to three practice questions for the weaknesses `text` shows.
/// Never returns an empty list.
#[instrument(level = "debug", skip(text), fields(text_len = text.len(), %attempt_id, ?level))]
pub fn generate_fill_in_questions(text: &str, attempt_id: &str, level: Level) -> Vec<FillInQuestion> {
  let lower = text.to_lowercase();
  let mut picked: Vec<&Template> = Vec::with_capacity(MAX_QUESTIONS);

  if !CONNECTORS.iter().any(|w| lower.contains(w)) {
    picked.push(&CONNECTOR_TEMPLATE);
  }
  if picked.len() < MAX_QUESTIONS && BASIC_WORDS.iter().any(|w| lower.contains(w)) {
    picked.push(&LEXICAL_TEMPLATE);
  }
  let mean = mean_sentence_words(text);
  if picked.len() < MAX_QUESTIONS && mean > 0.0 && mean < SHORT_SENTENCE_MEAN {
    picked.push(&COMBINATION_TEMPLATE);
  }
  if picked.is_empty() {
    picked.push(&DEFAULT_TEMPLATE);
  }

  debug!(count = picked.len(), mean_sentence_words = mean, "Fill-in questions selected");
  picked
    .into_iter()
    .enumerate()
    .map(|(i, t)| t.render(attempt_id, i))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const BLANK: &str = "____";

  const LONG_CONNECTED: &str = "Nevertheless, the rapid expansion of international tourism has created remarkable \
    opportunities for local communities to preserve their heritage while simultaneously generating \
    substantial revenue for public services and infrastructure projects across the region.";

  fn types(qs: &[FillInQuestion]) -> Vec<QuestionType> {
    qs.iter().map(|q| q.question_type).collect()
  }

  #[test]
  fn empty_text_gets_connector_question() {
    let qs = generate_fill_in_questions("", "att-1", Level::Intermediate);
    assert_eq!(types(&qs), vec![QuestionType::ConnectorChoice]);
    assert_eq!(qs[0].options.len(), 4);
    assert_eq!(qs[0].correct_answer, "b");
  }

  #[test]
  fn all_rules_fire_on_short_plain_text() {
    let text = "Cars are bad. Many people drive. It is a big problem.";
    let qs = generate_fill_in_questions(text, "att-2", Level::Beginner);
    assert_eq!(
      types(&qs),
      vec![
        QuestionType::ConnectorChoice,
        QuestionType::LexicalReplacement,
        QuestionType::GrammarCombination
      ]
    );
  }

  #[test]
  fn default_question_when_no_rule_fires() {
    let qs = generate_fill_in_questions(LONG_CONNECTED, "att-3", Level::Advanced);
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].question_type, QuestionType::ConnectorChoice);
    assert_eq!(qs[0].options[0].text, "However");
    assert_eq!(qs[0].correct_answer, "a");
  }

  #[test]
  fn connector_word_is_matched_case_insensitively() {
    let text = "HOWEVER it rains. We stay inside.";
    let qs = generate_fill_in_questions(text, "att-4", Level::Intermediate);
    assert_eq!(types(&qs), vec![QuestionType::GrammarCombination]);
  }

  #[test]
  fn basic_words_match_as_substrings() {
    // "goodness" contains "good"
    let text = format!("{LONG_CONNECTED} Goodness knows.");
    let qs = generate_fill_in_questions(&text, "att-5", Level::Intermediate);
    assert!(types(&qs).contains(&QuestionType::LexicalReplacement));
  }

  #[test]
  fn always_between_one_and_three() {
    let samples = [
      "",
      "   ",
      "...!!!???",
      "Good.",
      LONG_CONNECTED,
      "However many small things matter. Therefore it is good.",
      "a b c d e f g h i j k l m n o p q r s t u v w x y z",
    ];
    for s in samples {
      let n = generate_fill_in_questions(s, "att", Level::Beginner).len();
      assert!((1..=MAX_QUESTIONS).contains(&n), "{s:?} produced {n}");
    }
  }

  #[test]
  fn output_is_deterministic() {
    let text = "Technology is important. People use phones.";
    let a = generate_fill_in_questions(text, "att-6", Level::Advanced);
    let b = generate_fill_in_questions(text, "att-6", Level::Advanced);
    assert_eq!(a, b);
    assert_eq!(a[0].id, "att-6-q1");
    assert!(a.iter().all(|q| q.attempt_id == "att-6" && q.question_text.contains(BLANK)));
  }

  #[test]
  fn correct_answer_is_one_of_the_options() {
    let text = "Cars are bad. Many people drive.";
    for q in generate_fill_in_questions(text, "att-7", Level::Beginner) {
      assert!(q.options.iter().any(|o| o.id == q.correct_answer));
    }
  }

  #[test]
  fn trait_object_delegates_to_heuristic() {
    let g: Box<dyn QuestionGenerator> = Box::new(HeuristicGenerator);
    assert_eq!(
      g.generate("Short one.", "att-8", Level::Beginner),
      generate_fill_in_questions("Short one.", "att-8", Level::Beginner)
    );
  }
}
