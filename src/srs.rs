//! Stage-ladder spaced-repetition scheduler.
//!
//! A review state sits on a fixed ladder of intervals. A correct answer climbs
//! one rung (saturating at the top), a wrong answer drops back to the bottom
//! and schedules the item for tomorrow. Everything here is pure: the caller
//! supplies "today" (see `dates::today`).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::dates::{compare_dates, CalendarDay};

pub const MAX_STAGE: u8 = 5;

/// Days until the next review, indexed by stage.
pub const INTERVAL_DAYS: [i64; MAX_STAGE as usize + 1] = [0, 1, 3, 7, 14, 30];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
  pub stage: u8,
  pub next_review_on: CalendarDay,
  pub last_review_on: Option<CalendarDay>,
  pub correct_streak: u32,
  pub total_correct: u32,
  pub total_wrong: u32,
}

impl ReviewState {
  /// State of an item that has never been reviewed: due immediately.
  pub fn new_item(today: CalendarDay) -> Self {
    Self {
      stage: 0,
      next_review_on: today,
      last_review_on: None,
      correct_streak: 0,
      total_correct: 0,
      total_wrong: 0,
    }
  }

  pub fn reviews(&self) -> u32 {
    self.total_correct + self.total_wrong
  }
}

/// Next state after one review.
///
/// With no prior state the item is new and the outcome is not scored yet: the
/// result is `ReviewState::new_item(today)` for either answer.
pub fn advance(prior: Option<&ReviewState>, is_correct: bool, today: CalendarDay) -> ReviewState {
  let Some(prior) = prior else {
    return ReviewState::new_item(today);
  };

  if is_correct {
    let stage = prior.stage.saturating_add(1).min(MAX_STAGE);
    ReviewState {
      stage,
      next_review_on: today.saturating_add_days(INTERVAL_DAYS[stage as usize]),
      last_review_on: Some(today),
      correct_streak: prior.correct_streak + 1,
      total_correct: prior.total_correct + 1,
      total_wrong: prior.total_wrong,
    }
  } else {
    ReviewState {
      stage: 0,
      next_review_on: today.saturating_add_days(1),
      last_review_on: Some(today),
      correct_streak: 0,
      total_correct: prior.total_correct,
      total_wrong: prior.total_wrong + 1,
    }
  }
}

/// True when the item may be reviewed on `today`.
pub fn is_due(next_review_on: CalendarDay, today: CalendarDay) -> bool {
  compare_dates(next_review_on, today) != Ordering::Greater
}
