//! In-process tables standing in for the managed datastore.
//!
//! Each table sits behind its own `RwLock`. When a method needs two guards it
//! always takes `items` before `reviews`.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{Attempt, Feedback, LearningItem, Level, Task, TaskKind};
use crate::srs::ReviewState;

type ReviewKey = (String, String); // (learner_id, item_id)

#[derive(Clone, Default)]
pub struct Store {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    attempts: Arc<RwLock<HashMap<String, Attempt>>>,
    feedback: Arc<RwLock<HashMap<String, Feedback>>>,
    items: Arc<RwLock<HashMap<String, LearningItem>>>,
    reviews: Arc<RwLock<HashMap<ReviewKey, ReviewState>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // --- tasks ---

    /// Insert a task; returns false (and keeps the existing one) on id collision.
    pub async fn insert_task(&self, task: Task) -> bool {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return false;
        }
        tasks.insert(task.id.clone(), task);
        true
    }

    pub async fn get_task(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    /// Tasks matching the optional filters, ordered by id.
    pub async fn list_tasks(&self, kind: Option<TaskKind>, level: Option<Level>) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut out: Vec<Task> = tasks
            .values()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .filter(|t| level.map_or(true, |l| t.level == l))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    // --- attempts & feedback ---

    #[instrument(level = "debug", skip(self, attempt), fields(id = %attempt.id, learner = %attempt.learner_id))]
    pub async fn insert_attempt(&self, attempt: Attempt) {
        self.attempts.write().await.insert(attempt.id.clone(), attempt);
    }

    /// The attempt, only if it belongs to `learner_id`.
    pub async fn get_attempt(&self, learner_id: &str, id: &str) -> Option<Attempt> {
        self.attempts
            .read()
            .await
            .get(id)
            .filter(|a| a.learner_id == learner_id)
            .cloned()
    }

    /// Newest first.
    pub async fn list_attempts(&self, learner_id: &str) -> Vec<Attempt> {
        let mut out: Vec<Attempt> = self
            .attempts
            .read()
            .await
            .values()
            .filter(|a| a.learner_id == learner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Insert or replace the feedback for an attempt.
    pub async fn put_feedback(&self, fb: Feedback) {
        debug!(attempt_id = %fb.attempt_id, schema_version = %fb.schema_version, "Feedback stored");
        self.feedback.write().await.insert(fb.attempt_id.clone(), fb);
    }

    pub async fn get_feedback(&self, attempt_id: &str) -> Option<Feedback> {
        self.feedback.read().await.get(attempt_id).cloned()
    }

    // --- learning items & review states ---

    /// Insert an item together with its initial review state.
    #[instrument(level = "debug", skip(self, item, initial), fields(id = %item.id, learner = %item.learner_id))]
    pub async fn insert_item(&self, item: LearningItem, initial: ReviewState) {
        let mut items = self.items.write().await;
        let mut reviews = self.reviews.write().await;
        reviews.insert((item.learner_id.clone(), item.id.clone()), initial);
        items.insert(item.id.clone(), item);
    }

    /// The learner's items with their review state, ordered by creation time.
    pub async fn list_items(&self, learner_id: &str) -> Vec<(LearningItem, Option<ReviewState>)> {
        let items = self.items.read().await;
        let reviews = self.reviews.read().await;
        let mut out: Vec<(LearningItem, Option<ReviewState>)> = items
            .values()
            .filter(|i| i.learner_id == learner_id)
            .map(|i| {
                let state = reviews.get(&(learner_id.to_string(), i.id.clone())).cloned();
                (i.clone(), state)
            })
            .collect();
        out.sort_by(|a, b| a.0.created_at.cmp(&b.0.created_at).then_with(|| a.0.id.cmp(&b.0.id)));
        out
    }

    /// Read-modify-write of one item's review state under a single write guard.
    ///
    /// `f` receives the stored state (None if the item was never scheduled) and
    /// returns the replacement. Returns None when the item does not exist for
    /// this learner.
    #[instrument(level = "debug", skip(self, f))]
    pub async fn update_review<F>(&self, learner_id: &str, item_id: &str, f: F) -> Option<(LearningItem, ReviewState)>
    where
        F: FnOnce(Option<&ReviewState>) -> ReviewState,
    {
        let items = self.items.read().await;
        let item = items.get(item_id).filter(|i| i.learner_id == learner_id)?.clone();
        let mut reviews = self.reviews.write().await;
        let key = (learner_id.to_string(), item_id.to_string());
        let next = f(reviews.get(&key));
        reviews.insert(key, next.clone());
        Some((item, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::CalendarDay;
    use crate::domain::{ItemKind, TaskSource};
    use crate::srs::advance;
    use chrono::{Duration, Utc};

    fn day(s: &str) -> CalendarDay {
        s.parse().expect("valid day")
    }

    fn item(id: &str, learner: &str) -> LearningItem {
        LearningItem {
            id: id.into(),
            learner_id: learner.into(),
            kind: ItemKind::Idiom,
            term: "a blessing in disguise".into(),
            meaning: "something good that seemed bad at first".into(),
            example: None,
            created_at: Utc::now(),
        }
    }

    fn attempt(id: &str, learner: &str, age_secs: i64) -> Attempt {
        Attempt {
            id: id.into(),
            learner_id: learner.into(),
            task_id: "w2-remote-work".into(),
            text: "Essay".into(),
            level: Level::Intermediate,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn task_ids_are_not_overwritten() {
        let store = Store::new();
        let t = Task {
            id: "t".into(),
            kind: TaskKind::WritingTask2,
            level: Level::Beginner,
            title: "first".into(),
            prompt: "p".into(),
            source: TaskSource::LocalBank,
        };
        assert!(store.insert_task(t.clone()).await);
        assert!(!store.insert_task(Task { title: "second".into(), ..t }).await);
        assert_eq!(store.get_task("t").await.unwrap().title, "first");
        assert_eq!(store.list_tasks(Some(TaskKind::WritingTask1), None).await.len(), 0);
        assert_eq!(store.list_tasks(Some(TaskKind::WritingTask2), Some(Level::Beginner)).await.len(), 1);
    }

    #[tokio::test]
    async fn attempts_are_scoped_to_their_learner() {
        let store = Store::new();
        store.insert_attempt(attempt("old", "alice", 60)).await;
        store.insert_attempt(attempt("new", "alice", 0)).await;
        store.insert_attempt(attempt("bobs", "bob", 0)).await;

        assert!(store.get_attempt("bob", "old").await.is_none());
        let ids: Vec<String> = store.list_attempts("alice").await.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn update_review_sees_previous_write() {
        let store = Store::new();
        let today = day("2024-05-01");
        store.insert_item(item("i1", "alice"), ReviewState::new_item(today)).await;

        for _ in 0..3 {
            store
                .update_review("alice", "i1", |prior| advance(prior, true, today))
                .await
                .expect("item exists");
        }
        let (_, state) = store.update_review("alice", "i1", |prior| advance(prior, true, today)).await.unwrap();
        assert_eq!(state.stage, 4);
        assert_eq!(state.total_correct, 4);

        assert!(store.update_review("bob", "i1", |p| advance(p, true, today)).await.is_none());
        assert!(store.update_review("alice", "missing", |p| advance(p, true, today)).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_reviews_are_all_counted() {
        let store = Store::new();
        let today = day("2024-05-01");
        store.insert_item(item("i1", "alice"), ReviewState::new_item(today)).await;

        let mut handles = Vec::new();
        for n in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.update_review("alice", "i1", |p| advance(p, n % 2 == 0, today)).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let items = store.list_items("alice").await;
        let state = items[0].1.clone().unwrap();
        assert_eq!(state.reviews(), 20);
        assert_eq!(state.total_correct, 10);
    }
}
