//! Application state: datastore, prompts, OpenAI client, auth and task selection.
//!
//! This module owns:
//!   - the datastore (tasks, attempts, feedback, learning items, review states)
//!   - the prompts struct (from TOML or defaults)
//!   - optional OpenAI client
//!   - the auth verifier
//!   - the fill-in question generator

use std::{collections::HashMap, sync::Arc};

use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{AuthError, AuthVerifier};
use crate::config::{load_app_config_from_env, AppConfig, Prompts};
use crate::domain::{Level, Task, TaskKind, TaskSource};
use crate::fill_in::{HeuristicGenerator, QuestionGenerator};
use crate::openai::OpenAI;
use crate::seeds::seed_tasks;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub auth: AuthVerifier,
    pub questions: Arc<dyn QuestionGenerator>,
    /// Last task id served per (kind, level) filter, to avoid immediate repeats.
    pub last_served: Arc<RwLock<HashMap<String, String>>>,
}

impl AppState {
    /// Build state from env: load config, seed tasks, init OpenAI and auth.
    /// Fails when the auth platform is configured but unusable.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, AuthError> {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "ielts_backend", base_url = %oa.base_url, model = %oa.model, max_attempts = oa.max_attempts, "OpenAI enabled.");
        } else {
            warn!(target: "ielts_backend", "OpenAI disabled (no OPENAI_API_KEY). Model-backed routes will answer LLM_ERROR.");
        }

        let auth = AuthVerifier::from_env()?;
        if auth.is_development() {
            warn!(target: "ielts_backend", "SUPABASE_URL/SUPABASE_ANON_KEY not set; development auth (token = learner id).");
        }

        Ok(Self::build(cfg, openai, auth).await)
    }

    /// Assemble state from explicit parts: bank tasks first, then built-in seeds
    /// (seeds never overwrite bank ids).
    pub async fn build(cfg: AppConfig, openai: Option<OpenAI>, auth: AuthVerifier) -> Self {
        let store = Store::new();

        for tc in cfg.tasks {
            if tc.prompt.trim().is_empty() {
                error!(target: "ielts", kind = ?tc.kind, "Skipping bank task: empty prompt.");
                continue;
            }
            let id = tc.id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let task = Task {
                id: id.clone(),
                kind: tc.kind,
                level: tc.level,
                title: tc.title.unwrap_or_else(|| tc.kind.label().to_string()),
                prompt: tc.prompt,
                source: TaskSource::LocalBank,
            };
            if !store.insert_task(task).await {
                warn!(target: "ielts", %id, "Duplicate bank task id; keeping the first.");
            }
        }
        for t in seed_tasks() {
            store.insert_task(t).await;
        }

        let inventory = store.list_tasks(None, None).await;
        let mut count_by_kind: HashMap<TaskKind, (usize, usize)> = HashMap::new();
        for t in &inventory {
            let entry = count_by_kind.entry(t.kind).or_insert((0, 0));
            match t.source {
                TaskSource::LocalBank => entry.0 += 1,
                TaskSource::Seed => entry.1 += 1,
            }
        }
        for (kind, (bank, seed)) in count_by_kind {
            info!(target: "ielts", kind = kind.label(), local_bank = bank, seed = seed, "Startup task inventory");
        }

        Self {
            store,
            openai,
            prompts: cfg.prompts,
            auth,
            questions: Arc::new(HeuristicGenerator),
            last_served: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Selection policy: random task matching the filter, avoiding the one served
    /// last for the same filter when there is a choice. None if nothing matches.
    #[instrument(level = "info", skip(self))]
    pub async fn choose_task(&self, kind: Option<TaskKind>, level: Option<Level>) -> Option<Task> {
        let pool = self.store.list_tasks(kind, level).await;
        let filter_key = format!("{kind:?}/{level:?}");
        let last = { self.last_served.read().await.get(&filter_key).cloned() };

        let candidates: Vec<&Task> = match &last {
            Some(last_id) if pool.len() > 1 => pool.iter().filter(|t| &t.id != last_id).collect(),
            _ => pool.iter().collect(),
        };
        let chosen = candidates.choose(&mut rand::thread_rng()).map(|t| (*t).clone())?;

        self.last_served
            .write()
            .await
            .insert(filter_key, chosen.id.clone());
        info!(target: "ielts", chosen = %chosen.id, pool = pool.len(), "Task chosen");
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_app_config;

    async fn state_with(toml: &str) -> AppState {
        let cfg = parse_app_config(toml).expect("valid toml");
        AppState::build(cfg, None, AuthVerifier::Development).await
    }

    #[tokio::test]
    async fn bank_tasks_join_the_seeds() {
        let state = state_with(
            r#"
              [[tasks]]
              id = "bank-1"
              kind = "speaking_part1"
              prompt = "Do you enjoy cooking?"

              [[tasks]]
              kind = "writing_task2"
              prompt = "   "
            "#,
        )
        .await;
        let all = state.store.list_tasks(None, None).await;
        assert_eq!(all.len(), seed_tasks().len() + 1);
        let bank = state.store.get_task("bank-1").await.unwrap();
        assert_eq!(bank.source, TaskSource::LocalBank);
        assert_eq!(bank.title, "Speaking Part 1");
    }

    #[tokio::test]
    async fn choose_task_avoids_immediate_repeat() {
        let state = state_with("").await;
        let kind = Some(TaskKind::WritingTask2);
        let mut prev = state.choose_task(kind, None).await.unwrap().id;
        for _ in 0..20 {
            let next = state.choose_task(kind, None).await.unwrap();
            assert_eq!(next.kind, TaskKind::WritingTask2);
            assert_ne!(next.id, prev);
            prev = next.id;
        }
    }

    #[tokio::test]
    async fn choose_task_with_single_candidate_repeats_it() {
        let state = state_with("").await;
        let filter = (Some(TaskKind::SpeakingPart2), Some(Level::Intermediate));
        let a = state.choose_task(filter.0, filter.1).await.unwrap();
        let b = state.choose_task(filter.0, filter.1).await.unwrap();
        assert_eq!(a.id, b.id);
        assert!(state.choose_task(Some(TaskKind::WritingTask1), Some(Level::Advanced)).await.is_none());
    }
}
