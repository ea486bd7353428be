//! In-memory stand-in for the task endpoints.
//!
//! Every call yields once before answering so that operations issued together
//! through `tokio::join!` genuinely overlap.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::StatusCode;

use super::{
    api::{ApiResult, TaskApi},
    error::ClientError,
    pagination::total_pages,
};
use crate::models::{MessageResponse, Task, TaskPage, UpdateTask};

const OWNER: i64 = 1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

#[derive(Default)]
pub struct FakeTaskApi {
    // newest first
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
    reject_session: AtomicBool,
    // oldest tasks to drop before answering each upcoming list call
    shrink_queue: Mutex<VecDeque<usize>>,
}

fn server_error() -> ClientError {
    ClientError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "boom".to_string(),
    }
}

impl FakeTaskApi {
    /// Seeds `count` tasks titled `task 1` (oldest) to `task {count}` (newest).
    pub fn with_tasks(count: usize) -> Self {
        let api = Self::default();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        {
            let mut tasks = api.tasks.lock().unwrap();
            for n in 1..=count {
                let created_at = base + Duration::minutes(n as i64);
                tasks.insert(
                    0,
                    Task {
                        id: api.mint_id(),
                        title: format!("task {n}"),
                        completed: false,
                        user_id: OWNER,
                        created_at,
                        updated_at: created_at,
                    },
                );
            }
        }
        api
    }

    fn mint_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn calls(&self) -> Calls {
        Calls {
            list: self.list_calls.load(Ordering::SeqCst),
            create: self.create_calls.load(Ordering::SeqCst),
            update: self.update_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    pub fn stored_titles(&self) -> Vec<String> {
        self.tasks.lock().unwrap().iter().map(|t| t.title.clone()).collect()
    }

    pub fn stored(&self, id: &str) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }

    /// Simulates deletions made elsewhere.
    pub fn remove_oldest(&self, count: usize) {
        let mut tasks = self.tasks.lock().unwrap();
        let keep = tasks.len().saturating_sub(count);
        tasks.truncate(keep);
    }

    /// Each upcoming `list` call first removes the next count of oldest tasks.
    pub fn shrink_before_lists(&self, removals: Vec<usize>) {
        self.shrink_queue.lock().unwrap().extend(removals);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn reject_session(&self, reject: bool) {
        self.reject_session.store(reject, Ordering::SeqCst);
    }

    fn check_session(&self) -> ApiResult<()> {
        if self.reject_session.load(Ordering::SeqCst) {
            return Err(ClientError::Unauthorized);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskApi for FakeTaskApi {
    async fn list(&self, page: u32, limit: u32) -> ApiResult<TaskPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_session()?;
        if let Some(count) = self.shrink_queue.lock().unwrap().pop_front() {
            self.remove_oldest(count);
        }

        let tasks = self.tasks.lock().unwrap();
        let total_count = tasks.len() as u32;
        let todos = tasks
            .iter()
            .skip(((page.max(1) - 1) * limit) as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(TaskPage {
            todos,
            total_pages: total_pages(total_count, limit),
            current_page: page,
            total_count,
        })
    }

    async fn create(&self, title: &str) -> ApiResult<Task> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_session()?;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        let now = Utc::now();
        let task = Task {
            id: self.mint_id(),
            title: title.trim().to_string(),
            completed: false,
            user_id: OWNER,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().insert(0, task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, changes: &UpdateTask) -> ApiResult<Task> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_session()?;
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ClientError::NotFound("Note not found".to_string()))?;
        if let Some(title) = &changes.title {
            task.title = title.trim().to_string();
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> ApiResult<MessageResponse> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_session()?;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(ClientError::NotFound("Note not found".to_string()));
        }
        Ok(MessageResponse {
            message: "Note deleted successfully".to_string(),
        })
    }
}
