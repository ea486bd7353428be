//! Task list controller.
//!
//! Holds one page of the caller's tasks and reconciles user intents against
//! the server:
//!
//! - `add` is optimistic. The entry and the total count appear before the
//!   server answers and are unwound if the create fails.
//! - `update`/`toggle_complete` wait for the server and display its copy.
//! - `delete` waits for the server, then refetches so the page pulls up the
//!   next item or moves back when the last page empties. Only one deletion
//!   may be in flight.
//!
//! Every operation absorbs its own failures. Nothing is retried; errors become
//! a transient message that expires after [`ERROR_DISPLAY_DURATION`]. A
//! rejected session resets the view to its signed-out state.
//!
//! State lives behind a mutex that is never held across an `.await`, so
//! intents may be issued while earlier requests are outstanding.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use super::{
    api::TaskApi,
    entry::{is_local_id, Entry, TempId},
    error::ClientError,
    pagination::{PageControl, PageWindow},
};
use crate::models::UpdateTask;

pub const ERROR_DISPLAY_DURATION: Duration = Duration::from_secs(3);

const ADD_FAILED: &str = "Failed to add task. Please try again.";
const UPDATE_FAILED: &str = "Failed to update task. Please try again.";
const DELETE_FAILED: &str = "Failed to delete task. Please try again.";
const LOAD_FAILED: &str = "Failed to load tasks. Please try again.";

#[derive(Debug, Clone)]
struct TransientError {
    message: String,
    raised_at: Instant,
}

impl TransientError {
    fn is_live(&self) -> bool {
        self.raised_at.elapsed() < ERROR_DISPLAY_DURATION
    }
}

#[derive(Debug)]
struct ListState {
    window: PageWindow,
    entries: Vec<Entry>,
    deleting: Option<String>,
    error: Option<TransientError>,
    draft: String,
    signed_out: bool,
    /// Bumped whenever a list response or a reset replaces the page.
    generation: u64,
}

impl ListState {
    fn new(page_size: u32) -> Self {
        Self {
            window: PageWindow::new(page_size),
            entries: Vec::new(),
            deleting: None,
            error: None,
            draft: String::new(),
            signed_out: false,
            generation: 0,
        }
    }
}

/// What presentation renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub entries: Vec<Entry>,
    pub window: PageWindow,
    pub controls: Vec<PageControl>,
    pub deleting: Option<String>,
    pub error: Option<String>,
    pub draft: String,
    /// Set once the server rejected the session; the app should show its login screen.
    pub signed_out: bool,
}

/// Clears the in-flight deletion marker however `delete` exits.
struct DeletionGuard<'a> {
    state: &'a Mutex<ListState>,
    id: String,
}

impl Drop for DeletionGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.deleting.as_deref() == Some(self.id.as_str()) {
            state.deleting = None;
        }
    }
}

pub struct TaskListController<A> {
    api: A,
    state: Mutex<ListState>,
}

impl<A: TaskApi> TaskListController<A> {
    pub fn new(api: A, page_size: u32) -> Self {
        Self {
            api,
            state: Mutex::new(ListState::new(page_size)),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        lock(&self.state)
    }

    pub fn view(&self) -> ListView {
        let mut state = self.state();
        if state.error.as_ref().is_some_and(|e| !e.is_live()) {
            state.error = None;
        }

        ListView {
            entries: state.entries.clone(),
            window: state.window,
            controls: state.window.controls(),
            deleting: state.deleting.clone(),
            error: state.error.as_ref().map(|e| e.message.clone()),
            draft: state.draft.clone(),
            signed_out: state.signed_out,
        }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state().draft = text.into();
    }

    pub fn dismiss_error(&self) {
        self.state().error = None;
    }

    /// Submits the current draft.
    pub async fn submit_draft(&self) {
        let draft = self.state().draft.clone();
        self.add(&draft).await;
    }

    /// Fetches the current page. The last response to arrive wins.
    ///
    /// When the page vanished under us the list moves to the last page and
    /// fetches again. Each such round lands on a lower page, so this ends at
    /// page 1 at the latest.
    pub async fn refresh(&self) {
        loop {
            let (page, limit) = {
                let state = self.state();
                (state.window.current_page, state.window.page_size)
            };

            let result = match self.api.list(page, limit).await {
                Ok(result) => result,
                Err(err) => return self.fail(LOAD_FAILED, err),
            };

            let mut state = self.state();
            state.generation += 1;
            state.signed_out = false;
            state.entries = result.todos.into_iter().map(Entry::Confirmed).collect();
            state.window.total_count = result.total_count;
            state.window.total_pages = result.total_pages;

            if state.window.current_page <= state.window.last_page() {
                return;
            }
            tracing::debug!(
                page = state.window.current_page,
                total_pages = state.window.total_pages,
                "current page no longer exists, moving to the last page"
            );
            state.window.current_page = state.window.last_page();
        }
    }

    pub async fn add(&self, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }

        let temp_id = TempId::generate();
        let (generation, navigated, evicted) = {
            let mut state = self.state();
            state.draft.clear();
            let count = state.window.total_count + 1;
            state.window.set_total_count(count);

            let pending = Entry::pending(temp_id.clone(), title);
            if state.window.current_page != 1 {
                // Newest first: the new task can only land on page 1.
                state.window.current_page = 1;
                state.entries = vec![pending];
                (state.generation, true, Vec::new())
            } else {
                state.entries.insert(0, pending);
                let page_size = state.window.page_size as usize;
                let evicted = if state.entries.len() > page_size {
                    state.entries.split_off(page_size)
                } else {
                    Vec::new()
                };
                (state.generation, false, evicted)
            }
        };

        match self.api.create(title).await {
            Ok(task) => {
                tracing::debug!(task_id = %task.id, temp_id = %temp_id, "task created");
                let mut state = self.state();
                if let Some(entry) = state
                    .entries
                    .iter_mut()
                    .find(|entry| entry.is_pending_for(&temp_id))
                {
                    *entry = Entry::Confirmed(task);
                }
            }
            Err(err) => {
                let unauthorized = err.is_unauthorized();
                self.roll_back_add(&temp_id, generation, evicted);
                self.fail(ADD_FAILED, err);
                if unauthorized {
                    return;
                }
            }
        }

        if navigated {
            self.refresh().await;
        }
    }

    /// Undoes the optimistic part of `add`: the entry, the count bump, and the
    /// entries pushed off the page.
    ///
    /// `generation` is the one seen when the entry was inserted. If a list
    /// response landed since, the page and its counts are the server's and
    /// never included this task, so only a stray pending entry is removed.
    fn roll_back_add(&self, temp_id: &TempId, generation: u64, evicted: Vec<Entry>) {
        let mut state = self.state();
        state.entries.retain(|entry| !entry.is_pending_for(temp_id));
        if state.generation != generation {
            return;
        }

        let count = state.window.total_count.saturating_sub(1);
        state.window.set_total_count(count);

        if state.window.current_page == 1 {
            // Pending entries pushed off by this add settle on their own.
            let room = (state.window.page_size as usize).saturating_sub(state.entries.len());
            let restore: Vec<Entry> = evicted
                .into_iter()
                .filter(|entry| !entry.is_pending())
                .filter(|entry| state.entries.iter().all(|shown| shown.id() != entry.id()))
                .take(room)
                .collect();
            state.entries.extend(restore);
        }
    }

    pub async fn update(&self, id: &str, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        let changes = UpdateTask {
            title: Some(title.to_string()),
            completed: None,
        };
        self.apply_change(id, changes).await;
    }

    pub async fn toggle_complete(&self, id: &str, completed: bool) {
        let changes = UpdateTask {
            title: None,
            completed: Some(completed),
        };
        self.apply_change(id, changes).await;
    }

    async fn apply_change(&self, id: &str, changes: UpdateTask) {
        if is_local_id(id) {
            tracing::debug!(id, "ignoring change to a task the server hasn't confirmed");
            return;
        }

        match self.api.update(id, &changes).await {
            Ok(task) => {
                let mut state = self.state();
                if let Some(entry) = state.entries.iter_mut().find(|entry| entry.is_confirmed(&task.id)) {
                    *entry = Entry::Confirmed(task);
                }
            }
            Err(err) => self.fail(UPDATE_FAILED, err),
        }
    }

    pub async fn delete(&self, id: &str) {
        let Some(_guard) = self.begin_deletion(id) else {
            tracing::debug!(id, "deletion already in flight, ignoring");
            return;
        };

        if is_local_id(id) {
            tracing::debug!(id, "ignoring deletion of a task the server hasn't confirmed");
            return;
        }

        match self.api.delete(id).await {
            Ok(_) => {
                {
                    let mut state = self.state();
                    let count = state.window.total_count.saturating_sub(1);
                    state.window.set_total_count(count);
                    let total_pages = state.window.total_pages;
                    if total_pages > 0 && state.window.current_page > total_pages {
                        state.window.current_page = total_pages;
                    }
                }
                self.refresh().await;
            }
            Err(err) => self.fail(DELETE_FAILED, err),
        }
    }

    fn begin_deletion(&self, id: &str) -> Option<DeletionGuard<'_>> {
        let mut state = self.state();
        if state.deleting.is_some() {
            return None;
        }
        state.deleting = Some(id.to_string());
        Some(DeletionGuard {
            state: &self.state,
            id: id.to_string(),
        })
    }

    pub async fn paginate(&self, page: u32) {
        {
            let mut state = self.state();
            if state.deleting.is_some()
                || page == state.window.current_page
                || !state.window.contains(page)
            {
                return;
            }
            state.window.current_page = page;
        }
        self.refresh().await;
    }

    fn fail(&self, message: &str, err: ClientError) {
        let mut state = self.state();

        if err.is_unauthorized() {
            tracing::warn!("{message} Session rejected, resetting the task list");
            let page_size = state.window.page_size;
            let generation = state.generation + 1;
            *state = ListState::new(page_size);
            state.generation = generation;
            state.signed_out = true;
            return;
        }

        tracing::error!(error = %err, "{message}");
        state.error = Some(TransientError {
            message: message.to_string(),
            raised_at: Instant::now(),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
