//! Client side of the to-do service: session handling, the HTTP client, and
//! the controller that presentation drives.

pub mod api;
pub mod config;
pub mod controller;
pub mod entry;
pub mod error;
pub mod pagination;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use api::{ApiClient, TaskApi};
pub use config::ClientConfig;
pub use controller::{ListView, TaskListController};
pub use entry::{Entry, TempId};
pub use error::ClientError;
pub use pagination::{page_controls, PageControl, PageWindow};
pub use session::{CredentialStore, FileCredentialStore, MemoryCredentialStore, Session};
