//! Client-side credential handling.
//!
//! A [`Session`] is created once and handed to the API client. It reads the
//! stored credentials when opened, serves the bearer token for every request,
//! and owns the "force logout" hook that fires when the server rejects the
//! token.

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use crate::models::{AuthResponse, PublicUser};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub user: PublicUser,
}

impl From<AuthResponse> for StoredCredentials {
    fn from(response: AuthResponse) -> Self {
        Self {
            token: response.token,
            user: response.user,
        }
    }
}

/// Durable storage for the credentials of the signed-in user.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredentials>, ClientError>;
    fn save(&self, credentials: &StoredCredentials) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Stores credentials as a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>, ClientError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(credentials)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: StoredCredentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>, ClientError> {
        Ok(lock(&self.inner).clone())
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<(), ClientError> {
        *lock(&self.inner) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *lock(&self.inner) = None;
        Ok(())
    }
}

pub type LogoutHook = Arc<dyn Fn() + Send + Sync>;

pub struct Session {
    store: Arc<dyn CredentialStore>,
    current: Mutex<Option<StoredCredentials>>,
    on_force_logout: Option<LogoutHook>,
}

impl Session {
    /// Opens the session, reading whatever the store holds. An unreadable
    /// store is treated as signed out.
    pub fn open(store: Arc<dyn CredentialStore>, on_force_logout: Option<LogoutHook>) -> Self {
        let current = store.load().unwrap_or_else(|e| {
            tracing::warn!("discarding unreadable stored credentials: {}", e);
            None
        });

        Self {
            store,
            current: Mutex::new(current),
            on_force_logout,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryCredentialStore::new()), None)
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.current).as_ref().map(|c| c.token.clone())
    }

    pub fn user(&self) -> Option<PublicUser> {
        lock(&self.current).as_ref().map(|c| c.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.current).is_some()
    }

    pub fn sign_in(&self, credentials: StoredCredentials) -> Result<(), ClientError> {
        self.store.save(&credentials)?;
        *lock(&self.current) = Some(credentials);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), ClientError> {
        *lock(&self.current) = None;
        self.store.clear()
    }

    /// Purges credentials after the server rejected them, then runs the reload hook.
    pub fn force_logout(&self) {
        if let Err(e) = self.sign_out() {
            tracing::error!("failed to clear stored credentials: {}", e);
        }
        if let Some(hook) = &self.on_force_logout {
            hook();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
