//! Process-wide authentication state.
//!
//! The provider is created once, handed to every screen, initialised
//! explicitly with [`SessionProvider::init`] and stopped with
//! [`SessionProvider::teardown`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{AuthProvider, Credentials, Registration};
use crate::error::{Result, SooqError};
use crate::models::{Session, User};

pub struct SessionProvider {
    auth: Arc<dyn AuthProvider>,
    current: Arc<RwLock<Option<Session>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    persist_path: Option<PathBuf>,
}

impl SessionProvider {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            current: Arc::new(RwLock::new(None)),
            listener: Mutex::new(None),
            persist_path: None,
        }
    }

    /// Keep the session in a JSON file so later runs start signed in
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    /// Load the current (or persisted) session and start following auth changes.
    ///
    /// A persisted session that cannot be restored leaves the app signed out.
    /// The file is removed only when the server rejects the token, so a
    /// network failure does not cost the user their sign-in.
    pub async fn init(&self) -> Result<()> {
        let mut session = self.auth.current_session().await?;

        if session.is_none() {
            if let Some(saved) = self.load_persisted().await {
                session = self.restore(saved).await;
            }
        }
        self.set(session);

        let mut changes = self.auth.subscribe();
        let current = Arc::clone(&self.current);
        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let next = changes.borrow_and_update().clone();
                debug!(signed_in = next.is_some(), "Auth state changed");
                *current.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
            }
        });

        if let Some(previous) = self.listener_slot().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn restore(&self, saved: Session) -> Option<Session> {
        match self.auth.restore(saved).await {
            Ok(Some(session)) => {
                info!(user = %session.user.id, "Restored persisted session");
                Some(session)
            }
            Ok(None) => {
                info!("Persisted session is no longer valid");
                self.forget_persisted().await;
                None
            }
            Err(SooqError::Remote {
                status: status @ (401 | 403),
                message,
            }) => {
                warn!(status, %message, "Persisted session rejected");
                self.forget_persisted().await;
                None
            }
            Err(err) => {
                warn!(error = %err, "Could not restore persisted session, continuing signed out");
                None
            }
        }
    }

    /// Stop following auth changes. The last known session stays readable.
    pub fn teardown(&self) {
        if let Some(handle) = self.listener_slot().take() {
            handle.abort();
            debug!("Session listener stopped");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        self.current().map(|session| session.user)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let session = self.auth.sign_in(credentials).await?;
        self.set(Some(session.clone()));
        self.persist(&session).await;
        Ok(session)
    }

    pub async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>> {
        let session = self.auth.sign_up(registration).await?;
        if let Some(session) = &session {
            self.set(Some(session.clone()));
            self.persist(session).await;
        }
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<()> {
        let outcome = self.auth.sign_out().await;
        self.set(None);
        self.forget_persisted().await;
        outcome
    }

    fn set(&self, session: Option<Session>) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    fn listener_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load_persisted(&self) -> Option<Session> {
        let path = self.persist_path.as_deref()?;
        let content = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring unreadable session file");
                None
            }
        }
    }

    async fn persist(&self, session: &Session) {
        let Some(path) = self.persist_path.as_deref() else {
            return;
        };
        if let Err(err) = write_session(path, session).await {
            warn!(path = %path.display(), error = %err, "Failed to persist session");
        }
    }

    async fn forget_persisted(&self) {
        let Some(path) = self.persist_path.as_deref() else {
            return;
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed session file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to remove session file")
            }
        }
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn write_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(session)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
