use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::Listing;

/// E-mail/password pair for sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up request; `full_name` and `username` travel as user metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub username: String,
}

/// Live stream of listings inserted into the store.
///
/// Dropping the subscription stops the worker that feeds it, which closes the
/// server-side channel.
pub struct Subscription {
    events: mpsc::Receiver<Listing>,
    worker: JoinHandle<()>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<Listing>, worker: JoinHandle<()>) -> Self {
        Self { events, worker }
    }

    /// Next inserted listing, or `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<Listing> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
