use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::backend::types::{Credentials, Registration, Subscription};
use crate::error::Result;
use crate::models::{Listing, ListingStatus, NewListing, Session};

/// Reads and writes against the listings table
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Available listings, newest first, optionally restricted to one category
    async fn available(&self, category: Option<&str>) -> Result<Vec<Listing>>;

    /// Available listings whose name or location contains `term`.
    /// A blank term behaves like `available(None)`.
    async fn search(&self, term: &str) -> Result<Vec<Listing>>;

    async fn by_id(&self, id: Uuid) -> Result<Option<Listing>>;

    /// Every listing owned by `seller_id`, whatever its status, newest first
    async fn by_seller(&self, seller_id: Uuid) -> Result<Vec<Listing>>;

    async fn insert(&self, listing: &NewListing) -> Result<Listing>;

    async fn set_views(&self, id: Uuid, views: i64) -> Result<()>;

    /// Move an available listing owned by `seller_id` to `status`.
    /// Returns `false` when no row matched all three conditions.
    async fn set_status(&self, id: Uuid, seller_id: Uuid, status: ListingStatus) -> Result<bool>;
}

/// Hosted authentication
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;

    /// `None` when the account waits for e-mail confirmation
    async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>>;

    async fn sign_out(&self) -> Result<()>;

    async fn current_session(&self) -> Result<Option<Session>>;

    /// Re-validate a session persisted by an earlier run
    async fn restore(&self, session: Session) -> Result<Option<Session>>;

    /// Auth-state changes, starting from the current value
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

/// Object storage for listing images
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    fn public_url(&self, path: &str) -> String;
}

/// Server push of listing inserts
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to inserts, optionally scoped server-side to one category
    async fn subscribe_inserts(&self, category: Option<&str>) -> Result<Subscription>;
}
