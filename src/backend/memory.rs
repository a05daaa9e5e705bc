use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::traits::{AuthProvider, ChangeFeed, ListingStore, ObjectStorage};
use crate::backend::types::{Credentials, Registration, Subscription};
use crate::error::{Result, SooqError};
use crate::models::{Condition, Listing, ListingStatus, NewListing, Session, User};

const DEMO_SELLER: Uuid = Uuid::from_u128(0x6b1d_4c5e_0f3a_4a7e_9c2d_5e8f_1a3b_7c90);

struct Account {
    password: String,
    user: User,
}

/// In-process backend used when no hosted project is configured, and by tests
pub struct MemoryBackend {
    listings: Mutex<Vec<Listing>>,
    accounts: Mutex<HashMap<String, Account>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    session: watch::Sender<Option<Session>>,
    inserts: broadcast::Sender<Listing>,
    listing_calls: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        let (inserts, _) = broadcast::channel(64);
        Self {
            listings: Mutex::new(Vec::new()),
            accounts: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            session,
            inserts,
            listing_calls: AtomicUsize::new(0),
        }
    }

    /// Backend pre-filled with a handful of listings from Syrian cities
    pub fn with_demo_listings() -> Self {
        let backend = Self::new();
        let now = Utc::now();
        let demo = [
            (
                "Apple MacBook Pro",
                1299.0,
                Condition::Used,
                "Damascus, Syria",
                "electronics",
                "https://images.unsplash.com/photo-1517336714731-489689fd1ca8",
            ),
            (
                "Samsung Galaxy S21",
                799.0,
                Condition::New,
                "Aleppo, Syria",
                "electronics",
                "https://images.unsplash.com/photo-1610945415295-d9bbf067e59c",
            ),
            (
                "Wooden Dining Table",
                350.0,
                Condition::Used,
                "Homs, Syria",
                "furniture",
                "https://images.unsplash.com/photo-1530018607912-eff2daa1bac4",
            ),
            (
                "Leather Jacket",
                120.0,
                Condition::New,
                "Latakia, Syria",
                "clothing",
                "https://images.unsplash.com/photo-1551028719-00167b16eac5",
            ),
            (
                "Honda Civic 2018",
                15000.0,
                Condition::Used,
                "Damascus, Syria",
                "vehicles",
                "https://images.unsplash.com/photo-1533106418989-88406c7cc8ca",
            ),
            (
                "LEGO Star Wars Set",
                79.99,
                Condition::New,
                "Aleppo, Syria",
                "toys",
                "https://images.unsplash.com/photo-1563901935883-cb9fb1be74b4",
            ),
            (
                "Harry Potter Book Collection",
                89.99,
                Condition::Used,
                "Homs, Syria",
                "books",
                "https://images.unsplash.com/photo-1551269901-5c5e14c25df7",
            ),
            (
                "Wireless Headphones",
                129.99,
                Condition::New,
                "Latakia, Syria",
                "electronics",
                "https://images.unsplash.com/photo-1578319439584-104c94d37305",
            ),
        ];
        let rows = demo.into_iter().enumerate();
        for (age, (name, price, condition, location, category, image)) in rows {
            backend.seed(Listing {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: None,
                price,
                condition,
                category: Some(category.to_string()),
                location: location.to_string(),
                image_url: Some(image.to_string()),
                seller_id: DEMO_SELLER,
                seller_phone: Some("+963 934 567 890".to_string()),
                status: ListingStatus::Available,
                views: 0,
                created_at: now - Duration::hours(age as i64 + 1),
            });
        }
        backend
    }

    /// Store a row directly, without notifying subscribers or counting a call
    pub fn seed(&self, listing: Listing) {
        self.rows().push(listing);
    }

    /// Look a row up without counting a call
    pub fn snapshot(&self, id: Uuid) -> Option<Listing> {
        self.rows().iter().find(|listing| listing.id == id).cloned()
    }

    /// Number of listing-store operations served so far
    #[cfg(test)]
    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<Listing>> {
        self.listings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn count_call(&self) {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Rows passing `keep`, newest first; ties keep the latest insert on top
    fn select(&self, keep: impl Fn(&Listing) -> bool) -> Vec<Listing> {
        let mut rows: Vec<Listing> = self
            .rows()
            .iter()
            .rev()
            .filter(|listing| keep(listing))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    fn open_session(&self, user: User) -> Session {
        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            user,
        };
        self.session.send_replace(Some(session.clone()));
        session
    }
}

#[async_trait]
impl ListingStore for MemoryBackend {
    async fn available(&self, category: Option<&str>) -> Result<Vec<Listing>> {
        self.count_call();
        Ok(self.select(|listing| listing.matches_filter(category)))
    }

    async fn search(&self, term: &str) -> Result<Vec<Listing>> {
        self.count_call();
        let needle = term.trim().to_lowercase();
        Ok(self.select(|listing| {
            listing.is_available()
                && (needle.is_empty()
                    || listing.name.to_lowercase().contains(&needle)
                    || listing.location.to_lowercase().contains(&needle))
        }))
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        self.count_call();
        Ok(self.snapshot(id))
    }

    async fn by_seller(&self, seller_id: Uuid) -> Result<Vec<Listing>> {
        self.count_call();
        Ok(self.select(|listing| listing.seller_id == seller_id))
    }

    async fn insert(&self, listing: &NewListing) -> Result<Listing> {
        self.count_call();
        let row = Listing {
            id: Uuid::new_v4(),
            name: listing.name.clone(),
            description: listing.description.clone(),
            price: listing.price,
            condition: listing.condition,
            category: listing.category.clone(),
            location: listing.location.clone(),
            image_url: listing.image_url.clone(),
            seller_id: listing.seller_id,
            seller_phone: listing.seller_phone.clone(),
            status: listing.status,
            views: listing.views,
            created_at: Utc::now(),
        };
        self.rows().push(row.clone());
        debug!(id = %row.id, "Inserted listing");
        // No receivers is fine: nobody is browsing.
        let _ = self.inserts.send(row.clone());
        Ok(row)
    }

    async fn set_views(&self, id: Uuid, views: i64) -> Result<()> {
        self.count_call();
        if let Some(row) = self.rows().iter_mut().find(|listing| listing.id == id) {
            row.views = views;
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, seller_id: Uuid, status: ListingStatus) -> Result<bool> {
        self.count_call();
        let mut rows = self.rows();
        let row = rows.iter_mut().find(|listing| {
            listing.id == id
                && listing.seller_id == seller_id
                && listing.status == ListingStatus::Available
        });
        match row {
            Some(row) => {
                row.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let email = credentials.email.trim().to_lowercase();
        let user = {
            let accounts = self.accounts();
            match accounts.get(&email) {
                Some(account) if account.password == credentials.password => account.user.clone(),
                _ => {
                    return Err(SooqError::Remote {
                        status: 400,
                        message: "Invalid login credentials".to_string(),
                    })
                }
            }
        };
        info!(user = %user.id, "Signed in");
        Ok(self.open_session(user))
    }

    async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>> {
        if registration.password.chars().count() < 6 {
            return Err(SooqError::Remote {
                status: 422,
                message: "Password should be at least 6 characters".to_string(),
            });
        }
        let email = registration.email.trim().to_lowercase();
        let user = {
            let mut accounts = self.accounts();
            if accounts.contains_key(&email) {
                return Err(SooqError::Remote {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
            let user = User {
                id: Uuid::new_v4(),
                email: email.clone(),
                display_name: Some(registration.full_name.clone()),
                phone: None,
                location: None,
                avatar_url: None,
                joined_at: Utc::now(),
            };
            accounts.insert(
                email,
                Account {
                    password: registration.password.clone(),
                    user: user.clone(),
                },
            );
            user
        };
        Ok(Some(self.open_session(user)))
    }

    async fn sign_out(&self) -> Result<()> {
        self.session.send_replace(None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.borrow().clone())
    }

    async fn restore(&self, session: Session) -> Result<Option<Session>> {
        let known = self
            .accounts()
            .values()
            .any(|account| account.user.id == session.user.id);
        if !known {
            return Ok(None);
        }
        self.session.send_replace(Some(session.clone()));
        Ok(Some(session))
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://objects/{path}")
    }
}

#[async_trait]
impl ChangeFeed for MemoryBackend {
    async fn subscribe_inserts(&self, category: Option<&str>) -> Result<Subscription> {
        let mut inserts = self.inserts.subscribe();
        let category = category.map(str::to_string);
        let (tx, rx) = mpsc::channel(32);

        let worker = tokio::spawn(async move {
            loop {
                match inserts.recv().await {
                    Ok(listing) => {
                        if category.is_some() && listing.category != category {
                            continue;
                        }
                        if tx.send(listing).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Insert feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx, worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_listing(seller_id: Uuid, category: &str) -> NewListing {
        NewListing {
            name: "Desk lamp".to_string(),
            description: None,
            price: 15.0,
            condition: Condition::Used,
            category: Some(category.to_string()),
            location: "Tartus".to_string(),
            image_url: None,
            seller_id,
            seller_phone: None,
            status: ListingStatus::Available,
            views: 0,
        }
    }

    #[tokio::test]
    async fn newest_insert_comes_first() {
        let backend = MemoryBackend::new();
        let seller = Uuid::new_v4();
        let first = backend.insert(&new_listing(seller, "furniture")).await.unwrap();
        let second = backend.insert(&new_listing(seller, "furniture")).await.unwrap();

        let rows = backend.available(None).await.unwrap();
        assert_eq!(rows[0].id, second.id);
        assert_eq!(rows[1].id, first.id);
    }

    #[tokio::test]
    async fn set_status_requires_owner_and_available_row() {
        let backend = MemoryBackend::new();
        let seller = Uuid::new_v4();
        let row = backend.insert(&new_listing(seller, "books")).await.unwrap();

        assert!(!backend.set_status(row.id, Uuid::new_v4(), ListingStatus::Deleted).await.unwrap());
        assert!(backend.set_status(row.id, seller, ListingStatus::Sold).await.unwrap());
        assert!(!backend.set_status(row.id, seller, ListingStatus::Deleted).await.unwrap());
        assert_eq!(backend.snapshot(row.id).unwrap().status, ListingStatus::Sold);
    }

    #[tokio::test]
    async fn search_matches_name_or_location_case_insensitively() {
        let backend = MemoryBackend::with_demo_listings();
        let by_name = backend.search("macbook").await.unwrap();
        assert_eq!(by_name.len(), 1);
        let by_location = backend.search("homs").await.unwrap();
        assert_eq!(by_location.len(), 2);
        let everything = backend.search("  ").await.unwrap();
        assert_eq!(everything.len(), 8);
    }

    #[tokio::test]
    async fn feed_applies_column_filter() {
        let backend = MemoryBackend::new();
        let seller = Uuid::new_v4();
        let mut subscription = backend.subscribe_inserts(Some("toys")).await.unwrap();

        backend.insert(&new_listing(seller, "books")).await.unwrap();
        let toy = backend.insert(&new_listing(seller, "toys")).await.unwrap();

        let received = subscription.next().await.unwrap();
        assert_eq!(received.id, toy.id);
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let backend = MemoryBackend::new();
        let registration = Registration {
            email: "Seller@Example.com".to_string(),
            password: "secret123".to_string(),
            full_name: "محمد أحمد".to_string(),
            username: "mohamed".to_string(),
        };
        let created = backend.sign_up(&registration).await.unwrap().unwrap();
        backend.sign_out().await.unwrap();
        assert!(backend.current_session().await.unwrap().is_none());

        let session = backend
            .sign_in(&Credentials {
                email: "seller@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.id, created.user.id);

        let wrong = backend
            .sign_in(&Credentials {
                email: "seller@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(SooqError::Remote { status: 400, .. })));
    }
}
