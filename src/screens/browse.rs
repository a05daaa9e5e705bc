use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::Subscription;
use crate::i18n::Text;
use crate::models::Listing;
use crate::notify::{Notifier, Toast};
use crate::screens::{AppContext, Outcome};

/// Home page: available listings, an optional category filter, live inserts.
///
/// Every mount or filter change drops the previous live subscription before
/// opening a new one. Inserts that land between the fetch and the
/// subscription may show up twice or not at all.
pub struct BrowseScreen {
    ctx: AppContext,
    category: Option<String>,
    listings: Arc<Mutex<Vec<Listing>>>,
    /// Bumped whenever the live subscription is dropped; a follower holding
    /// an older value must not touch the list.
    generation: Arc<AtomicU64>,
    live: Option<JoinHandle<()>>,
}

impl BrowseScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            category: None,
            listings: Arc::new(Mutex::new(Vec::new())),
            generation: Arc::new(AtomicU64::new(0)),
            live: None,
        }
    }

    pub async fn mount(&mut self) -> Outcome {
        self.load().await;
        Outcome::Stay
    }

    pub async fn select_category(&mut self, category: Option<String>) {
        self.category = category;
        self.load().await;
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn listings(&self) -> Vec<Listing> {
        lock(&self.listings).clone()
    }

    pub fn unmount(&mut self) {
        self.stop_live();
    }

    async fn load(&mut self) {
        self.stop_live();

        let category = self.category.clone();
        let store = Arc::clone(&self.ctx.backend.listings);
        let feed = Arc::clone(&self.ctx.backend.feed);
        let (fetched, subscribed) = tokio::join!(
            store.available(category.as_deref()),
            feed.subscribe_inserts(category.as_deref()),
        );

        match fetched {
            Ok(rows) => {
                info!(count = rows.len(), ?category, "Loaded listings");
                *lock(&self.listings) = rows;
            }
            Err(err) => {
                error!(error = %err, ?category, "Error fetching listings");
                self.ctx
                    .notifier
                    .error(Text::LoadListingsFailed, err.to_string());
            }
        }

        match subscribed {
            Ok(subscription) => self.live = Some(self.follow(subscription)),
            Err(err) => warn!(error = %err, "Live updates unavailable"),
        }
    }

    fn follow(&self, mut subscription: Subscription) -> JoinHandle<()> {
        let listings = Arc::clone(&self.listings);
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);
        let notifier: Notifier = self.ctx.notifier.clone();
        let category = self.category.clone();

        tokio::spawn(async move {
            while let Some(listing) = subscription.next().await {
                if !listing.matches_filter(category.as_deref()) {
                    debug!(id = %listing.id, "Ignoring insert outside the current filter");
                    continue;
                }
                info!(id = %listing.id, "New listing arrived");
                let name = listing.name.clone();
                if !prepend(&listings, &generation, started, listing) {
                    debug!("Subscription superseded, dropping insert");
                    break;
                }
                notifier.push(Toast::info(
                    Text::NewListing.get(notifier.locale()),
                    Some(name),
                ));
            }
            debug!("Insert subscription ended");
        })
    }

    fn stop_live(&mut self) {
        {
            let _rows = lock(&self.listings);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(handle) = self.live.take() {
            handle.abort();
        }
    }
}

impl Drop for BrowseScreen {
    fn drop(&mut self) {
        self.stop_live();
    }
}

/// Prepend `listing` unless the subscription that produced it was dropped.
/// The generation is read under the list lock, which `stop_live` also holds
/// while bumping it.
fn prepend(
    listings: &Mutex<Vec<Listing>>,
    generation: &AtomicU64,
    started: u64,
    listing: Listing,
) -> bool {
    let mut rows = lock(listings);
    if generation.load(Ordering::SeqCst) != started {
        return false;
    }
    rows.insert(0, listing);
    true
}

fn lock(listings: &Mutex<Vec<Listing>>) -> MutexGuard<'_, Vec<Listing>> {
    listings
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
