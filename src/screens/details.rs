use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::i18n::{condition_label, format_price, time_ago, Text};
use crate::models::Listing;
use crate::routes::Route;
use crate::screens::AppContext;

/// Everything the detail page shows for one listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetail {
    pub listing: Listing,
    pub price: String,
    pub condition: &'static str,
    pub posted: String,
    pub description: String,
    pub image: String,
    pub phone: Option<String>,
    pub chat: Route,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Found(Box<ListingDetail>),
    /// Listing absent; the page offers a link back home
    NotFound,
}

pub struct DetailScreen {
    ctx: AppContext,
    view_write: Option<JoinHandle<()>>,
}

impl DetailScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            view_write: None,
        }
    }

    pub async fn load(&mut self, id: Uuid) -> DetailView {
        match self.ctx.backend.listings.by_id(id).await {
            Ok(Some(listing)) => {
                self.record_view(&listing);
                DetailView::Found(Box::new(self.detail(listing)))
            }
            Ok(None) => {
                info!(%id, "Listing not found");
                DetailView::NotFound
            }
            Err(err) => {
                error!(%id, error = %err, "Error fetching product details");
                let hint = Text::LoadDetailsFailedHint.get(self.ctx.locale());
                self.ctx
                    .notifier
                    .error(Text::LoadDetailsFailed, hint.to_string());
                DetailView::NotFound
            }
        }
    }

    /// Wait for the view-counter write started by the last `load`.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.view_write.take() {
            let _ = handle.await;
        }
    }

    /// Fire-and-forget `views + 1`; nothing on screen depends on it.
    fn record_view(&mut self, listing: &Listing) {
        let store = Arc::clone(&self.ctx.backend.listings);
        let id = listing.id;
        let views = listing.views + 1;
        self.view_write = Some(tokio::spawn(async move {
            match store.set_views(id, views).await {
                Ok(()) => debug!(%id, views, "Recorded view"),
                Err(err) => warn!(%id, error = %err, "Failed to record view"),
            }
        }));
    }

    fn detail(&self, listing: Listing) -> ListingDetail {
        let locale = self.ctx.locale();
        ListingDetail {
            price: format_price(listing.price),
            condition: condition_label(listing.condition, locale),
            posted: time_ago(listing.created_at, Utc::now(), locale),
            description: listing
                .description
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| Text::NoDescription.get(locale).to_string()),
            image: listing.image_or_placeholder().to_string(),
            phone: listing.seller_phone.clone().filter(|phone| !phone.trim().is_empty()),
            chat: Route::Chat {
                seller_id: listing.seller_id,
                listing_id: listing.id,
            },
            listing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::{ListingStatus, PLACEHOLDER_IMAGE};
    use crate::notify::ToastVariant;
    use crate::screens::testing::{context, drain, flaky_context, listing, next_toast};

    #[tokio::test]
    async fn each_view_adds_exactly_one() {
        let backend = Arc::new(MemoryBackend::new());
        let mut row = listing(Uuid::new_v4(), "books", ListingStatus::Available, 2);
        row.views = 41;
        let id = row.id;
        backend.seed(row);

        let (ctx, _toasts) = context(backend.clone());
        let mut screen = DetailScreen::new(ctx);

        for expected in 42..=44 {
            assert!(matches!(screen.load(id).await, DetailView::Found(_)));
            screen.settle().await;
            assert_eq!(backend.snapshot(id).unwrap().views, expected);
        }
    }

    #[tokio::test]
    async fn detail_links_to_chat_and_falls_back_to_placeholders() {
        let backend = Arc::new(MemoryBackend::new());
        let mut row = listing(Uuid::new_v4(), "vehicles", ListingStatus::Available, 3);
        row.seller_phone = Some("+963 11 222 3333".to_string());
        row.price = 15000.0;
        let (id, seller) = (row.id, row.seller_id);
        backend.seed(row);

        let (ctx, _toasts) = context(backend);
        let mut screen = DetailScreen::new(ctx);
        let DetailView::Found(detail) = screen.load(id).await else {
            panic!("listing should be found");
        };
        assert_eq!(detail.chat, Route::Chat { seller_id: seller, listing_id: id });
        assert_eq!(detail.price, "15000.00 $");
        assert_eq!(detail.condition, "Used");
        assert_eq!(detail.posted, "3 hours ago");
        assert_eq!(detail.description, "No description provided");
        assert_eq!(detail.image, PLACEHOLDER_IMAGE);
        assert_eq!(detail.phone.as_deref(), Some("+963 11 222 3333"));
    }

    #[tokio::test]
    async fn missing_listing_is_not_found_without_a_write() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, _toasts) = context(backend.clone());
        let mut screen = DetailScreen::new(ctx);

        assert_eq!(screen.load(Uuid::new_v4()).await, DetailView::NotFound);
        screen.settle().await;
        assert_eq!(backend.listing_calls(), 1);
    }

    #[tokio::test]
    async fn fetch_error_toasts_and_shows_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let row = listing(Uuid::new_v4(), "books", ListingStatus::Available, 1);
        let id = row.id;
        backend.seed(row);
        let (ctx, mut toasts, store) = flaky_context(backend.clone());
        store.fail(true);
        let mut screen = DetailScreen::new(ctx);

        assert_eq!(screen.load(id).await, DetailView::NotFound);
        screen.settle().await;

        let toast = next_toast(&mut toasts).await;
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.title, "Failed to load product details");
        assert!(drain(&mut toasts).is_empty());
        assert_eq!(backend.snapshot(id).unwrap().views, 0);
    }
}
