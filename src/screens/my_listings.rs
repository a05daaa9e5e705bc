use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::SooqError;
use crate::i18n::Text;
use crate::models::{Listing, ListingStatus, User};
use crate::routes::Route;
use crate::screens::{require_user, AppContext, Outcome};

/// The signed-in seller's own listings, in every status.
pub struct MyListingsScreen {
    ctx: AppContext,
    user: Option<User>,
    listings: Vec<Listing>,
}

impl MyListingsScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            user: None,
            listings: Vec::new(),
        }
    }

    pub async fn mount(&mut self) -> Outcome {
        let user = match require_user(&self.ctx, &Route::MyListings) {
            Ok(user) => user,
            Err(redirect) => return redirect,
        };

        match self.ctx.backend.listings.by_seller(user.id).await {
            Ok(rows) => {
                info!(seller = %user.id, count = rows.len(), "Loaded own listings");
                self.listings = rows;
            }
            Err(err) => {
                error!(seller = %user.id, error = %err, "Error fetching own listings");
                self.ctx
                    .notifier
                    .error(Text::LoadListingsFailed, err.to_string());
            }
        }
        self.user = Some(user);
        Outcome::Stay
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Soft delete; the row leaves the list on success.
    pub async fn delete(&mut self, id: Uuid) -> Outcome {
        if self.transition(id, ListingStatus::Deleted).await {
            self.listings.retain(|listing| listing.id != id);
            self.ctx.notifier.info(Text::ListingDeleted, None);
        }
        Outcome::Stay
    }

    pub async fn mark_sold(&mut self, id: Uuid) -> Outcome {
        if self.transition(id, ListingStatus::Sold).await {
            if let Some(row) = self.listings.iter_mut().find(|listing| listing.id == id) {
                row.status = ListingStatus::Sold;
            }
            self.ctx.notifier.info(Text::ListingSold, None);
        }
        Outcome::Stay
    }

    async fn transition(&self, id: Uuid, next: ListingStatus) -> bool {
        let Some(user) = &self.user else {
            self.ctx
                .notifier
                .info(Text::LoginRequired, Some(Text::LoginRequiredHint));
            return false;
        };
        let Some(current) = self.listings.iter().find(|listing| listing.id == id) else {
            warn!(%id, "Listing is not in the seller's list");
            self.ctx
                .notifier
                .error(Text::ListingNotFound, id.to_string());
            return false;
        };
        if !current.status.can_transition_to(next) {
            let err = SooqError::InvalidTransition {
                from: current.status,
                to: next,
            };
            info!(%id, error = %err, "Rejected status change");
            self.ctx.notifier.error(Text::UpdateFailed, err.to_string());
            return false;
        }

        match self.ctx.backend.listings.set_status(id, user.id, next).await {
            Ok(true) => {
                info!(%id, status = %next, "Listing status updated");
                true
            }
            Ok(false) => {
                warn!(%id, status = %next, "No available listing matched the update");
                self.ctx
                    .notifier
                    .error(Text::ListingNotFound, id.to_string());
                false
            }
            Err(err) => {
                error!(%id, error = %err, "Error updating listing status");
                self.ctx.notifier.error(Text::UpdateFailed, err.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ListingStore, MemoryBackend};
    use crate::notify::ToastVariant;
    use crate::screens::testing::{context, drain, listing, next_toast, sign_up};
    use std::sync::Arc;

    #[tokio::test]
    async fn delete_removes_only_the_owners_row() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        let owner = sign_up(&ctx, "owner@example.com").await;
        let other = Uuid::new_v4();

        let mine = listing(owner.id, "books", ListingStatus::Available, 1);
        let also_mine = listing(owner.id, "toys", ListingStatus::Sold, 2);
        let theirs = listing(other, "books", ListingStatus::Available, 3);
        let (mine_id, theirs_id) = (mine.id, theirs.id);
        backend.seed(mine);
        backend.seed(also_mine);
        backend.seed(theirs);

        let mut screen = MyListingsScreen::new(ctx);
        assert_eq!(screen.mount().await, Outcome::Stay);
        assert_eq!(screen.listings().len(), 2);

        screen.delete(mine_id).await;
        assert_eq!(screen.listings().len(), 1);
        assert!(screen.listings().iter().all(|row| row.id != mine_id));
        assert_eq!(backend.snapshot(mine_id).unwrap().status, ListingStatus::Deleted);
        assert_eq!(next_toast(&mut toasts).await.title, "Listing deleted");

        let theirs_now = backend.by_seller(other).await.unwrap();
        assert_eq!(theirs_now.len(), 1);
        assert_eq!(theirs_now[0].id, theirs_id);
        assert_eq!(theirs_now[0].status, ListingStatus::Available);
    }

    #[tokio::test]
    async fn mark_sold_updates_in_place() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, _toasts) = context(backend.clone());
        let owner = sign_up(&ctx, "owner@example.com").await;
        let row = listing(owner.id, "vehicles", ListingStatus::Available, 1);
        let id = row.id;
        backend.seed(row);

        let mut screen = MyListingsScreen::new(ctx);
        screen.mount().await;
        screen.mark_sold(id).await;

        assert_eq!(screen.listings().len(), 1);
        assert_eq!(screen.listings()[0].status, ListingStatus::Sold);
        assert_eq!(backend.snapshot(id).unwrap().status, ListingStatus::Sold);
    }

    #[tokio::test]
    async fn sold_listing_cannot_be_deleted_and_no_call_is_made() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        let owner = sign_up(&ctx, "owner@example.com").await;
        let row = listing(owner.id, "books", ListingStatus::Sold, 1);
        let id = row.id;
        backend.seed(row);

        let mut screen = MyListingsScreen::new(ctx);
        screen.mount().await;
        let calls = backend.listing_calls();
        screen.delete(id).await;

        assert_eq!(backend.listing_calls(), calls);
        assert_eq!(screen.listings().len(), 1);
        let toast = next_toast(&mut toasts).await;
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.title, "Couldn't update the listing");
    }

    #[tokio::test]
    async fn anonymous_mount_redirects_to_login_without_calls() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        let mut screen = MyListingsScreen::new(ctx);

        assert_eq!(screen.mount().await, Outcome::Navigate(Route::Login));
        assert_eq!(backend.listing_calls(), 0);
        assert_eq!(drain(&mut toasts).len(), 1);
    }
}
