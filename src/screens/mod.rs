//! One controller per route.
//!
//! A screen owns only its local state. Operations call the backend directly,
//! report through the shared [`Notifier`] and tell the caller where to go
//! next with an [`Outcome`].

pub mod add_listing;
pub mod browse;
pub mod chat;
pub mod details;
pub mod login;
pub mod my_listings;
pub mod not_found;
pub mod profile;
pub mod register;
pub mod search;

use std::sync::Arc;
use tracing::info;

use crate::backend::Backend;
use crate::error::SooqError;
use crate::i18n::{field_label, Locale, Text};
use crate::models::User;
use crate::notify::Notifier;
use crate::routes::Route;
use crate::session::SessionProvider;

pub use add_listing::{AddListingScreen, ImageFile, ListingForm};
pub use browse::BrowseScreen;
pub use chat::{format_time, ChatScreen};
pub use details::{DetailScreen, DetailView, ListingDetail};
pub use login::LoginScreen;
pub use my_listings::MyListingsScreen;
pub use not_found::NotFoundView;
pub use profile::{ProfileScreen, ProfileView};
pub use register::{RegisterForm, RegisterScreen};
pub use search::SearchScreen;

/// Everything a screen needs from the outside world
#[derive(Clone)]
pub struct AppContext {
    pub backend: Backend,
    pub session: Arc<SessionProvider>,
    pub notifier: Notifier,
}

impl AppContext {
    pub fn locale(&self) -> Locale {
        self.notifier.locale()
    }
}

/// What the caller should do after a screen operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stay,
    Navigate(Route),
}

/// Signed-in user, or a toast and a redirect to the login page.
fn require_user(ctx: &AppContext, screen: &Route) -> Result<User, Outcome> {
    match ctx.session.user() {
        Some(user) => Ok(user),
        None => {
            info!(route = %screen, "Anonymous visit, redirecting to login");
            ctx.notifier
                .info(Text::LoginRequired, Some(Text::LoginRequiredHint));
            Err(Outcome::Navigate(Route::Login))
        }
    }
}

/// Toast for an error caught before any network call
fn validation_toast(ctx: &AppContext, err: &SooqError) {
    let locale = ctx.locale();
    match err {
        SooqError::MissingField { field } => ctx
            .notifier
            .error(Text::RequiredField, field_label(field, locale).to_string()),
        SooqError::InvalidField { field, reason } => ctx.notifier.error(
            Text::InvalidValue,
            format!("{}: {reason}", field_label(field, locale)),
        ),
        other => ctx.notifier.error(Text::InvalidValue, other.to_string()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
