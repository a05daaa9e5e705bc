use tracing::{error, info};

use crate::i18n::{month_year, Text};
use crate::models::User;
use crate::routes::Route;
use crate::screens::{AppContext, Outcome};

/// Profile card of the signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCard {
    pub name: String,
    pub initial: char,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub member_since: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileView {
    /// Nobody signed in; the page links to `/login`
    Guest,
    Member(ProfileCard),
}

pub struct ProfileScreen {
    ctx: AppContext,
}

impl ProfileScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn view(&self) -> ProfileView {
        match self.ctx.session.user() {
            Some(user) => ProfileView::Member(self.card(&user)),
            None => ProfileView::Guest,
        }
    }

    pub async fn sign_out(&self) -> Outcome {
        match self.ctx.session.sign_out().await {
            Ok(()) => {
                info!("Signed out");
                self.ctx.notifier.info(Text::SignedOut, None);
                Outcome::Navigate(Route::Home)
            }
            Err(err) => {
                error!(error = %err, "Error signing out");
                self.ctx.notifier.error(Text::SignOutFailed, err.to_string());
                Outcome::Stay
            }
        }
    }

    fn card(&self, user: &User) -> ProfileCard {
        ProfileCard {
            name: user.label().to_string(),
            initial: user.initial(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            location: user.location.clone(),
            avatar_url: user.avatar_url.clone(),
            member_since: month_year(user.joined_at, self.ctx.locale()),
        }
    }
}
