use tracing::{info, warn};

use crate::backend::Credentials;
use crate::error::SooqError;
use crate::i18n::Text;
use crate::routes::Route;
use crate::screens::{non_empty, validation_toast, AppContext, Outcome};

pub struct LoginScreen {
    ctx: AppContext,
}

impl LoginScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn submit(&mut self, email: &str, password: &str) -> Outcome {
        let Some(email) = non_empty(email) else {
            validation_toast(&self.ctx, &SooqError::MissingField { field: "email" });
            return Outcome::Stay;
        };
        if password.is_empty() {
            validation_toast(&self.ctx, &SooqError::MissingField { field: "password" });
            return Outcome::Stay;
        }

        let result = self
            .ctx
            .session
            .sign_in(&Credentials {
                email,
                password: password.to_string(),
            })
            .await;

        match result {
            Ok(session) => {
                info!(user = %session.user.id, "Login succeeded");
                self.ctx
                    .notifier
                    .info(Text::SignedIn, Some(Text::SignedInHint));
                Outcome::Navigate(Route::Home)
            }
            Err(err) => {
                warn!(error = %err, "Login failed");
                self.ctx.notifier.error(Text::SignInFailed, remote_message(&err));
                Outcome::Stay
            }
        }
    }
}

/// The auth service's own wording when there is one
pub(crate) fn remote_message(err: &SooqError) -> String {
    match err {
        SooqError::Remote { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
