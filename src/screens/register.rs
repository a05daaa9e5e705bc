use tracing::{info, warn};

use crate::backend::Registration;
use crate::error::{Result, SooqError};
use crate::i18n::Text;
use crate::routes::Route;
use crate::screens::login::remote_message;
use crate::screens::{non_empty, validation_toast, AppContext, Outcome};

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    fn validate(&self) -> Result<Registration> {
        let required = |field: &'static str, value: &str| {
            non_empty(value).ok_or(SooqError::MissingField { field })
        };
        let full_name = required("full_name", &self.full_name)?;
        let email = required("email", &self.email)?;
        let username = required("username", &self.username)?;
        if self.password.is_empty() {
            return Err(SooqError::MissingField { field: "password" });
        }
        if self.confirm_password.is_empty() {
            return Err(SooqError::MissingField {
                field: "confirm_password",
            });
        }
        Ok(Registration {
            email,
            password: self.password.clone(),
            full_name,
            username,
        })
    }
}

pub struct RegisterScreen {
    ctx: AppContext,
}

impl RegisterScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn submit(&mut self, form: &RegisterForm) -> Outcome {
        let registration = match form.validate() {
            Ok(registration) => registration,
            Err(err) => {
                validation_toast(&self.ctx, &err);
                return Outcome::Stay;
            }
        };
        if form.password != form.confirm_password {
            self.ctx
                .notifier
                .error(Text::PasswordMismatch, Option::<String>::None);
            return Outcome::Stay;
        }

        let result = self.ctx.session.sign_up(&registration).await;

        match result {
            Ok(session) => {
                info!(email = %registration.email, live = session.is_some(), "Account created");
                self.ctx
                    .notifier
                    .info(Text::Registered, Some(Text::RegisteredHint));
                match session {
                    Some(_) => Outcome::Navigate(Route::Home),
                    None => Outcome::Navigate(Route::Login),
                }
            }
            Err(err) => {
                warn!(error = %err, "Registration failed");
                self.ctx
                    .notifier
                    .error(Text::RegisterFailed, remote_message(&err));
                Outcome::Stay
            }
        }
    }
}
