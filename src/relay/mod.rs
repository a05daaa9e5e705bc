//! Server-side companion: relays order-confirmation e-mails to a mail API.

pub mod mailer;
pub mod server;

pub use mailer::HttpMailer;
pub use server::{serve, RelayState};
