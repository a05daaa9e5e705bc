use chrono::{DateTime, Local, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{ChatMessage, Sender};
use crate::routes::Route;

/// Buyer-side conversation about one listing. Messages are not persisted.
#[derive(Debug)]
pub struct ChatScreen {
    seller_id: Uuid,
    listing_id: Uuid,
    messages: Vec<ChatMessage>,
}

impl ChatScreen {
    pub fn new(seller_id: Uuid, listing_id: Uuid) -> Self {
        Self {
            seller_id,
            listing_id,
            messages: Vec::new(),
        }
    }

    /// Appends a buyer message; blank input is ignored and returns false.
    pub fn send(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            sender: Sender::Buyer,
            timestamp: Utc::now(),
        };
        debug!(
            seller = %self.seller_id,
            listing = %self.listing_id,
            id = %message.id,
            "Message queued"
        );
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn seller_id(&self) -> Uuid {
        self.seller_id
    }

    pub fn back(&self) -> Route {
        Route::Listing(self.listing_id)
    }
}

/// Local wall-clock `HH:MM`
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}
