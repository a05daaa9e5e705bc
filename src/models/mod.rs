use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod category;

pub use category::{Category, CATEGORIES};

/// Image shown when a listing was created without a picture
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Physical condition of the item for sale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    New,
    Used,
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Condition::New),
            "used" => Ok(Condition::Used),
            other => Err(format!("unknown condition `{other}` (expected new or used)")),
        }
    }
}

/// Lifecycle state of a listing.
///
/// Only `Available -> Sold` and `Available -> Deleted` are legal; a listing is
/// never restored or physically removed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Available,
    Sold,
    Deleted,
}

impl ListingStatus {
    pub fn can_transition_to(self, next: ListingStatus) -> bool {
        matches!(
            (self, next),
            (ListingStatus::Available, ListingStatus::Sold)
                | (ListingStatus::Available, ListingStatus::Deleted)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Sold => "sold",
            ListingStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `products` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub condition: Condition,
    #[serde(default)]
    pub category: Option<String>,
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub seller_id: Uuid,
    #[serde(default)]
    pub seller_phone: Option<String>,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_available(&self) -> bool {
        self.status == ListingStatus::Available
    }

    /// Whether the listing belongs in a browse list filtered by `category`.
    pub fn matches_filter(&self, category: Option<&str>) -> bool {
        self.is_available()
            && category.map_or(true, |wanted| self.category.as_deref() == Some(wanted))
    }

    pub fn image_or_placeholder(&self) -> &str {
        self.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }
}

/// Insert payload for a new listing; `id` and `created_at` come from the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewListing {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub location: String,
    pub image_url: Option<String>,
    pub seller_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_phone: Option<String>,
    pub status: ListingStatus,
    pub views: i64,
}

/// Account as mirrored from the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl User {
    /// Name shown in the profile header, falling back to the e-mail address.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }

    pub fn initial(&self) -> char {
        self.label().chars().next().unwrap_or('?')
    }
}

/// Authenticated session handed out by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Side of the conversation that wrote a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Buyer,
    Seller,
}

/// A chat message; lives only as long as the chat screen that holds it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}
