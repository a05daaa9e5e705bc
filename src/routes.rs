use std::fmt;
use uuid::Uuid;

/// Client-side navigation targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Listing(Uuid),
    Login,
    Register,
    AddListing,
    Chat { seller_id: Uuid, listing_id: Uuid },
    Search,
    MyListings,
    Profile,
    NotFound(String),
}

impl Route {
    /// Resolve a path; anything unknown or with a malformed id is `NotFound`.
    pub fn parse(path: &str) -> Route {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["product", id] => id
                .parse()
                .map(Route::Listing)
                .unwrap_or_else(|_| Route::NotFound(path.to_string())),
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["add-product"] => Route::AddListing,
            ["chat", seller, listing] => match (seller.parse(), listing.parse()) {
                (Ok(seller_id), Ok(listing_id)) => Route::Chat { seller_id, listing_id },
                _ => Route::NotFound(path.to_string()),
            },
            ["search"] => Route::Search,
            ["my-products"] => Route::MyListings,
            ["profile"] => Route::Profile,
            _ => Route::NotFound(path.to_string()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Listing(id) => write!(f, "/product/{id}"),
            Route::Login => f.write_str("/login"),
            Route::Register => f.write_str("/register"),
            Route::AddListing => f.write_str("/add-product"),
            Route::Chat { seller_id, listing_id } => write!(f, "/chat/{seller_id}/{listing_id}"),
            Route::Search => f.write_str("/search"),
            Route::MyListings => f.write_str("/my-products"),
            Route::Profile => f.write_str("/profile"),
            Route::NotFound(path) => f.write_str(path),
        }
    }
}
