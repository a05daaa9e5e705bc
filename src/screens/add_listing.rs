use std::path::Path;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Result, SooqError};
use crate::i18n::Text;
use crate::models::{Condition, ListingStatus, NewListing, User, PLACEHOLDER_IMAGE};
use crate::routes::Route;
use crate::screens::{non_empty, require_user, validation_toast, AppContext, Outcome};

/// Picture picked for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageFile {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = content_type_for(&file_name).to_string();
        Ok(Self {
            file_name,
            bytes,
            content_type,
        })
    }

    /// Extension used for the stored object, `bin` when the name has none.
    pub fn extension(&self) -> &str {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or("bin")
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Raw form input, exactly as typed
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub condition: Condition,
    pub category: Option<String>,
    pub location: String,
    pub seller_phone: String,
    pub image: Option<ImageFile>,
}

impl ListingForm {
    /// Checks name, price and location in that order; returns the parsed price.
    pub fn validate(&self) -> Result<f64> {
        if self.name.trim().is_empty() {
            return Err(SooqError::MissingField { field: "name" });
        }
        let price = self.price.trim();
        if price.is_empty() {
            return Err(SooqError::MissingField { field: "price" });
        }
        let price: f64 = price.parse().map_err(|_| SooqError::InvalidField {
            field: "price",
            reason: format!("`{price}` is not a number"),
        })?;
        if !price.is_finite() || price < 0.0 {
            return Err(SooqError::InvalidField {
                field: "price",
                reason: "must be zero or more".to_string(),
            });
        }
        if self.location.trim().is_empty() {
            return Err(SooqError::MissingField { field: "location" });
        }
        Ok(price)
    }

    fn to_new_listing(&self, price: f64, seller_id: Uuid, image_url: String) -> NewListing {
        NewListing {
            name: self.name.trim().to_string(),
            description: non_empty(&self.description),
            price,
            condition: self.condition,
            category: self.category.as_deref().and_then(non_empty),
            location: self.location.trim().to_string(),
            image_url: Some(image_url),
            seller_id,
            seller_phone: non_empty(&self.seller_phone),
            status: ListingStatus::Available,
            views: 0,
        }
    }
}

pub struct AddListingScreen {
    ctx: AppContext,
    submitting: bool,
}

impl AddListingScreen {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            submitting: false,
        }
    }

    pub fn mount(&self) -> Outcome {
        match require_user(&self.ctx, &Route::AddListing) {
            Ok(_) => Outcome::Stay,
            Err(redirect) => redirect,
        }
    }

    #[cfg(test)]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub async fn submit(&mut self, form: &ListingForm) -> Outcome {
        if self.submitting {
            debug!("Submit ignored, previous one still running");
            return Outcome::Stay;
        }
        let price = match form.validate() {
            Ok(price) => price,
            Err(err) => {
                info!(error = %err, "Listing form rejected");
                validation_toast(&self.ctx, &err);
                return Outcome::Stay;
            }
        };
        let Some(user) = self.ctx.session.user() else {
            self.ctx
                .notifier
                .info(Text::LoginRequired, Some(Text::LoginRequiredHint));
            return Outcome::Stay;
        };

        self.submitting = true;
        let created = self.create(form, price, &user).await;
        self.submitting = false;

        match created {
            Ok(id) => {
                info!(%id, seller = %user.id, "Listing created");
                self.ctx
                    .notifier
                    .info(Text::ListingCreated, Some(Text::ListingCreatedHint));
                Outcome::Navigate(Route::Listing(id))
            }
            Err(err) => {
                error!(error = %err, "Error adding product");
                self.ctx
                    .notifier
                    .error(Text::ListingCreateFailed, err.to_string());
                Outcome::Stay
            }
        }
    }

    async fn create(&self, form: &ListingForm, price: f64, user: &User) -> Result<Uuid> {
        let image_url = match &form.image {
            Some(image) => {
                let path = format!("{}/{}.{}", user.id, Uuid::new_v4(), image.extension());
                self.ctx
                    .backend
                    .storage
                    .upload(&path, image.bytes.clone(), &image.content_type)
                    .await?;
                self.ctx.backend.storage.public_url(&path)
            }
            None => PLACEHOLDER_IMAGE.to_string(),
        };

        let listing = form.to_new_listing(price, user.id, image_url);
        let row = self.ctx.backend.listings.insert(&listing).await?;
        Ok(row.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::notify::ToastVariant;
    use crate::backend::{Backend, ObjectStorage};
    use crate::screens::testing::{context, context_with, drain, flaky_context, next_toast, sign_up};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct RejectingStorage;

    #[async_trait]
    impl ObjectStorage for RejectingStorage {
        async fn upload(&self, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<()> {
            Err(SooqError::Remote {
                status: 413,
                message: "Payload too large".to_string(),
            })
        }

        fn public_url(&self, path: &str) -> String {
            format!("rejected://{path}")
        }
    }

    fn filled() -> ListingForm {
        ListingForm {
            name: "Vintage Lamp".to_string(),
            price: "45.5".to_string(),
            location: "Aleppo".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn minimal_form_creates_and_redirects_to_the_listing() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        let user = sign_up(&ctx, "seller@example.com").await;
        let mut screen = AddListingScreen::new(ctx);
        assert_eq!(screen.mount(), Outcome::Stay);

        let Outcome::Navigate(Route::Listing(id)) = screen.submit(&filled()).await else {
            panic!("expected a redirect to the new listing");
        };
        let row = backend.snapshot(id).unwrap();
        assert_eq!(row.seller_id, user.id);
        assert_eq!(row.price, 45.5);
        assert_eq!(row.status, ListingStatus::Available);
        assert_eq!(row.views, 0);
        assert_eq!(row.condition, Condition::New);
        assert_eq!(row.image_url.as_deref(), Some(PLACEHOLDER_IMAGE));
        assert_eq!(row.description, None);
        assert!(!screen.is_submitting());

        let toast = next_toast(&mut toasts).await;
        assert_eq!(toast.title, "Product added successfully");
    }

    #[tokio::test]
    async fn image_is_uploaded_under_the_seller_folder() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, _toasts) = context(backend.clone());
        let user = sign_up(&ctx, "seller@example.com").await;
        let mut screen = AddListingScreen::new(ctx);

        let mut form = filled();
        form.image = Some(ImageFile {
            file_name: "lamp.PNG".to_string(),
            bytes: vec![1, 2, 3],
            content_type: "image/png".to_string(),
        });
        let Outcome::Navigate(Route::Listing(id)) = screen.submit(&form).await else {
            panic!("expected a redirect");
        };

        let url = backend.snapshot(id).unwrap().image_url.unwrap();
        let path = url.strip_prefix("memory://objects/").unwrap();
        assert!(path.starts_with(&format!("{}/", user.id)));
        assert!(path.ends_with(".PNG"));
        assert_eq!(backend.object(path), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn each_required_field_blocks_submission_without_network() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        sign_up(&ctx, "seller@example.com").await;
        let mut screen = AddListingScreen::new(ctx);

        let cases: [(fn(&mut ListingForm), &str); 3] = [
            (|form| form.name.clear(), "Product name"),
            (|form| form.price = "  ".to_string(), "Price"),
            (|form| form.location.clear(), "Location"),
        ];
        for (blank, label) in cases {
            let mut form = filled();
            blank(&mut form);
            assert_eq!(screen.submit(&form).await, Outcome::Stay);

            let toast = next_toast(&mut toasts).await;
            assert_eq!(toast.variant, ToastVariant::Destructive);
            assert_eq!(toast.title, "Required field");
            assert_eq!(toast.description.as_deref(), Some(label));
        }
        assert_eq!(backend.listing_calls(), 0);
    }

    #[test]
    fn price_must_be_a_non_negative_number() {
        for bad in ["abc", "-3", "NaN", "inf"] {
            let form = ListingForm {
                price: bad.to_string(),
                ..filled()
            };
            assert!(
                matches!(form.validate(), Err(SooqError::InvalidField { field: "price", .. })),
                "{bad}"
            );
        }
        let form = ListingForm {
            price: "0".to_string(),
            ..filled()
        };
        assert_eq!(form.validate().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn anonymous_mount_redirects_to_login_without_calls() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        let screen = AddListingScreen::new(ctx);

        assert_eq!(screen.mount(), Outcome::Navigate(Route::Login));
        let toasts = drain(&mut toasts);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].title, "Sign-in required");
        assert_eq!(backend.listing_calls(), 0);
    }

    #[test]
    fn content_type_follows_the_extension() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn failed_insert_toasts_and_stays() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts, store) = flaky_context(backend.clone());
        sign_up(&ctx, "seller@example.com").await;
        let mut screen = AddListingScreen::new(ctx);
        store.fail(true);

        assert_eq!(screen.submit(&filled()).await, Outcome::Stay);
        assert!(!screen.is_submitting());
        let toast = next_toast(&mut toasts).await;
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.title, "Couldn't add the product");
        assert!(toast.description.unwrap().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn failed_upload_stops_before_the_insert() {
        let backend = Arc::new(MemoryBackend::new());
        let mut seams = Backend::in_memory(backend.clone());
        seams.storage = Arc::new(RejectingStorage);
        let (ctx, mut toasts) = context_with(seams, backend.clone());
        sign_up(&ctx, "seller@example.com").await;
        let mut screen = AddListingScreen::new(ctx);

        let mut form = filled();
        form.image = Some(ImageFile {
            file_name: "lamp.png".to_string(),
            bytes: vec![0; 16],
            content_type: "image/png".to_string(),
        });
        assert_eq!(screen.submit(&form).await, Outcome::Stay);

        let toast = next_toast(&mut toasts).await;
        assert_eq!(toast.title, "Couldn't add the product");
        assert!(toast.description.unwrap().contains("Payload too large"));
        assert_eq!(backend.listing_calls(), 0);
    }

    #[tokio::test]
    async fn submit_without_a_session_asks_for_sign_in() {
        let backend = Arc::new(MemoryBackend::new());
        let (ctx, mut toasts) = context(backend.clone());
        let mut screen = AddListingScreen::new(ctx);

        assert_eq!(screen.submit(&filled()).await, Outcome::Stay);
        let toasts = drain(&mut toasts);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].title, "Sign-in required");
        assert_eq!(backend.listing_calls(), 0);
    }
}
