use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::traits::{AuthProvider, ListingStore, ObjectStorage};
use crate::backend::types::{Credentials, Registration};
use crate::error::{Result, SooqError};
use crate::models::{Listing, ListingStatus, NewListing, Session, User};

const LISTINGS_TABLE: &str = "products";

/// Client for a hosted Supabase project: PostgREST, GoTrue and Storage.
///
/// The realtime half lives in `realtime.rs`. The client keeps the signed-in
/// session itself, so every request made after `sign_in` carries the user's
/// access token and row-level rules apply.
pub struct SupabaseClient {
    http: Client,
    pub(super) base_url: String,
    pub(super) anon_key: String,
    bucket: String,
    session: watch::Sender<Option<Session>>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str, bucket: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("syria-sooq/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (session, _) = watch::channel(None);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            bucket: bucket.to_string(),
            session,
        })
    }

    /// Access token of the signed-in user, or the anon key
    pub(super) fn bearer(&self) -> String {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    fn table(&self, method: Method) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{LISTINGS_TABLE}"))
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Listing>> {
        let response = request.send().await?;
        read_json(response).await
    }

    /// Trade a refresh token for a new session; `None` once GoTrue rejects it.
    async fn refresh(&self, refresh_token: &str) -> Result<Option<Session>> {
        let response = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if response.status().is_client_error() {
            debug!(status = %response.status(), "Refresh token rejected");
            return Ok(None);
        }
        let token: TokenResponse = read_json(response).await?;
        let session = Session::from(token);
        info!(user = %session.user.id, "Session refreshed");
        self.set_session(Some(session.clone()));
        Ok(Some(session))
    }

    fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }
}

/// Turn a non-2xx reply into `SooqError::Remote` carrying the server's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(status = status.as_u16(), %message, "Backend call failed");
    Err(SooqError::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check(response).await?;
    Ok(response.json().await?)
}

/// PostgREST says `message`, GoTrue says `msg` or `error_description`.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Characters that would break out of a PostgREST `or=(...)` filter
fn sanitize_term(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[async_trait]
impl ListingStore for SupabaseClient {
    async fn available(&self, category: Option<&str>) -> Result<Vec<Listing>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("status", "eq.available".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(category) = category {
            query.push(("category", format!("eq.{category}")));
        }
        debug!(?category, "Fetching available listings");
        self.rows(self.table(Method::GET).query(&query)).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Listing>> {
        let term = sanitize_term(term);
        if term.is_empty() {
            return self.available(None).await;
        }
        let query = [
            ("select", "*".to_string()),
            ("status", "eq.available".to_string()),
            ("or", format!("(name.ilike.*{term}*,location.ilike.*{term}*)")),
            ("order", "created_at.desc".to_string()),
        ];
        debug!(%term, "Searching listings");
        self.rows(self.table(Method::GET).query(&query)).await
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        let query = [("select", "*".to_string()), ("id", format!("eq.{id}"))];
        let rows = self.rows(self.table(Method::GET).query(&query)).await?;
        Ok(rows.into_iter().next())
    }

    async fn by_seller(&self, seller_id: Uuid) -> Result<Vec<Listing>> {
        let query = [
            ("select", "*".to_string()),
            ("seller_id", format!("eq.{seller_id}")),
            ("order", "created_at.desc".to_string()),
        ];
        self.rows(self.table(Method::GET).query(&query)).await
    }

    async fn insert(&self, listing: &NewListing) -> Result<Listing> {
        let request = self
            .table(Method::POST)
            .header("Prefer", "return=representation")
            .json(listing);
        let rows = self.rows(request).await?;
        let row = rows.into_iter().next().ok_or_else(|| SooqError::Remote {
            status: 500,
            message: "insert returned no row".to_string(),
        })?;
        info!(id = %row.id, "Created listing");
        Ok(row)
    }

    async fn set_views(&self, id: Uuid, views: i64) -> Result<()> {
        let response = self
            .table(Method::PATCH)
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "views": views }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, seller_id: Uuid, status: ListingStatus) -> Result<bool> {
        let request = self
            .table(Method::PATCH)
            .query(&[
                ("id", format!("eq.{id}")),
                ("seller_id", format!("eq.{seller_id}")),
                ("status", "eq.available".to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&json!({ "status": status }));
        let rows = self.rows(request).await?;
        Ok(!rows.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    phone: Option<String>,
    location: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl From<AuthUser> for User {
    fn from(user: AuthUser) -> Self {
        let phone = user
            .user_metadata
            .phone
            .or(user.phone)
            .filter(|phone| !phone.is_empty());
        User {
            id: user.id,
            email: user.email.unwrap_or_default(),
            display_name: user.user_metadata.full_name,
            phone,
            location: user.user_metadata.location,
            avatar_url: user.user_metadata.avatar_url,
            joined_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let response = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": credentials.email, "password": credentials.password }))
            .send()
            .await?;
        let token: TokenResponse = read_json(response).await?;
        let session = Session::from(token);
        info!(user = %session.user.id, "Signed in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, registration: &Registration) -> Result<Option<Session>> {
        let response = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({
                "email": registration.email,
                "password": registration.password,
                "data": {
                    "full_name": registration.full_name,
                    "username": registration.username,
                },
            }))
            .send()
            .await?;
        let body: Value = read_json(response).await?;

        // Projects with e-mail confirmation answer with the bare user object.
        if body.get("access_token").is_none() {
            info!(email = %registration.email, "Sign-up pending e-mail confirmation");
            return Ok(None);
        }
        let token: TokenResponse = serde_json::from_value(body)?;
        let session = Session::from(token);
        self.set_session(Some(session.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session.borrow().is_none() {
            return Ok(());
        }
        let response = self.request(Method::POST, "/auth/v1/logout").send().await?;
        // Clear locally even if the server already forgot the token.
        self.set_session(None);
        check(response).await?;
        info!("Signed out");
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.borrow().clone())
    }

    async fn restore(&self, session: Session) -> Result<Option<Session>> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%status, "Persisted access token rejected");
            return match session.refresh_token.as_deref() {
                Some(refresh_token) => self.refresh(refresh_token).await,
                None => Ok(None),
            };
        }
        let user: AuthUser = read_json(response).await?;
        let restored = Session {
            user: user.into(),
            ..session
        };
        self.set_session(Some(restored.clone()));
        Ok(Some(restored))
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let size = bytes.len();
        let response = self
            .request(Method::POST, &format!("/storage/v1/object/{}/{}", self.bucket, path))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        debug!(path, size, "Uploaded image");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SELLER: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn test_client(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&server.uri(), "anon-key", "product-images").unwrap()
    }

    fn row(name: &str, category: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "name": name,
            "description": null,
            "price": 99.5,
            "condition": "new",
            "category": category,
            "location": "Aleppo, Syria",
            "image_url": null,
            "seller_id": SELLER,
            "seller_phone": null,
            "status": "available",
            "views": 0,
            "created_at": "2024-05-01T09:30:00+00:00"
        })
    }

    fn token_body() -> Value {
        json!({
            "access_token": "user-token",
            "refresh_token": "refresh",
            "token_type": "bearer",
            "user": {
                "id": SELLER,
                "email": "seller@example.com",
                "phone": "",
                "created_at": "2023-03-10T08:00:00Z",
                "user_metadata": { "full_name": "محمد أحمد", "location": "دمشق" }
            }
        })
    }

    #[tokio::test]
    async fn available_filters_by_status_and_category() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("status", "eq.available"))
            .and(query_param("category", "eq.books"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("Novel", "books")])))
            .expect(1)
            .mount(&server)
            .await;

        let listings = test_client(&server).available(Some("books")).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].category.as_deref(), Some("books"));
    }

    #[tokio::test]
    async fn remote_errors_keep_the_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"code": "PGRST301", "message": "JWT expired"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server).available(None).await.unwrap_err();
        match err {
            SooqError::Remote { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_in_token_is_used_for_later_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({"email": "seller@example.com", "password": "secret123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("seller_id", format!("eq.{SELLER}")))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let session = client
            .sign_in(&Credentials {
                email: "seller@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.display_name.as_deref(), Some("محمد أحمد"));
        assert_eq!(session.user.phone, None);
        assert!(client.subscribe().borrow().is_some());

        let mine = client.by_seller(session.user.id).await.unwrap();
        assert!(mine.is_empty());
    }

    #[tokio::test]
    async fn sign_up_pending_confirmation_yields_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": SELLER,
                "email": "new@example.com",
                "created_at": "2024-01-01T00:00:00Z",
                "confirmation_sent_at": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let session = client
            .sign_up(&Registration {
                email: "new@example.com".to_string(),
                password: "secret123".to_string(),
                full_name: "Sara".to_string(),
                username: "sara".to_string(),
            })
            .await
            .unwrap();
        assert!(session.is_none());
        assert!(client.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_status_reports_untouched_rows() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/products"))
            .and(query_param("id", format!("eq.{id}")))
            .and(query_param("seller_id", format!("eq.{SELLER}")))
            .and(query_param("status", "eq.available"))
            .and(body_json(json!({"status": "deleted"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let changed = test_client(&server)
            .set_status(id, SELLER.parse().unwrap(), ListingStatus::Deleted)
            .await
            .unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn upload_targets_bucket_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/storage/v1/object/product-images/{SELLER}/photo.png")))
            .and(header("content-type", "image/png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Key": "product-images/photo.png"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let object = format!("{SELLER}/photo.png");
        client.upload(&object, vec![1, 2, 3], "image/png").await.unwrap();
        assert_eq!(
            client.public_url(&object),
            format!("{}/storage/v1/object/public/product-images/{SELLER}/photo.png", server.uri())
        );
    }

    #[test]
    fn search_terms_cannot_escape_the_filter() {
        assert_eq!(sanitize_term(" a,b(c)*d "), "abcd");
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(
            error_message(r#"{"msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "unknown error");
    }

    fn stale_session() -> Session {
        Session {
            access_token: "stale-token".to_string(),
            refresh_token: Some("refresh".to_string()),
            user: User {
                id: SELLER.parse().unwrap(),
                email: "seller@example.com".to_string(),
                display_name: None,
                phone: None,
                location: None,
                avatar_url: None,
                joined_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed_on_restore() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer stale-token"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"msg": "invalid JWT: token is expired"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({"refresh_token": "refresh"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let restored = client.restore(stale_session()).await.unwrap().unwrap();
        assert_eq!(restored.access_token, "user-token");
        assert_eq!(client.bearer(), "user-token");
    }

    #[tokio::test]
    async fn rejected_refresh_token_means_signed_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "expired"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error_description": "Invalid Refresh Token"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client.restore(stale_session()).await.unwrap().is_none());
        assert!(client.subscribe().borrow().is_none());
    }
}
