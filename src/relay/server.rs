use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{Result, SooqError};
use crate::relay::mailer::{Email, Mailer};

#[derive(Clone)]
pub struct RelayState {
    pub mailer: Arc<dyn Mailer>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfirmationRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ConfirmationRequest {
    fn into_email(self) -> Option<Email> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Some(Email {
            email: present(self.email)?,
            subject: present(self.subject)?,
            body: present(self.message)?,
        })
    }
}

pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/send-confirmation", post(send_confirmation))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the relay on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Email relay listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn send_confirmation(State(state): State<RelayState>, body: Bytes) -> impl IntoResponse {
    let request: ConfirmationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            error!(error = %err, "Unreadable confirmation request");
            return failure(&SooqError::from(err));
        }
    };

    let Some(email) = request.into_email() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Email, subject and message are required" })),
        );
    };

    match state.mailer.send(&email).await {
        Ok(()) => {
            info!(to = %email.email, "Confirmation email relayed");
            (
                StatusCode::OK,
                Json(json!({ "message": "Email sent successfully" })),
            )
        }
        Err(err) => {
            error!(error = %err, "Error sending email");
            failure(&err)
        }
    }
}

fn failure(err: &SooqError) -> (StatusCode, Json<serde_json::Value>) {
    let message = match err {
        SooqError::Remote { message, .. } => message.clone(),
        other => other.to_string(),
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}
