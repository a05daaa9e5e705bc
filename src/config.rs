use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Result, SooqError};
use crate::i18n::Locale;

const DEFAULT_BUCKET: &str = "product-images";
const DEFAULT_SESSION_PATH: &str = ".sooq/session.json";
const DEFAULT_RELAY_ADDR: &str = "0.0.0.0:8787";

/// Hosted project coordinates; absent means "run on the demo data"
#[derive(Debug, Clone, PartialEq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub supabase: Option<SupabaseConfig>,
    pub locale: Locale,
    pub session_path: PathBuf,
    pub relay_addr: SocketAddr,
    pub mail_api_url: Option<String>,
    /// Bearer token the relay presents to the mail API
    pub service_role_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let supabase = match var("SUPABASE_URL") {
            Some(url) => Some(SupabaseConfig {
                url,
                anon_key: var("SUPABASE_ANON_KEY").ok_or_else(|| {
                    SooqError::Config("SUPABASE_ANON_KEY must be set with SUPABASE_URL".into())
                })?,
                bucket: var("SOOQ_STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            }),
            None => None,
        };

        let locale = match var("SOOQ_LOCALE") {
            Some(value) => value.parse().map_err(SooqError::Config)?,
            None => Locale::default(),
        };

        let relay_addr = var("SOOQ_RELAY_ADDR")
            .unwrap_or_else(|| DEFAULT_RELAY_ADDR.to_string());
        let relay_addr = relay_addr
            .parse()
            .map_err(|e| SooqError::Config(format!("SOOQ_RELAY_ADDR `{relay_addr}`: {e}")))?;

        Ok(Self {
            supabase,
            locale,
            session_path: var("SOOQ_SESSION_PATH")
                .unwrap_or_else(|| DEFAULT_SESSION_PATH.to_string())
                .into(),
            relay_addr,
            mail_api_url: var("MAIL_API_URL"),
            service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
        })
    }
}
