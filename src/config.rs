use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Max length of titles and names.
pub const CHARFIELD_LEN: u64 = 256;
pub const USERNAME_LEN: u64 = 150;
/// Length of the short display form of titles and names.
pub const DISPLAY_LEN: usize = 15;
/// Posts per page on every paginated listing.
pub const DISPLAY_POSTS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Settings {
    /// `mysql://...`, or `memory://` for a throwaway in-process store.
    pub db_url: String,
    pub bind_addr: String,
    pub media_root: PathBuf,
    pub page_size: u64,
    pub login_url: String,
    pub cors_origin: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_url = lookup("DB_URL")
            .ok_or_else(|| Error::Config("DB_URL is not set".to_string()))?;

        let page_size = match lookup("PAGE_SIZE") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(size) if size > 0 => size,
                _ => return Err(Error::Config(format!("invalid PAGE_SIZE: {}", raw))),
            },
            None => DISPLAY_POSTS,
        };

        Ok(Settings {
            db_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            page_size,
            login_url: lookup("LOGIN_URL").unwrap_or_else(|| "/auth/login/".to_string()),
            cors_origin: lookup("CORS_ORIGIN"),
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_url.starts_with("memory://")
    }
}
