//! Client-credentials token acquisition with a single-slot TTL cache.
//!
//! [`TokenProvider`] owns the cache; callers only ever ask it for a bearer
//! token and never see the refresh. The cache lock is never held across an
//! await, so two concurrent misses may both refresh. Both tokens are valid;
//! the later store wins.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::{
    error::{PipelineError, PipelineResult},
    models::TokenResponse,
};

// ---

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Single-slot token cache; an entry is served only while `now < expires_at`.
#[derive(Debug, Default)]
pub struct TokenCache {
    entry: Option<CachedToken>,
}

impl TokenCache {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, now: Instant) -> Option<&str> {
        self.entry
            .as_ref()
            .filter(|cached| now < cached.expires_at)
            .map(|cached| cached.access_token.as_str())
    }

    pub fn store(&mut self, access_token: String, ttl: Duration, now: Instant) {
        self.entry = Some(CachedToken {
            access_token,
            expires_at: now + ttl,
        });
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

/// Obtains bearer tokens from the upstream token endpoint.
pub struct TokenProvider {
    // ---
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<TokenCache>,
}

impl TokenProvider {
    // ---
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: Mutex::new(TokenCache::new()),
        }
    }

    /// Return the cached token, or request and cache a new one.
    ///
    /// The new token is cached for exactly `expires_in` seconds.
    pub async fn access_token(&self) -> PipelineResult<String> {
        // ---
        if let Some(token) = self.cached(Instant::now()) {
            debug!("Using cached access token");
            return Ok(token);
        }

        let (token, expires_in) = self.request_new_token().await?;
        self.lock_cache().store(token.clone(), expires_in, Instant::now());

        info!("Cached new access token for {}s", expires_in.as_secs());
        Ok(token)
    }

    /// POST to the token endpoint with HTTP Basic auth.
    ///
    /// A missing `expires_in` is read as zero, i.e. the token is used once
    /// and never served from the cache.
    pub async fn request_new_token(&self) -> PipelineResult<(String, Duration)> {
        // ---
        debug!("Requesting new access token from {}", self.token_url);

        let response: TokenResponse = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(PipelineError::TokenRequest)?
            .json()
            .await
            .map_err(PipelineError::TokenRequest)?;

        let token = response
            .access_token
            .ok_or(PipelineError::MissingAccessToken)?;
        let expires_in = Duration::from_secs(response.expires_in.unwrap_or(0));

        Ok((token, expires_in))
    }

    /// Drop the cached token, forcing the next call to refresh.
    pub fn invalidate(&self) {
        self.lock_cache().clear();
    }

    fn cached(&self, now: Instant) -> Option<String> {
        self.lock_cache().get(now).map(str::to_owned)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, TokenCache> {
        // A poisoned lock still holds a usable slot
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
