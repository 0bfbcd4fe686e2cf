//! Bearer credential acquisition and caching.
//!
//! Every remote call carries a bearer token. Tokens come from a
//! [`TokenSource`] (client-credentials grant in production, a static
//! literal in tests) and are cached with an expiry slack so concurrent
//! callers share one credential and refresh lazily.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    /// Validity as reported by the issuer.
    pub expires_in_secs: u64,
}

/// Source of fresh bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> StoreResult<IssuedToken>;
}

/// OAuth2 client-credentials token source.
pub struct ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    http: reqwest::Client,
}

impl ClientCredentials {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: Option<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn fetch(&self) -> StoreResult<IssuedToken> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                StoreError::connection_failed_with_source("token endpoint unreachable", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::authentication_failed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenEndpointResponse = response.json().await.map_err(|e| {
            StoreError::malformed_response(format!("token endpoint body: {e}"))
        })?;

        debug!(expires_in = parsed.expires_in, "Fetched access token");

        Ok(IssuedToken {
            access_token: parsed.access_token,
            expires_in_secs: parsed.expires_in,
        })
    }
}

/// Fixed token source for tests and local development.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn fetch(&self) -> StoreResult<IssuedToken> {
        Ok(IssuedToken {
            access_token: self.0.clone(),
            expires_in_secs: 3600,
        })
    }
}

/// Slack subtracted from the reported validity, so a token is refreshed
/// shortly before it actually expires.
const EXPIRY_SLACK_SECS: i64 = 60;

struct CacheSlot {
    token: String,
    valid_until: DateTime<Utc>,
}

/// Lazily refreshed shared token cache.
pub struct CachedToken {
    source: Box<dyn TokenSource>,
    slot: RwLock<Option<CacheSlot>>,
}

impl CachedToken {
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slot: RwLock::new(None),
        }
    }

    /// The current bearer token, fetching or refreshing if needed.
    pub async fn bearer(&self) -> StoreResult<String> {
        {
            let slot = self.slot.read().await;
            if let Some(cached) = slot.as_ref() {
                if Utc::now() < cached.valid_until {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut slot = self.slot.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if Utc::now() < cached.valid_until {
                return Ok(cached.token.clone());
            }
        }

        let issued = self.source.fetch().await?;
        let lifetime = (issued.expires_in_secs as i64 - EXPIRY_SLACK_SECS).max(0);
        *slot = Some(CacheSlot {
            token: issued.access_token.clone(),
            valid_until: Utc::now() + Duration::seconds(lifetime),
        });

        Ok(issued.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        expires_in_secs: u64,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch(&self) -> StoreResult<IssuedToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("token-{n}"),
                expires_in_secs: self.expires_in_secs,
            })
        }
    }

    #[tokio::test]
    async fn test_token_is_cached_across_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachedToken::new(CountingSource {
            calls: calls.clone(),
            expires_in_secs: 3600,
        });

        assert_eq!(cache.bearer().await.unwrap(), "token-1");
        assert_eq!(cache.bearer().await.unwrap(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let calls = Arc::new(AtomicUsize::new(0));
        // Lifetime below the slack: cached entry is immediately stale.
        let cache = CachedToken::new(CountingSource {
            calls: calls.clone(),
            expires_in_secs: 10,
        });

        assert_eq!(cache.bearer().await.unwrap(), "token-1");
        assert_eq!(cache.bearer().await.unwrap(), "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(CachedToken::new(CountingSource {
            calls: calls.clone(),
            expires_in_secs: 3600,
        }));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.bearer().await.unwrap() })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), "token-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
