//! Realtime database binding over REST and server-sent events.
//!
//! - `GET|PATCH|PUT|DELETE {base}/{path}.json?auth={token}`
//! - Subscriptions open `GET {base}/{path}.json` with `Accept: text/event-stream`.
//!   `put` and `patch` events trigger a full re-read of the path, `keep-alive` is
//!   ignored, and `cancel`, `auth_revoked` or the server closing the stream end
//!   it with an error.

use crate::error::{RecordStoreError, Result};
use crate::providers::{RecordStore, RecordStream};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Connection settings
#[derive(Debug, Clone)]
pub struct RealtimeDbConfig {
    /// Database root, e.g. `https://shop-default-rtdb.firebaseio.com`
    pub base_url: String,
    /// Database secret or ID token sent as `auth`
    pub auth_token: Option<String>,
    /// Timeout for REST calls; subscriptions only use it to connect
    pub timeout: Duration,
}

impl RealtimeDbConfig {
    /// Settings for `base_url` with no auth and a 10 second timeout
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Load from `REALTIME_DB_URL`, `REALTIME_DB_AUTH` and `REALTIME_DB_TIMEOUT` (seconds)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("REALTIME_DB_URL").unwrap_or_else(|_| "http://localhost:9000".to_string()),
            auth_token: env::var("REALTIME_DB_AUTH").ok().filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(
                env::var("REALTIME_DB_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }

    /// Set the auth token
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Realtime database client
#[derive(Debug, Clone)]
pub struct RealtimeDbClient {
    http: reqwest::Client,
    config: Arc<RealtimeDbConfig>,
}

impl RealtimeDbClient {
    /// Build a client
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Http`] if the TLS backend cannot initialize.
    pub fn new(config: RealtimeDbConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.config.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RecordStoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch(&self, path: &str) -> Result<Value> {
        let response = self
            .request(Method::GET, path)
            .timeout(self.config.timeout)
            .send()
            .await?;
        Ok(Self::check(response).await?.json::<Value>().await?)
    }

    async fn store(&self, path: &str, value: Value) -> Result<()> {
        // PATCH merges object children; scalars and arrays need PUT
        let method = if value.is_object() { Method::PATCH } else { Method::PUT };
        let response = self
            .request(method, path)
            .timeout(self.config.timeout)
            .json(&value)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, path)
            .timeout(self.config.timeout)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn open_event_stream(&self, path: &str) -> Result<EventBody> {
        let response = self
            .request(Method::GET, path)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check(response).await?;
        tracing::debug!(path, "Event stream opened");

        Ok(response.bytes_stream().eventsource().boxed())
    }

    async fn advance(&self, state: Subscription, path: &str) -> Option<(Result<Value>, Subscription)> {
        let mut body = match state {
            Subscription::Closed => return None,
            Subscription::Connect => match self.open_event_stream(path).await {
                Ok(body) => body,
                Err(error) => return Some((Err(error), Subscription::Closed)),
            },
            Subscription::Listen(body) => body,
        };

        loop {
            let event = match body.next().await {
                Some(Ok(event)) => event,
                Some(Err(EventStreamError::Transport(error))) => {
                    return Some((Err(error.into()), Subscription::Closed));
                },
                Some(Err(error)) => {
                    let error = RecordStoreError::Decode {
                        path: path.to_string(),
                        message: error.to_string(),
                    };
                    return Some((Err(error), Subscription::Closed));
                },
                None => {
                    tracing::debug!(path, "Event stream closed by server");
                    let error = RecordStoreError::SubscriptionClosed(path.to_string());
                    return Some((Err(error), Subscription::Closed));
                },
            };

            match event.event.as_str() {
                "put" | "patch" => {
                    return match self.fetch(path).await {
                        Ok(value) => Some((Ok(value), Subscription::Listen(body))),
                        Err(error) => Some((Err(error), Subscription::Closed)),
                    };
                },
                "cancel" => {
                    let error = RecordStoreError::SubscriptionCancelled(path.to_string());
                    return Some((Err(error), Subscription::Closed));
                },
                "auth_revoked" => {
                    let error = RecordStoreError::AuthRevoked(path.to_string());
                    return Some((Err(error), Subscription::Closed));
                },
                "keep-alive" => {},
                other => tracing::trace!(event = other, "Ignoring event"),
            }
        }
    }
}

type EventBody = BoxStream<'static, std::result::Result<Event, EventStreamError<reqwest::Error>>>;

enum Subscription {
    Connect,
    Listen(EventBody),
    Closed,
}

impl RecordStore for RealtimeDbClient {
    async fn read(&self, path: &str) -> Result<Value> {
        self.fetch(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.store(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.remove(path).await
    }

    fn subscribe(&self, path: &str) -> RecordStream {
        let client = self.clone();
        let path = path.to_string();

        futures::stream::unfold(Subscription::Connect, move |state| {
            let client = client.clone();
            let path = path.clone();
            async move { client.advance(state, &path).await }
        })
        .boxed()
    }
}
