//! HTTP client for a keylock server.
//!
//! The server never queues or blocks; [`KeylockClient::acquire`] layers a
//! client-side polling retry on top for callers that want to wait.

use std::time::{Duration, Instant};

use reqwest::Url;

use keylock_core::{Operation, ResultCode};

/// Upper bound for the polling backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Errors from talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server URL could not be parsed or cannot carry path segments.
    #[error("invalid server url '{0}'")]
    InvalidUrl(String),

    /// Connection, timeout or protocol failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The key has a `.` or `..` segment. URL normalization would rewrite
    /// it into a different key before the request is sent.
    #[error("key '{0}' has a '.' or '..' path segment and cannot be sent verbatim")]
    UnaddressableKey(String),

    /// The server answered with a status outside the protocol.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Thin wrapper over `reqwest::Client` bound to one server.
#[derive(Debug, Clone)]
pub struct KeylockClient {
    http: reqwest::Client,
    base: Url,
}

impl KeylockClient {
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let base = Url::parse(server).map_err(|_| ClientError::InvalidUrl(server.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(server.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(KeylockClient { http, base })
    }

    /// Builds `/{op}/{key}`. Each `/`-separated part of the key becomes one
    /// percent-encoded segment; an empty key produces the bare `/{op}` route.
    ///
    /// Dot segments are refused: URL parsing resolves `.`, `..` and their
    /// `%2E` spellings, so no request line can carry them to the server.
    pub fn operation_url(&self, op: Operation, key: &str) -> Result<Url, ClientError> {
        if key.split('/').any(|part| part == "." || part == "..") {
            return Err(ClientError::UnaddressableKey(key.to_string()));
        }
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push(op.as_str());
            if !key.is_empty() {
                segments.extend(key.split('/'));
            }
        }
        Ok(url)
    }

    /// Performs one operation and returns its result code.
    pub async fn call(&self, op: Operation, key: &str) -> Result<ResultCode, ClientError> {
        let url = self.operation_url(op, key)?;
        let status = self.http.get(url).send().await?.status().as_u16();
        ResultCode::from_http_status(status).ok_or(ClientError::UnexpectedStatus(status))
    }

    /// `GET /health`, returning the JSON body.
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("health");

        let response = self.http.get(url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(ClientError::UnexpectedStatus(status));
        }
        Ok(response.json().await?)
    }

    /// Retries `op` while it answers Conflict, doubling the pause from
    /// `interval` up to [`MAX_BACKOFF`], until `wait` has elapsed. Returns the
    /// last result code.
    pub async fn acquire(
        &self,
        op: Operation,
        key: &str,
        wait: Duration,
        interval: Duration,
    ) -> Result<ResultCode, ClientError> {
        let deadline = Instant::now() + wait;
        let mut backoff = interval;
        let mut attempts = 1u32;

        loop {
            let code = self.call(op, key).await?;
            let now = Instant::now();
            if code != ResultCode::Conflict || now >= deadline {
                tracing::debug!(%op, key, attempts, %code, "acquire finished");
                return Ok(code);
            }

            tracing::debug!(%op, key, attempts, ?backoff, "conflict, retrying");
            tokio::time::sleep(backoff.min(deadline - now)).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            attempts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use keylock_server::router::build_router;
    use keylock_server::state::AppState;

    /// Serves a fresh router on an ephemeral localhost port.
    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(AppState::default()))
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn operation_url_encodes_key_segments() {
        let client = KeylockClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            client.operation_url(Operation::Lock, "blah").unwrap().as_str(),
            "http://localhost:8080/lock/blah"
        );
        assert_eq!(
            client.operation_url(Operation::RUnlock, "a b/c?").unwrap().as_str(),
            "http://localhost:8080/runlock/a%20b/c%3F"
        );
        assert_eq!(
            client.operation_url(Operation::Status, "").unwrap().as_str(),
            "http://localhost:8080/status"
        );
    }

    #[test]
    fn operation_url_refuses_dot_segments() {
        let client = KeylockClient::new("http://localhost:8080").unwrap();
        for key in ["a/../b", "..", ".", "a/./b", "a/.."] {
            assert!(
                matches!(
                    client.operation_url(Operation::Lock, key),
                    Err(ClientError::UnaddressableKey(ref k)) if k == key
                ),
                "{key}"
            );
        }
        assert_eq!(
            client.operation_url(Operation::Lock, "a/.../b.c/.x").unwrap().as_str(),
            "http://localhost:8080/lock/a/.../b.c/.x"
        );
        assert_eq!(
            client.operation_url(Operation::Lock, "%2E%2E").unwrap().as_str(),
            "http://localhost:8080/lock/%252E%252E"
        );
    }

    #[test]
    fn operation_url_keeps_base_path() {
        let client = KeylockClient::new("http://localhost:8080/locks/").unwrap();
        assert_eq!(
            client.operation_url(Operation::Unlock, "k").unwrap().as_str(),
            "http://localhost:8080/locks/unlock/k"
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(matches!(
            KeylockClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            KeylockClient::new("mailto:someone@example.com"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn round_trip_against_server() {
        let client = KeylockClient::new(&spawn_server().await).unwrap();

        assert_eq!(client.call(Operation::Lock, "blah").await.unwrap(), ResultCode::Accepted);
        assert_eq!(client.call(Operation::Status, "blah").await.unwrap(), ResultCode::Locked);
        assert_eq!(client.call(Operation::RLock, "blah").await.unwrap(), ResultCode::Conflict);
        assert_eq!(client.call(Operation::Unlock, "blah").await.unwrap(), ResultCode::Accepted);
        assert_eq!(client.call(Operation::Status, "blah").await.unwrap(), ResultCode::Ok);
        assert_eq!(client.call(Operation::Lock, "").await.unwrap(), ResultCode::BadRequest);
        assert_eq!(client.call(Operation::Lock, "x y/z").await.unwrap(), ResultCode::Accepted);
        assert_eq!(client.call(Operation::Status, "x y/z").await.unwrap(), ResultCode::Locked);

        let health = client.health().await.unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn dot_segment_key_never_touches_another_key() {
        let client = KeylockClient::new(&spawn_server().await).unwrap();

        assert!(matches!(
            client.call(Operation::Lock, "a/../b").await,
            Err(ClientError::UnaddressableKey(_))
        ));
        assert!(matches!(
            client.call(Operation::Lock, "..").await,
            Err(ClientError::UnaddressableKey(_))
        ));
        assert_eq!(client.call(Operation::Status, "b").await.unwrap(), ResultCode::Ok);
        assert_eq!(client.call(Operation::Status, "a/b").await.unwrap(), ResultCode::Ok);

        let health = client.health().await.unwrap();
        assert_eq!(health["write_locked"], 0);
    }

    #[tokio::test]
    async fn acquire_waits_for_release() {
        let client = KeylockClient::new(&spawn_server().await).unwrap();
        client.call(Operation::Lock, "job").await.unwrap();

        let releaser = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            releaser.call(Operation::Unlock, "job").await.unwrap();
        });

        let code = client
            .acquire(
                Operation::Lock,
                "job",
                Duration::from_secs(5),
                Duration::from_millis(10),
            )
            .await
            .unwrap();
        assert_eq!(code, ResultCode::Accepted);
    }

    #[tokio::test]
    async fn acquire_gives_up_after_deadline() {
        let client = KeylockClient::new(&spawn_server().await).unwrap();
        client.call(Operation::Lock, "held").await.unwrap();

        let started = Instant::now();
        let code = client
            .acquire(
                Operation::RLock,
                "held",
                Duration::from_millis(150),
                Duration::from_millis(10),
            )
            .await
            .unwrap();
        assert_eq!(code, ResultCode::Conflict);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}
