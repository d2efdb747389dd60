//! Authenticated image fetching.
//!
//! Wraps a [`reqwest::Client`] and performs a single bearer-authenticated
//! `GET` per image. There is no retry: one attempt, then the caller decides.

use std::time::Duration;

use imagepoly_core::{DecodeError, SessionToken};

/// Outcome of a fetch that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response with its body.
    Body(Vec<u8>),
    /// Any other status code.
    Status(u16),
}

/// HTTP client for encoded image bytes.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// `GET source` with `Authorization: Bearer <token>`.
    ///
    /// Transport errors (DNS, refused connection, timeout, truncated body)
    /// come back as [`DecodeError::FetchFailure`]; HTTP error statuses are
    /// a successful [`FetchOutcome::Status`].
    pub async fn fetch(
        &self,
        source: &str,
        token: &SessionToken,
    ) -> Result<FetchOutcome, DecodeError> {
        let response = self
            .client
            .get(source)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| DecodeError::fetch(source, e))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchOutcome::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DecodeError::fetch(source, e))?;

        Ok(FetchOutcome::Body(body.to_vec()))
    }
}

impl Default for ImageFetcher {
    fn default() -> Self {
        Self::with_client(reqwest::Client::new())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn new_does_not_panic() {
        let _fetcher = ImageFetcher::new(Duration::from_secs(5)).expect("client builds");
    }

    #[tokio::test]
    async fn relative_source_is_a_fetch_failure() {
        let fetcher = ImageFetcher::default();
        let result = fetcher
            .fetch("/files/no-host.jxl", &SessionToken::new("t"))
            .await;
        assert_matches!(result, Err(DecodeError::FetchFailure { source_url, .. }) if source_url == "/files/no-host.jxl");
    }
}
