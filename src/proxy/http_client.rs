use std::time::Duration;

use isahc::{config::Configurable, prelude::AsyncReadResponseExt};

use crate::Error;

/// Raw upstream answer: numeric status code and the body as text.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug)]
pub enum FetchError {
    Timeout,
    Transport(isahc::Error),
    Body(std::io::Error),
}

/// Shared outbound client. Holds no per-request state, so clones can be
/// used from any number of concurrent requests.
#[derive(Clone)]
pub(crate) struct HttpClient {
    inner: isahc::HttpClient,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let inner = isahc::HttpClient::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .default_header(
                "user-agent",
                format!("ipproxy/{}", env!("CARGO_PKG_VERSION")),
            )
            .build()?;

        Ok(Self { inner, timeout })
    }

    /// Single GET attempt. Sending the request and reading the whole body
    /// share one deadline; when it fires the in-flight future is dropped.
    pub async fn get_text(&self, url: &str) -> Result<Fetched, FetchError> {
        let fetch = async {
            let mut response = self.inner.get_async(url).await.map_err(|err| {
                if err.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Transport(err)
                }
            })?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|err| {
                if err.kind() == std::io::ErrorKind::TimedOut {
                    FetchError::Timeout
                } else {
                    FetchError::Body(err)
                }
            })?;
            Ok::<_, FetchError>(Fetched { status, body })
        };

        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }
}
