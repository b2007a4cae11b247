use std::net::IpAddr;

use axum::http::StatusCode;
use isahc::Error as IsahcError;

use crate::proxy::{LookupResult, Reply};

/// Every way a lookup can go wrong before a provider payload is in hand.
///
/// The `Display` text is the message sent back to the caller, so it never
/// includes the underlying source error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IP address is not a valid IP address: {0}")]
    InvalidClientAddress(String),
    #[error("Request to {provider} timed out.")]
    UpstreamTimeout { provider: String, ip: IpAddr },
    #[error("Request to {provider} failed.")]
    UpstreamUnreachable {
        provider: String,
        ip: IpAddr,
        #[source]
        source: IsahcError,
    },
    #[error("Response from {provider} could not be read.")]
    UpstreamRead {
        provider: String,
        ip: IpAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Response from {provider} could not be parsed.")]
    UpstreamBody {
        provider: String,
        ip: IpAddr,
        #[source]
        source: serde_json::Error,
    },
    #[error("Isahc Error: {0}")]
    Isahc(#[from] IsahcError),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidClientAddress(_) => StatusCode::BAD_REQUEST,
            Error::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::UpstreamUnreachable { .. }
            | Error::UpstreamRead { .. }
            | Error::UpstreamBody { .. } => StatusCode::BAD_GATEWAY,
            Error::Isahc(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-friendly name for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidClientAddress(_) => "invalid_client_address",
            Error::UpstreamTimeout { .. } => "upstream_timeout",
            Error::UpstreamUnreachable { .. } => "upstream_unreachable",
            Error::UpstreamRead { .. } => "upstream_read",
            Error::UpstreamBody { .. } => "upstream_body",
            Error::Isahc(_) => "http_client_error",
        }
    }

    /// Client address the failed lookup was made for, when one was resolved.
    fn client(&self) -> Option<IpAddr> {
        match self {
            Error::UpstreamTimeout { ip, .. }
            | Error::UpstreamUnreachable { ip, .. }
            | Error::UpstreamRead { ip, .. }
            | Error::UpstreamBody { ip, .. } => Some(*ip),
            _ => None,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Error::UpstreamUnreachable { source, .. } => Some(source.to_string()),
            Error::UpstreamRead { source, .. } => Some(source.to_string()),
            Error::UpstreamBody { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }

    /// Logs the failure once and renders it as a `fail` reply.
    pub fn into_reply(self) -> Reply {
        let client = self
            .client()
            .map_or_else(|| "-".to_string(), |ip| ip.to_string());
        match self.detail() {
            Some(detail) => info!("[{}] ip: {}; {} {}", self.code(), client, self, detail),
            None => info!("[{}] ip: {}; {}", self.code(), client, self),
        }
        Reply::new(self.status_code(), LookupResult::fail(self.to_string()))
    }
}
