use std::net::IpAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

mod client_ip;
mod http_client;
mod provider;
mod request;
mod result;

pub use crate::Error;
pub use provider::IpApi;
pub use request::IncomingRequest;
pub use result::LookupResult;

use crate::{config::Config, util::abbreviate};

/// Longest slice of an upstream body that ends up in a log line.
const LOG_BODY_LIMIT: usize = 200;

/// Status code plus optional body, the whole outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<LookupResult>,
}

impl Reply {
    pub fn new(status: StatusCode, body: LookupResult) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub keepalive_no_content: bool,
    pub client_ip_override: Option<IpAddr>,
}

impl Options {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keepalive_no_content: config.keepalive_no_content,
            client_ip_override: config.client_ip_override(),
        }
    }
}

/// Turns one inbound request into one normalized reply.
///
/// Holds only read-only settings and the shared provider client, so a
/// single instance serves every concurrent request.
pub struct LookupHandler {
    provider: IpApi,
    options: Options,
}

impl LookupHandler {
    pub fn new(provider: IpApi, options: Options) -> Self {
        Self { provider, options }
    }

    pub async fn handle(&self, request: &IncomingRequest) -> Reply {
        info!("lookup request received");

        if client_ip::is_keepalive(&request.query) {
            info!("keepalive request, skipping lookup");
            return self.keepalive();
        }

        match self.lookup(request).await {
            Ok(reply) => reply,
            Err(err) => err.into_reply(),
        }
    }

    fn keepalive(&self) -> Reply {
        if self.options.keepalive_no_content {
            Reply::empty(StatusCode::NO_CONTENT)
        } else {
            Reply::new(StatusCode::OK, LookupResult::empty_success())
        }
    }

    async fn lookup(&self, request: &IncomingRequest) -> Result<Reply, Error> {
        let resolved = match self.options.client_ip_override {
            Some(ip) => ip.to_string(),
            None => client_ip::resolve(&request.headers, request.remote_addr),
        };
        let ip = client_ip::validate(&resolved)?;

        let fetched = self.provider.lookup(ip).await?;

        if !fetched.is_success() {
            info!(
                "request to {} was not a success. code: {}; message: {}",
                self.provider.name(),
                fetched.status,
                abbreviate(&fetched.body, LOG_BODY_LIMIT)
            );
            let status = passthrough_status(fetched.status);
            return Ok(Reply::new(status, LookupResult::fail(fetched.body)));
        }

        let result = self.provider.decode(ip, &fetched.body)?.into_result();
        if result.is_success() {
            info!(
                "successfully processed ip: {} ({})",
                ip,
                result.record().country.as_deref().unwrap_or("-")
            );
            Ok(Reply::new(StatusCode::OK, result))
        } else {
            info!(
                "{} rejected ip {}: {}",
                self.provider.name(),
                ip,
                result.message().unwrap_or("-")
            );
            Ok(Reply::new(StatusCode::BAD_REQUEST, result))
        }
    }
}

/// Reuses an upstream status code for our own response when it is a
/// representable final status, otherwise answers 500.
fn passthrough_status(code: u16) -> StatusCode {
    match StatusCode::from_u16(code) {
        Ok(status) if !status.is_informational() => status,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
