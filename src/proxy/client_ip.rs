use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
};

use axum::http::HeaderMap;

use crate::Error;

const KEEPALIVE: &str = "keepalive";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// `?keepalive=true` in any letter case. Anything unparseable reads as false.
pub fn is_keepalive(query: &HashMap<String, String>) -> bool {
    query
        .get(KEEPALIVE)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Picks the address string to look up: the leftmost `X-Forwarded-For`
/// entry when the header is present, otherwise the transport peer.
///
/// The result is untrusted and still has to go through [`validate`].
pub fn resolve(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    if let Some(value) = headers.get(X_FORWARDED_FOR) {
        let value = String::from_utf8_lossy(value.as_bytes());
        let first = value.split(',').next().unwrap_or_default();
        return first.trim().to_string();
    }
    remote_addr
        .map(|addr| addr.ip().to_canonical().to_string())
        .unwrap_or_default()
}

pub fn validate(resolved: &str) -> Result<IpAddr, Error> {
    resolved
        .parse()
        .map_err(|_err| Error::InvalidClientAddress(resolved.to_string()))
}
