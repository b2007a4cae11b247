use std::{collections::HashMap, convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Query},
    http::{HeaderMap, Uri, request::Parts},
};

/// Read-only view of one inbound request.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// Repeated keys are joined with `,` in arrival order.
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

impl<S> FromRequestParts<S> for IncomingRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self {
            query: query_map(&parts.uri),
            headers: parts.headers.clone(),
            remote_addr,
        })
    }
}

// a malformed query string is treated as an empty one
fn query_map(uri: &Uri) -> HashMap<String, String> {
    let Ok(Query(pairs)) = Query::<Vec<(String, String)>>::try_from_uri(uri) else {
        return HashMap::new();
    };
    let mut query: HashMap<String, String> = HashMap::new();
    for (key, value) in pairs {
        query
            .entry(key)
            .and_modify(|joined| {
                joined.push(',');
                joined.push_str(&value);
            })
            .or_insert(value);
    }
    query
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};

    use super::*;

    async fn extract(uri: &str) -> IncomingRequest {
        let (mut parts, _body) = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let Ok(request) = IncomingRequest::from_request_parts(&mut parts, &()).await;
        request
    }

    #[tokio::test]
    async fn single_values_are_kept() {
        let request = extract("/api/ipproxy?keepalive=true&x=1").await;
        assert_eq!(request.query["keepalive"], "true");
        assert_eq!(request.query["x"], "1");
        assert_eq!(request.remote_addr, None);
    }

    #[tokio::test]
    async fn repeated_keys_are_joined() {
        let request = extract("/api/ipproxy?keepalive=false&keepalive=true").await;
        assert_eq!(request.query["keepalive"], "false,true");
    }

    #[tokio::test]
    async fn peer_address_comes_from_connect_info() {
        let (mut parts, _body) = Request::builder()
            .uri("/api/ipproxy")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let peer: SocketAddr = "198.51.100.7:51000".parse().unwrap();
        parts.extensions.insert(ConnectInfo(peer));
        let Ok(request) = IncomingRequest::from_request_parts(&mut parts, &()).await;
        assert_eq!(request.remote_addr, Some(peer));
        assert!(request.query.is_empty());
    }
}
