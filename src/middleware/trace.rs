use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
};
use futures_util::ready;
use pin_project_lite::pin_project;
use tokio::time::Instant;
use tower::{Layer, Service};
use yansi::{Paint, Painted};

use crate::util::get_ua;

#[derive(Clone)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = TraceMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct TraceMiddleware<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TraceMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = TraceFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ua = get_ua(req.headers());
        let response_future = self.inner.call(req);
        TraceFuture {
            response_future,
            start,
            method,
            path,
            peer,
            ua,
        }
    }
}

pin_project! {
    pub struct TraceFuture<F> {
        #[pin]
        response_future: F,
        start: Instant,
        method: String,
        path: String,
        peer: String,
        ua: String,
    }
}

impl<F, ResBody, E> Future for TraceFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let res = ready!(this.response_future.poll(cx)?);
        let status = res.status();
        let elapsed = this.start.elapsed();
        // 5xx here means the relay itself or the upstream failed
        if is_failure(status) {
            warn!(
                method = ?this.method.green(),
                path = ?this.path.blue(),
                status = ?status.red(),
                peer = %this.peer,
                ua = %this.ua,
                elapsed = ?elapsed.rgb(248, 200, 220)
            );
        } else {
            info!(
                method = ?this.method.green(),
                path = ?this.path.blue(),
                status = ?paint_status(&status),
                peer = %this.peer,
                ua = %this.ua,
                elapsed = ?elapsed.rgb(248, 200, 220)
            );
        }
        Poll::Ready(Ok(res))
    }
}

fn is_failure(status: StatusCode) -> bool {
    status.is_server_error()
}

fn paint_status(status: &StatusCode) -> Painted<&StatusCode> {
    match status.as_u16() {
        100..=199 => status.blue(),
        200..=299 => status.green(),
        300..=399 => status.cyan(),
        400..=499 => status.yellow(),
        _ => status.red(),
    }
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, net::SocketAddr};

    use axum::body::Body;
    use tower::{ServiceExt, service_fn};

    use super::*;

    #[test]
    fn only_server_errors_are_failures() {
        assert!(is_failure(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_failure(StatusCode::BAD_GATEWAY));
        assert!(!is_failure(StatusCode::BAD_REQUEST));
        assert!(!is_failure(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_failure(StatusCode::OK));
    }

    #[tokio::test]
    async fn response_passes_through_unchanged() {
        let inner = service_fn(|req: Request<Body>| async move {
            let peer = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string());
            let response = Response::builder()
                .status(StatusCode::GATEWAY_TIMEOUT)
                .header("x-peer", peer.unwrap_or_default())
                .body(Body::empty())
                .unwrap();
            Ok::<_, Infallible>(response)
        });
        let service = TraceLayer.layer(inner);

        let mut request = Request::builder()
            .uri("/api/ipproxy")
            .body(Body::empty())
            .unwrap();
        let peer: SocketAddr = "198.51.100.7:51000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let Ok(response) = service.oneshot(request).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.headers()["x-peer"], "198.51.100.7:51000");
    }
}
