#[macro_use]
extern crate tracing;

use std::{net::SocketAddr, sync::Arc};

use axum::{Router, http::Method};

use axum_extra::middleware::option_layer;
use dotenvy::dotenv;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

mod api;
mod config;
mod error;
mod middleware;
mod proxy;
mod trace;
mod util;

pub use config::CONFIG;
pub use error::Error;

use proxy::{IpApi, LookupHandler, Options};

#[tokio::main]
async fn main() {
    launch_info();
    dotenv().ok();
    trace::init(&CONFIG.log);

    let provider = match IpApi::new(&CONFIG.provider) {
        Ok(provider) => provider,
        Err(err) => panic!("failed to build http client: {}", err),
    };
    if CONFIG.test_client_ip {
        warn!(
            "test_client_ip is enabled, every lookup uses {}",
            config::TEST_CLIENT_IP
        );
    }
    let state = AppState {
        handler: Arc::new(LookupHandler::new(provider, Options::from_config(&CONFIG))),
    };
    let app = app(state, CONFIG.cors);

    let listener = TcpListener::bind(CONFIG.addr).await.unwrap();
    let local_addr = listener.local_addr().unwrap();
    info!("listening on http://{}", local_addr);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        error!("server error: {}", err);
    }
    info!("server stopped");
}

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<LookupHandler>,
}

pub fn app(state: AppState, cors: bool) -> Router {
    let cors = if cors {
        Some(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET])
                .allow_origin(Any),
        )
    } else {
        None
    };
    let cors = option_layer(cors);
    let layer = ServiceBuilder::new()
        .layer(middleware::TraceLayer)
        .layer(cors);
    Router::new()
        .nest("/api", api::routes())
        .layer(layer)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

fn launch_info() {
    println!();
    println!(
        "=================== Starting IpProxy {} ===================",
        env!("CARGO_PKG_VERSION")
    );
    println!();
}
