use axum::{Router, extract::State, routing::get};

use crate::{
    AppState,
    proxy::{IncomingRequest, Reply},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ipproxy", get(lookup))
}

async fn lookup(State(state): State<AppState>, request: IncomingRequest) -> Reply {
    state.handler.handle(&request).await
}
