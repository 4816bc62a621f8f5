pub mod appstate;
pub mod http;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::server::appstate::AppState;

pub fn build_router(appstate: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .with_state(appstate)
        .layer(TraceLayer::new_for_http())
}
