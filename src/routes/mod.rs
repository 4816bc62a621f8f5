pub mod entities;
pub mod eventstream;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use crate::error::ApiError;
use crate::server::appstate::AppState;

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::EntityNotFound(_) => StatusCode::NOT_FOUND,
            Self::NotASwitch(_) => StatusCode::BAD_REQUEST,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::HeroLabsError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::debug!("Request rejected: {self}");
        }

        let res = json!({"error": self.to_string()});

        (status, Json(res)).into_response()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(entities::router())
        .merge(eventstream::router())
}
