use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::entity::EntityView;
use crate::error::ApiResult;
use crate::server::appstate::AppState;

#[derive(Serialize)]
struct RefreshReply {
    coordinators: usize,
}

async fn get_entities(State(state): State<AppState>) -> Json<Vec<EntityView>> {
    Json(state.integration().entities().views())
}

async fn get_entity(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<EntityView>> {
    Ok(Json(state.integration().entities().view(&uid)?))
}

async fn post_turn_on(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<EntityView>> {
    let switch = state.integration().entities().switch(&uid)?;
    switch.turn_on().await?;
    Ok(Json(state.integration().entities().view(&uid)?))
}

async fn post_turn_off(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<EntityView>> {
    let switch = state.integration().entities().switch(&uid)?;
    switch.turn_off().await?;
    Ok(Json(state.integration().entities().view(&uid)?))
}

async fn post_refresh(State(state): State<AppState>) -> Json<impl Serialize> {
    let integ = state.integration();
    integ.refresh_all().await;
    Json(RefreshReply {
        coordinators: integ.coordinators().len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/entities", get(get_entities))
        .route("/entities/{uid}", get(get_entity))
        .route("/entities/{uid}/turn_on", post(post_turn_on))
        .route("/entities/{uid}/turn_off", post(post_turn_off))
        .route("/refresh", post(post_refresh))
}
