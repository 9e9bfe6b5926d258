use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use log::info;

use crate::errors::ApiError;
use crate::models::player::Scoreboard;
use crate::store::SharedStore;

//handler for listing the known players. this request can be done without any auth
pub async fn players(
    Extension(store): Extension<SharedStore>,
) -> Result<impl IntoResponse, ApiError> {
    info!("players request");
    Ok((StatusCode::OK, Json(store.players().await)))
}

//handler for the ranked scoreboard, best player first
pub async fn scoreboard(
    Extension(store): Extension<SharedStore>,
) -> Result<impl IntoResponse, ApiError> {
    info!("scoreboard request");
    let scores = store.scoreboard().await;
    Ok((StatusCode::OK, Json(Scoreboard { scores })))
}
