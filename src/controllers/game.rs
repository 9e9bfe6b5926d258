use axum::{
    extract::{Path, Query, State, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::controllers::user::viewer_identity;
use crate::errors::{ApiError, GameError};
use crate::models::game::{GameView, GamesList, Phase};
use crate::store::SharedStore;
use crate::AppState;
use crate::check_access;

pub const DEFAULT_GAMES_PER_PAGE: usize = 10;

// The struct used for receiving a target action as json
#[derive(Deserialize, Serialize, Debug)]
pub struct TargetRequest {
    pub x: usize,
    pub y: usize,
}

#[derive(Deserialize, Debug)]
pub struct Pagination {
    pub page: Option<usize>,
    pub count: Option<usize>,
}

//handler for creating a new game. The creator takes the first seat and places first.
pub async fn new_game(
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, ApiError> {
    info!("new game request");

    //check if user is logged in, bail out if not
    let user_name = check_access(&state, &bearer)?;
    let player = store
        .get_player(&user_name)
        .await
        .ok_or(ApiError::PlayerNotFound)?;

    let game = store.create_game(player).await;
    info!("game {} created by {}", game.id, user_name);
    Ok((StatusCode::CREATED, Json(game.view_for(&user_name))))
}

//handler for the games overview. Works without a token; every entry is projected
//for the requesting viewer
pub async fn list_games(
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let user_name = viewer_identity(&state, &bearer);
    let page = pagination.page.unwrap_or(0);
    let count = pagination.count.unwrap_or(DEFAULT_GAMES_PER_PAGE);

    let games: Vec<GameView> = store.list_games(page, count, |g| g.view_for(&user_name)).await;
    Ok((StatusCode::OK, Json(GamesList { user: user_name, games })))
}

//handler for fetching one game. Unauthenticated requests get the guest projection.
pub async fn get_game(
    Path(game_id): Path<u32>,
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<impl IntoResponse, ApiError> {
    let user_name = viewer_identity(&state, &bearer);
    let view = store.read_game(game_id, |g| g.view_for(&user_name)).await?;
    Ok((StatusCode::OK, Json(view)))
}

/////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//handler for joining an existing game.
pub async fn join_game(
    Path(game_id): Path<u32>,
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, ApiError> {
    info!("join game request");

    let user_name = check_access(&state, &bearer)?;
    let player = store
        .get_player(&user_name)
        .await
        .ok_or(ApiError::PlayerNotFound)?;

    let view = store
        .mutate_game(game_id, |g| {
            g.join(player)?;
            Ok::<GameView, GameError>(g.view_for(&user_name))
        })
        .await??;

    info!("{} joined game {}", user_name, game_id);
    Ok((StatusCode::OK, Json(view)))
}

//handler for placing a pin during setup. The pin path segment is "row-column".
pub async fn place_pin(
    Path((game_id, pin)): Path<(u32, String)>,
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, ApiError> {
    let user_name = check_access(&state, &bearer)?;
    let (x, y) = parse_pin(&pin)?;

    let view = store
        .mutate_game(game_id, |g| {
            g.place_pin(&user_name, x, y)?;
            Ok::<GameView, GameError>(g.view_for(&user_name))
        })
        .await??;

    Ok((StatusCode::CREATED, Json(view)))
}

//handler for taking a pin back during setup
pub async fn recover_pin(
    Path((game_id, pin)): Path<(u32, String)>,
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<impl IntoResponse, ApiError> {
    let user_name = check_access(&state, &bearer)?;
    let (x, y) = parse_pin(&pin)?;

    let view = store
        .mutate_game(game_id, |g| {
            g.recover_pin(&user_name, x, y)?;
            Ok::<GameView, GameError>(g.view_for(&user_name))
        })
        .await??;

    Ok((StatusCode::CREATED, Json(view)))
}

/////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//handler for a target action. Validation happens in the session rules; a rejected
//action mutates nothing and keeps the turn where it was.
pub async fn target(
    Path(game_id): Path<u32>,
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<TargetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_name = check_access(&state, &bearer)?;

    let (view, winner) = store
        .mutate_game(game_id, |g| {
            let hit = g.target(&user_name, request.x, request.y)?;
            info!(
                "game {}: {} fired at ({}, {}) and {}",
                game_id,
                user_name,
                request.x,
                request.y,
                if hit { "hit" } else { "missed" }
            );
            let winner = (g.phase == Phase::Finished).then(|| g.winner.clone()).flatten();
            Ok::<(GameView, Option<String>), GameError>((g.view_for(&user_name), winner))
        })
        .await??;

    // the mutation above fires at most once per game, so the score settles exactly once
    if let Some(winner) = winner {
        store.record_win(&winner).await;
    }

    Ok((StatusCode::OK, Json(view)))
}

fn parse_pin(pin: &str) -> Result<(usize, usize), ApiError> {
    let (x, y) = pin.split_once('-').ok_or(ApiError::BadRequest)?;
    let x = x.trim().parse().map_err(|_| ApiError::BadRequest)?;
    let y = y.trim().parse().map_err(|_| ApiError::BadRequest)?;
    Ok((x, y))
}
