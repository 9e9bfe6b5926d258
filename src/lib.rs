use axum::{
    headers::{authorization::Bearer, Authorization},
    routing::{get, post, put},
    Extension, Router,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::error;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod controllers;
pub mod errors;
pub mod models;
pub mod policy;
pub mod store;

pub use client::{SessionMirror, SharedMirror, SyncClient, Watcher};
pub use errors::{ApiError, ClientError, GameError};
pub use models::board::{Board, CellState, Grid, PIN_BUDGET, SIZE};
pub use models::game::{Game, GameView, GamesList, Move, Phase};
pub use models::player::{Player, Scoreboard, GUEST};
pub use models::ship::{Orientation, Ship, ShipKind};
pub use policy::{board_access, decide_click, BoardAccess, CellAction, ClickCommand};
pub use store::{SharedStore, Store};

// The claims struct used for creating a Bearer token
#[derive(Deserialize, Serialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

// Shared immutable state
#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub token_duration: i64,
}

// Builds the full REST surface. The binary serves this on a socket; the
// integration tests bind it to an ephemeral port and run the sync client
// against it.
pub fn router(state: AppState, store: SharedStore) -> Router {
    Router::new()
        .route("/api/login", post(controllers::user::login))
        .route(
            "/api/games",
            post(controllers::game::new_game).get(controllers::game::list_games),
        )
        .route("/api/games/:game_id", get(controllers::game::get_game))
        .route("/api/games/:game_id/join", post(controllers::game::join_game))
        .route(
            "/api/games/:game_id/pin/:pin",
            put(controllers::game::place_pin).delete(controllers::game::recover_pin),
        )
        .route("/api/games/:game_id/target", post(controllers::game::target))
        .route("/api/players", get(controllers::score::players))
        .route("/api/scoreboard", get(controllers::score::scoreboard))
        .with_state(state)
        .layer(Extension(store))
}

// Helper function to check if a bearer token is valid (user is logged in).
// The JWT secret is retrieved from the state shared across all handlers.
pub fn check_access(
    state: &AppState,
    bearer: &Authorization<Bearer>,
) -> Result<String, ApiError> {
    // Decode the Bearer token from the header. When succesfull return the decoded user_name (sub field)
    match decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(token_data) => Ok(token_data.claims.sub),
        Err(err) => {
            error!("Invalid token: {:?}", err.kind());
            Err(ApiError::InvalidToken)
        }
    }
}
