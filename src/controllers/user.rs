use axum::{
    extract::{State, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use log::{debug, error, info};

use crate::errors::ApiError;
use crate::models::player::{is_guest, AuthResponse, LoginRequest};
use crate::store::SharedStore;
use crate::AppState;
use crate::Claims;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//handler for logging in. The player record is created on first login. We generate and return the JWT
//Bearer token which has the expiration encoded within
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn login(
    State(state): State<AppState>,
    Extension(store): Extension<SharedStore>,
    Json(login): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("login request by user: {}", login.username);

    // The guest identity stays reserved for unauthenticated viewers
    let username = login.username.trim();
    if is_guest(username) {
        return Err(ApiError::BadRequest);
    }

    let player = store.find_or_create_player(username).await;

    // Define the registered <Expiration Time> claim (exp) which is the current timestamp plus the defined offset
    let my_exp = Utc::now()
        .checked_add_signed(Duration::seconds(state.token_duration))
        .ok_or(ApiError::InternalServerError)?
        .timestamp();

    let my_claims = Claims {
        sub: player.name.clone(),                   // username
        iat: Utc::now().timestamp() as usize,       // valid from
        exp: my_exp as usize,                       // valid until
    };

    // generate the Bearer token
    match encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    ) {
        Ok(token) => {
            debug!("Generated token for {}", player.name);
            Ok((
                StatusCode::OK,
                Json(AuthResponse {
                    access_token: token,
                    token_type: "bearer".to_string(),
                    expires_in: state.token_duration,
                }),
            ))
        }
        Err(err) => {
            error!("Unexpected error while encoding the bearer token ({:?})", err);
            Err(ApiError::InternalServerError)
        }
    }
}

// Resolves an optional bearer header to a viewer identity. Requests without a
// valid token degrade to the guest identity instead of failing; read endpoints
// use this so spectators can watch.
pub fn viewer_identity(
    state: &AppState,
    bearer: &Option<TypedHeader<Authorization<Bearer>>>,
) -> String {
    match bearer {
        Some(TypedHeader(bearer)) => crate::check_access(state, bearer)
            .unwrap_or_else(|_| crate::models::player::GUEST.to_string()),
        None => crate::models::player::GUEST.to_string(),
    }
}
