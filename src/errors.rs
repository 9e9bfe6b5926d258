use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

// Rejections produced by the session rules. These surface both through the REST
// layer (mapped to a status code below) and directly when the library is embedded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("position ({0}, {1}) is off the board")]
    OffBoard(usize, usize),
    #[error("cell ({0}, {1}) is already occupied")]
    Occupied(usize, usize),
    #[error("no pins left to place")]
    OutOfPins,
    #[error("you are not allowed to place a pin at ({0}, {1})")]
    IllegalPlacement(usize, usize),
    #[error("there is no pin at ({0}, {1})")]
    NoPin(usize, usize),
    #[error("already fired at ({0}, {1})")]
    AlreadyTried(usize, usize),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("not allowed in this phase of the game")]
    WrongPhase,
    #[error("the game already has two players")]
    GameFull,
    #[error("you already joined this game")]
    AlreadyJoined,
    #[error("you are not a player in this game")]
    NotSeated,
}

// Custom errors used in handlers
#[derive(Debug)]
pub enum ApiError {
    BadRequest,
    InvalidToken,
    PlayerNotFound,
    GameNotFound,
    Rejected(GameError),
    InternalServerError,
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        ApiError::Rejected(err)
    }
}

//implementation of custom errors that are used in handlers
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Self::BadRequest => (StatusCode::BAD_REQUEST, "Bad Request".to_string()),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Token is not valid".to_string()),
            Self::PlayerNotFound => (StatusCode::NOT_FOUND, "Player not found".to_string()),
            Self::GameNotFound => (StatusCode::NOT_FOUND, "Game not found".to_string()),
            Self::Rejected(err) => (rejection_status(&err), err.to_string()),
            Self::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };
        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

fn rejection_status(err: &GameError) -> StatusCode {
    match err {
        GameError::AlreadyTried(..) => StatusCode::CONFLICT,
        GameError::NotYourTurn | GameError::NotSeated => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    }
}

// Client-side failure taxonomy: transport problems leave local state untouched and
// are never retried automatically; rejections carry the server's error message.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("not logged in")]
    NotLoggedIn,
}
