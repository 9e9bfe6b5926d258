use serde::{Deserialize, Serialize};

// Identity a viewer falls back to when no login session is present. Guests can
// watch any game but never act.
pub const GUEST: &str = "guest";

pub fn is_guest(name: &str) -> bool {
    name.is_empty() || name == GUEST
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub score: u32,
}

// The struct used for returning the ranked score list as json
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Scoreboard {
    pub scores: Vec<Player>,
}

// The struct used for receiving the login name as json
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub username: String,
}

// The struct used for returning the Bearer token after login
#[derive(Deserialize, Serialize, Debug)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
