use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::errors::ClientError;
use crate::models::game::{GameView, GamesList};
use crate::models::player::{AuthResponse, Player, Scoreboard, GUEST};

// Local copy of the last authoritative session snapshot. Both gesture-driven
// requests and the polling watcher replace it through `apply`, which keeps the
// freshest snapshot by version rather than by arrival order.
#[derive(Default)]
pub struct SessionMirror {
    current: Option<GameView>,
}

impl SessionMirror {
    pub fn apply(&mut self, next: GameView) -> bool {
        if let Some(current) = &self.current {
            if current.id == next.id && next.version < current.version {
                debug!(
                    "discarding stale snapshot of game {} (version {} < {})",
                    next.id, next.version, current.version
                );
                return false;
            }
        }
        self.current = Some(next);
        true
    }

    pub fn current(&self) -> Option<&GameView> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

pub type SharedMirror = Arc<Mutex<SessionMirror>>;

// REST client for the game backend. Mutating methods take `&mut self`, so a
// single client can never have two mutating requests in flight; every successful
// response body is the new authoritative snapshot and goes through the mirror.
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user: String,
    mirror: SharedMirror,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> SyncClient {
        SyncClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
            user: GUEST.to_string(),
            mirror: Arc::new(Mutex::new(SessionMirror::default())),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn mirror(&self) -> SharedMirror {
        Arc::clone(&self.mirror)
    }

    pub async fn snapshot(&self) -> Option<GameView> {
        self.mirror.lock().await.current().cloned()
    }

    pub async fn login(&mut self, username: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&json!({ "username": username }))
            .send()
            .await?;
        let auth: AuthResponse = decode_response(response).await?;
        self.token = Some(auth.access_token);
        self.user = username.to_string();
        debug!("logged in as {}", self.user);
        Ok(())
    }

    pub async fn create_game(&mut self) -> Result<GameView, ClientError> {
        let request = self.authorized(self.http.post(self.url("/api/games")))?;
        let view = decode_response(request.send().await?).await?;
        Ok(self.apply(view).await)
    }

    pub async fn list_games(&self, page: usize, count: usize) -> Result<GamesList, ClientError> {
        let request = self
            .maybe_authorized(self.http.get(self.url("/api/games")))
            .query(&[("page", page), ("count", count)]);
        decode_response(request.send().await?).await
    }

    pub async fn fetch_game(&self, game_id: u32) -> Result<GameView, ClientError> {
        let request =
            self.maybe_authorized(self.http.get(self.url(&format!("/api/games/{game_id}"))));
        let view = decode_response(request.send().await?).await?;
        Ok(self.apply(view).await)
    }

    pub async fn join_game(&mut self, game_id: u32) -> Result<GameView, ClientError> {
        let request =
            self.authorized(self.http.post(self.url(&format!("/api/games/{game_id}/join"))))?;
        let view = decode_response(request.send().await?).await?;
        Ok(self.apply(view).await)
    }

    pub async fn place_pin(
        &mut self,
        game_id: u32,
        x: usize,
        y: usize,
    ) -> Result<GameView, ClientError> {
        let url = self.url(&format!("/api/games/{game_id}/pin/{x}-{y}"));
        let request = self.authorized(self.http.put(url))?;
        let view = decode_response(request.send().await?).await?;
        Ok(self.apply(view).await)
    }

    pub async fn recover_pin(
        &mut self,
        game_id: u32,
        x: usize,
        y: usize,
    ) -> Result<GameView, ClientError> {
        let url = self.url(&format!("/api/games/{game_id}/pin/{x}-{y}"));
        let request = self.authorized(self.http.delete(url))?;
        let view = decode_response(request.send().await?).await?;
        Ok(self.apply(view).await)
    }

    pub async fn target(
        &mut self,
        game_id: u32,
        x: usize,
        y: usize,
    ) -> Result<GameView, ClientError> {
        let url = self.url(&format!("/api/games/{game_id}/target"));
        let request = self.authorized(self.http.post(url))?.json(&json!({ "x": x, "y": y }));
        let view = decode_response(request.send().await?).await?;
        Ok(self.apply(view).await)
    }

    pub async fn players(&self) -> Result<Vec<Player>, ClientError> {
        decode_response(self.http.get(self.url("/api/players")).send().await?).await
    }

    pub async fn scoreboard(&self) -> Result<Scoreboard, ClientError> {
        decode_response(self.http.get(self.url("/api/scoreboard")).send().await?).await
    }

    // Spawns an interval refresh of one game as a staleness bound for opponent
    // moves and spectating. Fetch failures leave the mirror untouched; the next
    // tick tries again. The watcher dies with its handle.
    pub fn watch(&self, game_id: u32, period: Duration) -> Watcher {
        let http = self.http.clone();
        let url = self.url(&format!("/api/games/{game_id}"));
        let token = self.token.clone();
        let mirror = Arc::clone(&self.mirror);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut request = http.get(&url);
                if let Some(token) = &token {
                    request = request.bearer_auth(token);
                }
                match request.send().await {
                    Ok(response) if response.status().is_success() => {
                        match response.json::<GameView>().await {
                            Ok(view) => {
                                mirror.lock().await.apply(view);
                            }
                            Err(err) => error!("poll: undecodable game payload: {:?}", err),
                        }
                    }
                    Ok(response) => debug!("poll: server answered {}", response.status()),
                    Err(err) => error!("poll: refresh failed: {:?}", err),
                }
            }
        });
        Watcher { handle }
    }

    async fn apply(&self, view: GameView) -> GameView {
        self.mirror.lock().await.apply(view.clone());
        view
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(ClientError::NotLoggedIn),
        }
    }

    fn maybe_authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

// Handle for a running poll loop; dropping it cancels the polling.
pub struct Watcher {
    handle: JoinHandle<()>,
}

impl Watcher {
    pub fn stop(self) {}
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::Game;
    use crate::models::player::Player;

    fn view(id: u32, bumps: usize) -> GameView {
        let mut game = Game::with_budget(
            id,
            Player {
                id: 1,
                name: "alice".to_string(),
                score: 0,
            },
            4,
        );
        for (x, y) in [(0, 0), (0, 1), (2, 0), (2, 1)].iter().take(bumps) {
            game.place_pin("alice", *x, *y).unwrap();
        }
        game.view_for("alice")
    }

    #[test]
    fn mirror_discards_stale_snapshots() {
        let mut mirror = SessionMirror::default();
        assert!(mirror.apply(view(1, 3)));
        // an older in-flight response arrives late
        assert!(!mirror.apply(view(1, 1)));
        assert_eq!(mirror.current().map(|v| v.version), Some(3));
        // equal version is a harmless refresh
        assert!(mirror.apply(view(1, 3)));
        assert!(mirror.apply(view(1, 4)));
        assert_eq!(mirror.current().map(|v| v.version), Some(4));
    }

    #[test]
    fn mirror_switches_sessions_freely() {
        let mut mirror = SessionMirror::default();
        assert!(mirror.apply(view(1, 3)));
        // a different session replaces regardless of version
        assert!(mirror.apply(view(2, 1)));
        assert_eq!(mirror.current().map(|v| v.id), Some(2));
        mirror.clear();
        assert!(mirror.current().is_none());
    }
}
