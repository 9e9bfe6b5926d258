use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::info;
use tokio::sync::RwLock;

use crate::errors::ApiError;
use crate::models::game::Game;
use crate::models::player::Player;

pub type SharedStore = Arc<Store>;

// In-memory session and player registry. The write lock on the games table is the
// per-session serialization point: two simultaneous target actions for the same
// session are applied one after the other, and the loser of the race is rejected
// by the turn check.
pub struct Store {
    players: RwLock<HashMap<String, Player>>,
    games: RwLock<BTreeMap<u32, Game>>,
    next_player_id: AtomicU32,
    next_game_id: AtomicU32,
}

impl Store {
    pub fn new() -> Store {
        Store {
            players: RwLock::new(HashMap::new()),
            games: RwLock::new(BTreeMap::new()),
            next_player_id: AtomicU32::new(1),
            next_game_id: AtomicU32::new(1),
        }
    }

    pub async fn find_or_create_player(&self, name: &str) -> Player {
        let mut players = self.players.write().await;
        players
            .entry(name.to_string())
            .or_insert_with(|| {
                let id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
                info!("new player {} ({})", name, id);
                Player {
                    id,
                    name: name.to_string(),
                    score: 0,
                }
            })
            .clone()
    }

    pub async fn get_player(&self, name: &str) -> Option<Player> {
        self.players.read().await.get(name).cloned()
    }

    pub async fn create_game(&self, creator: Player) -> Game {
        let id = self.next_game_id.fetch_add(1, Ordering::Relaxed);
        let game = Game::new(id, creator);
        self.games.write().await.insert(id, game.clone());
        game
    }

    pub async fn read_game<T>(
        &self,
        id: u32,
        f: impl FnOnce(&Game) -> T,
    ) -> Result<T, ApiError> {
        let games = self.games.read().await;
        let game = games.get(&id).ok_or(ApiError::GameNotFound)?;
        Ok(f(game))
    }

    pub async fn mutate_game<T>(
        &self,
        id: u32,
        f: impl FnOnce(&mut Game) -> T,
    ) -> Result<T, ApiError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(&id).ok_or(ApiError::GameNotFound)?;
        Ok(f(game))
    }

    pub async fn list_games<T>(
        &self,
        page: usize,
        count: usize,
        f: impl Fn(&Game) -> T,
    ) -> Vec<T> {
        self.games
            .read()
            .await
            .values()
            .skip(page.saturating_mul(count))
            .take(count)
            .map(f)
            .collect()
    }

    pub async fn record_win(&self, name: &str) {
        if let Some(player) = self.players.write().await.get_mut(name) {
            player.score += 1;
            info!("player {} now has {} wins", name, player.score);
        }
    }

    pub async fn players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.read().await.values().cloned().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    // Ranked by score, stable by name for equal scores
    pub async fn scoreboard(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.read().await.values().cloned().collect();
        players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        players
    }
}

impl Default for Store {
    fn default() -> Store {
        Store::new()
    }
}
