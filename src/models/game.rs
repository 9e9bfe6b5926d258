use std::collections::HashMap;

use chrono::{DateTime, Local};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::models::board::{Board, Grid, PIN_BUDGET};
use crate::models::player::{Player, GUEST};
use crate::models::ship::Ship;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    Setup,
    Playing,
    Finished,
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        match phase {
            Phase::Setup => 0,
            Phase::Playing => 1,
            Phase::Finished => 2,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Phase, Self::Error> {
        match value {
            0 => Ok(Phase::Setup),
            1 => Ok(Phase::Playing),
            2 => Ok(Phase::Finished),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

// One accepted target action
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub player: String,
    pub hit: bool,
    pub x: usize,
    pub y: usize,
}

// The authoritative session record. Everything the backend knows about one match
// lives here; clients only ever see the per-viewer projection from `view_for`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Game {
    pub id: u32,
    // bumped on every accepted mutation, never on a rejection
    pub version: u64,
    pub phase: Phase,
    pub player_1: Player,
    pub player_2: Option<Player>,
    pub player_to_move: Option<String>,
    pub winner: Option<String>,
    pub history: Vec<Move>,
    pin_budget: u32,
    boards: HashMap<String, Board>,
    pub created_at: DateTime<Local>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Game {
    pub fn new(id: u32, creator: Player) -> Game {
        Game::with_budget(id, creator, PIN_BUDGET)
    }

    pub fn with_budget(id: u32, creator: Player, pin_budget: u32) -> Game {
        let mut boards = HashMap::new();
        boards.insert(creator.name.clone(), Board::with_budget(pin_budget));
        Game {
            id,
            version: 0,
            phase: Phase::Setup,
            player_1: creator,
            player_2: None,
            player_to_move: None,
            winner: None,
            history: Vec::new(),
            pin_budget,
            boards,
            created_at: Local::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_seated(&self, name: &str) -> bool {
        self.player_1.name == name
            || self.player_2.as_ref().map_or(false, |p| p.name == name)
    }

    pub fn opponent_of(&self, name: &str) -> Option<&str> {
        if self.player_1.name == name {
            return self.player_2.as_ref().map(|p| p.name.as_str());
        }
        if self.player_2.as_ref().map_or(false, |p| p.name == name) {
            return Some(self.player_1.name.as_str());
        }
        None
    }

    pub fn board(&self, name: &str) -> Option<&Board> {
        self.boards.get(name)
    }

    pub fn join(&mut self, player: Player) -> Result<(), GameError> {
        if self.phase != Phase::Setup {
            return Err(GameError::WrongPhase);
        }
        if player.name == self.player_1.name {
            return Err(GameError::AlreadyJoined);
        }
        if self.player_2.is_some() {
            return Err(GameError::GameFull);
        }
        self.boards
            .insert(player.name.clone(), Board::with_budget(self.pin_budget));
        self.player_2 = Some(player);
        self.bump();
        Ok(())
    }

    pub fn place_pin(&mut self, who: &str, x: usize, y: usize) -> Result<(), GameError> {
        if self.phase != Phase::Setup {
            return Err(GameError::WrongPhase);
        }
        let board = self.boards.get_mut(who).ok_or(GameError::NotSeated)?;
        board.place_pin(x, y)?;
        self.bump();
        self.maybe_begin_play();
        Ok(())
    }

    pub fn recover_pin(&mut self, who: &str, x: usize, y: usize) -> Result<(), GameError> {
        if self.phase != Phase::Setup {
            return Err(GameError::WrongPhase);
        }
        let board = self.boards.get_mut(who).ok_or(GameError::NotSeated)?;
        board.recover_pin(x, y)?;
        self.bump();
        Ok(())
    }

    // A target action by the player to move, aimed at the opponent's board. Turn
    // ownership toggles on every accepted action and only on accepted actions.
    pub fn target(&mut self, who: &str, x: usize, y: usize) -> Result<bool, GameError> {
        if self.phase != Phase::Playing {
            return Err(GameError::WrongPhase);
        }
        if !self.is_seated(who) {
            return Err(GameError::NotSeated);
        }
        if self.player_to_move.as_deref() != Some(who) {
            return Err(GameError::NotYourTurn);
        }
        let opponent = self
            .opponent_of(who)
            .ok_or(GameError::NotSeated)?
            .to_string();

        self.boards
            .get(who)
            .ok_or(GameError::NotSeated)?
            .can_attack(x, y)?;
        let hit = self
            .boards
            .get_mut(&opponent)
            .ok_or(GameError::NotSeated)?
            .attack(x, y);
        if let Some(board) = self.boards.get_mut(who) {
            board.track(hit, x, y);
        }
        self.history.push(Move {
            player: who.to_string(),
            hit,
            x,
            y,
        });

        let opponent_lost = self.boards.get(&opponent).map_or(false, Board::lost);
        if opponent_lost {
            self.phase = Phase::Finished;
            self.winner = Some(who.to_string());
            self.player_to_move = None;
            self.finished_at = Some(Local::now());
            debug!("game {}: finished, {} wins", self.id, who);
        } else {
            self.player_to_move = Some(opponent);
        }
        self.bump();
        Ok(hit)
    }

    fn maybe_begin_play(&mut self) {
        if self.phase != Phase::Setup || self.player_2.is_none() {
            return;
        }
        if !self.boards.values().all(Board::setup_complete) {
            return;
        }
        // the session creator moves first
        self.phase = Phase::Playing;
        self.player_to_move = Some(self.player_1.name.clone());
        self.started_at = Some(Local::now());
        debug!("game {}: both fleets placed, playing", self.id);
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    // Projects the session for one viewer. A seated player gets their own board
    // verbatim; everyone else gets attack history only. No code path serializes an
    // opponent's unhit ship cells.
    pub fn view_for(&self, viewer: &str) -> GameView {
        let seated_board = if self.is_seated(viewer) {
            self.boards.get(viewer)
        } else {
            None
        };
        let board = match seated_board {
            Some(board) => {
                let opponent = self.opponent_of(viewer).unwrap_or("open");
                BoardProjection {
                    pins_available: board.pins_available,
                    maps: [
                        MapProjection {
                            title: viewer.to_string(),
                            map: board.ships_map,
                        },
                        MapProjection {
                            title: opponent.to_string(),
                            map: board.shots_map,
                        },
                    ],
                    fleet: Some(board.fleet.clone()),
                }
            }
            None => self.spectator_board(),
        };
        GameView {
            id: self.id,
            user: if viewer.is_empty() {
                GUEST.to_string()
            } else {
                viewer.to_string()
            },
            version: self.version,
            status: self.phase,
            board,
            history: self.history.clone(),
            player_1: self.player_1.clone(),
            player_2: self.player_2.clone(),
            player_to_move: self.player_to_move.clone(),
            winner: self.winner.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    // Spectators and guests see the creator's board with unhit pins hidden: the
    // incoming hits on one side, the outgoing shot record on the other.
    fn spectator_board(&self) -> BoardProjection {
        let opponent = self
            .player_2
            .as_ref()
            .map_or("open", |p| p.name.as_str());
        match self.boards.get(&self.player_1.name) {
            Some(board) => BoardProjection {
                pins_available: 0,
                maps: [
                    MapProjection {
                        title: self.player_1.name.clone(),
                        map: board.masked_ships(),
                    },
                    MapProjection {
                        title: opponent.to_string(),
                        map: board.shots_map,
                    },
                ],
                fleet: None,
            },
            None => BoardProjection {
                pins_available: 0,
                maps: [
                    MapProjection::empty(self.player_1.name.clone()),
                    MapProjection::empty(opponent.to_string()),
                ],
                fleet: None,
            },
        }
    }
}

// One grid as a viewer receives it
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MapProjection {
    pub title: String,
    pub map: Grid,
}

impl MapProjection {
    fn empty(title: String) -> MapProjection {
        MapProjection {
            title,
            map: Board::new().ships_map,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BoardProjection {
    pub pins_available: u32,
    pub maps: [MapProjection; 2],
    pub fleet: Option<Vec<Ship>>,
}

// The wire form of a session, always bound to one viewer
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GameView {
    #[serde(rename = "_id")]
    pub id: u32,
    pub user: String,
    pub version: u64,
    pub status: Phase,
    pub board: BoardProjection,
    pub history: Vec<Move>,
    pub player_1: Player,
    pub player_2: Option<Player>,
    pub player_to_move: Option<String>,
    pub winner: Option<String>,
    pub created_at: DateTime<Local>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
}

impl GameView {
    pub fn is_seated(&self, name: &str) -> bool {
        self.player_1.name == name
            || self.player_2.as_ref().map_or(false, |p| p.name == name)
    }

    pub fn my_turn(&self, name: &str) -> bool {
        self.player_to_move.as_deref() == Some(name)
    }

    // The viewer's own fleet layout
    pub fn ships_grid(&self) -> &Grid {
        &self.board.maps[0].map
    }

    // The viewer's record of attacks on the opponent
    pub fn shots_grid(&self) -> &Grid {
        &self.board.maps[1].map
    }
}

// The list payload for the games overview
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GamesList {
    pub user: String,
    pub games: Vec<GameView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::board::CellState;

    fn player(id: u32, name: &str) -> Player {
        Player {
            id,
            name: name.to_string(),
            score: 0,
        }
    }

    // two ships of two cells each
    fn place_small_fleet(game: &mut Game, who: &str) {
        for (x, y) in [(0, 0), (0, 1), (2, 0), (2, 1)] {
            game.place_pin(who, x, y).unwrap();
        }
    }

    fn small_game() -> Game {
        let mut game = Game::with_budget(1, player(1, "alice"), 4);
        game.join(player(2, "bob")).unwrap();
        place_small_fleet(&mut game, "alice");
        place_small_fleet(&mut game, "bob");
        game
    }

    #[test]
    fn creator_waits_in_setup_until_join() {
        let mut game = Game::with_budget(7, player(1, "alice"), 4);
        assert_eq!(game.phase, Phase::Setup);
        assert_eq!(game.place_pin("bob", 0, 0), Err(GameError::NotSeated));
        place_small_fleet(&mut game, "alice");
        // complete board alone does not start the game
        assert_eq!(game.phase, Phase::Setup);
        game.join(player(2, "bob")).unwrap();
        assert_eq!(game.join(player(3, "carol")), Err(GameError::GameFull));
        assert_eq!(game.join(player(1, "alice")), Err(GameError::AlreadyJoined));
    }

    #[test]
    fn playing_starts_when_both_fleets_complete() {
        let game = small_game();
        assert_eq!(game.phase, Phase::Playing);
        assert_eq!(game.player_to_move.as_deref(), Some("alice"));
        assert!(game.started_at.is_some());
    }

    #[test]
    fn placement_is_rejected_outside_setup() {
        let mut game = small_game();
        let version = game.version;
        assert_eq!(game.place_pin("alice", 5, 5), Err(GameError::WrongPhase));
        assert_eq!(game.recover_pin("alice", 0, 0), Err(GameError::WrongPhase));
        assert_eq!(game.version, version);
    }

    #[test]
    fn turn_alternates_on_accepted_targets_only() {
        let mut game = small_game();
        assert_eq!(game.target("bob", 0, 0), Err(GameError::NotYourTurn));
        assert_eq!(game.player_to_move.as_deref(), Some("alice"));

        assert_eq!(game.target("alice", 0, 0), Ok(true));
        assert_eq!(game.player_to_move.as_deref(), Some("bob"));
        assert_eq!(game.history.len(), 1);

        assert_eq!(game.target("bob", 9, 9), Ok(false));
        assert_eq!(game.player_to_move.as_deref(), Some("alice"));
    }

    #[test]
    fn repeated_target_is_a_rejected_noop() {
        let mut game = small_game();
        game.target("alice", 0, 0).unwrap();
        game.target("bob", 9, 9).unwrap();
        let version = game.version;
        let history = game.history.len();
        assert_eq!(
            game.target("alice", 0, 0),
            Err(GameError::AlreadyTried(0, 0))
        );
        assert_eq!(game.version, version);
        assert_eq!(game.history.len(), history);
        assert_eq!(game.player_to_move.as_deref(), Some("alice"));
    }

    #[test]
    fn sinking_the_last_ship_finishes_the_game() {
        let mut game = small_game();
        let bob_cells = [(0, 0), (0, 1), (2, 0), (2, 1)];
        let water = [(9, 0), (9, 1), (9, 2), (9, 3)];
        for (i, &(x, y)) in bob_cells.iter().enumerate() {
            assert_eq!(game.target("alice", x, y), Ok(true));
            if i < bob_cells.len() - 1 {
                let (wx, wy) = water[i];
                assert_eq!(game.target("bob", wx, wy), Ok(false));
            }
        }
        assert_eq!(game.phase, Phase::Finished);
        assert_eq!(game.winner.as_deref(), Some("alice"));
        assert_eq!(game.player_to_move, None);
        assert!(game.finished_at.is_some());
        // terminal: nobody can act any more
        assert_eq!(game.target("bob", 5, 5), Err(GameError::WrongPhase));
        assert_eq!(game.place_pin("bob", 5, 5), Err(GameError::WrongPhase));
    }

    #[test]
    fn phase_only_advances() {
        let mut game = small_game();
        let mut last = Phase::Setup;
        for &(x, y) in &[(0, 0), (0, 1), (2, 0), (2, 1)] {
            assert!(game.phase >= last);
            last = game.phase;
            let shooter = game.player_to_move.clone().unwrap();
            game.target(&shooter, x, y).unwrap();
            if game.phase == Phase::Playing {
                let shooter = game.player_to_move.clone().unwrap();
                game.target(&shooter, 9, x + y).unwrap();
            }
        }
        assert_eq!(game.phase, Phase::Finished);
    }

    #[test]
    fn seated_view_carries_own_board_and_shots_overlay() {
        let mut game = small_game();
        game.target("alice", 0, 0).unwrap();
        game.target("bob", 9, 9).unwrap();

        let view = game.view_for("alice");
        assert_eq!(view.user, "alice");
        assert_eq!(view.ships_grid()[0][0], CellState::Ship);
        assert_eq!(view.shots_grid()[0][0], CellState::Hit);
        assert_eq!(view.board.maps[0].title, "alice");
        assert_eq!(view.board.maps[1].title, "bob");
        assert!(view.board.fleet.is_some());

        // bob's view shows the incoming hit, never alice's layout
        let view = game.view_for("bob");
        assert_eq!(view.ships_grid()[0][0], CellState::Hit);
        assert_eq!(view.shots_grid()[9][9], CellState::Miss);
    }

    #[test]
    fn spectator_view_exposes_attack_history_only() {
        let mut game = small_game();
        game.target("alice", 0, 0).unwrap();
        game.target("bob", 0, 0).unwrap();

        for viewer in ["carol", "guest", ""] {
            let view = game.view_for(viewer);
            assert!(view.board.fleet.is_none());
            assert_eq!(view.board.pins_available, 0);
            let ships = view.ships_grid();
            // bob hit alice at (0, 0); her other three pins stay hidden
            assert_eq!(ships[0][0], CellState::Hit);
            assert_eq!(ships[0][1], CellState::Empty);
            assert_eq!(ships[2][0], CellState::Empty);
            assert_eq!(view.shots_grid()[0][0], CellState::Hit);
        }
        assert_eq!(game.view_for("").user, GUEST);
    }
}
