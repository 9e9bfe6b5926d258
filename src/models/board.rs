use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::models::ship::{fleet_within_caps, Ship, ShipCell, ShipKind, MAX_FLEET};

pub const SIZE: usize = 10;
// Pin budget for a full fleet: 1x5 + 2x4 + 3x3 + 4x2
pub const PIN_BUDGET: u32 = 30;

pub type Grid = [[CellState; SIZE]; SIZE];

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    #[serde(rename = " ")]
    Empty,
    #[serde(rename = "O")]
    Ship,
    #[serde(rename = "X")]
    Hit,
    #[serde(rename = "-")]
    Miss,
}

pub fn in_bounds(x: usize, y: usize) -> bool {
    x < SIZE && y < SIZE
}

// One player's side of a session: their own fleet layout and the record of the
// shots they fired at the opponent. The opponent's layout is never stored here.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Board {
    pub pins_available: u32,
    pub ships_map: Grid,
    pub shots_map: Grid,
    pub fleet: Vec<Ship>,
}

impl Board {
    pub fn new() -> Board {
        Board::with_budget(PIN_BUDGET)
    }

    pub fn with_budget(budget: u32) -> Board {
        Board {
            pins_available: budget,
            ships_map: [[CellState::Empty; SIZE]; SIZE],
            shots_map: [[CellState::Empty; SIZE]; SIZE],
            fleet: Vec::new(),
        }
    }

    pub fn ship_at(&self, x: usize, y: usize) -> Option<CellState> {
        in_bounds(x, y).then(|| self.ships_map[x][y])
    }

    pub fn shot_at(&self, x: usize, y: usize) -> Option<CellState> {
        in_bounds(x, y).then(|| self.shots_map[x][y])
    }

    // Works out the fleet as it would look with a pin added: orthogonally adjacent
    // pins merge into one ship, the merge must stay a straight gap-free line, and
    // diagonal contact with another ship is illegal. No side effects.
    fn placement_outcome(&self, x: usize, y: usize) -> Result<Vec<Ship>, GameError> {
        if self.pins_available == 0 {
            return Err(GameError::OutOfPins);
        }
        if !in_bounds(x, y) {
            return Err(GameError::OffBoard(x, y));
        }
        if self.ships_map[x][y] != CellState::Empty {
            return Err(GameError::Occupied(x, y));
        }
        if self.diagonal_occupied(x, y) {
            return Err(GameError::IllegalPlacement(x, y));
        }

        let (neighbours, rest): (Vec<Ship>, Vec<Ship>) =
            self.fleet.iter().cloned().partition(|s| s.touches(x, y));
        let placed = if neighbours.is_empty() {
            if rest.len() >= MAX_FLEET {
                return Err(GameError::IllegalPlacement(x, y));
            }
            Ship::single(x, y)
        } else {
            let mut cells: Vec<ShipCell> = neighbours
                .iter()
                .flat_map(|s| s.fields.iter().copied())
                .collect();
            cells.push(ShipCell { x, y, hit: false });
            Ship::from_cells(cells).ok_or(GameError::IllegalPlacement(x, y))?
        };

        let mut fleet = rest;
        fleet.push(placed);
        if !fleet_within_caps(&fleet) {
            return Err(GameError::IllegalPlacement(x, y));
        }
        Ok(fleet)
    }

    // Validation predicate for a candidate pin
    pub fn can_place_pin(&self, x: usize, y: usize) -> bool {
        self.placement_outcome(x, y).is_ok()
    }

    // Places a pin. Nothing is mutated unless every check passes.
    pub fn place_pin(&mut self, x: usize, y: usize) -> Result<(), GameError> {
        self.fleet = self.placement_outcome(x, y)?;
        self.pins_available -= 1;
        self.ships_map[x][y] = CellState::Ship;
        Ok(())
    }

    // Takes a pin back, returning its budget. The ship it belonged to shrinks,
    // splits, or disappears.
    pub fn recover_pin(&mut self, x: usize, y: usize) -> Result<(), GameError> {
        if !in_bounds(x, y) {
            return Err(GameError::OffBoard(x, y));
        }
        if self.ships_map[x][y] != CellState::Ship {
            return Err(GameError::NoPin(x, y));
        }
        let idx = self
            .fleet
            .iter()
            .position(|s| s.occupies(x, y))
            .ok_or(GameError::NoPin(x, y))?;
        let ship = self.fleet.swap_remove(idx);
        self.fleet.extend(ship.without_cell(x, y));
        self.ships_map[x][y] = CellState::Empty;
        self.pins_available += 1;
        Ok(())
    }

    // Gate for a target action, checked against the attacker's own shots record
    pub fn can_attack(&self, x: usize, y: usize) -> Result<(), GameError> {
        if !in_bounds(x, y) {
            return Err(GameError::OffBoard(x, y));
        }
        if self.shots_map[x][y] != CellState::Empty {
            return Err(GameError::AlreadyTried(x, y));
        }
        Ok(())
    }

    // Applies an incoming shot to this board's fleet. A fully hit ship leaves the
    // fleet; the board is lost once the fleet is gone.
    pub fn attack(&mut self, x: usize, y: usize) -> bool {
        if self.ships_map[x][y] != CellState::Ship {
            return false;
        }
        self.ships_map[x][y] = CellState::Hit;
        if let Some(idx) = self.fleet.iter().position(|s| s.occupies(x, y)) {
            if self.fleet[idx].hit(x, y) {
                self.fleet.remove(idx);
            }
        }
        true
    }

    // Records the outcome of an own shot
    pub fn track(&mut self, hit: bool, x: usize, y: usize) {
        self.shots_map[x][y] = if hit { CellState::Hit } else { CellState::Miss };
    }

    pub fn setup_complete(&self) -> bool {
        self.pins_available == 0
            && self.fleet.iter().all(|s| s.kind != ShipKind::Unknown)
            && fleet_within_caps(&self.fleet)
    }

    pub fn lost(&self) -> bool {
        self.fleet.is_empty()
    }

    // Ships grid with unhit pins hidden, for viewers who may only see attack history
    pub fn masked_ships(&self) -> Grid {
        let mut grid = self.ships_map;
        for row in grid.iter_mut() {
            for cell in row.iter_mut() {
                if *cell == CellState::Ship {
                    *cell = CellState::Empty;
                }
            }
        }
        grid
    }

    fn diagonal_occupied(&self, x: usize, y: usize) -> bool {
        let corners = [
            (x.wrapping_sub(1), y.wrapping_sub(1)),
            (x.wrapping_sub(1), y + 1),
            (x + 1, y.wrapping_sub(1)),
            (x + 1, y + 1),
        ];
        corners
            .iter()
            .any(|&(i, j)| in_bounds(i, j) && self.ships_map[i][j] == CellState::Ship)
    }
}

impl Default for Board {
    fn default() -> Board {
        Board::new()
    }
}
