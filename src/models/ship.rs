use serde::{Deserialize, Serialize};

// Longest ship in the fleet
pub const MAX_SHIP_LEN: usize = 5;
// A board holds at most this many ships
pub const MAX_FLEET: usize = 10;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipKind {
    Battleship,
    Cruiser,
    Destroyer,
    Submarine,
    Unknown,
}

impl ShipKind {
    pub fn from_length(len: usize) -> Option<ShipKind> {
        match len {
            5 => Some(ShipKind::Battleship),
            4 => Some(ShipKind::Cruiser),
            3 => Some(ShipKind::Destroyer),
            2 => Some(ShipKind::Submarine),
            1 => Some(ShipKind::Unknown),
            _ => None,
        }
    }

    // How many ships of this kind a fleet may carry
    pub fn allowed(self) -> usize {
        match self {
            ShipKind::Battleship => 1,
            ShipKind::Cruiser => 2,
            ShipKind::Destroyer => 3,
            ShipKind::Submarine => 4,
            ShipKind::Unknown => 0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
    Unknown,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipCell {
    pub x: usize,
    pub y: usize,
    pub hit: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Ship {
    #[serde(rename = "ship_type")]
    pub kind: ShipKind,
    pub fields: Vec<ShipCell>,
    pub orientation: Orientation,
}

impl Ship {
    // A freshly placed pin with no neighbours yet. Its kind stays Unknown until
    // further pins merge into it.
    pub fn single(x: usize, y: usize) -> Ship {
        Ship {
            kind: ShipKind::Unknown,
            fields: vec![ShipCell { x, y, hit: false }],
            orientation: Orientation::Unknown,
        }
    }

    // Builds a ship from a set of cells. Fails when the cells do not form a
    // straight, gap-free line of a buildable length.
    pub fn from_cells(mut cells: Vec<ShipCell>) -> Option<Ship> {
        if cells.is_empty() || cells.len() > MAX_SHIP_LEN {
            return None;
        }
        cells.sort_by_key(|c| (c.x, c.y));
        let orientation = orientation_of(&cells)?;
        let kind = ShipKind::from_length(cells.len())?;
        Some(Ship {
            kind,
            fields: cells,
            orientation,
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn occupies(&self, x: usize, y: usize) -> bool {
        self.fields.iter().any(|c| c.x == x && c.y == y)
    }

    // Orthogonal adjacency to any cell of the ship
    pub fn touches(&self, x: usize, y: usize) -> bool {
        self.fields.iter().any(|c| {
            (c.x == x && (c.y + 1 == y || c.y == y + 1))
                || (c.y == y && (c.x + 1 == x || c.x == x + 1))
        })
    }

    // Marks the cell as hit and reports whether the whole ship is now sunk
    pub fn hit(&mut self, x: usize, y: usize) -> bool {
        for cell in &mut self.fields {
            if cell.x == x && cell.y == y {
                cell.hit = true;
            }
        }
        self.is_sunk()
    }

    pub fn is_sunk(&self) -> bool {
        self.fields.iter().all(|c| c.hit)
    }

    // Drops one cell and reassembles the remainder into contiguous ships. Removing
    // a middle cell splits the ship in two; removing the last cell dissolves it.
    pub fn without_cell(&self, x: usize, y: usize) -> Vec<Ship> {
        let rest: Vec<ShipCell> = self
            .fields
            .iter()
            .copied()
            .filter(|c| !(c.x == x && c.y == y))
            .collect();
        split_runs(rest)
    }
}

pub fn fleet_within_caps(fleet: &[Ship]) -> bool {
    if fleet.len() > MAX_FLEET {
        return false;
    }
    let kinds = [
        ShipKind::Battleship,
        ShipKind::Cruiser,
        ShipKind::Destroyer,
        ShipKind::Submarine,
    ];
    kinds
        .iter()
        .all(|&kind| fleet.iter().filter(|s| s.kind == kind).count() <= kind.allowed())
}

fn orientation_of(cells: &[ShipCell]) -> Option<Orientation> {
    if cells.len() == 1 {
        return Some(Orientation::Unknown);
    }
    let first = cells[0];
    if cells.iter().all(|c| c.x == first.x) {
        let contiguous = cells.windows(2).all(|w| w[1].y == w[0].y + 1);
        return contiguous.then_some(Orientation::Horizontal);
    }
    if cells.iter().all(|c| c.y == first.y) {
        let contiguous = cells.windows(2).all(|w| w[1].x == w[0].x + 1);
        return contiguous.then_some(Orientation::Vertical);
    }
    None
}

// Cells arrive sorted along the ship axis, so runs of consecutive cells are the
// connected components.
fn split_runs(cells: Vec<ShipCell>) -> Vec<Ship> {
    let mut runs: Vec<Vec<ShipCell>> = Vec::new();
    for cell in cells {
        match runs.last_mut() {
            Some(run) if run.last().map_or(false, |prev| consecutive(prev, &cell)) => {
                run.push(cell);
            }
            _ => runs.push(vec![cell]),
        }
    }
    runs.into_iter().filter_map(Ship::from_cells).collect()
}

fn consecutive(a: &ShipCell, b: &ShipCell) -> bool {
    (a.x == b.x && a.y + 1 == b.y) || (a.y == b.y && a.x + 1 == b.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: usize, y: usize) -> ShipCell {
        ShipCell { x, y, hit: false }
    }

    #[test]
    fn from_cells_derives_kind_and_orientation() {
        let ship = Ship::from_cells(vec![cell(3, 2), cell(3, 1), cell(3, 3)]).unwrap();
        assert_eq!(ship.kind, ShipKind::Destroyer);
        assert_eq!(ship.orientation, Orientation::Horizontal);
        assert_eq!(ship.fields[0], cell(3, 1));

        let ship = Ship::from_cells(vec![cell(5, 0), cell(4, 0)]).unwrap();
        assert_eq!(ship.kind, ShipKind::Submarine);
        assert_eq!(ship.orientation, Orientation::Vertical);
    }

    #[test]
    fn from_cells_rejects_bent_gapped_and_oversized() {
        assert!(Ship::from_cells(vec![cell(0, 0), cell(1, 1)]).is_none());
        assert!(Ship::from_cells(vec![cell(0, 0), cell(0, 2)]).is_none());
        let too_long: Vec<ShipCell> = (0..6).map(|y| cell(0, y)).collect();
        assert!(Ship::from_cells(too_long).is_none());
    }

    #[test]
    fn lone_pin_is_unknown() {
        let ship = Ship::from_cells(vec![cell(7, 7)]).unwrap();
        assert_eq!(ship.kind, ShipKind::Unknown);
        assert_eq!(ship.orientation, Orientation::Unknown);
    }

    #[test]
    fn hit_marks_cell_and_reports_sunk() {
        let mut ship = Ship::from_cells(vec![cell(1, 1), cell(1, 2)]).unwrap();
        assert!(!ship.hit(1, 1));
        assert!(!ship.is_sunk());
        assert!(ship.hit(1, 2));
        assert!(ship.is_sunk());
    }

    #[test]
    fn removing_middle_cell_splits_ship() {
        let ship = Ship::from_cells(vec![cell(2, 0), cell(2, 1), cell(2, 2), cell(2, 3)]).unwrap();
        let parts = ship.without_cell(2, 1);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 1);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[1].kind, ShipKind::Submarine);
    }

    #[test]
    fn removing_last_cell_dissolves_ship() {
        let ship = Ship::single(4, 4);
        assert!(ship.without_cell(4, 4).is_empty());
    }

    #[test]
    fn caps_limit_fleet_composition() {
        let subs: Vec<Ship> = (0..5)
            .map(|i| Ship::from_cells(vec![cell(i * 2, 0), cell(i * 2, 1)]).unwrap())
            .collect();
        assert!(fleet_within_caps(&subs[..4]));
        assert!(!fleet_within_caps(&subs));
    }
}
