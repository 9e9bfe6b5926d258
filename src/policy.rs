use crate::models::board::CellState;
use crate::models::game::{GameView, Phase};
use crate::models::player::is_guest;

// What a click on an enabled board dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAction {
    None,
    TogglePlacement,
    SubmitTarget,
}

// Per-board decision for one viewer: whether ship positions may be rendered,
// whether clicks are accepted, and what an accepted click means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardAccess {
    pub visible: bool,
    pub disabled: bool,
    pub action: CellAction,
}

impl BoardAccess {
    fn read_only(visible: bool) -> BoardAccess {
        BoardAccess {
            visible,
            disabled: true,
            action: CellAction::None,
        }
    }

    fn enabled(visible: bool, action: CellAction) -> BoardAccess {
        BoardAccess {
            visible,
            disabled: false,
            action,
        }
    }
}

// The concrete backend call a click should issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickCommand {
    PlacePin { x: usize, y: usize },
    RecoverPin { x: usize, y: usize },
    Target { x: usize, y: usize },
}

// Decides what the viewer may do with the board owned by `board_owner`. Identity
// is an explicit argument; there is no ambient logged-in-user state.
pub fn board_access(view: &GameView, viewer: &str, board_owner: &str) -> BoardAccess {
    let seated = !is_guest(viewer) && view.is_seated(viewer);
    if !seated {
        // spectators and guests: read-only everywhere, layouts never shown
        return BoardAccess::read_only(false);
    }
    let own = board_owner == viewer;
    match view.status {
        Phase::Setup => {
            if own {
                BoardAccess::enabled(true, CellAction::TogglePlacement)
            } else {
                BoardAccess::read_only(false)
            }
        }
        Phase::Playing => {
            if own {
                // ships cannot be replaced mid-game
                BoardAccess::read_only(true)
            } else if view.my_turn(viewer) {
                BoardAccess::enabled(false, CellAction::SubmitTarget)
            } else {
                BoardAccess::read_only(false)
            }
        }
        Phase::Finished => BoardAccess::read_only(own),
    }
}

// Cell-level refinement of `board_access`: turns a click into the action to
// dispatch, or nothing when the click would be illegal. An already-attacked cell
// decides to nothing, so the client never optimistically flips the turn.
pub fn decide_click(
    view: &GameView,
    viewer: &str,
    board_owner: &str,
    x: usize,
    y: usize,
) -> Option<ClickCommand> {
    let access = board_access(view, viewer, board_owner);
    if access.disabled {
        return None;
    }
    match access.action {
        CellAction::TogglePlacement => match view.ships_grid().get(x)?.get(y)? {
            CellState::Empty if view.board.pins_available > 0 => {
                Some(ClickCommand::PlacePin { x, y })
            }
            CellState::Ship => Some(ClickCommand::RecoverPin { x, y }),
            _ => None,
        },
        CellAction::SubmitTarget => match view.shots_grid().get(x)?.get(y)? {
            CellState::Empty => Some(ClickCommand::Target { x, y }),
            _ => None,
        },
        CellAction::None => None,
    }
}
