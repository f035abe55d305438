//! Turn commands: add/move/merge records with explicit inverses, grouped per turn.

use crate::grid::{Cell, GridError, TileGrid};
use thiserror::Error;

/// Execution priority for the first application of a turn (lower runs first).
/// Removals would run at 1; the controller never records one.
const PRIORITY_SLIDE: u8 = 2;
const PRIORITY_ADD: u8 = 4;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("cannot {op} a turn that is {state:?}")]
    InvalidState { op: &'static str, state: TurnState },
}

/// One grid operation decided during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Spawn a tile.
    Add { cell: Cell, value: u32 },
    /// Slide a tile into an empty cell.
    Move { from: Cell, to: Cell, value: u32 },
    /// Slide a tile onto an equal one; `value` is each source's value, the result is `2 * value`.
    Merge { from: Cell, to: Cell, value: u32 },
}

/// Animation a command plays when applied (or reverses when undone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Appear { cell: Cell, value: u32 },
    Slide { from: Cell, to: Cell, value: u32 },
}

impl Command {
    pub fn priority(&self) -> u8 {
        match self {
            Self::Move { .. } | Self::Merge { .. } => PRIORITY_SLIDE,
            Self::Add { .. } => PRIORITY_ADD,
        }
    }

    pub fn redo(&self, grid: &mut TileGrid) -> Result<(), GridError> {
        match *self {
            Self::Add { cell, value } => grid.add_tile(cell, value).map(drop),
            Self::Move { from, to, .. } => grid.move_tile(from, to).map(drop),
            Self::Merge { from, to, .. } => grid.merge_tile(from, to).map(drop),
        }
    }

    pub fn undo(&self, grid: &mut TileGrid) -> Result<(), GridError> {
        match *self {
            Self::Add { cell, .. } => grid.remove_tile(cell).map(drop),
            Self::Move { from, to, .. } => grid.move_tile(to, from).map(drop),
            Self::Merge { from, to, .. } => grid.unmerge_tile(to, from).map(drop),
        }
    }

    pub fn motion(&self) -> Motion {
        match *self {
            Self::Add { cell, value } => Motion::Appear { cell, value },
            Self::Move { from, to, value } | Self::Merge { from, to, value } => {
                Motion::Slide { from, to, value }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Still collecting commands; nothing applied yet.
    Pending,
    Applied,
    Reverted,
}

/// All commands of one turn, applied and reverted as a unit.
#[derive(Debug, Clone)]
pub struct TurnCommand {
    children: Vec<Command>,
    state: TurnState,
}

impl TurnCommand {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            state: TurnState::Pending,
        }
    }

    pub fn push(&mut self, command: Command) {
        debug_assert_eq!(self.state, TurnState::Pending);
        self.children.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.children
    }

    #[cfg(test)]
    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Apply the turn. The first application orders slides before spawns.
    pub fn redo(&mut self, grid: &mut TileGrid) -> Result<(), CommandError> {
        match self.state {
            TurnState::Pending => self.children.sort_by_key(Command::priority),
            TurnState::Reverted => {}
            TurnState::Applied => {
                return Err(CommandError::InvalidState {
                    op: "redo",
                    state: self.state,
                });
            }
        }
        for command in &self.children {
            command.redo(grid)?;
        }
        self.state = TurnState::Applied;
        Ok(())
    }

    pub fn undo(&mut self, grid: &mut TileGrid) -> Result<(), CommandError> {
        if self.state != TurnState::Applied {
            return Err(CommandError::InvalidState {
                op: "undo",
                state: self.state,
            });
        }
        for command in self.children.iter().rev() {
            command.undo(grid)?;
        }
        self.state = TurnState::Reverted;
        Ok(())
    }
}

impl Default for TurnCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(row: usize, col: usize) -> Cell {
        Cell::new(row, col)
    }

    /// Row [2,2,4,_] swept left, plus a spawn that was recorded before the slides.
    fn sample_turn() -> TurnCommand {
        let mut turn = TurnCommand::new();
        turn.push(Command::Add { cell: c(0, 3), value: 2 });
        turn.push(Command::Merge { from: c(0, 1), to: c(0, 0), value: 2 });
        turn.push(Command::Move { from: c(0, 2), to: c(0, 1), value: 4 });
        turn
    }

    #[test]
    fn first_redo_sorts_slides_before_spawns() {
        let mut grid = TileGrid::from_rows(&[&[2, 2, 4, 0]]);
        let mut turn = sample_turn();
        turn.redo(&mut grid).unwrap();
        assert_eq!(turn.state(), TurnState::Applied);
        assert!(matches!(turn.commands()[0], Command::Merge { .. }));
        assert!(matches!(turn.commands()[1], Command::Move { .. }));
        assert!(matches!(turn.commands()[2], Command::Add { .. }));
        assert_eq!(grid.snapshot(), vec![vec![Some(4), Some(4), None, Some(2)]]);
    }

    #[test]
    fn undo_then_redo_round_trips_grid() {
        let mut grid = TileGrid::from_rows(&[&[2, 2, 4, 0]]);
        let before = grid.snapshot();
        let mut turn = sample_turn();
        turn.redo(&mut grid).unwrap();
        let after = grid.snapshot();

        turn.undo(&mut grid).unwrap();
        assert_eq!(turn.state(), TurnState::Reverted);
        assert_eq!(grid.snapshot(), before);

        let order: Vec<Command> = turn.commands().to_vec();
        turn.redo(&mut grid).unwrap();
        assert_eq!(turn.commands(), order.as_slice());
        assert_eq!(grid.snapshot(), after);
    }

    #[test]
    fn state_violations_are_rejected() {
        let mut grid = TileGrid::from_rows(&[&[2, 2, 4, 0]]);
        let mut turn = sample_turn();
        assert!(matches!(
            turn.undo(&mut grid),
            Err(CommandError::InvalidState { op: "undo", state: TurnState::Pending })
        ));
        turn.redo(&mut grid).unwrap();
        assert!(matches!(
            turn.redo(&mut grid),
            Err(CommandError::InvalidState { op: "redo", .. })
        ));
    }

    #[test]
    fn grid_failure_propagates() {
        let mut grid = TileGrid::from_rows(&[&[0, 0]]);
        let mut turn = TurnCommand::new();
        turn.push(Command::Move { from: c(0, 1), to: c(0, 0), value: 2 });
        assert!(matches!(
            turn.redo(&mut grid),
            Err(CommandError::Grid(GridError::CellEmpty { op: "Move", .. }))
        ));
    }

    #[test]
    fn motions_describe_commands() {
        let add = Command::Add { cell: c(1, 1), value: 4 };
        assert_eq!(add.motion(), Motion::Appear { cell: c(1, 1), value: 4 });
        let merge = Command::Merge { from: c(0, 3), to: c(0, 0), value: 8 };
        assert_eq!(
            merge.motion(),
            Motion::Slide { from: c(0, 3), to: c(0, 0), value: 8 }
        );
    }
}
