//! Undo/redo stack of committed turns.

use crate::command::{CommandError, TurnCommand};
use crate::grid::TileGrid;

#[derive(Debug, Default)]
pub struct History {
    turns: Vec<TurnCommand>,
    /// Number of applied turns; turns past this index are redoable.
    index: usize,
    /// Oldest turns are dropped past this many (None = unlimited).
    limit: Option<usize>,
}

impl History {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            turns: Vec::new(),
            index: 0,
            limit: limit.filter(|&n| n > 0),
        }
    }

    /// Apply `turn` to the grid and record it, discarding any redoable turns.
    pub fn push(&mut self, mut turn: TurnCommand, grid: &mut TileGrid) -> Result<(), CommandError> {
        turn.redo(grid)?;
        self.turns.truncate(self.index);
        self.turns.push(turn);
        if let Some(limit) = self.limit {
            if self.turns.len() > limit {
                let excess = self.turns.len() - limit;
                self.turns.drain(..excess);
            }
        }
        self.index = self.turns.len();
        Ok(())
    }

    /// Revert the latest applied turn. Returns it, or None when nothing is undoable.
    pub fn undo(&mut self, grid: &mut TileGrid) -> Result<Option<&TurnCommand>, CommandError> {
        if self.index == 0 {
            return Ok(None);
        }
        self.index -= 1;
        let reverted = self.index;
        self.turns[reverted].undo(grid)?;
        Ok(Some(&self.turns[reverted]))
    }

    /// Re-apply the next reverted turn. Returns it, or None when nothing is redoable.
    pub fn redo(&mut self, grid: &mut TileGrid) -> Result<Option<&TurnCommand>, CommandError> {
        if self.index == self.turns.len() {
            return Ok(None);
        }
        let applied = self.index;
        self.turns[applied].redo(grid)?;
        self.index += 1;
        Ok(Some(&self.turns[applied]))
    }

    /// The most recently applied turn.
    pub fn last_applied(&self) -> Option<&TurnCommand> {
        self.index.checked_sub(1).map(|i| &self.turns[i])
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.index = 0;
    }

    pub fn undo_depth(&self) -> usize {
        self.index
    }

    pub fn redo_depth(&self) -> usize {
        self.turns.len() - self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::grid::Cell;

    fn spawn(row: usize, col: usize) -> TurnCommand {
        let mut turn = TurnCommand::new();
        turn.push(Command::Add { cell: Cell::new(row, col), value: 2 });
        turn
    }

    #[test]
    fn undo_redo_walks_the_stack() {
        let mut grid = TileGrid::new(2, 2);
        let mut history = History::new(None);
        history.push(spawn(0, 0), &mut grid).unwrap();
        history.push(spawn(1, 1), &mut grid).unwrap();
        assert_eq!(grid.tile_count(), 2);

        assert!(history.undo(&mut grid).unwrap().is_some());
        assert_eq!(grid.tile_count(), 1);
        assert!(history.undo(&mut grid).unwrap().is_some());
        assert!(history.undo(&mut grid).unwrap().is_none());
        assert_eq!(grid.tile_count(), 0);
        assert_eq!(history.redo_depth(), 2);

        assert!(history.redo(&mut grid).unwrap().is_some());
        assert_eq!(grid.snapshot(), vec![vec![Some(2), None], vec![None, None]]);
        assert_eq!((history.undo_depth(), history.redo_depth()), (1, 1));
    }

    #[test]
    fn push_discards_redo_branch() {
        let mut grid = TileGrid::new(2, 2);
        let mut history = History::new(None);
        history.push(spawn(0, 0), &mut grid).unwrap();
        history.push(spawn(0, 1), &mut grid).unwrap();
        history.undo(&mut grid).unwrap();
        history.push(spawn(1, 0), &mut grid).unwrap();
        assert_eq!(history.redo_depth(), 0);
        assert!(history.redo(&mut grid).unwrap().is_none());
        assert_eq!(
            grid.snapshot(),
            vec![vec![Some(2), None], vec![Some(2), None]]
        );
    }

    #[test]
    fn limit_drops_oldest_turns() {
        let mut grid = TileGrid::new(2, 2);
        let mut history = History::new(Some(2));
        for (r, c) in [(0, 0), (0, 1), (1, 0)] {
            history.push(spawn(r, c), &mut grid).unwrap();
        }
        assert_eq!(history.undo_depth(), 2);
        history.undo(&mut grid).unwrap();
        history.undo(&mut grid).unwrap();
        assert!(history.undo(&mut grid).unwrap().is_none());
        assert_eq!(grid.snapshot(), vec![vec![Some(2), None], vec![None, None]]);
    }
}
