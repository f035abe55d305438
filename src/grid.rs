//! Tile grid: cells, tiles, turn shadow, change events.

use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

/// Row/column coordinate on the grid. Row 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u64);

/// A numbered tile. Its cell is not stored; ask the grid with [`TileGrid::find_tile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
}

/// Outcome of probing one source/target pair during a line sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAction {
    /// Source cell is empty.
    Empty,
    /// Source slides into the empty target.
    Move,
    /// Source and target hold equal values.
    Merge,
    /// Target is blocked by a different value.
    Stay,
}

/// Change notification queued by every successful grid mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    TileAdded { value: u32, cell: Cell },
    TileRemoved { cell: Cell },
    TileMoved { cell: Cell, from: Cell },
    /// `value` is the merged (doubled) value now at `cell`.
    TileMerged { value: u32, cell: Cell, from: Cell },
    TileValueChanged { value: u32, cell: Cell },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("[{op}] cell {cell} is outside the {rows}x{columns} grid")]
    OutOfBounds {
        op: &'static str,
        cell: Cell,
        rows: usize,
        columns: usize,
    },
    #[error("[{op}] cell {cell} is not empty")]
    CellOccupied { op: &'static str, cell: Cell },
    #[error("[{op}] cell {cell} is empty")]
    CellEmpty { op: &'static str, cell: Cell },
    #[error("[{op}] source {from} and target {to} values are not equal ({source_value} vs {target_value})")]
    ValueMismatch {
        op: &'static str,
        from: Cell,
        to: Cell,
        source_value: u32,
        target_value: u32,
    },
    #[error("[{op}] tile value {value} at {cell} cannot be split")]
    CannotSplit {
        op: &'static str,
        cell: Cell,
        value: u32,
    },
    #[error("tile {0:?} is not in the grid")]
    TileNotFound(TileId),
}

/// Turn-scoped copy of the grid used to test moves before they are committed.
///
/// Created by [`TileGrid::begin_turn`] and handed back to [`TileGrid::end_turn`].
#[derive(Debug, Clone)]
pub struct TurnShadow {
    columns: usize,
    cells: Vec<Option<Tile>>,
}

impl TurnShadow {
    #[inline]
    fn index(&self, cell: Cell) -> usize {
        cell.row * self.columns + cell.col
    }

    /// Probe `source -> target` and apply the result to the shadow only.
    pub fn check_move(&mut self, source: Cell, target: Cell) -> MoveAction {
        let (si, ti) = (self.index(source), self.index(target));
        let Some(src) = self.cells[si] else {
            return MoveAction::Empty;
        };
        let action = match self.cells[ti] {
            None => MoveAction::Move,
            Some(dst) if dst.value == src.value => MoveAction::Merge,
            Some(_) => return MoveAction::Stay,
        };
        self.cells[ti] = Some(src);
        self.cells[si] = None;
        action
    }

    /// Cells that are empty after the moves probed so far, in row-major order.
    pub fn empty_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_none())
            .map(|(i, _)| Cell::new(i / self.columns, i % self.columns))
            .collect()
    }
}

/// `rows x columns` grid of optional tiles; the single source of truth for game state.
#[derive(Debug, Clone)]
pub struct TileGrid {
    rows: usize,
    columns: usize,
    cells: Vec<Option<Tile>>,
    next_id: u64,
    events: Vec<GridEvent>,
}

impl TileGrid {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![None; rows * columns],
            next_id: 0,
            events: Vec::new(),
        }
    }

    /// Build a grid from row-major values; 0 means empty. Queues no events.
    #[cfg(test)]
    pub fn from_rows(rows: &[&[u32]]) -> Self {
        let columns = rows.first().map_or(0, |r| r.len());
        let mut grid = Self::new(rows.len(), columns);
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value != 0 {
                    let tile = grid.new_tile(value);
                    grid.cells[r * columns + c] = Some(tile);
                }
            }
        }
        grid
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    fn index(&self, cell: Cell) -> usize {
        cell.row * self.columns + cell.col
    }

    fn new_tile(&mut self, value: u32) -> Tile {
        let id = TileId(self.next_id);
        self.next_id += 1;
        Tile { id, value }
    }

    /// Log the grid at error level and hand the error back for propagation.
    fn fail(&self, err: GridError) -> GridError {
        error!("{err}\n{self}");
        err
    }

    fn check_bounds(&self, op: &'static str, cell: Cell) -> Result<usize, GridError> {
        if cell.row < self.rows && cell.col < self.columns {
            Ok(self.index(cell))
        } else {
            Err(self.fail(GridError::OutOfBounds {
                op,
                cell,
                rows: self.rows,
                columns: self.columns,
            }))
        }
    }

    fn occupied(&self, op: &'static str, cell: Cell) -> Result<(usize, Tile), GridError> {
        let i = self.check_bounds(op, cell)?;
        match self.cells[i] {
            Some(tile) => Ok((i, tile)),
            None => Err(self.fail(GridError::CellEmpty { op, cell })),
        }
    }

    fn vacant(&self, op: &'static str, cell: Cell) -> Result<usize, GridError> {
        let i = self.check_bounds(op, cell)?;
        if self.cells[i].is_some() {
            return Err(self.fail(GridError::CellOccupied { op, cell }));
        }
        Ok(i)
    }

    #[inline]
    pub fn get(&self, cell: Cell) -> Option<Tile> {
        if cell.row >= self.rows || cell.col >= self.columns {
            return None;
        }
        self.cells[self.index(cell)]
    }

    pub fn is_cell_empty(&self, cell: Cell) -> bool {
        self.get(cell).is_none()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.columns).map(move |c| Cell::new(r, c)))
    }

    pub fn tiles(&self) -> impl Iterator<Item = (Cell, Tile)> + '_ {
        self.cells().filter_map(move |cell| self.get(cell).map(|t| (cell, t)))
    }

    pub fn tile_count(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    pub fn value_sum(&self) -> u64 {
        self.cells.iter().flatten().map(|t| u64::from(t.value)).sum()
    }

    pub fn max_value(&self) -> Option<u32> {
        self.cells.iter().flatten().map(|t| t.value).max()
    }

    /// Values by row, `None` for empty cells. Used to compare grid contents.
    pub fn snapshot(&self) -> Vec<Vec<Option<u32>>> {
        (0..self.rows)
            .map(|r| {
                (0..self.columns)
                    .map(|c| self.get(Cell::new(r, c)).map(|t| t.value))
                    .collect()
            })
            .collect()
    }

    /// Reverse lookup of a tile's cell.
    pub fn find_tile(&self, id: TileId) -> Result<Cell, GridError> {
        self.tiles()
            .find(|(_, t)| t.id == id)
            .map(|(cell, _)| cell)
            .ok_or(GridError::TileNotFound(id))
    }

    /// True while some direction would still change the grid.
    pub fn has_moves(&self) -> bool {
        self.cells().any(|c| self.is_cell_empty(c))
            || self.tiles().any(|(cell, tile)| {
                let right = Cell::new(cell.row, cell.col + 1);
                let below = Cell::new(cell.row + 1, cell.col);
                [right, below]
                    .into_iter()
                    .any(|n| self.get(n).is_some_and(|t| t.value == tile.value))
            })
    }

    /// Start a turn: copy the current cells into a shadow for speculative probing.
    pub fn begin_turn(&self) -> TurnShadow {
        TurnShadow {
            columns: self.columns,
            cells: self.cells.clone(),
        }
    }

    /// End a turn, discarding its shadow.
    pub fn end_turn(&self, shadow: TurnShadow) {
        drop(shadow);
    }

    /// Drain queued change events.
    pub fn take_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn add_tile(&mut self, cell: Cell, value: u32) -> Result<TileId, GridError> {
        let i = self.vacant("Add", cell)?;
        let tile = self.new_tile(value);
        self.cells[i] = Some(tile);
        debug!(value, %cell, "add tile");
        self.events.push(GridEvent::TileAdded { value, cell });
        Ok(tile.id)
    }

    pub fn remove_tile(&mut self, cell: Cell) -> Result<Tile, GridError> {
        let (i, tile) = self.occupied("Remove", cell)?;
        self.cells[i] = None;
        debug!(%cell, "remove tile");
        self.events.push(GridEvent::TileRemoved { cell });
        Ok(tile)
    }

    pub fn move_tile(&mut self, from: Cell, to: Cell) -> Result<Tile, GridError> {
        let (si, tile) = self.occupied("Move", from)?;
        let ti = self.vacant("Move", to)?;
        self.cells[ti] = Some(tile);
        self.cells[si] = None;
        debug!(%from, %to, "move tile");
        self.events.push(GridEvent::TileMoved { cell: to, from });
        Ok(tile)
    }

    /// Move the tile at `from` onto the equal tile at `to`, doubling it. The old target is dropped.
    pub fn merge_tile(&mut self, from: Cell, to: Cell) -> Result<Tile, GridError> {
        let (si, source) = self.occupied("Merge", from)?;
        let (ti, target) = self.occupied("Merge", to)?;
        if source.value != target.value {
            return Err(self.fail(GridError::ValueMismatch {
                op: "Merge",
                from,
                to,
                source_value: source.value,
                target_value: target.value,
            }));
        }
        let merged = Tile {
            id: source.id,
            value: source.value * 2,
        };
        self.cells[ti] = Some(merged);
        self.cells[si] = None;
        debug!(%from, %to, value = merged.value, "merge tile");
        self.events.push(GridEvent::TileMerged {
            value: merged.value,
            cell: to,
            from,
        });
        Ok(merged)
    }

    /// Undo a merge: halve the tile at `cell` and recreate its partner at `split_to`.
    pub fn unmerge_tile(&mut self, cell: Cell, split_to: Cell) -> Result<TileId, GridError> {
        let (_, tile) = self.occupied("Unmerge", cell)?;
        self.vacant("Unmerge", split_to)?;
        if tile.value < 4 || !tile.value.is_power_of_two() {
            return Err(self.fail(GridError::CannotSplit {
                op: "Unmerge",
                cell,
                value: tile.value,
            }));
        }
        debug!(%cell, %split_to, "unmerge tile");
        let value = tile.value / 2;
        self.change_tile_value(cell, value)?;
        self.add_tile(split_to, value)
    }

    pub fn change_tile_value(&mut self, cell: Cell, value: u32) -> Result<Tile, GridError> {
        let (i, tile) = self.occupied("Change value", cell)?;
        let changed = Tile { value, ..tile };
        self.cells[i] = Some(changed);
        debug!(%cell, value, "change tile value");
        self.events.push(GridEvent::TileValueChanged { value, cell });
        Ok(changed)
    }
}

/// Tab-separated dump between rulers; empty cells print as `.`.
impl fmt::Display for TileGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "====================")?;
        for r in 0..self.rows {
            let line: Vec<String> = (0..self.columns)
                .map(|c| {
                    self.get(Cell::new(r, c))
                        .map_or_else(|| ".".to_string(), |t| t.value.to_string())
                })
                .collect();
            writeln!(f, "{}", line.join("\t"))?;
        }
        write!(f, "====================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(row: usize, col: usize) -> Cell {
        Cell::new(row, col)
    }

    #[test]
    fn add_into_occupied_cell_fails() {
        let mut g = TileGrid::new(4, 4);
        g.add_tile(c(1, 2), 2).unwrap();
        let err = g.add_tile(c(1, 2), 4).unwrap_err();
        assert_eq!(err, GridError::CellOccupied { op: "Add", cell: c(1, 2) });
        assert_eq!(err.to_string(), "[Add] cell (1, 2) is not empty");
        assert_eq!(g.tile_count(), 1);
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut g = TileGrid::new(2, 3);
        assert!(matches!(
            g.add_tile(c(2, 0), 2),
            Err(GridError::OutOfBounds { rows: 2, columns: 3, .. })
        ));
    }

    #[test]
    fn move_requires_source_and_free_target() {
        let mut g = TileGrid::from_rows(&[&[2, 4], &[0, 0]]);
        assert!(matches!(g.move_tile(c(1, 0), c(1, 1)), Err(GridError::CellEmpty { .. })));
        assert!(matches!(g.move_tile(c(0, 0), c(0, 1)), Err(GridError::CellOccupied { .. })));
        g.move_tile(c(0, 0), c(1, 0)).unwrap();
        assert_eq!(g.snapshot(), vec![vec![None, Some(4)], vec![Some(2), None]]);
        assert_eq!(
            g.take_events(),
            vec![GridEvent::TileMoved { cell: c(1, 0), from: c(0, 0) }]
        );
    }

    #[test]
    fn merge_doubles_target_and_drops_one_tile() {
        let mut g = TileGrid::from_rows(&[&[2, 2, 0, 0]]);
        let sum = g.value_sum();
        let merged = g.merge_tile(c(0, 1), c(0, 0)).unwrap();
        assert_eq!(merged.value, 4);
        assert_eq!(g.tile_count(), 1);
        assert_eq!(g.value_sum(), sum);
        assert_eq!(g.get(c(0, 0)).map(|t| t.value), Some(4));
        assert_eq!(
            g.take_events(),
            vec![GridEvent::TileMerged { value: 4, cell: c(0, 0), from: c(0, 1) }]
        );
    }

    #[test]
    fn merge_rejects_empty_target_and_mismatch() {
        let mut g = TileGrid::from_rows(&[&[2, 4, 0]]);
        assert!(matches!(g.merge_tile(c(0, 0), c(0, 2)), Err(GridError::CellEmpty { .. })));
        assert!(matches!(
            g.merge_tile(c(0, 1), c(0, 0)),
            Err(GridError::ValueMismatch { source_value: 4, target_value: 2, .. })
        ));
        assert_eq!(g.snapshot(), vec![vec![Some(2), Some(4), None]]);
    }

    #[test]
    fn unmerge_restores_two_halves() {
        let mut g = TileGrid::from_rows(&[&[2, 2]]);
        g.merge_tile(c(0, 1), c(0, 0)).unwrap();
        g.take_events();
        g.unmerge_tile(c(0, 0), c(0, 1)).unwrap();
        assert_eq!(g.snapshot(), vec![vec![Some(2), Some(2)]]);
        assert_eq!(
            g.take_events(),
            vec![
                GridEvent::TileValueChanged { value: 2, cell: c(0, 0) },
                GridEvent::TileAdded { value: 2, cell: c(0, 1) },
            ]
        );
        assert!(matches!(
            g.unmerge_tile(c(0, 0), c(0, 1)),
            Err(GridError::CellOccupied { .. })
        ));
        g.remove_tile(c(0, 1)).unwrap();
        assert!(matches!(
            g.unmerge_tile(c(0, 0), c(0, 1)),
            Err(GridError::CannotSplit { value: 2, .. })
        ));
    }

    #[test]
    fn find_tile_follows_moves_and_fails_after_removal() {
        let mut g = TileGrid::new(3, 3);
        let id = g.add_tile(c(2, 2), 8).unwrap();
        assert_eq!(g.find_tile(id), Ok(c(2, 2)));
        g.move_tile(c(2, 2), c(0, 2)).unwrap();
        assert_eq!(g.find_tile(id), Ok(c(0, 2)));
        g.remove_tile(c(0, 2)).unwrap();
        assert_eq!(g.find_tile(id), Err(GridError::TileNotFound(id)));
    }

    #[test]
    fn shadow_probes_without_touching_grid() {
        let g = TileGrid::from_rows(&[&[2, 2, 4, 0]]);
        let mut shadow = g.begin_turn();
        assert_eq!(shadow.check_move(c(0, 3), c(0, 0)), MoveAction::Empty);
        assert_eq!(shadow.check_move(c(0, 1), c(0, 0)), MoveAction::Merge);
        assert_eq!(shadow.check_move(c(0, 2), c(0, 0)), MoveAction::Stay);
        assert_eq!(shadow.check_move(c(0, 2), c(0, 1)), MoveAction::Move);
        assert_eq!(shadow.empty_cells(), vec![c(0, 2), c(0, 3)]);
        g.end_turn(shadow);
        assert_eq!(g.snapshot(), vec![vec![Some(2), Some(2), Some(4), None]]);
    }

    #[test]
    fn has_moves_detects_locked_board() {
        let locked = TileGrid::from_rows(&[&[2, 4], &[4, 2]]);
        assert!(!locked.has_moves());
        let pair = TileGrid::from_rows(&[&[2, 4], &[2, 8]]);
        assert!(pair.has_moves());
        let gap = TileGrid::from_rows(&[&[2, 4], &[8, 0]]);
        assert!(gap.has_moves());
    }

    #[test]
    fn display_dumps_rows() {
        let g = TileGrid::from_rows(&[&[2, 0], &[0, 16]]);
        assert_eq!(
            g.to_string(),
            "====================\n2\t.\n.\t16\n===================="
        );
    }
}
