//! Game controller: directional line sweeps, random spawns, turn bookkeeping.

use crate::GameConfig;
use crate::command::{Command, CommandError, Motion, TurnCommand};
use crate::grid::{Cell, GridEvent, MoveAction, TileGrid, TileId, TurnShadow};
use crate::history::History;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Tiles spawned after each turn that changed the grid.
const TILES_AT_TURN: usize = 1;
/// Probability that a spawned tile is a 2 (otherwise 4).
const SPAWN_TWO_PROBABILITY: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// What a turn, undo or redo did, for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// False when nothing changed (no-op move, empty undo/redo stack).
    pub changed: bool,
    /// Animations of the applied commands, in execution order.
    pub motions: Vec<Motion>,
}

impl TurnOutcome {
    fn from_turn(turn: Option<&TurnCommand>) -> Self {
        turn.map(|t| Self {
            changed: true,
            motions: t.commands().iter().map(Command::motion).collect(),
        })
        .unwrap_or_default()
    }

    pub fn has_slides(&self) -> bool {
        self.motions.iter().any(|m| matches!(m, Motion::Slide { .. }))
    }
}

pub struct GameController {
    grid: TileGrid,
    history: History,
    rng: StdRng,
    start_tiles: usize,
    turns_played: u32,
    last_spawned: Option<TileId>,
}

impl GameController {
    pub fn new(config: &crate::GameConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self::with_grid(TileGrid::new(config.rows, config.columns), rng, config)
    }

    pub fn with_grid(grid: TileGrid, rng: StdRng, config: &GameConfig) -> Self {
        Self {
            grid,
            history: History::new(config.undo_limit),
            rng,
            start_tiles: config.start_tiles,
            turns_played: 0,
            last_spawned: None,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Drain the grid's change events for the scene.
    pub fn take_events(&mut self) -> Vec<GridEvent> {
        self.grid.take_events()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn turns_played(&self) -> u32 {
        self.turns_played
    }

    /// Cell of the most recently spawned tile while it is still on the grid.
    pub fn last_spawned_cell(&self) -> Option<Cell> {
        self.last_spawned.and_then(|id| self.grid.find_tile(id).ok())
    }

    /// Reset to an empty grid and spawn the opening tiles. The opening is not undoable.
    pub fn start(&mut self) -> Result<TurnOutcome, CommandError> {
        self.grid = TileGrid::new(self.grid.rows(), self.grid.columns());
        self.history.clear();
        self.turns_played = 0;
        self.last_spawned = None;

        let shadow = self.grid.begin_turn();
        let mut turn = TurnCommand::new();
        self.spawn_random(&shadow, &mut turn, self.start_tiles);
        self.grid.end_turn(shadow);
        turn.redo(&mut self.grid)?;
        self.last_spawned = spawned_tile(&self.grid, &turn);
        info!(tiles = self.grid.tile_count(), "game started");
        debug!("\n{}", self.grid);
        Ok(TurnOutcome::from_turn(Some(&turn)))
    }

    /// Resolve one directional input. A move that changes nothing is not recorded.
    pub fn process_move(&mut self, direction: Direction) -> Result<TurnOutcome, CommandError> {
        let mut shadow = self.grid.begin_turn();
        let mut turn = TurnCommand::new();
        self.sweep(direction, &mut shadow, &mut turn);
        let changed = !turn.is_empty();
        if changed {
            self.spawn_random(&shadow, &mut turn, TILES_AT_TURN);
        }
        self.grid.end_turn(shadow);

        if !changed {
            debug!(?direction, "move changed nothing");
            return Ok(TurnOutcome::default());
        }
        self.history.push(turn, &mut self.grid)?;
        self.turns_played += 1;
        self.refresh_last_spawned();
        info!(?direction, turn = self.turns_played, "turn committed");
        debug!("\n{}", self.grid);
        Ok(TurnOutcome::from_turn(self.history.last_applied()))
    }

    pub fn undo(&mut self) -> Result<TurnOutcome, CommandError> {
        let outcome = TurnOutcome::from_turn(self.history.undo(&mut self.grid)?);
        if outcome.changed {
            self.refresh_last_spawned();
            self.turns_played = self.turns_played.saturating_sub(1);
            info!(turn = self.turns_played, "undo");
            debug!("\n{}", self.grid);
        }
        Ok(outcome)
    }

    pub fn redo(&mut self) -> Result<TurnOutcome, CommandError> {
        let outcome = TurnOutcome::from_turn(self.history.redo(&mut self.grid)?);
        if outcome.changed {
            self.refresh_last_spawned();
            self.turns_played += 1;
            info!(turn = self.turns_played, "redo");
            debug!("\n{}", self.grid);
        }
        Ok(outcome)
    }

    /// Point at the spawn of the latest applied turn. Redo re-adds tiles under new ids.
    fn refresh_last_spawned(&mut self) {
        self.last_spawned = self
            .history
            .last_applied()
            .and_then(|turn| spawned_tile(&self.grid, turn));
    }

    pub fn has_moves(&self) -> bool {
        self.grid.has_moves()
    }

    /// Cells of every row or column, each ordered from the wall tiles travel toward.
    fn lines(&self, direction: Direction) -> Vec<Vec<Cell>> {
        let (rows, cols) = (self.grid.rows(), self.grid.columns());
        match direction {
            Direction::Left => (0..rows)
                .map(|r| (0..cols).map(|c| Cell::new(r, c)).collect())
                .collect(),
            Direction::Right => (0..rows)
                .map(|r| (0..cols).rev().map(|c| Cell::new(r, c)).collect())
                .collect(),
            Direction::Up => (0..cols)
                .map(|c| (0..rows).map(|r| Cell::new(r, c)).collect())
                .collect(),
            Direction::Down => (0..cols)
                .map(|c| (0..rows).rev().map(|r| Cell::new(r, c)).collect())
                .collect(),
        }
    }

    /// Record every move and merge for `direction`.
    fn sweep(&self, direction: Direction, shadow: &mut TurnShadow, turn: &mut TurnCommand) {
        for line in self.lines(direction) {
            self.sweep_line(&line, shadow, turn);
        }
    }

    /// Line sweep over one row/column. `line[0]` is the wall.
    fn sweep_line(&self, line: &[Cell], shadow: &mut TurnShadow, turn: &mut TurnCommand) {
        let mut frontier = 0;
        for source in 1..line.len() {
            // The source has not been probed yet, so the real grid still holds its tile.
            let Some(tile) = self.grid.get(line[source]) else {
                continue;
            };
            let mut result = MoveAction::Empty;
            let mut landing = frontier;
            for k in frontier..source {
                landing = k;
                result = shadow.check_move(line[source], line[k]);
                if matches!(result, MoveAction::Move | MoveAction::Merge) {
                    break;
                }
            }
            let (from, to, value) = (line[source], line[landing], tile.value);
            match result {
                MoveAction::Move => {
                    turn.push(Command::Move { from, to, value });
                    frontier = landing;
                }
                MoveAction::Merge => {
                    turn.push(Command::Merge { from, to, value });
                    frontier = landing + 1;
                }
                MoveAction::Stay => frontier = source,
                MoveAction::Empty => {}
            }
        }
    }

    /// Record `count` spawns into cells that are empty in the shadow.
    fn spawn_random(&mut self, shadow: &TurnShadow, turn: &mut TurnCommand, count: usize) {
        let empty = shadow.empty_cells();
        let cells: Vec<Cell> = empty.choose_multiple(&mut self.rng, count).copied().collect();
        for cell in cells {
            let value = if self.rng.random_bool(SPAWN_TWO_PROBABILITY) { 2 } else { 4 };
            turn.push(Command::Add { cell, value });
        }
    }
}

/// Id of the tile a turn spawned, if it is on the grid.
fn spawned_tile(grid: &TileGrid, turn: &TurnCommand) -> Option<TileId> {
    turn.commands().iter().rev().find_map(|command| match *command {
        Command::Add { cell, .. } => grid.get(cell).map(|t| t.id),
        _ => None,
    })
}
