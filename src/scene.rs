//! Visual projection of the grid: tiles, ghosts and their timed animations.
//!
//! The scene never reads the grid. It mirrors it by replaying the grid's
//! change events in order, so a tile's visual follows it through moves,
//! merges and undos.

use crate::grid::{Cell, GridEvent};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tachyonfx::Interpolation;
use tracing::error;

pub const APPEAR: Duration = Duration::from_millis(200);
pub const DISAPPEAR: Duration = Duration::from_millis(200);
pub const SLIDE: Duration = Duration::from_millis(100);
pub const FLASH: Duration = Duration::from_millis(100);

/// A time window for one animation.
#[derive(Debug, Clone, Copy)]
struct Timing {
    start: Instant,
    duration: Duration,
}

impl Timing {
    fn new(start: Instant, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// Linear progress in 0..=1; 0 before the window opens.
    fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.start);
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn started(&self, now: Instant) -> bool {
        now >= self.start
    }

    fn done(&self, now: Instant) -> bool {
        now >= self.start + self.duration
    }
}

#[derive(Debug, Clone)]
struct VisualTile {
    value: u32,
    /// Value shown while the tile is still sliding into a merge.
    arriving_value: Option<u32>,
    slide: Option<(Cell, Timing)>,
    appear: Option<Timing>,
    flash: Option<Timing>,
}

impl VisualTile {
    fn new(value: u32) -> Self {
        Self {
            value,
            arriving_value: None,
            slide: None,
            appear: None,
            flash: None,
        }
    }

    fn settle(&mut self) {
        self.arriving_value = None;
        self.slide = None;
        self.appear = None;
        self.flash = None;
    }

    fn is_animating(&self, now: Instant) -> bool {
        let slide = self.slide.map(|(_, t)| t);
        [slide, self.appear, self.flash]
            .into_iter()
            .flatten()
            .any(|t| !t.done(now))
    }
}

/// A tile that left the grid but is still drawn.
#[derive(Debug, Clone)]
struct Ghost {
    cell: Cell,
    value: u32,
    timing: Timing,
    /// Shrinks away when true; otherwise held under an incoming merge.
    shrink: bool,
}

/// What to draw for one tile at an instant. Positions are fractional cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileView {
    pub row: f32,
    pub col: f32,
    /// 0 = invisible, 1 = full cell.
    pub scale: f32,
    pub value: u32,
    /// Flash intensity, fading from 1 to 0.
    pub flash: f32,
}

#[derive(Debug, Default)]
pub struct Scene {
    tiles: HashMap<Cell, VisualTile>,
    ghosts: Vec<Ghost>,
    animate: bool,
}

impl Scene {
    pub fn new(animate: bool) -> Self {
        Self {
            animate,
            ..Self::default()
        }
    }

    /// Forget every visual (new game).
    pub fn reset(&mut self) {
        self.tiles.clear();
        self.ghosts.clear();
    }

    /// Replay one batch of grid events. Animations still running from the previous
    /// batch finish instantly. When the batch contains slides, appearances wait
    /// for the slide phase to end.
    pub fn apply_events(&mut self, events: Vec<GridEvent>, has_slides: bool, now: Instant) {
        self.settle();
        let appear_at = if has_slides { now + SLIDE } else { now };
        for event in events {
            match event {
                GridEvent::TileAdded { value, cell } => {
                    let mut tile = VisualTile::new(value);
                    tile.appear = Some(Timing::new(appear_at, APPEAR));
                    self.tiles.insert(cell, tile);
                }
                GridEvent::TileRemoved { cell } => {
                    if let Some(tile) = self.tiles.remove(&cell) {
                        self.ghosts.push(Ghost {
                            cell,
                            value: tile.value,
                            timing: Timing::new(now, DISAPPEAR),
                            shrink: true,
                        });
                    }
                }
                GridEvent::TileMoved { cell, from } => {
                    let Some(mut tile) = self.tiles.remove(&from) else {
                        error!(%from, %cell, "scene has no tile to move");
                        continue;
                    };
                    tile.slide = Some((from, Timing::new(now, SLIDE)));
                    self.tiles.insert(cell, tile);
                }
                GridEvent::TileMerged { value, cell, from } => {
                    if let Some(target) = self.tiles.remove(&cell) {
                        self.ghosts.push(Ghost {
                            cell,
                            value: target.value,
                            timing: Timing::new(now, SLIDE),
                            shrink: false,
                        });
                    }
                    let arriving = self.tiles.remove(&from).map_or(value / 2, |t| t.value);
                    let mut tile = VisualTile::new(value);
                    tile.arriving_value = Some(arriving);
                    tile.slide = Some((from, Timing::new(now, SLIDE)));
                    tile.flash = Some(Timing::new(now + SLIDE, FLASH));
                    self.tiles.insert(cell, tile);
                }
                GridEvent::TileValueChanged { value, cell } => {
                    let tile = self.tiles.entry(cell).or_insert_with(|| VisualTile::new(value));
                    tile.value = value;
                    tile.flash = Some(Timing::new(now, FLASH));
                }
            }
        }
        if !self.animate {
            self.settle();
        }
    }

    fn settle(&mut self) {
        self.ghosts.clear();
        self.tiles.values_mut().for_each(VisualTile::settle);
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.ghosts.iter().any(|g| !g.timing.done(now))
            || self.tiles.values().any(|t| t.is_animating(now))
    }

    /// Everything visible at `now`: ghosts first so live tiles draw over them.
    pub fn views(&self, now: Instant) -> Vec<TileView> {
        let ghosts = self
            .ghosts
            .iter()
            .filter(|g| !g.timing.done(now))
            .map(|g| TileView {
                row: g.cell.row as f32,
                col: g.cell.col as f32,
                scale: if g.shrink {
                    1.0 - Interpolation::ExpoIn.alpha(g.timing.progress(now))
                } else {
                    1.0
                },
                value: g.value,
                flash: 0.0,
            });
        let mut tiles: Vec<(&Cell, &VisualTile)> = self.tiles.iter().collect();
        tiles.sort_by_key(|(cell, _)| **cell);
        let live = tiles.into_iter().map(|(cell, tile)| tile_view(*cell, tile, now));
        ghosts
            .chain(live)
            .filter(|v| v.scale > 0.0)
            .collect()
    }
}

fn tile_view(cell: Cell, tile: &VisualTile, now: Instant) -> TileView {
    let (mut row, mut col) = (cell.row as f32, cell.col as f32);
    let mut value = tile.value;
    if let Some((from, timing)) = tile.slide {
        if !timing.done(now) {
            let t = timing.progress(now);
            row = lerp(from.row as f32, row, t);
            col = lerp(from.col as f32, col, t);
            value = tile.arriving_value.unwrap_or(value);
        }
    }
    let scale = match tile.appear {
        Some(timing) if !timing.started(now) => 0.0,
        Some(timing) if !timing.done(now) => Interpolation::ExpoOut.alpha(timing.progress(now)),
        _ => 1.0,
    };
    let flash = match tile.flash {
        Some(timing) if timing.started(now) && !timing.done(now) => 1.0 - timing.progress(now),
        _ => 0.0,
    };
    TileView {
        row,
        col,
        scale,
        value,
        flash,
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
