//! Layout and drawing: board, animated tiles, sidebar, no-moves overlay, quit menu.

use crate::app::{QuitOption, Screen};
use crate::controller::GameController;
use crate::scene::{Scene, TileView};
use crate::theme::{Theme, tile_color, tile_text_color};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer};

/// Terminal cells per grid cell, including the one-cell gutter right and below.
const CELL_W: u16 = 8;
const CELL_H: u16 = 4;
const TILE_W: u16 = CELL_W - 1;
const TILE_H: u16 = CELL_H - 1;
const SIDEBAR_WIDTH: u16 = 26;
const SIDEBAR_MIN_HEIGHT: u16 = 22;
/// How far a flashing tile is pushed toward white at the start of the flash.
const FLASH_STRENGTH: f32 = 0.6;

/// Board size in terminal cells (border + gutter + tiles) for a grid.
pub fn board_size(rows: usize, columns: usize) -> (u16, u16) {
    let (rows, columns) = (rows as u16, columns as u16);
    (columns * CELL_W + 3, rows * CELL_H + 3)
}

/// Everything `draw` needs besides the frame.
pub struct DrawState<'a> {
    pub screen: Screen,
    pub game: &'a GameController,
    pub scene: &'a Scene,
    pub theme: &'a Theme,
    pub quit_selected: QuitOption,
    pub now: Instant,
}

/// Draw current screen. When `board_effect` is set (new game fade-in) it is processed
/// over the board and `board_effect_process_time` is advanced.
pub fn draw(
    frame: &mut Frame,
    state: &DrawState,
    board_effect: &mut Option<Effect>,
    board_effect_process_time: &mut Option<Instant>,
) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(state.theme.bg));
    let board_rect = draw_game(frame, state, area);
    apply_board_effect(
        frame,
        board_rect,
        board_effect,
        board_effect_process_time,
        state.now,
    );
    match state.screen {
        Screen::Playing => {}
        Screen::NoMoves => draw_no_moves_overlay(frame, state.theme, area),
        Screen::QuitMenu => draw_quit_menu(frame, state.theme, state.quit_selected),
    }
}

fn apply_board_effect(
    frame: &mut Frame,
    board_rect: Rect,
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let Some(fx) = effect else {
        return;
    };
    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *process_time = Some(now);
    frame.render_effect(fx, board_rect, TfxDuration::from_millis(delta_ms));
}

/// Draw board + sidebar centred in `area`. Returns the board rect.
fn draw_game(frame: &mut Frame, state: &DrawState, area: Rect) -> Rect {
    let grid = state.game.grid();
    let (bw, bh) = board_size(grid.rows(), grid.columns());
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh.max(SIDEBAR_MIN_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);
    let board_rect = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };

    draw_board(frame, state, board_rect);
    draw_sidebar(frame, state, inner[1]);
    board_rect
}

fn draw_board(frame: &mut Frame, state: &DrawState, area: Rect) {
    let theme = state.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" mergetui ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    let origin = Rect {
        x: inner.x + 1,
        y: inner.y + 1,
        width: inner.width.saturating_sub(1),
        height: inner.height.saturating_sub(1),
    };

    let grid = state.game.grid();
    for cell in grid.cells() {
        let rect = Rect {
            x: origin.x + cell.col as u16 * CELL_W,
            y: origin.y + cell.row as u16 * CELL_H,
            width: TILE_W,
            height: TILE_H,
        }
        .intersection(origin);
        frame
            .buffer_mut()
            .set_style(rect, Style::default().bg(theme.cell_bg));
    }

    for view in state.scene.views(state.now) {
        draw_tile(frame, origin, &view);
    }
}

/// Tile rect at a fractional cell position, shrunk around its centre by `scale`.
fn tile_rect(origin: Rect, view: &TileView) -> Rect {
    let w = (f32::from(TILE_W) * view.scale).round().max(1.0);
    let h = (f32::from(TILE_H) * view.scale).round().max(1.0);
    let x = f32::from(origin.x) + view.col * f32::from(CELL_W) + (f32::from(TILE_W) - w) / 2.0;
    let y = f32::from(origin.y) + view.row * f32::from(CELL_H) + (f32::from(TILE_H) - h) / 2.0;
    Rect {
        x: x.round() as u16,
        y: y.round() as u16,
        width: w as u16,
        height: h as u16,
    }
}

fn draw_tile(frame: &mut Frame, origin: Rect, view: &TileView) {
    let rect = tile_rect(origin, view);
    let clipped = rect.intersection(origin);
    if clipped.is_empty() {
        return;
    }
    let bg = blend(tile_color(view.value), Color::White, view.flash * FLASH_STRENGTH);
    frame.buffer_mut().set_style(clipped, Style::default().bg(bg));

    let label = view.value.to_string();
    if clipped != rect || (label.len() as u16) > rect.width {
        return;
    }
    let style = Style::default()
        .fg(tile_text_color(view.value))
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let lx = rect.x + (rect.width - label.len() as u16) / 2;
    let ly = rect.y + rect.height / 2;
    frame.buffer_mut().set_string(lx, ly, label, style);
}

/// Linear mix of two RGB colours; non-RGB colours are returned unchanged.
fn blend(from: Color, to: Color, t: f32) -> Color {
    match (from, to) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        (Color::Rgb(r, g, b), Color::White) => blend(Color::Rgb(r, g, b), Color::Rgb(255, 255, 255), t),
        _ => from,
    }
}

fn draw_sidebar(frame: &mut Frame, state: &DrawState, area: Rect) {
    let theme = state.theme;
    let game = state.game;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Stats (border + 7 lines)
            Constraint::Length(1), // gap
            Constraint::Length(10), // Keys
        ])
        .split(area);

    let grid = game.grid();
    let history = game.history();
    let spawned = game
        .last_spawned_cell()
        .map_or_else(|| "-".to_string(), |cell| cell.to_string());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<10}"), title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats_lines = vec![
        stat("Best", grid.max_value().unwrap_or(0).to_string()),
        stat("Sum", grid.value_sum().to_string()),
        stat("Tiles", format!("{}/{}", grid.tile_count(), grid.rows() * grid.columns())),
        stat("Turn", game.turns_played().to_string()),
        stat("Undo", history.undo_depth().to_string()),
        stat("Redo", history.redo_depth().to_string()),
        stat("Spawned", spawned),
    ];
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Stats ", title_style));
    Paragraph::new(Text::from(stats_lines))
        .block(stats_block)
        .render(chunks[0], frame.buffer_mut());

    let key = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{keys:<12}"), fg_style),
            Span::styled(what, dim_style),
        ])
    };
    let key_lines = vec![
        key("←↓↑→", "slide"),
        key("hjkl wasd", "slide"),
        key("u ^Z", "undo"),
        key("U ^Y ^R", "redo"),
        key("r", "restart"),
        key("q Esc", "menu"),
    ];
    let keys_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Keys ", title_style));
    Paragraph::new(Text::from(key_lines))
        .block(keys_block)
        .render(chunks[2], frame.buffer_mut());
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_no_moves_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 34, 5);
    frame
        .buffer_mut()
        .set_style(popup, Style::default().bg(theme.bg));
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " No moves left ",
            Style::default()
                .fg(Color::Black)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "u Undo   r Restart   q Menu",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered_popup(frame.area(), 24, 8);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title).bg(theme.bg))
        .title(" Quit? ");
    frame
        .buffer_mut()
        .set_style(quit_rect, Style::default().bg(theme.bg));
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    for (i, opt) in QuitOption::ALL.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let label = format!(" {} ", opt.label());
        let row = Rect {
            y: inner.y + 1 + i as u16 * 2,
            height: 1,
            ..inner
        }
        .intersection(inner);
        Paragraph::new(Span::styled(label, style))
            .alignment(Alignment::Center)
            .render(row, frame.buffer_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::grid::TileGrid;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render(screen: Screen, game: &mut GameController) -> String {
        let mut scene = Scene::new(false);
        scene.apply_events(game.take_events(), false, Instant::now());
        let theme = Theme::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let state = DrawState {
            screen,
            game: &*game,
            scene: &scene,
            theme: &theme,
            quit_selected: QuitOption::Restart,
            now: Instant::now(),
        };
        terminal
            .draw(|f| draw(f, &state, &mut None, &mut None))
            .unwrap();
        screen_text(&terminal)
    }

    fn game() -> GameController {
        let mut grid = TileGrid::new(4, 4);
        grid.add_tile(crate::grid::Cell::new(0, 0), 2048).unwrap();
        grid.add_tile(crate::grid::Cell::new(3, 3), 2).unwrap();
        GameController::with_grid(grid, StdRng::seed_from_u64(1), &GameConfig::default())
    }

    #[test]
    fn board_shows_tile_values_and_stats() {
        let text = render(Screen::Playing, &mut game());
        assert!(text.contains("2048"));
        assert!(text.contains("mergetui"));
        assert!(text.contains("Stats"));
        assert!(text.contains("2/16"));
    }

    #[test]
    fn overlays_render_their_labels() {
        assert!(render(Screen::NoMoves, &mut game()).contains("No moves left"));
        let quit = render(Screen::QuitMenu, &mut game());
        assert!(quit.contains("Resume") && quit.contains("Restart") && quit.contains("Exit"));
    }

    #[test]
    fn scaled_tile_stays_centred_in_its_cell() {
        let origin = Rect::new(10, 5, 40, 20);
        let full = TileView { row: 1.0, col: 2.0, scale: 1.0, value: 2, flash: 0.0 };
        assert_eq!(tile_rect(origin, &full), Rect::new(26, 9, TILE_W, TILE_H));
        let half = TileView { scale: 0.5, ..full };
        let r = tile_rect(origin, &half);
        assert!(r.width < TILE_W && r.x > 26);
    }

    #[test]
    fn flash_blends_toward_white() {
        assert_eq!(blend(Color::Rgb(0, 100, 200), Color::White, 0.0), Color::Rgb(0, 100, 200));
        assert_eq!(blend(Color::Rgb(0, 0, 0), Color::White, 1.0), Color::Rgb(255, 255, 255));
    }
}
