//! App: terminal init, main loop and key handling.

use crate::GameConfig;
use crate::controller::{GameController, TurnOutcome};
use crate::input::{Action, key_to_action};
use crate::scene::Scene;
use crate::theme::Theme;
use crate::ui::{self, DrawState};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::{Effect, Interpolation, fx};
use tracing::{debug, info};

/// Frame budget while something is animating (~60 FPS).
const FRAME: Duration = Duration::from_millis(16);
/// Poll timeout while idle.
const IDLE_POLL: Duration = Duration::from_millis(250);
/// New game fade-in over the board.
const NEW_GAME_FADE_MS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    /// The grid is full and nothing can merge. Undo and restart still work.
    NoMoves,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

impl QuitOption {
    pub const ALL: [QuitOption; 3] = [QuitOption::Resume, QuitOption::Restart, QuitOption::Exit];

    pub fn label(self) -> &'static str {
        match self {
            QuitOption::Resume => "Resume",
            QuitOption::Restart => "Restart",
            QuitOption::Exit => "Exit",
        }
    }

    fn next(self) -> Self {
        match self {
            QuitOption::Resume => QuitOption::Restart,
            QuitOption::Restart => QuitOption::Exit,
            QuitOption::Exit => QuitOption::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            QuitOption::Resume => QuitOption::Exit,
            QuitOption::Restart => QuitOption::Resume,
            QuitOption::Exit => QuitOption::Restart,
        }
    }
}

/// Whether the loop keeps running after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    game: GameController,
    scene: Scene,
    screen: Screen,
    quit_selected: QuitOption,
    /// Screen the quit menu returns to on Resume.
    screen_before_quit: Screen,
    /// Turns fire on key release when the terminal reports release events.
    fire_on_release: bool,
    /// TachyonFX fade-in over the board on a new game.
    board_effect: Option<Effect>,
    /// Last time we processed the board effect (for delta).
    board_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let game = GameController::new(&config);
        let scene = Scene::new(config.animate);
        let mut app = Self {
            config,
            theme,
            game,
            scene,
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            screen_before_quit: Screen::Playing,
            fire_on_release: false,
            board_effect: None,
            board_effect_process_time: None,
        };
        app.new_game()?;
        Ok(app)
    }

    fn new_game(&mut self) -> Result<()> {
        let outcome = self.game.start().context("failed to start a new game")?;
        self.scene.reset();
        self.present(&outcome, Instant::now());
        self.screen = Screen::Playing;
        if self.config.animate {
            self.board_effect = Some(fx::fade_from(
                self.theme.bg,
                self.theme.bg,
                (NEW_GAME_FADE_MS, Interpolation::QuadOut),
            ));
            self.board_effect_process_time = None;
        }
        Ok(())
    }

    /// Hand the grid's queued events to the scene.
    fn present(&mut self, outcome: &TurnOutcome, now: Instant) {
        let events = self.game.take_events();
        self.scene.apply_events(events, outcome.has_slides(), now);
    }

    fn after_turn(&mut self, outcome: &TurnOutcome) {
        self.present(outcome, Instant::now());
        self.screen = if self.game.has_moves() {
            Screen::Playing
        } else {
            info!(turn = self.game.turns_played(), "no moves left");
            Screen::NoMoves
        };
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let a turn fire once per physical key press.
        self.fire_on_release = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        info!(fire_on_release = self.fire_on_release, "terminal ready");

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        if self.fire_on_release {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let state = DrawState {
                screen: self.screen,
                game: &self.game,
                scene: &self.scene,
                theme: &self.theme,
                quit_selected: self.quit_selected,
                now,
            };
            terminal.draw(|f| {
                ui::draw(
                    f,
                    &state,
                    &mut self.board_effect,
                    &mut self.board_effect_process_time,
                )
            })?;

            if self.board_effect.as_ref().is_some_and(|e| e.done()) {
                self.board_effect = None;
                self.board_effect_process_time = None;
            }

            let busy = self.board_effect.is_some() || self.scene.is_animating(now);
            let timeout = if busy {
                FRAME.saturating_sub(now.elapsed())
            } else {
                IDLE_POLL
            };

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if !self.accepts(&key) {
                            continue;
                        }
                        if self.handle_action(key_to_action(key))? == Flow::Exit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Only one event kind per physical key triggers an action.
    fn accepts(&self, key: &KeyEvent) -> bool {
        if self.fire_on_release {
            key.kind == KeyEventKind::Release
        } else {
            key.kind == KeyEventKind::Press
        }
    }

    fn handle_action(&mut self, action: Action) -> Result<Flow> {
        match self.screen {
            Screen::Playing | Screen::NoMoves => self.handle_game_action(action),
            Screen::QuitMenu => self.handle_quit_menu(action),
        }
    }

    fn handle_game_action(&mut self, action: Action) -> Result<Flow> {
        let outcome = match action {
            Action::Slide(direction) if self.screen == Screen::Playing => {
                self.game.process_move(direction)?
            }
            Action::Undo => self.game.undo()?,
            Action::Redo => self.game.redo()?,
            Action::Restart => {
                info!("restart");
                self.new_game()?;
                return Ok(Flow::Continue);
            }
            Action::Quit => {
                self.screen_before_quit = self.screen;
                self.screen = Screen::QuitMenu;
                self.quit_selected = QuitOption::Resume;
                return Ok(Flow::Continue);
            }
            _ => return Ok(Flow::Continue),
        };
        if outcome.changed {
            self.after_turn(&outcome);
        }
        Ok(Flow::Continue)
    }

    fn handle_quit_menu(&mut self, action: Action) -> Result<Flow> {
        use crate::controller::Direction;
        match action {
            Action::Slide(Direction::Down | Direction::Right) => {
                self.quit_selected = self.quit_selected.next();
            }
            Action::Slide(Direction::Up | Direction::Left) => {
                self.quit_selected = self.quit_selected.prev();
            }
            Action::Confirm => match self.quit_selected {
                QuitOption::Resume => self.screen = self.screen_before_quit,
                QuitOption::Restart => self.new_game()?,
                QuitOption::Exit => {
                    info!(turns = self.game.turns_played(), "exit");
                    return Ok(Flow::Exit);
                }
            },
            Action::Quit => self.screen = self.screen_before_quit,
            Action::Restart => self.new_game()?,
            other => debug!(?other, "ignored in quit menu"),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Direction;
    use crate::grid::TileGrid;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn app() -> App {
        let config = GameConfig {
            seed: Some(7),
            animate: false,
            ..GameConfig::default()
        };
        App::new(config, Theme::default()).unwrap()
    }

    #[test]
    fn new_app_starts_playing_with_opening_tiles() {
        let app = app();
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.game.grid().tile_count(), 4);
        assert!(app.board_effect.is_none());
    }

    #[test]
    fn quit_menu_cycles_and_resumes() {
        let mut app = app();
        app.handle_action(Action::Quit).unwrap();
        assert_eq!(app.screen, Screen::QuitMenu);
        app.handle_action(Action::Slide(Direction::Up)).unwrap();
        assert_eq!(app.quit_selected, QuitOption::Exit);
        app.handle_action(Action::Slide(Direction::Down)).unwrap();
        assert_eq!(app.quit_selected, QuitOption::Resume);
        app.handle_action(Action::Confirm).unwrap();
        assert_eq!(app.screen, Screen::Playing);
    }

    #[test]
    fn exit_option_stops_the_loop() {
        let mut app = app();
        app.handle_action(Action::Quit).unwrap();
        app.handle_action(Action::Slide(Direction::Left)).unwrap();
        assert_eq!(app.handle_action(Action::Confirm).unwrap(), Flow::Exit);
    }

    #[test]
    fn slides_are_ignored_in_quit_menu_but_navigate_it() {
        let mut app = app();
        let before = app.game.grid().snapshot();
        app.handle_action(Action::Quit).unwrap();
        app.handle_action(Action::Slide(Direction::Right)).unwrap();
        assert_eq!(app.game.grid().snapshot(), before);
        assert_eq!(app.quit_selected, QuitOption::Restart);
    }

    #[test]
    fn restart_clears_history() {
        let mut app = app();
        for direction in [Direction::Left, Direction::Up, Direction::Right, Direction::Down] {
            app.handle_action(Action::Slide(direction)).unwrap();
        }
        app.handle_action(Action::Restart).unwrap();
        assert_eq!(app.game.history().undo_depth(), 0);
        assert_eq!(app.game.turns_played(), 0);
        assert_eq!(app.game.grid().tile_count(), 4);
    }

    #[test]
    fn undo_from_no_moves_returns_to_play() {
        let mut app = app();
        // Sliding right fills the last cell with a 2 or 4 next to 8 and 32.
        app.game = GameController::with_grid(
            TileGrid::from_rows(&[&[8, 16], &[32, 0]]),
            StdRng::seed_from_u64(3),
            &app.config,
        );
        app.scene.reset();
        app.handle_action(Action::Slide(Direction::Right)).unwrap();
        assert_eq!(app.screen, Screen::NoMoves);
        assert_eq!(app.game.grid().tile_count(), 4);

        let locked = app.game.grid().snapshot();
        app.handle_action(Action::Slide(Direction::Left)).unwrap();
        assert_eq!(app.game.grid().snapshot(), locked);

        app.handle_action(Action::Undo).unwrap();
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.game.grid().snapshot(), vec![vec![Some(8), Some(16)], vec![Some(32), None]]);
    }
}
