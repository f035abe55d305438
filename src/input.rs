//! Key bindings: arrows, vim (hjkl) and wasd, plus undo/redo chords.

use crate::controller::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Slide(Direction),
    Undo,
    Redo,
    Restart,
    /// Open the quit menu (or close it).
    Quit,
    /// Select the highlighted menu entry.
    Confirm,
    None,
}

/// Map key event to action. Supports arrows, vim (hjkl) and wasd.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('z') | KeyCode::Char('Z') if ctrl && modifiers.contains(KeyModifiers::SHIFT) => {
            Action::Redo
        }
        KeyCode::Char('z') if ctrl => Action::Undo,
        KeyCode::Char('y') | KeyCode::Char('r') if ctrl => Action::Redo,
        KeyCode::Char('c') if ctrl => Action::Quit,
        _ if !no_mod => Action::None,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('w') => Action::Slide(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('s') => Action::Slide(Direction::Down),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('a') => Action::Slide(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('d') => Action::Slide(Direction::Right),
        KeyCode::Char('u') => Action::Undo,
        KeyCode::Char('U') => Action::Redo,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Confirm,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn arrows_vim_and_wasd_slide() {
        for (code, dir) in [
            (KeyCode::Left, Direction::Left),
            (KeyCode::Char('l'), Direction::Right),
            (KeyCode::Char('w'), Direction::Up),
            (KeyCode::Char('j'), Direction::Down),
        ] {
            assert_eq!(key_to_action(key(code, KeyModifiers::NONE)), Action::Slide(dir));
        }
    }

    #[test]
    fn undo_redo_chords() {
        assert_eq!(key_to_action(key(KeyCode::Char('z'), KeyModifiers::CONTROL)), Action::Undo);
        assert_eq!(
            key_to_action(key(KeyCode::Char('Z'), KeyModifiers::CONTROL | KeyModifiers::SHIFT)),
            Action::Redo
        );
        assert_eq!(key_to_action(key(KeyCode::Char('y'), KeyModifiers::CONTROL)), Action::Redo);
        assert_eq!(key_to_action(key(KeyCode::Char('u'), KeyModifiers::NONE)), Action::Undo);
        assert_eq!(key_to_action(key(KeyCode::Char('U'), KeyModifiers::SHIFT)), Action::Redo);
    }

    #[test]
    fn other_modifiers_are_ignored() {
        assert_eq!(key_to_action(key(KeyCode::Left, KeyModifiers::ALT)), Action::None);
        assert_eq!(key_to_action(key(KeyCode::Char('x'), KeyModifiers::NONE)), Action::None);
    }
}
