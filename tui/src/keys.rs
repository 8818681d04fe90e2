//! crossterm key events to dashboard keys

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use monitor_core::Key;

/// Translate a local key event; releases, repeats and unmapped keys give `None`
#[must_use]
pub fn translate(event: KeyEvent) -> Option<Key> {
    // Only handle Press events (not Release or Repeat)
    if event.kind != KeyEventKind::Press {
        return None;
    }
    let key = match event.code {
        KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Key::Ctrl(c.to_ascii_lowercase())
        }
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Esc => Key::Esc,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_ctrl_c_is_interrupt() {
        let event = press(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate(event), Some(Key::INTERRUPT));
    }

    #[test]
    fn test_shifted_char_passes_through() {
        let event = press(KeyCode::Char('E'), KeyModifiers::SHIFT);
        assert_eq!(translate(event), Some(Key::Char('E')));
    }

    #[test]
    fn test_release_ignored() {
        let event = KeyEvent {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(translate(event), None);
    }

    #[test]
    fn test_page_keys() {
        assert_eq!(translate(press(KeyCode::PageUp, KeyModifiers::NONE)), Some(Key::PageUp));
        assert_eq!(translate(press(KeyCode::PageDown, KeyModifiers::NONE)), Some(Key::PageDown));
    }

    #[test]
    fn test_function_keys_unmapped() {
        assert_eq!(translate(press(KeyCode::F(5), KeyModifiers::NONE)), None);
    }
}
