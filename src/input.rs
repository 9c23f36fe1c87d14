use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Refresh,
    Select,
    Back,
}

pub fn map_key(key: KeyEvent) -> Option<Action> {
    if is_quit(key) {
        return Some(Action::Quit);
    }

    match key.code {
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Char('r') if key.modifiers.is_empty() => Some(Action::Refresh),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Char('l') if key.modifiers.is_empty() => Some(Action::Select),
        KeyCode::Char('h') if key.modifiers.is_empty() => Some(Action::Back),
        _ => None,
    }
}

/// Quit and back are the only keys the log view keeps for itself.
pub fn map_log_key(key: KeyEvent) -> Option<Action> {
    if is_quit(key) {
        return Some(Action::Quit);
    }

    match key.code {
        KeyCode::Char('h') if key.modifiers.is_empty() => Some(Action::Back),
        _ => None,
    }
}

fn is_quit(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => key.modifiers.is_empty(),
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
