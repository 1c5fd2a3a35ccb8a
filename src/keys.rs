use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    CursorUp,
    CursorDown,
    ScrollUp,
    ScrollDown,
    JumpTop,
    JumpBottom,
    PlaySelection,
    TogglePause,
    SeekBackward,
    SeekForward,
    VolumeDown,
    VolumeUp,
    Previous,
    Next,
    ToggleAutoplay,
    Shuffle,
}

impl Command {
    pub const ALL: [Command; 17] = [
        Command::Quit,
        Command::CursorUp,
        Command::CursorDown,
        Command::ScrollUp,
        Command::ScrollDown,
        Command::JumpTop,
        Command::JumpBottom,
        Command::PlaySelection,
        Command::TogglePause,
        Command::SeekBackward,
        Command::SeekForward,
        Command::VolumeDown,
        Command::VolumeUp,
        Command::Previous,
        Command::Next,
        Command::ToggleAutoplay,
        Command::Shuffle,
    ];
}

/// Only presses are mapped; releases and repeats yield `None`.
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Command::Quit),
            KeyCode::Char('y') => Some(Command::ScrollUp),
            KeyCode::Char('e') => Some(Command::ScrollDown),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Command::Quit),
        KeyCode::Char('k') | KeyCode::Up => Some(Command::CursorUp),
        KeyCode::Char('j') | KeyCode::Down => Some(Command::CursorDown),
        KeyCode::Char('g') | KeyCode::Home => Some(Command::JumpTop),
        KeyCode::Char('G') | KeyCode::End => Some(Command::JumpBottom),
        KeyCode::Enter => Some(Command::PlaySelection),
        KeyCode::Char(' ') | KeyCode::Char('p') => Some(Command::TogglePause),
        KeyCode::Char('h') | KeyCode::Left => Some(Command::SeekBackward),
        KeyCode::Char('l') | KeyCode::Right => Some(Command::SeekForward),
        KeyCode::Char('-') => Some(Command::VolumeDown),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Command::VolumeUp),
        KeyCode::Char('b') => Some(Command::Previous),
        KeyCode::Char('n') => Some(Command::Next),
        KeyCode::Char('a') => Some(Command::ToggleAutoplay),
        KeyCode::Char('s') => Some(Command::Shuffle),
        _ => None,
    }
}
