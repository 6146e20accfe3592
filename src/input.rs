//! Key and mouse bindings. Keys: normal and vim-style; mouse: left button drags.

use crate::interaction::{PointerEvent, PointerKind};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Pick up the piece in tray slot 0..3.
    Select(usize),
    Left,
    Right,
    Up,
    Down,
    /// Drop the aimed piece, or confirm a pending reset.
    Place,
    /// Put the held piece back, or decline a pending reset.
    Cancel,
    Reset,
    Yes,
    No,
    Quit,
    None,
}

/// Map key event to an action. Arrows and hjkl both move the aimed piece.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Char(c @ '1'..='3') => Action::Select(c as usize - '1' as usize),
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Place,
        KeyCode::Char('r') => Action::Reset,
        KeyCode::Char('y') => Action::Yes,
        KeyCode::Char('n') => Action::No,
        _ => Action::None,
    }
}

/// Left-button press/drag/release and buttonless motion become pointer events; the rest is ignored.
pub fn mouse_to_pointer(mouse: MouseEvent) -> Option<PointerEvent> {
    let kind = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
        MouseEventKind::Drag(MouseButton::Left) => PointerKind::Move,
        MouseEventKind::Moved => PointerKind::Hover,
        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
        _ => return None,
    };
    Some(PointerEvent::new(kind, mouse.column, mouse.row))
}
