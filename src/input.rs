//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions. Adding a new keybinding is
//! a single match arm in [`handle_key_event`].
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in the status bar drawn by [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{App, Focus};

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action. An open notice swallows
/// the key that dismisses it; a pending disconnect prompt only listens for
/// `y` / `n`.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.notice.is_some() {
        app.dismiss_notice();
        return;
    }

    if app.pending_disconnect.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_disconnect(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_disconnect(false),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('r') => app.request_refresh(),
        KeyCode::Char('c') if app.focus == Focus::Accounts => app.activate_account(),
        KeyCode::Char('d') if app.focus == Focus::Accounts => app.request_disconnect(),
        KeyCode::Enter => match app.focus {
            Focus::Accounts => app.activate_account(),
            Focus::Feed => open_selected_link(app),
        },
        _ => {}
    }
}

fn open_selected_link(app: &mut App) {
    let Some(link) = app.selected_link().map(str::to_owned) else {
        app.status = "Selected update has no link".into();
        return;
    };
    if !(link.starts_with("https://") || link.starts_with("http://")) {
        tracing::warn!(link = %link, "Refusing to open non-HTTP link");
        app.status = "Refusing to open non-HTTP link".into();
        return;
    }
    match open::that(&link) {
        Ok(()) => app.status = "Opened link in browser".into(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open link");
            app.status = format!("Failed to open link: {e}");
        }
    }
}
