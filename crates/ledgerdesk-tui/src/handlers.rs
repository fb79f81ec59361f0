//! Keyboard event handling.

use crate::app::{App, AppState, InputMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ledgerdesk_core::{FieldKind, Resource};

/// Handle a key event. Returns true if the app should quit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    // Ctrl+C always quits
    if ctrl(&key, 'c') {
        app.state = AppState::Quit;
        return true;
    }

    match app.input_mode {
        InputMode::Login => handle_login_key(app, key),
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Dialog => handle_dialog_key(app, key),
        InputMode::Picker => handle_picker_key(app, key),
    }
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn handle_login_key(app: &mut App, key: KeyEvent) -> bool {
    if app.logging_in {
        return false;
    }
    match key.code {
        KeyCode::Enter => {
            app.login();
            false
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.toggle_login_field();
            false
        }
        KeyCode::Char(c) => {
            app.login_input().push(c);
            false
        }
        KeyCode::Backspace => {
            app.login_input().pop();
            false
        }
        KeyCode::Esc => {
            app.state = AppState::Quit;
            true
        }
        _ => false,
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) -> bool {
    if ctrl(&key, 'l') {
        app.logout();
        return false;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quit;
            true
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            false
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            false
        }
        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
            app.next_resource();
            false
        }
        KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
            app.prev_resource();
            false
        }
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.switch_to(Resource::ALL[index]);
            false
        }
        KeyCode::Char('n') => {
            app.open_create();
            false
        }
        KeyCode::Char('r') => {
            app.reload();
            false
        }
        KeyCode::Enter => {
            app.open_selected();
            false
        }
        _ => false,
    }
}

fn handle_dialog_key(app: &mut App, key: KeyEvent) -> bool {
    if ctrl(&key, 's') {
        app.submit();
        return false;
    }
    if ctrl(&key, 'd') {
        app.request_delete();
        return false;
    }
    if key.code == KeyCode::Esc {
        app.dismiss();
        return false;
    }
    // The draft is frozen while a request is in flight.
    if app.controller().is_busy() {
        return false;
    }

    let is_reference = app
        .current_field()
        .is_some_and(|f| matches!(f.kind, FieldKind::Reference(_)));

    match key.code {
        KeyCode::Down | KeyCode::Tab => app.next_field(),
        KeyCode::Up | KeyCode::BackTab => app.prev_field(),
        KeyCode::Enter if is_reference => app.open_picker(),
        KeyCode::Enter => app.next_field(),
        KeyCode::Delete => app.clear_current_field(),
        KeyCode::Char(c) if is_reference => {
            app.open_picker();
            if let Some(picker) = app.picker.as_mut() {
                picker.query.push(c);
            }
            app.refilter_picker();
        }
        KeyCode::Char(c) => app.field_input.push(c),
        KeyCode::Backspace if is_reference => app.clear_current_field(),
        KeyCode::Backspace => {
            app.field_input.pop();
        }
        _ => {}
    }
    false
}

fn handle_picker_key(app: &mut App, key: KeyEvent) -> bool {
    let Some(picker) = app.picker.as_mut() else {
        app.input_mode = InputMode::Dialog;
        return false;
    };

    match key.code {
        KeyCode::Esc => app.close_picker(),
        KeyCode::Enter => app.choose_picked(),
        KeyCode::Up => picker.move_up(),
        KeyCode::Down => picker.move_down(),
        KeyCode::Char(c) => {
            picker.query.push(c);
            app.refilter_picker();
        }
        KeyCode::Backspace => {
            picker.query.pop();
            app.refilter_picker();
        }
        _ => {}
    }
    false
}
