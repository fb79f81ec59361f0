//! UI rendering with Ratatui.

use crate::app::{App, AppState, InputMode, LoginField};
use ledgerdesk_core::{ControllerState, FieldDef, Mode, MutationKind, NoticeLevel, Resource};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

/// Main render function.
pub fn render(frame: &mut Frame, app: &App) {
    match app.state {
        AppState::Login => render_login(frame, app),
        AppState::Main => render_main(frame, app),
        AppState::Quit => {}
    }
}

/// Render the login form.
fn render_login(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let dialog_area = centered_rect(50, 10, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Ledgerdesk - Sign in ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let masked = "*".repeat(app.password.chars().count());
    render_login_input(frame, "Username", &app.username, app.login_field == LoginField::Username, chunks[0]);
    render_login_input(frame, "Password", &masked, app.login_field == LoginField::Password, chunks[1]);

    let hint = if app.logging_in {
        Paragraph::new("Signing in...").style(Style::default().fg(Color::Yellow))
    } else {
        Paragraph::new("Enter: sign in | Tab: switch field | Esc: quit")
            .style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(hint, chunks[3]);

    render_notice(frame, app, chunks[4]);
}

fn render_login_input(frame: &mut Frame, label: &str, value: &str, focused: bool, area: Rect) {
    let (marker, color) = if focused { ("▸ ", Color::Yellow) } else { ("  ", Color::White) };
    let cursor = if focused { "_" } else { "" };
    let line = Line::from(vec![
        Span::styled(format!("{marker}{label}: "), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{value}{cursor}"), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the resource pages with sidebar, table and notice strip.
fn render_main(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(20)])
        .split(rows[0]);

    render_sidebar(frame, app, columns[0]);
    render_table(frame, app, columns[1]);
    render_notice(frame, app, rows[1]);

    let help = match app.input_mode {
        InputMode::Dialog => "↑/↓: field | Enter: pick reference | Del: clear | Ctrl+S: save | Ctrl+D: delete | Esc: close",
        InputMode::Picker => "Type to filter | ↑/↓: move | Enter: choose | Esc: back",
        _ => "Tab/1-5: page | ↑/↓: select | Enter: edit | n: new | r: reload | Ctrl+L: log out | q: quit",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );

    if matches!(app.input_mode, InputMode::Dialog | InputMode::Picker) {
        render_dialog(frame, app, area);
    }
    if app.input_mode == InputMode::Picker {
        render_picker(frame, app, area);
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Ledgerdesk ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let items: Vec<ListItem> = Resource::ALL
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            let style = if *resource == app.active {
                Style::default()
                    .bg(Color::Rgb(60, 60, 80))
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };
            ListItem::new(Line::from(format!(" {} {}", i + 1, resource.plural_label()))).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

fn status_text(state: ControllerState, stale: bool) -> Option<String> {
    let text = match state {
        ControllerState::Loading => "loading...".to_string(),
        ControllerState::Submitting(kind) => format!("{}...", verb(kind)),
        ControllerState::Refreshing(_) => "refreshing...".to_string(),
        ControllerState::Listing | ControllerState::DialogOpen(_) if stale => {
            "list may be out of date, press r".to_string()
        }
        ControllerState::Listing | ControllerState::DialogOpen(_) => return None,
    };
    Some(text)
}

fn verb(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Create => "saving",
        MutationKind::Update => "updating",
        MutationKind::Delete => "deleting",
    }
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let controller = app.controller();
    let schema = controller.schema();

    let mut title = format!(" {} ({}) ", app.active.plural_label(), controller.records().len());
    if let Some(status) = status_text(controller.state(), controller.is_stale()) {
        title.push_str(&format!("- {status} "));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }));

    if controller.records().is_empty() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let message = if controller.is_loaded() {
            "Nothing here yet. Press n to add one."
        } else {
            "Not loaded."
        };
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            centered_rect(inner.width, 1, inner),
        );
        return;
    }

    let header = Row::new(schema.fields.iter().map(|f| Cell::from(f.label)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows = controller.records().iter().map(|record| {
        Row::new(
            schema
                .fields
                .iter()
                .map(|f| Cell::from(record.get(f.name).display())),
        )
    });

    let widths: Vec<Constraint> = schema.fields.iter().map(column_width).collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(60, 60, 80))
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default().with_selected(Some(app.selected_row));
    frame.render_stateful_widget(table, area, &mut state);
}

fn column_width(field: &FieldDef) -> Constraint {
    match field.name {
        "description" => Constraint::Min(16),
        "amount" | "salary" | "income_amount" | "expense_amount" => Constraint::Length(12),
        _ => Constraint::Length(14),
    }
}

/// Latest notice, colored by level.
fn render_notice(frame: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = app.notices.latest() else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::White,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    frame.render_widget(
        Paragraph::new(notice.message)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true }),
        area,
    );
}

/// Render the create/edit dialog over the table.
fn render_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let controller = app.controller();
    let Some(draft) = controller.draft() else {
        return;
    };
    let schema = controller.schema();

    let height = (schema.fields.len() as u16 + 4).min(area.height.saturating_sub(2));
    let dialog_area = centered_rect(64.min(area.width.saturating_sub(4)), height, area);
    frame.render_widget(Clear, dialog_area);

    let mut title = match controller.mode() {
        Mode::Edit => format!(" Edit {} ", schema.label),
        _ => format!(" New {} ", schema.label),
    };
    if let Some(status) = status_text(controller.state(), false) {
        title.push_str(&format!("- {status} "));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let focused = app.current_field().map(|f| f.name);
    let lines: Vec<Line> = schema
        .fields
        .iter()
        .filter(|f| f.editable || controller.mode() == Mode::Edit)
        .map(|field| {
            let marker = if field.required { "*" } else { " " };
            let label = Span::styled(
                format!("{:>14}{marker} ", field.label),
                Style::default().fg(Color::DarkGray),
            );
            if !field.editable {
                let value = controller
                    .edit_target()
                    .map(|t| t.get(field.name).display())
                    .unwrap_or_default();
                return Line::from(vec![label, Span::styled(value, Style::default().fg(Color::DarkGray))]);
            }
            if Some(field.name) == focused {
                Line::from(vec![
                    label,
                    Span::styled(
                        format!("{}_", app.field_input),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from(vec![
                    label,
                    Span::styled(draft.get(field.name).display(), Style::default().fg(Color::White)),
                ])
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render the reference picker.
fn render_picker(frame: &mut Frame, app: &App, area: Rect) {
    let Some(picker) = app.picker.as_ref() else {
        return;
    };

    let dialog_width = 50.min(area.width.saturating_sub(4));
    let dialog_height = 14.min(area.height.saturating_sub(4));
    let dialog_area = centered_rect(dialog_width, dialog_height, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(format!(" Choose {} ", picker.target.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let input_line = Line::from(vec![
        Span::styled("▸ ", Style::default().fg(Color::Magenta)),
        Span::styled(picker.query.as_str(), Style::default().fg(Color::White)),
        Span::styled("_", Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if picker.matches.is_empty() {
        let no_results = Paragraph::new("No matches")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(no_results, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = picker
        .matches
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let style = if i == picker.selected {
                Style::default()
                    .bg(Color::Rgb(60, 40, 80))
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(option.label.as_str())).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), chunks[1]);
}

/// Helper to create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_controller_state() {
        assert_eq!(status_text(ControllerState::Listing, false), None);
        assert_eq!(
            status_text(ControllerState::Submitting(MutationKind::Delete), false).as_deref(),
            Some("deleting...")
        );
        assert!(status_text(ControllerState::Listing, true).unwrap().contains("press r"));
    }

    #[test]
    fn centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(50, 4, area);
        assert_eq!(rect.width, 20);
        assert_eq!(rect.y, 3);
    }
}
