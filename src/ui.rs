//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a three-row split: the account panel, the scrollable
//!   update feed, and a one-line status bar. A notice, when present, is
//!   drawn as a centred popup on top.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::account::ConnectionState;
use crate::app::{App, Focus};
use crate::provider::Provider;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let accounts_height = app.session.accounts().len() as u16 + 2;
    let [accounts_area, feed_area, status_area] = Layout::vertical([
        Constraint::Length(accounts_height),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_accounts(app, frame, accounts_area);
    draw_feed_list(app, frame, feed_area);
    draw_status_bar(app, frame, status_area);

    if app.notice.is_some() {
        draw_notice(app, frame);
    }
}

fn provider_color(provider: Provider) -> Color {
    match provider {
        Provider::Facebook => Color::Blue,
        Provider::Instagram => Color::Magenta,
    }
}

fn panel_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn highlight() -> Style {
    Style::default()
        .add_modifier(Modifier::BOLD)
        .bg(Color::DarkGray)
}

/// Render the account list with connection state.
fn draw_accounts(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = app
        .session
        .accounts()
        .iter()
        .map(|account| {
            let (label, color) = match account.state() {
                ConnectionState::Connected => ("Connected", Color::Green),
                ConnectionState::Connecting => ("Connecting…", Color::Yellow),
                ConnectionState::Disconnected => ("Not connected", Color::DarkGray),
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", account.provider.label()),
                    Style::default().fg(provider_color(account.provider)),
                ),
                Span::raw(" "),
                Span::styled(format!("{:<24}", account.name), Style::default().fg(Color::White)),
                Span::styled(label, Style::default().fg(color)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(" Accounts ", app.focus == Focus::Accounts))
        .highlight_style(highlight())
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.accounts_state);
}

/// Render the scrollable update feed.
fn draw_feed_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .session
        .feed()
        .iter()
        .map(|update| {
            let line = Line::from(vec![
                Span::styled(
                    format!("{:<10}", update.time),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
                Span::styled(&update.message, Style::default().fg(Color::White)),
                Span::raw("  "),
                Span::styled(
                    format!("[{}]", update.account),
                    Style::default().fg(provider_color(update.provider)),
                ),
            ]);

            ListItem::new(line)
        })
        .collect();

    let title = if app.refreshing {
        " Updates (refreshing…) "
    } else {
        " Updates "
    };
    let list = List::new(list_items)
        .block(panel_block(title, app.focus == Focus::Feed))
        .highlight_style(highlight())
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.feed_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} updates", app.session.feed().len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  Tab: focus  c: connect  d: disconnect  r: refresh  Enter: open"),
    ]));
    frame.render_widget(status, area);
}

/// Render the active notice as a centred popup.
fn draw_notice(app: &App, frame: &mut Frame) {
    let Some(notice) = &app.notice else {
        return;
    };

    let [row] = Layout::vertical([Constraint::Length(7)])
        .flex(Flex::Center)
        .areas(frame.area());
    let [area] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(row);

    let body = Paragraph::new(vec![
        Line::from(notice.body.as_str()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(format!(" {} ", notice.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(body, area);
}
