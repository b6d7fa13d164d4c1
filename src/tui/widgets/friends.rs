use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Friends
            Constraint::Length(7), // Pending requests
        ])
        .split(area);

    draw_friends(f, app, chunks[0]);
    draw_pending(f, app, chunks[1]);
}

fn draw_friends(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .friends
        .iter()
        .map(|friend| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<24}", truncate(&friend.username, 22)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("Level {:<4}", friend.level),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{} XP", models::level_progress(friend.points)),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let title = if app.friends.is_empty() {
        " My Friends (none) ".to_string()
    } else {
        format!(" My Friends ({}) ", app.friends.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    if items.is_empty() {
        let paragraph = Paragraph::new("You have no friends yet. Try 'micromastery friends search <name>'.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn draw_pending(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .pending
        .iter()
        .take(4)
        .map(|req| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("#{:<5}", req.id),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(&req.sender_username, Style::default().fg(Color::White)),
                Span::styled(
                    format!(
                        "  (accept with 'micromastery friends accept {}')",
                        req.id
                    ),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let title = if app.pending.is_empty() {
        " Friend Requests (none) ".to_string()
    } else {
        format!(" Friend Requests ({}) ", app.pending.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Yellow));

    if items.is_empty() {
        let paragraph = Paragraph::new("No friend requests at the moment.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}
