use chrono::DateTime;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::achievements;
use crate::models;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Profile + achievements row
            Constraint::Min(0),    // Recent completions
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_profile(f, app, top_chunks[0]);
    draw_achievements(f, app, top_chunks[1]);
    draw_recent_completions(f, app, chunks[1]);
}

fn draw_profile(f: &mut Frame, app: &App, area: Rect) {
    let profile = &app.profile;
    let streak_color = if profile.streak > 0 {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Skills learnt: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", profile.skills_learnt),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" / {}", app.stats.total_skills),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled("Level: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", profile.level),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!("  ({} XP into level)", models::level_progress(profile.points)),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled("Points: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", profile.points),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Streak: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} days", profile.streak),
                Style::default().fg(streak_color),
            ),
        ]),
        Line::from(vec![
            Span::styled("Friends: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", app.stats.friends),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" @{} ", profile.username))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_achievements(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .unlocked
        .iter()
        .filter_map(|id| achievements::find(*id))
        .map(|a| {
            ListItem::new(Line::from(vec![
                Span::styled(a.title, Style::default().fg(Color::Yellow)),
                Span::raw("  "),
                Span::styled(a.description, Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let title = format!(" Achievements ({}/{}) ", app.unlocked.len(), achievements::CATALOG.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Yellow));

    if items.is_empty() {
        let paragraph = Paragraph::new("No achievements yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn draw_recent_completions(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .learned
        .iter()
        .take(10)
        .map(|s| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", format_date(&s.learned_at)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<32}", truncate(&s.skill_title, 30)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    truncate(&s.category_title, 20),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let title = if app.learned.is_empty() {
        " Learned Skills (none) ".to_string()
    } else {
        format!(" Learned Skills ({}) ", app.learned.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Magenta));

    if items.is_empty() {
        let paragraph = Paragraph::new("No skills learnt yet...we all start somewhere!")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}
