use chrono::DateTime;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(skill) = &app.selected_skill else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Skill Detail ");
        let paragraph = Paragraph::new("No skill selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Header info
            Constraint::Min(0),    // Progress
        ])
        .split(area);

    draw_header(f, app, skill, chunks[0]);
    draw_status(f, app, skill, chunks[1]);
}

fn draw_header(f: &mut Frame, app: &App, skill: &crate::models::Skill, area: Rect) {
    let text = vec![
        Line::from(vec![
            Span::styled("Category: ", Style::default().fg(Color::Gray)),
            Span::styled(
                app.category_title(skill.category_id),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Watch: ", Style::default().fg(Color::Gray)),
            Span::styled(&skill.video_url, Style::default().fg(Color::White)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", skill.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_status(f: &mut Frame, app: &App, skill: &crate::models::Skill, area: Rect) {
    let learned_at = app
        .learned
        .iter()
        .find(|l| l.skill_id == skill.id)
        .map(|l| format_date(&l.learned_at));

    let mut text = vec![Line::from(vec![
        Span::styled("Quiz questions: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", app.selected_skill_questions),
            Style::default().fg(Color::White),
        ),
    ])];

    match learned_at {
        Some(date) => text.push(Line::from(vec![
            Span::styled("Learned: ", Style::default().fg(Color::Gray)),
            Span::styled(date, Style::default().fg(Color::Green)),
        ])),
        None => text.push(Line::from(vec![
            Span::styled("Not learned yet. ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("Run 'micromastery learn {}' to take the quiz.", skill.id),
                Style::default().fg(Color::Yellow),
            ),
        ])),
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Status ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d, %Y").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}
