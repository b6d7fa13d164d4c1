use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::mystery::MysteryStatus;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Mystery Challenge ")
        .title_style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        );

    let mut text: Vec<Line> = match &app.mystery {
        Some(MysteryStatus::Active {
            skill,
            refreshes_left,
        }) => vec![
            Line::from(vec![
                Span::styled("Today's skill: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    &skill.title,
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Watch: ", Style::default().fg(Color::Gray)),
                Span::styled(&skill.video_url, Style::default().fg(Color::White)),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Refreshes left today: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{}", refreshes_left),
                    Style::default().fg(if *refreshes_left > 0 {
                        Color::Green
                    } else {
                        Color::Red
                    }),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "Take the quiz from the shell: micromastery mystery take (skill {})",
                    skill.id
                ),
                Style::default().fg(Color::Yellow),
            )),
        ],

        Some(MysteryStatus::Cooldown { until }) => {
            // The poll loop redraws often enough to act as the countdown tick
            let remaining = (*until - Utc::now()).num_seconds().max(0);
            let h = remaining / 3600;
            let m = (remaining % 3600) / 60;
            let s = remaining % 60;

            vec![
                Line::from(Span::styled(
                    "You've completed today's mystery challenge!",
                    Style::default().fg(Color::Green),
                )),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Next challenge in: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        format!("{}h {}m {}s", h, m, s),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
            ]
        }

        Some(MysteryStatus::Exhausted) => vec![Line::from(Span::styled(
            "No more mystery skills available. Please try again tomorrow.",
            Style::default().fg(Color::Red),
        ))],

        None => vec![Line::from(Span::styled(
            "Loading mystery challenge...",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    if let Some(notice) = &app.mystery_notice {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
