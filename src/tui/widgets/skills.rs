use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = if let Some(filter) = &app.filter_text {
        format!(" Skills (filter: {}) ", filter)
    } else {
        " Skills ".to_string()
    };

    let items: Vec<ListItem> = app
        .skills
        .items
        .iter()
        .map(|skill| {
            let learned = app.is_learned(skill.id);
            let (marker, marker_color) = if learned {
                ("learned", Color::Green)
            } else {
                ("-", Color::DarkGray)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<36}", truncate(&skill.title, 34)),
                    Style::default().fg(if learned {
                        Color::DarkGray
                    } else {
                        Color::White
                    }),
                ),
                Span::styled(
                    format!("{:<20}", truncate(app.category_title(skill.category_id), 18)),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(marker, Style::default().fg(marker_color)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    // Header
    let header = Line::from(vec![
        Span::styled(
            format!("{:<36}", "Title"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{:<20}", "Category"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "Status",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.skills.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(ratatui::widgets::Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}
