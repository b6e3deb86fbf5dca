use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::fmt;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let summaries = app.room_summaries();

    if summaries.is_empty() {
        frame.render_widget(
            Paragraph::new(" No chats yet. Find someone on the Discover tab and say hi.")
                .style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let header = format!(
        " {} chats · {} unread{}",
        summaries.len(),
        app.total_unread(),
        if app.rooms_stale() { " · updating…" } else { "" }
    );

    frame.render_widget(
        Paragraph::new(header).style(Style::default().fg(Color::DarkGray)),
        chunks[0],
    );

    let items: Vec<ListItem> = summaries
        .iter()
        .map(|room| {
            let when = room.last_message_at.map(fmt::timestamp).unwrap_or_default();
            let last = room.last_message_content.as_deref().unwrap_or("Say hi!");

            let mut title = vec![Span::styled(
                room.other_user_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )];

            if room.unread_count > 0 {
                title.push(Span::styled(
                    format!("  ● {}", room.unread_count),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ));
            }

            title.push(Span::styled(
                format!("  {}", when),
                Style::default().fg(Color::DarkGray),
            ));

            let preview_style = if room.unread_count > 0 {
                Style::default()
            } else {
                Style::default().fg(Color::Gray)
            };

            ListItem::new(vec![
                Line::from(title),
                Line::from(Span::styled(
                    format!("  {}", fmt::preview(last, 70)),
                    preview_style,
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .highlight_symbol("› ")
        .highlight_style(Style::default().fg(Color::Green));

    let mut state = ListState::default();
    state.select(Some(app.rooms_cursor.min(summaries.len() - 1)));

    frame.render_stateful_widget(list, chunks[1], &mut state);
}
