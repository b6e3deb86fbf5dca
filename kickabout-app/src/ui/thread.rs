use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use kickabout_core::MessageId;

use crate::app::App;
use crate::{fmt, ui};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(room) = &app.thread else {
        frame.render_widget(Paragraph::new(" No chat open."), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let mut header = vec![Span::styled(
        format!(" {}", room.other_name()),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    if let Some(profile) = room.other_profile() {
        header.push(Span::styled(
            format!("  {}", profile.city),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if room.is_loading() {
        header.push(Span::styled(
            "  loading…",
            Style::default().fg(Color::Cyan),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    render_messages(frame, app, chunks[1]);

    let compose = Line::from(vec![
        Span::styled(" > ", Style::default().fg(Color::Green)),
        Span::raw(ui::input_text(&app.compose)),
    ]);
    frame.render_widget(Paragraph::new(compose), chunks[2]);
}

fn render_messages(frame: &mut Frame, app: &App, area: Rect) {
    let Some(room) = &app.thread else {
        return;
    };

    let viewer = app.client.context().current_user();
    let messages = room.messages();

    let mut lines = Vec::new();

    if room.has_more() {
        lines.push(
            Line::from(Span::styled(
                "· · ·  PgUp loads older messages  · · ·",
                Style::default().fg(Color::DarkGray),
            ))
            .centered(),
        );
    }

    if messages.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(" Say hi to {}!", room.other_name()),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let mut last_day: Option<String> = None;
    for message in &messages {
        let day = fmt::day_label(message.created_at);
        if last_day.as_ref() != Some(&day) {
            lines.push(
                Line::from(Span::styled(
                    format!("· {} ·", day),
                    Style::default().fg(Color::DarkGray),
                ))
                .centered(),
            );
            last_day = Some(day);
        }

        let own = viewer == Some(message.sender_id);
        let pending = matches!(message.id, MessageId::Local(_));

        let name_style = if own {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD)
        };

        let mut spans = vec![
            Span::styled(
                format!(" {} ", fmt::clock(message.created_at)),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!(
                    "{}: ",
                    if own {
                        "You".to_string()
                    } else {
                        room.other_name()
                    }
                ),
                name_style,
            ),
            Span::raw(message.content.clone()),
        ];

        if own {
            let mark = if pending {
                " …"
            } else if message.is_read {
                " ✓✓"
            } else {
                " ✓"
            };
            spans.push(Span::styled(
                mark.to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        }

        let line = Line::from(spans);
        lines.push(if pending {
            line.style(Style::default().fg(Color::DarkGray))
        } else {
            line
        });
    }

    // Pinned to the bottom: scroll is measured in lines up from the newest
    // message
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total = paragraph.line_count(area.width) as u16;
    let max_scroll = total.saturating_sub(area.height);
    let offset = max_scroll.saturating_sub(app.thread_scroll.min(max_scroll));

    frame.render_widget(paragraph.scroll((offset, 0)), area);
}
