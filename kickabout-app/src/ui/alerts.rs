use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use kickabout_client::NotificationKind;

use crate::app::App;
use crate::fmt;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.alerts.is_empty() {
        frame.render_widget(
            Paragraph::new(" You are all caught up.").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .alerts
        .iter()
        .map(|alert| {
            let icon = match alert.kind {
                NotificationKind::Message => "✉",
                NotificationKind::System => "•",
            };

            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} {}", icon, alert.title),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", fmt::timestamp(alert.at)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("  {}", alert.body),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .highlight_symbol("› ")
        .highlight_style(Style::default().fg(Color::Green));

    let mut state = ListState::default();
    state.select(Some(app.alerts_cursor.min(app.alerts.len() - 1)));

    frame.render_stateful_widget(list, area, &mut state);
}
