use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::{fmt, ui};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    render_filter_bar(frame, app, chunks[0]);

    if app.discover.profiles.is_empty() {
        frame.render_widget(
            Paragraph::new(" Nobody here right now. Widen your filters or check back later.")
                .style(Style::default().fg(Color::DarkGray)),
            chunks[1],
        );
        return;
    }

    let viewer_location = app
        .client
        .auth
        .current_profile()
        .and_then(|profile| profile.location);

    let items: Vec<ListItem> = app
        .discover
        .profiles
        .iter()
        .map(|profile| {
            let place = match (&viewer_location, &profile.location) {
                (Some(mine), Some(theirs)) if !profile.hide_precise_distance => {
                    fmt::distance_label(mine.distance_km(theirs))
                }
                _ => profile.city.clone(),
            };

            let mut heading = vec![
                Span::styled(
                    profile.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {} · {}", ui::gender_label(profile.gender), place),
                    Style::default().fg(Color::DarkGray),
                ),
            ];

            if profile.competitive {
                heading.push(Span::styled(
                    "  competitive",
                    Style::default().fg(Color::Red),
                ));
            }

            ListItem::new(vec![
                Line::from(heading),
                Line::from(Span::styled(
                    format!("  {}", fmt::preview(&profile.bio, 70)),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .highlight_symbol("› ")
        .highlight_style(Style::default().fg(Color::Green));

    let mut state = ListState::default();
    state.select(Some(
        app.discover.cursor.min(app.discover.profiles.len() - 1),
    ));

    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_filter_bar(frame: &mut Frame, app: &App, area: Rect) {
    let gender = app
        .discover
        .gender
        .map(ui::gender_label)
        .unwrap_or("anyone");

    let activity = if app.discover.editing_filter {
        ui::input_text(app.discover.activity_query.trim_start())
    } else if app.discover.activity_query.trim().is_empty() {
        "any".to_string()
    } else {
        app.discover.activity_query.trim().to_string()
    };

    let line = Line::from(vec![
        Span::raw(" Showing: "),
        Span::styled(gender, Style::default().fg(Color::Cyan)),
        Span::raw("  ·  Activity: "),
        Span::styled(activity, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  ·  Page {}", app.discover.page + 1),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}
