use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::App;
use crate::{fmt, ui};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(profile) = app.client.auth.current_profile() else {
        frame.render_widget(
            Paragraph::new(" No profile loaded.").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    };

    let card = ui::centered(area, 72, 24);

    let mut heading = vec![Span::styled(
        profile.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    if profile.is_premium {
        heading.push(Span::styled(
            "  ★ Premium",
            Style::default().fg(Color::Yellow),
        ));
    }

    let mut lines = vec![
        Line::from(heading),
        Line::from(Span::styled(
            format!("{} · {}", ui::gender_label(profile.gender), profile.city),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(profile.bio.clone()),
        Line::from(""),
    ];

    if app.my_activities.is_empty() {
        lines.push(Line::from(Span::styled(
            "No activities on your profile yet.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Plays",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for activity in &app.my_activities {
            lines.push(Line::from(format!("  {}", activity)));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Search radius: {} km",
        profile.distance_radius_km
    )));

    let play_times = if profile.typical_play_times.is_empty() {
        "not set".to_string()
    } else {
        profile.typical_play_times.join(", ")
    };
    lines.push(Line::from(format!("Usually plays: {}", play_times)));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Privacy",
        Style::default().add_modifier(Modifier::BOLD),
    )));

    let toggles = [
        ("d", "Hide precise distance", profile.hide_precise_distance),
        ("l", "Hide last active", profile.hide_last_active),
        ("p", "Private profile", profile.private_profile),
    ];

    for (key, label, on) in toggles {
        lines.push(Line::from(vec![
            Span::raw(format!("  {} {}  ", if on { "[x]" } else { "[ ]" }, label)),
            Span::styled(format!("({})", key), Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Member since {}", fmt::day_label(profile.created_at)),
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Your profile ")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        card,
    );
}
