use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;

use kickabout_client::{WizardStatus, WizardStep};

use crate::app::{App, PersonalField};
use crate::ui;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let card = ui::centered(area, 72, 22);

    let step = app.wizard.step();
    let title = format!(
        " Step {} of {} · {} ",
        step.number(),
        WizardStep::COUNT,
        step.title()
    );

    let mut lines = match step {
        WizardStep::PersonalInfo => personal_lines(app),
        WizardStep::Activities => activity_lines(app),
        WizardStep::Preferences => preference_lines(app),
    };

    match app.wizard.status() {
        WizardStatus::Submitting => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Saving your profile…",
                Style::default().fg(Color::Cyan),
            )));
        }
        WizardStatus::Failed(reason) => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Could not save: {}", reason),
                Style::default().fg(Color::Red),
            )));
        }
        _ => {}
    }

    if !app.wizard_errors.is_empty() {
        lines.push(Line::from(""));
        for message in &app.wizard_errors {
            lines.push(Line::from(Span::styled(
                format!("• {}", message),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .padding(Padding::uniform(1));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        card,
    );
}

fn personal_lines(app: &App) -> Vec<Line<'static>> {
    let form = &app.wizard.personal;

    let mut lines = vec![
        Line::from("Tell the people around you who you are."),
        Line::from(""),
    ];

    for field in PersonalField::ALL {
        let is_text = matches!(
            field,
            PersonalField::Name | PersonalField::Bio | PersonalField::City | PersonalField::Avatar
        );

        let value = match field {
            PersonalField::Name => form.name.clone(),
            PersonalField::Gender => form
                .gender
                .map(ui::gender_label)
                .unwrap_or("←/→ to choose")
                .to_string(),
            PersonalField::Bio => form.bio.clone(),
            PersonalField::City => form.city.clone(),
            PersonalField::Avatar => form.avatar_path.clone(),
            PersonalField::Radius => format!("{} km  (←/→ to adjust)", form.distance_radius_km),
        };

        let active = field == app.personal_field;
        let value = if active && is_text {
            ui::input_text(&value)
        } else {
            value
        };

        let label_style = if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {:<20}", if active { "›" } else { " " }, field.label()),
                label_style,
            ),
            Span::raw(value),
        ]));
    }

    lines
}

fn activity_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from("Space selects an activity, ←/→ sets how many usually play."),
        Line::from(""),
    ];

    if app.catalog.is_empty() {
        lines.push(Line::from(Span::styled(
            "No activities available.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for (index, activity) in app.catalog.iter().enumerate() {
        let selected = app.wizard.activities.is_selected(activity);
        let active = index == app.catalog_cursor;

        let players = app
            .wizard
            .activities
            .selections
            .iter()
            .find(|form| form.activity.id == activity.id)
            .map(|form| format!("  · {} players", form.player_count))
            .unwrap_or_default();

        let style = if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else if selected {
            Style::default()
        } else {
            Style::default().fg(Color::Gray)
        };

        lines.push(Line::from(Span::styled(
            format!(
                "{} {} {}{}",
                if active { "›" } else { " " },
                if selected { "[x]" } else { "[ ]" },
                activity.name,
                players
            ),
            style,
        )));
    }

    lines
}

fn preference_lines(app: &App) -> Vec<Line<'static>> {
    let form = &app.wizard.preferences;
    let rows = [
        ("Men", form.prefers_male),
        ("Women", form.prefers_female),
        ("Non-binary people", form.prefers_nonbinary),
    ];

    let mut lines = vec![
        Line::from("Who would you like to play with? Space toggles."),
        Line::from(""),
    ];

    for (index, (label, on)) in rows.iter().enumerate() {
        let active = index == app.preference_cursor;
        let style = if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        lines.push(Line::from(Span::styled(
            format!(
                "{} {} {}",
                if active { "›" } else { " " },
                if *on { "[x]" } else { "[ ]" },
                label
            ),
            style,
        )));
    }

    lines
}
