use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;

use kickabout_backend::DEMO_EMAIL;

use crate::app::App;
use crate::ui;

pub fn render_email(frame: &mut Frame, app: &App, area: Rect) {
    let card = ui::centered(area, 60, 13);

    let mut lines = vec![
        Line::from("Sign in with your email address."),
        Line::from(""),
        Line::from(vec![
            Span::raw("Email: "),
            Span::styled(
                ui::input_text(&app.email_input),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "We will send you a six digit code. No password needed.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    if app.is_demo() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Demo backend: try {}", DEMO_EMAIL),
            Style::default().fg(Color::Cyan),
        )));
    }

    let block = Block::default()
        .title(" Welcome to Kickabout ")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        card,
    );
}

pub fn render_code(frame: &mut Frame, app: &App, area: Rect) {
    let card = ui::centered(area, 60, 13);

    let resend = match app.client.auth.resend_available_in() {
        Some(wait) => format!("You can resend in {}s", wait.as_secs().max(1)),
        None => "Press r to resend the code".to_string(),
    };

    let mut lines = vec![
        Line::from(format!("We sent a code to {}.", app.email_input.trim())),
        Line::from(""),
        Line::from(vec![
            Span::raw("Code: "),
            Span::styled(
                ui::input_text(&app.code_input),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(resend, Style::default().fg(Color::DarkGray))),
    ];

    if let Some(code) = &app.demo_code {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Demo backend: your code is {}", code),
            Style::default().fg(Color::Cyan),
        )));
    }

    let block = Block::default()
        .title(" Check your email ")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        card,
    );
}

pub fn render_callback(frame: &mut Frame, app: &App, area: Rect) {
    let card = ui::centered(area, 72, 14);

    let url = app.oauth_url.clone().unwrap_or_default();

    let lines = vec![
        Line::from("Open this link in your browser to sign in:"),
        Line::from(""),
        Line::from(Span::styled(
            url,
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from("Then paste the link you were redirected back to:"),
        Line::from(""),
        Line::from(vec![
            Span::raw("Callback: "),
            Span::styled(
                ui::input_text(&app.callback_input),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    let block = Block::default()
        .title(" External sign in ")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        card,
    );
}
