mod alerts;
mod discover;
mod onboarding;
mod profile;
mod rooms;
mod signin;
mod thread;

use std::io::{self, Stdout};

use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use kickabout_core::Gender;

use crate::app::{App, MainTab, Route};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn init_terminal() -> io::Result<Tui> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    Terminal::new(CrosstermBackend::new(stdout))
}

pub fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)?;

    Ok(())
}

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match app.route {
        Route::SignIn => signin::render_email(frame, app, chunks[1]),
        Route::EnterCode => signin::render_code(frame, app, chunks[1]),
        Route::OAuthCallback => signin::render_callback(frame, app, chunks[1]),
        Route::Onboarding => onboarding::render(frame, app, chunks[1]),
        Route::Main => match app.tab {
            MainTab::Discover => discover::render(frame, app, chunks[1]),
            MainTab::Rooms => rooms::render(frame, app, chunks[1]),
            MainTab::Alerts => alerts::render(frame, app, chunks[1]),
            MainTab::Profile => profile::render(frame, app, chunks[1]),
        },
        Route::Thread => thread::render(frame, app, chunks[1]),
    }

    render_status(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(
            " Kickabout ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
    ];

    if app.route == Route::Main {
        for (index, tab) in MainTab::ALL.iter().enumerate() {
            let unread = app.total_unread();
            let title = if *tab == MainTab::Rooms && unread > 0 {
                format!(" {} {} ({}) ", index + 1, tab.title(), unread)
            } else {
                format!(" {} {} ", index + 1, tab.title())
            };

            let style = if *tab == app.tab {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            spans.push(Span::styled(title, style));
            spans.push(Span::raw(" "));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(message) => Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(Span::styled(
            format!(" {}", key_hints(app)),
            Style::default().fg(Color::DarkGray),
        )),
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn key_hints(app: &App) -> &'static str {
    match app.route {
        Route::SignIn => "Enter send code · Ctrl+G Google · Ctrl+F Facebook · Esc quit",
        Route::EnterCode => "Enter verify · r resend · Esc back",
        Route::OAuthCallback => "Paste the callback link, then Enter · Esc back",
        Route::Onboarding => "Enter next step · Esc previous step",
        Route::Main => match app.tab {
            MainTab::Discover => "↑↓ select · Enter chat · g gender · / activity · n/p page · q quit",
            MainTab::Rooms => "↑↓ select · Enter open · r refresh · Tab switch tab · q quit",
            MainTab::Alerts => "↑↓ select · Enter open chat · r refresh · q quit",
            MainTab::Profile => "d distance · l last active · p private · o sign out · q quit",
        },
        Route::Thread => "Enter send · PgUp older · ↑↓ scroll · Esc back",
    }
}

/// A centered card inside the given area
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);

    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// An input value with a visible caret
pub(crate) fn input_text(value: &str) -> String {
    format!("{}█", value)
}

pub(crate) fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Male",
        Gender::Female => "Female",
        Gender::Other => "Non-binary",
    }
}
