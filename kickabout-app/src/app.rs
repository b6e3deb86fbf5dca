use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::info;
use tokio::runtime::Runtime;

use kickabout_backend::MemoryBackend;
use kickabout_client::{
    error_messages, Advance, ChatRoom, Client, ClientEvent, EventReceiver, Notification,
    RoomList, SessionManager, SetupSubmission, SetupWizard, SignIn, WizardStep,
};
use kickabout_core::{
    Activity, BackendError, DiscoveryFilter, Gender, OAuthProvider, Profile, ProfileUpdate,
    RoomSummary, UserId,
};

use crate::{fmt, ui};

/// Which screen the app is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    EnterCode,
    OAuthCallback,
    Onboarding,
    Main,
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainTab {
    Discover,
    Rooms,
    Alerts,
    Profile,
}

/// The rows of the personal info step, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    Name,
    Gender,
    Bio,
    City,
    Avatar,
    Radius,
}

#[derive(Debug, Default)]
pub struct DiscoverState {
    pub profiles: Vec<Profile>,
    pub cursor: usize,
    pub page: usize,
    pub gender: Option<Gender>,
    pub activity_query: String,
    pub editing_filter: bool,
}

enum PrivacyToggle {
    PreciseDistance,
    LastActive,
    PrivateProfile,
}

/// All state the terminal app carries between frames.
///
/// Every async call goes through the runtime handle passed into the key
/// handlers, so the app itself stays synchronous.
pub struct App {
    pub running: bool,
    pub route: Route,
    pub status: Option<String>,

    pub client: Client,
    events: EventReceiver,
    /// Present when running against the in-process backend. Used to surface
    /// the one-time code no email would otherwise deliver.
    demo: Option<Arc<MemoryBackend>>,

    pub email_input: String,
    pub code_input: String,
    pub demo_code: Option<String>,
    pub oauth_url: Option<String>,
    pub callback_input: String,

    pub wizard: SetupWizard,
    pub wizard_errors: Vec<String>,
    pub catalog: Vec<Activity>,
    pub catalog_cursor: usize,
    pub personal_field: PersonalField,
    pub preference_cursor: usize,

    pub tab: MainTab,
    pub discover: DiscoverState,
    pub rooms: Option<Arc<RoomList>>,
    pub rooms_cursor: usize,
    pub alerts: Vec<Notification>,
    pub alerts_cursor: usize,
    pub my_activities: Vec<String>,

    pub thread: Option<Arc<ChatRoom>>,
    pub compose: String,
    pub thread_scroll: u16,
}

impl App {
    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(client: Client, events: EventReceiver, demo: Option<Arc<MemoryBackend>>) -> Self {
        Self {
            running: true,
            route: Route::SignIn,
            status: None,
            client,
            events,
            demo,
            email_input: String::new(),
            code_input: String::new(),
            demo_code: None,
            oauth_url: None,
            callback_input: String::new(),
            wizard: SetupWizard::new(),
            wizard_errors: Vec::new(),
            catalog: Vec::new(),
            catalog_cursor: 0,
            personal_field: PersonalField::Name,
            preference_cursor: 0,
            tab: MainTab::Discover,
            discover: DiscoverState::default(),
            rooms: None,
            rooms_cursor: 0,
            alerts: Vec::new(),
            alerts_cursor: 0,
            my_activities: Vec::new(),
            thread: None,
            compose: String::new(),
            thread_scroll: 0,
        }
    }

    /// Routes past sign in when a stored session was restored at launch
    pub fn resume(&mut self, restored: Option<SignIn>, runtime: &Runtime) {
        match restored {
            Some(sign_in) if sign_in.needs_onboarding => self.enter_onboarding(runtime),
            Some(_) => self.enter_main(runtime),
            None => {}
        }
    }

    pub fn run(&mut self, terminal: &mut ui::Tui, runtime: &Runtime) -> io::Result<()> {
        info!("App started");

        while self.running {
            self.drain_events(runtime);

            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Self::POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key, runtime)
                    }
                    Event::Paste(text) => self.handle_paste(&text),
                    _ => {}
                }
            }
        }

        info!("App stopped");
        Ok(())
    }

    pub fn is_demo(&self) -> bool {
        self.demo.is_some()
    }

    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .as_ref()
            .map(|rooms| rooms.current())
            .unwrap_or_default()
    }

    pub fn rooms_stale(&self) -> bool {
        self.rooms.as_ref().is_some_and(|rooms| rooms.is_stale())
    }

    pub fn total_unread(&self) -> u32 {
        self.rooms
            .as_ref()
            .map(|rooms| rooms.total_unread())
            .unwrap_or(0)
    }

    fn drain_events(&mut self, runtime: &Runtime) {
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event, runtime);
        }
    }

    fn apply_event(&mut self, event: ClientEvent, runtime: &Runtime) {
        match event {
            ClientEvent::SessionExpired => {
                self.reset_to_sign_in();
                self.status = Some("Your session expired, sign in again".to_string());
            }
            ClientEvent::SessionChanged { session: None } => {
                let signed_out_screens =
                    matches!(self.route, Route::SignIn | Route::EnterCode | Route::OAuthCallback);

                if !signed_out_screens {
                    self.reset_to_sign_in();
                }
            }
            ClientEvent::SessionChanged { .. } | ClientEvent::ProfileUpdated { .. } => {}
            ClientEvent::MessageReceived { room_id, message } => {
                let viewing = self.thread.as_ref().is_some_and(|room| room.id() == room_id);

                if !viewing {
                    self.status =
                        Some(format!("New message: {}", fmt::preview(&message.content, 50)));
                }
            }
            ClientEvent::RoomListChanged => self.refresh_rooms(runtime),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }

        // A keypress dismisses the last toast
        self.status = None;

        match self.route {
            Route::SignIn => self.handle_sign_in_key(key, runtime),
            Route::EnterCode => self.handle_code_key(key, runtime),
            Route::OAuthCallback => self.handle_callback_key(key, runtime),
            Route::Onboarding => self.handle_onboarding_key(key, runtime),
            Route::Main => self.handle_main_key(key, runtime),
            Route::Thread => self.handle_thread_key(key, runtime),
        }
    }

    fn handle_paste(&mut self, text: &str) {
        match self.route {
            Route::SignIn => self.email_input.push_str(text.trim()),
            Route::EnterCode => {
                for c in text.chars().filter(|c| c.is_ascii_digit()) {
                    if self.code_input.len() < SessionManager::OTP_LENGTH {
                        self.code_input.push(c);
                    }
                }
            }
            Route::OAuthCallback => self.callback_input.push_str(text.trim()),
            Route::Onboarding => {
                if self.wizard.step() == WizardStep::PersonalInfo {
                    if let Some(field) = self.active_text_field() {
                        field.push_str(text);
                    }
                }
            }
            Route::Main => {
                if self.tab == MainTab::Discover && self.discover.editing_filter {
                    self.discover.activity_query.push_str(text);
                }
            }
            Route::Thread => self.compose.push_str(text),
        }
    }

    fn handle_sign_in_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Enter => {
                match runtime.block_on(self.client.auth.request_code(&self.email_input)) {
                    Ok(()) => {
                        self.code_input.clear();
                        self.refresh_demo_code();
                        self.route = Route::EnterCode;
                    }
                    Err(error) => self.status = Some(error.to_string()),
                }
            }
            KeyCode::Char('g') if ctrl => self.begin_oauth(OAuthProvider::Google, runtime),
            KeyCode::Char('f') if ctrl => self.begin_oauth(OAuthProvider::Facebook, runtime),
            KeyCode::Char(c) if !ctrl => self.email_input.push(c),
            KeyCode::Backspace => {
                self.email_input.pop();
            }
            KeyCode::Esc => self.running = false,
            _ => {}
        }
    }

    fn handle_code_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        match key.code {
            KeyCode::Enter => {
                let email = self.email_input.clone();
                let code = self.code_input.clone();

                match runtime.block_on(self.client.auth.verify_code(&email, &code)) {
                    Ok(sign_in) => self.finish_sign_in(sign_in, runtime),
                    Err(error) => self.status = Some(error.to_string()),
                }
            }
            KeyCode::Char('r') => self.resend_code(runtime),
            KeyCode::Char(c)
                if c.is_ascii_digit() && self.code_input.len() < SessionManager::OTP_LENGTH =>
            {
                self.code_input.push(c)
            }
            KeyCode::Backspace => {
                self.code_input.pop();
            }
            KeyCode::Esc => self.route = Route::SignIn,
            _ => {}
        }
    }

    fn handle_callback_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Enter => {
                let callback = self.callback_input.clone();

                match runtime.block_on(self.client.auth.oauth_complete(&callback)) {
                    Ok(sign_in) => self.finish_sign_in(sign_in, runtime),
                    Err(error) => self.status = Some(error.to_string()),
                }
            }
            KeyCode::Char(c) if !ctrl => self.callback_input.push(c),
            KeyCode::Backspace => {
                self.callback_input.pop();
            }
            KeyCode::Esc => self.route = Route::SignIn,
            _ => {}
        }
    }

    fn begin_oauth(&mut self, provider: OAuthProvider, runtime: &Runtime) {
        match runtime.block_on(self.client.auth.oauth_begin(provider)) {
            Ok(url) => {
                self.oauth_url = Some(url);
                self.callback_input.clear();
                self.route = Route::OAuthCallback;
            }
            Err(error) => self.status = Some(error.to_string()),
        }
    }

    fn resend_code(&mut self, runtime: &Runtime) {
        match runtime.block_on(self.client.auth.request_code(&self.email_input)) {
            Ok(()) => {
                self.refresh_demo_code();
                self.status = Some("A new code is on its way".to_string());
            }
            Err(error) => self.status = Some(error.to_string()),
        }
    }

    fn refresh_demo_code(&mut self) {
        let email = self.email_input.trim().to_lowercase();

        self.demo_code = self
            .demo
            .as_ref()
            .and_then(|backend| backend.issued_code(&email));
    }

    fn finish_sign_in(&mut self, sign_in: SignIn, runtime: &Runtime) {
        if sign_in.needs_onboarding {
            self.enter_onboarding(runtime);
        } else {
            self.enter_main(runtime);
        }
    }

    fn enter_onboarding(&mut self, runtime: &Runtime) {
        self.wizard = SetupWizard::new();
        self.wizard_errors.clear();
        self.personal_field = PersonalField::Name;
        self.catalog_cursor = 0;
        self.preference_cursor = 0;

        match runtime.block_on(self.client.activities.search("", 0)) {
            Ok(catalog) => self.catalog = catalog,
            Err(error) => {
                self.catalog = Vec::new();
                self.report_failure("Could not load activities", &error);
            }
        }

        self.route = Route::Onboarding;
    }

    fn enter_main(&mut self, runtime: &Runtime) {
        self.route = Route::Main;
        self.tab = MainTab::Discover;
        self.load_discover(runtime);

        match runtime.block_on(self.client.chats.watch_rooms()) {
            Ok(rooms) => self.rooms = Some(rooms),
            Err(error) => self.report_failure("Could not open chats", &error),
        }

        self.load_alerts(runtime);
    }

    fn handle_onboarding_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        match key.code {
            KeyCode::Enter => {
                self.wizard_advance(runtime);
                return;
            }
            KeyCode::Esc => {
                self.wizard.back();
                self.wizard_errors.clear();
                return;
            }
            _ => {}
        }

        match self.wizard.step() {
            WizardStep::PersonalInfo => self.handle_personal_key(key),
            WizardStep::Activities => self.handle_activities_key(key),
            WizardStep::Preferences => self.handle_preferences_key(key),
        }
    }

    fn wizard_advance(&mut self, runtime: &Runtime) {
        match self.wizard.advance() {
            Ok(Advance::Moved(_)) => self.wizard_errors.clear(),
            Ok(Advance::ReadyToSubmit(submission)) => self.submit_profile(submission, runtime),
            Ok(Advance::Busy) => {}
            Err(errors) => self.wizard_errors = error_messages(&errors),
        }
    }

    fn submit_profile(&mut self, submission: SetupSubmission, runtime: &Runtime) {
        match runtime.block_on(self.client.profiles.create(submission)) {
            Ok(profile) => {
                info!("Profile created for {}", profile.name);
                self.wizard.complete();
                self.client.notifications.notify(
                    "Welcome to Kickabout",
                    "Your profile is live. Find someone to play with!",
                );
                self.enter_main(runtime);
            }
            Err(error) => {
                self.client.report(&error);
                self.wizard.fail(&error.to_string());
            }
        }
    }

    fn handle_personal_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Up => self.personal_field = self.personal_field.previous(),
            KeyCode::Down | KeyCode::Tab => self.personal_field = self.personal_field.next(),
            KeyCode::Left => self.adjust_personal(-1),
            KeyCode::Right => self.adjust_personal(1),
            KeyCode::Backspace => {
                if let Some(field) = self.active_text_field() {
                    field.pop();
                }
            }
            KeyCode::Char(c) if !ctrl => {
                if let Some(field) = self.active_text_field() {
                    field.push(c);
                }
            }
            _ => {}
        }
    }

    fn active_text_field(&mut self) -> Option<&mut String> {
        let form = &mut self.wizard.personal;

        match self.personal_field {
            PersonalField::Name => Some(&mut form.name),
            PersonalField::Bio => Some(&mut form.bio),
            PersonalField::City => Some(&mut form.city),
            PersonalField::Avatar => Some(&mut form.avatar_path),
            PersonalField::Gender | PersonalField::Radius => None,
        }
    }

    fn adjust_personal(&mut self, delta: i32) {
        let form = &mut self.wizard.personal;

        match self.personal_field {
            PersonalField::Gender => form.gender = Some(cycle_gender(form.gender, delta)),
            PersonalField::Radius => {
                form.distance_radius_km = form
                    .distance_radius_km
                    .saturating_add_signed(delta * 5)
                    .clamp(5, 200);
            }
            _ => {}
        }
    }

    fn handle_activities_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.catalog_cursor = self.catalog_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.catalog_cursor + 1 < self.catalog.len() {
                    self.catalog_cursor += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(activity) = self.catalog.get(self.catalog_cursor) {
                    self.wizard.activities.toggle(activity);
                }
            }
            KeyCode::Left | KeyCode::Char('-') => self.adjust_players(-1),
            KeyCode::Right | KeyCode::Char('+') => self.adjust_players(1),
            _ => {}
        }
    }

    fn adjust_players(&mut self, delta: i32) {
        if let Some(activity) = self.catalog.get(self.catalog_cursor) {
            self.wizard.activities.adjust_player_count(activity, delta);
        }
    }

    fn handle_preferences_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.preference_cursor = self.preference_cursor.saturating_sub(1),
            KeyCode::Down => self.preference_cursor = (self.preference_cursor + 1).min(2),
            KeyCode::Char(' ') => {
                let form = &mut self.wizard.preferences;

                match self.preference_cursor {
                    0 => form.prefers_male = !form.prefers_male,
                    1 => form.prefers_female = !form.prefers_female,
                    _ => form.prefers_nonbinary = !form.prefers_nonbinary,
                }
            }
            _ => {}
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        let typing = self.tab == MainTab::Discover && self.discover.editing_filter;

        if !typing {
            match key.code {
                KeyCode::Tab => return self.set_tab(self.tab.next(), runtime),
                KeyCode::BackTab => return self.set_tab(self.tab.previous(), runtime),
                KeyCode::Char('1') => return self.set_tab(MainTab::Discover, runtime),
                KeyCode::Char('2') => return self.set_tab(MainTab::Rooms, runtime),
                KeyCode::Char('3') => return self.set_tab(MainTab::Alerts, runtime),
                KeyCode::Char('4') => return self.set_tab(MainTab::Profile, runtime),
                KeyCode::Char('q') => {
                    self.running = false;
                    return;
                }
                _ => {}
            }
        }

        match self.tab {
            MainTab::Discover => self.handle_discover_key(key, runtime),
            MainTab::Rooms => self.handle_rooms_key(key, runtime),
            MainTab::Alerts => self.handle_alerts_key(key, runtime),
            MainTab::Profile => self.handle_profile_key(key, runtime),
        }
    }

    fn set_tab(&mut self, tab: MainTab, runtime: &Runtime) {
        self.tab = tab;

        match tab {
            MainTab::Alerts => self.load_alerts(runtime),
            MainTab::Rooms if self.rooms_stale() => self.refresh_rooms(runtime),
            MainTab::Profile => self.load_my_activities(runtime),
            _ => {}
        }
    }

    fn handle_discover_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if self.discover.editing_filter {
            match key.code {
                KeyCode::Enter => {
                    self.discover.editing_filter = false;
                    self.discover.page = 0;
                    self.load_discover(runtime);
                }
                KeyCode::Esc => self.discover.editing_filter = false,
                KeyCode::Backspace => {
                    self.discover.activity_query.pop();
                }
                KeyCode::Char(c) if !ctrl => self.discover.activity_query.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Up => self.discover.cursor = self.discover.cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.discover.cursor + 1 < self.discover.profiles.len() {
                    self.discover.cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(profile) = self.discover.profiles.get(self.discover.cursor) {
                    self.open_thread(profile.id, runtime);
                }
            }
            KeyCode::Char('g') => {
                self.discover.gender = cycle_gender_filter(self.discover.gender);
                self.discover.page = 0;
                self.load_discover(runtime);
            }
            KeyCode::Char('/') => self.discover.editing_filter = true,
            KeyCode::Char('n') => {
                self.discover.page += 1;
                self.load_discover(runtime);
            }
            KeyCode::Char('p') => {
                if self.discover.page > 0 {
                    self.discover.page -= 1;
                    self.load_discover(runtime);
                }
            }
            KeyCode::Char('r') => self.load_discover(runtime),
            _ => {}
        }
    }

    fn load_discover(&mut self, runtime: &Runtime) {
        let mut filter = self.discover.filter();
        if filter.max_distance_km.is_none() {
            filter.max_distance_km = self
                .client
                .auth
                .current_profile()
                .map(|profile| profile.distance_radius_km);
        }

        match runtime.block_on(self.client.discovery.browse(&filter, self.discover.page)) {
            Ok(profiles) => {
                self.discover.profiles = profiles;
                self.discover.cursor = 0;
            }
            Err(error) => self.report_failure("Could not load players", &error),
        }
    }

    fn handle_rooms_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        let count = self.room_summaries().len();

        match key.code {
            KeyCode::Up => self.rooms_cursor = self.rooms_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.rooms_cursor + 1 < count {
                    self.rooms_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(room) = self.room_summaries().get(self.rooms_cursor) {
                    self.open_thread(room.other_user_id, runtime);
                }
            }
            KeyCode::Char('r') => self.refresh_rooms(runtime),
            _ => {}
        }
    }

    fn refresh_rooms(&mut self, runtime: &Runtime) {
        let Some(rooms) = self.rooms.clone() else {
            return;
        };

        if let Err(error) = runtime.block_on(rooms.refresh()) {
            self.report_failure("Could not refresh chats", &error);
        }
    }

    fn handle_alerts_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        match key.code {
            KeyCode::Up => self.alerts_cursor = self.alerts_cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.alerts_cursor + 1 < self.alerts.len() {
                    self.alerts_cursor += 1;
                }
            }
            KeyCode::Enter => self.open_alert(runtime),
            KeyCode::Char('r') => self.load_alerts(runtime),
            _ => {}
        }
    }

    fn open_alert(&mut self, runtime: &Runtime) {
        let Some(room_id) = self.alerts.get(self.alerts_cursor).and_then(|a| a.room_id) else {
            return;
        };

        let other_user = self
            .room_summaries()
            .into_iter()
            .find(|room| room.room_id == room_id)
            .map(|room| room.other_user_id);

        match other_user {
            Some(user) => self.open_thread(user, runtime),
            None => self.status = Some("Open this chat from the Chats tab".to_string()),
        }
    }

    fn load_alerts(&mut self, runtime: &Runtime) {
        match runtime.block_on(self.client.notifications.current()) {
            Ok(alerts) => {
                self.alerts = alerts;
                self.alerts_cursor = 0;
            }
            Err(error) => self.report_failure("Could not load notifications", &error),
        }
    }

    fn handle_profile_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        match key.code {
            KeyCode::Char('d') => self.toggle_privacy(PrivacyToggle::PreciseDistance, runtime),
            KeyCode::Char('l') => self.toggle_privacy(PrivacyToggle::LastActive, runtime),
            KeyCode::Char('p') => self.toggle_privacy(PrivacyToggle::PrivateProfile, runtime),
            KeyCode::Char('o') => self.sign_out(runtime),
            _ => {}
        }
    }

    fn toggle_privacy(&mut self, toggle: PrivacyToggle, runtime: &Runtime) {
        let Some(profile) = self.client.auth.current_profile() else {
            return;
        };

        let mut update = ProfileUpdate::for_user(profile.id);
        match toggle {
            PrivacyToggle::PreciseDistance => {
                update.hide_precise_distance = Some(!profile.hide_precise_distance)
            }
            PrivacyToggle::LastActive => update.hide_last_active = Some(!profile.hide_last_active),
            PrivacyToggle::PrivateProfile => {
                update.private_profile = Some(!profile.private_profile)
            }
        }

        if let Err(error) = runtime.block_on(self.client.profiles.update(update)) {
            self.report_failure("Could not update the profile", &error);
        }
    }

    fn load_my_activities(&mut self, runtime: &Runtime) {
        let Ok(user) = self.client.context().require_user() else {
            return;
        };

        let result = runtime.block_on(async {
            let rows = self.client.profiles.activities(user).await?;
            let catalog = self.client.activities.search("", 0).await?;

            Ok::<_, BackendError>((rows, catalog))
        });

        match result {
            Ok((rows, catalog)) => {
                self.my_activities = rows
                    .iter()
                    .map(|row| {
                        let name = catalog
                            .iter()
                            .find(|activity| activity.id == row.activity_id)
                            .map(|activity| activity.name.as_str())
                            .unwrap_or("Unknown activity");

                        format!("{} · {} players", name, row.player_count)
                    })
                    .collect();
            }
            Err(error) => self.report_failure("Could not load your activities", &error),
        }
    }

    fn sign_out(&mut self, runtime: &Runtime) {
        runtime.block_on(self.client.auth.sign_out());
        self.reset_to_sign_in();
        self.status = Some("Signed out".to_string());
    }

    fn reset_to_sign_in(&mut self) {
        self.thread = None;
        self.rooms = None;
        self.alerts.clear();
        self.my_activities.clear();
        self.discover = DiscoverState::default();
        self.email_input.clear();
        self.code_input.clear();
        self.demo_code = None;
        self.oauth_url = None;
        self.callback_input.clear();
        self.compose.clear();
        self.route = Route::SignIn;
    }

    /// Puts a failure in the status line, with a retry hint when the backend
    /// looked unreachable. Reporting lets the client force a sign out when
    /// the session turns out to be expired.
    fn report_failure(&mut self, action: &str, error: &BackendError) {
        self.client.report(error);

        let mut status = format!("{}: {}", action, error);

        if error.is_transient() {
            status.push_str(" (try again)");
        }

        self.status = Some(status);
    }

    fn open_thread(&mut self, other_user: UserId, runtime: &Runtime) {
        match runtime.block_on(self.client.chats.open(other_user)) {
            Ok(room) => {
                self.compose.clear();
                self.thread_scroll = 0;
                self.thread = Some(room);
                self.route = Route::Thread;
            }
            Err(error) => self.report_failure("Could not open the chat", &error),
        }
    }

    fn handle_thread_key(&mut self, key: KeyEvent, runtime: &Runtime) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        let Some(room) = self.thread.clone() else {
            self.route = Route::Main;
            return;
        };

        match key.code {
            KeyCode::Enter => {
                let content = self.compose.clone();

                match runtime.block_on(room.send(&content)) {
                    Ok(_) => {
                        self.compose.clear();
                        self.thread_scroll = 0;
                    }
                    Err(error) => self.report_failure("Could not send", &error),
                }
            }
            KeyCode::PageUp => match runtime.block_on(room.load_older()) {
                Ok(true) => {}
                Ok(false) => {
                    self.status = Some("You reached the start of this chat".to_string())
                }
                Err(error) => self.report_failure("Could not load older messages", &error),
            },
            KeyCode::Up => self.thread_scroll = self.thread_scroll.saturating_add(1),
            KeyCode::Down => self.thread_scroll = self.thread_scroll.saturating_sub(1),
            KeyCode::Backspace => {
                self.compose.pop();
            }
            KeyCode::Esc => {
                self.thread = None;
                self.route = Route::Main;
                self.tab = MainTab::Rooms;
                self.refresh_rooms(runtime);
            }
            KeyCode::Char(c) if !ctrl => self.compose.push(c),
            _ => {}
        }
    }
}

impl DiscoverState {
    fn filter(&self) -> DiscoveryFilter {
        let activity = self.activity_query.trim();

        DiscoveryFilter {
            activity: (!activity.is_empty()).then(|| activity.to_string()),
            gender: self.gender,
            ..Default::default()
        }
    }
}

impl MainTab {
    pub const ALL: [MainTab; 4] = [Self::Discover, Self::Rooms, Self::Alerts, Self::Profile];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Discover => "Discover",
            Self::Rooms => "Chats",
            Self::Alerts => "Alerts",
            Self::Profile => "Profile",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|tab| tab == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl PersonalField {
    pub const ALL: [PersonalField; 6] = [
        Self::Name,
        Self::Gender,
        Self::Bio,
        Self::City,
        Self::Avatar,
        Self::Radius,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Gender => "Gender",
            Self::Bio => "Bio",
            Self::City => "City",
            Self::Avatar => "Photo (path or URL)",
            Self::Radius => "Search radius",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|field| field == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

fn cycle_gender(current: Option<Gender>, delta: i32) -> Gender {
    const ORDER: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    match current.and_then(|gender| ORDER.iter().position(|g| *g == gender)) {
        None => ORDER[0],
        Some(index) => ORDER[(index as i32 + delta).rem_euclid(ORDER.len() as i32) as usize],
    }
}

fn cycle_gender_filter(current: Option<Gender>) -> Option<Gender> {
    match current {
        None => Some(Gender::Male),
        Some(Gender::Male) => Some(Gender::Female),
        Some(Gender::Female) => Some(Gender::Other),
        Some(Gender::Other) => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gender_cycles_in_both_directions() {
        assert_eq!(cycle_gender(None, 1), Gender::Male);
        assert_eq!(cycle_gender(Some(Gender::Other), 1), Gender::Male);
        assert_eq!(cycle_gender(Some(Gender::Male), -1), Gender::Other);
    }

    #[test]
    fn test_gender_filter_cycles_through_off() {
        let mut current = None;
        let seen: Vec<_> = (0..4)
            .map(|_| {
                current = cycle_gender_filter(current);
                current
            })
            .collect();

        assert_eq!(
            seen,
            vec![
                Some(Gender::Male),
                Some(Gender::Female),
                Some(Gender::Other),
                None
            ]
        );
    }

    #[test]
    fn test_tab_order_wraps() {
        assert_eq!(MainTab::Profile.next(), MainTab::Discover);
        assert_eq!(MainTab::Discover.previous(), MainTab::Profile);

        let mut tab = MainTab::Discover;
        for _ in 0..MainTab::ALL.len() {
            tab = tab.next();
        }
        assert_eq!(tab, MainTab::Discover);
    }

    #[test]
    fn test_personal_fields_wrap() {
        assert_eq!(PersonalField::Radius.next(), PersonalField::Name);
        assert_eq!(PersonalField::Name.previous(), PersonalField::Radius);
    }

    #[test]
    fn test_blank_activity_query_is_no_filter() {
        let mut state = DiscoverState::default();
        state.activity_query = "   ".to_string();
        assert!(state.filter().activity.is_none());

        state.activity_query = " padel ".to_string();
        assert_eq!(state.filter().activity.as_deref(), Some("padel"));
    }
}
