use chrono::{DateTime, Duration, Utc};

use kickabout_core::{
    Account, Activity, ActivityId, FileStore, Gender, GeoPoint, MatchPreferences, Message,
    MessageId, Profile, RoomId, UserActivity, UserId,
};

use super::{MemoryBackend, DEMO_EMAIL};

/// Fills a fresh backend with a small town of players and conversations,
/// centered on the demo account
pub(super) fn populate(backend: &MemoryBackend) {
    let football = activity(backend, "Football");
    let futsal = activity(backend, "Futsal");
    let basketball = activity(backend, "Basketball");
    let tennis = activity(backend, "Tennis");
    let padel = activity(backend, "Padel");

    activity(backend, "Badminton");
    activity(backend, "Volleyball");
    activity(backend, "Squash");
    activity(backend, "Table tennis");
    activity(backend, "Running");

    let demo = player(
        backend,
        DEMO_EMAIL,
        "Alex",
        Gender::Other,
        "Trying to get a weekly game going",
        GeoPoint {
            lat: 52.520,
            lng: 13.405,
        },
        days_ago(30),
    );
    link_activities(backend, demo, &[(football, 10), (basketball, 6)]);

    let jonas = player(
        backend,
        "jonas@example.com",
        "Jonas",
        Gender::Male,
        "Goalkeeper looking for a Sunday league",
        GeoPoint {
            lat: 52.501,
            lng: 13.420,
        },
        days_ago(12),
    );
    link_activities(backend, jonas, &[(football, 10), (futsal, 8)]);

    let mia = player(
        backend,
        "mia@example.com",
        "Mia",
        Gender::Female,
        "Padel after work, strictly casual",
        GeoPoint {
            lat: 52.530,
            lng: 13.380,
        },
        days_ago(8),
    );
    link_activities(backend, mia, &[(padel, 4), (tennis, 2)]);

    let sam = player(
        backend,
        "sam@example.com",
        "Sam",
        Gender::Other,
        "Up for anything with a ball",
        GeoPoint {
            lat: 52.490,
            lng: 13.350,
        },
        days_ago(3),
    );
    link_activities(backend, sam, &[(basketball, 6), (futsal, 8)]);

    // An older conversation, fully read on both sides
    let with_jonas = room(backend, demo, jonas);
    say(
        backend,
        with_jonas,
        jonas,
        "Hey! Saw you play football around Mitte",
        hours_ago(50),
        true,
    );
    say(
        backend,
        with_jonas,
        demo,
        "Every Sunday at Hasenheide, join us",
        hours_ago(49),
        true,
    );
    say(
        backend,
        with_jonas,
        jonas,
        "Count me in for next week",
        hours_ago(48),
        true,
    );

    // A fresh conversation with messages waiting for the demo account
    let with_mia = room(backend, demo, mia);
    say(
        backend,
        with_mia,
        demo,
        "Is the padel court any good?",
        hours_ago(5),
        true,
    );
    say(
        backend,
        with_mia,
        mia,
        "Really good, we play tomorrow at 7",
        minutes_ago(25),
        false,
    );
    say(
        backend,
        with_mia,
        mia,
        "I booked court 2, bring a friend",
        minutes_ago(20),
        false,
    );
}

fn activity(backend: &MemoryBackend, name: &str) -> ActivityId {
    let activity = Activity {
        id: ActivityId::new(),
        name: name.to_string(),
    };

    backend.catalog.insert(activity.id, activity.clone());
    activity.id
}

fn player(
    backend: &MemoryBackend,
    email: &str,
    name: &str,
    gender: Gender,
    bio: &str,
    location: GeoPoint,
    since: DateTime<Utc>,
) -> UserId {
    let account = Account {
        id: UserId::new(),
        email: email.to_string(),
    };

    backend.emails.insert(account.email.clone(), account.id);
    backend.accounts.insert(account.id, account.clone());

    let profile = Profile {
        id: account.id,
        name: name.to_string(),
        gender,
        bio: bio.to_string(),
        city: "Berlin".to_string(),
        avatar_url: backend.public_url("avatars", &format!("{}/avatar.jpg", account.id)),
        location: Some(location),
        distance_radius_km: 25,
        competitive: false,
        typical_play_times: vec!["Evenings".to_string(), "Weekends".to_string()],
        hide_precise_distance: false,
        hide_last_active: false,
        private_profile: false,
        is_premium: false,
        created_at: since,
    };

    backend.profiles.insert(profile.id, profile);

    backend.match_preferences.insert(
        account.id,
        MatchPreferences {
            user_id: account.id,
            prefers_male: true,
            prefers_female: true,
            prefers_nonbinary: true,
        },
    );

    account.id
}

fn link_activities(backend: &MemoryBackend, user_id: UserId, rows: &[(ActivityId, u32)]) {
    let rows = rows
        .iter()
        .map(|(activity_id, player_count)| UserActivity {
            user_id,
            activity_id: *activity_id,
            player_count: *player_count,
        })
        .collect();

    backend.user_activities.insert(user_id, rows);
}

fn room(backend: &MemoryBackend, a: UserId, b: UserId) -> RoomId {
    let pair = MemoryBackend::sorted_pair(a, b);
    let room_id = RoomId::new();

    backend.room_index.insert(pair, room_id);
    backend.rooms.insert(room_id, pair);

    room_id
}

fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

fn say(
    backend: &MemoryBackend,
    room_id: RoomId,
    sender_id: UserId,
    content: &str,
    created_at: DateTime<Utc>,
    is_read: bool,
) {
    backend.messages.entry(room_id).or_default().push(Message {
        id: MessageId::assigned(),
        room_id,
        sender_id,
        content: content.to_string(),
        created_at,
        is_read,
    });
}
