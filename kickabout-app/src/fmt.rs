use chrono::{DateTime, Local, Utc};

/// A short label for the day something happened, the way chat apps group
/// their timelines
pub fn day_label(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Local);
    let date = local.date_naive();
    let today = Local::now().date_naive();

    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        local.format("%-d %B %Y").to_string()
    }
}

/// Wall clock time in the local timezone
pub fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

/// Day and time together, used where entries from many days mix
pub fn timestamp(at: DateTime<Utc>) -> String {
    format!("{} {}", day_label(at), clock(at))
}

/// Rough distance for the discover cards
pub fn distance_label(km: f64) -> String {
    if km < 1.0 {
        "under 1 km away".to_string()
    } else {
        format!("{:.0} km away", km)
    }
}

/// Cuts a preview down to fit on a single list row
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_recent_day_labels() {
        assert_eq!(day_label(Utc::now()), "Today");
        assert_eq!(day_label(Utc::now() - Duration::hours(24)), "Yesterday");
    }

    #[test]
    fn test_older_days_spell_out_the_date() {
        let at = "2024-03-14T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let label = day_label(at);

        assert!(
            label.contains("March 2024"),
            "expected a spelled out date, got {:?}",
            label
        );
    }

    #[test]
    fn test_clock_shape() {
        let rendered = clock(Utc::now());

        assert_eq!(rendered.len(), 5);
        assert_eq!(&rendered[2..3], ":");
    }

    #[test]
    fn test_distance_labels() {
        assert_eq!(distance_label(0.3), "under 1 km away");
        assert_eq!(distance_label(12.4), "12 km away");
    }

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("a rather long message", 10), "a rather…");
    }
}
