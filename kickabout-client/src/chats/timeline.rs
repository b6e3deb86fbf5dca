use kickabout_core::{Message, MessageId, UserId, MESSAGES_PER_PAGE};

/// The paged history of one room, merged with live changes.
///
/// Page 0 holds the newest messages and every page is ordered newest first,
/// exactly as the backend returns them. Rendering wants the opposite order,
/// which is what [Timeline::display_order] produces.
pub struct Timeline {
    per_page: usize,
    pages: Vec<Vec<Message>>,
    /// Whether the backend may have older messages than the last fetched page
    has_more: bool,
    /// Whether a page fetch is in flight
    loading: bool,
}

/// The state captured before an optimistic change, restored on failure
pub struct TimelineSnapshot {
    pages: Vec<Vec<Message>>,
    has_more: bool,
}

impl Timeline {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page,
            pages: Vec::new(),
            has_more: true,
            loading: false,
        }
    }

    /// Starts a page fetch, returning the page index to request.
    /// Returns None while another fetch is running or when the history
    /// is exhausted.
    pub fn begin_fetch(&mut self) -> Option<usize> {
        if self.loading {
            return None;
        }

        if !self.pages.is_empty() && !self.has_more {
            return None;
        }

        self.loading = true;
        Some(self.pages.len())
    }

    /// Stores a fetched page. A full page means older messages may exist,
    /// a short one means the start of the conversation was reached.
    pub fn apply_page(&mut self, index: usize, rows: Vec<Message>) {
        self.loading = false;

        let fetched = rows.len();
        let mut rows = rows;
        rows.truncate(self.per_page);

        // Offsets drift when messages arrive while paging, so a fetched row
        // may already be present. Known rows are dropped, but end detection
        // still uses the raw fetch size.
        rows.retain(|row| {
            !self.pages[..index.min(self.pages.len())]
                .iter()
                .flatten()
                .any(|known| known.id == row.id)
        });

        if index < self.pages.len() {
            self.pages[index] = rows;
        } else if index == self.pages.len() {
            self.pages.push(rows);
        } else {
            return;
        }

        if index + 1 == self.pages.len() {
            self.has_more = fetched == self.per_page;

            if self.pages[index].is_empty() && index > 0 {
                self.pages.pop();
            }
        }
    }

    /// Clears the in-flight flag after a failed fetch
    pub fn abort_fetch(&mut self) {
        self.loading = false;
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages.len()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.pages
            .iter()
            .flatten()
            .any(|message| message.id == *id)
    }

    /// Whether a live insert should be merged in.
    ///
    /// The viewer's own inserts are rejected, because they were already shown
    /// optimistically when the send started. Anything already known by id is
    /// rejected too.
    pub fn accepts_remote(&self, message: &Message, viewer: UserId) -> bool {
        message.sender_id != viewer && !self.contains(&message.id)
    }

    /// Merges a live insert, returning whether it was accepted
    pub fn apply_remote_insert(&mut self, message: Message, viewer: UserId) -> bool {
        if !self.accepts_remote(&message, viewer) {
            return false;
        }

        self.prepend(message);
        true
    }

    /// Replaces a known message in place, as published for read receipts
    pub fn apply_update(&mut self, message: Message) -> bool {
        for page in &mut self.pages {
            if let Some(slot) = page.iter_mut().find(|known| known.id == message.id) {
                *slot = message;
                return true;
            }
        }

        false
    }

    /// Removes a message by id
    pub fn apply_delete(&mut self, id: &MessageId) -> bool {
        let before = self.len();

        for page in &mut self.pages {
            page.retain(|message| message.id != *id);
        }

        self.len() != before
    }

    /// Shows a message before the backend has stored it
    pub fn apply_local_echo(&mut self, message: Message) {
        self.prepend(message);
    }

    /// Swaps an echo for the stored row once the send settles
    pub fn confirm_local(&mut self, local_id: MessageId, stored: Message) -> bool {
        if self.contains(&stored.id) {
            // The stored row arrived through another path, the echo is stale
            return self.apply_delete(&local_id);
        }

        for page in &mut self.pages {
            if let Some(slot) = page.iter_mut().find(|known| known.id == local_id) {
                *slot = stored;
                return true;
            }
        }

        false
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            pages: self.pages.clone(),
            has_more: self.has_more,
        }
    }

    pub fn restore(&mut self, snapshot: TimelineSnapshot) {
        self.pages = snapshot.pages;
        self.has_more = snapshot.has_more;
    }

    /// All messages in rendering order, oldest first
    pub fn display_order(&self) -> Vec<Message> {
        self.pages
            .iter()
            .rev()
            .flat_map(|page| page.iter().rev())
            .cloned()
            .collect()
    }

    fn prepend(&mut self, message: Message) {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }

        self.pages[0].insert(0, message);
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(MESSAGES_PER_PAGE)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, Utc};
    use kickabout_core::RoomId;

    fn message(sender: UserId, room_id: RoomId, content: &str, age_secs: i64) -> Message {
        Message {
            id: MessageId::assigned(),
            room_id,
            sender_id: sender,
            content: content.to_string(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            is_read: false,
        }
    }

    /// A page of `amount` messages, newest first, starting `start_age` seconds back
    fn page_of(amount: usize, sender: UserId, room_id: RoomId, start_age: i64) -> Vec<Message> {
        (0..amount)
            .map(|i| {
                message(
                    sender,
                    room_id,
                    &format!("message {}", start_age + i as i64),
                    start_age + i as i64,
                )
            })
            .collect()
    }

    #[test]
    fn test_two_page_walk_over_25_messages() {
        let sender = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        assert_eq!(timeline.begin_fetch(), Some(0));
        timeline.apply_page(0, page_of(20, sender, room_id, 0));
        assert!(timeline.has_more(), "a full page means more may exist");

        assert_eq!(timeline.begin_fetch(), Some(1));
        timeline.apply_page(1, page_of(5, sender, room_id, 20));
        assert!(!timeline.has_more(), "a short page ends the history");

        assert_eq!(timeline.len(), 25);
        assert_eq!(timeline.begin_fetch(), None, "no further fetch is issued");

        let ordered = timeline.display_order();
        assert_eq!(ordered.len(), 25);
        assert_eq!(ordered.first().unwrap().content, "message 24");
        assert_eq!(ordered.last().unwrap().content, "message 0");
    }

    #[test]
    fn test_short_first_page_ends_history() {
        let mut timeline = Timeline::default();

        timeline.begin_fetch();
        timeline.apply_page(0, page_of(3, UserId::new(), RoomId::new(), 0));

        assert!(!timeline.has_more());
        assert_eq!(timeline.begin_fetch(), None);
    }

    #[test]
    fn test_empty_tail_page_is_dropped() {
        let sender = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        timeline.begin_fetch();
        timeline.apply_page(0, page_of(20, sender, room_id, 0));

        // The history happened to be exactly one page long
        timeline.begin_fetch();
        timeline.apply_page(1, Vec::new());

        assert_eq!(timeline.pages_loaded(), 1);
        assert!(!timeline.has_more());
        assert_eq!(timeline.begin_fetch(), None);
    }

    #[test]
    fn test_only_one_fetch_at_a_time() {
        let mut timeline = Timeline::default();

        assert_eq!(timeline.begin_fetch(), Some(0));
        assert_eq!(timeline.begin_fetch(), None, "a fetch is already running");

        timeline.abort_fetch();
        assert_eq!(timeline.begin_fetch(), Some(0), "aborting allows a retry");
    }

    #[test]
    fn test_remote_insert_merging() {
        let me = UserId::new();
        let them = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        timeline.begin_fetch();
        timeline.apply_page(0, page_of(5, them, room_id, 10));

        let theirs = message(them, room_id, "see you there", 0);
        assert!(timeline.apply_remote_insert(theirs.clone(), me));
        assert_eq!(
            timeline.display_order().last().unwrap().content,
            "see you there"
        );

        // The same insert again is rejected by id
        assert!(!timeline.apply_remote_insert(theirs, me));

        // The viewer's own insert is rejected, it was echoed at send time
        let mine = message(me, room_id, "on my way", 0);
        assert!(!timeline.apply_remote_insert(mine, me));

        assert_eq!(timeline.len(), 6);
    }

    #[test]
    fn test_echo_confirm_swaps_in_stored_row() {
        let me = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        let echo = Message {
            id: MessageId::local_now(),
            room_id,
            sender_id: me,
            content: "coming?".to_string(),
            created_at: Utc::now(),
            is_read: false,
        };

        timeline.apply_local_echo(echo.clone());
        assert!(timeline.contains(&echo.id));

        let stored = Message {
            id: MessageId::assigned(),
            ..echo.clone()
        };

        assert!(timeline.confirm_local(echo.id, stored.clone()));
        assert!(!timeline.contains(&echo.id), "the echo id is gone");
        assert!(timeline.contains(&stored.id));
        assert_eq!(timeline.len(), 1, "exactly one copy remains");
    }

    #[test]
    fn test_snapshot_restores_exactly() {
        let me = UserId::new();
        let them = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        timeline.begin_fetch();
        timeline.apply_page(0, page_of(4, them, room_id, 10));

        let before = timeline.display_order();
        let snapshot = timeline.snapshot();

        timeline.apply_local_echo(message(me, room_id, "never sent", 0));
        assert_eq!(timeline.len(), 5);

        timeline.restore(snapshot);
        assert_eq!(
            timeline.display_order(),
            before,
            "the failed send should leave no trace"
        );
    }

    #[test]
    fn test_update_replaces_in_place() {
        let them = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        timeline.begin_fetch();
        timeline.apply_page(0, page_of(3, them, room_id, 0));

        let mut read = timeline.display_order().remove(0);
        read.is_read = true;

        assert!(timeline.apply_update(read.clone()));
        let refreshed = timeline
            .display_order()
            .into_iter()
            .find(|m| m.id == read.id)
            .unwrap();
        assert!(refreshed.is_read);

        let unknown = message(them, room_id, "never seen", 99);
        assert!(!timeline.apply_update(unknown));
    }

    #[test]
    fn test_drifted_page_rows_are_deduplicated() {
        let them = UserId::new();
        let me = UserId::new();
        let room_id = RoomId::new();
        let mut timeline = Timeline::default();

        timeline.begin_fetch();
        let first = page_of(20, them, room_id, 10);
        timeline.apply_page(0, first.clone());

        // A live insert shifts the backend offsets by one, so the next page
        // starts with a row the timeline already has
        timeline.apply_remote_insert(message(them, room_id, "brought a ball", 0), me);

        timeline.begin_fetch();
        let mut second = vec![first.last().unwrap().clone()];
        second.extend(page_of(19, them, room_id, 30));
        timeline.apply_page(1, second);

        let ordered = timeline.display_order();
        let ids: std::collections::HashSet<_> = ordered.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), ordered.len(), "no message appears twice");
        assert!(timeline.has_more(), "a full raw page still means more");
    }
}
