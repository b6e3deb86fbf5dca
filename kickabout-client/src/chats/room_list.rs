use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::spawn;
use tokio::task::JoinHandle;

use kickabout_core::{BackendError, FeedScope, RoomSummary, Subscription};

use crate::{ClientContext, ClientEvent};

/// The chat overview, kept fresh by the change feed.
///
/// Any change to any visible message marks the overview stale, since one
/// message can move a room, change its preview and bump its unread count all
/// at once. The next [RoomList::refresh] fetches the aggregated rows again.
pub struct RoomList {
    context: ClientContext,

    rooms: Mutex<Vec<RoomSummary>>,
    stale: AtomicBool,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RoomList {
    pub(super) async fn open(context: ClientContext) -> Result<Arc<Self>, BackendError> {
        context.require_user()?;

        let subscription = context.backend.subscribe(FeedScope::AllMessages).await?;

        let list = Arc::new(Self {
            context,
            rooms: Mutex::new(Vec::new()),
            stale: AtomicBool::new(true),
            pump: Mutex::new(None),
        });

        let task = spawn(Self::run_pump(Arc::downgrade(&list), subscription));
        *list.pump.lock() = Some(task);

        list.refresh().await?;

        Ok(list)
    }

    async fn run_pump(weak: Weak<Self>, mut subscription: Subscription) {
        while subscription.recv().await.is_some() {
            let Some(list) = weak.upgrade() else { break };

            list.stale.store(true, Ordering::SeqCst);
            list.context.emit(ClientEvent::RoomListChanged);
        }
    }

    /// Fetches the overview rows again, clearing the stale flag
    pub async fn refresh(&self) -> Result<Vec<RoomSummary>, BackendError> {
        let user_id = self.context.require_user()?;

        self.stale.store(false, Ordering::SeqCst);

        match self.context.backend.my_rooms(user_id).await {
            Ok(rooms) => {
                *self.rooms.lock() = rooms.clone();
                Ok(rooms)
            }
            Err(err) => {
                self.stale.store(true, Ordering::SeqCst);
                self.context.report_error(&err);
                Err(err)
            }
        }
    }

    /// The rows from the last successful refresh
    pub fn current(&self) -> Vec<RoomSummary> {
        self.rooms.lock().clone()
    }

    /// Whether a change arrived since the last refresh
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub fn total_unread(&self) -> u32 {
        self.rooms.lock().iter().map(|room| room.unread_count).sum()
    }
}

impl Drop for RoomList {
    fn drop(&mut self) {
        if let Some(task) = self.pump.lock().take() {
            task.abort();
        }
    }
}
