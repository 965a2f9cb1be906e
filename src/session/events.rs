//! Session lifecycle notifications. The client never navigates or renders; it
//! publishes what happened and the view layer decides what to do (for example,
//! redirect to sign-in on `Expired`).

use super::types::UserRecord;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A login or signup stored a new token.
    SignedIn { user: Option<UserRecord> },
    /// The user logged out locally.
    SignedOut,
    /// The backend answered 401 and the session was cleared.
    Expired,
}

#[derive(Clone, Debug)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publishing with no subscribers is fine.
    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}
