use std::sync::Arc;

use crate::classify::Category;

/// Push notifications for UI collaborators, delivered over a broadcast
/// channel. Delivery is fire-and-forget: nobody listening or a lagging
/// receiver never blocks the tracking loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// A new window gained focus and a session opened for it.
    ActiveWindow { title: Arc<str>, category: Category },
    /// A finalized session was durably persisted.
    SessionSaved {
        app: Arc<str>,
        duration_secs: i64,
        category: Category,
    },
    /// Emitted every tick a distraction is being suppressed by deep work.
    Blocked { title: Arc<str> },
    /// The UI should present an interruption surface for a blocked window.
    /// Sent once per continuous blocking episode, unlike [TrackerEvent::Blocked].
    OverlayRaised { title: Arc<str> },
    /// The interruption surface is no longer needed.
    OverlayClosed,
}
