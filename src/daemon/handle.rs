use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    store::{
        queries::{
            career_xp, range_totals, recent_history, today_totals, CategoryTotals, DailyTotal,
            HistoryEntry, HISTORY_LIMIT, HISTORY_SAMPLE,
        },
        session_store::SessionStoreImpl,
    },
    utils::clock::Clock,
};

use super::{events::TrackerEvent, gate::DeepWorkGate};

/// Pull-based query surface over a running (or past) daemon. Cheap to clone
/// and hand to UI collaborators; every query reads the store on demand, and
/// read failures degrade to empty results instead of surfacing errors.
#[derive(Clone)]
pub struct DaemonHandle {
    store: Arc<SessionStoreImpl>,
    gate: Arc<DeepWorkGate>,
    events: broadcast::Sender<TrackerEvent>,
    clock: Arc<dyn Clock>,
}

impl DaemonHandle {
    pub(super) fn new(
        store: Arc<SessionStoreImpl>,
        gate: Arc<DeepWorkGate>,
        events: broadcast::Sender<TrackerEvent>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gate,
            events,
            clock,
        }
    }

    /// Subscribes to live tracking events. Slow receivers lose events rather
    /// than slowing the tracker down.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Toggles deep work mode, returning the new state. Switching off tears
    /// down any active interruption surface immediately.
    pub fn set_deep_work(&self, on: bool) -> bool {
        self.gate.set(on)
    }

    pub fn deep_work(&self) -> bool {
        self.gate.is_on()
    }

    /// Today's totals per category.
    pub async fn stats(&self) -> CategoryTotals {
        today_totals(&self.store, self.clock.time().date_naive()).await
    }

    /// Per-day totals over the last seven days, oldest first.
    pub async fn seven_day(&self) -> Vec<DailyTotal> {
        range_totals(&self.store, self.clock.time().date_naive(), 7).await
    }

    /// Recent sessions grouped by application and day, newest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        recent_history(&self.store, HISTORY_LIMIT, HISTORY_SAMPLE).await
    }

    /// Cumulative learning + productive seconds across all time.
    pub async fn career_xp(&self) -> i64 {
        career_xp(&self.store).await
    }
}
