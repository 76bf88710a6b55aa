use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::store::{record::SessionRecord, session_store::SessionStore};

use super::events::TrackerEvent;

/// Receives finalized sessions from the tracker and appends them to the
/// store. Persistence is best-effort: a failed insert is logged and the
/// session is lost, the pipeline keeps running either way. Observers learn
/// about successful writes through [TrackerEvent::SessionSaved].
pub struct PersistModule<S> {
    receiver: mpsc::Receiver<SessionRecord>,
    store: S,
    events: broadcast::Sender<TrackerEvent>,
}

impl<S: SessionStore> PersistModule<S> {
    pub fn new(
        receiver: mpsc::Receiver<SessionRecord>,
        store: S,
        events: broadcast::Sender<TrackerEvent>,
    ) -> Self {
        Self {
            receiver,
            store,
            events,
        }
    }

    /// Drains the session channel until every sender is gone.
    pub async fn run(mut self) -> Result<()> {
        while let Some(record) = self.receiver.recv().await {
            debug!("Persisting session {:?}", record);
            match self.store.insert(record.clone()).await {
                Ok(()) => {
                    info!(
                        "Saved {}s of {} on {:?}",
                        record.duration_secs, record.category, record.app_name
                    );
                    let _ = self.events.send(TrackerEvent::SessionSaved {
                        app: record.app_name,
                        duration_secs: record.duration_secs,
                        category: record.category,
                    });
                }
                Err(e) => {
                    error!("Error persisting session {:?}: {e:?}", record)
                }
            }
        }

        self.receiver.close();
        Ok(())
    }
}
