use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    classify::{Category, Classifier},
    probe::FocusProbe,
    store::record::SessionRecord,
    utils::clock::Clock,
};

use super::{events::TrackerEvent, gate::DeepWorkGate, TrackerOptions};

/// The focus interval currently being accumulated. Title and start time only
/// ever change together, so they live in one value instead of two nullables.
struct OpenSession {
    title: Arc<str>,
    started_at: DateTime<Utc>,
}

/// Polls the focus probe on a fixed interval and turns the stream of
/// observations into finalized [SessionRecord]s. The tracker is the only
/// writer of tracking state; finished sessions leave through an mpsc channel
/// towards the persistence module.
pub struct SessionTracker {
    sink: mpsc::Sender<SessionRecord>,
    probe: Box<dyn FocusProbe>,
    gate: Arc<DeepWorkGate>,
    events: broadcast::Sender<TrackerEvent>,
    shutdown: CancellationToken,
    options: TrackerOptions,
    clock: Box<dyn Clock>,
    current: Option<OpenSession>,
}

impl SessionTracker {
    pub fn new(
        sink: mpsc::Sender<SessionRecord>,
        probe: Box<dyn FocusProbe>,
        gate: Arc<DeepWorkGate>,
        events: broadcast::Sender<TrackerEvent>,
        shutdown: CancellationToken,
        options: TrackerOptions,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            sink,
            probe,
            gate,
            events,
            shutdown,
            options,
            clock,
            current: None,
        }
    }

    /// Executes the tracking event loop. Returns after cancellation, once the
    /// open session has been flushed.
    pub async fn run(mut self) -> Result<()> {
        let mut tick_point = self.clock.instant();
        loop {
            self.tick().await;

            tick_point += self.options.poll_interval;
            tokio::select! {
                // Cancelation stops the loop. The final flush below also drops
                // the sender channel and consequently stops the persist module.
                _ = self.shutdown.cancelled() => {
                    self.flush().await;
                    return Ok(())
                }
                _ = self.clock.sleep_until(tick_point) => ()
            }
        }
    }

    async fn tick(&mut self) {
        let title = match self.probe.poll() {
            Ok(Some(snapshot)) => snapshot.display_title(),
            // Nothing focused right now; leave all state as is.
            Ok(None) => return,
            Err(e) => {
                // Transient platform errors must never break tracking.
                debug!("Focus probe failed, skipping tick {e:?}");
                return;
            }
        };

        // Never track our own windows.
        if self.options.is_own_window(&title) {
            return;
        }

        let category = self.classifier().categorize(&title);

        if self.gate.is_on() && category == Category::Distraction {
            self.gate.raise_overlay(&title);
            let _ = self.events.send(TrackerEvent::Blocked { title });
            // The suppressed window is never accumulated into a session.
            return;
        }

        if category != Category::Distraction {
            self.gate.dismiss_overlay();
        }

        let now = self.clock.time();

        // Close before opening so the transition never loses an interval.
        if let Some(open) = self.current.take_if(|open| open.title != title) {
            self.finalize_session(open, now).await;
        }

        if self.current.is_none() {
            let _ = self.events.send(TrackerEvent::ActiveWindow {
                title: title.clone(),
                category,
            });
            self.current = Some(OpenSession {
                title,
                started_at: now,
            });
        }
    }

    /// Closes `open` as of `now` and hands the record to the persistence
    /// module. Sessions below the minimum duration are flickers and are
    /// dropped before they ever reach the store.
    async fn finalize_session(&mut self, open: OpenSession, now: DateTime<Utc>) {
        let duration_secs = (now - open.started_at).num_seconds();
        if duration_secs < self.options.min_session_secs {
            debug!(
                "Dropping {}s flicker on {:?}",
                duration_secs, open.title
            );
            return;
        }

        let record = SessionRecord {
            category: self.classifier().categorize(&open.title),
            app_name: open.title,
            duration_secs,
            date: now.date_naive(),
            timestamp: now,
        };

        // Fire-and-forget: a full or closed pipeline loses this session, it
        // never stalls or crashes the tracking loop.
        if let Err(e) = self.sink.send(record).await {
            error!("Persistence pipeline is gone, dropping session {e:?}");
        }
    }

    /// Force-closes the open session, as the boundary step would. Called once
    /// on shutdown so the observation window in flight is not lost.
    async fn flush(&mut self) {
        if let Some(open) = self.current.take() {
            let now = self.clock.time();
            self.finalize_session(open, now).await;
        }
    }

    fn classifier(&self) -> &Classifier {
        &self.options.classifier
    }
}
