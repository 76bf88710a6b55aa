use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{
    classify::Classifier,
    probe::{FocusProbe, GenericFocusProbe},
    store::session_store::SessionStoreImpl,
    utils::clock::{Clock, DefaultClock},
};

pub mod events;
pub mod gate;
pub mod handle;
pub mod persist;
pub mod shutdown;
pub mod tracker;

use gate::DeepWorkGate;
use handle::DaemonHandle;
use persist::PersistModule;
use tracker::SessionTracker;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Sessions shorter than this are focus flickers and are never persisted.
pub const DEFAULT_MIN_SESSION_SECS: i64 = 2;

/// Tunables of the tracking loop. All reference values live here instead of
/// being scattered through the code as magic constants.
#[derive(Clone)]
pub struct TrackerOptions {
    pub poll_interval: Duration,
    pub min_session_secs: i64,
    /// Title fragments identifying this application's own windows, which are
    /// excluded from tracking. Kept as configuration since host window title
    /// formats change.
    pub own_window_markers: Vec<String>,
    pub classifier: Classifier,
}

impl TrackerOptions {
    pub(crate) fn is_own_window(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.own_window_markers
            .iter()
            .any(|marker| title.contains(&marker.to_lowercase()))
    }
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_session_secs: DEFAULT_MIN_SESSION_SECS,
            own_window_markers: vec!["workwatch".into()],
            classifier: Classifier::default(),
        }
    }
}

/// A fully wired tracking pipeline: probe -> tracker -> persist module ->
/// store, with a broadcast channel towards observers and a [DaemonHandle]
/// for queries and the deep work toggle.
pub struct Daemon {
    tracker: Option<SessionTracker>,
    persister: PersistModule<Arc<SessionStoreImpl>>,
    handle: DaemonHandle,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Wires a daemon against the platform focus probe. A probe that cannot
    /// be initialized disables tracking but keeps the query side usable.
    pub fn new(app_dir: PathBuf, options: TrackerOptions) -> Result<Self> {
        let probe = match GenericFocusProbe::new() {
            Ok(probe) => Some(Box::new(probe) as Box<dyn FocusProbe>),
            Err(e) => {
                warn!("Focus probe unavailable, tracking is disabled {e:?}");
                None
            }
        };
        Self::with_parts(app_dir, options, probe, DefaultClock)
    }

    /// Wiring seam used by tests and embedders that bring their own probe or
    /// clock.
    pub fn with_parts(
        app_dir: PathBuf,
        options: TrackerOptions,
        probe: Option<Box<dyn FocusProbe>>,
        clock: impl Clock + Clone,
    ) -> Result<Self> {
        let store = Arc::new(SessionStoreImpl::new(app_dir.join("records"))?);
        let (sink, source) = mpsc::channel(16);
        let (events, _) = broadcast::channel(64);
        let gate = Arc::new(DeepWorkGate::new(events.clone()));
        let shutdown = CancellationToken::new();

        // When there is no probe the sink is dropped right here, which lets
        // the persist module finish immediately.
        let tracker = probe.map(|probe| {
            SessionTracker::new(
                sink,
                probe,
                gate.clone(),
                events.clone(),
                shutdown.clone(),
                options,
                Box::new(clock.clone()),
            )
        });
        let persister = PersistModule::new(source, store.clone(), events.clone());
        let handle = DaemonHandle::new(store, gate, events, Arc::new(clock));

        Ok(Self {
            tracker,
            persister,
            handle,
            shutdown,
        })
    }

    pub fn handle(&self) -> DaemonHandle {
        self.handle.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs tracking and persistence to completion. Returns once the daemon
    /// has been cancelled and the open session is flushed and stored.
    pub async fn run(self) -> Result<()> {
        let Daemon {
            tracker,
            persister,
            shutdown,
            handle: _,
        } = self;

        let tracking = async {
            match tracker {
                Some(tracker) => tracker.run().await,
                None => {
                    shutdown.cancelled().await;
                    Ok(())
                }
            }
        };

        let (tracking_result, persist_result) = tokio::join!(tracking, persister.run());

        if let Err(e) = tracking_result {
            error!("Tracking module got an error {:?}", e);
        }

        if let Err(e) = persist_result {
            error!("Persist module got an error {:?}", e);
        }

        Ok(())
    }
}

/// Represents the starting point for the daemon.
pub async fn start_daemon(app_dir: PathBuf, options: TrackerOptions) -> Result<()> {
    let daemon = Daemon::new(app_dir, options)?;
    let token = daemon.cancellation_token();

    let (_, run_result) = tokio::join!(shutdown::detect_shutdown(token), daemon.run());

    run_result
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::{tempdir, TempDir};
    use tokio::time::Instant;

    use crate::{
        classify::Category,
        daemon::events::TrackerEvent,
        probe::{FocusSnapshot, MockFocusProbe},
        store::session_store::{SessionStore, SessionStoreImpl},
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    use super::{Daemon, DaemonHandle, TrackerOptions};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    #[derive(Clone)]
    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                start_time: Utc.from_utc_datetime(&TEST_START_DATE),
                reference: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    /// A probe that plays back a fixed script, then repeats the last step.
    fn scripted_probe(script: Vec<Result<Option<&'static str>, ()>>) -> MockFocusProbe {
        let mut probe = MockFocusProbe::new();
        let mut position = 0usize;
        probe.expect_poll().returning(move || {
            let step = *script
                .get(position)
                .or_else(|| script.last())
                .expect("script must not be empty");
            position += 1;
            match step {
                Ok(title) => Ok(title.map(|t| FocusSnapshot {
                    title: Some(t.into()),
                    owner_name: None,
                })),
                Err(()) => Err(anyhow::anyhow!("probe exploded")),
            }
        });
        probe
    }

    fn test_daemon(
        script: Vec<Result<Option<&'static str>, ()>>,
        options: TrackerOptions,
    ) -> Result<(TempDir, Daemon, DaemonHandle)> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let daemon = Daemon::with_parts(
            dir.path().to_path_buf(),
            options,
            Some(Box::new(scripted_probe(script))),
            TestClock::new(),
        )?;
        let handle = daemon.handle();
        Ok((dir, daemon, handle))
    }

    async fn run_for(daemon: Daemon, virtual_time: Duration) -> Result<()> {
        let token = daemon.cancellation_token();
        let (_, run_result) = tokio::join!(
            async {
                tokio::time::sleep(virtual_time).await;
                token.cancel()
            },
            daemon.run(),
        );
        run_result
    }

    fn drain(mut rx: tokio::sync::broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
        let mut events = vec![];
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn focus_changes_close_sessions_without_gaps() -> Result<()> {
        // Observations every 2s: [A, A, B, B, B, C...]. Exactly two sessions
        // close before shutdown: (A, 4s) and (B, 6s). C stays open and its
        // sub-threshold flush is dropped.
        let (dir, daemon, handle) = test_daemon(
            vec![
                Ok(Some("GitHub - pull requests")),
                Ok(Some("GitHub - pull requests")),
                Ok(Some("Inbox - Mail")),
                Ok(Some("Inbox - Mail")),
                Ok(Some("Inbox - Mail")),
                Ok(Some("Calendar")),
            ],
            TrackerOptions::default(),
        )?;
        run_for(daemon, Duration::from_millis(10_100)).await?;

        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        let records = store.records_for(TEST_START_DATE.date()).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(&*records[0].app_name, "GitHub - pull requests");
        assert_eq!(records[0].duration_secs, 4);
        assert_eq!(records[0].category, Category::Learning);
        assert_eq!(&*records[1].app_name, "Inbox - Mail");
        assert_eq!(records[1].duration_secs, 6);
        assert_eq!(records[1].category, Category::Productive);

        let totals = handle.stats().await;
        assert_eq!(totals.get(&Category::Learning), Some(&4));
        assert_eq!(totals.get(&Category::Productive), Some(&6));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_session_of_exactly_minimum_duration_is_persisted() -> Result<()> {
        let (dir, daemon, _) = test_daemon(
            vec![Ok(Some("Editor")), Ok(Some("Terminal"))],
            TrackerOptions::default(),
        )?;
        run_for(daemon, Duration::from_millis(2_100)).await?;

        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        let records = store.records_for(TEST_START_DATE.date()).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(&*records[0].app_name, "Editor");
        assert_eq!(records[0].duration_secs, 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn flickers_below_the_minimum_duration_are_never_persisted() -> Result<()> {
        let options = TrackerOptions {
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        };
        let (dir, daemon, _) = test_daemon(
            vec![
                Ok(Some("Editor")),
                Ok(Some("Terminal")),
                Ok(Some("Editor")),
                Ok(Some("Terminal")),
                Ok(Some("Editor")),
            ],
            options,
        )?;
        run_for(daemon, Duration::from_millis(5_100)).await?;

        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        assert!(store.records_for(TEST_START_DATE.date()).await?.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn deep_work_suppresses_distractions_entirely() -> Result<()> {
        let (dir, daemon, handle) = test_daemon(
            vec![Ok(Some("lofi mix - YouTube"))],
            TrackerOptions::default(),
        )?;
        let events = handle.subscribe();
        assert!(handle.set_deep_work(true));

        run_for(daemon, Duration::from_millis(6_100)).await?;

        // Nothing may reach the store while the gate is on.
        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        assert!(store.records_for(TEST_START_DATE.date()).await?.is_empty());

        let events = drain(events);
        let blocked = events
            .iter()
            .filter(|e| matches!(e, TrackerEvent::Blocked { .. }))
            .count();
        let raised = events
            .iter()
            .filter(|e| matches!(e, TrackerEvent::OverlayRaised { .. }))
            .count();
        // One blocked signal per tick, but only one overlay raise.
        assert!(blocked >= 3, "expected a Blocked event per tick, got {events:?}");
        assert_eq!(raised, 1, "overlay must be raised once, got {events:?}");
        assert!(!events
            .iter()
            .any(|e| matches!(e, TrackerEvent::ActiveWindow { .. })));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_distraction_closes_the_overlay() -> Result<()> {
        let (_dir, daemon, handle) = test_daemon(
            vec![
                Ok(Some("lofi mix - YouTube")),
                Ok(Some("lofi mix - YouTube")),
                Ok(Some("Inbox - Mail")),
            ],
            TrackerOptions::default(),
        )?;
        let events = handle.subscribe();
        handle.set_deep_work(true);

        run_for(daemon, Duration::from_millis(6_100)).await?;

        let events = drain(events);
        let closed = events
            .iter()
            .filter(|e| matches!(e, TrackerEvent::OverlayClosed))
            .count();
        assert_eq!(closed, 1, "overlay must close when focus moves away {events:?}");
        // The mail window is tracked normally even while the gate is on.
        assert!(events.iter().any(|e| matches!(
            e,
            TrackerEvent::ActiveWindow { category: Category::Productive, .. }
        )));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_the_open_session() -> Result<()> {
        let (dir, daemon, _) = test_daemon(
            vec![Ok(Some("thesis.tex"))],
            TrackerOptions::default(),
        )?;
        run_for(daemon, Duration::from_secs(7)).await?;

        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        let records = store.records_for(TEST_START_DATE.date()).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(&*records[0].app_name, "thesis.tex");
        assert_eq!(records[0].duration_secs, 7);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_and_own_windows_skip_the_tick() -> Result<()> {
        // A probe error and our own window must not end the open session.
        let (dir, daemon, _) = test_daemon(
            vec![
                Ok(Some("Editor")),
                Err(()),
                Ok(Some("workwatch stats")),
                Ok(None),
                Ok(Some("Editor")),
                Ok(Some("Terminal")),
            ],
            TrackerOptions::default(),
        )?;
        run_for(daemon, Duration::from_millis(10_100)).await?;

        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        let records = store.records_for(TEST_START_DATE.date()).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(&*records[0].app_name, "Editor");
        assert_eq!(records[0].duration_secs, 10);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn daemon_without_a_probe_still_answers_queries() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = SessionStoreImpl::new(dir.path().join("records"))?;
        store
            .insert(crate::store::record::SessionRecord {
                app_name: "Editor".into(),
                category: Category::Productive,
                duration_secs: 30,
                date: TEST_START_DATE.date(),
                timestamp: Utc.from_utc_datetime(&TEST_START_DATE),
            })
            .await?;

        let daemon = Daemon::with_parts(
            dir.path().to_path_buf(),
            TrackerOptions::default(),
            None,
            TestClock::new(),
        )?;
        let handle = daemon.handle();
        run_for(daemon, Duration::from_millis(100)).await?;

        assert_eq!(handle.career_xp().await, 30);
        assert_eq!(handle.history().await.len(), 1);
        Ok(())
    }

    #[test]
    fn own_window_matching_is_case_insensitive_configuration() {
        let options = TrackerOptions {
            own_window_markers: vec!["Career Tracker".into()],
            ..Default::default()
        };
        assert!(options.is_own_window("AI CAREER TRACKER — dashboard"));
        assert!(!options.is_own_window("some other window"));
    }
}
