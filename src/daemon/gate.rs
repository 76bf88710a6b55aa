use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::broadcast;

use super::events::TrackerEvent;

/// Policy switch deciding whether a classified distraction is merely recorded
/// or actively suppressed. Also owns the interruption-surface lifecycle: the
/// overlay is raised at most once per blocking episode and dismissed either
/// when focus leaves the distraction or when the gate is switched off.
pub struct DeepWorkGate {
    enabled: AtomicBool,
    overlay_up: AtomicBool,
    events: broadcast::Sender<TrackerEvent>,
}

impl DeepWorkGate {
    pub fn new(events: broadcast::Sender<TrackerEvent>) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            overlay_up: AtomicBool::new(false),
            events,
        }
    }

    pub fn is_on(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Externally driven toggle. Switching off immediately dismisses any
    /// active overlay; switching on only changes future tick behavior.
    pub fn set(&self, on: bool) -> bool {
        self.enabled.store(on, Ordering::SeqCst);
        if !on {
            self.dismiss_overlay();
        }
        on
    }

    pub(crate) fn raise_overlay(&self, title: &Arc<str>) {
        if !self.overlay_up.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(TrackerEvent::OverlayRaised {
                title: title.clone(),
            });
        }
    }

    pub(crate) fn dismiss_overlay(&self) {
        if self.overlay_up.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(TrackerEvent::OverlayClosed);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use crate::daemon::events::TrackerEvent;

    use super::DeepWorkGate;

    #[test]
    fn overlay_is_raised_once_per_episode() {
        let (events, mut rx) = broadcast::channel(8);
        let gate = DeepWorkGate::new(events);

        let title: std::sync::Arc<str> = "YouTube".into();
        gate.raise_overlay(&title);
        gate.raise_overlay(&title);
        gate.dismiss_overlay();
        gate.dismiss_overlay();

        assert_eq!(rx.try_recv().unwrap(), TrackerEvent::OverlayRaised { title });
        assert_eq!(rx.try_recv().unwrap(), TrackerEvent::OverlayClosed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disabling_the_gate_dismisses_an_active_overlay() {
        let (events, mut rx) = broadcast::channel(8);
        let gate = DeepWorkGate::new(events);

        assert!(gate.set(true));
        assert!(gate.is_on());
        gate.raise_overlay(&"Netflix".into());
        let _ = rx.try_recv();

        assert!(!gate.set(false));
        assert!(!gate.is_on());
        assert_eq!(rx.try_recv().unwrap(), TrackerEvent::OverlayClosed);
    }

    #[test]
    fn events_without_subscribers_are_dropped_silently() {
        let (events, rx) = broadcast::channel(8);
        drop(rx);
        let gate = DeepWorkGate::new(events);
        gate.set(true);
        gate.raise_overlay(&"Reddit".into());
        gate.set(false);
    }
}
