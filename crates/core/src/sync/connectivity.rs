use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Network reachability as reported by the runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl From<bool> for Connectivity {
    fn from(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }
}

/// Online/offline signal emitted by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    WentOnline,
    WentOffline,
}

/// Source of the initial connectivity state (e.g. `navigator.onLine` in a
/// web shell, a reachability API on desktop).
pub trait ConnectivityProbe {
    fn is_online(&self) -> bool;
}

/// Two-state online/offline tracker.
///
/// Transitions happen only through [`ConnectivityMonitor::handle_event`];
/// the monitor never polls on its own. Cloning yields another handle to the
/// same state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    /// Start from whatever the environment reports right now.
    pub fn from_probe(probe: &dyn ConnectivityProbe) -> Self {
        Self::new(Connectivity::from(probe.is_online()))
    }

    /// Apply an environment event. Returns `true` if the state changed.
    pub fn handle_event(&self, event: ConnectivityEvent) -> bool {
        let next = match event {
            ConnectivityEvent::WentOnline => Connectivity::Online,
            ConnectivityEvent::WentOffline => Connectivity::Offline,
        };
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            info!(state = ?next, "Connectivity changed");
        }
        changed
    }

    pub fn state(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Resolve once the monitor reports online (immediately if it already does).
    pub async fn wait_until_online(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|state| state.is_online()).await;
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}
