use std::{collections::HashMap, sync::Arc, time::Duration};

use dashboard_api::{ApiContext, DashboardSession, ViewObserver};
use shared::{
    domain::SessionId,
    protocol::{DashboardEvent, DashboardView, SessionOpened},
};
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    time::Instant,
};
use tracing::info;

pub(crate) type SharedSession = Arc<Mutex<DashboardSession>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) sessions: SessionRegistry,
    pub(crate) events: broadcast::Sender<DashboardEvent>,
}

impl AppState {
    pub(crate) fn new(api: ApiContext, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            api,
            sessions: SessionRegistry::default(),
            events,
        }
    }

    /// Tells websocket subscribers the session is gone.
    pub(crate) fn announce_closed(&self, session_id: SessionId) {
        let _ = self.events.send(DashboardEvent::SessionClosed { session_id });
    }
}

/// Forwards recomputed views onto the process-wide event channel.
struct EventPublisher(broadcast::Sender<DashboardEvent>);

impl ViewObserver for EventPublisher {
    fn view_updated(&self, session_id: SessionId, view: &DashboardView) {
        // No subscribers is fine; the HTTP caller still gets the view.
        let _ = self.0.send(DashboardEvent::ViewUpdated {
            session_id,
            view: view.clone(),
        });
    }
}

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
    connections: usize,
}

/// Live sessions. The map lock is only held to insert, look up or remove;
/// each session has its own mutex so one user's changes run one at a time.
///
/// A session ends on an explicit close, when its last websocket goes away,
/// or once it has been idle with no websocket for longer than the sweep
/// threshold.
#[derive(Clone, Default)]
pub(crate) struct SessionRegistry {
    inner: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
}

impl SessionRegistry {
    pub(crate) async fn open(
        &self,
        api: &ApiContext,
        events: &broadcast::Sender<DashboardEvent>,
    ) -> SessionOpened {
        let mut session = api.open_session();
        session.subscribe(Arc::new(EventPublisher(events.clone())));

        let opened = SessionOpened {
            session_id: session.id(),
            opened_at: session.opened_at(),
            view: session.view().clone(),
        };
        let mut sessions = self.inner.write().await;
        sessions.insert(
            opened.session_id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
                connections: 0,
            },
        );
        info!(
            session_id = %opened.session_id,
            active_sessions = sessions.len(),
            "opened dashboard session"
        );
        opened
    }

    /// Looks a session up and marks it as used.
    pub(crate) async fn get(&self, session_id: SessionId) -> Option<SharedSession> {
        let mut sessions = self.inner.write().await;
        let entry = sessions.get_mut(&session_id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    pub(crate) async fn contains(&self, session_id: SessionId) -> bool {
        self.inner.read().await.contains_key(&session_id)
    }

    pub(crate) async fn close(&self, session_id: SessionId) -> bool {
        let removed = self.inner.write().await.remove(&session_id).is_some();
        if removed {
            info!(%session_id, "closed dashboard session");
        }
        removed
    }

    /// Registers a websocket on the session. `false` if it no longer exists.
    pub(crate) async fn attach(&self, session_id: SessionId) -> bool {
        let mut sessions = self.inner.write().await;
        match sessions.get_mut(&session_id) {
            Some(entry) => {
                entry.connections += 1;
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drops one websocket from the session and ends the session when it was
    /// the last one. Returns whether the session was removed.
    pub(crate) async fn detach(&self, session_id: SessionId) -> bool {
        let mut sessions = self.inner.write().await;
        let Some(entry) = sessions.get_mut(&session_id) else {
            return false;
        };
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections > 0 {
            return false;
        }
        sessions.remove(&session_id);
        info!(
            %session_id,
            active_sessions = sessions.len(),
            "closed dashboard session after its last websocket ended"
        );
        true
    }

    /// Removes sessions without a websocket that have not been used for at
    /// least `max_idle`, returning their ids.
    pub(crate) async fn expire_idle(&self, max_idle: Duration) -> Vec<SessionId> {
        let mut sessions = self.inner.write().await;
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, entry)| entry.connections == 0 && entry.last_seen.elapsed() >= max_idle)
            .map(|(session_id, _)| *session_id)
            .collect();
        for session_id in &expired {
            sessions.remove(session_id);
        }
        if !expired.is_empty() {
            info!(
                expired = expired.len(),
                active_sessions = sessions.len(),
                "expired idle dashboard sessions"
            );
        }
        expired
    }
}

/// Periodically ends sessions that outlived `max_idle` without a websocket.
pub(crate) async fn sweep_idle_sessions(state: Arc<AppState>, max_idle: Duration) {
    let period = max_idle.min(Duration::from_secs(60)).max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        for session_id in state.sessions.expire_idle(max_idle).await {
            state.announce_closed(session_id);
        }
    }
}

#[cfg(test)]
#[path = "tests/app_state_tests.rs"]
mod tests;
