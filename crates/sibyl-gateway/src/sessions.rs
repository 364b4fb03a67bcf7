use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

use sibyl_core::Session;

const MAX_SESSIONS: usize = 1024;
const IDLE_TTL: Duration = Duration::from_secs(3600);

struct Slot {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

/// Sessions keyed by id. Each session sits behind its own mutex so
/// concurrent requests for the same id serialize while distinct sessions
/// proceed independently. When the map is full, entries idle longer than
/// an hour are pruned.
#[derive(Default)]
pub(crate) struct SessionMap {
    entries: Mutex<HashMap<Uuid, Slot>>,
}

impl SessionMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Look up a session, creating it when the id is unknown or absent.
    pub(crate) async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<Session>>) {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(slot) = entries.get_mut(&id) {
            slot.last_used = now;
            return (id, Arc::clone(&slot.session));
        }

        if entries.len() >= MAX_SESSIONS {
            entries.retain(|_, slot| now.duration_since(slot.last_used) < IDLE_TTL);
        }

        let session = Arc::new(Mutex::new(Session::with_id(id)));
        entries.insert(
            id,
            Slot {
                session: Arc::clone(&session),
                last_used: now,
            },
        );
        (id, session)
    }

    /// Clear a session's history. Unknown ids are a no-op.
    pub(crate) async fn clear(&self, id: Uuid) {
        let slot = {
            let entries = self.entries.lock().await;
            entries.get(&id).map(|slot| Arc::clone(&slot.session))
        };
        if let Some(session) = slot {
            session.lock().await.memory.clear();
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
