use sibyl_memory::ConversationMemory;
use uuid::Uuid;

/// Per-conversation context. Each surface owns its sessions: the CLI keeps
/// one for the whole run, the gateway keeps one per session id. History
/// lives here and nowhere else.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    pub memory: ConversationMemory,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            memory: ConversationMemory::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }
}
