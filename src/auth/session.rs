//! Bearer-token sessions. The core only ever asks "who is this token",
//! never touches persistence or cookie mechanics.

use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::types::{Identity, Role};

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Identity>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for a logged-in identity.
    pub fn issue(&self, identity: Identity) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), identity);
        token
    }

    pub fn resolve(&self, token: &str) -> Option<Identity> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Identity handed out when authentication is disabled.
    pub fn development_identity() -> Identity {
        Identity {
            username: "dev".to_string(),
            display_name: "Development User".to_string(),
            email: "dev@local".to_string(),
            role: Role::Admin,
            is_local: true,
        }
    }
}
