//! Authentication/authorization boundary.
//!
//! Credential verification, session persistence, approval-workflow
//! storage, and at-rest encryption are external collaborators; the core
//! consumes them through the traits here. `AuthService` composes a local
//! fallback account with an optional directory authenticator and the
//! pending-approval workflow.

pub mod session;
pub mod store;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

pub use session::SessionStore;
pub use store::MemoryUserStore;
pub use types::{Identity, Role, UserRecord, UserStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidCredentials,
    Directory(String),
    UnknownUser(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
            AuthError::Directory(message) => write!(f, "directory error: {}", message),
            AuthError::UnknownUser(username) => write!(f, "unknown user: {}", username),
        }
    }
}

impl std::error::Error for AuthError {}

/// Outcome of a credential check, including the approval workflow states.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(Identity),
    PendingApproval,
    Rejected,
}

/// External credential verifier (directory service). The fallback-identity
/// retry strategy some directories need lives behind this trait; the core
/// never sees it.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str)
        -> Result<Identity, AuthError>;
}

/// Approval-workflow record store, keyed by username.
pub trait UserStore: Send + Sync {
    fn get(&self, username: &str) -> Option<UserRecord>;
    fn add_pending(&self, username: &str, display_name: &str, email: &str) -> UserRecord;
    fn approve(&self, username: &str, approved_by: &str) -> Result<UserRecord, AuthError>;
    fn reject(&self, username: &str, rejected_by: &str) -> Result<UserRecord, AuthError>;
    fn set_role(&self, username: &str, role: Role) -> Result<UserRecord, AuthError>;
    fn record_login(&self, username: &str);
    fn remove(&self, username: &str) -> Result<(), AuthError>;
    fn list(&self) -> Vec<UserRecord>;
}

/// At-rest secret handling. `decrypt` must be idempotent on input that was
/// never encrypted, so plaintext config keeps working.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> String;
    fn decrypt(&self, ciphertext: &str) -> String;
}

/// Pass-through cipher for deployments without at-rest encryption.
pub struct NoopCipher;

impl SecretCipher for NoopCipher {
    fn encrypt(&self, plaintext: &str) -> String {
        plaintext.to_string()
    }

    fn decrypt(&self, ciphertext: &str) -> String {
        ciphertext.to_string()
    }
}

// ========================================
// AUTH SERVICE
// ========================================

pub struct AuthService {
    admin_user: String,
    admin_password: String,
    directory: Option<Arc<dyn Authenticator>>,
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(
        admin_user: &str,
        admin_password: &str,
        directory: Option<Arc<dyn Authenticator>>,
        users: Arc<dyn UserStore>,
        cipher: &dyn SecretCipher,
    ) -> Self {
        Self {
            admin_user: admin_user.to_string(),
            // Stored credentials may be at-rest encrypted; decrypt is
            // idempotent on plaintext.
            admin_password: cipher.decrypt(admin_password),
            directory,
            users,
        }
    }

    /// Local fallback account first, then the directory with the approval
    /// workflow layered on top.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        if username == self.admin_user {
            if password == self.admin_password {
                info!(user = %username, "local authentication successful");
                return Ok(AuthOutcome::Authenticated(Identity {
                    username: username.to_string(),
                    display_name: "Local Administrator".to_string(),
                    email: String::new(),
                    role: Role::Admin,
                    is_local: true,
                }));
            }
            warn!(user = %username, "local authentication failed");
            return Err(AuthError::InvalidCredentials);
        }

        let Some(directory) = &self.directory else {
            warn!(user = %username, "directory authentication disabled, rejecting");
            return Err(AuthError::InvalidCredentials);
        };

        let identity = directory.authenticate(username, password).await?;
        match self.users.get(username) {
            None => {
                // First directory login: record it and hold for approval.
                self.users
                    .add_pending(username, &identity.display_name, &identity.email);
                info!(user = %username, "first directory login, pending approval");
                Ok(AuthOutcome::PendingApproval)
            }
            Some(record) => match record.status {
                UserStatus::Pending => Ok(AuthOutcome::PendingApproval),
                UserStatus::Rejected => Ok(AuthOutcome::Rejected),
                UserStatus::Active => {
                    self.users.record_login(username);
                    let mut identity = identity;
                    identity.role = record.role;
                    Ok(AuthOutcome::Authenticated(identity))
                }
            },
        }
    }

    /// Poll the approval workflow for a user held at `PendingApproval`.
    pub fn check_approval(&self, username: &str) -> Result<AuthOutcome, AuthError> {
        let record = self
            .users
            .get(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;
        match record.status {
            UserStatus::Pending => Ok(AuthOutcome::PendingApproval),
            UserStatus::Rejected => Ok(AuthOutcome::Rejected),
            UserStatus::Active => {
                self.users.record_login(username);
                Ok(AuthOutcome::Authenticated(record.identity()))
            }
        }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }
}
