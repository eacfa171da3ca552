//! In-memory user store backing the approval workflow.
//!
//! Status transitions: a first-time directory user lands as `Pending`; an
//! admin moves the record to `Active` or `Rejected`.

use chrono::Utc;
use dashmap::DashMap;

use crate::auth::types::{Role, UserRecord, UserStatus};
use crate::auth::{AuthError, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserRecord>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, username: &str, apply: F) -> Result<UserRecord, AuthError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut entry = self
            .users
            .get_mut(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;
        apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}

impl UserStore for MemoryUserStore {
    fn get(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).map(|entry| entry.value().clone())
    }

    fn add_pending(&self, username: &str, display_name: &str, email: &str) -> UserRecord {
        let record = UserRecord {
            username: username.to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            status: UserStatus::Pending,
            role: Role::User,
            created_at: Utc::now(),
            last_login: None,
            approved_by: None,
            approved_at: None,
        };
        self.users.insert(username.to_string(), record.clone());
        record
    }

    fn approve(&self, username: &str, approved_by: &str) -> Result<UserRecord, AuthError> {
        self.update(username, |record| {
            record.status = UserStatus::Active;
            record.approved_by = Some(approved_by.to_string());
            record.approved_at = Some(Utc::now());
        })
    }

    fn reject(&self, username: &str, rejected_by: &str) -> Result<UserRecord, AuthError> {
        self.update(username, |record| {
            record.status = UserStatus::Rejected;
            record.approved_by = Some(rejected_by.to_string());
            record.approved_at = Some(Utc::now());
        })
    }

    fn set_role(&self, username: &str, role: Role) -> Result<UserRecord, AuthError> {
        self.update(username, |record| record.role = role)
    }

    fn record_login(&self, username: &str) {
        if let Some(mut entry) = self.users.get_mut(username) {
            entry.value_mut().last_login = Some(Utc::now());
        }
    }

    fn remove(&self, username: &str) -> Result<(), AuthError> {
        self.users
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))
    }

    fn list(&self) -> Vec<UserRecord> {
        let mut users: Vec<UserRecord> =
            self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|record| record.username.to_lowercase());
        users
    }
}
