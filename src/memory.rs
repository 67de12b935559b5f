//! In-process directory
//!
//! Keeps users in a map guarded by a lock. Every change to a user bumps that
//! name's generation cell, so handles sessions already hold go stale and are
//! refreshed on the next request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::config::AuthorizationConfig;
use crate::context::ClientInfo;
use crate::directory::Directory;
use crate::error::{AuthzError, Result};
use crate::names::UserName;
use crate::user::{User, UserBuilder, UserHandle, UserId};

struct Entry {
    user: Arc<User>,
    current: Arc<AtomicU64>,
    refresh_failure: Option<AuthzError>,
}

impl Entry {
    fn handle(&self) -> UserHandle {
        UserHandle::new(self.user.clone(), self.current.clone())
    }

    fn bump(&mut self) {
        let generation = self.current.load(Ordering::Acquire) + 1;
        self.user = Arc::new(self.user.with_generation(generation));
        self.current.store(generation, Ordering::Release);
    }
}

pub struct MemoryDirectory {
    config: AuthorizationConfig,
    entries: RwLock<HashMap<UserName, Entry>>,
}

impl MemoryDirectory {
    pub fn new(config: AuthorizationConfig) -> Self {
        MemoryDirectory { config, entries: RwLock::new(HashMap::new()) }
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<UserName, Entry>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UserName, Entry>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Create or replace a user. `build` adds privileges, roles and restrictions.
    ///
    /// The user keeps its id across replacements; handles on the previous
    /// snapshot become stale.
    pub fn put_user<F>(&self, name: UserName, build: F) -> Result<UserId>
    where
        F: FnOnce(UserBuilder) -> UserBuilder,
    {
        let mut entries = self.write();
        let (id, current, refresh_failure) = match entries.remove(&name) {
            Some(e) => (*e.user.id(), e.current, e.refresh_failure),
            None => (UserId::generate()?, Arc::new(AtomicU64::new(0)), None),
        };
        let generation = current.load(Ordering::Acquire) + 1;
        let user = build(User::builder(name.clone(), id)).generation(generation).build();
        debug!(user = %name, generation, "stored user");
        entries.insert(name, Entry { user: Arc::new(user), current: current.clone(), refresh_failure });
        current.store(generation, Ordering::Release);
        Ok(id)
    }

    /// Remove a user. Handles on it become stale and refresh to `UserNotFound`.
    pub fn drop_user(&self, name: &UserName) -> bool {
        match self.write().remove(name) {
            Some(entry) => {
                entry.current.fetch_add(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// Mark a user's cached snapshots stale without changing it
    pub fn invalidate_user(&self, name: &UserName) -> bool {
        match self.write().get_mut(name) {
            Some(entry) => {
                entry.bump();
                true
            }
            None => false,
        }
    }

    pub fn invalidate_all(&self) {
        for entry in self.write().values_mut() {
            entry.bump();
        }
    }

    /// Make refreshes of `name` fail with `error` until cleared
    pub fn fail_refresh(&self, name: &UserName, error: AuthzError) -> bool {
        match self.write().get_mut(name) {
            Some(entry) => {
                entry.refresh_failure = Some(error);
                true
            }
            None => false,
        }
    }

    pub fn clear_refresh_failure(&self, name: &UserName) {
        if let Some(entry) = self.write().get_mut(name) {
            entry.refresh_failure = None;
        }
    }

    pub fn user_count(&self) -> usize {
        self.read().len()
    }
}

impl Directory for MemoryDirectory {
    fn acquire_user(&self, name: &UserName) -> Result<UserHandle> {
        self.read()
            .get(name)
            .map(Entry::handle)
            .ok_or_else(|| AuthzError::UserNotFound(format!("Could not find user \"{}\"", name)))
    }

    fn acquire_user_for_session_refresh(&self, name: &UserName, id: &UserId) -> Result<UserHandle> {
        let entries = self.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| AuthzError::UserNotFound(format!("Could not find user \"{}\"", name)))?;
        if let Some(e) = &entry.refresh_failure {
            return Err(e.clone());
        }
        if entry.user.id() != id {
            return Err(AuthzError::UserNotFound(format!(
                "User id from privilege document '{}' does not match user id in session '{}'",
                entry.user.id(),
                id
            )));
        }
        Ok(entry.handle())
    }

    fn should_ignore_auth_checks(&self) -> bool {
        !self.config.auth_enabled
    }

    fn should_allow_localhost(&self, client: &ClientInfo) -> bool {
        self.config.auth_enabled
            && self.config.enable_localhost_auth_bypass
            && client.is_localhost_connection()
            && self.read().is_empty()
    }

    fn is_auth_enabled(&self) -> bool {
        self.config.auth_enabled
    }

    fn server_is_arbiter(&self) -> bool {
        self.config.arbiter
    }
}
