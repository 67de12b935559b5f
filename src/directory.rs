//! The contract a session requires of the user directory
//!
//! The directory owns users and roles and verifies credentials. Sessions
//! only fetch users from it, re-fetch stale ones, and ask it about the
//! server's authorization mode.

use crate::context::{ClientInfo, OperationContext};
use crate::error::Result;
use crate::names::UserName;
use crate::user::{UserHandle, UserId};

pub trait Directory: Send + Sync {
    /// Resolve `name` to its current snapshot.
    ///
    /// Fails with `UserNotFound` when no such user exists.
    fn acquire_user(&self, name: &UserName) -> Result<UserHandle>;

    /// Re-resolve a user a session already holds.
    ///
    /// Fails with `UserNotFound` if the user is gone or `id` no longer
    /// matches, `UnsupportedFormat` if an authentication subsystem rejects
    /// the cached credential, and any other error for transient failures.
    fn acquire_user_for_session_refresh(&self, name: &UserName, id: &UserId) -> Result<UserHandle>;

    /// True when authorization is globally disabled
    fn should_ignore_auth_checks(&self) -> bool;

    /// True while the localhost bootstrap exception applies to `client`
    fn should_allow_localhost(&self, client: &ClientInfo) -> bool;

    fn is_auth_enabled(&self) -> bool;

    fn server_is_arbiter(&self) -> bool;

    /// Called at the start of every request before cached users are refreshed
    fn start_request(&self, _op_ctx: &OperationContext) {}
}
