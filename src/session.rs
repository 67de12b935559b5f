//! Per-connection authorization session
//!
//! An `AuthorizationSession` tracks the users authenticated on one client
//! connection and answers whether that connection may perform an action on a
//! resource. Cached users are snapshots; `start_request` reconciles stale ones
//! against the directory before each request.
//!
//! Session state sits behind a lock. Directory calls are made without holding
//! it, and the lock is taken again only to install the result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::action::{ActionSet, ActionType};
use crate::audit::{AuditSink, LogoutEvent};
use crate::bootstrap::bootstrap_privileges;
use crate::context::{ClientInfo, OperationContext};
use crate::directory::Directory;
use crate::error::{AuthzError, Result};
use crate::logical_session::LogicalSessionId;
use crate::names::{RoleName, UserName};
use crate::namespace::{is_reserved_database, NamespaceElement, NamespaceString, NamespaceStringOrUuid};
use crate::privilege::{Privilege, PrivilegeVector};
use crate::resource::{build_resource_search_list, ResourcePattern};
use crate::restriction::RestrictionEnvironment;
use crate::user::{internal_user, User, UserHandle};
use crate::user_set::UserSet;

const IMPLICIT_LOGOUT_REASON: &str = "Implicit logout due to client connection closure";

/// Names a session acts as for ownership checks, without granting anything.
#[derive(Debug, Clone, Default)]
struct Impersonation {
    user_names: Vec<UserName>,
    role_names: Vec<RoleName>,
    active: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    users: UserSet,
    /// Indirect roles of every authenticated user, rebuilt when `users` changes
    authenticated_role_names: Vec<RoleName>,
    impersonation: Impersonation,
}

impl SessionState {
    fn build_authenticated_role_names(&mut self) {
        self.authenticated_role_names =
            self.users.iter().flat_map(|u| u.indirect_roles().iter().cloned()).collect();
    }

    fn clear_impersonation(&mut self) {
        self.impersonation = Impersonation::default();
    }

    fn effective_user_names(&self) -> Vec<UserName> {
        if self.impersonation.active {
            self.impersonation.user_names.clone()
        } else {
            self.users.names().cloned().collect()
        }
    }
}

/// The `authorizedCollections` and `nameOnly` flags of a listCollections request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListCollectionsRequest {
    pub authorized_collections: bool,
    pub name_only: bool,
}

pub struct AuthorizationSession {
    directory: Arc<dyn Directory>,
    audit: Arc<dyn AuditSink>,
    client: ClientInfo,
    state: RwLock<SessionState>,
}

impl AuthorizationSession {
    pub fn new(directory: Arc<dyn Directory>, audit: Arc<dyn AuditSink>, client: ClientInfo) -> Self {
        AuthorizationSession { directory, audit, client, state: RwLock::new(SessionState::default()) }
    }

    pub fn client(&self) -> &ClientInfo {
        &self.client
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    fn users_snapshot(&self) -> Vec<UserHandle> {
        self.read().users.iter().cloned().collect()
    }

    // ========================================================================
    // Request lifecycle
    // ========================================================================

    /// Run the directory's request hook, then refresh stale cached users.
    pub fn start_request(&self, op_ctx: &OperationContext) {
        self.directory.start_request(op_ctx);
        self.refresh_user_info_as_needed(op_ctx);
    }

    /// Reconcile every stale cached user with the directory.
    ///
    /// Refreshed users replace their stale snapshot in place. Users that were
    /// deleted, whose credentials are no longer supported, or whose
    /// restrictions no longer pass are removed. Any other directory failure
    /// leaves the stale user in place.
    pub fn refresh_user_info_as_needed(&self, _op_ctx: &OperationContext) {
        let env = self.client.restriction_environment();

        // Visit a copy so removals cannot shift entries still to be checked.
        for user in self.users_snapshot() {
            if user.is_valid() {
                continue;
            }
            let name = user.name().clone();

            match self.directory.acquire_user_for_session_refresh(&name, user.id()) {
                Ok(fresh) => match validate_restrictions_guarded(&fresh, &env) {
                    Ok(()) => {
                        self.write().users.replace(&user, fresh);
                        debug!(user = %name, "refreshed cached user information");
                    }
                    Err(e) => {
                        self.write().users.remove(&user);
                        info!(
                            user = %name,
                            reason = %e,
                            "removed user with unmet authentication restrictions from session cache"
                        );
                    }
                },
                Err(AuthzError::UserNotFound(_)) => {
                    self.write().users.remove(&user);
                    info!(user = %name, "removed deleted user from session cache of user information");
                }
                Err(AuthzError::UnsupportedFormat(e)) => {
                    self.write().users.remove(&user);
                    info!(
                        user = %name,
                        reason = %e,
                        "removed user with unsupported credential format from session cache"
                    );
                }
                Err(e) => {
                    warn!(
                        user = %name,
                        reason = %e,
                        "could not fetch updated user privilege information; continuing to use old information"
                    );
                }
            }
        }

        self.write().build_authenticated_role_names();
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Authenticate `name` on this session.
    ///
    /// Replaces any user already authenticated from the same database and
    /// clears impersonation. A user whose restrictions fail for this
    /// connection is reported as `AuthenticationFailed`.
    pub fn add_and_authorize_user(&self, _op_ctx: &OperationContext, name: &UserName) -> Result<()> {
        let user = self.directory.acquire_user(name)?;

        if let Err(e) = validate_restrictions_guarded(&user, &self.client.restriction_environment()) {
            info!(user = %name, reason = %e, "failed to acquire user because of unmet authentication restrictions");
            return Err(AuthzError::AuthenticationFailed);
        }

        let mut state = self.write();
        if let Some(previous) = state.users.add(user) {
            debug!(user = %name, replaced = %previous.name(), "replaced user authenticated from the same database");
        }
        state.clear_impersonation();
        state.build_authenticated_role_names();
        Ok(())
    }

    /// Authenticate the internal system user, which holds every action on any resource
    pub fn grant_internal_authorization(&self) {
        let mut state = self.write();
        state.users.add(UserHandle::detached(internal_user()));
        state.build_authenticated_role_names();
    }

    /// Log out every user authenticated from `db`
    pub fn logout_database(&self, _op_ctx: &OperationContext, db: &str) {
        let mut state = self.write();
        let initial_users: Vec<UserName> = state.users.names().cloned().collect();
        let removed = state.users.remove_by_db_name(db);
        if !removed.is_empty() {
            self.audit.log_logout(&LogoutEvent {
                client: self.client.to_string(),
                reason: format!("Explicit logout from db '{}'", db),
                initial_users,
                updated_users: state.users.names().cloned().collect(),
            });
        }
        state.clear_impersonation();
        state.build_authenticated_role_names();
    }

    pub fn lookup_user(&self, name: &UserName) -> Option<UserHandle> {
        self.read().users.lookup(name).cloned()
    }

    /// The only authenticated user. Sessions with zero or several users are refused.
    pub fn get_single_user(&self) -> Result<UserHandle> {
        let state = self.read();
        let mut users = state.users.iter();
        match (users.next(), users.next()) {
            (Some(user), None) => Ok(user.clone()),
            (Some(_), Some(_)) => Err(AuthzError::Unauthorized(
                "logical sessions can't have multiple authenticated users".into(),
            )),
            (None, _) => Err(AuthzError::Unauthorized("there are no users authenticated".into())),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.read().users.is_empty()
    }

    pub fn authenticated_user_names(&self) -> Vec<UserName> {
        self.read().users.names().cloned().collect()
    }

    pub fn authenticated_role_names(&self) -> Vec<RoleName> {
        self.read().authenticated_role_names.clone()
    }

    /// True if an authenticated user holds `role` directly
    pub fn is_authenticated_as_user_with_role(&self, role: &RoleName) -> bool {
        self.read().users.iter().any(|u| u.has_role(role))
    }

    // ========================================================================
    // Localhost exception and mode queries
    // ========================================================================

    /// Privileges granted to the connection regardless of who is authenticated.
    ///
    /// Empty unless the localhost exception is active.
    pub fn get_default_privileges(&self) -> PrivilegeVector {
        if self.directory.should_allow_localhost(&self.client) {
            bootstrap_privileges(self.directory.server_is_arbiter())
        } else {
            PrivilegeVector::new()
        }
    }

    pub fn is_using_localhost_bypass(&self) -> bool {
        self.directory.is_auth_enabled() && self.directory.should_allow_localhost(&self.client)
    }

    pub fn should_ignore_auth_checks(&self) -> bool {
        self.directory.should_ignore_auth_checks()
    }

    /// A fresh logical session id owned by the authenticated user, or by nobody
    pub fn make_logical_session_id(&self) -> Result<LogicalSessionId> {
        if !self.is_authenticated() {
            return LogicalSessionId::generate(None);
        }
        let user = self.get_single_user()?;
        LogicalSessionId::generate(Some(user.name()))
    }

    // ========================================================================
    // Authorization decisions
    // ========================================================================

    /// True if the session's grants cover every action `privilege` requires
    pub fn is_authorized_for_privilege(&self, privilege: &Privilege) -> bool {
        if self.directory.should_ignore_auth_checks() {
            return true;
        }
        self.is_authorized_for_privilege_unchecked(privilege)
    }

    fn is_authorized_for_privilege_unchecked(&self, privilege: &Privilege) -> bool {
        let mut unmet = *privilege.actions();
        if unmet.is_empty() {
            return true;
        }
        let search_list = build_resource_search_list(privilege.resource_pattern());

        for default in self.get_default_privileges() {
            if search_list.contains(default.resource_pattern()) {
                unmet.remove_all(default.actions());
                if unmet.is_empty() {
                    return true;
                }
            }
        }

        let state = self.read();
        for user in &state.users {
            for pattern in search_list.iter() {
                unmet.remove_all(&user.get_actions_for_resource(pattern));
                if unmet.is_empty() {
                    return true;
                }
            }
        }
        false
    }

    /// True only if every privilege in the batch is satisfied
    pub fn is_authorized_for_privileges(&self, privileges: &[Privilege]) -> bool {
        if self.directory.should_ignore_auth_checks() {
            return true;
        }
        privileges.iter().all(|p| self.is_authorized_for_privilege_unchecked(p))
    }

    pub fn is_authorized_for_actions_on_resource(
        &self,
        resource: &ResourcePattern,
        actions: impl Into<ActionSet>,
    ) -> bool {
        self.is_authorized_for_privilege(&Privilege::new(resource.clone(), actions))
    }

    pub fn is_authorized_for_actions_on_namespace(&self, ns: &NamespaceString, actions: impl Into<ActionSet>) -> bool {
        self.is_authorized_for_privilege(&Privilege::new(ResourcePattern::for_exact_namespace(ns.clone()), actions))
    }

    /// True if an authenticated user holds any action on anything in `resource`'s search list
    pub fn is_authorized_for_any_action_on_resource(&self, resource: &ResourcePattern) -> bool {
        if self.directory.should_ignore_auth_checks() {
            return true;
        }
        let search_list = build_resource_search_list(resource);
        let state = self.read();
        search_list
            .iter()
            .any(|pattern| state.users.iter().any(|u| u.has_actions_for_resource(pattern)))
    }

    /// True if an authenticated user holds any action on any resource that
    /// could live in database `db`
    pub fn is_authorized_for_any_action_on_any_resource_in_db(&self, db: &str) -> bool {
        if self.directory.should_ignore_auth_checks() {
            return true;
        }
        let state = self.read();
        state.users.iter().any(|user| user_has_anything_in_db(user, db))
    }

    /// Privileges a listCollections on `db` requires of this session.
    ///
    /// A names-only listing of authorized collections needs no privilege
    /// beyond holding something in the database.
    pub fn check_authorized_to_list_collections(
        &self,
        db: &str,
        request: ListCollectionsRequest,
    ) -> Result<PrivilegeVector> {
        if request.authorized_collections
            && request.name_only
            && self.is_authorized_for_any_action_on_any_resource_in_db(db)
        {
            return Ok(PrivilegeVector::new());
        }

        let privileges = vec![Privilege::new(ResourcePattern::for_database_name(db), ActionType::ListCollections)];
        if self.is_authorized_for_privileges(&privileges) {
            return Ok(privileges);
        }
        Err(AuthzError::Unauthorized(format!("Not authorized to list collections on db: {}", db)))
    }

    /// `createRole` on the role's database, or, under the localhost
    /// exception, an authenticated user that already holds the role
    pub fn is_authorized_to_create_role(&self, role: &RoleName) -> bool {
        if self.is_authorized_for_actions_on_resource(
            &ResourcePattern::for_database_name(role.db()),
            ActionType::CreateRole,
        ) {
            return true;
        }

        if self.directory.should_allow_localhost(&self.client) {
            if self.read().users.iter().any(|u| u.has_role(role)) {
                return true;
            }
            info!(
                role = %role,
                "not authorized to create the first role in the system using the localhost exception; \
                 the user needs to acquire the role through external authentication first"
            );
        }
        false
    }

    /// True if the authenticated user `user` holds `action` on its own database
    pub fn is_authorized_to_change_as_user(&self, user: &UserName, action: ActionType) -> bool {
        let state = self.read();
        let Some(handle) = state.users.lookup(user) else {
            return false;
        };
        let mut actions = ActionSet::empty();
        for pattern in build_resource_search_list(&ResourcePattern::for_database_name(user.db())).iter() {
            actions.add_all(&handle.get_actions_for_resource(pattern));
        }
        actions.contains(action)
    }

    pub fn is_authorized_to_change_own_password_as_user(&self, user: &UserName) -> bool {
        self.is_authorized_to_change_as_user(user, ActionType::ChangeOwnPassword)
    }

    pub fn is_authorized_to_change_own_custom_data_as_user(&self, user: &UserName) -> bool {
        self.is_authorized_to_change_as_user(user, ActionType::ChangeOwnCustomData)
    }

    /// Check a namespace field before it is parsed.
    ///
    /// Only strings and UUIDs name a namespace. A UUID additionally needs
    /// `useUUID` on the cluster.
    pub fn is_authorized_to_parse_namespace_element(&self, element: &NamespaceElement) -> Result<bool> {
        match element {
            NamespaceElement::String(_) => Ok(true),
            e if e.is_uuid() => Ok(self.use_uuid_authorized()),
            e => Err(AuthzError::InvalidNamespace(format!(
                "Failed to parse namespace element of type {}",
                e.type_name()
            ))),
        }
    }

    pub fn is_authorized_to_parse_namespace_or_uuid(&self, nss: &NamespaceStringOrUuid) -> bool {
        match nss {
            NamespaceStringOrUuid::Namespace(_) => true,
            NamespaceStringOrUuid::Uuid { .. } => self.use_uuid_authorized(),
        }
    }

    fn use_uuid_authorized(&self) -> bool {
        self.is_authorized_for_actions_on_resource(&ResourcePattern::for_cluster_resource(), ActionType::UseUuid)
    }

    // ========================================================================
    // Impersonation
    // ========================================================================

    pub fn set_impersonated_user_data(&self, user_names: Vec<UserName>, role_names: Vec<RoleName>) {
        let mut state = self.write();
        state.impersonation = Impersonation { user_names, role_names, active: true };
    }

    pub fn get_impersonated_user_names(&self) -> Vec<UserName> {
        self.read().impersonation.user_names.clone()
    }

    pub fn get_impersonated_role_names(&self) -> Vec<RoleName> {
        self.read().impersonation.role_names.clone()
    }

    pub fn clear_impersonated_user_data(&self) {
        self.write().clear_impersonation();
    }

    pub fn is_impersonating(&self) -> bool {
        self.read().impersonation.active
    }

    // ========================================================================
    // Cross-session checks
    // ========================================================================

    /// True if the effective user names of the two sessions intersect.
    ///
    /// A session's effective names are its impersonated names while it is
    /// impersonating, otherwise its authenticated names.
    pub fn is_coauthorized_with_client(&self, other: &AuthorizationSession) -> bool {
        let mine = self.read().effective_user_names();
        let theirs = other.read().effective_user_names();
        mine.iter().any(|name| theirs.contains(name))
    }

    pub fn is_coauthorized_with(&self, names: &[UserName]) -> bool {
        if !self.directory.is_auth_enabled() {
            return true;
        }
        let state = self.read();
        if names.is_empty() && state.users.is_empty() {
            return true;
        }
        names.iter().any(|name| state.users.lookup(name).is_some())
    }

    /// Refuse to touch a cursor from another logical session.
    ///
    /// Allowed when auth is off, the session ids match, nobody is
    /// authenticated, or the session holds `impersonate` on the cluster.
    pub fn check_cursor_session_privilege(
        &self,
        op_ctx: &OperationContext,
        cursor_session_id: Option<&LogicalSessionId>,
    ) -> Result<()> {
        let auth_is_on = self.directory.is_auth_enabled();
        if auth_is_on
            && op_ctx.logical_session_id() != cursor_session_id
            && self.is_authenticated()
            && !self.is_authorized_for_actions_on_resource(
                &ResourcePattern::for_cluster_resource(),
                ActionType::Impersonate,
            )
        {
            return Err(AuthzError::Unauthorized(format!(
                "Cursor session id ({}) is not the same as the operation context's session id ({})",
                session_id_or_none(cursor_session_id),
                session_id_or_none(op_ctx.logical_session_id())
            )));
        }
        Ok(())
    }
}

impl Drop for AuthorizationSession {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        if state.users.is_empty() {
            return;
        }
        self.audit.log_logout(&LogoutEvent {
            client: self.client.to_string(),
            reason: IMPLICIT_LOGOUT_REASON.to_string(),
            initial_users: state.users.names().cloned().collect(),
            updated_users: Vec::new(),
        });
    }
}

fn user_has_anything_in_db(user: &User, db: &str) -> bool {
    if user.has_actions_for_resource(&ResourcePattern::for_database_name(db))
        || user.has_actions_for_resource(&ResourcePattern::for_any_resource())
    {
        return true;
    }
    if !is_reserved_database(db) && user.has_actions_for_resource(&ResourcePattern::for_any_normal_resource()) {
        return true;
    }
    user.privileges().keys().any(|pattern| {
        pattern.is_collection_pattern()
            || (pattern.is_exact_namespace_pattern() && pattern.database_to_match() == Some(db))
    })
}

/// Restriction validation that turns a panicking predicate into a failure
fn validate_restrictions_guarded(user: &User, env: &RestrictionEnvironment) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| user.validate_restrictions(env))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(user = %user.name(), reason = %message, "authentication restriction evaluation panicked");
            Err(AuthzError::RestrictionUnmet(format!("restriction evaluation panicked: {}", message)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn session_id_or_none(lsid: Option<&LogicalSessionId>) -> String {
    lsid.map_or_else(|| "none".to_string(), |id| id.to_string())
}
