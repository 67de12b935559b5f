//! Identity snapshots and the handles sessions hold on them
//!
//! A `User` never changes after it is built. When the directory's view of a
//! user changes it bumps that name's generation cell; handles whose snapshot
//! carries an older generation report `is_valid() == false` and are picked
//! up by the session's refresh pass.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::{ActionSet, ActionType};
use crate::error::{AuthzError, Result};
use crate::names::{RoleName, UserName};
use crate::privilege::{to_resource_privilege_map, Privilege, ResourcePrivilegeMap};
use crate::resource::ResourcePattern;
use crate::restriction::{validate_restriction_sets, RestrictionEnvironment, RestrictionSet};

/// Stable identifier assigned by the directory when a user is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new(uuid: Uuid) -> Self {
        UserId(uuid)
    }

    /// Random id from the OS entropy source
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).map_err(|e| AuthzError::Entropy(e.to_string()))?;
        Ok(UserId(uuid::Builder::from_random_bytes(bytes).into_uuid()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated principal as the directory last resolved it.
#[derive(Debug, Clone)]
pub struct User {
    name: UserName,
    id: UserId,
    generation: u64,
    privileges: ResourcePrivilegeMap,
    roles: Vec<RoleName>,
    indirect_roles: Vec<RoleName>,
    restrictions: Vec<RestrictionSet>,
}

impl User {
    pub fn builder(name: UserName, id: UserId) -> UserBuilder {
        UserBuilder {
            user: User {
                name,
                id,
                generation: 0,
                privileges: ResourcePrivilegeMap::new(),
                roles: Vec::new(),
                indirect_roles: Vec::new(),
                restrictions: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn privileges(&self) -> &ResourcePrivilegeMap {
        &self.privileges
    }

    /// Actions granted on exactly `resource`; empty if none
    pub fn get_actions_for_resource(&self, resource: &ResourcePattern) -> ActionSet {
        self.privileges.get(resource).copied().unwrap_or_default()
    }

    pub fn has_actions_for_resource(&self, resource: &ResourcePattern) -> bool {
        !self.get_actions_for_resource(resource).is_empty()
    }

    /// Directly granted roles
    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    /// Every role reachable through role inheritance, direct roles included
    pub fn indirect_roles(&self) -> &[RoleName] {
        &self.indirect_roles
    }

    pub fn has_role(&self, role: &RoleName) -> bool {
        self.roles.contains(role)
    }

    pub fn validate_restrictions(&self, env: &RestrictionEnvironment) -> Result<()> {
        validate_restriction_sets(&self.restrictions, env)
    }

    /// Copy of this snapshot stamped with another generation
    pub(crate) fn with_generation(&self, generation: u64) -> User {
        User { generation, ..self.clone() }
    }
}

/// Builder for `User` snapshots
#[derive(Debug, Clone)]
pub struct UserBuilder {
    user: User,
}

impl UserBuilder {
    pub fn generation(mut self, generation: u64) -> Self {
        self.user.generation = generation;
        self
    }

    pub fn privilege(mut self, privilege: Privilege) -> Self {
        self.user
            .privileges
            .entry(privilege.resource_pattern().clone())
            .or_default()
            .add_all(privilege.actions());
        self
    }

    pub fn privileges(mut self, privileges: impl IntoIterator<Item = Privilege>) -> Self {
        for (resource, actions) in to_resource_privilege_map(privileges) {
            self.user.privileges.entry(resource).or_default().add_all(&actions);
        }
        self
    }

    /// Add a direct role. Direct roles are also indirect roles.
    pub fn role(mut self, role: RoleName) -> Self {
        if !self.user.indirect_roles.contains(&role) {
            self.user.indirect_roles.push(role.clone());
        }
        if !self.user.roles.contains(&role) {
            self.user.roles.push(role);
        }
        self
    }

    /// Add a role reached only through inheritance
    pub fn indirect_role(mut self, role: RoleName) -> Self {
        if !self.user.indirect_roles.contains(&role) {
            self.user.indirect_roles.push(role);
        }
        self
    }

    pub fn restriction_set(mut self, set: RestrictionSet) -> Self {
        self.user.restrictions.push(set);
        self
    }

    pub fn build(self) -> User {
        self.user
    }
}

/// Name of the identity used by internal system operations
pub const INTERNAL_USER_NAME: &str = "__system";
pub const INTERNAL_USER_DB: &str = "local";

/// The internal system identity, holding every action on any resource.
pub fn internal_user() -> User {
    let name = UserName::from_static(INTERNAL_USER_NAME, INTERNAL_USER_DB);
    User::builder(name, UserId::new(Uuid::nil()))
        .privilege(Privilege::new(ResourcePattern::AnyResource, ActionType::AnyAction))
        .build()
}

/// Shared, reference-counted handle on a `User` snapshot.
///
/// The generation cell is shared with the directory that produced the
/// snapshot; the handle is valid while the two generations agree.
#[derive(Clone)]
pub struct UserHandle {
    user: Arc<User>,
    current: Arc<AtomicU64>,
}

impl UserHandle {
    pub fn new(user: Arc<User>, current: Arc<AtomicU64>) -> Self {
        UserHandle { user, current }
    }

    /// A handle with its own generation cell, valid until `invalidate` is called
    pub fn detached(user: User) -> Self {
        let current = Arc::new(AtomicU64::new(user.generation));
        UserHandle { user: Arc::new(user), current }
    }

    pub fn is_valid(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.user.generation
    }

    /// Mark this snapshot stale for every holder of the same cell
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    pub fn ptr_eq(a: &UserHandle, b: &UserHandle) -> bool {
        Arc::ptr_eq(&a.user, &b.user)
    }
}

impl Deref for UserHandle {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

impl fmt::Debug for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserHandle")
            .field("name", &self.user.name)
            .field("generation", &self.user.generation)
            .field("valid", &self.is_valid())
            .finish()
    }
}
