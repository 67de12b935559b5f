//! Privileges: a resource pattern paired with the actions granted on it

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::{ActionSet, ActionType};
use crate::resource::ResourcePattern;

/// Immutable `(resource, actions)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Privilege {
    resource: ResourcePattern,
    actions: ActionSet,
}

/// Privileges in grant order. Entries for the same resource are not merged.
pub type PrivilegeVector = Vec<Privilege>;

/// A user's total grants, one action set per resource pattern
pub type ResourcePrivilegeMap = HashMap<ResourcePattern, ActionSet>;

impl Privilege {
    pub fn new(resource: ResourcePattern, actions: impl Into<ActionSet>) -> Self {
        Privilege { resource, actions: actions.into() }
    }

    pub fn resource_pattern(&self) -> &ResourcePattern {
        &self.resource
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn includes_action(&self, action: ActionType) -> bool {
        self.actions.contains(action)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.actions, self.resource)
    }
}

/// Add `privilege` to `privileges`, unioning into an entry with an equal resource pattern.
pub fn add_privilege_to_privilege_vector(privileges: &mut PrivilegeVector, privilege: Privilege) {
    match privileges.iter_mut().find(|p| p.resource == privilege.resource) {
        Some(existing) => existing.actions.add_all(&privilege.actions),
        None => privileges.push(privilege),
    }
}

/// Fold a privilege list into a per-resource map
pub fn to_resource_privilege_map(privileges: impl IntoIterator<Item = Privilege>) -> ResourcePrivilegeMap {
    let mut map = ResourcePrivilegeMap::new();
    for privilege in privileges {
        map.entry(privilege.resource).or_default().add_all(&privilege.actions);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_same_resource() {
        let mut privileges = PrivilegeVector::new();
        add_privilege_to_privilege_vector(
            &mut privileges,
            Privilege::new(ResourcePattern::for_database_name("test"), ActionType::Find),
        );
        add_privilege_to_privilege_vector(
            &mut privileges,
            Privilege::new(ResourcePattern::for_cluster_resource(), ActionType::Shutdown),
        );
        add_privilege_to_privilege_vector(
            &mut privileges,
            Privilege::new(ResourcePattern::for_database_name("test"), ActionType::Insert),
        );

        assert_eq!(privileges.len(), 2);
        assert_eq!(*privileges[0].actions(), ActionSet::from([ActionType::Find, ActionType::Insert]));
    }

    #[test]
    fn test_plain_vector_keeps_duplicates() {
        let privileges = vec![
            Privilege::new(ResourcePattern::for_database_name("test"), ActionType::Find),
            Privilege::new(ResourcePattern::for_database_name("test"), ActionType::Insert),
        ];
        let map = to_resource_privilege_map(privileges.clone());
        assert_eq!(privileges.len(), 2);
        assert_eq!(map.len(), 1);
        assert!(map[&ResourcePattern::for_database_name("test")].contains(ActionType::Insert));
    }
}
