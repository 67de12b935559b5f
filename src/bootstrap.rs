//! Bootstrap privileges granted under the localhost exception

use crate::action::{ActionSet, ActionType};
use crate::privilege::{add_privilege_to_privilege_vector, Privilege, PrivilegeVector};
use crate::resource::ResourcePattern;

pub const ADMIN_DBNAME: &str = "admin";
pub const EXTERNAL_DBNAME: &str = "$external";

/// Minimum privileges needed to create the first user on a fresh server.
///
/// Covers creating an admin user and granting it roles, creating an
/// external user, and the cluster actions needed to add shards and set up
/// a replica set. An arbiter has no admin user of its own, so it also gets
/// the read-only server actions and `shutdown`.
pub fn bootstrap_privileges(arbiter: bool) -> PrivilegeVector {
    let setup_admin_user = Privilege::new(
        ResourcePattern::for_database_name(ADMIN_DBNAME),
        [ActionType::CreateUser, ActionType::GrantRole],
    );
    let setup_external_user =
        Privilege::new(ResourcePattern::for_database_name(EXTERNAL_DBNAME), ActionType::CreateUser);

    let mut server_config = ActionSet::empty();
    if arbiter {
        server_config.add_all(&ActionSet::from([
            ActionType::GetCmdLineOpts,
            ActionType::GetParameter,
            ActionType::ServerStatus,
            ActionType::Shutdown,
        ]));
    }
    server_config.add_all(&ActionSet::from([
        ActionType::AddShard,
        ActionType::ReplSetConfigure,
        ActionType::ReplSetGetStatus,
    ]));
    let setup_server_config = Privilege::new(ResourcePattern::for_cluster_resource(), server_config);

    let mut privileges = PrivilegeVector::new();
    add_privilege_to_privilege_vector(&mut privileges, setup_admin_user);
    add_privilege_to_privilege_vector(&mut privileges, setup_external_user);
    add_privilege_to_privilege_vector(&mut privileges, setup_server_config);
    privileges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_privileges() {
        let privileges = bootstrap_privileges(false);
        assert_eq!(privileges.len(), 3);
        assert_eq!(privileges[0].resource_pattern(), &ResourcePattern::for_database_name("admin"));
        assert_eq!(privileges[0].actions(), &ActionSet::from([ActionType::CreateUser, ActionType::GrantRole]));
        assert_eq!(privileges[1].resource_pattern(), &ResourcePattern::for_database_name("$external"));
        assert_eq!(privileges[1].actions(), &ActionSet::from(ActionType::CreateUser));
        assert_eq!(privileges[2].resource_pattern(), &ResourcePattern::ClusterResource);
        assert_eq!(privileges[2].actions().len(), 3);
        assert!(!privileges[2].includes_action(ActionType::Shutdown));
    }

    #[test]
    fn test_arbiter_gets_server_actions() {
        let privileges = bootstrap_privileges(true);
        assert_eq!(privileges.len(), 3);
        let cluster = &privileges[2];
        assert_eq!(cluster.actions().len(), 7);
        for action in
            [ActionType::GetCmdLineOpts, ActionType::GetParameter, ActionType::ServerStatus, ActionType::Shutdown]
        {
            assert!(cluster.includes_action(action));
        }
    }
}
