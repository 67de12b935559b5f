//! Authsession - per-connection authorization sessions
//!
//! Tracks the users authenticated on a client connection, decides whether
//! the connection may perform a set of actions on a resource, and keeps
//! cached user snapshots consistent with a user directory.
//!
//! ```ignore
//! let directory = Arc::new(MemoryDirectory::new(AuthorizationConfig::default()));
//! directory.put_user(UserName::new("alice", "test")?, |u| {
//!     u.privilege(Privilege::new(ResourcePattern::for_database_name("test"), ActionType::Find))
//! })?;
//!
//! let session = AuthorizationSession::new(directory, Arc::new(TracingAuditSink), client);
//! session.add_and_authorize_user(&op_ctx, &UserName::new("alice", "test")?)?;
//! assert!(session.is_authorized_for_actions_on_namespace(&"test.foo".parse()?, ActionType::Find));
//! ```

pub mod action;
pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod logical_session;
pub mod memory;
pub mod names;
pub mod namespace;
pub mod privilege;
pub mod resource;
pub mod restriction;
pub mod session;
pub mod user;
pub mod user_set;

pub use action::{ActionSet, ActionType};
pub use audit::{AuditSink, LogoutEvent, MemoryAuditSink, TracingAuditSink};
pub use bootstrap::{bootstrap_privileges, ADMIN_DBNAME, EXTERNAL_DBNAME};
pub use config::AuthorizationConfig;
pub use context::{ClientInfo, OperationContext, Transport};
pub use directory::Directory;
pub use error::{AuthzError, Result};
pub use logical_session::LogicalSessionId;
pub use memory::MemoryDirectory;
pub use names::{RoleName, UserName};
pub use namespace::{BinDataType, NamespaceElement, NamespaceString, NamespaceStringOrUuid};
pub use privilege::{add_privilege_to_privilege_vector, Privilege, PrivilegeVector, ResourcePrivilegeMap};
pub use resource::{build_resource_search_list, ResourcePattern, ResourceSearchList, RESOURCE_SEARCH_LIST_CAPACITY};
pub use restriction::{
    AuthenticationRestriction, CidrRange, ClientSourceRestriction, RestrictionEnvironment, RestrictionSet,
    ServerAddressRestriction,
};
pub use session::{AuthorizationSession, ListCollectionsRequest};
pub use user::{internal_user, User, UserBuilder, UserHandle, UserId};
pub use user_set::UserSet;
