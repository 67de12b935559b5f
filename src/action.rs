//! Action types and action sets
//!
//! An `ActionSet` is a bitmask over the closed `ActionType` enumeration.
//! Membership, union and difference are single mask operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};

macro_rules! action_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A single permission kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        #[repr(u8)]
        pub enum ActionType {
            $($variant),+
        }

        impl ActionType {
            /// Every action kind, in declaration order.
            pub const ALL: &'static [ActionType] = &[$(ActionType::$variant),+];

            /// Canonical name, as used in privilege documents
            pub fn name(self) -> &'static str {
                match self {
                    $(ActionType::$variant => $name),+
                }
            }
        }

        impl FromStr for ActionType {
            type Err = AuthzError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(ActionType::$variant),)+
                    _ => Err(AuthzError::BadValue(format!("unrecognized action type '{}'", s))),
                }
            }
        }
    };
}

action_types! {
    AddShard => "addShard",
    AnyAction => "anyAction",
    ApplicationMessage => "applicationMessage",
    AuthSchemaUpgrade => "authSchemaUpgrade",
    BypassDocumentValidation => "bypassDocumentValidation",
    ChangeCustomData => "changeCustomData",
    ChangeOwnCustomData => "changeOwnCustomData",
    ChangeOwnPassword => "changeOwnPassword",
    ChangePassword => "changePassword",
    ChangeStream => "changeStream",
    CollMod => "collMod",
    CollStats => "collStats",
    Compact => "compact",
    ConvertToCapped => "convertToCapped",
    CreateCollection => "createCollection",
    CreateIndex => "createIndex",
    CreateRole => "createRole",
    CreateUser => "createUser",
    DbHash => "dbHash",
    DbStats => "dbStats",
    DropCollection => "dropCollection",
    DropDatabase => "dropDatabase",
    DropIndex => "dropIndex",
    DropRole => "dropRole",
    DropUser => "dropUser",
    EnableSharding => "enableSharding",
    Find => "find",
    FlushRouterConfig => "flushRouterConfig",
    GetCmdLineOpts => "getCmdLineOpts",
    GetParameter => "getParameter",
    GrantRole => "grantRole",
    HostInfo => "hostInfo",
    Impersonate => "impersonate",
    Insert => "insert",
    Internal => "internal",
    InvalidateUserCache => "invalidateUserCache",
    KillAnyCursor => "killAnyCursor",
    KillCursors => "killCursors",
    Killop => "killop",
    ListCollections => "listCollections",
    ListDatabases => "listDatabases",
    ListIndexes => "listIndexes",
    ListSessions => "listSessions",
    LogRotate => "logRotate",
    Remove => "remove",
    RenameCollectionSameDb => "renameCollectionSameDB",
    ReplSetConfigure => "replSetConfigure",
    ReplSetGetConfig => "replSetGetConfig",
    ReplSetGetStatus => "replSetGetStatus",
    ReplSetStateChange => "replSetStateChange",
    RevokeRole => "revokeRole",
    ServerStatus => "serverStatus",
    SetParameter => "setParameter",
    Shutdown => "shutdown",
    Top => "top",
    Update => "update",
    UseUuid => "useUUID",
    ViewRole => "viewRole",
    ViewUser => "viewUser",
}

// The mask type has one bit per action
const _: () = assert!(ActionType::ALL.len() < 128);

const ALL_MASK: u128 = (1u128 << ActionType::ALL.len()) - 1;

#[inline]
fn bit(action: ActionType) -> u128 {
    1u128 << (action as u8)
}

impl From<ActionType> for &'static str {
    fn from(action: ActionType) -> Self {
        action.name()
    }
}

impl TryFrom<String> for ActionType {
    type Error = AuthzError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of actions.
///
/// Adding `AnyAction` fills the set. Removing any action also clears the
/// `AnyAction` bit, so `contains(AnyAction)` holds only for a full set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ActionSet(u128);

impl ActionSet {
    /// The empty set, the canonical "nothing required" state
    pub const fn empty() -> Self {
        ActionSet(0)
    }

    /// Every action, including `AnyAction`
    pub const fn all() -> Self {
        ActionSet(ALL_MASK)
    }

    pub fn add(&mut self, action: ActionType) {
        if action == ActionType::AnyAction {
            self.0 = ALL_MASK;
        } else {
            self.0 |= bit(action);
        }
    }

    pub fn add_all(&mut self, other: &ActionSet) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, action: ActionType) {
        self.0 &= !(bit(action) | bit(ActionType::AnyAction));
    }

    pub fn remove_all(&mut self, other: &ActionSet) {
        if !other.is_empty() {
            self.0 &= !(other.0 | bit(ActionType::AnyAction));
        }
    }

    #[inline]
    pub fn contains(&self, action: ActionType) -> bool {
        self.0 & bit(action) != 0
    }

    #[inline]
    pub fn contains_all(&self, other: &ActionSet) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_full(&self) -> bool {
        self.0 == ALL_MASK
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the member actions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = ActionType> + '_ {
        ActionType::ALL.iter().copied().filter(move |a| self.contains(*a))
    }

    /// Convert to canonical names. A full set is reported as `anyAction`.
    pub fn to_names(&self) -> Vec<&'static str> {
        if self.is_full() {
            return vec![ActionType::AnyAction.name()];
        }
        self.iter().map(ActionType::name).collect()
    }

    /// Parse a list of action names, rejecting unknown names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut set = ActionSet::empty();
        for name in names {
            set.add(name.as_ref().parse()?);
        }
        Ok(set)
    }
}

impl From<ActionType> for ActionSet {
    fn from(action: ActionType) -> Self {
        let mut set = ActionSet::empty();
        set.add(action);
        set
    }
}

impl<const N: usize> From<[ActionType; N]> for ActionSet {
    fn from(actions: [ActionType; N]) -> Self {
        actions.into_iter().collect()
    }
}

impl FromIterator<ActionType> for ActionSet {
    fn from_iter<I: IntoIterator<Item = ActionType>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for action in iter {
            set.add(action);
        }
        set
    }
}

impl TryFrom<Vec<String>> for ActionSet {
    type Error = AuthzError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        ActionSet::from_names(&names)
    }
}

impl From<ActionSet> for Vec<String> {
    fn from(set: ActionSet) -> Self {
        set.to_names().into_iter().map(str::to_string).collect()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_names().join(", "))
    }
}
