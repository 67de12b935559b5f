//! Namespaces and namespace elements

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthzError, Result};

/// Databases that hold server-internal collections
pub const RESERVED_DATABASES: [&str; 2] = ["local", "config"];

const SYSTEM_COLLECTION_PREFIX: &str = "system.";
const LOCAL_REPLSET_PREFIX: &str = "replset.";

/// True for `local` and `config`
pub fn is_reserved_database(db: &str) -> bool {
    RESERVED_DATABASES.contains(&db)
}

/// A fully qualified collection name, `db.coll`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceString {
    db: String,
    coll: String,
}

impl NamespaceString {
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Result<Self> {
        let (db, coll) = (db.into(), coll.into());
        if db.is_empty() {
            return Err(AuthzError::InvalidNamespace("database name cannot be empty".into()));
        }
        if db.contains('.') {
            return Err(AuthzError::InvalidNamespace(format!("database name '{}' cannot contain '.'", db)));
        }
        if coll.is_empty() {
            return Err(AuthzError::InvalidNamespace(format!("collection name cannot be empty in '{}'", db)));
        }
        Ok(NamespaceString { db, coll })
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn coll(&self) -> &str {
        &self.coll
    }

    /// Collections prefixed with `system.`
    pub fn is_system(&self) -> bool {
        self.coll.starts_with(SYSTEM_COLLECTION_PREFIX)
    }

    /// Neither a system collection nor a replica set collection in `local`
    pub fn is_normal_collection(&self) -> bool {
        !self.is_system() && !(self.db == "local" && self.coll.starts_with(LOCAL_REPLSET_PREFIX))
    }

    /// A normal collection that also lives outside the reserved databases
    pub fn is_normal_resource(&self) -> bool {
        self.is_normal_collection() && !is_reserved_database(&self.db)
    }
}

impl FromStr for NamespaceString {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let (db, coll) = s.split_once('.').ok_or_else(|| {
            AuthzError::InvalidNamespace(format!("'{}' must be 'db.collection' format", s))
        })?;
        NamespaceString::new(db, coll)
    }
}

impl fmt::Display for NamespaceString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

/// Binary subtypes a namespace element may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinDataType {
    General,
    Uuid,
    Other(u8),
}

impl BinDataType {
    pub fn from_subtype(subtype: u8) -> Self {
        match subtype {
            0 => BinDataType::General,
            4 => BinDataType::Uuid,
            other => BinDataType::Other(other),
        }
    }
}

/// The raw value of a command's namespace field, before it is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceElement {
    String(String),
    BinData(BinDataType, Vec<u8>),
    /// Any other element type, by type name
    Other(&'static str),
}

impl NamespaceElement {
    pub fn is_uuid(&self) -> bool {
        matches!(self, NamespaceElement::BinData(BinDataType::Uuid, _))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NamespaceElement::String(_) => "string",
            NamespaceElement::BinData(..) => "binData",
            NamespaceElement::Other(name) => name,
        }
    }
}

/// A namespace that has already been parsed, either by name or by collection UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceStringOrUuid {
    Namespace(NamespaceString),
    Uuid { db: String, uuid: Uuid },
}

impl NamespaceStringOrUuid {
    pub fn uuid(&self) -> Option<&Uuid> {
        match self {
            NamespaceStringOrUuid::Uuid { uuid, .. } => Some(uuid),
            NamespaceStringOrUuid::Namespace(_) => None,
        }
    }

    pub fn db(&self) -> &str {
        match self {
            NamespaceStringOrUuid::Namespace(ns) => ns.db(),
            NamespaceStringOrUuid::Uuid { db, .. } => db,
        }
    }
}
