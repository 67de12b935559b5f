//! User and role names
//!
//! Both are `(name, db)` pairs, displayed and parsed as `name@db`. The
//! split happens at the last `@`, so user names may themselves contain `@`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};

fn split_full_name<'a>(kind: &str, s: &'a str) -> Result<(&'a str, &'a str)> {
    let (name, db) = s.rsplit_once('@').ok_or_else(|| {
        AuthzError::BadValue(format!("Invalid {} name '{}': must be 'name@db' format", kind, s))
    })?;
    check_parts(kind, name, db)?;
    Ok((name, db))
}

fn check_parts(kind: &str, name: &str, db: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AuthzError::BadValue(format!("{} name cannot be empty", kind)));
    }
    if db.is_empty() {
        return Err(AuthzError::BadValue(format!("{} database cannot be empty", kind)));
    }
    Ok(())
}

/// Name of an authenticated principal, scoped to the database it was created in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserName {
    user: String,
    db: String,
}

impl UserName {
    pub fn new(user: impl Into<String>, db: impl Into<String>) -> Result<Self> {
        let (user, db) = (user.into(), db.into());
        check_parts("user", &user, &db)?;
        Ok(UserName { user, db })
    }

    /// For built-in identities whose names are known to be well formed
    pub(crate) fn from_static(user: &'static str, db: &'static str) -> Self {
        UserName { user: user.to_string(), db: db.to_string() }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    /// `user@db`, the form hashed into logical session ids
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl FromStr for UserName {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let (user, db) = split_full_name("user", s)?;
        Ok(UserName { user: user.to_string(), db: db.to_string() })
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.db)
    }
}

/// Name of a role, scoped to the database that defines it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleName {
    role: String,
    db: String,
}

impl RoleName {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Result<Self> {
        let (role, db) = (role.into(), db.into());
        check_parts("role", &role, &db)?;
        Ok(RoleName { role, db })
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn db(&self) -> &str {
        &self.db
    }
}

impl FromStr for RoleName {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let (role, db) = split_full_name("role", s)?;
        Ok(RoleName { role: role.to_string(), db: db.to_string() })
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.db)
    }
}
