//! Logical session ids
//!
//! A logical session id pairs a random UUID with the SHA-256 digest of the
//! owning user's full name. Sessions started with nobody authenticated hash
//! the empty string.

use std::fmt;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AuthzError, Result};
use crate::names::UserName;

/// Identifies a client-side logical session, e.g. the one a cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalSessionId {
    id: Uuid,
    uid: [u8; 32],
}

/// SHA-256 of `user@db`, or of the empty string for no user
pub fn make_uid(user: Option<&UserName>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    if let Some(user) = user {
        hasher.update(user.full_name().as_bytes());
    }
    let mut uid = [0u8; 32];
    uid.copy_from_slice(&hasher.finalize());
    uid
}

impl LogicalSessionId {
    pub fn new(id: Uuid, uid: [u8; 32]) -> Self {
        LogicalSessionId { id, uid }
    }

    /// Fresh session id owned by `user`, with a random id from the OS entropy source
    pub fn generate(user: Option<&UserName>) -> Result<Self> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).map_err(|e| AuthzError::Entropy(e.to_string()))?;
        Ok(LogicalSessionId {
            id: uuid::Builder::from_random_bytes(bytes).into_uuid(),
            uid: make_uid(user),
        })
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn uid(&self) -> &[u8; 32] {
        &self.uid
    }
}

/// Hex encode
mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        data.as_ref().iter().map(|b| format!("{:02X}", b)).collect()
    }
}

impl fmt::Display for LogicalSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.id, hex::encode(self.uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let a = LogicalSessionId::generate(None).unwrap();
        let b = LogicalSessionId::generate(None).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.uid(), b.uid());
        assert_eq!(a.id().get_version_num(), 4);
    }

    #[test]
    fn test_uid_depends_on_user() {
        let alice = UserName::new("alice", "test").unwrap();
        let bob = UserName::new("bob", "test").unwrap();
        assert_ne!(make_uid(Some(&alice)), make_uid(Some(&bob)));
        assert_ne!(make_uid(Some(&alice)), make_uid(None));
        // SHA-256 of the empty string
        assert_eq!(
            hex::encode(make_uid(None)),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn test_display() {
        let lsid = LogicalSessionId::new(Uuid::nil(), [0xAB; 32]);
        let s = lsid.to_string();
        assert!(s.starts_with("00000000-0000-0000-0000-000000000000 - ABAB"));
        assert_eq!(s.len(), 36 + 3 + 64);
    }
}
