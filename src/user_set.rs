//! The ordered set of users authenticated on one session
//!
//! Holds at most one user per database. Iteration follows insertion order;
//! replacing the user for a database keeps its position.

use crate::names::UserName;
use crate::user::UserHandle;

#[derive(Debug, Clone, Default)]
pub struct UserSet {
    users: Vec<UserHandle>,
}

impl UserSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `user`, replacing any user from the same database in place.
    ///
    /// Returns the replaced handle, if any.
    pub fn add(&mut self, user: UserHandle) -> Option<UserHandle> {
        match self.users.iter().position(|u| u.name().db() == user.name().db()) {
            Some(i) => Some(std::mem::replace(&mut self.users[i], user)),
            None => {
                self.users.push(user);
                None
            }
        }
    }

    /// Remove every user authenticated against `db`, preserving the order of the rest
    pub fn remove_by_db_name(&mut self, db: &str) -> Vec<UserHandle> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.users)
            .into_iter()
            .partition(|u| u.name().db() == db);
        self.users = kept;
        removed
    }

    /// Swap the exact handle `old` for `new`. False if `old` is no longer present.
    pub fn replace(&mut self, old: &UserHandle, new: UserHandle) -> bool {
        match self.users.iter().position(|u| UserHandle::ptr_eq(u, old)) {
            Some(i) => {
                self.users[i] = new;
                true
            }
            None => false,
        }
    }

    /// Remove the exact handle `old`. False if it is no longer present.
    pub fn remove(&mut self, old: &UserHandle) -> bool {
        match self.users.iter().position(|u| UserHandle::ptr_eq(u, old)) {
            Some(i) => {
                self.users.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &UserName) -> Option<&UserHandle> {
        self.users.iter().find(|u| u.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &UserName> + '_ {
        self.users.iter().map(|u| u.name())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UserHandle> {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<'a> IntoIterator for &'a UserSet {
    type Item = &'a UserHandle;
    type IntoIter = std::slice::Iter<'a, UserHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.users.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{User, UserId};

    fn handle(user: &str, db: &str) -> UserHandle {
        let name = UserName::new(user, db).unwrap();
        UserHandle::detached(User::builder(name, UserId::generate().unwrap()).build())
    }

    fn names(set: &UserSet) -> Vec<String> {
        set.names().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_one_user_per_db() {
        let mut set = UserSet::new();
        assert!(set.add(handle("alice", "test")).is_none());
        assert!(set.add(handle("bob", "admin")).is_none());
        let replaced = set.add(handle("carol", "test")).unwrap();
        assert_eq!(replaced.name().user(), "alice");
        assert_eq!(names(&set), vec!["carol@test", "bob@admin"]);
    }

    #[test]
    fn test_remove_by_db_keeps_order() {
        let mut set = UserSet::new();
        set.add(handle("a", "one"));
        set.add(handle("b", "two"));
        set.add(handle("c", "three"));
        let removed = set.remove_by_db_name("two");
        assert_eq!(removed.len(), 1);
        assert_eq!(names(&set), vec!["a@one", "c@three"]);
        assert!(set.remove_by_db_name("missing").is_empty());
    }

    #[test]
    fn test_replace_and_remove_by_identity() {
        let mut set = UserSet::new();
        let alice = handle("alice", "test");
        set.add(alice.clone());
        let fresh = handle("alice", "test");
        assert!(set.replace(&alice, fresh.clone()));
        assert!(!set.replace(&alice, handle("alice", "test")));
        assert!(UserHandle::ptr_eq(set.lookup(fresh.name()).unwrap(), &fresh));
        assert!(set.remove(&fresh));
        assert!(set.is_empty());
    }
}
