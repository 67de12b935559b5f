//! Resource patterns and resource search lists
//!
//! A privilege targets a `ResourcePattern`. To decide whether a request on
//! some target is covered, the target is expanded into the list of patterns
//! whose grants may satisfy it, broadest first:
//!
//! | target                                   | search list                                          |
//! |------------------------------------------|------------------------------------------------------|
//! | any resource                             | any                                                  |
//! | cluster                                  | any, cluster                                         |
//! | database `db`                            | any, any normal (unless reserved), `db`              |
//! | normal collection `db.coll`              | any, any normal, `db`, `coll`, `db.coll`             |
//! | system or reserved-db collection         | any, `coll`, `db.coll`                               |

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::namespace::{is_reserved_database, NamespaceString};

/// What a privilege applies to. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourcePattern {
    AnyResource,
    /// Everything outside `local`/`config` and outside system collections
    AnyNormalResource,
    ClusterResource,
    Database(String),
    /// A bare collection name, matched in every database
    Collection(String),
    ExactNamespace(NamespaceString),
}

impl ResourcePattern {
    pub fn for_any_resource() -> Self {
        ResourcePattern::AnyResource
    }

    pub fn for_any_normal_resource() -> Self {
        ResourcePattern::AnyNormalResource
    }

    pub fn for_cluster_resource() -> Self {
        ResourcePattern::ClusterResource
    }

    pub fn for_database_name(db: impl Into<String>) -> Self {
        ResourcePattern::Database(db.into())
    }

    pub fn for_collection_name(coll: impl Into<String>) -> Self {
        ResourcePattern::Collection(coll.into())
    }

    pub fn for_exact_namespace(ns: NamespaceString) -> Self {
        ResourcePattern::ExactNamespace(ns)
    }

    pub fn is_database_pattern(&self) -> bool {
        matches!(self, ResourcePattern::Database(_))
    }

    pub fn is_collection_pattern(&self) -> bool {
        matches!(self, ResourcePattern::Collection(_))
    }

    pub fn is_exact_namespace_pattern(&self) -> bool {
        matches!(self, ResourcePattern::ExactNamespace(_))
    }

    /// Database named by a `Database` or `ExactNamespace` pattern
    pub fn database_to_match(&self) -> Option<&str> {
        match self {
            ResourcePattern::Database(db) => Some(db),
            ResourcePattern::ExactNamespace(ns) => Some(ns.db()),
            _ => None,
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePattern::AnyResource => write!(f, "<all resources>"),
            ResourcePattern::AnyNormalResource => write!(f, "<all normal resources>"),
            ResourcePattern::ClusterResource => write!(f, "<system resource>"),
            ResourcePattern::Database(db) => write!(f, "<database {}>", db),
            ResourcePattern::Collection(coll) => write!(f, "<collection {} in any database>", coll),
            ResourcePattern::ExactNamespace(ns) => write!(f, "<{}>", ns),
        }
    }
}

/// Upper bound on the length of any resource search list
pub const RESOURCE_SEARCH_LIST_CAPACITY: usize = 5;

/// Inline, bounded list of patterns produced by `build_resource_search_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSearchList {
    patterns: [ResourcePattern; RESOURCE_SEARCH_LIST_CAPACITY],
    len: usize,
}

impl ResourceSearchList {
    fn new() -> Self {
        ResourceSearchList {
            patterns: std::array::from_fn(|_| ResourcePattern::AnyResource),
            len: 0,
        }
    }

    fn push(&mut self, pattern: ResourcePattern) {
        debug_assert!(self.len < RESOURCE_SEARCH_LIST_CAPACITY);
        self.patterns[self.len] = pattern;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[ResourcePattern] {
        &self.patterns[..self.len]
    }
}

impl Deref for ResourceSearchList {
    type Target = [ResourcePattern];

    fn deref(&self) -> &[ResourcePattern] {
        self.as_slice()
    }
}

/// Expand `target` into every pattern whose grants can apply to it, broadest first.
///
/// The list always starts with `AnyResource` and ends with `target`.
pub fn build_resource_search_list(target: &ResourcePattern) -> ResourceSearchList {
    let mut list = ResourceSearchList::new();
    if *target == ResourcePattern::AnyResource {
        list.push(ResourcePattern::AnyResource);
        return list;
    }

    list.push(ResourcePattern::AnyResource);
    match target {
        ResourcePattern::ExactNamespace(ns) => {
            // System collections and anything in local/config are only reachable
            // through their collection name or the exact namespace.
            if ns.is_normal_resource() {
                list.push(ResourcePattern::AnyNormalResource);
                list.push(ResourcePattern::for_database_name(ns.db()));
            }
            list.push(ResourcePattern::for_collection_name(ns.coll()));
        }
        ResourcePattern::Database(db) => {
            if !is_reserved_database(db) {
                list.push(ResourcePattern::AnyNormalResource);
            }
        }
        _ => {}
    }
    list.push(target.clone());
    list
}
