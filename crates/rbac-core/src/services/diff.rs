// ============================================================================
// RBAC Core - Association Differ
// File: crates/rbac-core/src/services/diff.rs
// Description: Keyed comparison of a stored child set against a desired one
// ============================================================================
//! Splits a stored association set and a desired one into rows to insert,
//! rows present on both sides, and rows to delete, matching by a natural
//! key rather than by row id.
//!
//! For key-unique inputs the three partitions are disjoint by key and
//! `add ∪ update.new == new`, `delete ∪ update.old == old`. Output order
//! follows input order: `add` and `update` in the order of `new`, `delete`
//! in the order of `old`. Repeated keys in `new` collapse to their first
//! occurrence; repeated keys in `old` beyond the first land in `delete`.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use uuid::Uuid;

use crate::domain::{MenuAction, MenuActionResource, RoleMenu, UserRole};

/// Natural identity of an association row.
pub trait AssociationKey {
    type Key: Eq + Hash;

    fn association_key(&self) -> Self::Key;
}

impl AssociationKey for RoleMenu {
    type Key = (Uuid, Uuid);

    fn association_key(&self) -> Self::Key {
        (self.menu_id, self.action_id)
    }
}

impl AssociationKey for UserRole {
    type Key = Uuid;

    fn association_key(&self) -> Self::Key {
        self.role_id
    }
}

impl AssociationKey for MenuAction {
    type Key = String;

    fn association_key(&self) -> Self::Key {
        self.code.clone()
    }
}

impl AssociationKey for MenuActionResource {
    type Key = (String, String);

    fn association_key(&self) -> Self::Key {
        (self.method.clone(), self.path.clone())
    }
}

/// Stored row and its desired counterpart sharing the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<T> {
    pub old: T,
    pub new: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssociationDiff<T> {
    pub add: Vec<T>,
    pub update: Vec<Matched<T>>,
    pub delete: Vec<T>,
}

impl<T> AssociationDiff<T> {
    /// True when nothing needs to be inserted or deleted.
    pub fn is_unchanged(&self) -> bool {
        self.add.is_empty() && self.delete.is_empty()
    }
}

pub fn diff<T>(old: &[T], new: &[T]) -> AssociationDiff<T>
where
    T: AssociationKey + Clone,
{
    diff_by(old, new, T::association_key)
}

/// First occurrence of every key, in input order. Brings a fresh set into
/// the shape an update would store, so a repeated identical update is a
/// no-op.
pub fn distinct<T>(items: &[T]) -> Vec<T>
where
    T: AssociationKey + Clone,
{
    diff(&[], items).add
}

pub fn diff_by<T, K, F>(old: &[T], new: &[T], key: F) -> AssociationDiff<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut old_index: HashMap<K, usize> = HashMap::with_capacity(old.len());
    for (i, item) in old.iter().enumerate() {
        old_index.entry(key(item)).or_insert(i);
    }

    let mut add = Vec::new();
    let mut update = Vec::new();
    let mut matched: HashSet<usize> = HashSet::with_capacity(old.len());
    let mut seen_new: HashSet<K> = HashSet::with_capacity(new.len());

    for item in new {
        let k = key(item);
        match old_index.get(&k) {
            Some(&i) => {
                if matched.insert(i) {
                    update.push(Matched { old: old[i].clone(), new: item.clone() });
                }
            }
            None => {
                if !seen_new.contains(&k) {
                    add.push(item.clone());
                    seen_new.insert(k);
                }
            }
        }
    }

    // only first occurrences can be matched, so repeated old keys fall through
    let delete = old
        .iter()
        .enumerate()
        .filter(|(i, _)| !matched.contains(i))
        .map(|(_, item)| item.clone())
        .collect();

    AssociationDiff { add, update, delete }
}
