//! Utility functions

use uuid::Uuid;

use crate::constants::TREE_PATH_DELIMITER;

/// Path stored on the children of a node: `parent_path/id`, or just `id` at the root.
pub fn join_parent_path(parent_path: &str, id: &Uuid) -> String {
    if parent_path.is_empty() {
        id.to_string()
    } else {
        format!("{}{}{}", parent_path, TREE_PATH_DELIMITER, id)
    }
}

/// True when `path` is `prefix` itself or lies below it.
pub fn is_path_within(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(TREE_PATH_DELIMITER),
        None => false,
    }
}

/// Swap the `old_prefix` of `path` for `new_prefix`, keeping the suffix.
/// Returns `None` when `path` is not under `old_prefix`.
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_path_within(path, old_prefix) {
        return None;
    }
    Some(format!("{}{}", new_prefix, &path[old_prefix.len()..]))
}
