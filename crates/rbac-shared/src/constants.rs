//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Separator between ancestor ids in a materialized menu path
pub const TREE_PATH_DELIMITER: &str = "/";

/// A pending reload already covers every later write
pub const POLICY_QUEUE_CAPACITY: usize = 1;

pub const DEFAULT_ROOT_USER_NAME: &str = "root";
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;
