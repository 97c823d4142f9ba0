// marker constants
pub const ROOT_MARKER: &str = "base";
pub const HEAD_MARKER: &str = "head";

// bookkeeping constants
pub const INTERNAL_PREFIX: &str = "_schemachain_";
pub const STATE_TABLE: &str = "_schemachain_state";
pub const HISTORY_TABLE: &str = "_schemachain_history";
pub const LOCK_TABLE: &str = "_schemachain_lock";
pub const LOCK_NAME: &str = "schemachain";
pub const STATE_ROW_ID: i64 = 0;

// engine constants
pub const ENGINE_PREFIX: &str = "sqlite_";

// lock constants
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LOCK_POLL_MS: u64 = 100;

/// Returns true when `name` belongs to the engine or to migration bookkeeping.
pub fn is_reserved_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with(ENGINE_PREFIX) || lower.starts_with(INTERNAL_PREFIX)
}
