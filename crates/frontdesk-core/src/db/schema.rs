//! SQLite schema definition.

/// Complete database schema for the front desk.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key-Value Store
-- ============================================================================

-- Each value is an opaque string (JSON for the ledger keys)
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
