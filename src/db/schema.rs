//! Database schema and migrations for the feed registry.
//!
//! Migrations are applied sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feed registry
    r#"
CREATE TABLE feeds (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    url         TEXT NOT NULL UNIQUE,
    title       TEXT NOT NULL,
    last_check  TEXT,                    -- RFC3339, NULL until the first successful check
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_creates_feeds_table() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE TABLE feeds"));
        assert!(first.contains("url         TEXT NOT NULL UNIQUE"));
    }
}
