use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::error::{PaisaError, Result};

/// Credential resolution is injected rather than hard-coded: anything
/// able to turn an API key into a user id can authenticate an ingest.
pub trait CredentialResolver {
    fn resolve(&self, api_key: &str) -> Result<String>;
}

/// Resolver backed by the `api_keys` table.
pub struct ApiKeyTable<'a> {
    conn: &'a Connection,
}

impl<'a> ApiKeyTable<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl CredentialResolver for ApiKeyTable<'_> {
    fn resolve(&self, api_key: &str) -> Result<String> {
        let user_id: Option<String> = self
            .conn
            .query_row("SELECT user_id FROM api_keys WHERE api_key = ?1", [api_key], |row| {
                row.get(0)
            })
            .optional()?;
        user_id.ok_or(PaisaError::Unauthenticated)
    }
}

pub fn add_api_key(conn: &Connection, api_key: &str, user_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO api_keys (api_key, user_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            api_key,
            user_id,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_resolve_known_key() {
        let (_dir, conn) = test_db();
        add_api_key(&conn, "abc123", "my_iphone").unwrap();
        let resolver = ApiKeyTable::new(&conn);
        assert_eq!(resolver.resolve("abc123").unwrap(), "my_iphone");
    }

    #[test]
    fn test_unknown_key_is_unauthenticated() {
        let (_dir, conn) = test_db();
        let resolver = ApiKeyTable::new(&conn);
        assert!(matches!(resolver.resolve("nope"), Err(PaisaError::Unauthenticated)));
    }

    #[test]
    fn test_rebinding_a_key_replaces_user() {
        let (_dir, conn) = test_db();
        add_api_key(&conn, "abc123", "old_user").unwrap();
        add_api_key(&conn, "abc123", "new_user").unwrap();
        let resolver = ApiKeyTable::new(&conn);
        assert_eq!(resolver.resolve("abc123").unwrap(), "new_user");
    }
}
