//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide minimal owner persistence for event records.
//! - Cover the presence flag introduced by the second schema migration.

use crate::model::user::{User, UserId};
use crate::repo::event_repo::{
    parse_uuid, table_exists, table_has_column, RepoError, RepoResult,
};
use rusqlite::{params, Connection};

/// Repository interface for user records.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn set_online(&self, id: UserId, online: bool) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "users")? {
            return Err(RepoError::MissingRequiredTable("users"));
        }
        for column in ["uuid", "display_name", "online"] {
            if !table_has_column(conn, "users", column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: "users",
                    column,
                });
            }
        }
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        if user.display_name.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "user display_name cannot be blank".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO users (uuid, display_name, online) VALUES (?1, ?2, ?3);",
            params![
                user.uuid.to_string(),
                user.display_name.as_str(),
                i64::from(user.online),
            ],
        )?;

        Ok(user.uuid)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, display_name, online
             FROM users
             WHERE uuid = ?1;",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            let uuid = parse_uuid(&uuid_text, "users.uuid")?;
            let online = match row.get::<_, i64>("online")? {
                0 => false,
                1 => true,
                other => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid online value `{other}` in users.online"
                    )));
                }
            };
            return Ok(Some(User {
                uuid,
                display_name: row.get("display_name")?,
                online,
            }));
        }

        Ok(None)
    }

    fn set_online(&self, id: UserId, online: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                online = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), i64::from(online)],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}
