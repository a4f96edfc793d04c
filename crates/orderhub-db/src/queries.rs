use crate::models::{ContactChanges, ContactRow, NewContact, NewUser, UserChanges, UserRow};
use crate::{Database, OptionalExt, placeholders};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, company, position, user_type, is_active";

const CONTACT_COLUMNS: &str =
    "id, city, street, house, structure, building, apartment, phone";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, password, first_name, last_name, company, position, user_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.company,
                    user.position,
                    user.user_type,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", &email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    /// Returns false when no such user exists.
    pub fn update_user(&self, id: i64, changes: &UserChanges) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET
                    email = COALESCE(?2, email),
                    password = COALESCE(?3, password),
                    first_name = COALESCE(?4, first_name),
                    last_name = COALESCE(?5, last_name),
                    company = COALESCE(?6, company),
                    position = COALESCE(?7, position)
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.email,
                    changes.password_hash,
                    changes.first_name,
                    changes.last_name,
                    changes.company,
                    changes.position,
                ],
            )?;
            Ok(updated > 0)
        })
    }

    // -- Email confirmation --

    /// One live token per user: a new digest replaces the previous one.
    pub fn store_confirm_token(&self, user_id: i64, key_digest: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO email_confirm_tokens (user_id, key_digest) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                    key_digest = excluded.key_digest,
                    created_at = datetime('now')",
                rusqlite::params![user_id, key_digest],
            )?;
            Ok(())
        })
    }

    /// Activates the account owning the token and deletes the token.
    /// Returns the user id, or None if email and token do not match.
    pub fn consume_confirm_token(&self, email: &str, key_digest: &str) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let user_id: Option<i64> = tx
                .query_row(
                    "SELECT t.user_id FROM email_confirm_tokens t
                     JOIN users u ON u.id = t.user_id
                     WHERE u.email = ?1 AND t.key_digest = ?2",
                    rusqlite::params![email, key_digest],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(user_id) = user_id {
                tx.execute("UPDATE users SET is_active = 1 WHERE id = ?1", [user_id])?;
                tx.execute("DELETE FROM email_confirm_tokens WHERE user_id = ?1", [user_id])?;
            }
            tx.commit()?;
            Ok(user_id)
        })
    }

    // -- Password reset --

    pub fn store_reset_token(&self, user_id: i64, key_digest: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_reset_tokens (user_id, key_digest) VALUES (?1, ?2)",
                rusqlite::params![user_id, key_digest],
            )?;
            Ok(())
        })
    }

    /// Validates a reset token younger than `ttl_hours`, stores the new
    /// password hash and drops every reset token of that user.
    pub fn consume_reset_token(
        &self,
        key_digest: &str,
        ttl_hours: u32,
        password_hash: &str,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let user_id: Option<i64> = tx
                .query_row(
                    "SELECT user_id FROM password_reset_tokens
                     WHERE key_digest = ?1
                       AND created_at >= datetime('now', '-' || ?2 || ' hours')",
                    rusqlite::params![key_digest, ttl_hours],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(user_id) = user_id {
                tx.execute(
                    "UPDATE users SET password = ?2 WHERE id = ?1",
                    rusqlite::params![user_id, password_hash],
                )?;
                tx.execute("DELETE FROM password_reset_tokens WHERE user_id = ?1", [user_id])?;
            }
            tx.commit()?;
            Ok(user_id)
        })
    }

    // -- Contacts --

    pub fn list_contacts(&self, user_id: i64) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM contacts WHERE user_id = ?1 ORDER BY id", CONTACT_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| contact_from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_contact(&self, user_id: i64, id: i64) -> Result<Option<ContactRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM contacts WHERE id = ?1 AND user_id = ?2", CONTACT_COLUMNS);
            conn.query_row(&sql, [id, user_id], |row| contact_from_row(row, 0))
                .optional()
        })
    }

    pub fn create_contact(&self, user_id: i64, contact: &NewContact) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contacts (user_id, city, street, house, structure, building, apartment, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user_id,
                    contact.city,
                    contact.street,
                    contact.house,
                    contact.structure,
                    contact.building,
                    contact.apartment,
                    contact.phone,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Returns false when the contact does not exist or belongs to someone else.
    pub fn update_contact(&self, user_id: i64, id: i64, changes: &ContactChanges) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE contacts SET
                    city = COALESCE(?3, city),
                    street = COALESCE(?4, street),
                    house = COALESCE(?5, house),
                    structure = COALESCE(?6, structure),
                    building = COALESCE(?7, building),
                    apartment = COALESCE(?8, apartment),
                    phone = COALESCE(?9, phone)
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![
                    id,
                    user_id,
                    changes.city,
                    changes.street,
                    changes.house,
                    changes.structure,
                    changes.building,
                    changes.apartment,
                    changes.phone,
                ],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn delete_contacts(&self, user_id: i64, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM contacts WHERE user_id = ?1 AND id IN ({})",
                placeholders(1, ids.len())
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            params.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));
            Ok(conn.execute(&sql, params.as_slice())?)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &dyn rusqlite::types::ToSql) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                company: row.get(5)?,
                position: row.get(6)?,
                user_type: row.get(7)?,
                is_active: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Reads contact columns in `CONTACT_COLUMNS` order starting at `start`.
pub(crate) fn contact_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<ContactRow> {
    Ok(ContactRow {
        id: row.get(start)?,
        city: row.get(start + 1)?,
        street: row.get(start + 2)?,
        house: row.get(start + 3)?,
        structure: row.get(start + 4)?,
        building: row.get(start + 5)?,
        apartment: row.get(start + 6)?,
        phone: row.get(start + 7)?,
    })
}
