//! `SQLite` storage for the circle ledger.
//!
//! This module holds the authoritative ledger state: circle metadata,
//! membership rows, and the append-only activity record stream. Every
//! multi-row mutation runs inside a single transaction, so a mutating
//! operation either fully applies or leaves no trace.
//!
//! Circle identifiers come from `AUTOINCREMENT`, which makes them strictly
//! increasing from 1 and never reused. Validation happens before any insert,
//! so a rejected call never consumes an identifier.

// SQLite operations need to hold the lock for the duration of the operation.
// Dropping the guard earlier would require restructuring all methods.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::error::{LedgerError, Result};
use super::types::{ActivityRecord, Address, Circle, CircleId, ContentRef, Membership, Role};

/// `SQLite`-based storage for ledger state.
///
/// Thread-safe wrapper around a `SQLite` connection. The ledger components
/// are the sole writers of their respective tables; this type only provides
/// the atomic primitives they commit through.
pub struct LedgerStore {
    conn: Mutex<Connection>,
}

impl LedgerStore {
    /// Creates a new store at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            -- Circle metadata and bounded counters (Circle Registry)
            CREATE TABLE IF NOT EXISTS circles (
                circle_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                is_private INTEGER NOT NULL,
                capacity INTEGER NOT NULL,
                creator BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                last_activity INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                member_count INTEGER NOT NULL DEFAULT 0,
                message_count INTEGER NOT NULL DEFAULT 0
            );

            -- Admitted addresses per circle (Membership Ledger)
            CREATE TABLE IF NOT EXISTS circle_memberships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                circle_id INTEGER NOT NULL,
                address BLOB NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                joined_at INTEGER NOT NULL,
                UNIQUE(circle_id, address),
                FOREIGN KEY (circle_id) REFERENCES circles(circle_id)
            );

            -- Append-only encrypted content references (Activity Log)
            CREATE TABLE IF NOT EXISTS activity_records (
                circle_id INTEGER NOT NULL,
                record_index INTEGER NOT NULL,
                author BLOB NOT NULL,
                content_ref BLOB NOT NULL,
                posted_at INTEGER NOT NULL,
                PRIMARY KEY (circle_id, record_index),
                FOREIGN KEY (circle_id) REFERENCES circles(circle_id)
            );
            ",
        )?;

        Ok(())
    }

    // ==================== Circle Operations ====================

    /// Inserts a circle together with its creator's `Admin` membership.
    ///
    /// Runs both inserts in one transaction and returns the freshly
    /// allocated circle identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_circle(
        &self,
        name: &str,
        description: &str,
        is_private: bool,
        capacity: u8,
        creator: &Address,
        now: i64,
    ) -> Result<CircleId> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            r"
            INSERT INTO circles
                (name, description, is_private, capacity, creator,
                 created_at, last_activity, is_active, member_count, message_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 1, 1, 0)
            ",
            params![
                name,
                description,
                is_private,
                capacity,
                creator.as_bytes().as_slice(),
                now,
            ],
        )?;

        let circle_id = u64::try_from(tx.last_insert_rowid())
            .map_err(|e| LedgerError::Storage(format!("Invalid circle rowid: {e}")))?;

        tx.execute(
            r"
            INSERT INTO circle_memberships (circle_id, address, role, joined_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                circle_id,
                creator.as_bytes().as_slice(),
                Role::Admin.as_str(),
                now,
            ],
        )?;

        tx.commit()?;
        Ok(circle_id)
    }

    /// Retrieves a circle by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a row is corrupt.
    pub fn get_circle(&self, circle_id: CircleId) -> Result<Option<Circle>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                r"
                SELECT circle_id, name, description, is_private, capacity, creator,
                       created_at, last_activity, is_active, member_count, message_count
                FROM circles
                WHERE circle_id = ?1
                ",
                params![circle_id],
                |row| {
                    let id: u64 = row.get(0)?;
                    let name: String = row.get(1)?;
                    let description: String = row.get(2)?;
                    let is_private: bool = row.get(3)?;
                    let capacity: u8 = row.get(4)?;
                    let creator: Vec<u8> = row.get(5)?;
                    let created_at: i64 = row.get(6)?;
                    let last_activity: i64 = row.get(7)?;
                    let is_active: bool = row.get(8)?;
                    let member_count: u8 = row.get(9)?;
                    let message_count: u8 = row.get(10)?;

                    Ok((
                        id,
                        name,
                        description,
                        is_private,
                        capacity,
                        creator,
                        created_at,
                        last_activity,
                        is_active,
                        member_count,
                        message_count,
                    ))
                },
            )
            .optional()?;

        match result {
            Some((
                id,
                name,
                description,
                is_private,
                capacity,
                creator,
                created_at,
                last_activity,
                is_active,
                member_count,
                message_count,
            )) => {
                let creator: [u8; 20] = creator.try_into().map_err(|_| {
                    LedgerError::Storage("Invalid creator address length".to_string())
                })?;

                Ok(Some(Circle {
                    id,
                    name,
                    description,
                    is_private,
                    capacity,
                    creator: Address::from_bytes(creator),
                    created_at,
                    last_activity,
                    is_active,
                    member_count,
                    message_count,
                }))
            }
            None => Ok(None),
        }
    }

    /// Marks a circle as archived.
    ///
    /// # Errors
    ///
    /// Returns an error if the circle doesn't exist or the database
    /// operation fails.
    pub fn set_archived(&self, circle_id: CircleId) -> Result<()> {
        let conn = self.lock()?;

        let rows = conn.execute(
            "UPDATE circles SET is_active = 0 WHERE circle_id = ?1",
            params![circle_id],
        )?;

        if rows == 0 {
            return Err(LedgerError::NotFound(circle_id));
        }

        Ok(())
    }

    // ==================== Membership Operations ====================

    /// Inserts a membership and updates the circle's member count and
    /// `last_activity` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_member(&self, membership: &Membership, new_member_count: u8) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            r"
            INSERT INTO circle_memberships (circle_id, address, role, joined_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                membership.circle_id,
                membership.address.as_bytes().as_slice(),
                membership.role.as_str(),
                membership.joined_at,
            ],
        )?;

        tx.execute(
            r"
            UPDATE circles SET member_count = ?1, last_activity = ?2
            WHERE circle_id = ?3
            ",
            params![new_member_count, membership.joined_at, membership.circle_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Removes a membership and updates the circle's member count and
    /// `last_activity` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_member(
        &self,
        circle_id: CircleId,
        address: &Address,
        new_member_count: u8,
        now: i64,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM circle_memberships WHERE circle_id = ?1 AND address = ?2",
            params![circle_id, address.as_bytes().as_slice()],
        )?;

        tx.execute(
            r"
            UPDATE circles SET member_count = ?1, last_activity = ?2
            WHERE circle_id = ?3
            ",
            params![new_member_count, now, circle_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Retrieves the membership of an address in a circle, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a row is corrupt.
    pub fn get_membership(
        &self,
        circle_id: CircleId,
        address: &Address,
    ) -> Result<Option<Membership>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                r"
                SELECT circle_id, address, role, joined_at
                FROM circle_memberships
                WHERE circle_id = ?1 AND address = ?2
                ",
                params![circle_id, address.as_bytes().as_slice()],
                |row| {
                    let circle_id: u64 = row.get(0)?;
                    let address: Vec<u8> = row.get(1)?;
                    let role: String = row.get(2)?;
                    let joined_at: i64 = row.get(3)?;

                    Ok((circle_id, address, role, joined_at))
                },
            )
            .optional()?;

        match result {
            Some((circle_id, address, role_str, joined_at)) => {
                let address: [u8; 20] = address.try_into().map_err(|_| {
                    LedgerError::Storage("Invalid member address length".to_string())
                })?;

                let role = Role::parse(&role_str)
                    .ok_or_else(|| LedgerError::Storage(format!("Invalid role: {role_str}")))?;

                Ok(Some(Membership {
                    circle_id,
                    address: Address::from_bytes(address),
                    role,
                    joined_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// Lists the identifiers of every circle an address belongs to,
    /// ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_circles(&self, address: &Address) -> Result<Vec<CircleId>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT circle_id FROM circle_memberships
            WHERE address = ?1
            ORDER BY circle_id ASC
            ",
        )?;

        let ids = stmt
            .query_map(params![address.as_bytes().as_slice()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<CircleId>, _>>()?;

        Ok(ids)
    }

    // ==================== Activity Operations ====================

    /// Appends an activity record and updates the circle's message count and
    /// `last_activity` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_record(&self, record: &ActivityRecord, new_message_count: u8) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            r"
            INSERT INTO activity_records (circle_id, record_index, author, content_ref, posted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                record.circle_id,
                record.record_index,
                record.author.as_bytes().as_slice(),
                record.content_ref.as_bytes(),
                record.posted_at,
            ],
        )?;

        tx.execute(
            r"
            UPDATE circles SET message_count = ?1, last_activity = ?2
            WHERE circle_id = ?3
            ",
            params![new_message_count, record.posted_at, record.circle_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Retrieves one page of activity records in `record_index` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a row is corrupt.
    pub fn records_page(
        &self,
        circle_id: CircleId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT circle_id, record_index, author, content_ref, posted_at
            FROM activity_records
            WHERE circle_id = ?1
            ORDER BY record_index ASC
            LIMIT ?2 OFFSET ?3
            ",
        )?;

        let rows = stmt
            .query_map(params![circle_id, limit, offset], |row| {
                let circle_id: u64 = row.get(0)?;
                let record_index: u32 = row.get(1)?;
                let author: Vec<u8> = row.get(2)?;
                let content_ref: Vec<u8> = row.get(3)?;
                let posted_at: i64 = row.get(4)?;

                Ok((circle_id, record_index, author, content_ref, posted_at))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(circle_id, record_index, author, content_ref, posted_at)| {
                let author: [u8; 20] = author.try_into().map_err(|_| {
                    LedgerError::Storage("Invalid author address length".to_string())
                })?;

                Ok(ActivityRecord {
                    circle_id,
                    record_index,
                    author: Address::from_bytes(author),
                    content_ref: ContentRef::new(content_ref),
                    posted_at,
                })
            })
            .collect()
    }
}
