/*!
 * Repository layer for database operations.
 *
 * Typed access to the `subjects` and `captions` tables, plus the
 * `CaptionStore` implementation the engine persists through.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{CaptionRecord, SubjectRecord};
use crate::captions::model::{Caption, CaptionId, MediaSubject};
use crate::errors::StoreError;
use crate::store::{CaptionStore, CaptionUpdate};

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Subject Operations
    // =========================================================================

    /// Insert a video, or refresh its duration when it is already known
    pub async fn upsert_subject(&self, subject: &MediaSubject) -> Result<()> {
        let record = SubjectRecord::from_subject(subject);

        self.db
            .execute_async(move |conn| Self::upsert_subject_sync(conn, &record))
            .await
    }

    fn upsert_subject_sync(conn: &Connection, record: &SubjectRecord) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO subjects (id, duration_secs, created_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                duration_secs = COALESCE(excluded.duration_secs, subjects.duration_secs)
            "#,
            params![record.id, record.duration_secs, record.created_at],
        )?;
        Ok(())
    }

    /// Get a video by id
    pub async fn get_subject(&self, subject_id: &str) -> Result<Option<SubjectRecord>> {
        let subject_id = subject_id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT id, duration_secs, created_at FROM subjects WHERE id = ?1",
                        [&subject_id],
                        |row| {
                            Ok(SubjectRecord {
                                id: row.get(0)?,
                                duration_secs: row.get(1)?,
                                created_at: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// All videos with their caption counts
    pub async fn list_subjects(&self) -> Result<Vec<(SubjectRecord, i64)>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT s.id, s.duration_secs, s.created_at, COUNT(c.id)
                    FROM subjects s LEFT JOIN captions c ON c.subject_id = s.id
                    GROUP BY s.id ORDER BY s.created_at
                    "#,
                )?;

                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            SubjectRecord {
                                id: row.get(0)?,
                                duration_secs: row.get(1)?,
                                created_at: row.get(2)?,
                            },
                            row.get(3)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(rows)
            })
            .await
    }

    /// Remove a video and all of its captions
    pub async fn delete_subject(&self, subject_id: &str) -> Result<bool> {
        let subject_id = subject_id.to_string();

        self.db
            .execute_async(move |conn| {
                let rows = conn.execute("DELETE FROM subjects WHERE id = ?1", [&subject_id])?;
                Ok(rows > 0)
            })
            .await
    }

    // =========================================================================
    // Caption Operations
    // =========================================================================

    /// Insert a caption; `false` when the id is already taken
    pub async fn insert_caption(&self, subject_id: &str, caption: &Caption) -> Result<bool> {
        let record = CaptionRecord::from_caption(subject_id, caption);
        let subject = SubjectRecord::new(subject_id, None);

        self.db
            .transaction_async(move |tx| {
                if Self::get_caption_sync(tx, &record.id)?.is_some() {
                    return Ok(false);
                }
                Self::upsert_subject_sync(tx, &subject)?;
                Self::insert_caption_sync(tx, &record)?;
                Ok(true)
            })
            .await
    }

    fn insert_caption_sync(conn: &Connection, record: &CaptionRecord) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO captions (
                id, subject_id, start_secs, end_secs, line1, line2,
                row_type, serial_number, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.id,
                record.subject_id,
                record.start_secs,
                record.end_secs,
                record.line1,
                record.line2,
                record.row_type,
                record.serial_number,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a caption row by id
    pub async fn get_caption(&self, id: &CaptionId) -> Result<Option<CaptionRecord>> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| Self::get_caption_sync(conn, &id))
            .await
    }

    fn get_caption_sync(conn: &Connection, id: &str) -> Result<Option<CaptionRecord>> {
        let result = conn
            .query_row(
                r#"
                SELECT id, subject_id, start_secs, end_secs, line1, line2,
                       row_type, serial_number, created_at, updated_at
                FROM captions WHERE id = ?1
                "#,
                [id],
                Self::map_caption_row,
            )
            .optional()?;

        Ok(result)
    }

    fn map_caption_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaptionRecord> {
        Ok(CaptionRecord {
            id: row.get(0)?,
            subject_id: row.get(1)?,
            start_secs: row.get(2)?,
            end_secs: row.get(3)?,
            line1: row.get(4)?,
            line2: row.get(5)?,
            row_type: row.get(6)?,
            serial_number: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    /// All caption rows of a video, by start time
    pub async fn captions_for_subject(&self, subject_id: &str) -> Result<Vec<CaptionRecord>> {
        let subject_id = subject_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, subject_id, start_secs, end_secs, line1, line2,
                           row_type, serial_number, created_at, updated_at
                    FROM captions WHERE subject_id = ?1
                    ORDER BY start_secs, serial_number
                    "#,
                )?;

                let rows = stmt
                    .query_map([&subject_id], Self::map_caption_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(rows)
            })
            .await
    }

    /// Apply an update; `None` when the caption does not exist
    pub async fn apply_update(&self, id: &CaptionId, update: &CaptionUpdate) -> Result<Option<Caption>> {
        let id = id.to_string();
        let update = update.clone();

        self.db
            .transaction_async(move |tx| {
                let Some(record) = Self::get_caption_sync(tx, &id)? else {
                    return Ok(None);
                };

                let mut caption = record.to_caption()?;
                update.apply_to(&mut caption);
                let mut next = CaptionRecord::from_caption(&record.subject_id, &caption);
                next.created_at = record.created_at;

                tx.execute(
                    r#"
                    UPDATE captions SET
                        start_secs = ?2, end_secs = ?3, line1 = ?4, line2 = ?5,
                        row_type = ?6, serial_number = ?7, updated_at = ?8
                    WHERE id = ?1
                    "#,
                    params![
                        next.id,
                        next.start_secs,
                        next.end_secs,
                        next.line1,
                        next.line2,
                        next.row_type,
                        next.serial_number,
                        next.updated_at,
                    ],
                )?;

                Ok(Some(caption))
            })
            .await
    }

    /// Delete a caption row
    pub async fn remove_caption(&self, id: &CaptionId) -> Result<bool> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let rows = conn.execute("DELETE FROM captions WHERE id = ?1", [&id])?;
                Ok(rows > 0)
            })
            .await
    }

    /// Replace every caption of a video in one transaction
    pub async fn replace_subject_captions(&self, subject: &MediaSubject, captions: &[Caption]) -> Result<usize> {
        let subject = SubjectRecord::from_subject(subject);
        let records: Vec<CaptionRecord> = captions
            .iter()
            .map(|c| CaptionRecord::from_caption(&subject.id, c))
            .collect();

        self.db
            .transaction_async(move |tx| {
                Self::upsert_subject_sync(tx, &subject)?;
                let removed = tx.execute("DELETE FROM captions WHERE subject_id = ?1", [&subject.id])?;
                for record in &records {
                    Self::insert_caption_sync(tx, record)?;
                }
                debug!(
                    "Replaced {} captions of {} with {}",
                    removed,
                    subject.id,
                    records.len()
                );
                Ok(records.len())
            })
            .await
    }
}

#[async_trait]
impl CaptionStore for Repository {
    async fn load_captions(&self, subject_id: &str) -> Result<Vec<Caption>, StoreError> {
        let records = self.captions_for_subject(subject_id).await?;
        let captions = records
            .iter()
            .map(CaptionRecord::to_caption)
            .collect::<Result<Vec<_>>>()?;
        Ok(captions)
    }

    async fn save_caption(&self, subject_id: &str, caption: &Caption) -> Result<Caption, StoreError> {
        if self.insert_caption(subject_id, caption).await? {
            Ok(caption.clone())
        } else {
            Err(StoreError::Conflict(format!("caption {} already exists", caption.id)))
        }
    }

    async fn update_caption(&self, id: &CaptionId, update: &CaptionUpdate) -> Result<Caption, StoreError> {
        self.apply_update(id, update)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete_caption(&self, id: &CaptionId) -> Result<bool, StoreError> {
        Ok(self.remove_caption(id).await?)
    }
}
