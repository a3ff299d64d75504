use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::DateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::tags as tag_index;
use crate::crypto::NoteCipher;
use crate::entity::Note;
use crate::error::{Result, ShortFormError};
use crate::search::{compile, SearchFilter};

const NOTE_COLUMNS: &str = "id, timestamp, content, secure";

/// SQLite-backed note journal.
pub struct NoteStore {
    conn: Connection,
    cipher: Option<NoteCipher>,
}

impl NoteStore {
    /// Open or create the journal database, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened note store");

        let store = Self { conn, cipher: None };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory journal, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            cipher: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Attach the codec used for secure notes.
    pub fn with_cipher(mut self, cipher: NoteCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn cipher(&self) -> Option<&NoteCipher> {
        self.cipher.as_ref()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY NOT NULL,
                timestamp INTEGER NOT NULL,
                content TEXT NOT NULL CHECK (length(content) > 0),
                secure INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS notes_timestamp_index ON notes (timestamp);

            CREATE TABLE IF NOT EXISTS note_tags (
                note_id TEXT NOT NULL,
                tag TEXT NOT NULL CHECK (length(tag) > 0)
            );

            CREATE INDEX IF NOT EXISTS note_tags_note_id_index ON note_tags (note_id);
            CREATE INDEX IF NOT EXISTS note_tags_tag_index ON note_tags (tag);
            ",
        )?;
        Ok(())
    }

    /// Run `op` atomically.
    ///
    /// Commits when `op` succeeds. On failure every statement issued inside
    /// `op` is rolled back and the original error is returned; if the
    /// rollback fails too, both are reported.
    pub fn run_in_transaction<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        match op(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "rolling back transaction");
                if let Err(rollback_err) = tx.rollback() {
                    return Err(ShortFormError::Rollback {
                        cause: Box::new(err),
                        rollback: rollback_err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Create and persist a note.
    ///
    /// Secure notes are encrypted before they reach the database; the
    /// returned note keeps the plaintext.
    pub fn create<I, S>(&mut self, tags: I, content: &str, secure: bool) -> Result<Note>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if content.trim().is_empty() {
            return Err(ShortFormError::EmptyContent);
        }

        let mut note = Note::new(tags, content);
        note.secure = secure;

        let stored = if secure {
            self.require_cipher()?.seal(&note)?
        } else {
            note.clone()
        };

        self.insert(&stored)?;
        info!(id = %note.full_id(), tags = note.tags.len(), secure, "created note");
        Ok(note)
    }

    /// Persist a note exactly as given: the note row, then its tag rows.
    pub(crate) fn insert(&mut self, note: &Note) -> Result<()> {
        if note.content.is_empty() {
            return Err(ShortFormError::EmptyContent);
        }

        self.run_in_transaction(|tx| {
            tx.execute(
                "INSERT INTO notes (id, timestamp, content, secure) VALUES (?1, ?2, ?3, ?4)",
                params![
                    note.full_id(),
                    note.created_at.timestamp(),
                    note.content,
                    note.secure,
                ],
            )?;

            if !note.tags.is_empty() {
                tag_index::write_tags(tx, &note.id(), &note.tags)?;
            }
            Ok(())
        })
    }

    /// Fetch a note by its full id, with tags.
    pub fn get(&self, id: &Uuid) -> Result<Note> {
        let id_str = id.hyphenated().to_string();
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                [&id_str],
                StoredRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => self.hydrate(row),
            None => Err(ShortFormError::NoteNotFound(id_str)),
        }
    }

    /// All notes whose id starts with `prefix`, oldest first.
    pub fn find_by_short_id(&self, prefix: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM notes WHERE substr(id, 1, ?1) = ?2 ORDER BY timestamp ASC, rowid ASC",
            NOTE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                params![prefix.chars().count() as i64, prefix.to_ascii_lowercase()],
                StoredRow::from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    /// Notes matching `filter`, oldest first.
    pub fn search(&self, filter: &SearchFilter) -> Result<Vec<Note>> {
        let plan = compile(filter);
        let (where_clause, values) = plan.where_clause();
        debug!(?plan, "searching notes");

        let sql = format!(
            "SELECT {} FROM notes {} ORDER BY timestamp ASC, rowid ASC",
            NOTE_COLUMNS, where_clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), StoredRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in rows {
            let note = self.hydrate(row)?;
            if plan.accepts(&note) {
                notes.push(note);
            }
        }

        debug!(count = notes.len(), "search finished");
        Ok(notes)
    }

    /// Delete a note and all of its tag rows.
    pub fn delete(&mut self, id: &Uuid) -> Result<()> {
        let id_str = id.hyphenated().to_string();
        self.run_in_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM notes WHERE id = ?1", [&id_str])?;
            if deleted == 0 {
                return Err(ShortFormError::NoteNotFound(id_str.clone()));
            }
            tag_index::delete_tags(tx, id)?;
            Ok(())
        })?;

        info!(id = %id_str, "deleted note");
        Ok(())
    }

    /// Replace a note's content and/or its tag set.
    ///
    /// Either part is only written when given. New content for a secure note
    /// is encrypted first.
    pub fn edit(
        &mut self,
        id: &Uuid,
        content: Option<&str>,
        new_tags: Option<&BTreeSet<String>>,
    ) -> Result<Note> {
        if content.is_some_and(|c| c.trim().is_empty()) {
            return Err(ShortFormError::EmptyContent);
        }

        let existing = self.get(id)?;
        let stored_content = match content {
            Some(c) if existing.secure => Some(self.require_cipher()?.encrypt(c)?),
            Some(c) => Some(c.to_string()),
            None => None,
        };
        let new_tags: Option<BTreeSet<String>> =
            new_tags.map(|t| t.iter().map(|tag| tag.to_lowercase()).collect());

        let id_str = existing.full_id();
        self.run_in_transaction(|tx| {
            if let Some(ref content) = stored_content {
                let updated = tx.execute(
                    "UPDATE notes SET content = ?1 WHERE id = ?2",
                    params![content, id_str],
                )?;
                if updated == 0 {
                    return Err(ShortFormError::NoteNotFound(id_str.clone()));
                }
            }

            if let Some(ref tag_set) = new_tags {
                tag_index::replace_tags(tx, id, tag_set)?;
            }
            Ok(())
        })?;

        info!(
            id = %id_str,
            content = stored_content.is_some(),
            tags = new_tags.is_some(),
            "edited note"
        );
        self.get(id)
    }

    /// Tags for a note, empty when it has none.
    pub fn read_tags(&self, id: &Uuid) -> Result<BTreeSet<String>> {
        tag_index::read_tags(&self.conn, id)
    }

    /// Number of notes carrying any of `tags`.
    pub fn count_by_tags(&self, tags: &BTreeSet<String>) -> Result<u64> {
        tag_index::count_by_tags(&self.conn, tags)
    }

    /// Delete every note carrying any of `tags`, one transaction per note.
    /// Returns the number of notes removed.
    pub fn delete_by_tags(&mut self, tags: &BTreeSet<String>) -> Result<usize> {
        let ids = tag_index::note_ids_by_tags(&self.conn, tags)?;

        let mut deleted = 0;
        for id in ids {
            match self.delete(&id) {
                Ok(()) => deleted += 1,
                Err(ShortFormError::NoteNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        info!(deleted, "deleted notes by tag");
        Ok(deleted)
    }

    /// Plaintext copy of a note, decrypting secure content.
    pub fn reveal(&self, note: &Note) -> Result<Note> {
        if !note.secure {
            return Ok(note.clone());
        }
        self.require_cipher()?.open(note)
    }

    fn require_cipher(&self) -> Result<&NoteCipher> {
        self.cipher.as_ref().ok_or(ShortFormError::SecretRequired)
    }

    fn hydrate(&self, row: StoredRow) -> Result<Note> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|_| ShortFormError::Storage(format!("Corrupt note id: {}", row.id)))?;
        let created_at = DateTime::from_timestamp(row.timestamp, 0).ok_or_else(|| {
            ShortFormError::Storage(format!("Corrupt timestamp for note {}", row.id))
        })?;
        let tags = tag_index::read_tags(&self.conn, &id)?;

        Ok(Note::with_id(id, created_at, row.content, tags, row.secure))
    }
}

/// A `notes` row before its tags are attached.
struct StoredRow {
    id: String,
    timestamp: i64,
    content: String,
    secure: bool,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            content: row.get(2)?,
            secure: row.get(3)?,
        })
    }
}

impl From<rusqlite::Error> for ShortFormError {
    fn from(e: rusqlite::Error) -> Self {
        ShortFormError::Storage(format!("SQLite error: {}", e))
    }
}
