//! The `note_tags` side table.
//!
//! Writers take a `Transaction` so tag rows only ever change together with
//! the note row they belong to. A note's rows are replaced wholesale, never
//! diffed.

use std::collections::BTreeSet;

use rusqlite::{params, params_from_iter, Connection, Transaction};
use uuid::Uuid;

use crate::error::{Result, ShortFormError};

/// Insert one row per tag. Assumes the note has no rows yet.
pub fn write_tags(tx: &Transaction<'_>, note_id: &Uuid, tags: &BTreeSet<String>) -> Result<()> {
    let id = note_id.hyphenated().to_string();
    let mut stmt = tx.prepare_cached("INSERT INTO note_tags (note_id, tag) VALUES (?1, ?2)")?;
    for tag in tags {
        stmt.execute(params![id, tag])?;
    }
    Ok(())
}

/// Drop every row for the note, then write `tags`.
pub fn replace_tags(tx: &Transaction<'_>, note_id: &Uuid, tags: &BTreeSet<String>) -> Result<()> {
    delete_tags(tx, note_id)?;
    write_tags(tx, note_id, tags)
}

/// Remove every row for the note. Returns how many rows went away.
pub fn delete_tags(tx: &Transaction<'_>, note_id: &Uuid) -> Result<usize> {
    let deleted = tx.execute(
        "DELETE FROM note_tags WHERE note_id = ?1",
        [note_id.hyphenated().to_string()],
    )?;
    Ok(deleted)
}

/// Tags for a note; empty when it has none or does not exist.
pub fn read_tags(conn: &Connection, note_id: &Uuid) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare_cached("SELECT DISTINCT tag FROM note_tags WHERE note_id = ?1")?;
    let tags = stmt
        .query_map([note_id.hyphenated().to_string()], |row| row.get(0))?
        .collect::<std::result::Result<BTreeSet<String>, _>>()?;
    Ok(tags)
}

/// Number of distinct notes carrying ANY of `tags`.
pub fn count_by_tags(conn: &Connection, tags: &BTreeSet<String>) -> Result<u64> {
    if tags.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "SELECT COUNT(DISTINCT note_id) FROM note_tags WHERE tag IN ({})",
        placeholders(tags.len())
    );
    let count: i64 = conn.query_row(&sql, params_from_iter(tags.iter()), |row| row.get(0))?;
    Ok(count as u64)
}

/// Ids of the notes carrying ANY of `tags`.
pub fn note_ids_by_tags(conn: &Connection, tags: &BTreeSet<String>) -> Result<Vec<Uuid>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT DISTINCT note_id FROM note_tags WHERE tag IN ({}) ORDER BY note_id",
        placeholders(tags.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map(params_from_iter(tags.iter()), |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.iter()
        .map(|id| {
            Uuid::parse_str(id)
                .map_err(|_| ShortFormError::Storage(format!("Corrupt note id in tag index: {}", id)))
        })
        .collect()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NoteStore;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_write_and_read_tags() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();

        store
            .run_in_transaction(|tx| write_tags(tx, &id, &set(&["b", "a"])))
            .unwrap();

        assert_eq!(read_tags(store.conn(), &id).unwrap(), set(&["a", "b"]));
    }

    #[test]
    fn test_read_tags_for_unknown_note_is_empty() {
        let store = NoteStore::open_in_memory().unwrap();
        assert!(read_tags(store.conn(), &Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn test_replace_tags_does_not_merge() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();

        store
            .run_in_transaction(|tx| write_tags(tx, &id, &set(&["a", "b"])))
            .unwrap();
        store
            .run_in_transaction(|tx| replace_tags(tx, &id, &set(&["c"])))
            .unwrap();

        assert_eq!(read_tags(store.conn(), &id).unwrap(), set(&["c"]));
    }

    #[test]
    fn test_delete_tags() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();

        store
            .run_in_transaction(|tx| {
                write_tags(tx, &id, &set(&["a", "b"]))?;
                write_tags(tx, &other, &set(&["a"]))
            })
            .unwrap();

        let deleted = store.run_in_transaction(|tx| delete_tags(tx, &id)).unwrap();
        assert_eq!(deleted, 2);
        assert!(read_tags(store.conn(), &id).unwrap().is_empty());
        assert_eq!(read_tags(store.conn(), &other).unwrap(), set(&["a"]));
    }

    #[test]
    fn test_count_and_ids_by_tags_use_any() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        store
            .run_in_transaction(|tx| {
                write_tags(tx, &first, &set(&["work", "git"]))?;
                write_tags(tx, &second, &set(&["home"]))?;
                write_tags(tx, &third, &set(&["misc"]))
            })
            .unwrap();

        let wanted = set(&["git", "work", "home"]);
        assert_eq!(count_by_tags(store.conn(), &wanted).unwrap(), 2);

        let mut ids = note_ids_by_tags(store.conn(), &wanted).unwrap();
        ids.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(count_by_tags(store.conn(), &BTreeSet::new()).unwrap(), 0);
        assert!(note_ids_by_tags(store.conn(), &BTreeSet::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_empty_tag_is_rejected_by_schema() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();

        let result = store.run_in_transaction(|tx| write_tags(tx, &id, &set(&[""])));
        assert!(matches!(result, Err(ShortFormError::Storage(_))));
        assert!(read_tags(store.conn(), &id).unwrap().is_empty());
    }
}
