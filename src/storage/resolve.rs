//! Turning user supplied ids into notes.
//!
//! A full id names at most one note. An 8 character short id may name none,
//! one or several; the several case is handed back to the caller instead of
//! picking one.

use std::collections::BTreeSet;

use tracing::debug;

use super::NoteStore;
use crate::entity::{Note, NoteId};
use crate::error::{Result, ShortFormError};

/// Outcome of resolving a user supplied id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    Found(T),
    NotFound,
    /// Several notes share the short id; the caller must ask for a full id.
    Ambiguous(Vec<Note>),
}

impl<T> Resolved<T> {
    fn label(&self) -> &'static str {
        match self {
            Resolved::Found(_) => "found",
            Resolved::NotFound => "not_found",
            Resolved::Ambiguous(_) => "ambiguous",
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolved::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl NoteStore {
    /// Resolve a full or short id. Malformed input fails before any query.
    pub fn resolve(&self, input: &str) -> Result<Resolved<Note>> {
        let resolved = match NoteId::parse(input)? {
            NoteId::Full(id) => match self.get(&id) {
                Ok(note) => Resolved::Found(note),
                Err(ShortFormError::NoteNotFound(_)) => Resolved::NotFound,
                Err(e) => return Err(e),
            },
            NoteId::Short(prefix) => {
                let mut candidates = self.find_by_short_id(&prefix)?;
                match candidates.len() {
                    0 => Resolved::NotFound,
                    1 => Resolved::Found(candidates.remove(0)),
                    _ => Resolved::Ambiguous(candidates),
                }
            }
        };

        debug!(input, outcome = resolved.label(), "resolved note id");
        Ok(resolved)
    }

    /// Resolve, then delete. `Found` carries the note as it was.
    pub fn resolve_and_delete(&mut self, input: &str) -> Result<Resolved<Note>> {
        match self.resolve(input)? {
            Resolved::Found(note) => match self.delete(&note.id()) {
                Ok(()) => Ok(Resolved::Found(note)),
                Err(ShortFormError::NoteNotFound(_)) => Ok(Resolved::NotFound),
                Err(e) => Err(e),
            },
            other => Ok(other),
        }
    }

    /// Resolve, then edit. `Found` carries the updated note.
    pub fn resolve_and_edit(
        &mut self,
        input: &str,
        content: Option<&str>,
        tags: Option<&BTreeSet<String>>,
    ) -> Result<Resolved<Note>> {
        if content.is_some_and(|c| c.trim().is_empty()) {
            return Err(ShortFormError::EmptyContent);
        }

        match self.resolve(input)? {
            Resolved::Found(note) => match self.edit(&note.id(), content, tags) {
                Ok(updated) => Ok(Resolved::Found(updated)),
                Err(ShortFormError::NoteNotFound(_)) => Ok(Resolved::NotFound),
                Err(e) => Err(e),
            },
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SubsecRound, Utc};
    use uuid::Uuid;

    fn insert_with_id(store: &mut NoteStore, id: &str, content: &str) -> Note {
        let note = Note::with_id(
            Uuid::parse_str(id).unwrap(),
            Utc::now().trunc_subsecs(0),
            content.to_string(),
            BTreeSet::from(["t".to_string()]),
            false,
        );
        store.insert(&note).unwrap();
        note
    }

    #[test]
    fn test_resolve_full_id() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let note = store.create(["a"], "hello", false).unwrap();

        assert_eq!(
            store.resolve(&note.full_id()).unwrap(),
            Resolved::Found(note.clone())
        );
        assert_eq!(
            store.resolve(&Uuid::new_v4().to_string()).unwrap(),
            Resolved::NotFound
        );
    }

    #[test]
    fn test_resolve_unique_short_id() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let note = store.create(["a"], "hello", false).unwrap();

        let resolved = store.resolve(&note.short_id()).unwrap();
        assert_eq!(resolved.found().map(|n| n.id()), Some(note.id()));
    }

    #[test]
    fn test_resolve_short_id_is_case_insensitive() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let note = insert_with_id(&mut store, "abcdef12-0000-4000-8000-000000000001", "x");

        let resolved = store.resolve("ABCDEF12").unwrap();
        assert_eq!(resolved, Resolved::Found(note));
    }

    #[test]
    fn test_resolve_short_id_without_match() {
        let store = NoteStore::open_in_memory().unwrap();
        assert_eq!(store.resolve("deadbeef").unwrap(), Resolved::NotFound);
    }

    #[test]
    fn test_short_id_collision_is_ambiguous() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let first = insert_with_id(&mut store, "abcdef12-0000-4000-8000-000000000001", "one");
        let second = insert_with_id(&mut store, "abcdef12-1111-4000-8000-000000000002", "two");
        insert_with_id(&mut store, "abcdef13-0000-4000-8000-000000000003", "three");

        match store.resolve("abcdef12").unwrap() {
            Resolved::Ambiguous(candidates) => {
                let mut got: Vec<Uuid> = candidates.iter().map(Note::id).collect();
                got.sort();
                let mut want = vec![first.id(), second.id()];
                want.sort();
                assert_eq!(got, want);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_input_fails_fast() {
        let store = NoteStore::open_in_memory().unwrap();
        for input in ["", "abc", "abcdef123", "not-a-uuid-but-exactly-36-chars-long"] {
            let err = store.resolve(input).unwrap_err();
            assert!(matches!(err, ShortFormError::MalformedId(_)), "{input}");
        }
    }

    #[test]
    fn test_resolve_and_delete_outcomes() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let a = insert_with_id(&mut store, "abcdef12-0000-4000-8000-000000000001", "one");
        let b = insert_with_id(&mut store, "abcdef12-1111-4000-8000-000000000002", "two");

        assert!(matches!(
            store.resolve_and_delete("abcdef12").unwrap(),
            Resolved::Ambiguous(ref c) if c.len() == 2
        ));
        // Nothing was deleted on ambiguity.
        assert!(store.get(&a.id()).is_ok());
        assert!(store.get(&b.id()).is_ok());

        let deleted = store.resolve_and_delete(&a.full_id()).unwrap();
        assert_eq!(deleted.found().map(|n| n.id()), Some(a.id()));
        assert!(store.read_tags(&a.id()).unwrap().is_empty());

        // Only one left with the prefix now.
        let deleted = store.resolve_and_delete("abcdef12").unwrap();
        assert_eq!(deleted.found().map(|n| n.id()), Some(b.id()));

        assert_eq!(
            store.resolve_and_delete("abcdef12").unwrap(),
            Resolved::NotFound
        );
    }

    #[test]
    fn test_resolve_and_edit() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let note = store.create(["a"], "before", false).unwrap();

        let tags = BTreeSet::from(["b".to_string()]);
        let edited = store
            .resolve_and_edit(&note.short_id(), Some("after"), Some(&tags))
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(edited.content, "after");
        assert_eq!(edited.tags, tags);

        assert_eq!(
            store
                .resolve_and_edit(&Uuid::new_v4().to_string(), Some("x"), None)
                .unwrap(),
            Resolved::NotFound
        );
    }

    #[test]
    fn test_resolve_and_edit_rejects_empty_content_first() {
        let mut store = NoteStore::open_in_memory().unwrap();
        let err = store.resolve_and_edit("bad", Some(""), None).unwrap_err();
        assert!(matches!(err, ShortFormError::EmptyContent));
    }
}
