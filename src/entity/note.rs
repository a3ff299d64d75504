// src/entity/note.rs
use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: Uuid,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub secure: bool,
}

impl Note {
    /// Stamp a fresh id and the current time (second precision).
    pub fn new<I, S>(tags: I, content: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now().trunc_subsecs(0),
            content: content.into(),
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
            secure: false,
        }
    }

    /// Rebuild a note that already has an identity, e.g. from a stored row.
    pub(crate) fn with_id(
        id: Uuid,
        created_at: DateTime<Utc>,
        content: String,
        tags: BTreeSet<String>,
        secure: bool,
    ) -> Self {
        Self {
            id,
            created_at,
            content,
            tags,
            secure,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Canonical 36 character id.
    pub fn full_id(&self) -> String {
        self.id.hyphenated().to_string()
    }

    pub fn short_id(&self) -> String {
        super::short_id(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_lowercases_tags() {
        let note = Note::new(["Git", "CLI", "git"], "hello");
        let tags: Vec<_> = note.tags.iter().cloned().collect();
        assert_eq!(tags, vec!["cli".to_string(), "git".to_string()]);
        assert_eq!(note.content, "hello");
        assert!(!note.secure);
    }

    #[test]
    fn test_new_note_has_second_precision() {
        let note = Note::new(Vec::<String>::new(), "hello");
        assert_eq!(note.created_at.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_new_notes_get_distinct_ids() {
        let a = Note::new(Vec::<String>::new(), "a");
        let b = Note::new(Vec::<String>::new(), "b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.full_id().len(), crate::entity::FULL_ID_LENGTH);
        assert_eq!(a.short_id().len(), crate::entity::SHORT_ID_LENGTH);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Note::new(["a"], "plain");
        let mut copy = original.clone();
        copy.content = "changed".to_string();
        copy.tags.insert("b".to_string());

        assert_eq!(original.content, "plain");
        assert_eq!(original.tags.len(), 1);
        assert_eq!(copy.id(), original.id());
    }
}
