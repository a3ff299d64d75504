mod note;

pub use note::Note;

use uuid::Uuid;

use crate::error::{Result, ShortFormError};

/// Length of a hyphenated note id, e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`.
pub const FULL_ID_LENGTH: usize = 36;

/// Length of the abbreviated id shown in listings.
pub const SHORT_ID_LENGTH: usize = 8;

/// A user supplied note id, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteId {
    Full(Uuid),
    Short(String),
}

impl NoteId {
    /// Classify raw input without touching storage.
    ///
    /// A 36 character input must parse as a UUID; an 8 character input is
    /// taken as a prefix. Every other length, and any non-ASCII input, is
    /// rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if !input.is_ascii() {
            return Err(ShortFormError::MalformedId(input.to_string()));
        }
        match input.len() {
            FULL_ID_LENGTH => Uuid::parse_str(input)
                .map(NoteId::Full)
                .map_err(|_| ShortFormError::MalformedId(input.to_string())),
            SHORT_ID_LENGTH => Ok(NoteId::Short(input.to_ascii_lowercase())),
            _ => Err(ShortFormError::MalformedId(input.to_string())),
        }
    }
}

/// First eight characters of a full id.
pub fn short_id(id: &Uuid) -> String {
    id.hyphenated().to_string()[..SHORT_ID_LENGTH].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_id() {
        let id = Uuid::new_v4();
        assert_eq!(NoteId::parse(&id.to_string()).unwrap(), NoteId::Full(id));
    }

    #[test]
    fn test_parse_full_id_uppercase() {
        let id = Uuid::new_v4();
        let upper = id.to_string().to_uppercase();
        assert_eq!(NoteId::parse(&upper).unwrap(), NoteId::Full(id));
    }

    #[test]
    fn test_parse_short_id() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(
            NoteId::parse(&id[..8]).unwrap(),
            NoteId::Short(id[..8].to_string())
        );
    }

    #[test]
    fn test_parse_rejects_other_lengths() {
        for input in ["", "abc", "1234567", "123456789", "this isn't a valid note ID"] {
            let err = NoteId::parse(input).unwrap_err();
            assert!(matches!(err, ShortFormError::MalformedId(_)), "{input}");
            assert!(err.is_validation());
        }
    }

    #[test]
    fn test_parse_rejects_36_chars_that_are_not_a_uuid() {
        let input = "z".repeat(FULL_ID_LENGTH);
        assert!(matches!(
            NoteId::parse(&input),
            Err(ShortFormError::MalformedId(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_ascii() {
        // Eight bytes, four characters.
        for input in ["éééé", "abcdéf"] {
            assert!(matches!(
                NoteId::parse(input),
                Err(ShortFormError::MalformedId(_))
            ));
        }
    }

    #[test]
    fn test_short_id() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(short_id(&id), "67e55044");
    }
}
