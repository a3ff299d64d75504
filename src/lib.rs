pub mod cli;
pub mod config;
pub mod crypto;
pub mod entity;
pub mod error;
pub mod search;
pub mod storage;

pub use config::Config;
pub use crypto::NoteCipher;
pub use entity::Note;
pub use error::{Result, ShortFormError};
pub use search::{DateRange, SearchFilter};
pub use storage::{NoteStore, Resolved};
