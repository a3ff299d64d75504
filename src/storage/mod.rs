mod resolve;
mod sqlite_store;
pub mod tags;

pub use resolve::Resolved;
pub use sqlite_store::NoteStore;
