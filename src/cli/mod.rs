mod commands;
mod handlers;

pub use commands::{Cli, Commands, ConfigAction, ConfigCommand, SearchArgs, WriteArgs};
pub use handlers::{handle_config, handle_delete, handle_edit, handle_search, handle_write};
