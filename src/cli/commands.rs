use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sf")]
#[command(version, about = "Short-form notes from the terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use this database instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log storage activity to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a new note
    Write(WriteArgs),

    /// Write a new note, encrypted with the configured secret
    WriteSecure(WriteArgs),

    /// Search notes
    Search(SearchArgs),

    /// Delete a note by id, or every note carrying any of --tags
    Delete {
        /// Full id or 8 character short id
        #[arg(required_unless_present = "tags", conflicts_with = "tags")]
        id: Option<String>,

        /// Comma separated tags
        #[arg(long, short = 't')]
        tags: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Replace a note's content and/or tags
    Edit {
        /// Full id or 8 character short id
        id: String,

        /// New content
        #[arg(long, short = 'c')]
        content: Option<String>,

        /// New comma separated tags, replacing the current ones
        #[arg(long, short = 't')]
        tags: Option<String>,
    },

    /// Show or change configuration
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Comma separated tags
    #[arg(long, short = 't')]
    pub tags: Option<String>,

    /// Note content. Read from stdin when omitted
    pub content: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Notes must carry all of these comma separated tags
    #[arg(long, short = 't')]
    pub tags: Option<String>,

    /// Notes must contain this text
    #[arg(long, short = 'c')]
    pub content: Option<String>,

    /// Only notes from the last N days, e.g. 3d
    #[arg(long, short = 'a', conflicts_with_all = ["today", "yesterday", "from", "to"])]
    pub age: Option<String>,

    /// Only notes written today
    #[arg(long, conflicts_with_all = ["yesterday", "from", "to"])]
    pub today: bool,

    /// Only notes written yesterday
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub yesterday: bool,

    /// Start date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD or RFC 3339), inclusive
    #[arg(long)]
    pub to: Option<String>,

    /// Match content and terms case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Print secure notes decrypted
    #[arg(long)]
    pub insecure: bool,

    /// Show full ids
    #[arg(long, short = 'd')]
    pub detailed: bool,

    /// Free-text term matched against tags OR content. Replaces --tags and --content
    pub term: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Point the configuration at another database file
    SetDb {
        path: PathBuf,
    },
}
