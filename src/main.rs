use clap::Parser;
use shortform::cli::{
    handle_config, handle_delete, handle_edit, handle_search, handle_write, Cli, Commands,
};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("SHORT_FORM_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db = cli.db;
    let result = match cli.command {
        Commands::Write(args) => handle_write(db, args, false),
        Commands::WriteSecure(args) => handle_write(db, args, true),
        Commands::Search(args) => handle_search(db, args),
        Commands::Delete { id, tags, yes } => handle_delete(db, id, tags, yes),
        Commands::Edit { id, content, tags } => handle_edit(db, id, content, tags),
        Commands::Config(config) => handle_config(db, config.action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(if e.is_validation() { 2 } else { 1 });
    }
}
