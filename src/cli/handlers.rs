use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use super::commands::{ConfigAction, SearchArgs, WriteArgs};
use crate::config::Config;
use crate::entity::{Note, NoteId};
use crate::error::{Result, ShortFormError};
use crate::search::{parse_date, parse_tags, DateRange, SearchFilter};
use crate::storage::{NoteStore, Resolved};

const TIMESTAMP_FORMAT: &str = "%b %d %Y %I:%M %p";
const SECURE_PLACEHOLDER: &str = "[secure note, use --insecure to show]";

/// Open the configured store, or `db` when given, with the secret attached.
fn open_store(db: Option<&Path>) -> Result<NoteStore> {
    let home = Config::home()?;
    let config = Config::load_or_init(&home)?;
    let path = db
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.database_path.clone());

    let store = NoteStore::open(&path)?;
    Ok(match config.cipher()? {
        Some(cipher) => store.with_cipher(cipher),
        None => store,
    })
}

pub fn handle_write(db: Option<PathBuf>, args: WriteArgs, secure: bool) -> Result<()> {
    let content = if args.content.is_empty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        args.content.join(" ")
    };
    let tags = args.tags.as_deref().map(parse_tags).unwrap_or_default();

    let mut store = open_store(db.as_deref())?;
    let note = store.create(&tags, &content, secure)?;

    println!("Note saved ({})", note.short_id());
    Ok(())
}

pub fn handle_search(db: Option<PathBuf>, args: SearchArgs) -> Result<()> {
    let filter = build_filter(&args, Local::now())?;
    let store = open_store(db.as_deref())?;
    let notes = store.search(&filter)?;

    match notes.len() {
        1 => println!("1 note found"),
        n => println!("{} notes found", n),
    }
    if !notes.is_empty() {
        println!();
    }

    for note in &notes {
        if note.secure && args.insecure {
            print_note(&store.reveal(note)?, args.detailed, false);
        } else {
            print_note(note, args.detailed, note.secure);
        }
    }

    Ok(())
}

/// Turn search flags into a filter. Content matching ignores case unless
/// `--case-sensitive` is given.
pub(crate) fn build_filter(args: &SearchArgs, now: DateTime<Local>) -> Result<SearchFilter> {
    let mut filter = SearchFilter::new();

    if let Some(tags) = args.tags.as_deref() {
        filter = filter.with_tags(parse_tags(tags));
    }
    if let Some(content) = args.content.as_deref() {
        filter = filter.with_content(content);
    }
    let term = args.term.join(" ");
    if !term.trim().is_empty() {
        filter = filter.with_term(term.trim());
    }
    if !args.case_sensitive {
        filter = filter.ignoring_case();
    }

    let range = if let Some(age) = args.age.as_deref() {
        Some(DateRange::from_age(age, now.with_timezone(&Utc))?)
    } else if args.today {
        Some(DateRange::today(&now)?)
    } else if args.yesterday {
        Some(DateRange::yesterday(&now)?)
    } else if args.from.is_some() || args.to.is_some() {
        let from = match args.from.as_deref() {
            Some(s) => parse_date(s, false)?,
            None => DateTime::<Utc>::default(),
        };
        let to = match args.to.as_deref() {
            Some(s) => parse_date(s, true)?,
            None => now.with_timezone(&Utc),
        };
        Some(DateRange::new(from, to))
    } else {
        None
    };

    if let Some(range) = range {
        filter = filter.with_date_range(range);
    }
    Ok(filter)
}

pub fn handle_delete(
    db: Option<PathBuf>,
    id: Option<String>,
    tags: Option<String>,
    yes: bool,
) -> Result<()> {
    if let Some(raw) = tags {
        let mut store = open_store(db.as_deref())?;
        return delete_by_tags(&mut store, &raw, yes);
    }
    let Some(id) = id else {
        return Err(ShortFormError::MalformedId(String::new()));
    };
    NoteId::parse(&id)?;

    let mut store = open_store(db.as_deref())?;
    let note = match store.resolve(&id)? {
        Resolved::Found(note) => note,
        Resolved::NotFound => return Err(ShortFormError::NoteNotFound(id)),
        Resolved::Ambiguous(candidates) => return Err(ambiguous(&id, &candidates)),
    };

    if !yes {
        println!("The following note will be deleted:");
        println!();
        print_note(&note, true, note.secure);
        if !confirm("Proceed?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    match store.resolve_and_delete(&note.full_id())? {
        Resolved::Found(deleted) => {
            println!("Deleted note {}", deleted.short_id());
            Ok(())
        }
        _ => Err(ShortFormError::NoteNotFound(id)),
    }
}

fn delete_by_tags(store: &mut NoteStore, raw: &str, yes: bool) -> Result<()> {
    let tags = parse_tags(raw);
    let count = store.count_by_tags(&tags)?;
    if count == 0 {
        println!("No notes carry those tags.");
        return Ok(());
    }

    if !yes {
        let prompt = format!(
            "{} note{} tagged with any of [{}] will be deleted. Proceed?",
            count,
            if count == 1 { "" } else { "s" },
            tags.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        if !confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = store.delete_by_tags(&tags)?;
    println!("Deleted {} note{}", deleted, if deleted == 1 { "" } else { "s" });
    Ok(())
}

pub fn handle_edit(
    db: Option<PathBuf>,
    id: String,
    content: Option<String>,
    tags: Option<String>,
) -> Result<()> {
    if content.is_none() && tags.is_none() {
        println!("Nothing to change. Pass --content and/or --tags.");
        return Ok(());
    }

    NoteId::parse(&id)?;
    if content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(ShortFormError::EmptyContent);
    }

    let tags = tags.as_deref().map(parse_tags);
    let mut store = open_store(db.as_deref())?;

    match store.resolve_and_edit(&id, content.as_deref(), tags.as_ref())? {
        Resolved::Found(note) => {
            println!("Updated note {}", note.short_id());
            Ok(())
        }
        Resolved::NotFound => Err(ShortFormError::NoteNotFound(id)),
        Resolved::Ambiguous(candidates) => Err(ambiguous(&id, &candidates)),
    }
}

pub fn handle_config(db: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let home = Config::home()?;
    let mut config = Config::load_or_init(&home)?;

    match action {
        ConfigAction::Show => {
            if let Some(db) = db {
                config.database_path = db;
            }
            println!("{}", Config::path(&home).display());
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        ConfigAction::SetDb { path } => {
            config.database_path = path;
            config.save(&home)?;
            println!("Database set to {}", config.database_path.display());
        }
    }

    Ok(())
}

/// List the notes sharing a short id and build the error asking for a full id.
fn ambiguous(prefix: &str, candidates: &[Note]) -> ShortFormError {
    println!();
    for note in candidates {
        print_note(note, true, note.secure);
    }
    ShortFormError::AmbiguousId {
        prefix: prefix.to_string(),
        count: candidates.len(),
    }
}

fn print_note(note: &Note, full_id: bool, masked: bool) {
    let mut parts = vec![
        note.created_at
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        if full_id { note.full_id() } else { note.short_id() },
    ];
    if !note.tags.is_empty() {
        parts.push(note.tags.iter().cloned().collect::<Vec<_>>().join(", "));
    }
    println!("{}", parts.join(" - "));

    if masked {
        println!("{}", SECURE_PLACEHOLDER);
    } else {
        println!("{}", note.content);
    }
    println!();
}

fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Err(ShortFormError::ConfirmationRequired);
    }

    eprint!("{} [y/N] ", prompt);
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args() -> SearchArgs {
        SearchArgs {
            tags: None,
            content: None,
            age: None,
            today: false,
            yesterday: false,
            from: None,
            to: None,
            case_sensitive: false,
            insecure: false,
            detailed: false,
            term: Vec::new(),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_no_flags_lists_everything_ignoring_case() {
        let filter = build_filter(&args(), now()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.ignore_case);
    }

    #[test]
    fn test_term_words_are_joined() {
        let mut a = args();
        a.term = vec!["fix".to_string(), "bug".to_string()];
        a.tags = Some("Work, git".to_string());

        let filter = build_filter(&a, now()).unwrap();
        assert_eq!(filter.term.as_deref(), Some("fix bug"));
        assert!(filter.tags.contains("work"));
        assert!(filter.tags.contains("git"));
    }

    #[test]
    fn test_case_sensitive_flag() {
        let mut a = args();
        a.case_sensitive = true;
        assert!(!build_filter(&a, now()).unwrap().ignore_case);
    }

    #[test]
    fn test_age_flag() {
        let mut a = args();
        a.age = Some("2d".to_string());
        let range = build_filter(&a, now()).unwrap().date_range.unwrap();
        assert_eq!(range.to, now().with_timezone(&Utc));
        assert_eq!(range.to - range.from, chrono::Duration::days(2));

        a.age = Some("two days".to_string());
        assert!(matches!(
            build_filter(&a, now()),
            Err(ShortFormError::InvalidAge(_))
        ));
    }

    #[test]
    fn test_today_and_yesterday_flags() {
        let mut a = args();
        a.today = true;
        let today = build_filter(&a, now()).unwrap().date_range.unwrap();
        assert_eq!(today.to, now().with_timezone(&Utc));

        a.today = false;
        a.yesterday = true;
        let yesterday = build_filter(&a, now()).unwrap().date_range.unwrap();
        assert_eq!(yesterday.to + chrono::Duration::seconds(1), today.from);
    }

    #[test]
    fn test_from_to_flags() {
        let mut a = args();
        a.from = Some("2024-01-01".to_string());
        a.to = Some("2024-01-31".to_string());
        let range = build_filter(&a, now()).unwrap().date_range.unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());

        a.to = None;
        let open_ended = build_filter(&a, now()).unwrap().date_range.unwrap();
        assert_eq!(open_ended.to, now().with_timezone(&Utc));

        a.from = Some("January".to_string());
        assert!(matches!(
            build_filter(&a, now()),
            Err(ShortFormError::InvalidDate(_))
        ));
    }
}
