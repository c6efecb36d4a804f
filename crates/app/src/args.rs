use std::fmt;

use quiz_core::model::{LessonId, UserId};

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Seed,
    History,
}

impl Command {
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "seed" => Some(Self::Seed),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

/// Resolved invocation: env vars first, flags override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub lesson_id: LessonId,
    pub week: u32,
    pub duration_secs: Option<u32>,
    pub user_id: Option<UserId>,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [run]  [--db <sqlite_url>] [--lesson <id>] [--week <n>] [--duration <secs>] [--user <id>]");
    eprintln!("  quiz seed   [--db <sqlite_url>] [--lesson <id>] [--week <n>]");
    eprintln!("  quiz history --user <id> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --lesson 1 --week 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_DURATION_SECS, QUIZ_USER_ID, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(value: String, flag: &'static str) -> Result<u64, ArgsError> {
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn parse_u32(value: String, flag: &'static str) -> Result<u32, ArgsError> {
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

impl Args {
    /// Parse flags on top of the given environment lookup.
    pub fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("QUIZ_DB_URL")
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let mut duration_secs = env("QUIZ_DURATION_SECS")
            .map(|raw| parse_u32(raw, "QUIZ_DURATION_SECS"))
            .transpose()?;
        let mut user_id = env("QUIZ_USER_ID")
            .map(|raw| parse_number(raw, "QUIZ_USER_ID").map(UserId::new))
            .transpose()?;
        let mut lesson_id = LessonId::new(1);
        let mut week = 1;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--lesson" => {
                    let value = require_value(args, "--lesson")?;
                    lesson_id = LessonId::new(parse_number(value, "--lesson")?);
                }
                "--week" => {
                    let value = require_value(args, "--week")?;
                    week = parse_u32(value, "--week")?;
                }
                "--duration" => {
                    let value = require_value(args, "--duration")?;
                    duration_secs = Some(parse_u32(value, "--duration")?);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user_id = Some(UserId::new(parse_number(value, "--user")?));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            lesson_id,
            week,
            duration_secs,
            user_id,
        })
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and parent dirs) so sqlx can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
