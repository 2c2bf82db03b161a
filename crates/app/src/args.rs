use std::fmt;

use codeline_core::model::{CourseId, LectureId, UserId};

use crate::config::{AppConfig, DbTarget};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a subcommand is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Seed,
    Courses,
    Lectures {
        course: CourseId,
    },
    Lecture {
        course: CourseId,
        lecture: LectureId,
        user: Option<UserId>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Parsed {
    Help,
    Run { command: Command, config: AppConfig },
}

pub(crate) fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- courses  [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- lectures --course <id> [--db <sqlite_url>]");
    eprintln!(
        "  cargo run -p app -- lecture  --course <id> --lecture <id> [--user <id>] [--db <sqlite_url>]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://codeline.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CODELINE_DB_URL, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Seed,
    Courses,
    Lectures,
    Lecture,
}

impl Verb {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "courses" => Some(Self::Courses),
            "lectures" => Some(Self::Lectures),
            "lecture" => Some(Self::Lecture),
            _ => None,
        }
    }

    fn accepts(self, flag: &str) -> bool {
        match flag {
            "--db" => true,
            "--course" => matches!(self, Self::Lectures | Self::Lecture),
            "--lecture" | "--user" => matches!(self, Self::Lecture),
            _ => false,
        }
    }
}

/// Parses a subcommand and its flags. `config` supplies defaults that flags override.
pub(crate) fn parse(
    args: impl IntoIterator<Item = String>,
    mut config: AppConfig,
) -> Result<Parsed, ArgsError> {
    let mut args = args.into_iter();
    let verb = match args.next() {
        None => return Err(ArgsError::MissingCommand),
        Some(first) if first == "--help" || first == "-h" => return Ok(Parsed::Help),
        Some(first) => Verb::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?,
    };

    let mut course: Option<CourseId> = None;
    let mut lecture: Option<LectureId> = None;
    let mut user: Option<UserId> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(Parsed::Help);
        }
        if !verb.accepts(&arg) {
            return Err(ArgsError::UnknownArg(arg));
        }
        match arg.as_str() {
            "--db" => {
                config.db = DbTarget::parse(&require_value(&mut args, "--db")?)?;
            }
            "--course" => course = Some(parse_id(&mut args, "--course")?),
            "--lecture" => lecture = Some(parse_id(&mut args, "--lecture")?),
            "--user" => user = Some(parse_id(&mut args, "--user")?),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    let command = match verb {
        Verb::Seed => Command::Seed,
        Verb::Courses => Command::Courses,
        Verb::Lectures => Command::Lectures {
            course: course.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
        },
        Verb::Lecture => Command::Lecture {
            course: course.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
            lecture: lecture.ok_or(ArgsError::MissingFlag { flag: "--lecture" })?,
            user,
        },
    };

    Ok(Parsed::Run { command, config })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    fn defaults() -> AppConfig {
        AppConfig::from_db_url(None).unwrap()
    }

    #[test]
    fn gated_lecture_read_parses_all_ids() {
        let parsed = parse(
            argv(&["lecture", "--course", "3", "--lecture", "7", "--user", "9"]),
            defaults(),
        )
        .unwrap();
        assert_eq!(
            parsed,
            Parsed::Run {
                command: Command::Lecture {
                    course: CourseId::new(3),
                    lecture: LectureId::new(7),
                    user: Some(UserId::new(9)),
                },
                config: defaults(),
            }
        );
    }

    #[test]
    fn db_flag_overrides_environment_default() {
        let env = AppConfig::from_db_url(Some("sqlite:///srv/env.db".into())).unwrap();
        let Parsed::Run { config, .. } =
            parse(argv(&["courses", "--db", "sqlite:///tmp/flag.db"]), env).unwrap()
        else {
            panic!("expected a command");
        };
        assert_eq!(config.db, DbTarget::File("/tmp/flag.db".into()));
    }

    #[test]
    fn required_flags_are_enforced() {
        assert_eq!(
            parse(argv(&["lectures"]), defaults()).unwrap_err(),
            ArgsError::MissingFlag { flag: "--course" }
        );
        assert_eq!(
            parse(argv(&["lecture", "--course", "1"]), defaults()).unwrap_err(),
            ArgsError::MissingFlag { flag: "--lecture" }
        );
        assert_eq!(
            parse(argv(&["lecture", "--course"]), defaults()).unwrap_err(),
            ArgsError::MissingValue { flag: "--course" }
        );
    }

    #[test]
    fn malformed_input_is_reported() {
        assert_eq!(
            parse(argv(&["lectures", "--course", "abc"]), defaults()).unwrap_err(),
            ArgsError::InvalidId {
                flag: "--course",
                raw: "abc".into()
            }
        );
        assert_eq!(
            parse(argv(&["courses", "--course", "1"]), defaults()).unwrap_err(),
            ArgsError::UnknownArg("--course".into())
        );
        assert_eq!(
            parse(argv(&["enroll"]), defaults()).unwrap_err(),
            ArgsError::UnknownCommand("enroll".into())
        );
        assert_eq!(
            parse(argv(&[]), defaults()).unwrap_err(),
            ArgsError::MissingCommand
        );
        assert_eq!(
            parse(argv(&["courses", "--db", "mysql://db/codeline"]), defaults()).unwrap_err(),
            ArgsError::InvalidDbUrl {
                raw: "mysql://db/codeline".into()
            }
        );
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(argv(&["-h"]), defaults()).unwrap(), Parsed::Help);
        assert_eq!(
            parse(argv(&["seed", "--help"]), defaults()).unwrap(),
            Parsed::Help
        );
    }
}
