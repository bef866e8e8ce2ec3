use std::path::PathBuf;

use quarry_core::bridge::UnknownSaveFormat;
use quarry_core::{ConnectionSpec, SaveFormat};
use thiserror::Error;

/// A command line entered by the user, already split into its parts.
///
/// Connection-scoped commands accept an `@id` suffix on the command name
/// (`:exec@reportsmysql select 1`); without it the active connection is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connections,
    Use(String),
    Add(ConnectionSpec),
    Details(Option<String>),
    Execute {
        query: String,
        target: Option<String>,
    },
    Next(Option<String>),
    Prev(Option<String>),
    History {
        history_id: String,
        target: Option<String>,
    },
    Layout(Option<String>),
    Save {
        format: SaveFormat,
        destination: PathBuf,
        target: Option<String>,
    },
    Open,
    Close,
    Wipe,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error(transparent)]
    Format(#[from] UnknownSaveFormat),
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    let Some(command_line) = line.strip_prefix(':') else {
        return Ok(Command::Execute {
            query: line.to_string(),
            target: None,
        });
    };

    let (head, rest) = command_line
        .split_once(char::is_whitespace)
        .map_or((command_line, ""), |(head, rest)| (head, rest.trim()));
    let (name, target) = match head.split_once('@') {
        Some((name, target)) if !target.is_empty() => (name, Some(target.to_string())),
        _ => (head, None),
    };
    let mut args = rest.split_whitespace();

    match name {
        "connections" | "ls" => Ok(Command::Connections),
        "use" => args
            .next()
            .map(|id| Command::Use(id.to_string()))
            .ok_or(CommandError::MissingArgument {
                command: "use",
                argument: "a connection id",
            }),
        "add" => {
            let (Some(name), Some(kind), Some(url)) = (args.next(), args.next(), args.next())
            else {
                return Err(CommandError::MissingArgument {
                    command: "add",
                    argument: "<name> <kind> <url>",
                });
            };
            Ok(Command::Add(ConnectionSpec::new(name, kind, url)))
        }
        "details" => Ok(Command::Details(
            args.next().map(str::to_string).or(target),
        )),
        "exec" | "e" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "exec",
                    argument: "a query",
                });
            }
            Ok(Command::Execute {
                query: rest.to_string(),
                target,
            })
        }
        "next" | "n" => Ok(Command::Next(target)),
        "prev" | "p" => Ok(Command::Prev(target)),
        "history" | "h" => args
            .next()
            .map(|history_id| Command::History {
                history_id: history_id.to_string(),
                target,
            })
            .ok_or(CommandError::MissingArgument {
                command: "history",
                argument: "a history id",
            }),
        "layout" => Ok(Command::Layout(target)),
        "save" => {
            let (Some(format), Some(destination)) = (args.next(), args.next()) else {
                return Err(CommandError::MissingArgument {
                    command: "save",
                    argument: "<csv|json> <path>",
                });
            };
            Ok(Command::Save {
                format: format.parse()?,
                destination: PathBuf::from(destination),
                target,
            })
        }
        "open" => Ok(Command::Open),
        "close" => Ok(Command::Close),
        "wipe" => Ok(Command::Wipe),
        "help" => Ok(Command::Help),
        "quit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use quarry_core::{ConnectionSpec, SaveFormat};

    use super::{parse_command, Command, CommandError};

    #[test]
    fn bare_line_is_executed_against_active_connection() {
        assert_eq!(
            parse_command("  select * from users  "),
            Ok(Command::Execute {
                query: "select * from users".to_string(),
                target: None
            })
        );
    }

    #[test]
    fn target_suffix_selects_connection() {
        assert_eq!(
            parse_command(":exec@reportsmysql select 1"),
            Ok(Command::Execute {
                query: "select 1".to_string(),
                target: Some("reportsmysql".to_string())
            })
        );
        assert_eq!(
            parse_command(":next@reportsmysql"),
            Ok(Command::Next(Some("reportsmysql".to_string())))
        );
        assert_eq!(parse_command(":prev@"), Ok(Command::Prev(None)));
    }

    #[test]
    fn history_save_and_add_take_arguments() {
        assert_eq!(
            parse_command(":history h3"),
            Ok(Command::History {
                history_id: "h3".to_string(),
                target: None
            })
        );
        assert_eq!(
            parse_command(":save json /tmp/out.json"),
            Ok(Command::Save {
                format: SaveFormat::Json,
                destination: PathBuf::from("/tmp/out.json"),
                target: None
            })
        );
        assert_eq!(
            parse_command(":wipe"),
            Ok(Command::Wipe)
        );
        assert_eq!(
            parse_command(":add local mysql mysql://root@127.0.0.1/app"),
            Ok(Command::Add(ConnectionSpec::new(
                "local",
                "mysql",
                "mysql://root@127.0.0.1/app"
            )))
        );
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command(":frobnicate"),
            Err(CommandError::Unknown("frobnicate".to_string()))
        );
        assert!(matches!(
            parse_command(":history"),
            Err(CommandError::MissingArgument { command: "history", .. })
        ));
        assert!(matches!(
            parse_command(":save xlsx out.xlsx"),
            Err(CommandError::Format(_))
        ));
        assert!(matches!(
            parse_command(":exec"),
            Err(CommandError::MissingArgument { command: "exec", .. })
        ));
    }
}
