//! # Terminal Commands
//!
//! Line-oriented commands for the terminal front end.
//!
//! ## Command Set
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Line                         Command               Controller call     │
//! │  ────                         ───────               ───────────────     │
//! │  scan                         Scan                  start_scan()        │
//! │  stop                         Stop                  stop_scan()         │
//! │  submit <code> [--force]      Submit                submit_code()       │
//! │  <digits>                     Submit                submit_code()       │
//! │  reset                        Reset                 reset()             │
//! │  open [url]                   Open                  open_details() /    │
//! │                                                     open_external()     │
//! │  search                       Search                search_current()    │
//! │  status                       Status                snapshot()          │
//! │  help                         Help                                      │
//! │  quit | exit                  Quit                  shutdown()          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan,
    Stop,
    Submit { code: String, force: bool },
    Reset,
    Open(Option<String>),
    Search,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),

    #[error("'{command}' takes no arguments")]
    UnexpectedArguments { command: String },
}

pub const HELP: &str = "\
commands:
  scan                     start the camera
  stop                     stop the camera
  submit <code> [--force]  look up a barcode (a bare code works too)
  reset                    clear the result and stop the camera
  open [url]               open the product details, or the given URL
  search                   web search for the last code
  status                   print the current state
  quit                     leave";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let rest: Vec<&str> = words.collect();

        let bare = |command: Command| {
            if rest.is_empty() {
                Ok(command)
            } else {
                Err(CommandError::UnexpectedArguments {
                    command: head.to_string(),
                })
            }
        };

        match head.to_lowercase().as_str() {
            "scan" | "start" => bare(Command::Scan),
            "stop" => bare(Command::Stop),
            "reset" | "clear" => bare(Command::Reset),
            "search" => bare(Command::Search),
            "status" => bare(Command::Status),
            "help" | "?" => bare(Command::Help),
            "quit" | "exit" | "q" => bare(Command::Quit),
            "open" => Ok(Command::Open(rest.first().map(|url| url.to_string()))),
            "submit" | "s" => {
                let force = rest.iter().any(|word| *word == "--force" || *word == "-f");
                let code = rest
                    .iter()
                    .filter(|word| **word != "--force" && **word != "-f")
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                // An empty code is passed through so the controller reports it.
                Ok(Command::Submit { code, force })
            }
            _ if rest.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) => Ok(Command::Submit {
                code: head.to_string(),
                force: false,
            }),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("scan".parse(), Ok(Command::Scan));
        assert_eq!("  STOP ".parse(), Ok(Command::Stop));
        assert_eq!("reset".parse(), Ok(Command::Reset));
        assert_eq!("quit".parse(), Ok(Command::Quit));
        assert_eq!("open".parse(), Ok(Command::Open(None)));
        assert_eq!(
            "open https://example.com".parse(),
            Ok(Command::Open(Some("https://example.com".into())))
        );
    }

    #[test]
    fn test_parse_submit() {
        assert_eq!(
            "submit 4006381333931".parse(),
            Ok(Command::Submit {
                code: "4006381333931".into(),
                force: false
            })
        );
        assert_eq!(
            "submit --force 123".parse(),
            Ok(Command::Submit {
                code: "123".into(),
                force: true
            })
        );
        assert_eq!(
            "submit".parse(),
            Ok(Command::Submit {
                code: String::new(),
                force: false
            })
        );
    }

    #[test]
    fn test_bare_digits_submit() {
        assert_eq!(
            "0012345678905".parse(),
            Ok(Command::Submit {
                code: "0012345678905".into(),
                force: false
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert!(matches!("fly".parse::<Command>(), Err(CommandError::Unknown(_))));
        assert!(matches!(
            "scan now".parse::<Command>(),
            Err(CommandError::UnexpectedArguments { .. })
        ));
    }
}
