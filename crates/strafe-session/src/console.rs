//! Host console commands.

/// Command name for switching maps.
pub const MAP_CHANGE_COMMAND: &str = "map.change";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `map.change <map> [gamemode]`
    MapChange {
        /// Map to switch to.
        map: String,
        /// Gamemode override. `None` keeps the current one.
        gamemode: Option<String>,
    },
}

/// Errors from [`parse_console_line`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command}: missing argument <{argument}>")]
    MissingArgument {
        command: String,
        argument: &'static str,
    },

    #[error("unterminated quote in command line")]
    UnterminatedQuote,
}

/// Split a line on whitespace. Double quotes group words into one token.
fn tokenize(line: &str) -> Result<Vec<String>, ConsoleError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(ConsoleError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse one console line. Command names are case-insensitive.
pub fn parse_console_line(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let mut tokens = tokenize(line)?.into_iter();
    let Some(command) = tokens.next() else {
        return Err(ConsoleError::Empty);
    };

    if command.eq_ignore_ascii_case(MAP_CHANGE_COMMAND) {
        let map = tokens.next().ok_or(ConsoleError::MissingArgument {
            command: MAP_CHANGE_COMMAND.to_string(),
            argument: "map",
        })?;
        let gamemode = tokens.next();
        return Ok(ConsoleCommand::MapChange { map, gamemode });
    }

    Err(ConsoleError::UnknownCommand(command))
}
