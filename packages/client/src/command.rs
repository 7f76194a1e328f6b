//! Parsing of the lines typed at the prompt.

use gamejam_server::domain::ExampleGame;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: submit a prompt to the shared batch
    Say(String),
    /// Mark yourself as composing so the batch waits for you
    Typing,
    Idle,
    Play,
    Edit,
    /// Replace the editor contents
    Code(String),
    /// Run the edited code
    Apply,
    Save(String),
    Games,
    Load(String),
    /// Run one of the built-in example games
    Example(ExampleGame),
    Players,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  <text>          submit a prompt (waits until nobody is typing)
  /typing         mark yourself as composing
  /idle           stop composing
  /play, /edit    switch the view mode
  /code <js>      replace the editor contents
  /apply          run the edited code
  /save <title>   save the current code as a game
  /games          list your saved games
  /load <id>      load a saved game into the session
  /example <name> load an example (bouncing, platformer, shooter)
  /players        list the connected players
  /quit           leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    MissingArgument(&'static str),
    InvalidArgument(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Unknown(name) => write!(f, "unknown command '/{}', try /help", name),
            CommandError::MissingArgument(usage) => write!(f, "usage: {}", usage),
            CommandError::InvalidArgument(reason) => f.write_str(reason),
        }
    }
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };
    let required = |usage: &'static str| {
        if argument.is_empty() {
            Err(CommandError::MissingArgument(usage))
        } else {
            Ok(argument.to_string())
        }
    };

    match name {
        "typing" => Ok(Command::Typing),
        "idle" => Ok(Command::Idle),
        "play" => Ok(Command::Play),
        "edit" => Ok(Command::Edit),
        "code" => required("/code <js>").map(Command::Code),
        "apply" => Ok(Command::Apply),
        "save" => required("/save <title>").map(Command::Save),
        "games" => Ok(Command::Games),
        "load" => required("/load <id>").map(Command::Load),
        "example" => required("/example <name>")?
            .parse::<ExampleGame>()
            .map(Command::Example)
            .map_err(|e| CommandError::InvalidArgument(e.to_string())),
        "players" => Ok(Command::Players),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
