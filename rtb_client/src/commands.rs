use ride_the_bus::Guess;
use std::fmt;

/// Commands typed at the client prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Lock in a guess for the current round.
    Guess(Guess),
    /// Hand out sips by nickname.
    Give(Vec<(String, u32)>),
    TapOut,
    Start,
    Restart,
    Close,
    Show,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Guess command without a recognised value.
    InvalidGuess(String),
    /// Sip count that isn't a positive number.
    InvalidSipCount(String),
    /// Give command missing a nickname or count.
    GiveMissingArguments,
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGuess(value) => write!(
                f,
                "Invalid guess '{}'. Try red, black, higher, lower, between, outside or a suit",
                value
            ),
            Self::InvalidSipCount(value) => write!(
                f,
                "Invalid sip count '{}'. Must be a positive number (e.g., 'give alice 2')",
                value
            ),
            Self::GiveMissingArguments => write!(
                f,
                "Give needs nickname and count pairs (e.g., 'give alice 2 bob 4')"
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a command string into a [`ClientCommand`].
///
/// A bare guess value is accepted on its own, so `red` and `guess red` mean
/// the same thing.
///
/// # Examples
///
/// ```
/// use rtb_client::commands::{ClientCommand, parse_command};
/// use ride_the_bus::{Guess, Suit};
///
/// assert_eq!(parse_command("red"), Ok(ClientCommand::Guess(Guess::Red)));
/// assert_eq!(parse_command("guess spades"), Ok(ClientCommand::Guess(Guess::Suit(Suit::Spade))));
/// assert_eq!(
///     parse_command("give alice 2"),
///     Ok(ClientCommand::Give(vec![("alice".to_string(), 2)]))
/// );
/// ```
pub fn parse_command(input: &str) -> Result<ClientCommand, ParseError> {
    let trimmed = input.trim();

    // Try single-word commands first
    match trimmed.to_lowercase().as_str() {
        "tap" | "tap-out" | "tapout" => return Ok(ClientCommand::TapOut),
        "start" => return Ok(ClientCommand::Start),
        "restart" => return Ok(ClientCommand::Restart),
        "close" => return Ok(ClientCommand::Close),
        "show" => return Ok(ClientCommand::Show),
        "help" | "?" => return Ok(ClientCommand::Help),
        "quit" | "exit" => return Ok(ClientCommand::Quit),
        _ => {}
    }

    if let Ok(guess) = trimmed.parse::<Guess>() {
        return Ok(ClientCommand::Guess(guess));
    }

    // Parse multi-word commands
    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"guess") => parse_guess_command(&parts),
        Some(&"give") => parse_give_command(&parts),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse a guess command: "guess VALUE"
fn parse_guess_command(parts: &[&str]) -> Result<ClientCommand, ParseError> {
    let value = parts[1..].join(" ");
    value
        .parse::<Guess>()
        .map(ClientCommand::Guess)
        .map_err(|_| ParseError::InvalidGuess(value))
}

/// Parse a give command: "give NICK COUNT [NICK COUNT ...]"
fn parse_give_command(parts: &[&str]) -> Result<ClientCommand, ParseError> {
    let args = &parts[1..];
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(ParseError::GiveMissingArguments);
    }

    let allocations = args
        .chunks(2)
        .map(|pair| {
            let sips = pair[1]
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ParseError::InvalidSipCount(pair[1].to_string()))?;
            Ok((pair[0].to_string(), sips))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClientCommand::Give(allocations))
}
