//! Input handling for the console.

/// A command entered at the function prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Empty,
    Call(String),
}

/// Convert one line of input to a Command. `help` and `exit` are
/// case-insensitive; function names are not.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Command::Empty
    } else if trimmed.eq_ignore_ascii_case("help") {
        Command::Help
    } else if trimmed.eq_ignore_ascii_case("exit") {
        Command::Exit
    } else {
        Command::Call(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builtin_commands() {
        assert_eq!(parse_command(" HELP "), Command::Help);
        assert_eq!(parse_command("exit\n"), Command::Exit);
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn anything_else_is_a_call() {
        assert_eq!(
            parse_command(" validAnagram "),
            Command::Call("validAnagram".into())
        );
    }
}
