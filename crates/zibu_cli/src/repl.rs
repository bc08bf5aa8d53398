//! Line commands understood by the terminal front-end.

use anyhow::{bail, Context, Result};
use zibu_core::{AccelSample, Tool, ToolCategory};
use zibu_limbic::AppState;

pub const USAGE: &str = "commands: status | select <bottle|sponge|ball|blanket> | \
picker <feed|clean|play|sleep> | deselect | press | release | swipe <dx> | \
shake <x> <y> <z> | tick | background | inactive | foreground | quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplCommand {
    Status,
    Select(Tool),
    Picker(ToolCategory),
    Deselect,
    Press,
    Release,
    Swipe(f32),
    Shake(AccelSample),
    App(AppState),
    Tick,
    Help,
    Quit,
    Empty,
}

pub fn parse(line: &str) -> Result<ReplCommand> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ReplCommand::Empty);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("status", []) => ReplCommand::Status,
        ("select", [tool]) => ReplCommand::Select(tool.parse()?),
        ("picker", [category]) => ReplCommand::Picker(category.parse()?),
        ("deselect", []) => ReplCommand::Deselect,
        ("press", []) => ReplCommand::Press,
        ("release", []) => ReplCommand::Release,
        ("swipe", [dx]) => ReplCommand::Swipe(number(dx)?),
        ("shake", [x, y, z]) => {
            ReplCommand::Shake(AccelSample::new(number(x)?, number(y)?, number(z)?))
        }
        ("tick", []) => ReplCommand::Tick,
        ("background" | "inactive" | "foreground", []) => ReplCommand::App(verb.parse()?),
        ("help", _) => ReplCommand::Help,
        ("quit" | "exit", []) => ReplCommand::Quit,
        _ => bail!("unrecognized command '{}'", line.trim()),
    };
    Ok(command)
}

fn number(word: &str) -> Result<f32> {
    word.parse()
        .with_context(|| format!("'{}' is not a number", word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tools_and_pickers() {
        assert_eq!(parse("select bottle").unwrap(), ReplCommand::Select(Tool::Bottle));
        assert_eq!(parse("  SELECT Ball ").unwrap(), ReplCommand::Select(Tool::Ball));
        assert_eq!(
            parse("picker sleep").unwrap(),
            ReplCommand::Picker(ToolCategory::Sleep)
        );
        assert!(parse("select hammer").is_err());
        assert!(parse("select").is_err());
    }

    #[test]
    fn test_parse_gestures() {
        assert_eq!(parse("swipe -35.5").unwrap(), ReplCommand::Swipe(-35.5));
        assert_eq!(
            parse("shake 0 2.5 0").unwrap(),
            ReplCommand::Shake(AccelSample::new(0.0, 2.5, 0.0))
        );
        assert!(parse("swipe far").is_err());
        assert!(parse("shake 1 2").is_err());
    }

    #[test]
    fn test_parse_lifecycle() {
        assert_eq!(parse("background").unwrap(), ReplCommand::App(AppState::Background));
        assert_eq!(parse("foreground").unwrap(), ReplCommand::App(AppState::Active));
        assert_eq!(parse("inactive").unwrap(), ReplCommand::App(AppState::Inactive));
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse("").unwrap(), ReplCommand::Empty);
        assert_eq!(parse("quit").unwrap(), ReplCommand::Quit);
        assert_eq!(parse("help me").unwrap(), ReplCommand::Help);
        assert!(parse("dance").is_err());
    }
}
