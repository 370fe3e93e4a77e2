//! Toolpath Parser
//!
//! Turns one line of text into a `Command` carrying typed arguments and the
//! tool position before and after it.

pub mod args;
pub mod ast;
pub mod lexer;

pub use args::{ArgKey, ArgMap, ArgValue};
pub use ast::{Command, MOTION_CODES, Point, tokens_to_command};
pub use lexer::{Token, TokenKind, tokenize_line};

use crate::error::Result;

/// Parse a single line into a command starting at `initial_point`
///
/// Blank lines produce `Ok(None)`. With `explicit`, motion commands get all
/// three destination axes written into their arguments.
pub fn parse_line(line: &str, initial_point: Point, explicit: bool) -> Result<Option<Command>> {
    let tokens = lexer::tokenize_line(line);
    ast::tokens_to_command(line, tokens, initial_point, explicit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let cmd = parse_line("G1 X10 Y20", Point::ORIGIN, false)
            .unwrap()
            .unwrap();

        assert_eq!(cmd.code(), Some("G1"));
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args.number('X'), Some(10.0));
        assert_eq!(cmd.final_point, Point::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_parse_with_comment() {
        let cmd = parse_line("G1 X10 ; move to X10", Point::ORIGIN, false)
            .unwrap()
            .unwrap();

        assert_eq!(cmd.comment.as_deref(), Some(" move to X10"));
        assert_eq!(cmd.construct(), "G1 X10 ; move to X10");
    }

    #[test]
    fn test_parse_message_command() {
        let cmd = parse_line("M117 Layer 4 of 80", Point::ORIGIN, true)
            .unwrap()
            .unwrap();

        assert_eq!(
            cmd.args.get(ArgKey::Bare),
            Some(&Some(ArgValue::Text("Layer 4 of 80".to_string())))
        );
        assert_eq!(cmd.construct(), "M117 Layer 4 of 80");
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(parse_line("   ", Point::ORIGIN, true).unwrap().is_none());
    }
}
