//! Parsed toolpath commands
//!
//! A `Command` knows where the tool is before and after it runs. Positions are
//! carried from one command to the next, so a command can only be built from
//! the final point of its predecessor.

use std::fmt;

use serde::Serialize;

use crate::error::{IntegrityError, ParseError, Result};
use crate::parser::args::{ArgKey, ArgMap, ArgValue};
use crate::parser::lexer::{Token, TokenKind};

/// Codes that move the tool
pub const MOTION_CODES: &[&str] = &["G0", "G1"];

const AXES: [char; 3] = ['X', 'Y', 'Z'];

/// A position in machine coordinates (mm)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const ORIGIN: Point = Point::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn axis(&self, axis: char) -> f64 {
        match axis {
            'X' => self.x,
            'Y' => self.y,
            _ => self.z,
        }
    }

    fn set_axis(&mut self, axis: char, value: f64) {
        match axis {
            'X' => self.x = value,
            'Y' => self.y = value,
            _ => self.z = value,
        }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2) + (other.z - self.z).powi(2))
            .sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6},{:.6},{:.6})", self.x, self.y, self.z)
    }
}

/// A parsed toolpath line with position state
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command code (e.g. "G1"); `None` for comment-only lines
    pub code: Option<String>,
    pub args: ArgMap,
    /// Trailing comment without the `;`
    pub comment: Option<String>,
    /// Source text, absent for synthesized commands
    pub line: Option<String>,
    pub initial_point: Point,
    pub final_point: Point,
    /// Distance between `initial_point` and `final_point`
    pub length: f64,
}

impl Command {
    /// Build a command from already-structured parts
    ///
    /// Position carry is implicit: axes missing from `args` are inherited
    /// from `initial_point` without being written.
    pub fn from_parts(
        code: &str,
        args: ArgMap,
        comment: Option<String>,
        initial_point: Point,
    ) -> Result<Self> {
        Self {
            code: Some(code.to_string()),
            args,
            comment,
            line: None,
            initial_point,
            final_point: initial_point,
            length: 0.0,
        }
        .resolve(false)
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_motion(&self) -> bool {
        self.code().is_some_and(|code| MOTION_CODES.contains(&code))
    }

    /// Motion command with only an extrusion argument
    pub fn is_filament_only(&self) -> bool {
        self.is_motion() && !AXES.iter().any(|&axis| self.args.contains(axis)) && self.args.contains('E')
    }

    /// Reconstruct the toolpath line
    pub fn construct(&self) -> String {
        let comment = self.comment.as_deref().unwrap_or_default();
        let Some(code) = self.code() else {
            return format!(";{comment}");
        };

        let mut out = code.to_string();
        if !self.args.is_empty() {
            out.push(' ');
            out.push_str(&self.args.to_string());
        }
        if !comment.is_empty() {
            out.push_str(" ;");
            out.push_str(comment);
        }
        out
    }

    /// Apply position carry and compute the final point and length
    fn resolve(mut self, explicit: bool) -> Result<Self> {
        if self.is_motion() && !self.is_filament_only() {
            let mut destination = self.initial_point;
            for axis in AXES {
                match self.args.get(ArgKey::Letter(axis)) {
                    Some(value) => {
                        let coordinate = value.as_ref().and_then(ArgValue::as_f64).ok_or_else(|| {
                            ParseError::MissingAxisValue {
                                line: self.source_text(),
                                axis,
                            }
                        })?;
                        destination.set_axis(axis, coordinate);
                    }
                    None if explicit => self.args.set_number(axis, destination.axis(axis)),
                    None => {}
                }
            }
            self.final_point = destination;
        } else {
            self.final_point = self.initial_point;
        }

        self.length = self.initial_point.distance_to(&self.final_point);
        if self.length.is_nan() || self.length < 0.0 {
            return Err(IntegrityError::InvalidLength {
                line: self.source_text(),
                length: self.length,
            }
            .into());
        }

        Ok(self)
    }

    fn source_text(&self) -> String {
        self.line.clone().unwrap_or_else(|| self.construct())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.construct())
    }
}

/// Convert the tokens of one line into a command
///
/// Returns `Ok(None)` for blank lines.
pub fn tokens_to_command(
    line: &str,
    tokens: Vec<Token>,
    initial_point: Point,
    explicit: bool,
) -> Result<Option<Command>> {
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut code = None;
    let mut args = ArgMap::new();
    let mut comment = None;

    for token in tokens {
        match token.kind {
            TokenKind::Code => code = Some(token.text),
            TokenKind::Comment => comment = Some(token.text),
            TokenKind::Bare => args.insert(ArgKey::Bare, Some(ArgValue::Text(token.text))),
            TokenKind::Word => {
                let (letter, value) = split_word(&token.text);
                let value = match value {
                    "" => None,
                    text => Some(ArgValue::parse_number(text).ok_or_else(|| {
                        ParseError::InvalidNumber {
                            line: line.to_string(),
                            code: code.clone().unwrap_or_default(),
                            token: token.text.clone(),
                            partial_args: args.to_string(),
                        }
                    })?),
                };
                args.insert(ArgKey::Letter(letter), value);
            }
        }
    }

    Command {
        code,
        args,
        comment,
        line: Some(line.to_string()),
        initial_point,
        final_point: initial_point,
        length: 0.0,
    }
    .resolve(explicit)
    .map(Some)
}

/// Split "X10.5" into ('X', "10.5")
fn split_word(text: &str) -> (char, &str) {
    let mut chars = text.chars();
    let letter = chars.next().unwrap_or_default();
    (letter, chars.as_str())
}
