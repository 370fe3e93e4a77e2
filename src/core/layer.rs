//! Layers
//!
//! A layer is the run of commands printed at one nominal build height.

use std::fmt;

use crate::error::Result;
use crate::parser::{ArgMap, Command, Point, parse_line};
use crate::split::split_move;

/// How the commands of a layer are built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerOptions {
    /// Split extruding moves longer than this (mm); `None` disables splitting
    pub segment_length: Option<f64>,
    /// Write all destination axes into every motion command
    pub explicit: bool,
}

impl LayerOptions {
    /// Options for preambles: neither split nor made explicit
    pub const VERBATIM: LayerOptions = LayerOptions {
        segment_length: None,
        explicit: false,
    };
}

/// Planar bounding box of a layer (arcs are not accounted for)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Commands at one build height
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub index: usize,
    pub commands: Vec<Command>,
    /// Commands emitted before the layer body
    pub preamble: Vec<Command>,
    /// Commands emitted after the layer body
    pub postamble: Vec<Command>,
    initial_point: Point,
    final_point: Point,
}

impl Layer {
    /// Parse `lines` into a layer that starts where the previous one ended
    pub fn build<S: AsRef<str>>(
        index: usize,
        start: Point,
        lines: &[S],
        options: &LayerOptions,
    ) -> Result<Self> {
        let mut commands = Vec::with_capacity(lines.len());
        let mut cursor = start;

        for line in lines {
            let Some(command) = parse_line(line.as_ref(), cursor, options.explicit)? else {
                continue;
            };

            match options.segment_length {
                Some(segment_length) if command.is_motion() && command.args.contains('E') => {
                    let segments = split_move(&command, segment_length)?;
                    cursor = segments.last().map_or(cursor, |s| s.final_point);
                    commands.extend(segments);
                }
                _ => {
                    cursor = command.final_point;
                    commands.push(command);
                }
            }
        }

        let initial_point = commands.first().map_or(start, |c| c.initial_point);

        Ok(Self {
            index,
            commands,
            preamble: Vec::new(),
            postamble: Vec::new(),
            initial_point,
            final_point: cursor,
        })
    }

    pub fn initial_point(&self) -> Point {
        self.initial_point
    }

    pub fn final_point(&self) -> Point {
        self.final_point
    }

    /// Nominal build height: the first Z found in the layer
    ///
    /// It is the only Z unless a vertex-level correction has perturbed it.
    pub fn z(&self) -> Option<f64> {
        self.commands.iter().find_map(|c| c.args.number('Z'))
    }

    pub fn extents(&self) -> Option<Extents> {
        let xs = self.commands.iter().filter_map(|c| c.args.number('X'));
        let ys = self.commands.iter().filter_map(|c| c.args.number('Y'));
        let (min_x, max_x) = min_max(xs)?;
        let (min_y, max_y) = min_max(ys)?;

        Some(Extents {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Two rapid moves to the lower and upper corners of the extents
    pub fn extents_commands(&self) -> Result<Option<(Command, Command)>> {
        let Some(extents) = self.extents() else {
            return Ok(None);
        };

        let corner = |x: f64, y: f64, from: Point| {
            let mut args = ArgMap::new();
            args.set_number('X', x);
            args.set_number('Y', y);
            Command::from_parts("G0", args, None, from)
        };
        let lower = corner(extents.min_x, extents.min_y, self.initial_point)?;
        let upper = corner(extents.max_x, extents.max_y, lower.final_point)?;

        Ok(Some((lower, upper)))
    }

    /// All commands with the given code
    pub fn find(&self, code: &str) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.code() == Some(code))
            .collect()
    }

    /// Add `amount` to `axis` on every command that carries it
    pub fn shift(&mut self, axis: char, amount: f64) {
        for command in &mut self.commands {
            command.args.offset(axis, amount);
        }
    }

    /// Multiply `axis` by `factor` on every command that carries it
    pub fn multiply(&mut self, axis: char, factor: f64) {
        for command in &mut self.commands {
            command.args.scale(axis, factor);
        }
    }

    /// Replace the commands emitted before this layer
    pub fn set_preamble(&mut self, text: &str) -> Result<()> {
        self.preamble = parse_block(text, self.initial_point)?;
        Ok(())
    }

    /// Replace the commands emitted after this layer
    pub fn set_postamble(&mut self, text: &str) -> Result<()> {
        self.postamble = parse_block(text, self.final_point)?;
        Ok(())
    }

    pub fn construct(&self) -> String {
        self.preamble
            .iter()
            .chain(&self.commands)
            .chain(&self.postamble)
            .map(Command::construct)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Layer {}", self.index)?;
        if let Some(z) = self.z() {
            write!(f, " at Z={z}")?;
        }
        if let Some(e) = self.extents() {
            write!(
                f,
                "; corners: ({}, {}), ({}, {})",
                e.min_x, e.min_y, e.max_x, e.max_y
            )?;
        }
        write!(f, "; {} lines>", self.commands.len())
    }
}

fn parse_block(text: &str, start: Point) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for line in text.lines() {
        if let Some(command) = parse_line(line, start, false)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
