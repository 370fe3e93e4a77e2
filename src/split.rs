//! Move Splitter
//!
//! Subdivides long extruding moves into fixed-length segments so a spatially
//! varying correction can be applied along the path. The segments end exactly
//! where the original move ends and deposit the same filament length, up to
//! the 3-decimal rounding of each segment's extrusion.

use crate::error::{IntegrityError, Result};
use crate::parser::{Command, Point};

/// Default segment length (mm)
pub const DEFAULT_SEGMENT_LENGTH: f64 = 3.0;

/// Comment attached to full-length segments
pub const SEGMENT_COMMENT: &str = "splt";
/// Comment attached to the trailing remainder segment
pub const END_SEGMENT_COMMENT: &str = "end splt";

/// Round to 3 decimals, the precision written back to the toolpath
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Split a motion command into segments no longer than `segment_length`
///
/// Commands that are not longer than `segment_length`, or that carry no
/// numeric extrusion, come back unchanged as a single-element list.
pub fn split_move(command: &Command, segment_length: f64) -> Result<Vec<Command>> {
    let extrusion = match (command.code(), command.args.number('E')) {
        (Some(_), Some(extrusion)) if command.length > segment_length => extrusion,
        _ => return Ok(vec![command.clone()]),
    };
    let code = command.code().unwrap_or_default();

    let length = command.length;
    let n_segments = (length / segment_length).floor() as usize;
    let origin = command.initial_point;

    // Axes that are not explicit destinations do not move
    let cosine = |axis: char| {
        command
            .args
            .number(axis)
            .map_or(0.0, |destination| (destination - origin.axis(axis)) / length)
    };
    let direction = Point::new(cosine('X'), cosine('Y'), cosine('Z'));

    let segment_extrusion = round3(extrusion * segment_length / length);
    let remainder_extrusion =
        round3(extrusion * (length - segment_length * n_segments as f64) / length);

    // Zero-length anchor at the origin; dropped before returning since a move
    // going nowhere makes the printer hesitate.
    let mut anchor_args = command.args.clone();
    anchor_args.set_number('X', origin.x);
    anchor_args.set_number('Y', origin.y);
    anchor_args.set_number('Z', origin.z);
    anchor_args.set_number('E', 0.0);
    let anchor = Command::from_parts(code, anchor_args, Some("begin splt".to_string()), origin)?;

    let mut cursor = anchor.final_point;
    let mut segments = Vec::with_capacity(n_segments + 1);

    for i in 1..=n_segments {
        let travelled = i as f64 * segment_length;
        let mut args = command.args.clone();
        // Unnamed axes stay implicit and keep the exact inherited coordinate
        for axis in ['X', 'Y', 'Z'].into_iter().filter(|&axis| command.args.contains(axis)) {
            args.set_number(axis, round3(origin.axis(axis) + travelled * direction.axis(axis)));
        }
        args.set_number('E', segment_extrusion);
        if i > 1 {
            args.remove('F');
        }

        let segment = Command::from_parts(code, args, Some(SEGMENT_COMMENT.to_string()), cursor)?;
        cursor = segment.final_point;
        segments.push(segment);
    }

    let mut last_args = command.args.clone();
    last_args.set_number('E', remainder_extrusion);
    last_args.remove('F');
    let last = Command::from_parts(code, last_args, Some(END_SEGMENT_COMMENT.to_string()), cursor)?;

    if last.length > 0.0 || remainder_extrusion != 0.0 {
        segments.push(last);
    } else {
        log::trace!(
            "suppressing empty remainder segment at {}",
            last.final_point
        );
    }

    let actual = segments.last().map_or(origin, |segment| segment.final_point);
    if actual != command.final_point {
        return Err(IntegrityError::SplitMismatch {
            expected: command.final_point,
            actual,
        }
        .into());
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use approx::assert_abs_diff_eq;

    fn command(line: &str, initial: Point) -> Command {
        parse_line(line, initial, true).unwrap().unwrap()
    }

    fn total_extrusion(segments: &[Command]) -> f64 {
        segments.iter().filter_map(|s| s.args.number('E')).sum()
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0004), -0.0);
        assert_eq!(round3(2.0), 2.0);
    }

    #[test]
    fn test_short_move_is_not_split() {
        let cmd = command("G1 X2 Y0 E0.1", Point::ORIGIN);
        let segments = split_move(&cmd, 3.0).unwrap();

        assert_eq!(segments, vec![cmd]);
    }

    #[test]
    fn test_move_without_extrusion_is_not_split() {
        let cmd = command("G0 X100 Y0", Point::ORIGIN);
        assert_eq!(split_move(&cmd, 3.0).unwrap().len(), 1);
    }

    #[test]
    fn test_exact_multiple_suppresses_empty_remainder() {
        let cmd = command("G1 X0 Y9 Z0 E3", Point::ORIGIN);
        let segments = split_move(&cmd, 3.0).unwrap();

        assert_eq!(segments.len(), 3);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.args.number('E'), Some(1.0));
            assert_eq!(segment.final_point.y, 3.0 * (i + 1) as f64);
            assert_eq!(segment.comment.as_deref(), Some(SEGMENT_COMMENT));
        }
        assert_eq!(segments[2].final_point, cmd.final_point);
    }

    #[test]
    fn test_remainder_segment_carries_leftover() {
        let cmd = command("G1 X10 Y0 E2.0 F1800", Point::ORIGIN);
        let segments = split_move(&cmd, 3.0).unwrap();

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].args.number('E'), Some(0.6));
        assert_eq!(segments[3].args.number('E'), Some(0.2));
        assert_eq!(segments[3].comment.as_deref(), Some(END_SEGMENT_COMMENT));
        assert_abs_diff_eq!(total_extrusion(&segments), 2.0, epsilon = 0.001);
    }

    #[test]
    fn test_feed_rate_only_on_first_segment() {
        let cmd = command("G1 X10 Y10 F1200 E1.5", Point::ORIGIN);
        let segments = split_move(&cmd, 3.0).unwrap();

        assert!(segments[0].args.contains('F'));
        assert!(segments[1..].iter().all(|s| !s.args.contains('F')));
    }

    #[test]
    fn test_segments_chain_and_end_at_destination() {
        let start = Point::new(12.5, 40.25, 0.2);
        let cmd = command("G1 X27.5 Y60.25 E1.25", start);
        let segments = split_move(&cmd, 3.0).unwrap();

        assert_eq!(segments[0].initial_point, start);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].final_point, pair[1].initial_point);
        }
        assert_eq!(segments.last().unwrap().final_point, cmd.final_point);
        assert!(segments.iter().all(|s| s.length <= 3.0 + 1e-3));
        assert_eq!(segments.len(), 9);
        assert_abs_diff_eq!(total_extrusion(&segments), 1.25, epsilon = 0.001);
    }

    #[test]
    fn test_implicit_axes_stay_implicit() {
        let start = Point::new(1.23456, 0.0, 0.2);
        let cmd = parse_line("G1 Y10 E1", start, false).unwrap().unwrap();
        let segments = split_move(&cmd, 3.0).unwrap();

        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| !s.args.contains('X') && !s.args.contains('Z')));
        assert!(segments.iter().all(|s| s.final_point.x == 1.23456));
        assert_eq!(segments.last().unwrap().final_point, cmd.final_point);
    }
}
