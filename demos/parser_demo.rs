use gcode_zcomp::parser::{Point, parse_line};
use gcode_zcomp::split::{DEFAULT_SEGMENT_LENGTH, split_move};

fn main() {
    println!("=== G-code Parser Demo ===");

    let test_lines = [
        "G1 X10 Y20.5 Z0.2 E0.8 ; linear move",
        "M104 S200 ; set temperature",
        "M117 Printing layer 1",
        "; another comment",
        "",
        "G28 ; home all axes",
        "G1 X1.2.3",
    ];

    let mut position = Point::ORIGIN;
    for line in test_lines {
        println!("\nInput: '{line}'");
        match parse_line(line, position, false) {
            Ok(Some(command)) => {
                println!("Parsed: {command:?}");
                println!("Rebuilt: '{}'", command.construct());
                position = command.final_point;
            }
            Ok(None) => println!("Parsed: nothing"),
            Err(e) => println!("Error: {e}"),
        }
    }

    println!("\n=== Move Splitting ===");
    if let Ok(Some(command)) = parse_line("G1 X0 Y9 E3 F1200", Point::ORIGIN, false) {
        match split_move(&command, DEFAULT_SEGMENT_LENGTH) {
            Ok(segments) => {
                for segment in segments {
                    println!("{}", segment.construct());
                }
            }
            Err(e) => println!("Error: {e}"),
        }
    }
}
