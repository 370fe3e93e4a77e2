use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gcode_zcomp::{Document, ParseOptions, Point, parse_line};
use std::hint::black_box;

/// Generate a layered toolpath: `layers` square perimeters of `moves` sides each
fn generate_toolpath(layers: usize, moves: usize, marked: bool) -> String {
    let mut content = String::from(";FLAVOR:Marlin\nM104 S210\nG28\n");

    for layer in 0..layers {
        if marked {
            content.push_str(&format!(";LAYER:{layer}\n"));
        }
        content.push_str(&format!("G0 Z{:.2} F9000\n", 0.2 + layer as f64 * 0.2));
        content.push_str(";TYPE:WALL-OUTER\n");
        for i in 0..moves {
            let x = 20.0 + 40.0 * ((i % 4) / 2) as f64;
            let y = 20.0 + 40.0 * (((i + 1) % 4) / 2) as f64;
            content.push_str(&format!("G1 X{x:.3} Y{y:.3} E{:.5}\n", 1.33));
        }
        content.push_str("G0 X5 Y5 ; travel\n");
    }

    content
}

/// Benchmark parsing single lines with different patterns
fn bench_single_line_parsing(c: &mut Criterion) {
    let test_lines = vec![
        ("simple_move", "G1 X10 Y20"),
        ("complex_move", "G1 X123.456 Y789.012 Z0.3 E2.85714 F1500"),
        ("with_comment", "G1 X10 Y20 ; Move to next position"),
        ("comment_only", "; This is a comment line with some detailed information"),
        ("temperature", "M104 S210 T0"),
        ("message", "M117 Printing layer 12 of 200"),
    ];

    let mut group = c.benchmark_group("single_line_parsing");

    for (name, line) in test_lines {
        group.bench_with_input(BenchmarkId::new("parse_line", name), &line, |b, line| {
            b.iter(|| black_box(parse_line(black_box(line), Point::ORIGIN, true)))
        });
    }

    group.finish();
}

/// Benchmark whole-document assembly, with and without splitting
fn bench_document_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_parsing");

    for &layers in &[10, 100, 500] {
        for (name, marked) in [("marked", true), ("heuristic", false)] {
            let content = generate_toolpath(layers, 40, marked);
            group.throughput(Throughput::Bytes(content.len() as u64));

            group.bench_with_input(
                BenchmarkId::new(format!("{name}_split"), layers),
                &content,
                |b, content| {
                    b.iter(|| black_box(Document::parse(black_box(content), &ParseOptions::default())))
                },
            );
            group.bench_with_input(
                BenchmarkId::new(format!("{name}_verbatim"), layers),
                &content,
                |b, content| {
                    b.iter(|| black_box(Document::parse(black_box(content), &ParseOptions::verbatim())))
                },
            );
        }
    }

    group.finish();
}

/// Benchmark re-serialization of a parsed document
fn bench_construct(c: &mut Criterion) {
    let content = generate_toolpath(200, 40, true);
    let Ok(document) = Document::parse(&content, &ParseOptions::default()) else {
        return;
    };

    c.bench_function("construct_200_layers", |b| {
        b.iter(|| black_box(document.construct()))
    });
}

criterion_group!(
    benches,
    bench_single_line_parsing,
    bench_document_parsing,
    bench_construct
);
criterion_main!(benches);
