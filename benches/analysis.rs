//! Benchmarks for workbook analysis.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports. Workbooks are
//! generated in memory with the integration-test fixtures.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]

#[path = "../tests/fixtures/mod.rs"]
mod fixtures;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
use xlcanon::cell_ref::column_letters;
use xlcanon::AnalysisOptions;

/// `sheets` sheets of `rows` x `cols` numbers, every fifth row bold.
fn grid_workbook(sheets: usize, rows: u32, cols: u32) -> Vec<u8> {
    let mut builder = XlsxBuilder::new();
    for s in 0..sheets {
        let mut sheet = SheetBuilder::new(&format!("Sheet{}", s + 1));
        for row in 1..=rows {
            let style = (row % 5 == 0).then(|| StyleBuilder::new().bold());
            for col in 1..=cols {
                let coord = format!("{}{row}", column_letters(col));
                sheet = sheet.cell(&coord, f64::from(row * col), style.clone());
            }
        }
        builder = builder.sheet(sheet.merge(&format!("A{}:B{}", rows + 2, rows + 3)));
    }
    builder.build()
}

/// Benchmark the two-sheet sample end to end
fn bench_small(c: &mut Criterion) {
    let data = fixtures::two_sheet_xlsx();
    let options = AnalysisOptions::default();

    c.bench_function("analyze_two_sheet", |b| {
        b.iter(|| xlcanon::analyze_xlsx(black_box(&data), &options).expect("analysis failed"))
    });
}

/// Container reading alone
fn bench_open(c: &mut Criterion) {
    let data = grid_workbook(4, 500, 10);

    let mut group = c.benchmark_group("open");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("open_4x500x10", |b| {
        b.iter(|| xlcanon::parser::open(black_box(&data)).expect("open failed"))
    });
    group.finish();
}

/// Sequential against parallel extraction over the same parsed container
fn bench_sheet_parallelism(c: &mut Criterion) {
    let data = grid_workbook(8, 1000, 10);
    let container = xlcanon::parser::open(&data).expect("open failed");

    let mut group = c.benchmark_group("extract_8x1000x10");
    for (label, options) in [
        ("sequential", AnalysisOptions::sequential()),
        ("parallel", AnalysisOptions::default()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &options, |b, options| {
            b.iter(|| xlcanon::analyze(black_box(&container), options).expect("analysis failed"))
        });
    }
    group.finish();
}

/// Scaling with sheet size
fn bench_sheet_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("sheet_size");
    for rows in [100u32, 1000, 5000] {
        let data = grid_workbook(1, rows, 20);
        group.throughput(Throughput::Elements(u64::from(rows) * 20));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| {
                xlcanon::analyze_xlsx(black_box(data), &AnalysisOptions::default())
                    .expect("analysis failed")
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_small,
    bench_open,
    bench_sheet_parallelism,
    bench_sheet_sizes
);
criterion_main!(benches);
