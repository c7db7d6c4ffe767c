use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::time::Duration;
use xbasic_core::board::BoardCatalog;
use xbasic_core::build::{classify, CapturedOutput, ProcessOutcome};

fn board_file(boards: usize) -> String {
    let mut text = String::from("# generated board file\n");
    for i in 0..boards {
        text.push_str(&format!(
            "[BOARD{i}]\n    clkfreq: 80000000\n    clkmode: XTAL1+PLL16X\n    baudrate: 115200\n    \
             rxpin: 31\n    txpin: 30\n    tvpin: 12\n    text: hub\n    data: hub\n\n"
        ));
    }
    text
}

pub fn bench_catalog_load(c: &mut Criterion) {
    let text = board_file(32);
    c.bench_function("catalog_load_32_boards", |b| {
        b.iter(|| {
            let catalog = BoardCatalog::load(black_box(&text));
            black_box(catalog);
        })
    });

    let catalog = BoardCatalog::load(&text);
    c.bench_function("catalog_format_32_boards", |b| {
        b.iter(|| black_box(catalog.to_config_text()))
    });
}

pub fn bench_classify(c: &mut Criterion) {
    let listing = "line 12: undefined symbol 'foo'\n".repeat(200);
    c.bench_function("classify_large_listing", |b| {
        b.iter(|| {
            let outcome = ProcessOutcome::Exited {
                code: 1,
                output: CapturedOutput {
                    stdout: listing.clone(),
                    ..CapturedOutput::default()
                },
            };
            black_box(classify(outcome));
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_catalog_load, bench_classify
}
criterion_main!(benches);
