use criterion::{black_box, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::SeedableRng;

use kpi_feed::core::{locate, read_window, LogView, WindowConfig, WindowQuery};

const ROWS: i64 = 1_000_000;
const SPACING_MS: i64 = 100;

fn build_log() -> Vec<u8> {
    let mut out = b"timestamp,ue_id,dl_thp,ul_thp,rsrp,cqi\n".to_vec();
    for i in 0..ROWS {
        let line = format!(
            "{},{},{}.{},{},{},{}\n",
            1_700_000_000_000 + i * SPACING_MS,
            i % 4,
            (i * 13) % 9000,
            i % 10,
            (i * 7) % 3000,
            -70 - (i % 30),
            i % 16
        );
        out.extend_from_slice(line.as_bytes());
    }
    out
}

fn bench_locate(c: &mut Criterion) {
    let data = build_log();
    let view = LogView::new(&data);
    let mut group = c.benchmark_group("locate");
    for &frac in &[0.0_f64, 0.5, 0.99] {
        let target = 1_700_000_000_000 + ((ROWS as f64 * frac) as i64) * SPACING_MS;
        group.bench_with_input(BenchmarkId::from_parameter(frac), &target, |b, &target| {
            b.iter(|| locate(&view, black_box(target), 10));
        });
    }
    group.finish();
}

fn bench_window(c: &mut Criterion) {
    let data = build_log();
    let view = LogView::new(&data);
    let config = WindowConfig::default();
    let from = 1_700_000_000_000 + (ROWS / 2) * SPACING_MS;
    let to = 1_700_000_000_000 + (ROWS - 1) * SPACING_MS;

    let mut group = c.benchmark_group("window");
    for &samples in &[0_u64, 500, 5_000] {
        let query = WindowQuery {
            from: Some(from),
            to: Some(to),
            approx_num_samples: (samples > 0).then_some(samples),
            filter_columns: Some(vec!["timestamp".into(), "rsrp".into()]),
        };
        group.bench_with_input(BenchmarkId::from_parameter(samples), &query, |b, query| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| read_window(&view, black_box(query), &config, &mut rng));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_locate, bench_window);
criterion_main!(benches);
