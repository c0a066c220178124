use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use spectrum_tail::{
    power::{integrate, spectrum_stats},
    FrequencyAxis, RowDecoder,
};

// tinySA default sweep
const POINTS: usize = 290;

fn benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    let header: String = std::iter::once("Timestamp".to_owned())
        .chain((0..POINTS).map(|i| (100_000_000 + i * 100_000).to_string()))
        .collect::<Vec<_>>()
        .join(",");
    let powers: Vec<f64> = (0..POINTS).map(|_| rng.gen_range(-110.0..-20.0)).collect();
    let row: String = std::iter::once("19:11:39".to_owned())
        .chain(powers.iter().map(|p| format!("{:.2}", p)))
        .collect::<Vec<_>>()
        .join(",");

    let axis = FrequencyAxis::from_header(&header).unwrap();
    let freqs = axis.mhz().to_vec();
    let decoder = RowDecoder::new(axis, Arc::from(Path::new("20251112.csv")));
    let now = NaiveDate::from_ymd_opt(2025, 11, 12)
        .unwrap()
        .and_hms_opt(19, 11, 40)
        .unwrap();

    c.bench_function("header decode", |b| {
        b.iter(|| FrequencyAxis::from_header(black_box(&header)))
    });

    c.bench_function("row decode", |b| {
        b.iter(|| decoder.decode(black_box(&row), 0, 1, now))
    });

    c.bench_function("integrate", |b| b.iter(|| integrate(black_box(&powers))));

    c.bench_function("spectrum stats", |b| {
        b.iter(|| spectrum_stats(black_box(&freqs), black_box(&powers)))
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
