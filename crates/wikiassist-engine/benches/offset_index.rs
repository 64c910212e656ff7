use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use wikiassist_engine::bridge::from_markdown;
use wikiassist_engine::editing::locator::{locate, locate_in};
use wikiassist_engine::editing::offset_index::OffsetIndex;
mod common;

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("offset_index");
    group.sample_size(20);

    let doc = from_markdown(&common::generate_article(200));
    group.bench_function("build", |b| {
        b.iter(|| {
            let index = OffsetIndex::build(black_box(&doc));
            black_box(index);
        });
    });

    let index = OffsetIndex::build(&doc);
    let len = index.char_len();
    group.bench_function("position_from_offset", |b| {
        b.iter(|| {
            for offset in (0..len).step_by(97) {
                black_box(index.position_from_offset(black_box(offset)));
            }
        });
    });

    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    group.sample_size(20);

    let doc = from_markdown(&common::generate_article(200));
    let index = OffsetIndex::build(&doc);

    group.bench_function("flat_text", |b| {
        b.iter(|| {
            let span = locate(black_box(index.flat_text()), common::last_sentence());
            let _ = black_box(span);
        });
    });

    group.bench_function("with_positions", |b| {
        b.iter(|| {
            let span = locate_in(black_box(&index), common::last_sentence());
            let _ = black_box(span);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_index_build, bench_locate);
criterion_main!(benches);
