use core_buffer::{EditBuffer, EDIT_MAX_FLAT, EDIT_MIN};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_1k_lines", |b| {
        b.iter(|| {
            let mut buf = EditBuffer::new(EDIT_MIN, EDIT_MAX_FLAT);
            for _ in 0..1000 {
                buf.insert(black_box(b"the quick brown fox\n")).unwrap();
            }
            buf.zed()
        })
    });
}

fn bench_gap_shift(c: &mut Criterion) {
    let mut buf = EditBuffer::new(EDIT_MIN, EDIT_MAX_FLAT);
    for _ in 0..1000 {
        buf.insert(b"the quick brown fox\n").unwrap();
    }
    let z = buf.zed() as i64;
    c.bench_function("edit_at_alternating_ends", |b| {
        b.iter(|| {
            buf.set_dot(black_box(0));
            buf.insert(b"x").unwrap();
            buf.delete(-1).unwrap();
            buf.set_dot(black_box(z));
            buf.insert(b"y").unwrap();
            buf.delete(-1).unwrap();
        })
    });
}

criterion_group!(benches, bench_insert, bench_gap_shift);
criterion_main!(benches);
