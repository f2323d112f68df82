use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cyclone::controls::s;
use cyclone::pattern::Pattern;

fn bench_queries(c: &mut Criterion) {
    let drums = Pattern::stack(vec![
        s("bd ~ bd ~"),
        s("hh hh hh hh").fast(2.0),
        s("~ sn ~ sn").every(4, |p| p.rev()),
    ]);
    c.bench_function("stacked drums, 16 cycles", |b| {
        b.iter(|| black_box(drums.query_arc(0.0, 16.0)))
    });

    let euclid = s("bd").euclid(5, 8).degrade_by(0.25);
    c.bench_function("euclid with degrade, 64 cycles", |b| {
        b.iter(|| black_box(euclid.query_arc(0.0, 64.0)))
    });

    let controls = s("bd hh sn cp")
        .gain("0.9 0.6 0.8 0.5")
        .cutoff(800.0)
        .delay_time("0.125 0.25");
    c.bench_function("control merge, 16 cycles", |b| {
        b.iter(|| black_box(controls.query_arc(0.0, 16.0)))
    });
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
