use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vcu_config::{PedalCfg, PedalFilter};
use vcu_core::pedal::Pedal;

fn bench_pedal_tick(c: &mut Criterion) {
    let cfg = PedalCfg {
        filter: PedalFilter::Average,
        ..PedalCfg::default()
    };
    let mut pedal = Pedal::new(&cfg, 1).unwrap();
    let mut tick = 0u64;

    c.bench_function("pedal_evaluate_tick", |b| {
        b.iter(|| {
            tick += 1;
            let apps = 400 + (tick % 200) as u16;
            let status = pedal.evaluate(
                black_box(apps),
                black_box((u32::from(apps) * 33 / 50) as u16),
                black_box(120),
                tick,
            );
            black_box(status.torque)
        })
    });
}

fn bench_filters(c: &mut Criterion) {
    use vcu_core::filter::{AverageFilter, ExponentialFilter, Filter};

    c.bench_function("average_filter_8", |b| {
        let mut f: AverageFilter<8> = AverageFilter::new();
        let mut x = 0i32;
        b.iter(|| {
            x = (x + 7) % 1024;
            f.add_sample(black_box(x));
            black_box(f.filtered())
        })
    });

    c.bench_function("exponential_filter_31_1", |b| {
        let mut f: ExponentialFilter<31, 1> = ExponentialFilter::new();
        let mut x = 0i32;
        b.iter(|| {
            x = (x + 7) % 1024;
            f.add_sample(black_box(x));
            black_box(f.filtered())
        })
    });
}

criterion_group!(benches, bench_pedal_tick, bench_filters);
criterion_main!(benches);
