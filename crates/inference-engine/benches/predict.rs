use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feature_engine::ReadingSet;
use inference_engine::Predictor;

fn bench_predict(c: &mut Criterion) {
    let predictor = Predictor::rules_only();
    let readings = vec![
        ReadingSet::new("weather")
            .with("rainfall", 120.0)
            .with("windspeed", "18.5")
            .with("pressure", 995.0),
        ReadingSet::new("seismic")
            .with("magnitude", 2.4)
            .with("seismic_activity", 0.3),
    ];

    c.bench_function("predict_rules_two_sources", |b| {
        b.iter(|| predictor.predict(black_box(&readings)))
    });

    let empty: Vec<ReadingSet> = Vec::new();
    c.bench_function("predict_rules_empty", |b| {
        b.iter(|| predictor.predict(black_box(&empty)))
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
