//! Classifier scan throughput across text sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use guard_classify::{default_classifiers, Classifier, CredentialsClassifier, FinancialClassifier};
use guard_common::Direction;

/// Mixed prose with sensitive values seeded roughly once per kilobyte.
fn sample_text(target: usize) -> String {
    let filler = "The quarterly report covers revenue, churn and forecasts for the region. ";
    let seeded = "Escalate via +1 415 555 2671 or card 4532015112830366 when paging fails. ";
    let mut text = String::with_capacity(target + seeded.len());
    let mut since_seed = 0usize;
    while text.len() < target {
        text.push_str(filler);
        since_seed += filler.len();
        if since_seed >= 1024 {
            text.push_str(seeded);
            since_seed = 0;
        }
    }
    text
}

fn bench_financial_scan(c: &mut Criterion) {
    let classifier = FinancialClassifier::new();
    let mut group = c.benchmark_group("financial_scan");
    for size in [1_000usize, 10_000, 100_000] {
        let text = sample_text(size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| classifier.scan(black_box(text), Direction::Input));
        });
    }
    group.finish();
}

fn bench_credentials_scan(c: &mut Criterion) {
    let classifier = CredentialsClassifier::new();
    let text = format!(
        "{} key sk-abcdefghijklmnopqrstuvwxyz1234567890ABCD trailing",
        sample_text(10_000)
    );
    let mut group = c.benchmark_group("credentials_scan");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("10k_with_key", |b| {
        b.iter(|| classifier.scan(black_box(&text), Direction::Input));
    });
    group.finish();
}

fn bench_all_classifiers(c: &mut Criterion) {
    let classifiers = default_classifiers();
    let text = sample_text(10_000);
    c.bench_function("all_classifiers_10k", |b| {
        b.iter(|| {
            for classifier in &classifiers {
                black_box(classifier.scan(black_box(&text), Direction::Input));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_financial_scan,
    bench_credentials_scan,
    bench_all_classifiers
);
criterion_main!(benches);
