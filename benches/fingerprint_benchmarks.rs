use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use neardupe::scanner::{PreprocessContext, Walker, WalkerConfig};
use neardupe::similarity::{fingerprint, score, DetectorConfig, DuplicateDetector};
use std::fs;
use tempfile::TempDir;

// Deterministic pseudo-text so runs are comparable
fn sample_text(words: usize) -> String {
    const VOCAB: &[&str] = &[
        "report", "revenue", "quarter", "growth", "the", "a", "region", "margin", "costs",
        "improved", "document", "similar", "window", "hash", "rolling", "text",
    ];
    let mut state: u32 = 17;
    (0..words)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            VOCAB[(state >> 16) as usize % VOCAB.len()]
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// 1. Fingerprinting throughput
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    for words in [100, 1_000, 10_000] {
        let text = sample_text(words);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(words), &text, |b, text| {
            b.iter(|| black_box(fingerprint(text, 10).unwrap()))
        });
    }
    group.finish();
}

// 2. Set comparison
fn bench_score(c: &mut Criterion) {
    let a = fingerprint(&sample_text(5_000), 10).unwrap();
    let mut edited = sample_text(5_000);
    edited.push_str(" with a short appendix at the end");
    let b = fingerprint(&edited, 10).unwrap();

    c.bench_function("score_5000_words", |bench| {
        bench.iter(|| black_box(score(&a, &b).unwrap()))
    });
}

// 3. Preprocessing
fn bench_preprocess(c: &mut Criterion) {
    let context = PreprocessContext::default();
    let text = sample_text(5_000);

    c.bench_function("preprocess_5000_words", |b| {
        b.iter(|| black_box(context.process(&text)))
    });
}

// 4. Whole detection run over a small directory
fn bench_detect(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let text = sample_text(2_000);
    let target = dir.path().join("target.txt");
    fs::write(&target, &text).unwrap();
    for i in 0..50 {
        let mut variant = text.clone();
        variant.push_str(&format!(" revision {}", i));
        fs::write(dir.path().join(format!("doc_{}.txt", i)), variant).unwrap();
    }

    let detector = DuplicateDetector::new(DetectorConfig::default());
    let walker = Walker::new(dir.path(), WalkerConfig::default());

    c.bench_function("detect_50_candidates", |b| {
        b.iter(|| black_box(detector.detect(&target, &walker).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_score,
    bench_preprocess,
    bench_detect
);
criterion_main!(benches);
