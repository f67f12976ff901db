use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use pca_report::{AnalysisPipeline, PcaEngine, Standardizer, TableLoader};

// Random feature matrix rendered as CSV with a three-level category column.
fn generate_csv(n_samples: usize, n_features: usize) -> Vec<u8> {
    let data: Array2<f64> = Array::random((n_samples, n_features), Uniform::new(0., 10.));
    let mut csv = String::from("group");
    for j in 0..n_features {
        csv.push_str(&format!(",feature_{}", j));
    }
    csv.push('\n');
    for (i, row) in data.rows().into_iter().enumerate() {
        csv.push_str(["a", "b", "c"][i % 3]);
        for v in row {
            csv.push_str(&format!(",{}", v));
        }
        csv.push('\n');
    }
    csv.into_bytes()
}

// Load + standardize + eigendecomposition, no rendering.
fn bench_pca_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("PcaEngine_fit");

    for &(n_samples, n_features) in [(100, 10), (1000, 20), (200, 100)].iter() {
        let csv = generate_csv(n_samples, n_features);
        let table = TableLoader::default().load(&csv).unwrap();
        let standardized = Standardizer::default().standardize(&table).unwrap();
        let engine = PcaEngine::default();
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));
        group.bench_with_input(
            BenchmarkId::new("fit", format!("{}x{}", n_samples, n_features)),
            &standardized,
            |b, standardized| b.iter(|| engine.fit(standardized).unwrap()),
        );
    }
    group.finish();
}

// Full run including the four PNG renders.
fn bench_pipeline_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("AnalysisPipeline_run");
    group.sample_size(20);

    let pipeline = AnalysisPipeline::default();
    for &(n_samples, n_features) in [(150, 4), (1000, 20)].iter() {
        let csv = generate_csv(n_samples, n_features);
        group.throughput(Throughput::Bytes(csv.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("run", format!("{}x{}", n_samples, n_features)),
            &csv,
            |b, csv| b.iter(|| pipeline.run(csv).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pca_fit, bench_pipeline_run);
criterion_main!(benches);
