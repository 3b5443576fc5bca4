use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use epg_etl::models::{KeySet, TableKind, Value, ViewingRecord};
use epg_etl::processors::{Cleaner, FeatureBuilder, KMeans, MiniBatchKMeans, ParentKeys, Partitioner};
use epg_etl::readers::CsvTableReader;

// Synthetic epg_stat export with a sprinkling of bad rows
fn create_epg_export(rows: usize) -> String {
    let mut content = String::from(
        "client_id;device_id;time_ch;ch_id;epg_name;time_epg;time_to_epg;duration;category;subcategory\n",
    );
    for i in 0..rows {
        let duration = if i % 50 == 0 { "-1".to_string() } else { (i % 7200).to_string() };
        content.push_str(&format!(
            "C{};D{};2024-10-{:02} {:02}:{:02}:00;{};Show {};2024-10-01 08:00:00;2024-10-01 09:00:00;{};Cat{};Sub{}\n",
            i % 500,
            i % 3,
            1 + i % 28,
            i % 24,
            i % 60,
            i % 40,
            i,
            duration,
            i % 6,
            i % 4
        ));
    }
    content
}

fn parent_keys() -> ParentKeys {
    let clients: KeySet = (0..450).map(|i| Value::from(format!("C{}", i))).collect();
    let channels: KeySet = (0..35i32).map(Value::from).collect();
    ParentKeys::new()
        .with("client", "client_id", clients)
        .with("package_channel", "ch_id", channels)
}

fn create_viewing_records(subscribers: usize) -> Vec<ViewingRecord> {
    let mut records = Vec::new();
    for s in 0..subscribers {
        let gender = if s % 2 == 0 { "M" } else { "F" };
        let age = ["18-24", "25-34", "35-44", "45-54"][s % 4];
        for c in 0..6 {
            if (s + c) % 3 == 0 {
                continue;
            }
            records.push(ViewingRecord::new(
                format!("C{}", s),
                Some(gender),
                Some(age),
                Some(["News", "Sport", "Kids"][c % 3]),
                Some(["Daily", "Live"][c % 2]),
                Some(((s * 37 + c * 101) % 10_000) as i64),
            ));
        }
    }
    records
}

fn benchmark_clean_epg_stat(c: &mut Criterion) {
    let raw = CsvTableReader::new()
        .read_str(&create_epg_export(10_000))
        .unwrap();
    let parents = parent_keys();
    let cleaner = Cleaner::new(TableKind::EpgStat);

    c.bench_function("clean_epg_stat_10k", |b| {
        b.iter(|| {
            let cleaned = cleaner.clean(black_box(&raw), &parents).unwrap();
            black_box(cleaned.len())
        })
    });
}

fn benchmark_feature_building(c: &mut Criterion) {
    let records = create_viewing_records(2_000);

    c.bench_function("build_features_2k_subscribers", |b| {
        b.iter(|| {
            let matrix = FeatureBuilder::new().build(black_box(&records));
            black_box(matrix.len())
        })
    });
}

fn benchmark_kmeans_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans_by_subscribers");
    group.sample_size(10);

    for &size in &[500, 2_000, 5_000] {
        let features = FeatureBuilder::new().build(&create_viewing_records(size));

        group.bench_with_input(BenchmarkId::new("full_batch", size), &features.scaled, |b, rows| {
            let model = KMeans::new(5);
            b.iter(|| black_box(model.fit(rows).unwrap().inertia))
        });

        group.bench_with_input(BenchmarkId::new("mini_batch", size), &features.scaled, |b, rows| {
            let model = MiniBatchKMeans::new(5).with_batch_size(256);
            b.iter(|| black_box(model.fit(rows).unwrap().inertia))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_clean_epg_stat,
    benchmark_feature_building,
    benchmark_kmeans_by_size
);
criterion_main!(benches);
