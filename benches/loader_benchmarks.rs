use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use metrocampus::dataset::{DatasetFiles, Line, RecordSet, Station};
use metrocampus::graph::{GraphStore, Label};
use metrocampus::loader::{DocumentTarget, GraphTarget, PhasedLoader};
use metrocampus::queries;
use metrocampus::topology::{derive_all_adjacency, derive_interchanges, TopologyConfig};
use std::path::PathBuf;

fn bundled() -> RecordSet {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    RecordSet::from_dir(&dir, &DatasetFiles::default()).unwrap()
}

/// `lines` lines of `len` stops; line `n` starts at the first stop of line `n - 1`
fn synthetic(lines: u32, len: usize) -> RecordSet {
    let mut out = Vec::new();
    let mut stations = Vec::new();
    for n in 1..=lines {
        let mut line = Line::new(n, format!("L{}", n), &[]);
        for i in 0..len {
            if i == 0 && n > 1 {
                line.stations.push(format!("s{}-0", n - 1));
                continue;
            }
            let slug = format!("s{}-{}", n, i);
            let served: Vec<u32> = if i == 0 && n < lines { vec![n, n + 1] } else { vec![n] };
            stations.push(Station::new(slug.as_str(), slug.as_str(), &served));
            line.stations.push(slug);
        }
        out.push(line);
    }
    RecordSet::new(out, stations, Vec::new())
}

/// Full three-pass load of the bundled dataset
fn bench_bundled_load(c: &mut Criterion) {
    let records = bundled();
    let mut group = c.benchmark_group("bundled_load");

    group.bench_function("graph", |b| {
        let mut target = GraphTarget::new();
        b.iter(|| {
            let report = PhasedLoader::new(&mut target, TopologyConfig::default())
                .load(&records)
                .unwrap();
            criterion::black_box(report.failures.len());
        });
    });

    group.bench_function("document", |b| {
        let mut target = DocumentTarget::new();
        b.iter(|| {
            let report = PhasedLoader::new(&mut target, TopologyConfig::default())
                .load(&records)
                .unwrap();
            criterion::black_box(report.failures.len());
        });
    });

    group.finish();
}

/// Load throughput as the network grows
fn bench_synthetic_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic_load");

    for size in [10u32, 50, 200].iter() {
        let records = synthetic(*size, 30);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut target = GraphTarget::new();
                let report = PhasedLoader::new(&mut target, TopologyConfig::default())
                    .load(&records)
                    .unwrap();
                criterion::black_box(report.failures.len());
            });
        });
    }
    group.finish();
}

fn bench_topology(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology");
    let records = synthetic(200, 30);
    let config = TopologyConfig::default();

    group.bench_function("adjacency", |b| {
        b.iter(|| criterion::black_box(derive_all_adjacency(&records.lines, &config).len()));
    });
    group.bench_function("interchanges", |b| {
        b.iter(|| criterion::black_box(derive_interchanges(&records.stations, &records.colocated, &config).len()));
    });
    group.finish();
}

/// Route search and label scan on the loaded bundled graph
fn bench_queries(c: &mut Criterion) {
    let records = bundled();
    let mut target = GraphTarget::new();
    PhasedLoader::new(&mut target, TopologyConfig::default())
        .load(&records)
        .unwrap();
    let store: GraphStore = target.into_store();

    let mut group = c.benchmark_group("queries");
    group.bench_function("label_scan", |b| {
        b.iter(|| criterion::black_box(store.get_nodes_by_label(&Label::new("Station")).len()));
    });
    group.bench_function("shortest_route", |b| {
        b.iter(|| criterion::black_box(queries::graph::shortest_route(&store, "bilbao", "arguelles").unwrap()));
    });
    group.bench_function("fastest_route", |b| {
        b.iter(|| criterion::black_box(queries::graph::fastest_route(&store, "bilbao", "legazpi").unwrap()));
    });
    group.bench_function("campuses_offering", |b| {
        b.iter(|| criterion::black_box(queries::graph::campuses_offering(&store, "derecho").len()));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_bundled_load,
    bench_synthetic_load,
    bench_topology,
    bench_queries,
);
criterion_main!(benches);
