use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use modellwald::catalog::settings;
use modellwald::config::ScannerConfig;
use modellwald::db;
use modellwald::metrics::Metrics;
use modellwald::scanner::Scanner;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::fs;
use std::hint::black_box;
use std::path::Path;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// `categories` x `categories` category folders, each holding `models` model folders.
/// Every second model keeps its meshes in an ignored `parts/` subfolder.
fn create_library(categories: usize, models: usize, files_per_model: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    for a in 0..categories {
        for b in 0..categories {
            for m in 0..models {
                let model_dir = temp_dir.path().join(format!("cat_{}/sub_{}/model_{}", a, b, m));
                let mesh_dir = if m % 2 == 0 { model_dir.clone() } else { model_dir.join("parts") };
                fs::create_dir_all(&mesh_dir).unwrap();
                for f in 0..files_per_model {
                    fs::write(mesh_dir.join(format!("part_{}.stl", f)), vec![0u8; 256]).unwrap();
                }
                fs::create_dir_all(model_dir.join("renders")).unwrap();
                fs::write(model_dir.join("renders/preview.png"), b"png").unwrap();
            }
        }
    }
    temp_dir
}

async fn fresh_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    db::init_db(&pool).await.unwrap();
    pool
}

fn scanner(pool: &SqlitePool, root: &Path) -> Scanner {
    Scanner::new(pool.clone(), root, ScannerConfig::default(), Metrics::new())
}

fn benchmark_first_pass(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let library = create_library(3, 10, 4);

    c.bench_function("first_pass", |b| {
        b.iter(|| {
            rt.block_on(async {
                let pool = fresh_pool().await;
                black_box(scanner(&pool, library.path()).run_pass().await)
            })
        })
    });
}

fn benchmark_rescan(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let library = create_library(4, 20, 4);
    let pool = rt.block_on(async {
        let pool = fresh_pool().await;
        scanner(&pool, library.path()).run_pass().await.unwrap();
        pool
    });
    let s = scanner(&pool, library.path());

    c.bench_function("rescan_unchanged", |b| b.iter(|| rt.block_on(async { black_box(s.run_pass().await) })));
}

fn benchmark_min_depth(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let library = create_library(3, 10, 2);

    let mut group = c.benchmark_group("min_depth");
    for min_depth in [0i64, 1, 2].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(min_depth), min_depth, |b, &min_depth| {
            b.iter(|| {
                rt.block_on(async {
                    let pool = fresh_pool().await;
                    settings::set(&pool, settings::SCANNER_MIN_DEPTH, &min_depth.to_string()).await.unwrap();
                    black_box(scanner(&pool, library.path()).run_pass().await)
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_first_pass, benchmark_rescan, benchmark_min_depth);
criterion_main!(benches);
