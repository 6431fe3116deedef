//! Linear-scan search benchmark.
//!
//! Fills an in-memory store with random vectors and times `search_similar`.
//!
//!   cargo run -p e2e-tests --bin scan_bench --release -- --vectors 50000 --dim 384

use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use embedkit_search::{search_similar, InMemoryStore, StoredEmbedding};

#[derive(Parser, Debug)]
#[command(name = "scan_bench", about = "embedkit linear-scan search benchmark")]
struct Args {
    #[arg(long, default_value_t = 10_000)]
    vectors: usize,
    #[arg(long, default_value_t = 384)]
    dim: usize,
    #[arg(long, default_value_t = 20)]
    queries: usize,
    #[arg(long, default_value_t = 10)]
    limit: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Serialize)]
struct Report {
    vectors: usize,
    dim: usize,
    queries: usize,
    mean_ms: f64,
    max_ms: f64,
}

fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0f32..1.0)).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let store: InMemoryStore<()> = InMemoryStore::new();
    for i in 0..args.vectors {
        let v = random_vector(&mut rng, args.dim);
        store
            .add_embedding(StoredEmbedding::new(format!("v{i}"), format!("r{}", i / 4), v))
            .await;
    }

    let mut timings = Vec::with_capacity(args.queries);
    for _ in 0..args.queries {
        let query = random_vector(&mut rng, args.dim);
        let start = Instant::now();
        let hits = search_similar(&store, &query, args.limit, 0.0).await?;
        timings.push(start.elapsed().as_secs_f64() * 1000.0);
        assert!(hits.len() <= args.limit);
    }

    let mean_ms = timings.iter().sum::<f64>() / timings.len().max(1) as f64;
    let max_ms = timings.iter().copied().fold(0.0, f64::max);
    let report = Report {
        vectors: args.vectors,
        dim: args.dim,
        queries: args.queries,
        mean_ms,
        max_ms,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
