use data_loader::{Dataset, LoadOptions};
use std::path::Path;
use std::time::Instant;

fn main() {
    let data_dir = Path::new("data/ml-latest-small");

    println!("Loading MovieLens dataset...\n");

    let start = Instant::now();
    let dataset = Dataset::load_from_dir(data_dir, &LoadOptions::default())
        .expect("Failed to load dataset");
    let elapsed = start.elapsed();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Movies: {}", dataset.catalog.len());
    println!("Ratings: {}", dataset.interactions.len());
    println!("Catalog fingerprint: {:016x}", dataset.catalog.fingerprint());
    println!("\nPerformance: {:.0} ratings/second",
             dataset.interactions.len() as f64 / elapsed.as_secs_f64());
}
