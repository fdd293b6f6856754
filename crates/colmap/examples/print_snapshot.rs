//! Print the structure snapshot for a JSON-described workbook.
//!
//! ```text
//! RUST_LOG=colmap=debug cargo run -p colmap --example print_snapshot -- workbook.json
//! ```

use colmap::{MemoryHost, RefreshOutcome, SnapshotCache, SnapshotEvent};
use futures::executor::block_on;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: print_snapshot <workbook.json>")?;
    let json = std::fs::read_to_string(&path)?;
    let cache = SnapshotCache::new(MemoryHost::from_json_str(&json)?);
    cache.subscribe(|event| {
        if let SnapshotEvent::BuildFailed { message } = event {
            eprintln!("build failed: {message}");
        }
    });

    match block_on(cache.ensure_fresh(true)) {
        RefreshOutcome::Rebuilt => {
            println!("{}", cache.current_snapshot());
            Ok(())
        }
        other => Err(format!("snapshot not built: {}", other.as_str()).into()),
    }
}
