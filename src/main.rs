use log::info;

use timetable_solver::server;
use timetable_solver::store::{Dataset, MemoryStore};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // optional JSON dataset to preload the in-memory store
    let store = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).expect("failed to read dataset file");
            let dataset: Dataset = serde_json::from_str(&raw).expect("failed to parse dataset file");
            info!("loaded dataset from {path}");
            MemoryStore::with_dataset(dataset)
        }
        None => MemoryStore::new(),
    };

    server::run_server(store).await;
}
