use std::env;
use std::sync::Arc;

use rides::api::DynAPI;
use rides::config::{Config, Pricing};
use rides::db::{MemoryStore, PgStore};
use rides::engine::Engine;
use rides::error::Error;
use rides::simulation::{verify_invariants, Executor, Settings};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::default();

    // runs against postgres when one is configured, in memory otherwise
    if env::var("DATABASE_URL").is_ok() {
        let config = Config::from_env()?;
        let store = PgStore::new(&config.database_url, config.max_connections).await?;
        let api = Arc::new(Engine::new(store, config.pricing)) as DynAPI;

        let report = Executor::new(api, settings)?.run().await?;
        tracing::info!(?report, "postgres simulation finished");

        return Ok(());
    }

    let pricing = Pricing::from_env()?;
    let store = Arc::new(MemoryStore::new());
    let api = Arc::new(Engine::new(store.clone(), pricing)) as DynAPI;

    let report = Executor::new(api, settings)?.run().await?;
    verify_invariants(&store.rides().await, pricing.base_fare)?;

    tracing::info!(?report, "in-memory simulation finished, invariants hold");

    Ok(())
}
