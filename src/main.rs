use rides::config::Config;
use rides::db::PgStore;
use rides::engine::Engine;
use rides::error::Error;
use rides::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let store = PgStore::new(&config.database_url, config.max_connections).await?;
    let engine = Engine::new(store, config.pricing);

    serve(engine, config.listen_addr).await
}
