//! products-api binary.
//!
//! Run with:
//!   PRODUCTS_STORE_URL=memory:// RUST_LOG=info cargo run
//!
//! Try:
//!   curl http://localhost:3001/products
//!   curl -X POST http://localhost:3001/products \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"iPhone","description":"Good phone","price":10000}'
//!   curl -X PUT http://localhost:3001/products/<id> -d '{"name":"macbook"}'
//!   curl -X DELETE http://localhost:3001/products/<id>
//!   curl http://localhost:3001/readyz

use std::process::ExitCode;

use products_api::{Config, Error, Server, app, store};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Structured logs filtered by `RUST_LOG`, `info` when unset.
fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    info!(listen = %config.listen_addr, store = ?config.store_url, "starting");

    let store = store::connect(&config.store_url).await?;
    Server::bind(config.listen_addr)
        .await?
        .max_body_bytes(config.max_body_bytes)
        .serve(app(store))
        .await
}
