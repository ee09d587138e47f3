//! # products-api
//!
//! A JSON CRUD service for a single `product` resource, backed by a
//! document store.
//!
//! ## Surface
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/products` | 200, array | — |
//! | POST | `/products` | 201, product with `_id` | 400 |
//! | GET | `/products/{id}` | 200, product | 404 |
//! | PUT | `/products/{id}` | 200, merged product | 400, 404 |
//! | DELETE | `/products/{id}` | 204 | 404 |
//! | GET | `/healthz`, `/readyz` | 200 | 503 (readyz) |
//!
//! ## Layers
//!
//! - [`Router`] / [`Handler`] / [`Server`]: radix-tree routing via
//!   [`matchit`], hyper connections, graceful shutdown on SIGTERM / Ctrl-C.
//! - [`store`]: the [`ProductStore`](store::ProductStore) seam with an
//!   in-memory and a Redis backend.
//! - [`products`]: route handlers and the error-to-status mapping.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use products_api::{Config, Server, app, store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), products_api::Error> {
//!     let config = Config::from_env()?;
//!     let store = store::connect(&config.store_url).await?;
//!
//!     Server::bind(config.listen_addr).await?.serve(app(store)).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod config;
pub mod health;
pub mod id;
pub mod product;
pub mod products;
pub mod store;

pub use config::Config;
pub use error::Error;
pub use handler::{Handler, with_state};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;

/// The full application: product routes plus health probes, all sharing
/// one store handle.
pub fn app(store: store::SharedStore) -> Router {
    let router = products::routes(Router::new(), &store);
    health::routes(router, &store)
}
