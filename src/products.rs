//! `/products` routes.
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/products` | 200, array | 500 |
//! | POST | `/products` | 201, product + `location` | 400 |
//! | GET | `/products/{id}` | 200, product | 404 |
//! | PUT | `/products/{id}` | 200, merged product | 400, 404 |
//! | DELETE | `/products/{id}` | 204, empty | 404 |
//!
//! Malformed ids are reported as 404, the same as ids that do not exist.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use crate::handler::with_state;
use crate::id::ObjectId;
use crate::method::Method;
use crate::product::{NewProduct, PayloadError, ProductPatch};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;
use crate::status::Status;
use crate::store::{SharedStore, StoreError};

/// Registers the product routes on `router`, each bound to `store`.
pub fn routes(router: Router, store: &SharedStore) -> Router {
    router
        .on(Method::Get,    "/products",      with_state(Arc::clone(store), list))
        .on(Method::Post,   "/products",      with_state(Arc::clone(store), create))
        .on(Method::Get,    "/products/{id}", with_state(Arc::clone(store), get))
        .on(Method::Put,    "/products/{id}", with_state(Arc::clone(store), update))
        .on(Method::Delete, "/products/{id}", with_state(Arc::clone(store), delete))
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Everything a product route can fail with, mapped one-to-one onto a status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("product `{0}` not found")]
    NotFound(String),

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("response encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// Maps a failed lookup of `id`; `NotFound` is the only client error.
    fn from_store(id: &str, e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound(id.to_owned()),
            other => Self::Store(other),
        }
    }

    fn status(&self) -> Status {
        match self {
            Self::Payload(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Store(_) | Self::Encode(_) => Status::InternalServerError,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Payload(PayloadError::Malformed(_)) => "malformed_body",
            Self::Payload(PayloadError::Invalid(_)) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Store(_) | Self::Encode(_) => "internal",
        }
    }
}

/// Error body: `{"error": {"code": …, "message": …}}`. Server faults are
/// logged here and answered with a generic message.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self.status() {
            Status::InternalServerError => {
                error!(error = %self, "product request failed");
                "internal server error".to_owned()
            }
            _ => self.to_string(),
        };

        let body = json!({ "error": { "code": self.code(), "message": message } });
        Response::builder()
            .status(self.status())
            .json(body.to_string().into_bytes())
    }
}

fn json<T: Serialize>(status: Status, value: &T) -> Result<Response, ApiError> {
    let bytes = serde_json::to_vec(value)?;
    Ok(Response::builder().status(status).json(bytes))
}

fn path_id(req: &Request) -> &str {
    req.param("id").unwrap_or_default()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

// GET /products
async fn list(store: SharedStore, _req: Request) -> Result<Response, ApiError> {
    let products = store.list().await.map_err(ApiError::Store)?;
    json(Status::Ok, &products)
}

// POST /products
async fn create(store: SharedStore, req: Request) -> Result<Response, ApiError> {
    let new = NewProduct::from_json(req.body()).inspect_err(|e| debug!(error = %e, "rejected product"))?;
    let product = store.create(new).await.map_err(ApiError::Store)?;
    debug!(id = %product.id, "product created");

    let bytes = serde_json::to_vec(&product)?;
    Ok(Response::builder()
        .status(Status::Created)
        .header("location", &format!("/products/{}", product.id))
        .json(bytes))
}

// GET /products/{id}
async fn get(store: SharedStore, req: Request) -> Result<Response, ApiError> {
    let id = path_id(&req);
    let product = store.get(id).await.map_err(|e| ApiError::from_store(id, e))?;
    json(Status::Ok, &product)
}

// PUT /products/{id}
//
// A malformed id is a 404 even when the body is also invalid.
async fn update(store: SharedStore, req: Request) -> Result<Response, ApiError> {
    let id = path_id(&req);
    if id.parse::<ObjectId>().is_err() {
        return Err(ApiError::NotFound(id.to_owned()));
    }

    let patch = ProductPatch::from_json(req.body())?;
    let product = store.update(id, patch).await.map_err(|e| ApiError::from_store(id, e))?;
    json(Status::Ok, &product)
}

// DELETE /products/{id} → 204 No Content
async fn delete(store: SharedStore, req: Request) -> Result<Status, ApiError> {
    let id = path_id(&req);
    store.delete(id).await.map_err(|e| ApiError::from_store(id, e))?;
    debug!(%id, "product deleted");
    Ok(Status::NoContent)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::product::{Product, ValidationError};
    use crate::store::ProductStore;

    /// Answers every call with `NotFound`, which only keyed lookups may
    /// legitimately return.
    struct NothingStore;

    #[async_trait]
    impl ProductStore for NothingStore {
        async fn create(&self, _: NewProduct) -> Result<Product, StoreError> { Err(StoreError::NotFound) }
        async fn list(&self) -> Result<Vec<Product>, StoreError> { Err(StoreError::NotFound) }
        async fn get(&self, _: &str) -> Result<Product, StoreError> { Err(StoreError::NotFound) }
        async fn update(&self, _: &str, _: ProductPatch) -> Result<Product, StoreError> { Err(StoreError::NotFound) }
        async fn delete(&self, _: &str) -> Result<(), StoreError> { Err(StoreError::NotFound) }
        async fn ping(&self) -> Result<(), StoreError> { Ok(()) }
    }

    fn body(res: &Response) -> serde_json::Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[test]
    fn not_found_maps_to_404_with_code() {
        let res = ApiError::from_store("abc", StoreError::NotFound).into_response();

        assert_eq!(res.status_code(), 404);
        assert_eq!(body(&res)["error"]["code"], "not_found");
        assert_eq!(body(&res)["error"]["message"], "product `abc` not found");
    }

    #[test]
    fn validation_maps_to_400() {
        let err = ApiError::from(PayloadError::from(ValidationError::Required("name")));
        let res = err.into_response();

        assert_eq!(res.status_code(), 400);
        assert_eq!(body(&res)["error"]["code"], "validation_failed");
        assert_eq!(body(&res)["error"]["message"], "`name` is required");
    }

    #[test]
    fn malformed_body_maps_to_400() {
        let res = ApiError::from(PayloadError::Malformed("eof".to_owned())).into_response();

        assert_eq!(res.status_code(), 400);
        assert_eq!(body(&res)["error"]["code"], "malformed_body");
    }

    #[test]
    fn server_faults_hide_details() {
        let err = ApiError::Store(StoreError::Corrupt {
            key: "products:secret".to_owned(),
            detail: "missing `name`".to_owned(),
        });
        let res = err.into_response();

        assert_eq!(res.status_code(), 500);
        assert_eq!(body(&res)["error"]["code"], "internal");
        assert_eq!(body(&res)["error"]["message"], "internal server error");
        assert!(!String::from_utf8_lossy(res.body()).contains("secret"));
    }

    #[tokio::test]
    async fn unkeyed_store_failures_are_server_faults() {
        let store: SharedStore = Arc::new(NothingStore);
        let router = routes(Router::new(), &store);

        let list = http::Request::get("/products").body(bytes::Bytes::new()).unwrap();
        let res = router.handle(list).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(body(&res)["error"]["code"], "internal");

        let create = http::Request::post("/products")
            .body(bytes::Bytes::from_static(br#"{"name":"iPhone"}"#))
            .unwrap();
        let res = router.handle(create).await;
        assert_eq!(res.status_code(), 500);
        assert!(!String::from_utf8_lossy(res.body()).contains("``"));
    }
}
