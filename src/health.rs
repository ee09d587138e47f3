//! Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Readiness gates on the product store answering a ping.

use std::sync::Arc;

use tracing::warn;

use crate::handler::with_state;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;
use crate::store::SharedStore;

/// Registers `/healthz` and `/readyz` on `router`.
pub fn routes(router: Router, store: &SharedStore) -> Router {
    router
        .on(Method::Get, "/healthz", liveness)
        .on(Method::Get, "/readyz", with_state(Arc::clone(store), readiness))
}

/// Always `200 OK` with body `"ok"`. No dependencies.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"` while the store answers, `503` otherwise.
pub async fn readiness(store: SharedStore, _req: Request) -> Response {
    match store.ping().await {
        Ok(()) => Response::text("ready"),
        Err(e) => {
            warn!(error = %e, "store ping failed");
            Response::builder()
                .status(Status::ServiceUnavailable)
                .text("store unavailable")
        }
    }
}
