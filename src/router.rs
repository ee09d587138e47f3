//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup and hand it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use products_api::{Method, Request, Response, Router};
    /// # async fn get_product(_: Request) -> Response { Response::text("") }
    /// # async fn create_product(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,  "/products/{id}", get_product)
    ///     .on(Method::Post, "/products",      create_product);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Routes one buffered request and produces its response.
    ///
    /// Unknown paths get `404`; a path registered only under other methods
    /// gets `405` with an `allow` header.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_owned();

        let Ok(method) = Method::try_from(&parts.method) else {
            debug!(method = %parts.method, %path, "unroutable method");
            return not_found();
        };

        match self.lookup(method, &path) {
            Some((handler, params)) => {
                handler.call(Request::new(method, path, parts.headers, body, params)).await
            }
            None => {
                let allowed = self.allowed(&path);
                if allowed.is_empty() {
                    return not_found();
                }
                Response::builder()
                    .status(Status::MethodNotAllowed)
                    .header("allow", &allowed.join(", "))
                    .no_body()
            }
        }
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn allowed(&self, path: &str) -> Vec<&'static str> {
        Method::ALL.iter()
            .filter(|m| self.routes.get(*m).is_some_and(|tree| tree.at(path).is_ok()))
            .map(|m| m.as_str())
            .collect()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn not_found() -> Response {
    Response::builder()
        .status(Status::NotFound)
        .json(br#"{"error":{"code":"not_found","message":"no such route"}}"#.to_vec())
}
