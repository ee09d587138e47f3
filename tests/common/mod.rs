//! Shared `/products` test client, driven in-process through the router.

#![allow(dead_code)]

use bytes::Bytes;
use products_api::store::SharedStore;
use products_api::{Response, Router, app};
use serde_json::{Value, json};

pub const ABSENT_ID: &str = "123456123456123456123456";

pub struct Client {
    pub app: Router,
}

impl Client {
    pub fn new(store: SharedStore) -> Self {
        Self { app: app(store) }
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
        let body = body.map_or_else(Bytes::new, |v| Bytes::from(v.to_string()));
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        self.app.handle(req).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Option<Value>) -> Response {
        self.send("PUT", uri, body).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send("DELETE", uri, None).await
    }

    /// Creates `body` and returns its id.
    pub async fn create(&self, body: Value) -> String {
        let res = self.post("/products", body).await;
        assert_eq!(res.status_code(), 201);
        json_body(&res)["_id"].as_str().unwrap().to_owned()
    }

    /// Creates the canonical valid product and returns its id.
    pub async fn seed(&self) -> String {
        self.create(valid_product()).await
    }
}

pub fn valid_product() -> Value {
    json!({ "name": "iPhone", "description": "Good phone", "price": 10000 })
}

pub fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}
