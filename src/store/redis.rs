//! Redis-backed store.
//!
//! Layout:
//!
//! ```text
//! products:<id>     HASH    name, description?, price?
//! products:index    ZSET    every id, score 0, so ZRANGE yields id order
//! ```
//!
//! Each product is a hash so an update writes only the fields it names;
//! untouched fields are never read back and rewritten. Prices are stored in
//! Rust's shortest round-trip decimal form and parse back to the same `f64`.
//!
//! Multi-step operations run server-side (a MULTI pipeline for create, Lua
//! scripts for update and delete), so each call is atomic even with many
//! service instances sharing one Redis.

use std::collections::HashMap;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client, Script};
use async_trait::async_trait;

use super::{ProductStore, StoreError, parse_id};
use crate::id::ObjectId;
use crate::product::{NewProduct, Product, ProductPatch};

const KEY_PREFIX: &str = "products:";
const INDEX_KEY: &str = "products:index";

/// KEYS[1] product hash. ARGV[1] is the number N of fields to set, followed
/// by N field/value pairs, then the names of fields to remove. Returns the
/// merged hash, or nil when the product does not exist.
const UPDATE_LUA: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return false
end
local sets = tonumber(ARGV[1])
for i = 2, 1 + sets * 2, 2 do
  redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
end
for i = 2 + sets * 2, #ARGV do
  redis.call('HDEL', KEYS[1], ARGV[i])
end
return redis.call('HGETALL', KEYS[1])
";

/// KEYS[1] product hash, KEYS[2] index. ARGV[1] id. Returns 1 if deleted.
const DELETE_LUA: &str = r"
if redis.call('DEL', KEYS[1]) == 0 then
  return 0
end
redis.call('ZREM', KEYS[2], ARGV[1])
return 1
";

pub struct RedisStore {
    conn: MultiplexedConnection,
    update: Script,
    delete: Script,
}

fn key(id: &ObjectId) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// The hash fields of a stored product. Absent optional fields are omitted.
fn fields(product: &Product) -> Vec<(&'static str, String)> {
    let mut fields = vec![("name", product.name.clone())];
    if let Some(description) = &product.description {
        fields.push(("description", description.clone()));
    }
    if let Some(price) = product.price {
        fields.push(("price", price.to_string()));
    }
    fields
}

/// Splits a patch into fields to set and fields to remove.
fn changes(patch: &ProductPatch) -> (Vec<(&'static str, String)>, Vec<&'static str>) {
    let mut set = Vec::new();
    let mut remove = Vec::new();
    if let Some(name) = patch.name() {
        set.push(("name", name.to_owned()));
    }
    match patch.description() {
        Some(Some(description)) => set.push(("description", description.to_owned())),
        Some(None) => remove.push("description"),
        None => {}
    }
    match patch.price() {
        Some(Some(price)) => set.push(("price", price.to_string())),
        Some(None) => remove.push("price"),
        None => {}
    }
    (set, remove)
}

fn decode(key: &str, id: ObjectId, mut hash: HashMap<String, String>) -> Result<Product, StoreError> {
    let corrupt = |detail: String| StoreError::Corrupt { key: key.to_owned(), detail };

    let name = hash.remove("name").ok_or_else(|| corrupt("missing `name`".to_owned()))?;
    let price = hash
        .remove("price")
        .map(|p| p.parse::<f64>())
        .transpose()
        .map_err(|e| corrupt(format!("bad `price`: {e}")))?;

    Ok(Product { id, name, description: hash.remove("description"), price })
}

impl RedisStore {
    /// Opens one multiplexed connection; clones of it are shared by all
    /// requests.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            update: Script::new(UPDATE_LUA),
            delete: Script::new(DELETE_LUA),
        })
    }
}

#[async_trait]
impl ProductStore for RedisStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let product = Product::create(ObjectId::new(), product);

        let mut conn = self.conn.clone();
        let _: () = ::redis::pipe()
            .atomic()
            .hset_multiple(key(&product.id), &fields(&product)).ignore()
            .zadd(INDEX_KEY, product.id.to_string(), 0).ignore()
            .query_async(&mut conn)
            .await?;
        Ok(product)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrange(INDEX_KEY, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = ::redis::pipe();
        for id in &ids {
            pipe.hgetall(format!("{KEY_PREFIX}{id}"));
        }
        let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        let mut products = Vec::with_capacity(ids.len());
        for (id, hash) in ids.iter().zip(hashes) {
            // Deleted between ZRANGE and HGETALL.
            if hash.is_empty() {
                continue;
            }
            let key = format!("{KEY_PREFIX}{id}");
            let id = id.parse::<ObjectId>().map_err(|e| StoreError::Corrupt {
                key: INDEX_KEY.to_owned(),
                detail: e.to_string(),
            })?;
            products.push(decode(&key, id, hash)?);
        }
        Ok(products)
    }

    async fn get(&self, id: &str) -> Result<Product, StoreError> {
        let id = parse_id(id)?;
        let key = key(&id);
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn.hgetall(&key).await?;
        if hash.is_empty() {
            return Err(StoreError::NotFound);
        }
        decode(&key, id, hash)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        let id = parse_id(id)?;
        let key = key(&id);
        let (set, remove) = changes(&patch);

        let mut invocation = self.update.prepare_invoke();
        invocation.key(&key).arg(set.len());
        for (field, value) in &set {
            invocation.arg(*field).arg(value);
        }
        for field in &remove {
            invocation.arg(*field);
        }

        let mut conn = self.conn.clone();
        let merged: Option<HashMap<String, String>> = invocation.invoke_async(&mut conn).await?;
        decode(&key, id, merged.ok_or(StoreError::NotFound)?)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = parse_id(id)?;
        let mut conn = self.conn.clone();
        let deleted: i64 = self.delete
            .key(key(&id))
            .key(INDEX_KEY)
            .arg(id.to_string())
            .invoke_async(&mut conn)
            .await?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
