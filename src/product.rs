//! The product resource and its validated inputs.
//!
//! Payloads are checked before they reach a store: [`NewProduct`] can only be
//! built with a non-empty name, and [`ProductPatch`] can never clear or blank
//! it. Stores therefore never see a record that would violate the schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::error::Category;
use serde_json::Value;

use crate::id::ObjectId;

/// A persisted product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Product {
    /// Materializes a validated payload under a freshly assigned id.
    pub fn create(id: ObjectId, new: NewProduct) -> Self {
        Self { id, name: new.name, description: new.description, price: new.price }
    }

    /// Merges `patch` into this record. Fields the patch does not mention
    /// are left alone; the id never changes.
    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A payload that parsed as JSON but does not fit the product schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("`{0}` is required")]
    Required(&'static str),

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("{0}")]
    Schema(String),
}

/// Why a request body could not become a product input.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed JSON body: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<serde_json::Error> for PayloadError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            // Well-formed JSON of the wrong shape, e.g. `{"name": 5}`.
            Category::Data => Self::Invalid(ValidationError::Schema(e.to_string())),
            Category::Io | Category::Syntax | Category::Eof => Self::Malformed(e.to_string()),
        }
    }
}

fn require_name(name: Option<String>) -> Result<String, ValidationError> {
    let name = name.ok_or(ValidationError::Required("name"))?;
    if name.trim().is_empty() {
        return Err(ValidationError::Empty("name"));
    }
    Ok(name)
}

fn parse<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(ValidationError::Schema("expected a JSON object".to_owned()).into());
    }
    Ok(T::deserialize(value)?)
}

// ── NewProduct ────────────────────────────────────────────────────────────────

/// Validated attributes for a product that does not exist yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewProduct {
    name: String,
    description: Option<String>,
    price: Option<f64>,
}

#[derive(Default, Deserialize)]
struct CreateBody {
    name: Option<String>,
    description: Option<String>,
    price: Option<f64>,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        price: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let name = require_name(Some(name.into()))?;
        Ok(Self { name, description, price })
    }

    /// Parses and validates a `POST /products` body. An empty body is
    /// treated as `{}` and so fails on the missing name.
    pub fn from_json(body: &[u8]) -> Result<Self, PayloadError> {
        let CreateBody { name, description, price } = parse(body)?;
        Ok(Self { name: require_name(name)?, description, price })
    }

    pub fn name(&self) -> &str { &self.name }
}

// ── ProductPatch ──────────────────────────────────────────────────────────────

/// A validated partial update.
///
/// `None` leaves a field untouched. For the optional fields,
/// `Some(None)` clears the stored value (sent as an explicit JSON `null`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductPatch {
    name: Option<String>,
    description: Option<Option<String>>,
    price: Option<Option<f64>>,
}

#[derive(Default, Deserialize)]
struct PatchBody {
    #[serde(default, deserialize_with = "present")]
    name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    price: Option<Option<f64>>,
}

/// Distinguishes a field sent as `null` (`Some(None)`) from an absent one
/// (`None`, via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProductPatch {
    pub fn new(
        name: Option<String>,
        description: Option<Option<String>>,
        price: Option<Option<f64>>,
    ) -> Result<Self, ValidationError> {
        let name = name.map(|n| require_name(Some(n))).transpose()?;
        Ok(Self { name, description, price })
    }

    /// Parses and validates a `PUT /products/{id}` body. An empty body is an
    /// empty patch.
    pub fn from_json(body: &[u8]) -> Result<Self, PayloadError> {
        let PatchBody { name, description, price } = parse(body)?;
        let name = match name {
            None => None,
            Some(None) => return Err(ValidationError::Required("name").into()),
            Some(Some(n)) => Some(require_name(Some(n))?),
        };
        Ok(Self { name, description, price })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }

    /// The new name, if the patch sets one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `Some(None)` when the patch clears the description.
    pub fn description(&self) -> Option<Option<&str>> {
        self.description.as_ref().map(Option::as_deref)
    }

    /// `Some(None)` when the patch clears the price.
    pub fn price(&self) -> Option<Option<f64>> {
        self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iphone() -> Product {
        Product::create(
            ObjectId::new(),
            NewProduct::new("iPhone", Some("Good phone".to_owned()), Some(10000.0)).unwrap(),
        )
    }

    #[test]
    fn create_requires_a_name() {
        let err = NewProduct::from_json(br#"{"description":"Good phone","price":10000}"#).unwrap_err();
        assert!(matches!(err, PayloadError::Invalid(ValidationError::Required("name"))));

        let err = NewProduct::from_json(br#"{"name":"   "}"#).unwrap_err();
        assert!(matches!(err, PayloadError::Invalid(ValidationError::Empty("name"))));

        let err = NewProduct::from_json(b"").unwrap_err();
        assert!(matches!(err, PayloadError::Invalid(ValidationError::Required("name"))));
    }

    #[test]
    fn create_rejects_wrong_types_as_invalid() {
        let err = NewProduct::from_json(br#"{"name":"iPhone","price":"cheap"}"#).unwrap_err();
        assert!(matches!(err, PayloadError::Invalid(ValidationError::Schema(_))));

        let err = NewProduct::from_json(br#"["iPhone", null, null]"#).unwrap_err();
        assert!(matches!(err, PayloadError::Invalid(ValidationError::Schema(_))));
    }

    #[test]
    fn create_rejects_broken_json_as_malformed() {
        let err = NewProduct::from_json(br#"{"name":"iPh"#).unwrap_err();
        assert!(matches!(err, PayloadError::Malformed(_)));
    }

    #[test]
    fn create_ignores_unknown_fields() {
        let new = NewProduct::from_json(br#"{"name":"iPhone","color":"red"}"#).unwrap();
        assert_eq!(new.name(), "iPhone");
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let mut product = iphone();
        let id = product.id;

        product.apply(ProductPatch::from_json(br#"{"name":"macbook"}"#).unwrap());

        assert_eq!(product.id, id);
        assert_eq!(product.name, "macbook");
        assert_eq!(product.description.as_deref(), Some("Good phone"));
        assert_eq!(product.price, Some(10000.0));
    }

    #[test]
    fn patch_null_clears_optional_fields() {
        let mut product = iphone();

        product.apply(ProductPatch::from_json(br#"{"price":null}"#).unwrap());

        assert_eq!(product.price, None);
        assert_eq!(product.description.as_deref(), Some("Good phone"));
    }

    #[test]
    fn patch_cannot_remove_the_name() {
        for body in [&br#"{"name":null}"#[..], br#"{"name":""}"#] {
            assert!(matches!(
                ProductPatch::from_json(body),
                Err(PayloadError::Invalid(_))
            ));
        }
    }

    #[test]
    fn empty_patch_body_changes_nothing() {
        let patch = ProductPatch::from_json(b"").unwrap();
        assert!(patch.is_empty());
        assert_eq!((patch.name(), patch.description(), patch.price()), (None, None, None));
    }

    #[test]
    fn patch_tells_cleared_fields_from_untouched_ones() {
        let patch = ProductPatch::from_json(br#"{"name":"x","description":null}"#).unwrap();

        assert_eq!(patch.name(), Some("x"));
        assert_eq!(patch.description(), Some(None));
        assert_eq!(patch.price(), None);
    }

    #[test]
    fn product_serializes_id_as_underscore_id() {
        let product = iphone();
        let json: Value = serde_json::to_value(&product).unwrap();

        assert_eq!(json["_id"], Value::from(product.id.to_string()));
        assert_eq!(json["name"], "iPhone");
        assert_eq!(json["price"], 10000.0);
    }
}
