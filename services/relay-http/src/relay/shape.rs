use serde_json::Value;

use super::RelayError;

/// The product container layouts the catalog is known to return.
#[derive(Debug, PartialEq)]
pub enum UpstreamShape<'a> {
    /// `{"data": {"products": [...]}}`
    Nested(&'a [Value]),
    /// `{"products": [...]}`
    Flat(&'a [Value]),
    /// `null`, `{}` or `[]`
    Empty,
    /// Neither container holds any product; carries the top-level keys.
    Unrecognized(Vec<String>),
}

impl<'a> UpstreamShape<'a> {
    pub fn classify(envelope: &'a Value) -> Self {
        if is_empty(envelope) {
            return UpstreamShape::Empty;
        }

        let nested = envelope
            .get("data")
            .and_then(|data| data.get("products"))
            .and_then(Value::as_array);
        let flat = envelope.get("products").and_then(Value::as_array);

        // An empty products array counts as no match.
        match (nested, flat) {
            (Some(products), _) if !products.is_empty() => UpstreamShape::Nested(products),
            (_, Some(products)) if !products.is_empty() => UpstreamShape::Flat(products),
            _ => UpstreamShape::Unrecognized(top_level_keys(envelope)),
        }
    }

    /// The first product of a recognized container.
    pub fn first_product(self) -> Result<&'a Value, RelayError> {
        match self {
            UpstreamShape::Nested(products) | UpstreamShape::Flat(products) => products
                .first()
                .filter(|product| !is_empty(product))
                .ok_or_else(|| RelayError::NotFound("Product not found in response".into())),
            UpstreamShape::Empty => {
                Err(RelayError::NotFound("Empty response from upstream".into()))
            }
            UpstreamShape::Unrecognized(keys) => Err(RelayError::UnrecognizedShape { keys }),
        }
    }
}

pub fn resolve_product(envelope: &Value) -> Result<&Value, RelayError> {
    UpstreamShape::classify(envelope).first_product()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn top_level_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}
