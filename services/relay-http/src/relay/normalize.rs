use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NAME_PLACEHOLDER: &str = "Name not specified";
pub const BRAND_PLACEHOLDER: &str = "Brand not specified";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: u64,
    pub name: String,
    pub brand: String,
    /// Price in minor currency units.
    pub price: i64,
    pub rating: f64,
    #[serde(rename = "feedbacks")]
    pub feedback_count: u64,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub warehouse_id: u64,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProduct {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub basic_price: i64,
    pub sale_price: i64,
    /// Percentage off the basic price, one decimal place.
    pub discount: f64,
    pub warehouses: Vec<WarehouseStock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<SupplierInfo>,
}

impl ProductSummary {
    /// Map a single upstream product object. Absent fields take their
    /// documented defaults; `requested_id` stands in for a missing `id`.
    pub fn from_product(product: &Value, requested_id: u64) -> Self {
        Self {
            id: u64_at(product, "/id").unwrap_or(requested_id),
            name: string_at(product, "/name").unwrap_or_else(|| NAME_PLACEHOLDER.to_string()),
            brand: string_at(product, "/brand").unwrap_or_else(|| BRAND_PLACEHOLDER.to_string()),
            price: i64_at(product, "/salePriceU")
                .or_else(|| i64_at(product, "/sizes/0/price/product"))
                .unwrap_or(0),
            rating: f64_at(product, "/rating")
                .or_else(|| f64_at(product, "/reviewRating"))
                .unwrap_or(0.0),
            feedback_count: u64_at(product, "/feedbacks").unwrap_or(0),
            quantity: u64_at(product, "/totalQuantity").unwrap_or(0),
        }
    }
}

impl ExtendedProduct {
    pub fn from_product(product: &Value, requested_id: u64) -> Self {
        let summary = ProductSummary::from_product(product, requested_id);

        let basic_price = i64_at(product, "/sizes/0/price/basic")
            .or_else(|| i64_at(product, "/priceU"))
            .unwrap_or(0);
        let sale_price = i64_at(product, "/sizes/0/price/product")
            .or_else(|| i64_at(product, "/salePriceU"))
            .unwrap_or(0);

        Self {
            summary,
            basic_price,
            sale_price,
            discount: discount_percent(basic_price, sale_price),
            warehouses: first_size_stocks(product),
            supplier: supplier_info(product),
        }
    }
}

/// Discount of `sale` relative to `basic`, rounded to one decimal.
/// A zero basic price yields no discount.
pub fn discount_percent(basic: i64, sale: i64) -> f64 {
    if basic <= 0 {
        return 0.0;
    }

    let percent = (basic - sale) as f64 / basic as f64 * 100.0;
    ((percent * 10.0).round() / 10.0).max(0.0)
}

// Only the first size variant carries the stock layout shown to clients.
fn first_size_stocks(product: &Value) -> Vec<WarehouseStock> {
    product
        .pointer("/sizes/0/stocks")
        .and_then(Value::as_array)
        .map(|stocks| {
            stocks
                .iter()
                .filter_map(|stock| {
                    Some(WarehouseStock {
                        warehouse_id: u64_at(stock, "/wh")?,
                        quantity: u64_at(stock, "/qty").unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn supplier_info(product: &Value) -> Option<SupplierInfo> {
    let info = SupplierInfo {
        id: u64_at(product, "/supplierId"),
        name: string_at(product, "/supplier"),
        rating: f64_at(product, "/supplierRating"),
    };

    (info.id.is_some() || info.name.is_some() || info.rating.is_some()).then_some(info)
}

fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    let field = value.pointer(pointer)?;
    field
        .as_u64()
        .or_else(|| field.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
}

fn i64_at(value: &Value, pointer: &str) -> Option<i64> {
    let field = value.pointer(pointer)?;
    field.as_i64().or_else(|| field.as_f64().map(|n| n as i64))
}

fn f64_at(value: &Value, pointer: &str) -> Option<f64> {
    value.pointer(pointer)?.as_f64()
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer)?.as_str().map(str::to_string)
}
