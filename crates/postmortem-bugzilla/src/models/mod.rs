pub mod comment;
pub mod product;

pub use comment::*;
pub use product::*;

use crate::record::{Materialize, Record};
use serde_json::Value;

/// Build the field tables, including the product list converters, up front.
///
/// Safe to call any number of times from any thread; tables are built once
/// and later calls are no-ops. Models also build their table lazily, so
/// calling this is only needed to keep that work out of the first request.
pub fn register_list_converters() {
    Product::fields();
    ProductComponent::fields();
    ProductVersion::fields();
    Comment::fields();
}

/// Products from a `{"products": [...]}` tracker response.
pub fn products_from_response(response: &Record) -> Vec<Product> {
    response
        .get("products")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Product::from_value).collect())
        .unwrap_or_default()
}
