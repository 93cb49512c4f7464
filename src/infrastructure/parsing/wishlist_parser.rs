//! Wishlist-GetProduct (detail endpoint) parser
//!
//! The endpoint returns the product as JSON, including every variation
//! attribute. Sizes are taken from the `size` attribute only.

use super::{ParsingError, ParsingResult, ProductParser, parse_catalog_date};
use crate::domain::{ProductRecord, ProductSummary, SizeAvailability, SizeStock};
use serde::Deserialize;
use serde_json::Value;

const ENDPOINT: &str = "Wishlist-GetProduct";

#[derive(Debug, Deserialize)]
struct WishlistResponse {
    product: WishlistProduct,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WishlistProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    creation_date: String,
    #[serde(default)]
    images: Option<Value>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    variation_attributes: Vec<VariationAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariationAttribute {
    attribute_id: String,
    #[serde(default)]
    values: Vec<Value>,
}

/// Entry of the `size` attribute; other attributes carry different keys
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizeValue {
    display_value: String,
    #[serde(rename = "productID")]
    product_id: String,
    #[serde(default)]
    selectable: bool,
}

/// Parser for the JSON detail endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct WishlistParser;

impl WishlistParser {
    pub fn new() -> Self {
        Self
    }

    fn sizes(attributes: Vec<VariationAttribute>) -> ParsingResult<SizeAvailability> {
        let mut sizes = SizeAvailability::new();
        for value in attributes
            .into_iter()
            .filter(|attribute| attribute.attribute_id == "size")
            .flat_map(|attribute| attribute.values)
        {
            let size: SizeValue =
                serde_json::from_value(value).map_err(|e| ParsingError::UnexpectedShape {
                    endpoint: ENDPOINT,
                    message: format!("size entry: {e}"),
                })?;
            sizes.insert(
                size.display_value,
                SizeStock {
                    checkout_id: size.product_id,
                    in_stock: size.selectable,
                },
            );
        }
        Ok(sizes)
    }
}

impl ProductParser for WishlistParser {
    fn parse(&self, pid: &str, body: Value) -> ParsingResult<ProductRecord> {
        let response: WishlistResponse =
            serde_json::from_value(body).map_err(|e| ParsingError::UnexpectedShape {
                endpoint: ENDPOINT,
                message: e.to_string(),
            })?;
        let product = response.product;

        let created_date = parse_catalog_date("creationDate", &product.creation_date)?;

        // Best resolution first; products without pictures simply omit it
        let image_url = product
            .images
            .as_ref()
            .and_then(|images| images.pointer("/hi-res/0/absURL"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let price = product
            .price
            .as_ref()
            .and_then(|price| price.pointer("/sales/formatted"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let sizes = Self::sizes(product.variation_attributes)?;

        let summary = ProductSummary {
            id: pid.to_string(),
            name: product.product_name.unwrap_or_default(),
            brand: product.brand.unwrap_or_default(),
            created_date,
            price,
            image_url,
        };

        Ok(ProductRecord::from_detail(summary, sizes))
    }
}
