//! Response parsers for the two storefront endpoints
//!
//! Both endpoints answer with JSON. The detail endpoint carries the product
//! directly, the quick-view endpoint wraps an HTML fragment that has to be
//! scraped. Each parser turns one body into a normalized `ProductRecord`.

pub mod error;
pub mod quick_view_parser;
pub mod wishlist_parser;

pub use error::{ParsingError, ParsingResult};
pub use quick_view_parser::QuickViewParser;
pub use wishlist_parser::WishlistParser;

use crate::domain::ProductRecord;
use chrono::NaiveDate;

/// Parser for one endpoint's response body
pub trait ProductParser: Send + Sync {
    fn parse(&self, pid: &str, body: serde_json::Value) -> ParsingResult<ProductRecord>;
}

/// Catalog dates are `YYYY-MM-DD`, optionally followed by a `T` time part
pub(crate) fn parse_catalog_date(field: &str, value: &str) -> ParsingResult<NaiveDate> {
    let date_part = value.split('T').next().unwrap_or(value).trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| ParsingError::invalid_date(field, value))
}
