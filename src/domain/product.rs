//! Product records normalized from the two storefront endpoints
//!
//! A record is either detail-sourced (Wishlist-GetProduct, carries size
//! availability) or quick-view-sourced (Product-ShowQuickView, never does).
//! The two constructors are the only way to build one, and deserialization
//! re-checks the same invariant so a cached payload cannot violate it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Checkout id and stock flag for one size variation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock {
    pub checkout_id: String,
    pub in_stock: bool,
}

/// Size label -> stock mapping, kept in catalog order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeAvailability(Vec<(String, SizeStock)>);

impl SizeAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a size. A repeated label keeps its first position and takes the new stock.
    pub fn insert(&mut self, label: impl Into<String>, stock: SizeStock) {
        let label = label.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = stock,
            None => self.0.push((label, stock)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&SizeStock> {
        self.0
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, stock)| stock)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SizeStock)> {
        self.0.iter().map(|(label, stock)| (label.as_str(), stock))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, SizeStock)> for SizeAvailability {
    fn from_iter<T: IntoIterator<Item = (L, SizeStock)>>(iter: T) -> Self {
        let mut sizes = Self::new();
        for (label, stock) in iter {
            sizes.insert(label, stock);
        }
        sizes
    }
}

/// Fields both endpoints provide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub created_date: NaiveDate,
    pub price: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("product {pid} carries size data but was not sourced from the detail endpoint")]
pub struct InconsistentProduct {
    pub pid: String,
}

/// Immutable product record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProductRecordRepr", into = "ProductRecordRepr")]
pub struct ProductRecord {
    id: String,
    name: String,
    brand: String,
    created_date: NaiveDate,
    price: Option<String>,
    image_url: Option<String>,
    size_availability: Option<SizeAvailability>,
    sourced_from_detail_endpoint: bool,
}

impl ProductRecord {
    /// Record obtained from the detail (wishlist) endpoint
    pub fn from_detail(summary: ProductSummary, sizes: SizeAvailability) -> Self {
        Self::assemble(summary, Some(sizes), true)
    }

    /// Record obtained from the quick-view endpoint, which has no size data
    pub fn from_quick_view(summary: ProductSummary) -> Self {
        Self::assemble(summary, None, false)
    }

    fn assemble(summary: ProductSummary, sizes: Option<SizeAvailability>, detail: bool) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            brand: summary.brand,
            created_date: summary.created_date,
            price: summary.price,
            image_url: summary.image_url,
            size_availability: sizes,
            sourced_from_detail_endpoint: detail,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created_date
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn size_availability(&self) -> Option<&SizeAvailability> {
        self.size_availability.as_ref()
    }

    pub fn sourced_from_detail_endpoint(&self) -> bool {
        self.sourced_from_detail_endpoint
    }

    /// Whole days between the catalog creation date and `today`.
    /// Negative when the catalog reports a date in the future.
    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.created_date).num_days()
    }

    /// True when the product was created at most `window_days` days before `today`
    pub fn is_fresh(&self, today: NaiveDate, window_days: i64) -> bool {
        self.age_in_days(today) <= window_days
    }
}

/// Serialized shape of a record
#[derive(Serialize, Deserialize)]
struct ProductRecordRepr {
    id: String,
    name: String,
    brand: String,
    created_date: NaiveDate,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    size_availability: Option<SizeAvailability>,
    sourced_from_detail_endpoint: bool,
}

impl TryFrom<ProductRecordRepr> for ProductRecord {
    type Error = InconsistentProduct;

    fn try_from(repr: ProductRecordRepr) -> Result<Self, Self::Error> {
        if repr.size_availability.is_some() && !repr.sourced_from_detail_endpoint {
            return Err(InconsistentProduct { pid: repr.id });
        }

        Ok(Self {
            id: repr.id,
            name: repr.name,
            brand: repr.brand,
            created_date: repr.created_date,
            price: repr.price,
            image_url: repr.image_url,
            size_availability: repr.size_availability,
            sourced_from_detail_endpoint: repr.sourced_from_detail_endpoint,
        })
    }
}

impl From<ProductRecord> for ProductRecordRepr {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            brand: record.brand,
            created_date: record.created_date,
            price: record.price,
            image_url: record.image_url,
            size_availability: record.size_availability,
            sourced_from_detail_endpoint: record.sourced_from_detail_endpoint,
        }
    }
}
