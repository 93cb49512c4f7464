//! Domain module - product records and catalog identifiers
//!
//! Pure types with no I/O. Everything that talks to the storefront,
//! the cache database or a notification channel lives in `infrastructure`.

pub mod product;
pub mod product_id;

pub use product::{ProductRecord, ProductSummary, SizeAvailability, SizeStock};
pub use product_id::{normalize_pid, pid_range, product_id};
