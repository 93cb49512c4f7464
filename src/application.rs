//! Application layer module
//!
//! Fetch strategy, cache reconciliation, range sweeps and scheduling,
//! built on the infrastructure seams.

pub mod clock;
pub mod context;
pub mod lookup;
pub mod product_fetcher;
pub mod product_service;
pub mod range_monitor;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{Components, MonitorContext};
pub use lookup::lookup_product;
pub use product_fetcher::{EndpointCursor, FetchOutcome, ProductFetcher, RetryPolicy};
pub use product_service::ProductService;
pub use range_monitor::{CheckOutcome, MonitorSettings, RangeMonitor, SweepReport};
pub use scheduler::{MonitorScheduler, SchedulerState, next_sweep_delay};
