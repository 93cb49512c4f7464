//! Outcome classification for a single storefront request

use crate::infrastructure::parsing_error::ParsingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The storefront answered with a status from the stop set
    #[error("product not found (HTTP {status})")]
    NotFound { status: u16 },

    /// The storefront answered, but not with a product
    #[error("response is not a product: {0}")]
    Unparseable(#[from] ParsingError),

    /// Timeout, connection failure, unexpected status or body; worth retrying
    #[error("transient failure: {0}")]
    Transient(String),
}
