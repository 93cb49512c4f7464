//! Parsing error types for storefront responses
//!
//! A parsing error means the response arrived but did not have the shape
//! of a product. The fetcher treats that the same as a missing product,
//! while keeping the reason available for logs.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in {endpoint} response")]
    RequiredFieldMissing {
        field: String,
        endpoint: &'static str,
    },

    #[error("Invalid date '{value}' in field '{field}'")]
    InvalidDate { field: String, value: String },

    #[error("Unexpected {endpoint} response shape: {message}")]
    UnexpectedShape {
        endpoint: &'static str,
        message: String,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Structured data block is not valid JSON: {message}")]
    InvalidStructuredData { message: String },
}

impl ParsingError {
    pub fn required_field_missing(field: &str, endpoint: &'static str) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            endpoint,
        }
    }

    pub fn invalid_date(field: &str, value: &str) -> Self {
        Self::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
