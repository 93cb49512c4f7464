//! Storefront product endpoints
//!
//! [`ProductSource`] is the seam between the fetcher's retry logic and the
//! network. [`SlamJamApi`] is the real implementation: it builds the
//! endpoint URL, performs one request and hands the body to the parser
//! matching the endpoint.

use crate::domain::ProductRecord;
use crate::infrastructure::config::slamjam;
use crate::infrastructure::fetch_error::FetchError;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::{ProductParser, QuickViewParser, WishlistParser};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// The two product endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `Wishlist-GetProduct`: JSON, includes sizes
    Detail,
    /// `Product-ShowQuickView`: HTML fragment, no sizes
    QuickView,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Detail => slamjam::WISHLIST_GET_PRODUCT,
            Self::QuickView => slamjam::PRODUCT_SHOW_QUICK_VIEW,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Detail => Self::QuickView,
            Self::QuickView => Self::Detail,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One request to one endpoint for one product
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch(&self, endpoint: Endpoint, pid: &str) -> Result<ProductRecord, FetchError>;
}

/// The live storefront
pub struct SlamJamApi {
    base_url: Url,
    client: Arc<HttpClient>,
    wishlist: WishlistParser,
    quick_view: QuickViewParser,
}

impl SlamJamApi {
    pub fn new(base_url: &str, client: Arc<HttpClient>) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;
        // Endpoint names are joined as a final path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            client,
            wishlist: WishlistParser::new(),
            quick_view: QuickViewParser::new().context("Failed to compile quick view selectors")?,
        })
    }

    pub fn endpoint_url(&self, endpoint: Endpoint, pid: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join(endpoint.path())
            .with_context(|| format!("Failed to build {endpoint} URL"))?;
        url.query_pairs_mut().append_pair(slamjam::PID_PARAM, pid);
        Ok(url)
    }

    fn parser(&self, endpoint: Endpoint) -> &dyn ProductParser {
        match endpoint {
            Endpoint::Detail => &self.wishlist,
            Endpoint::QuickView => &self.quick_view,
        }
    }
}

#[async_trait]
impl ProductSource for SlamJamApi {
    async fn fetch(&self, endpoint: Endpoint, pid: &str) -> Result<ProductRecord, FetchError> {
        let url = self
            .endpoint_url(endpoint, pid)
            .map_err(|e| FetchError::Transient(format!("{e:#}")))?;
        let body = self.client.get_json(url.as_str()).await?;
        Ok(self.parser(endpoint).parse(pid, body)?)
    }
}
