//! Product-ShowQuickView parser
//!
//! The endpoint returns `{"renderedTemplate": "<html>"}`. Name, brand,
//! price and image come from the fragment's markup, the publish date from
//! its embedded JSON-LD block. The fragment has no size information.

use super::{ParsingError, ParsingResult, ProductParser, parse_catalog_date};
use crate::domain::{ProductRecord, ProductSummary};
use crate::infrastructure::config::slamjam::NO_IMAGE_MARKER;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

const ENDPOINT: &str = "Product-ShowQuickView";

/// Parser for the HTML quick-view fragment
pub struct QuickViewParser {
    name: Selector,
    image: Selector,
    brand: Selector,
    price: Selector,
    structured_data: Selector,
}

impl QuickViewParser {
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            name: Self::compile("h1.product-name")?,
            image: Self::compile("div.slider-data-large div")?,
            brand: Self::compile("div.product-quickview__main h2.t-up")?,
            price: Self::compile("div.price span.value")?,
            structured_data: Self::compile(r#"script[type="application/ld+json"]"#)?,
        })
    }

    fn compile(selector: &str) -> ParsingResult<Selector> {
        Selector::parse(selector).map_err(|e| ParsingError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })
    }

    fn text_of(element: ElementRef<'_>) -> String {
        element.text().collect::<String>().trim().to_string()
    }

    /// Text of the first match; the element must exist but may be empty
    fn required_text(&self, html: &Html, selector: &Selector, field: &str) -> ParsingResult<String> {
        html.select(selector)
            .next()
            .map(Self::text_of)
            .ok_or_else(|| ParsingError::required_field_missing(field, ENDPOINT))
    }

    fn image_url(&self, html: &Html) -> Option<String> {
        let url = html
            .select(&self.image)
            .next()?
            .value()
            .attr("data-image-url")?
            .trim()
            .to_string();

        if url.is_empty() || url.contains(NO_IMAGE_MARKER) {
            return None;
        }
        Some(url)
    }

    fn price(&self, html: &Html) -> Option<String> {
        let price = html.select(&self.price).next().map(Self::text_of)?;
        match price.as_str() {
            "" | "null" => None,
            _ => Some(price),
        }
    }

    fn date_published(&self, html: &Html) -> ParsingResult<chrono::NaiveDate> {
        let block = html
            .select(&self.structured_data)
            .next()
            .map(|script| script.text().collect::<String>())
            .ok_or_else(|| ParsingError::required_field_missing("application/ld+json", ENDPOINT))?;

        let data: Value = serde_json::from_str(&block).map_err(|e| {
            ParsingError::InvalidStructuredData {
                message: e.to_string(),
            }
        })?;

        let published = data
            .get("datePublished")
            .and_then(Value::as_str)
            .ok_or_else(|| ParsingError::required_field_missing("datePublished", ENDPOINT))?;

        parse_catalog_date("datePublished", published)
    }
}

impl ProductParser for QuickViewParser {
    fn parse(&self, pid: &str, body: Value) -> ParsingResult<ProductRecord> {
        let template = body
            .get("renderedTemplate")
            .and_then(Value::as_str)
            .ok_or_else(|| ParsingError::required_field_missing("renderedTemplate", ENDPOINT))?;

        let html = Html::parse_fragment(template);

        let name = self.required_text(&html, &self.name, "product-name")?;
        let brand = self.required_text(&html, &self.brand, "brand")?;
        let created_date = self.date_published(&html)?;
        let image_url = self.image_url(&html);
        let price = self.price(&html);

        debug!("Parsed quick view for {}: {} / {}", pid, brand, name);

        let summary = ProductSummary {
            id: pid.to_string(),
            name,
            brand,
            created_date,
            price,
            image_url,
        };

        Ok(ProductRecord::from_quick_view(summary))
    }
}
