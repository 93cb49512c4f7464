//! New-product notification channels
//!
//! [`DiscordWebhookNotifier`] posts a product embed to a Discord webhook;
//! [`LogNotifier`] writes the same information to the log for runs without
//! a webhook.

use crate::domain::ProductRecord;
use crate::infrastructure::config::NotifyConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

const IN_STOCK: &str = "🟩";
const OUT_OF_STOCK: &str = "🟥";

#[async_trait]
pub trait ProductNotifier: Send + Sync {
    async fn notify_new_product(&self, product: &ProductRecord) -> Result<()>;
}

/// Embed colour and footer
#[derive(Debug, Clone)]
pub struct EmbedStyle {
    pub color: u32,
    pub footer: String,
}

impl From<&NotifyConfig> for EmbedStyle {
    fn from(config: &NotifyConfig) -> Self {
        Self {
            color: config.embed_color,
            footer: config.footer.clone(),
        }
    }
}

fn describe(product: &ProductRecord) -> String {
    format!(
        "**Fetched PID:** {}\n\n**Brand:** {}\n**Price:** {}",
        product.id(),
        product.brand(),
        product.price().unwrap_or("N/A")
    )
}

/// Discord embed for a product.
///
/// A new-product announcement gets a marked title and a footer; size
/// fields are only shown on lookups of detail-sourced records.
pub fn product_embed(product: &ProductRecord, new: bool, style: &EmbedStyle) -> Value {
    let title = if new {
        format!("[New Product Fetched]\n{}", product.name())
    } else {
        product.name().to_string()
    };

    let mut embed = json!({
        "title": title,
        "description": describe(product),
        "color": style.color,
    });

    if let Some(image) = product.image_url() {
        embed["thumbnail"] = json!({ "url": image });
    }

    if new {
        embed["footer"] = json!({ "text": style.footer });
    } else if let Some(sizes) = product.size_availability().filter(|s| !s.is_empty()) {
        let labels: Vec<String> = sizes.iter().map(|(label, _)| format!("`{label}`")).collect();
        let checkout: Vec<String> = sizes
            .iter()
            .map(|(_, stock)| format!("`{}`", stock.checkout_id))
            .collect();
        let availability: Vec<String> = sizes
            .iter()
            .map(|(_, stock)| format!("`{}`", if stock.in_stock { IN_STOCK } else { OUT_OF_STOCK }))
            .collect();

        embed["fields"] = json!([
            { "name": "Sizes:", "value": labels.join("\n"), "inline": true },
            { "name": "Checkout PIDs:", "value": checkout.join("\n"), "inline": true },
            { "name": "Availability:", "value": availability.join("\n"), "inline": true },
        ]);
    }

    embed
}

/// Plain-text rendering used for logs and the lookup command
pub fn product_text(product: &ProductRecord) -> String {
    let mut text = format!(
        "{} ({})\n  brand: {}\n  price: {}\n  created: {}",
        product.name(),
        product.id(),
        product.brand(),
        product.price().unwrap_or("N/A"),
        product.created_date()
    );
    if let Some(image) = product.image_url() {
        text.push_str(&format!("\n  image: {image}"));
    }
    if let Some(sizes) = product.size_availability() {
        for (label, stock) in sizes.iter() {
            let mark = if stock.in_stock { IN_STOCK } else { OUT_OF_STOCK };
            text.push_str(&format!("\n  {mark} {label:<8} {}", stock.checkout_id));
        }
    }
    text
}

/// Logs new products at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl ProductNotifier for LogNotifier {
    async fn notify_new_product(&self, product: &ProductRecord) -> Result<()> {
        info!(
            pid = product.id(),
            created = %product.created_date(),
            "🆕 New product: {} - {} ({})",
            product.brand(),
            product.name(),
            product.price().unwrap_or("N/A")
        );
        Ok(())
    }
}

/// Posts new products to a Discord webhook
pub struct DiscordWebhookNotifier {
    client: Client,
    webhook_url: String,
    style: EmbedStyle,
}

impl DiscordWebhookNotifier {
    pub fn new(webhook_url: &str, style: EmbedStyle) -> Result<Self> {
        url::Url::parse(webhook_url).context("Invalid Discord webhook URL")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create webhook client")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            style,
        })
    }
}

#[async_trait]
impl ProductNotifier for DiscordWebhookNotifier {
    async fn notify_new_product(&self, product: &ProductRecord) -> Result<()> {
        let payload = json!({ "embeds": [product_embed(product, true, &self.style)] });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to post {} to Discord", product.id()))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Discord webhook rejected {} with HTTP {}", product.id(), status);
        }

        info!("📣 Announced {} on Discord", product.id());
        Ok(())
    }
}
