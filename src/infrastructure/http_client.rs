//! HTTP client for the storefront API with proxy rotation and rate limiting
//!
//! reqwest binds a proxy when the client is built, so one client is built
//! per proxy and each request picks a client at random. Every response is
//! classified into a [`FetchError`] so callers can decide whether another
//! attempt is worth making.

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::fetch_error::FetchError;
use crate::infrastructure::proxy::ProxyPool;
use anyhow::{Context, Result};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, direct::NotKeyed}};
use reqwest::{Client, Proxy, StatusCode, header::{HeaderMap, HeaderValue, REFERER}};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total deadline of one request, connect to last body byte
    pub timeout: Duration,
    pub user_agent: String,
    pub referer: String,
    pub accept_invalid_certs: bool,
    /// Statuses meaning the product does not exist
    pub not_found_statuses: Vec<u16>,
    /// Global outbound rate, 0 disables limiting
    pub max_requests_per_second: u32,
    /// Log every failed request at warn level instead of debug
    pub verbose: bool,
}

impl HttpClientConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.monitor.timeout(),
            user_agent: config.http.user_agent.clone(),
            referer: config.http.referer.clone(),
            accept_invalid_certs: config.http.accept_invalid_certs,
            not_found_statuses: config.monitor.retry_stop.clone(),
            max_requests_per_second: config.monitor.max_requests_per_second,
            verbose: config.monitor.verbose,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

struct Route {
    /// `host:port` of the proxy, `None` for direct egress
    via: Option<String>,
    client: Client,
}

/// Storefront HTTP client
pub struct HttpClient {
    routes: Vec<Route>,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Client without proxies
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Self::with_proxies(config, &ProxyPool::direct())
    }

    /// One route per proxy, or a single direct route when the pool is empty
    pub fn with_proxies(config: HttpClientConfig, proxies: &ProxyPool) -> Result<Self> {
        let routes = if proxies.is_empty() {
            vec![Route {
                via: None,
                client: Self::build_client(&config, None)?,
            }]
        } else {
            proxies
                .iter()
                .map(|proxy| {
                    let upstream = Proxy::all(proxy.to_url())
                        .with_context(|| format!("Invalid proxy {}", proxy.endpoint()))?;
                    Ok(Route {
                        via: Some(proxy.endpoint()),
                        client: Self::build_client(&config, Some(upstream))?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        info!(
            "🌐 HttpClient ready: {} route(s), timeout {:?}, rate limit {}",
            routes.len(),
            config.timeout,
            if rate_limiter.is_some() {
                format!("{} RPS", config.max_requests_per_second)
            } else {
                "off".to_string()
            }
        );

        Ok(Self {
            routes,
            rate_limiter,
            config,
        })
    }

    fn build_client(config: &HttpClientConfig, proxy: Option<Proxy>) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referer).context("Invalid referer header")?,
        );

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }

        builder.build().context("Failed to create HTTP client")
    }

    fn pick_route(&self) -> &Route {
        let index = fastrand::usize(..self.routes.len());
        &self.routes[index]
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// One GET expecting a JSON body
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let route = self.pick_route();
        let via = route.via.as_deref().unwrap_or("direct");
        debug!("🌐 HTTP GET via {}: {}", via, url);

        let response = match route.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("request timed out via {via}")
                } else {
                    format!("request failed via {via}: {e}")
                };
                return Err(self.transient(url, reason));
            }
        };

        let status = response.status();
        if self.is_not_found(status) {
            debug!("HTTP {} for {}", status, url);
            return Err(FetchError::NotFound {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(self.transient(url, format!("HTTP error {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| self.transient(url, format!("response body is not JSON: {e}")))
    }

    fn is_not_found(&self, status: StatusCode) -> bool {
        self.config.not_found_statuses.contains(&status.as_u16())
    }

    fn transient(&self, url: &str, reason: String) -> FetchError {
        if self.config.verbose {
            warn!("⚠️ {} ({})", reason, url);
        } else {
            debug!("{} ({})", reason, url);
        }
        FetchError::Transient(reason)
    }
}
