//! Scripted collaborators shared by the application tests

use crate::domain::ProductRecord;
use crate::domain::product::fixtures::{detail_record, quick_view_record};
use crate::infrastructure::fetch_error::FetchError;
use crate::infrastructure::notifier::ProductNotifier;
use crate::infrastructure::product_source::{Endpoint, ProductSource};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = dyn Fn(Endpoint, &str) -> Result<ProductRecord, FetchError> + Send + Sync;

/// Product source answering from a closure and recording every request
pub struct ScriptedSource {
    responder: Box<Responder>,
    delay: Duration,
    calls: Mutex<Vec<(Endpoint, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(
        responder: impl Fn(Endpoint, &str) -> Result<ProductRecord, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every pid exists and was created on `created`
    pub fn catalog(created: NaiveDate) -> Self {
        Self::new(move |endpoint, pid| {
            Ok(match endpoint {
                Endpoint::Detail => detail_record(pid, created),
                Endpoint::QuickView => quick_view_record(pid, created),
            })
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(Endpoint, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls().into_iter().map(|(endpoint, _)| endpoint).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductSource for ScriptedSource {
    async fn fetch(&self, endpoint: Endpoint, pid: &str) -> Result<ProductRecord, FetchError> {
        self.calls.lock().unwrap().push((endpoint, pid.to_string()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.responder)(endpoint, pid)
    }
}

/// Notifier that remembers announced pids
#[derive(Default)]
pub struct RecordingNotifier {
    announced: Mutex<Vec<String>>,
    rejected_pid: Option<String>,
}

impl RecordingNotifier {
    /// Fails every announcement of `pid`
    pub fn rejecting(pid: &str) -> Self {
        Self {
            announced: Mutex::new(Vec::new()),
            rejected_pid: Some(pid.to_string()),
        }
    }

    pub fn announced(&self) -> Vec<String> {
        let mut pids = self.announced.lock().unwrap().clone();
        pids.sort();
        pids
    }
}

#[async_trait]
impl ProductNotifier for RecordingNotifier {
    async fn notify_new_product(&self, product: &ProductRecord) -> Result<()> {
        if self.rejected_pid.as_deref() == Some(product.id()) {
            anyhow::bail!("webhook rejected {}", product.id());
        }
        self.announced.lock().unwrap().push(product.id().to_string());
        Ok(())
    }
}
