//! HTTP backend for lootcase.
//!
//! Wraps an execution [`Layer`] behind a single JSON action endpoint with the usual edge
//! protections (origin checks, rate limits, body limits) and a SQLite persistence backend.

use lootcase_execution::{Backend, Layer, LayerConfig};
use lootcase_types::Catalog;

mod api;
mod config;
mod metrics;
mod store;

pub use api::Api;
pub use config::{load_catalog, ServerConfig};
pub use metrics::{HttpMetrics, HttpMetricsSnapshot, LatencySnapshot, MetricsSnapshot, OutcomeSnapshot};
pub use store::{SessionTokens, SqliteStore};

pub struct Server<B: Backend> {
    config: ServerConfig,
    layer: Layer<B>,
    http_metrics: HttpMetrics,
}

impl<B: Backend> Server<B> {
    pub fn new(config: ServerConfig, backend: B, catalog: Catalog) -> Self {
        let layer = Layer::new(
            backend,
            catalog,
            LayerConfig {
                reel: config.reel.clone(),
            },
        );
        Self {
            config,
            layer,
            http_metrics: HttpMetrics::default(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn layer(&self) -> &Layer<B> {
        &self.layer
    }

    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.http_metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http: self.http_metrics.snapshot(),
            outcomes: self.layer.counters().snapshot().into(),
        }
    }
}
