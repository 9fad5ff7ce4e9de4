/// Prometheus metrics for the catalog cache
///
/// Counts fetch outcomes, coalesced joins and discount parse fallbacks so a
/// misbehaving upstream shows up on a dashboard rather than only in logs.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Instant;

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// Labels for catalog fetch metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FetchLabels {
    /// "success" or the error category ("transport", "status", "decode", ...)
    pub outcome: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    /// Completed catalog fetches by outcome
    pub catalog_fetches_total: Family<FetchLabels, Counter>,

    /// Wall time of a full fetch (both resources) in seconds
    pub catalog_fetch_duration_seconds: Histogram,

    /// Callers that joined an in-flight fetch instead of starting one
    pub catalog_coalesced_refreshes_total: Counter,

    /// Products whose sale percentage could not be parsed
    pub catalog_discount_parse_fallbacks_total: Counter,

    /// Products in the currently published snapshot
    pub catalog_products: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let catalog_fetches_total = Family::<FetchLabels, Counter>::default();
        registry.register(
            "catalog_fetches",
            "Total number of catalog fetches by outcome",
            catalog_fetches_total.clone(),
        );

        // Buckets: 50ms .. ~25s
        let catalog_fetch_duration_seconds = Histogram::new(exponential_buckets(0.05, 2.0, 10));
        registry.register(
            "catalog_fetch_duration_seconds",
            "Catalog fetch latency histogram in seconds",
            catalog_fetch_duration_seconds.clone(),
        );

        let catalog_coalesced_refreshes_total = Counter::default();
        registry.register(
            "catalog_coalesced_refreshes",
            "Refresh calls that awaited an already running fetch",
            catalog_coalesced_refreshes_total.clone(),
        );

        let catalog_discount_parse_fallbacks_total = Counter::default();
        registry.register(
            "catalog_discount_parse_fallbacks",
            "Products whose sale percentage was malformed and fell back to the selling price",
            catalog_discount_parse_fallbacks_total.clone(),
        );

        let catalog_products = Gauge::default();
        registry.register(
            "catalog_products",
            "Number of products in the published catalog snapshot",
            catalog_products.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            catalog_fetches_total,
            catalog_fetch_duration_seconds,
            catalog_coalesced_refreshes_total,
            catalog_discount_parse_fallbacks_total,
            catalog_products,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(error) = encode(&mut buffer, &registry) {
            tracing::warn!(%error, "failed to encode metrics");
        }
        buffer
    }

    pub fn record_fetch(&self, outcome: &str, duration: std::time::Duration) {
        self.catalog_fetches_total
            .get_or_create(&FetchLabels {
                outcome: outcome.to_string(),
            })
            .inc();
        self.catalog_fetch_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_coalesced_refresh(&self) {
        self.catalog_coalesced_refreshes_total.inc();
    }

    pub fn record_discount_parse_fallback(&self) {
        self.catalog_discount_parse_fallbacks_total.inc();
    }

    pub fn update_product_count(&self, count: usize) {
        self.catalog_products.set(count as i64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard timing one catalog fetch.
///
/// A guard dropped without [`FetchTimer::success`] or [`FetchTimer::error`]
/// is recorded as "interrupted".
pub struct FetchTimer {
    start: Instant,
    completed: bool,
}

impl FetchTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn success(mut self) {
        METRICS.record_fetch("success", self.start.elapsed());
        self.completed = true;
    }

    pub fn error(mut self, category: &str) {
        METRICS.record_fetch(category, self.start.elapsed());
        self.completed = true;
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        if !self.completed {
            METRICS.record_fetch("interrupted", self.start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_families() {
        let collector = MetricsCollector::new();
        collector.record_fetch("success", std::time::Duration::from_millis(120));
        collector.record_discount_parse_fallback();
        collector.update_product_count(42);

        let text = collector.encode();
        assert!(text.contains("catalog_fetches_total{outcome=\"success\"} 1"));
        assert!(text.contains("catalog_discount_parse_fallbacks_total 1"));
        assert!(text.contains("catalog_products 42"));
    }

    #[test]
    fn coalesced_counter_increments() {
        let collector = MetricsCollector::new();
        collector.record_coalesced_refresh();
        collector.record_coalesced_refresh();
        assert_eq!(collector.catalog_coalesced_refreshes_total.get(), 2);
    }
}
