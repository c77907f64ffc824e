use std::sync::Arc;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Request metrics
    pub api_requests: IntCounterVec,
    pub api_request_duration: HistogramVec,

    // Driver metrics
    pub pages_fetched: IntCounterVec,
    pub rate_limit_retries: IntCounter,

    // Auth metrics
    pub token_resolutions: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("gdirectory".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "HTTP calls by method and outcome"), &["method", "outcome"]).unwrap(),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "HTTP call duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["method"]).unwrap(),

            pages_fetched: IntCounterVec::new(Opts::new("pages_fetched_total", "Pages fetched by collection field"), &["collection"]).unwrap(),
            rate_limit_retries: IntCounter::new("rate_limit_retries_total", "Retries scheduled after a rate limited answer").unwrap(),

            token_resolutions: IntCounterVec::new(Opts::new("token_resolutions_total", "Token resolutions by credential mode and result"), &["mode", "result"]).unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during config load").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.pages_fetched.clone())).unwrap();
        reg.register(Box::new(metrics.rate_limit_retries.clone())).unwrap();
        reg.register(Box::new(metrics.token_resolutions.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
