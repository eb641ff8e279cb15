//! In-process counters for the handlers.
//!
//! These complement the `metrics` table: the table is the product metric,
//! these are for operating the handlers. Nothing is exported unless
//! `METRICS_ADDR` is set when `init_metrics` runs.

use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Install a Prometheus recorder listening on `METRICS_ADDR`. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        let Ok(addr_str) = std::env::var("METRICS_ADDR") else {
            return;
        };

        let addr = match addr_str.parse::<std::net::SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid METRICS_ADDR '{}': {}", addr_str, e);
                return;
            }
        };

        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

pub mod sms {
    pub fn sent() {
        ::metrics::counter!("notify_sms_sent_total").increment(1);
    }

    pub fn requeued() {
        ::metrics::counter!("notify_sms_requeued_total").increment(1);
    }

    pub fn skipped() {
        ::metrics::counter!("notify_sms_skipped_total").increment(1);
    }
}

pub mod stats {
    pub fn published(days: usize) {
        ::metrics::counter!("notify_stats_published_total").increment(1);
        ::metrics::gauge!("notify_stats_install_days").set(days as f64);
    }
}
