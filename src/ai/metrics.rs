//! Inference Metrics Collection
//!
//! Process-local counters for inference calls. Recovered parses are counted
//! apart from clean ones since they mean the model ignored the output contract.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics();
//! metrics.record_success(&response, ParseOutcome::Recovered);
//! let summary = metrics.summary();
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::ai::provider::LlmResponse;
use crate::ai::validation::ParseOutcome;
use crate::types::ErrorCategory;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe inference counters
pub struct MetricsCollector {
    start_time: Instant,
    clean_parses: AtomicU64,
    recovered_parses: AtomicU64,
    output_failures: AtomicU64,
    transport_failures: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub successful_calls: u64,
    pub clean_parses: u64,
    pub recovered_parses: u64,
    pub output_failures: u64,
    pub transport_failures: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            clean_parses: AtomicU64::new(0),
            recovered_parses: AtomicU64::new(0),
            output_failures: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Record a call whose output was accepted
    pub fn record_success(&self, response: &LlmResponse, parse: ParseOutcome) {
        match parse {
            ParseOutcome::Clean => self.clean_parses.fetch_add(1, Ordering::Relaxed),
            ParseOutcome::Recovered => self.recovered_parses.fetch_add(1, Ordering::Relaxed),
        };
        self.input_tokens
            .fetch_add(response.usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(response.usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(response.timing.total_ms, Ordering::Relaxed);
    }

    /// Record a failed call
    pub fn record_failure(&self, category: ErrorCategory) {
        if category.is_output_failure() {
            self.output_failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.transport_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSummary {
        let clean = self.clean_parses.load(Ordering::Relaxed);
        let recovered = self.recovered_parses.load(Ordering::Relaxed);
        let successful = clean + recovered;
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSummary {
            uptime_secs: self.start_time.elapsed().as_secs(),
            successful_calls: successful,
            clean_parses: clean,
            recovered_parses: recovered,
            output_failures: self.output_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            total_tokens: self.input_tokens.load(Ordering::Relaxed)
                + self.output_tokens.load(Ordering::Relaxed),
            avg_latency_ms: if successful > 0 {
                total_latency as f64 / successful as f64
            } else {
                0.0
            },
        }
    }

    /// Get final summary
    pub fn summary(&self) -> MetricsSummary {
        self.snapshot()
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Inference calls: {} (clean: {}, recovered: {})\n\
             Failures: {} output, {} transport\n\
             Tokens: {}\n\
             Avg Latency: {:.0}ms",
            self.successful_calls,
            self.clean_parses,
            self.recovered_parses,
            self.output_failures,
            self.transport_failures,
            self.total_tokens,
            self.avg_latency_ms,
        )
    }
}

// =============================================================================
// Shared Type
// =============================================================================

/// Shared metrics collector
pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics() -> SharedMetrics {
    Arc::new(MetricsCollector::new())
}

// =============================================================================
// Tests
// =============================================================================
