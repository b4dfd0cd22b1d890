//! Request metrics and statistics tracking for the prediction service.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector shared by all request handlers
pub struct ServiceMetrics {
    /// Successful predictions
    pub predictions_served: AtomicU64,
    /// Predictions with label 1
    pub positive_predictions: AtomicU64,
    /// Failed requests by error kind
    failures_by_kind: RwLock<BTreeMap<String, u64>>,
    /// Prediction latencies (in microseconds), most recent window
    latencies: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            positive_predictions: AtomicU64::new(0),
            failures_by_kind: RwLock::new(BTreeMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, latency: Duration, probability: f64, prediction: u8) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if prediction == 1 {
            self.positive_predictions.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }

        let bucket = ((probability * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &str) {
        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Get latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.latencies.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            positive_predictions: self.positive_predictions.load(Ordering::Relaxed),
            failures: self
                .failures_by_kind
                .read()
                .map(|f| f.clone())
                .unwrap_or_default(),
            throughput_per_sec: self.throughput(),
            latency: self.latency_stats(),
            probability_distribution: self
                .probability_buckets
                .read()
                .map(|b| *b)
                .unwrap_or_default(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let positive_rate = if snapshot.predictions_served > 0 {
            (snapshot.positive_predictions as f64 / snapshot.predictions_served as f64) * 100.0
        } else {
            0.0
        };
        let failed: u64 = snapshot.failures.values().sum();

        info!(
            served = snapshot.predictions_served,
            positive_rate = format!("{:.1}%", positive_rate),
            failed,
            throughput = format!("{:.2} req/s", snapshot.throughput_per_sec),
            mean_us = snapshot.latency.mean_us,
            p95_us = snapshot.latency.p95_us,
            p99_us = snapshot.latency.p99_us,
            "Prediction metrics summary"
        );
        for (kind, count) in &snapshot.failures {
            info!(kind = %kind, count, "Failures by kind");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Body of `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions_served: u64,
    pub positive_predictions: u64,
    pub failures: BTreeMap<String, u64>,
    pub throughput_per_sec: f64,
    pub latency: LatencyStats,
    /// Counts of probabilities in [0.0, 0.1), [0.1, 0.2), ... [0.9, 1.0]
    pub probability_distribution: [u64; 10],
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
