use lootcase_execution::LayerCountersSnapshot;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Clone, Debug, Serialize)]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

#[derive(Default)]
struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);

        match LATENCY_BUCKETS_MS.iter().position(|bucket| ms <= *bucket) {
            Some(idx) => self.buckets[idx].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };

        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts: self
                .buckets
                .iter()
                .map(|bucket| bucket.load(Ordering::Relaxed))
                .collect(),
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HttpMetricsSnapshot {
    pub open_cases: LatencySnapshot,
    pub generate_preview: LatencySnapshot,
    pub purchase_pass: LatencySnapshot,
    pub upgrade_case_discount: LatencySnapshot,
    pub reject_origin: u64,
    pub reject_body_limit: u64,
    pub reject_rate_limit: u64,
    pub reject_malformed: u64,
}

#[derive(Default)]
pub struct HttpMetrics {
    open_cases: LatencyMetrics,
    generate_preview: LatencyMetrics,
    purchase_pass: LatencyMetrics,
    upgrade_case_discount: LatencyMetrics,
    reject_origin: AtomicU64,
    reject_body_limit: AtomicU64,
    reject_rate_limit: AtomicU64,
    reject_malformed: AtomicU64,
}

impl HttpMetrics {
    /// Record latency under the wire name of the action.
    pub fn record_action(&self, action: &str, duration: Duration) {
        let metrics = match action {
            "openCases" => &self.open_cases,
            "generatePreview" => &self.generate_preview,
            "purchasePass" => &self.purchase_pass,
            "upgradeCaseDiscount" => &self.upgrade_case_discount,
            _ => return,
        };
        metrics.record(duration);
    }

    pub fn inc_reject_origin(&self) {
        self.reject_origin.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_body_limit(&self) {
        self.reject_body_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_rate_limit(&self) {
        self.reject_rate_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_malformed(&self) {
        self.reject_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            open_cases: self.open_cases.snapshot(),
            generate_preview: self.generate_preview.snapshot(),
            purchase_pass: self.purchase_pass.snapshot(),
            upgrade_case_discount: self.upgrade_case_discount.snapshot(),
            reject_origin: self.reject_origin.load(Ordering::Relaxed),
            reject_body_limit: self.reject_body_limit.load(Ordering::Relaxed),
            reject_rate_limit: self.reject_rate_limit.load(Ordering::Relaxed),
            reject_malformed: self.reject_malformed.load(Ordering::Relaxed),
        }
    }
}

/// Money and delivery outcomes of the action layer.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OutcomeSnapshot {
    pub openings: u64,
    pub slots_generated: u64,
    pub refunds_attempted: u64,
    pub refunds_succeeded: u64,
    pub refunds_failed: u64,
    pub side_effect_failures: u64,
}

impl From<LayerCountersSnapshot> for OutcomeSnapshot {
    fn from(counters: LayerCountersSnapshot) -> Self {
        Self {
            openings: counters.openings,
            slots_generated: counters.slots_generated,
            refunds_attempted: counters.refunds_attempted,
            refunds_succeeded: counters.refunds_succeeded,
            refunds_failed: counters.refunds_failed,
            side_effect_failures: counters.side_effect_failures,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub http: HttpMetricsSnapshot,
    pub outcomes: OutcomeSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let metrics = HttpMetrics::default();
        metrics.record_action("openCases", Duration::from_millis(3));
        metrics.record_action("openCases", Duration::from_millis(7_000));
        metrics.record_action("unknown", Duration::from_millis(1));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.open_cases.count, 2);
        assert_eq!(snapshot.open_cases.counts[2], 1);
        assert_eq!(snapshot.open_cases.overflow, 1);
        assert_eq!(snapshot.open_cases.max_ms, 7_000);
        assert_eq!(snapshot.open_cases.avg_ms, 3_501.5);
        assert_eq!(snapshot.generate_preview.count, 0);
    }
}
