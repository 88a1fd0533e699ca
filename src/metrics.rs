//! Prometheus metrics collection
//!
//! Tracks conversation turns by platform and intent, completion-service
//! failures, pipeline runs, and webhook rejections. Exposed via the
//! `/metrics` endpoint in Prometheus text format. Recording failures are
//! logged and swallowed; observability never breaks a turn.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::intent::Intent;
use crate::platform::Platform;

/// Metrics collector shared across handlers and the chat service
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    turns_total: IntCounterVec,
    turn_duration: HistogramVec,
    completion_failures: IntCounterVec,
    pipeline_runs: IntCounterVec,
    webhook_rejections: IntCounterVec,
}

impl Metrics {
    /// Create a new registry with all metrics registered
    ///
    /// Label values come from closed enums (`Platform`, `Intent`) or small
    /// fixed string sets, so cardinality stays bounded.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // 4 platforms x 6 intents = 24 time series
        let turns_total = IntCounterVec::new(
            Opts::new(
                "modelscout_turns_total",
                "Total conversation turns by platform and classified intent",
            ),
            &["platform", "intent"],
        )?;

        let turn_duration = HistogramVec::new(
            HistogramOpts::new(
                "modelscout_turn_duration_ms",
                "End-to-end turn processing latency in milliseconds",
            )
            .buckets(vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0]),
            &["platform"],
        )?;

        // stage: classify, generate, recommend, pricing, report
        let completion_failures = IntCounterVec::new(
            Opts::new(
                "modelscout_completion_failures_total",
                "Completion service failures by pipeline stage",
            ),
            &["stage"],
        )?;

        // outcome: report, empty, failed
        let pipeline_runs = IntCounterVec::new(
            Opts::new(
                "modelscout_pipeline_runs_total",
                "Recommendation pipeline runs by outcome",
            ),
            &["outcome"],
        )?;

        // reason: missing_fields, unauthorized
        let webhook_rejections = IntCounterVec::new(
            Opts::new(
                "modelscout_webhook_rejections_total",
                "Rejected webhook deliveries by platform and reason",
            ),
            &["platform", "reason"],
        )?;

        registry.register(Box::new(turns_total.clone()))?;
        registry.register(Box::new(turn_duration.clone()))?;
        registry.register(Box::new(completion_failures.clone()))?;
        registry.register(Box::new(pipeline_runs.clone()))?;
        registry.register(Box::new(webhook_rejections.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            turns_total,
            turn_duration,
            completion_failures,
            pipeline_runs,
            webhook_rejections,
        })
    }

    /// Count one completed turn
    pub fn record_turn(&self, platform: Platform, intent: Intent) {
        self.turns_total
            .with_label_values(&[platform.as_str(), intent.as_str()])
            .inc();
    }

    /// Observe turn latency; invalid values are dropped with a log line
    pub fn record_turn_duration(&self, platform: Platform, duration_ms: f64) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            tracing::warn!(duration_ms, "dropping invalid turn duration sample");
            return;
        }
        self.turn_duration
            .with_label_values(&[platform.as_str()])
            .observe(duration_ms);
    }

    pub fn record_completion_failure(&self, stage: &str) {
        self.completion_failures.with_label_values(&[stage]).inc();
    }

    pub fn record_pipeline_run(&self, outcome: &str) {
        self.pipeline_runs.with_label_values(&[outcome]).inc();
    }

    pub fn record_webhook_rejection(&self, platform: Platform, reason: &str) {
        self.webhook_rejections
            .with_label_values(&[platform.as_str(), reason])
            .inc();
    }

    /// Encode all metrics in Prometheus text exposition format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(error = %e, "Prometheus text encoder failed");
                e
            })?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics output was not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_turn_increments_counter() {
        let metrics = Metrics::new().expect("create metrics");
        metrics.record_turn(Platform::Web, Intent::Greeting);
        metrics.record_turn(Platform::Web, Intent::Greeting);
        metrics.record_turn(Platform::Telegram, Intent::NewRequirement);

        let output = metrics.gather().expect("gather");
        assert!(output.contains("modelscout_turns_total"));
        assert!(output.contains("platform=\"web\""));
        assert!(output.contains("intent=\"Greeting\""));
        assert!(output.contains("platform=\"telegram\""));
    }

    #[test]
    fn test_turn_duration_rejects_invalid_samples() {
        let metrics = Metrics::new().expect("create metrics");
        // Dropped silently, must not panic or corrupt the histogram
        metrics.record_turn_duration(Platform::Web, f64::NAN);
        metrics.record_turn_duration(Platform::Web, -5.0);
        metrics.record_turn_duration(Platform::Web, 120.0);

        let output = metrics.gather().expect("gather");
        let count_line = output
            .lines()
            .find(|l| l.contains("modelscout_turn_duration_ms_count"))
            .expect("histogram count present");
        assert!(count_line.ends_with('1'), "only the valid sample counts: {count_line}");
    }

    #[test]
    fn test_gather_produces_prometheus_text_format() {
        let metrics = Metrics::new().expect("create metrics");
        metrics.record_completion_failure("classify");
        metrics.record_pipeline_run("report");
        metrics.record_webhook_rejection(Platform::WhatsApp, "unauthorized");

        let output = metrics.gather().expect("gather");
        assert!(output.contains("# HELP modelscout_completion_failures_total"));
        assert!(output.contains("# TYPE modelscout_completion_failures_total counter"));
        assert!(output.contains("stage=\"classify\""));
        assert!(output.contains("outcome=\"report\""));
        assert!(output.contains("reason=\"unauthorized\""));
    }

    #[test]
    fn test_metrics_is_clonable_with_shared_registry() {
        let metrics = Metrics::new().expect("create metrics");
        let cloned = metrics.clone();
        metrics.record_turn(Platform::Sms, Intent::Goodbye);
        let output = cloned.gather().expect("gather");
        assert!(output.contains("platform=\"sms\""));
    }
}
