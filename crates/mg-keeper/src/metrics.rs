use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::time::Duration;

/// Keeper metrics collector
#[derive(Clone)]
pub struct KeeperMetrics {
    /// Waiters ever registered
    waiters_registered: IntCounter,

    /// Waiters currently registered
    waiters_active: IntGauge,

    /// Waiters resolved by a matching event
    waiters_matched: IntCounter,

    /// Waits that ran out of time
    waiters_timed_out: IntCounter,

    /// Events no waiter claimed
    events_unclaimed: IntCounter,

    /// Time from wait start to match
    wait_duration: Histogram,

    registry: Registry,
}

impl KeeperMetrics {
    /// Create new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let waiters_registered = IntCounter::new(
            "mediagate_waiters_registered_total",
            "Total number of keeper waiters registered",
        )?;
        registry.register(Box::new(waiters_registered.clone()))?;

        let waiters_active = IntGauge::new(
            "mediagate_waiters_active",
            "Number of keeper waiters currently registered",
        )?;
        registry.register(Box::new(waiters_active.clone()))?;

        let waiters_matched = IntCounter::new(
            "mediagate_waiters_matched_total",
            "Total number of waiters resolved by a matching event",
        )?;
        registry.register(Box::new(waiters_matched.clone()))?;

        let waiters_timed_out = IntCounter::new(
            "mediagate_waiters_timed_out_total",
            "Total number of waits that timed out",
        )?;
        registry.register(Box::new(waiters_timed_out.clone()))?;

        let events_unclaimed = IntCounter::new(
            "mediagate_events_unclaimed_total",
            "Total number of engine events no waiter claimed",
        )?;
        registry.register(Box::new(events_unclaimed.clone()))?;

        let wait_duration = Histogram::with_opts(
            HistogramOpts::new(
                "mediagate_wait_duration_seconds",
                "Time between wait start and matching event",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(wait_duration.clone()))?;

        Ok(Self {
            waiters_registered,
            waiters_active,
            waiters_matched,
            waiters_timed_out,
            events_unclaimed,
            wait_duration,
            registry,
        })
    }

    pub fn waiter_registered(&self) {
        self.waiters_registered.inc();
        self.waiters_active.inc();
    }

    pub fn waiter_removed(&self) {
        self.waiters_active.dec();
    }

    pub fn waiter_matched(&self, waited: Duration) {
        self.waiters_matched.inc();
        self.wait_duration.observe(waited.as_secs_f64());
    }

    pub fn waiter_timed_out(&self) {
        self.waiters_timed_out.inc();
    }

    pub fn event_unclaimed(&self) {
        self.events_unclaimed.inc();
    }

    pub fn active(&self) -> i64 {
        self.waiters_active.get()
    }

    pub fn matched(&self) -> u64 {
        self.waiters_matched.get()
    }

    pub fn timed_out(&self) -> u64 {
        self.waiters_timed_out.get()
    }

    /// Registry for scraping or merging into a larger one
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every keeper metric
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for KeeperMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default keeper metrics")
    }
}
