use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref CYCLES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "watchdog_cycles_total",
        "Total offline-check cycles started"
    ))
    .expect("valid metric");
    pub static ref REGISTRY_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "watchdog_registry_failures_total",
        "Total cycles that could not read the device registry"
    ))
    .expect("valid metric");
    pub static ref DEVICES_EVALUATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "watchdog_devices_evaluated_total",
        "Total device records evaluated"
    ))
    .expect("valid metric");
    pub static ref DEVICES_SKIPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "watchdog_devices_skipped_total",
            "Total device records skipped for incomplete data"
        ),
        &["reason"]
    )
    .expect("valid metric");
    pub static ref STALE_DEVICES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "watchdog_stale_devices_total",
        "Total stale device detections"
    ))
    .expect("valid metric");
    pub static ref NOTIFICATIONS_SENT_TOTAL: Counter = Counter::with_opts(Opts::new(
        "watchdog_notifications_sent_total",
        "Total offline notifications accepted by the push service"
    ))
    .expect("valid metric");
    pub static ref NOTIFICATIONS_FAILED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "watchdog_notifications_failed_total",
        "Total offline notifications that failed to deliver"
    ))
    .expect("valid metric");
    pub static ref CYCLE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "watchdog_cycle_duration_seconds",
            "Wall time of one offline-check cycle"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    )
    .expect("valid metric");
    pub static ref LAST_CYCLE_STALE: Gauge = Gauge::with_opts(Opts::new(
        "watchdog_last_cycle_stale_devices",
        "Stale devices found by the most recent completed cycle"
    ))
    .expect("valid metric");
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(CYCLES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REGISTRY_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEVICES_EVALUATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEVICES_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STALE_DEVICES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NOTIFICATIONS_SENT_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NOTIFICATIONS_FAILED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CYCLE_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(LAST_CYCLE_STALE.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
