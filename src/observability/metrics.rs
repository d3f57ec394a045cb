use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub fee_quotes_total: IntCounterVec,
    pub order_transitions_total: IntCounterVec,
    pub location_updates_total: IntCounterVec,
    pub tracking_subscribers: IntGauge,
    pub code_verifications_total: IntCounterVec,
    pub geocode_latency_seconds: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let fee_quotes_total = IntCounterVec::new(
            Opts::new("fee_quotes_total", "Delivery fee calculations by outcome"),
            &["outcome"],
        )
        .expect("valid fee_quotes_total metric");

        let order_transitions_total = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions by target status"),
            &["status"],
        )
        .expect("valid order_transitions_total metric");

        let location_updates_total = IntCounterVec::new(
            Opts::new("location_updates_total", "Driver location changes by event kind"),
            &["kind"],
        )
        .expect("valid location_updates_total metric");

        let tracking_subscribers =
            IntGauge::new("tracking_subscribers", "Open location tracking subscriptions")
                .expect("valid tracking_subscribers metric");

        let code_verifications_total = IntCounterVec::new(
            Opts::new("code_verifications_total", "Confirmation code checks by outcome"),
            &["outcome"],
        )
        .expect("valid code_verifications_total metric");

        let geocode_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "geocode_latency_seconds",
                "Latency of external address lookups in seconds",
            ),
            &["outcome"],
        )
        .expect("valid geocode_latency_seconds metric");

        registry
            .register(Box::new(fee_quotes_total.clone()))
            .expect("register fee_quotes_total");
        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(tracking_subscribers.clone()))
            .expect("register tracking_subscribers");
        registry
            .register(Box::new(code_verifications_total.clone()))
            .expect("register code_verifications_total");
        registry
            .register(Box::new(geocode_latency_seconds.clone()))
            .expect("register geocode_latency_seconds");

        Self {
            registry,
            fee_quotes_total,
            order_transitions_total,
            location_updates_total,
            tracking_subscribers,
            code_verifications_total,
            geocode_latency_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
