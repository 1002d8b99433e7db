use axum::http::StatusCode;
use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Registry, TextEncoder};
use std::sync::OnceLock;
use tracing::warn;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static LLM_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();
static LLM_LATENCY: OnceLock<Histogram> = OnceLock::new();
static PROJECT_WRITES: OnceLock<IntCounterVec> = OnceLock::new();

/// Register all collectors. Safe to call more than once.
pub fn init_metrics() {
    let req_counter = REQ_COUNTER.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("requests_total", "Total requests per route"),
            &["route", "status"],
        )
        .expect("valid requests_total definition")
    });

    let llm_requests = LLM_REQUESTS.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("llm_requests_total", "Language model calls by outcome"),
            &["outcome"],
        )
        .expect("valid llm_requests_total definition")
    });

    let llm_latency = LLM_LATENCY.get_or_init(|| {
        Histogram::with_opts(
            HistogramOpts::new("llm_request_seconds", "Language model call latency")
                .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )
        .expect("valid llm_request_seconds definition")
    });

    let project_writes = PROJECT_WRITES.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("project_writes_total", "Project store writes by kind"),
            &["kind"],
        )
        .expect("valid project_writes_total definition")
    });

    REGISTRY.register(Box::new(req_counter.clone())).ok();
    REGISTRY.register(Box::new(llm_requests.clone())).ok();
    REGISTRY.register(Box::new(llm_latency.clone())).ok();
    REGISTRY.register(Box::new(project_writes.clone())).ok();
}

pub fn inc_request(route: &str, status: &str) {
    if let Some(counter) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status]).inc();
    }
}

pub fn inc_llm_request(outcome: &str) {
    if let Some(counter) = LLM_REQUESTS.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn observe_llm_latency(seconds: f64) {
    if let Some(histogram) = LLM_LATENCY.get() {
        histogram.observe(seconds);
    }
}

pub fn inc_project_write(kind: &str) {
    if let Some(counter) = PROJECT_WRITES.get() {
        counter.with_label_values(&[kind]).inc();
    }
}

pub async fn get_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, [("content-type", "text/plain")], Vec::new());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
}
