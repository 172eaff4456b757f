//! Prometheus metrics HTTP endpoint
//!
//! Exposes engine metrics in Prometheus text format at /metrics.
//! Uses hyper for the HTTP server.

use crate::infra::metrics::{Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with instance label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    instance: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{instance=\"{instance}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    instance: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    avg: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{instance=\"{instance}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{instance=\"{instance}\",le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let sum = avg * count;
    let _ = writeln!(output, "{name}_sum{{instance=\"{instance}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{instance=\"{instance}\"}} {count}");
}

/// Format metrics in Prometheus text exposition format
///
/// Takes a report, so the latency histogram covers the window since the
/// previous report (scrape or periodic log).
pub fn format_prometheus_metrics(metrics: &Metrics, instance: &str) -> String {
    let summary = metrics.report();
    let mut output = String::with_capacity(4096);

    write_detection_metrics(&mut output, instance, &summary);
    write_latency_metrics(&mut output, instance, &summary);
    write_review_metrics(&mut output, instance, &summary);
    write_profile_metrics(&mut output, instance, metrics);
    write_publish_metrics(&mut output, instance, &summary);

    output
}

fn write_detection_metrics(output: &mut String, instance: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "stitcher_detections_total",
        "Total detections handled by the engine",
        MetricType::Counter,
        instance,
        summary.detections_total,
    );
    let _ = writeln!(output, "# HELP stitcher_detections_per_sec Detections handled per second");
    let _ = writeln!(output, "# TYPE stitcher_detections_per_sec gauge");
    let _ = writeln!(
        output,
        "stitcher_detections_per_sec{{instance=\"{instance}\"}} {:.2}",
        summary.detections_per_sec
    );
    write_metric(
        output,
        "stitcher_detections_malformed_total",
        "Payloads dropped as malformed",
        MetricType::Counter,
        instance,
        summary.detections_malformed,
    );
    write_metric(
        output,
        "stitcher_detections_matched_total",
        "Detection to profile matches",
        MetricType::Counter,
        instance,
        summary.detections_matched,
    );
    write_metric(
        output,
        "stitcher_snapshot_detections_total",
        "Detections replayed from the startup snapshot",
        MetricType::Counter,
        instance,
        summary.snapshot_detections,
    );
    write_metric(
        output,
        "stitcher_event_queue_depth",
        "Current ingest queue depth",
        MetricType::Gauge,
        instance,
        summary.event_queue_depth,
    );
}

fn write_latency_metrics(output: &mut String, instance: &str, summary: &MetricsSummary) {
    write_histogram(
        output,
        "stitcher_detection_latency_us",
        "Detection handling latency in microseconds",
        instance,
        &summary.lat_buckets,
        summary.avg_latency_us,
    );
    write_metric(
        output,
        "stitcher_detection_latency_p99_us",
        "99th percentile detection handling latency",
        MetricType::Gauge,
        instance,
        summary.lat_p99_us,
    );
}

fn write_review_metrics(output: &mut String, instance: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "stitcher_reviews_opened_total",
        "Reviews opened",
        MetricType::Counter,
        instance,
        summary.reviews_opened,
    );
    write_metric(
        output,
        "stitcher_reviews_closed_total",
        "Reviews closed",
        MetricType::Counter,
        instance,
        summary.reviews_closed,
    );
    write_metric(
        output,
        "stitcher_open_reviews",
        "Currently open reviews",
        MetricType::Gauge,
        instance,
        summary.open_reviews,
    );
    write_metric(
        output,
        "stitcher_ghost_detections_closed_total",
        "Detections force-closed after going silent",
        MetricType::Counter,
        instance,
        summary.ghost_detections_closed,
    );
}

fn write_profile_metrics(output: &mut String, instance: &str, metrics: &Metrics) {
    let _ = writeln!(output, "# HELP stitcher_profile_reviews_closed_total Reviews closed per profile");
    let _ = writeln!(output, "# TYPE stitcher_profile_reviews_closed_total counter");
    for (profile, count) in metrics.profile_closed() {
        let _ = writeln!(
            output,
            "stitcher_profile_reviews_closed_total{{instance=\"{instance}\",profile=\"{profile}\"}} {count}"
        );
    }
}

fn write_publish_metrics(output: &mut String, instance: &str, summary: &MetricsSummary) {
    let _ = writeln!(output, "# HELP stitcher_published_total Review messages published by type");
    let _ = writeln!(output, "# TYPE stitcher_published_total counter");
    for (kind, val) in [
        ("new", summary.published_new),
        ("update", summary.published_update),
        ("end", summary.published_end),
    ] {
        let _ = writeln!(
            output,
            "stitcher_published_total{{instance=\"{instance}\",type=\"{kind}\"}} {val}"
        );
    }
    write_metric(
        output,
        "stitcher_publish_failures_total",
        "Review messages the publisher rejected",
        MetricType::Counter,
        instance,
        summary.publish_failures,
    );
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: Arc<Metrics>,
    instance: Arc<String>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&metrics, &instance);
            let mut response = text_response(StatusCode::OK, body);
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            Ok(response)
        }
        (&Method::GET, "/health") => Ok(text_response(StatusCode::OK, "ok".to_string())),
        _ => Ok(text_response(StatusCode::NOT_FOUND, "Not Found".to_string())),
    }
}

/// Start the Prometheus metrics HTTP server
pub async fn start_metrics_server(
    port: u16,
    metrics: Arc<Metrics>,
    instance: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let instance = Arc::new(instance);

    info!(port = %port, instance = %instance, "prometheus_metrics_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let metrics = metrics.clone();
                        let instance = instance.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let metrics = metrics.clone();
                                let instance = instance.clone();
                                async move { handle_request(req, metrics, instance).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "prometheus_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "prometheus_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("prometheus_metrics_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
