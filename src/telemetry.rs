//! Telemetry and structured logging for the conversion worker.

use crate::job::{JobResult, JobStatus};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{info, warn};

const TRACER_NAME: &str = "convert-worker";

/// Records telemetry for a finished job.
///
/// Emits one span and a structured log record per terminal result, for
/// monitoring conversion pipeline health: duration, page count, status, and
/// the error message for failed jobs.
pub fn record_job_result(result: &JobResult) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("convert_job");

    span.set_attribute(KeyValue::new("job_id", result.job_id.clone()));
    span.set_attribute(KeyValue::new("status", result.status.to_string()));

    if let Some(page_count) = result.metadata.page_count {
        span.set_attribute(KeyValue::new("page_count", page_count as i64));
    }
    if let Some(formats) = &result.formats {
        span.set_attribute(KeyValue::new("format_count", formats.len() as i64));
    }

    if let Some(duration_ms) = result.metadata.processing_time_ms {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms as i64));

        info!(
            job_id = %result.job_id,
            duration_ms,
            status = %result.status,
            "Conversion job finished"
        );

        // Warn if exceeding performance threshold (30 seconds)
        if duration_ms > 30_000 {
            warn!(
                job_id = %result.job_id,
                duration_ms,
                "Conversion exceeded performance threshold (30000ms)"
            );
        }
    }

    if result.status == JobStatus::Failed {
        if let Some(error) = &result.metadata.error {
            span.set_attribute(KeyValue::new("error", error.clone()));
            warn!(
                job_id = %result.job_id,
                error = %error,
                "Conversion job failed"
            );
        }
    }

    span.end();
}

/// Records a worker heartbeat for monitoring worker health.
///
/// Called by the scheduler on idle polls to signal that the worker is alive
/// even when the queue is empty.
pub fn record_worker_heartbeat(in_flight: usize) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("worker_heartbeat");

    span.set_attribute(KeyValue::new("in_flight", in_flight as i64));
    span.end();

    info!(in_flight, "Worker heartbeat");
}

/// Initializes OpenTelemetry with OTLP exporter.
///
/// This should be called once at worker startup. Reads configuration
/// from environment variables:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` - Collector endpoint (default: http://localhost:4317)
/// - `OTEL_SERVICE_NAME` - Service name (default: convert-worker)
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "convert-worker".to_string());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    global::set_tracer_provider(tracer.provider().unwrap());

    info!("Telemetry initialized: endpoint={}", endpoint);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FormatOutput, FormatResult};

    #[test]
    fn test_record_completed_result() {
        let mut formats = FormatOutput::new();
        formats.insert("markdown".to_string(), FormatResult::content("# Doc"));

        let result = JobResult::completed("job-1", formats, 2, 150);

        // Should not panic even without an initialized exporter
        record_job_result(&result);
    }

    #[test]
    fn test_record_failed_result() {
        let result = JobResult::failed("job-2", "source retrieval failed: boom", 20);

        // Should not panic and should log the error
        record_job_result(&result);
    }
}
