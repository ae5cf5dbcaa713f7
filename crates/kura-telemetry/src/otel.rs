//! OTLP export layer and span sampling.

use opentelemetry::trace::{
    Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceId, TraceState,
    TracerProvider as _,
};
use opentelemetry::{Context, KeyValue, global};
use opentelemetry_otlp::SpanExporter;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider, ShouldSample, SpanLimits};
use tracing_opentelemetry::OpenTelemetryLayer;

/// Shuts down the tracer provider on drop, flushing pending spans.
pub struct OtelGuard {
    provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("OTel shutdown error: {e}");
        }
    }
}

/// Build an OpenTelemetry tracing layer and its guard.
///
/// The layer plugs into `tracing_subscriber::registry()`. Hold the guard for
/// the life of the process.
pub fn otel_layer<S>(
    service_name: &str,
) -> Result<(OpenTelemetryLayer<S, SdkTracer>, OtelGuard), Box<dyn std::error::Error + Send + Sync>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let exporter = SpanExporter::builder().with_tonic().build()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(KuraSampler)
        .with_resource(resource)
        .with_span_limits(SpanLimits::default())
        .build();

    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer("kura");
    let layer = tracing_opentelemetry::layer().with_tracer(tracer);

    Ok((layer, OtelGuard { provider }))
}

/// Sampling rate for a span name.
///
/// | Prefix               | Rate |
/// |----------------------|------|
/// | `multi.*`            | 100% |
/// | `ipfs.*`, `mfs.*`    | 100% |
/// | `local.*`, `memory.*`| 10%  |
/// | other                | 10%  |
pub fn sample_rate(name: &str) -> f64 {
    if name.starts_with("multi") || name.starts_with("ipfs") || name.starts_with("mfs") {
        1.0
    } else {
        0.1
    }
}

/// Sampler that follows sampled parents, keeps errors, and otherwise
/// applies [`sample_rate`].
#[derive(Debug, Clone)]
struct KuraSampler;

impl ShouldSample for KuraSampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        if let Some(cx) = parent_context {
            let parent_span = cx.span();
            let parent_ctx = parent_span.span_context();
            if parent_ctx.is_sampled() {
                return SamplingResult {
                    decision: SamplingDecision::RecordAndSample,
                    attributes: vec![],
                    trace_state: parent_ctx.trace_state().clone(),
                };
            }
        }

        let is_error = attributes.iter().any(|kv| {
            (kv.key.as_str() == "otel.status_code" && kv.value.as_str() == "ERROR")
                || (kv.key.as_str() == "error" && kv.value.as_str() == "true")
        });
        if is_error {
            return SamplingResult {
                decision: SamplingDecision::RecordAndSample,
                attributes: vec![],
                trace_state: TraceState::default(),
            };
        }

        Sampler::TraceIdRatioBased(sample_rate(name)).should_sample(
            parent_context,
            trace_id,
            name,
            span_kind,
            attributes,
            links,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_by_prefix() {
        assert_eq!(sample_rate("multi.read"), 1.0);
        assert_eq!(sample_rate("multi.member"), 1.0);
        assert_eq!(sample_rate("ipfs.write"), 1.0);
        assert_eq!(sample_rate("mfs.read"), 1.0);
        assert_eq!(sample_rate("local.read"), 0.1);
        assert_eq!(sample_rate("memory.write"), 0.1);
        assert_eq!(sample_rate("something.else"), 0.1);
    }

    #[test]
    fn test_error_spans_always_sampled() {
        let attrs = [KeyValue::new("otel.status_code", "ERROR")];
        let result = KuraSampler.should_sample(
            None,
            TraceId::from_bytes([7; 16]),
            "local.read",
            &SpanKind::Internal,
            &attrs,
            &[],
        );
        assert!(matches!(result.decision, SamplingDecision::RecordAndSample));
    }
}
