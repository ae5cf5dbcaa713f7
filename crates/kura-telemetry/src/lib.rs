//! Tracing setup for kura binaries.
//!
//! [`init`] installs a `tracing` subscriber that logs to stderr, filtered by
//! `RUST_LOG` (default `info`). Built with the `telemetry` feature, it also
//! exports spans over OTLP when the standard OTel environment asks for it:
//!
//! ```bash
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 kura read notes.txt
//! ```
//!
//! Set `OTEL_SDK_DISABLED=true` to turn export off even when an endpoint is set.

#[cfg(feature = "telemetry")]
mod otel;

#[cfg(feature = "telemetry")]
pub use otel::{OtelGuard, otel_layer, sample_rate};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps exporters alive; spans are flushed when it drops.
#[must_use = "dropping the guard stops span export"]
#[derive(Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    _otel: Option<OtelGuard>,
}

/// Check whether OTel export should be enabled.
///
/// True when `OTEL_SDK_DISABLED` is not `"true"` and either
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set or `OTEL_TRACES_EXPORTER` names
/// something other than `"none"`.
pub fn otel_enabled() -> bool {
    if std::env::var("OTEL_SDK_DISABLED")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
    {
        return false;
    }

    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        return true;
    }

    if let Ok(exporter) = std::env::var("OTEL_TRACES_EXPORTER") {
        return !exporter.eq_ignore_ascii_case("none");
    }

    false
}

/// Install the global subscriber for `service_name`.
///
/// OTLP export needs a running Tokio runtime; call this from inside one.
pub fn init(service_name: &str) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    #[cfg(feature = "telemetry")]
    {
        if otel_enabled() {
            match otel_layer(service_name) {
                Ok((layer, guard)) => {
                    registry.with(layer).init();
                    return TelemetryGuard { _otel: Some(guard) };
                }
                Err(e) => eprintln!("OTel export disabled: {e}"),
            }
        }
    }

    registry.init();
    tracing::debug!(service = service_name, otel = otel_enabled(), "tracing initialized");
    TelemetryGuard::default()
}
