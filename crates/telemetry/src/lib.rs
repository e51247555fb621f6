//! Process-wide logging and tracing set-up.
//!
//! Logs always go to stderr through a `tracing_subscriber` fmt layer filtered
//! by `RUST_LOG`. When an OTLP endpoint is configured in the environment,
//! spans are additionally exported to an OpenTelemetry collector.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod env;
mod traces;

/// Initializes the global tracing subscriber.
///
/// `service_version` is reported as `service.version` on exported spans.
/// Returns a guard that flushes pending spans when dropped.
pub fn init(service_version: String) -> anyhow::Result<ShutdownGuard> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_filter(
            EnvFilter::from_default_env()
                .add_directive("hyper=warn".parse()?)
                .add_directive("azure_core=warn".parse()?),
        );

    let otel_tracing_layer = if env::otel_tracing_enabled() {
        Some(traces::otel_tracing_layer(service_version)?)
    } else {
        None
    };

    registry()
        .with(otel_tracing_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(ShutdownGuard)
}

/// An RAII guard for the OpenTelemetry pipeline.
///
/// Shutdown of the tracer provider happens on `Drop`.
#[must_use]
pub struct ShutdownGuard;

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Give tracer provider a chance to flush any pending traces.
        opentelemetry::global::shutdown_tracer_provider();
    }
}
