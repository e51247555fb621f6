use std::time::Duration;

use anyhow::bail;
use opentelemetry::{Key, KeyValue, Value};
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_otlp::{OTEL_EXPORTER_OTLP_ENDPOINT, OTEL_EXPORTER_OTLP_TRACES_ENDPOINT};
use opentelemetry_sdk::{
    resource::{EnvResourceDetector, ResourceDetector, TelemetryResourceDetector},
    trace::Tracer,
    Resource,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::env::OtlpProtocol;

const OTEL_TRACING_LEVEL: &str = "KVWEB_OTEL_TRACING_LEVEL";
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
const DEFAULT_SERVICE_NAME: &str = "keyvault-web";

type OtelLayer =
    tracing_subscriber::filter::Filtered<OpenTelemetryLayer<Registry, Tracer>, EnvFilter, Registry>;

/// Constructs a layer for the tracing subscriber that sends spans to an OTEL collector.
///
/// Exporter settings come from the standard `OTEL_EXPORTER_OTLP_*` environment variables.
pub(crate) fn otel_tracing_layer(service_version: String) -> anyhow::Result<OtelLayer> {
    let resource = service_resource(service_version).merge(&Resource::from_detectors(
        Duration::from_secs(5),
        vec![
            Box::new(EnvResourceDetector::new()),
            Box::new(TelemetryResourceDetector),
        ],
    ));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(span_exporter()?)
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(resource))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    // Unset or unparsable means info.
    let env_filter =
        EnvFilter::try_from_env(OTEL_TRACING_LEVEL).unwrap_or_else(|_| EnvFilter::new("info"));

    Ok(tracing_opentelemetry::layer()
        .with_tracer(tracer)
        .with_threads(false)
        .with_filter(env_filter))
}

fn span_exporter() -> anyhow::Result<SpanExporterBuilder> {
    Ok(match OtlpProtocol::traces_protocol_from_env() {
        OtlpProtocol::Grpc => opentelemetry_otlp::new_exporter().tonic().into(),
        OtlpProtocol::HttpProtobuf => {
            let exporter = opentelemetry_otlp::new_exporter().http();
            match http_traces_endpoint(
                std::env::var(OTEL_EXPORTER_OTLP_TRACES_ENDPOINT).ok(),
                std::env::var(OTEL_EXPORTER_OTLP_ENDPOINT).ok(),
            ) {
                Some(endpoint) => exporter.with_endpoint(endpoint).into(),
                None => exporter.into(),
            }
        }
        OtlpProtocol::HttpJson => bail!("http/json OTLP protocol is not supported"),
    })
}

/// The URL the HTTP exporter should post spans to, when it has to be derived.
///
/// opentelemetry-otlp 0.15 does not append `/v1/traces` to the general endpoint
/// for the HTTP exporter. A traces-specific endpoint is used as given by the exporter itself.
fn http_traces_endpoint(traces: Option<String>, general: Option<String>) -> Option<String> {
    if traces.is_some() {
        return None;
    }
    let mut endpoint = general?;
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint.push_str("v1/traces");
    Some(endpoint)
}

/// `service.name` and `service.version` for exported spans.
fn service_resource(version: String) -> Resource {
    let from_attributes = EnvResourceDetector::new()
        .detect(Duration::from_secs(0))
        .get(Key::new("service.name"));
    Resource::new(vec![
        KeyValue::new(
            "service.name",
            service_name(std::env::var(OTEL_SERVICE_NAME).ok(), from_attributes),
        ),
        KeyValue::new("service.version", version),
    ])
}

/// `OTEL_SERVICE_NAME` wins over `service.name` in `OTEL_RESOURCE_ATTRIBUTES`,
/// which wins over the default.
fn service_name(explicit: Option<String>, from_attributes: Option<Value>) -> Value {
    explicit
        .filter(|name| !name.is_empty())
        .map(Value::from)
        .or(from_attributes)
        .unwrap_or_else(|| DEFAULT_SERVICE_NAME.into())
}
