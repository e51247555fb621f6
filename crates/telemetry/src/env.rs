use std::env::VarError;

use opentelemetry_otlp::{
    OTEL_EXPORTER_OTLP_ENDPOINT, OTEL_EXPORTER_OTLP_PROTOCOL, OTEL_EXPORTER_OTLP_TRACES_ENDPOINT,
};

const OTEL_SDK_DISABLED: &str = "OTEL_SDK_DISABLED";
const OTEL_EXPORTER_OTLP_TRACES_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_TRACES_PROTOCOL";

/// Returns a boolean indicating if the OTEL tracing layer should be enabled.
///
/// It is considered enabled if any of the following environment variables are set and not empty:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`
/// - `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT`
///
/// Note that this is overridden if `OTEL_SDK_DISABLED` is set and not empty.
pub(crate) fn otel_tracing_enabled() -> bool {
    any_vars_set(&[
        OTEL_EXPORTER_OTLP_ENDPOINT,
        OTEL_EXPORTER_OTLP_TRACES_ENDPOINT,
    ]) && !any_vars_set(&[OTEL_SDK_DISABLED])
}

fn any_vars_set(enabling_vars: &[&str]) -> bool {
    enabling_vars
        .iter()
        .any(|key| std::env::var_os(key).is_some_and(|val| !val.is_empty()))
}

/// The protocol to use for OTLP exporter.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum OtlpProtocol {
    Grpc,
    HttpProtobuf,
    HttpJson,
}

impl OtlpProtocol {
    /// Returns the protocol to be used for exporting traces as defined by the environment.
    pub(crate) fn traces_protocol_from_env() -> Self {
        Self::protocol_from_env(
            std::env::var(OTEL_EXPORTER_OTLP_TRACES_PROTOCOL),
            std::env::var(OTEL_EXPORTER_OTLP_PROTOCOL),
        )
    }

    fn protocol_from_env(
        specific_protocol: Result<String, VarError>,
        general_protocol: Result<String, VarError>,
    ) -> Self {
        let protocol = specific_protocol
            .or(general_protocol)
            .unwrap_or_else(|_| "http/protobuf".to_string());

        match protocol.as_str() {
            "grpc" => Self::Grpc,
            "http/protobuf" => Self::HttpProtobuf,
            "http/json" => Self::HttpJson,
            s => {
                tracing::warn!("'{s}' is not a valid OTLP protocol, defaulting to http/protobuf");
                Self::HttpProtobuf
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_protocol_wins() {
        assert_eq!(
            OtlpProtocol::protocol_from_env(Ok("grpc".into()), Ok("http/json".into())),
            OtlpProtocol::Grpc
        );
    }

    #[test]
    fn falls_back_to_general_then_default() {
        assert_eq!(
            OtlpProtocol::protocol_from_env(Err(VarError::NotPresent), Ok("http/json".into())),
            OtlpProtocol::HttpJson
        );
        assert_eq!(
            OtlpProtocol::protocol_from_env(Err(VarError::NotPresent), Err(VarError::NotPresent)),
            OtlpProtocol::HttpProtobuf
        );
    }

    #[test]
    fn unknown_protocol_defaults_to_http_protobuf() {
        assert_eq!(
            OtlpProtocol::protocol_from_env(Ok("carrier-pigeon".into()), Err(VarError::NotPresent)),
            OtlpProtocol::HttpProtobuf
        );
    }
}
