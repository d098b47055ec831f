//! Translation of [`Span`] records into the Zipkin-shaped wire record.

use super::span::{is_root_parent, Span, SpanKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

pub const RESULT_CODE_TAG: &str = "result.code";
pub const RESULT_MESSAGE_TAG: &str = "result.message";

/// Span kind as written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireKind {
    Client,
    Server,
    Unknown,
}

impl From<SpanKind> for WireKind {
    fn from(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Client => WireKind::Client,
            SpanKind::Server => WireKind::Server,
            SpanKind::Unspecified => WireKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEndpoint {
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedSpan {
    pub trace_id: String,
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub kind: WireKind,
    /// Start time in microseconds since the epoch.
    pub timestamp: u64,
    /// Duration in microseconds.
    pub duration: u64,
    pub debug: bool,
    pub shared: bool,
    pub local_endpoint: LocalEndpoint,
    pub tags: BTreeMap<String, String>,
}

impl TranslatedSpan {
    /// An outgoing call with no parent span.
    pub fn is_root_client(&self) -> bool {
        self.kind == WireKind::Client && is_root_parent(self.parent_id.as_deref())
    }
}

/// Builds the wire record for `span`.
///
/// `result.code` is injected from the status unless the span already carries a
/// string-valued `result.code` attribute.
pub fn translate_span(span: Span, service_name: &str) -> TranslatedSpan {
    let millis = span
        .start_time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let timestamp = u64::try_from(millis)
        .unwrap_or(u64::MAX)
        .saturating_mul(1000);
    let duration = (span.duration_millis * 1000.0).round().max(0.0) as u64;

    let has_string_code = span
        .attributes
        .get(RESULT_CODE_TAG)
        .and_then(|value| value.as_str())
        .is_some();

    let mut tags: BTreeMap<String, String> = span
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect();

    if !has_string_code {
        tags.insert(RESULT_CODE_TAG.to_string(), span.status.code.as_str().to_string());
    }
    if let Some(message) = &span.status.message {
        tags.insert(RESULT_MESSAGE_TAG.to_string(), message.clone());
    }

    TranslatedSpan {
        trace_id: span.trace_id,
        name: span.name,
        id: span.id,
        parent_id: span.parent_id,
        kind: span.kind.into(),
        timestamp,
        duration,
        debug: false,
        shared: false,
        local_endpoint: LocalEndpoint {
            service_name: service_name.to_string(),
        },
        tags,
    }
}
