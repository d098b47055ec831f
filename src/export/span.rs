//! Span records produced by the host tracer and consumed by the exporter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    #[default]
    Unspecified,
    Server,
    Client,
}

/// Outcome of a traced operation. Discriminants are the wire codes 0..=16.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CanonicalCode {
    #[default]
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

const CANONICAL_CODES: [CanonicalCode; 17] = [
    CanonicalCode::Ok,
    CanonicalCode::Cancelled,
    CanonicalCode::Unknown,
    CanonicalCode::InvalidArgument,
    CanonicalCode::DeadlineExceeded,
    CanonicalCode::NotFound,
    CanonicalCode::AlreadyExists,
    CanonicalCode::PermissionDenied,
    CanonicalCode::ResourceExhausted,
    CanonicalCode::FailedPrecondition,
    CanonicalCode::Aborted,
    CanonicalCode::OutOfRange,
    CanonicalCode::Unimplemented,
    CanonicalCode::Internal,
    CanonicalCode::Unavailable,
    CanonicalCode::DataLoss,
    CanonicalCode::Unauthenticated,
];

impl CanonicalCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalCode::Ok => "OK",
            CanonicalCode::Cancelled => "CANCELLED",
            CanonicalCode::Unknown => "UNKNOWN",
            CanonicalCode::InvalidArgument => "INVALID_ARGUMENT",
            CanonicalCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            CanonicalCode::NotFound => "NOT_FOUND",
            CanonicalCode::AlreadyExists => "ALREADY_EXISTS",
            CanonicalCode::PermissionDenied => "PERMISSION_DENIED",
            CanonicalCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            CanonicalCode::FailedPrecondition => "FAILED_PRECONDITION",
            CanonicalCode::Aborted => "ABORTED",
            CanonicalCode::OutOfRange => "OUT_OF_RANGE",
            CanonicalCode::Unimplemented => "UNIMPLEMENTED",
            CanonicalCode::Internal => "INTERNAL",
            CanonicalCode::Unavailable => "UNAVAILABLE",
            CanonicalCode::DataLoss => "DATA_LOSS",
            CanonicalCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl TryFrom<u32> for CanonicalCode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        CANONICAL_CODES.get(code as usize).copied().ok_or(code)
    }
}

impl std::fmt::Display for CanonicalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    pub code: CanonicalCode,
    pub message: Option<String>,
}

impl SpanStatus {
    pub fn new(code: CanonicalCode) -> Self {
        Self { code, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Attribute value attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// One ended unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: String,
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: SystemTime,
    pub duration_millis: f64,
    pub attributes: HashMap<String, AttributeValue>,
    pub status: SpanStatus,
}

impl Span {
    pub fn new(trace_id: impl Into<String>, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            id: id.into(),
            parent_id: None,
            name: name.into(),
            kind: SpanKind::Unspecified,
            start_time: SystemTime::UNIX_EPOCH,
            duration_millis: 0.0,
            attributes: HashMap::new(),
            status: SpanStatus::default(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_timing(mut self, start_time: SystemTime, duration_millis: f64) -> Self {
        self.start_time = start_time;
        self.duration_millis = duration_millis;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// True when the span has no parent. An empty parent id counts as none.
    pub fn is_root(&self) -> bool {
        is_root_parent(self.parent_id.as_deref())
    }
}

/// A missing or empty parent id marks a root span.
pub fn is_root_parent(parent_id: Option<&str>) -> bool {
    parent_id.map_or(true, str::is_empty)
}

/// A root span together with the child spans recorded under it, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSpan {
    pub root: Span,
    pub spans: Vec<Span>,
}

impl RootSpan {
    pub fn new(root: Span) -> Self {
        Self { root, spans: Vec::new() }
    }

    pub fn with_child(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    /// Root first, then the children in their recorded order.
    pub fn into_spans(self) -> impl Iterator<Item = Span> {
        std::iter::once(self.root).chain(self.spans)
    }

    /// Number of spans in the tree, root included.
    pub fn len(&self) -> usize {
        1 + self.spans.len()
    }
}
