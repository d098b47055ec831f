//! Metric descriptors and their normalization.
//!
//! Application code describes metrics either with a bare name or with a full
//! [`MetricDescriptor`]. Both are folded into [`MetricSpec`] and normalized into a
//! [`MetricType`] plus canonical [`MetricOptions`] before anything reaches the
//! metric service.

use super::error::MetricError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Meter,
    /// Alias of [`MetricType::Gauge`].
    Metric,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Meter => "meter",
            MetricType::Metric => "metric",
        }
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            "histogram" => Ok(MetricType::Histogram),
            "meter" => Ok(MetricType::Meter),
            "metric" => Ok(MetricType::Metric),
            other => Err(other.to_string()),
        }
    }
}

/// Aggregation a histogram reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    Min,
    Max,
    Sum,
    Count,
    Variance,
    #[default]
    Mean,
    Stddev,
    Median,
    P75,
    P95,
    P99,
    P999,
}

/// Loosely typed metric description as written by application code.
///
/// `kind` is kept as a string so unknown types can be reported by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub unit: Option<String>,
    pub historic: Option<bool>,
    pub measurement: Option<Measurement>,
    /// Meter timeframe in seconds.
    pub timeframe: Option<u64>,
    /// Meter sample window in seconds.
    pub samples: Option<u64>,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, kind: MetricType) -> Self {
        self.kind = Some(kind.as_str().to_string());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }
}

/// Canonical options handed to the metric service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOptions {
    pub name: String,
    pub id: Option<String>,
    pub unit: Option<String>,
    pub historic: Option<bool>,
    pub measurement: Option<Measurement>,
    pub timeframe: Option<u64>,
    pub samples: Option<u64>,
}

impl MetricOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            unit: None,
            historic: None,
            measurement: None,
            timeframe: None,
            samples: None,
        }
    }
}

/// A bare name or a full descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSpec {
    Name(String),
    Descriptor(MetricDescriptor),
}

impl From<&str> for MetricSpec {
    fn from(name: &str) -> Self {
        MetricSpec::Name(name.to_string())
    }
}

impl From<String> for MetricSpec {
    fn from(name: String) -> Self {
        MetricSpec::Name(name)
    }
}

impl From<MetricDescriptor> for MetricSpec {
    fn from(descriptor: MetricDescriptor) -> Self {
        MetricSpec::Descriptor(descriptor)
    }
}

impl MetricSpec {
    pub fn name(&self) -> Option<&str> {
        match self {
            MetricSpec::Name(name) => Some(name),
            MetricSpec::Descriptor(d) => d.name.as_deref(),
        }
    }

    /// Resolves the metric type (gauge when unset) and the canonical options.
    pub fn normalize(self) -> Result<(MetricType, MetricOptions), MetricError> {
        let kind = match &self {
            MetricSpec::Name(_) => None,
            MetricSpec::Descriptor(d) => d.kind.clone(),
        };
        let options = self.into_options()?;
        let kind = match kind {
            None => MetricType::Gauge,
            Some(kind) => kind.parse().map_err(|kind| MetricError::UnknownType {
                kind,
                name: options.name.clone(),
            })?,
        };
        Ok((kind, options))
    }

    /// Converts to canonical options without looking at the `type` field.
    pub fn into_options(self) -> Result<MetricOptions, MetricError> {
        match self {
            MetricSpec::Name(name) => Ok(MetricOptions::new(name)),
            MetricSpec::Descriptor(d) => {
                let name = d.name.ok_or(MetricError::MissingName)?;
                Ok(MetricOptions {
                    name,
                    id: d.id,
                    unit: d.unit,
                    historic: d.historic,
                    measurement: d.measurement,
                    timeframe: d.timeframe,
                    samples: d.samples,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_is_a_gauge() {
        let (kind, options) = MetricSpec::from("requests").normalize().unwrap();
        assert_eq!(kind, MetricType::Gauge);
        assert_eq!(options.name, "requests");
    }

    #[test]
    fn test_missing_type_defaults_to_gauge() {
        let (kind, _) = MetricSpec::from(MetricDescriptor::new("heap"))
            .normalize()
            .unwrap();
        assert_eq!(kind, MetricType::Gauge);
    }

    #[test]
    fn test_unknown_type_is_reported_with_name() {
        let descriptor = MetricDescriptor {
            kind: Some("bogus".into()),
            ..MetricDescriptor::new("b")
        };
        let err = MetricSpec::from(descriptor).normalize().unwrap_err();
        assert_eq!(
            err,
            MetricError::UnknownType {
                kind: "bogus".into(),
                name: "b".into()
            }
        );
        assert_eq!(err.to_string(), "Invalid metric type bogus for metric b");
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let descriptor = MetricDescriptor::default().with_type(MetricType::Counter);
        let spec = MetricSpec::from(descriptor);
        assert_eq!(spec.name(), None);
        assert_eq!(spec.normalize().unwrap_err(), MetricError::MissingName);
    }

    #[test]
    fn test_spec_name_from_either_form() {
        assert_eq!(MetricSpec::from("rps").name(), Some("rps"));
        assert_eq!(MetricSpec::from(MetricDescriptor::new("heap")).name(), Some("heap"));
    }

    #[test]
    fn test_deserialize_string_or_descriptor() {
        let specs: Vec<MetricSpec> = serde_json::from_str(
            r#"["latency", {"name": "rps", "type": "meter", "timeframe": 60}]"#,
        )
        .unwrap();
        assert_eq!(specs[0], MetricSpec::Name("latency".into()));
        let (kind, options) = specs[1].clone().normalize().unwrap();
        assert_eq!(kind, MetricType::Meter);
        assert_eq!(options.timeframe, Some(60));
    }
}
