// Metric point domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Line,
    Bar,
    Pie,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Line => "line",
            MetricType::Bar => "bar",
            MetricType::Pie => "pie",
        }
    }

    pub fn parse(s: &str) -> Option<MetricType> {
        match s {
            "line" => Some(MetricType::Line),
            "bar" => Some(MetricType::Bar),
            "pie" => Some(MetricType::Pie),
            _ => None,
        }
    }
}

/// A single immutable metric observation. Ids are assigned by the store on
/// insert; points are never updated, only removed by retention cleanup.
/// `category` is present iff the type is bar or pie, which the constructors
/// enforce.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub metric_type: MetricType,
    pub category: Option<String>,
    pub value: f64,
    pub metadata: Option<String>,
}

impl MetricPoint {
    pub fn line(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            metric_type: MetricType::Line,
            category: None,
            value,
            metadata: None,
        }
    }

    pub fn bar(timestamp: DateTime<Utc>, category: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp,
            metric_type: MetricType::Bar,
            category: Some(category.into()),
            value,
            metadata: None,
        }
    }

    pub fn pie(timestamp: DateTime<Utc>, category: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp,
            metric_type: MetricType::Pie,
            category: Some(category.into()),
            value,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_type_round_trip() {
        for t in [MetricType::Line, MetricType::Bar, MetricType::Pie] {
            assert_eq!(MetricType::parse(t.as_str()), Some(t));
        }
        assert_eq!(MetricType::parse("gauge"), None);
    }

    #[test]
    fn test_constructors_set_category() {
        let now = Utc::now();
        assert!(MetricPoint::line(now, 1.0).category.is_none());
        assert_eq!(
            MetricPoint::bar(now, "search", 2.0).category.as_deref(),
            Some("search")
        );
        assert_eq!(
            MetricPoint::pie(now, "graph", 3.0).category.as_deref(),
            Some("graph")
        );
    }
}
