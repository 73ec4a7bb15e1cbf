use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    #[default]
    Good,
    Warning,
    Poor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditMetric {
    pub name: String,
    pub score: f64,
    pub value: String,
    pub status: MetricStatus,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    pub title: String,
    pub score: f64,
    pub items: Vec<AuditMetric>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorItem {
    pub name: String,
    pub comparison: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorAnalysis {
    pub summary: String,
    pub items: Vec<CompetitorItem>,
}

/// Structured report returned by the analysis provider. Only `url`,
/// `overallScore` and `platform` are read when recording history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub url: String,
    pub overall_score: f64,
    pub platform: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub performance: AuditSection,
    #[serde(default)]
    pub seo: AuditSection,
    #[serde(default)]
    pub ux: AuditSection,
    #[serde(default)]
    pub security: AuditSection,
    #[serde(default)]
    pub competitor_analysis: CompetitorAnalysis,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AuditReport {
    pub fn new(url: impl Into<String>, overall_score: f64, platform: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            overall_score,
            platform: platform.into(),
            timestamp: String::new(),
            summary: String::new(),
            performance: AuditSection::default(),
            seo: AuditSection::default(),
            ux: AuditSection::default(),
            security: AuditSection::default(),
            competitor_analysis: CompetitorAnalysis::default(),
            recommendations: Vec::new(),
        }
    }

    /// Overall score rounded and clamped to 0-100.
    pub fn score(&self) -> u8 {
        clamp_score(self.overall_score)
    }

    pub fn sections(&self) -> [&AuditSection; 4] {
        [&self.performance, &self.seo, &self.ux, &self.security]
    }
}

pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read report from {source_name}: {error}")]
    Read {
        source_name: String,
        #[source]
        error: io::Error,
    },
    #[error("report from {source_name} is not valid JSON: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: serde_json::Error,
    },
    #[error("analysis failed: {0}")]
    Failed(String),
    #[error("analysis API error: {0}")]
    Api(String),
}

/// Produces an audit report for a URL.
pub trait AnalysisProvider {
    fn analyze(&self, url: &str) -> Result<AuditReport, ProviderError>;
}

impl<P: AnalysisProvider + ?Sized> AnalysisProvider for Box<P> {
    fn analyze(&self, url: &str) -> Result<AuditReport, ProviderError> {
        (**self).analyze(url)
    }
}

/// Where a report JSON is read from.
#[derive(Debug, Clone)]
pub enum ReportSource {
    File(PathBuf),
    Stdin,
}

impl From<PathBuf> for ReportSource {
    fn from(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            ReportSource::Stdin
        } else {
            ReportSource::File(path)
        }
    }
}

impl ReportSource {
    fn name(&self) -> String {
        match self {
            ReportSource::File(path) => format!("{:?}", path),
            ReportSource::Stdin => "stdin".to_string(),
        }
    }
}

/// Reads a report generated elsewhere (file, or stdin for `-`).
pub struct ReportFileProvider {
    source: ReportSource,
}

impl ReportFileProvider {
    pub fn new(source: impl Into<ReportSource>) -> Self {
        Self {
            source: source.into(),
        }
    }

    fn read(&self) -> io::Result<String> {
        match &self.source {
            ReportSource::File(path) => fs::read_to_string(path),
            ReportSource::Stdin => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

impl AnalysisProvider for ReportFileProvider {
    fn analyze(&self, url: &str) -> Result<AuditReport, ProviderError> {
        let source_name = self.source.name();
        info!(action = "load", component = "report_provider", source = %source_name, url, "Loading audit report");

        let text = self.read().map_err(|error| ProviderError::Read {
            source_name: source_name.clone(),
            error,
        })?;
        if text.trim().is_empty() {
            return Err(ProviderError::Failed(format!(
                "no report content in {}",
                source_name
            )));
        }

        serde_json::from_str(&text).map_err(|error| ProviderError::Parse { source_name, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn score_is_rounded_and_clamped() {
        assert_eq!(clamp_score(84.6), 85);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(130.0), 100);
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(f64::INFINITY), 100);
    }

    #[test]
    fn parses_full_report() {
        let json = r#"{
            "url": "https://shop.example.com",
            "timestamp": "2024-05-01T10:00:00Z",
            "overallScore": 72,
            "summary": "Decent",
            "platform": "Shopify",
            "performance": {"title": "Performance", "score": 60, "items": [
                {"name": "TTFB", "score": 55, "value": "0.9s", "status": "warning", "description": "slow"}
            ]},
            "seo": {"title": "SEO", "score": 80, "items": []},
            "ux": {"title": "UX", "score": 75, "items": []},
            "security": {"title": "Security", "score": 90, "items": [
                {"name": "HTTPS", "score": 100, "value": "HTTPS", "status": "good", "description": "ok"}
            ]},
            "competitorAnalysis": {"summary": "Behind", "items": [{"name": "Coupang", "comparison": "1-click checkout"}]},
            "recommendations": ["Compress images"]
        }"#;

        let report: AuditReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.score(), 72);
        assert_eq!(report.platform, "Shopify");
        assert_eq!(report.performance.items[0].status, MetricStatus::Warning);
        assert_eq!(report.competitor_analysis.items[0].name, "Coupang");
        assert_eq!(report.sections().len(), 4);
    }

    #[test]
    fn minimal_report_defaults_missing_sections() {
        let json = r#"{"url": "https://a.example", "overallScore": 50.4, "platform": "Custom"}"#;
        let report: AuditReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.score(), 50);
        assert!(report.recommendations.is_empty());
        assert!(report.seo.items.is_empty());
    }

    #[test]
    fn file_provider_reads_and_rejects_garbage() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(
            good,
            r#"{{"url": "https://a.example", "overallScore": 91, "platform": "Cafe24"}}"#
        )
        .unwrap();
        let report = ReportFileProvider::new(good.path().to_path_buf())
            .analyze("https://a.example")
            .unwrap();
        assert_eq!(report.score(), 91);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let err = ReportFileProvider::new(bad.path().to_path_buf())
            .analyze("https://a.example")
            .unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));

        let missing = ReportFileProvider::new(PathBuf::from("/definitely/not/here.json"))
            .analyze("https://a.example")
            .unwrap_err();
        assert!(matches!(missing, ProviderError::Read { .. }));
    }

    #[test]
    fn dash_means_stdin() {
        assert!(matches!(
            ReportSource::from(PathBuf::from("-")),
            ReportSource::Stdin
        ));
    }
}
