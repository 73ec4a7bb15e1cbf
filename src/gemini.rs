use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::report::{AnalysisProvider, AuditReport, ProviderError};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const TEMPERATURE: f64 = 0.4;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Analysis provider calling the Gemini `generateContent` endpoint with a
/// JSON response schema matching `AuditReport`.
pub struct GeminiProvider {
    model: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    pub fn request_payload(&self, url: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": audit_prompt(url)}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
                "temperature": TEMPERATURE
            }
        })
    }

    fn post(&self, payload: &Value) -> Result<String, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::Api(format!("failed to build HTTP client: {}", e)))?;

        let response = client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .map_err(|e| ProviderError::Api(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ProviderError::Api(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
            return Err(ProviderError::Api(message));
        }
        Ok(body)
    }
}

impl AnalysisProvider for GeminiProvider {
    fn analyze(&self, url: &str) -> Result<AuditReport, ProviderError> {
        info!(action = "start", component = "gemini", model = %self.model, url, "Requesting analysis");

        let body = self.post(&self.request_payload(url)).map_err(|e| {
            warn!(action = "request", component = "gemini", error = %e, "Analysis failed");
            e
        })?;
        let report = report_from_response(&body)?;

        info!(action = "complete", component = "gemini", score = report.score(), "Analysis received");
        Ok(report)
    }
}

/// Extracts the first text part of the first candidate.
pub fn response_text(body: &str) -> Result<Option<String>, ProviderError> {
    let v: Value = serde_json::from_str(body).map_err(|error| ProviderError::Parse {
        source_name: "gemini response".to_string(),
        error,
    })?;

    if let Some(error) = v.get("error") {
        let message = error["message"].as_str().unwrap_or("Unknown error");
        return Err(ProviderError::Api(message.to_string()));
    }

    Ok(v["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()))
        .map(str::to_string))
}

pub fn report_from_response(body: &str) -> Result<AuditReport, ProviderError> {
    let text = response_text(body)?
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ProviderError::Failed("No response from AI".to_string()))?;

    serde_json::from_str(&text).map_err(|error| ProviderError::Parse {
        source_name: "gemini".to_string(),
        error,
    })
}

fn audit_prompt(url: &str) -> String {
    format!(
        "You are a senior web performance and UX auditor for e-commerce shopping malls.\n\
         Analyze this URL: {url}\n\n\
         Live measurement is not possible, so run a heuristic analysis based on the likely \
         technology stack and common practice for this kind of site. Cover:\n\
         1. Performance: estimated load time, TTFB and Core Web Vitals.\n\
         2. SEO: meta tags, URL structure, heading hierarchy.\n\
         3. UX/UI: header, footer links, mobile responsiveness.\n\
         4. Security: SSL and HTTPS.\n\
         5. Competitor analysis: 2-3 likely competitors or industry leaders and what they do better.\n\n\
         Be critical but constructive. Write all titles, descriptions, summaries, metric names and \
         recommendations in Korean. Keep JSON keys in English as in the schema. The 'status' \
         field must be one of \"good\", \"warning\", \"poor\". Return only JSON matching the schema."
    )
}

fn section_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "score": {"type": "NUMBER"},
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "score": {"type": "NUMBER"},
                        "value": {"type": "STRING"},
                        "status": {"type": "STRING", "enum": ["good", "warning", "poor"]},
                        "description": {"type": "STRING"}
                    }
                }
            }
        }
    })
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "url": {"type": "STRING"},
            "timestamp": {"type": "STRING"},
            "overallScore": {"type": "NUMBER"},
            "summary": {"type": "STRING"},
            "platform": {"type": "STRING"},
            "performance": section_schema(),
            "seo": section_schema(),
            "ux": section_schema(),
            "security": section_schema(),
            "competitorAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "summary": {"type": "STRING"},
                    "items": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": {"type": "STRING", "description": "Name of a competitor or 'Industry Standard'"},
                                "comparison": {"type": "STRING", "description": "What they do better or differently"}
                            }
                        }
                    }
                }
            },
            "recommendations": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["url", "overallScore", "platform"]
    })
}
