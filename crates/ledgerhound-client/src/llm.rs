use std::time::Duration;

use ledgerhound_core::error::AppError;
use ledgerhound_core::models::{CandidateLink, ScoredLink};
use ledgerhound_core::traits::LinkClassifier;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);
const SYSTEM_PROMPT: &str = "You are an analyst identifying high-priority links from a webpage \
     to assist in finding relevant government financial information. \
     Assess each link based on its title, URL, and surrounding context. \
     Respond ONLY with valid JSON matching the requested schema.";

/// OpenAI-compatible LLM client scoring link batches for relevance.
///
/// Works with any OpenAI-compatible API, including Gemini via its
/// compatibility layer. One instance is constructed at startup and
/// injected into the orchestrator — no process-wide client state.
#[derive(Clone)]
pub struct OpenAiClassifier {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiClassifier {
    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_LLM_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT.as_secs(),
        })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaWrapper>,
}

#[derive(Serialize)]
struct JsonSchemaWrapper {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ---- Classification wire types ----

#[derive(Deserialize)]
struct ClassifiedBatch {
    links: Vec<ClassifiedLinkWire>,
}

#[derive(Deserialize)]
struct ClassifiedLinkWire {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    relevancy: f64,
    #[serde(default)]
    relevancy_explanation: String,
    #[serde(default, deserialize_with = "keyword_list")]
    high_priority_keywords: Vec<String>,
    #[serde(default, deserialize_with = "keyword_list")]
    medium_priority_keywords: Vec<String>,
}

/// Models return keyword matches as a list, a bare string, or null.
/// Normalize to an ordered list of non-empty strings right here at the
/// boundary so nothing downstream ever branches on shape.
fn keyword_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<serde_json::Value>),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    let keywords = match raw {
        None => vec![],
        Some(Raw::One(s)) => vec![s],
        Some(Raw::Many(values)) => values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
    };

    Ok(keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}

impl From<ClassifiedLinkWire> for ScoredLink {
    fn from(wire: ClassifiedLinkWire) -> Self {
        ScoredLink {
            url: wire.url,
            title: wire.title,
            // Overwritten by the orchestrator from the original candidate.
            link_text: String::new(),
            relevancy: wire.relevancy,
            relevancy_explanation: wire.relevancy_explanation,
            high_priority_keywords: wire.high_priority_keywords,
            medium_priority_keywords: wire.medium_priority_keywords,
            context: String::new(),
        }
    }
}

// ---- Prompt + response handling ----

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().replace('"', "\\\"")
}

fn build_prompt(
    batch: &[CandidateLink],
    high_priority_keywords: &[String],
    medium_priority_keywords: &[String],
) -> String {
    let mut links_text = String::new();
    for (idx, link) in batch.iter().enumerate() {
        let display_title = if link.title.is_empty() {
            clip(&link.link_text, 100)
        } else {
            clip(&link.title, 100)
        };
        links_text.push_str(&format!(
            "Link {}: URL={} Title=\"{}\" Context=\"{}\"\n",
            idx + 1,
            link.url,
            display_title,
            clip(&link.context, 200),
        ));
    }

    format!(
        "Analyze these links for government financial information:\n\n\
         Links: {links_text}\n\
         High Priority: {}\n\
         Medium Priority: {}\n\n\
         - Determine a relevancy score between 0.0 and 1.0 for each link.\n\
         - Provide a brief explanation (1-2 sentences) for each score.\n\
         - List which high and medium priority keywords each link matched.\n\
         - Return one result per input link, in the same order.",
        high_priority_keywords.join(", "),
        medium_priority_keywords.join(", "),
    )
}

/// JSON Schema for the structured batch response.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "links": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "url": {"type": "string"},
                        "title": {"type": "string"},
                        "relevancy": {"type": "number"},
                        "relevancy_explanation": {"type": "string"},
                        "high_priority_keywords": {
                            "type": "array", "items": {"type": "string"}
                        },
                        "medium_priority_keywords": {
                            "type": "array", "items": {"type": "string"}
                        }
                    },
                    "required": [
                        "url", "title", "relevancy", "relevancy_explanation",
                        "high_priority_keywords", "medium_priority_keywords"
                    ],
                    "additionalProperties": false
                }
            }
        },
        "required": ["links"],
        "additionalProperties": false
    })
}

/// Strip markdown code fences some models wrap JSON in.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Parse the model's batch response into scored links.
fn parse_batch(text: &str) -> Result<Vec<ScoredLink>, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::LlmError {
            message: "Empty response from LLM".into(),
            status_code: 200,
            retryable: false,
        });
    }

    let batch: ClassifiedBatch =
        serde_json::from_str(strip_code_fences(text)).map_err(|e| AppError::LlmError {
            message: format!("LLM returned invalid JSON: {e}"),
            status_code: 200,
            retryable: false,
        })?;

    Ok(batch.links.into_iter().map(Into::into).collect())
}

impl LinkClassifier for OpenAiClassifier {
    async fn classify(
        &self,
        batch: &[CandidateLink],
        high_priority_keywords: &[String],
        medium_priority_keywords: &[String],
    ) -> Result<Vec<ScoredLink>, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_prompt(batch, high_priority_keywords, medium_priority_keywords),
                },
            ],
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchemaWrapper {
                    name: "link_classification".to_string(),
                    strict: true,
                    schema: response_schema(),
                }),
            }),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

            if status_code == 429 {
                return Err(AppError::RateLimitExceeded);
            }

            return Err(AppError::LlmError {
                message,
                status_code,
                retryable: status_code >= 500,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse LLM response: {e}")))?;

        let content = chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("");

        parse_batch(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_batch() {
        let text = r#"{"links": [{
            "url": "https://www.example.gov/acfr",
            "title": "ACFR",
            "relevancy": 0.92,
            "relevancy_explanation": "Annual financial report link",
            "high_priority_keywords": ["ACFR", "Financial Report"],
            "medium_priority_keywords": [".pdf"]
        }]}"#;

        let links = parse_batch(text).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].relevancy, 0.92);
        assert_eq!(links[0].high_priority_keywords, vec!["ACFR", "Financial Report"]);
        assert!(links[0].context.is_empty());
    }

    #[test]
    fn strips_markdown_fences() {
        let text = "```json\n{\"links\": []}\n```";
        assert!(parse_batch(text).unwrap().is_empty());

        let text = "```\n{\"links\": []}\n```";
        assert!(parse_batch(text).unwrap().is_empty());
    }

    #[test]
    fn keyword_shapes_normalize_to_lists() {
        let text = r#"{"links": [
            {"url": "a", "relevancy": 0.5, "high_priority_keywords": "Budget",
             "medium_priority_keywords": null},
            {"url": "b", "relevancy": 0.5, "high_priority_keywords": [" ACFR ", "", 2024],
             "medium_priority_keywords": ["Finance"]}
        ]}"#;

        let links = parse_batch(text).unwrap();
        assert_eq!(links[0].high_priority_keywords, vec!["Budget"]);
        assert!(links[0].medium_priority_keywords.is_empty());
        assert_eq!(links[1].high_priority_keywords, vec!["ACFR", "2024"]);
        assert_eq!(links[1].medium_priority_keywords, vec!["Finance"]);
    }

    #[test]
    fn empty_response_is_an_error() {
        assert!(matches!(
            parse_batch("   "),
            Err(AppError::LlmError { .. })
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_batch("{\"links\": [").unwrap_err();
        match err {
            AppError::LlmError { retryable, .. } => assert!(!retryable),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn prompt_lists_links_and_keywords() {
        let batch = vec![CandidateLink {
            url: "https://www.example.gov/budget".into(),
            title: String::new(),
            link_text: "FY2024 Budget".into(),
            context: "The adopted \"FY2024\" budget".into(),
        }];
        let prompt = build_prompt(
            &batch,
            &["Budget".to_string(), "ACFR".to_string()],
            &["Finance".to_string()],
        );

        assert!(prompt.contains("Link 1: URL=https://www.example.gov/budget"));
        assert!(prompt.contains("Title=\"FY2024 Budget\""));
        assert!(prompt.contains("High Priority: Budget, ACFR"));
        assert!(prompt.contains("Medium Priority: Finance"));
        // Quotes inside context are escaped.
        assert!(prompt.contains("\\\"FY2024\\\""));
    }

    #[test]
    fn prompt_clips_long_context() {
        let batch = vec![CandidateLink {
            url: "https://www.example.gov/x".into(),
            title: "t".repeat(300),
            link_text: String::new(),
            context: "c".repeat(300),
        }];
        let prompt = build_prompt(&batch, &[], &[]);
        assert!(prompt.contains(&"t".repeat(100)));
        assert!(!prompt.contains(&"t".repeat(101)));
        assert!(prompt.contains(&"c".repeat(200)));
        assert!(!prompt.contains(&"c".repeat(201)));
    }
}
