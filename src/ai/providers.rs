use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

use crate::config::ProviderConfig;

/// Output cap for direct prompt calls.
pub const SINGLE_CALL_MAX_TOKENS: u32 = 1000;
/// Output cap for rubric generation, which needs room for the JSON payload.
pub const RUBRIC_MAX_TOKENS: u32 = 2000;

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-flash-latest";

/// Normalized outcome of one provider call. Failures are carried as data so
/// partial compare results can still render both sides.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderResult {
    pub model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ProviderResult {
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Seam over an upstream LLM so the evaluator's fallback chain can be
/// exercised without the network.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    /// Descriptive judge identity reported in rubric evaluations.
    fn judge_label(&self) -> &'static str;
    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String>;
}

/// Run a provider call and fold any failure into a structured result.
pub async fn run(provider: &dyn Provider, prompt: &str) -> ProviderResult {
    match provider.complete(prompt, SINGLE_CALL_MAX_TOKENS).await {
        Ok(text) => ProviderResult {
            model: provider.name(),
            response: Some(text),
            error: None,
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        },
        Err(e) => {
            error!(provider = provider.name(), error = %e, "provider call failed");
            ProviderResult {
                model: provider.name(),
                response: Some(format!("Failed to get response from {}", provider.name())),
                error: Some(e.to_string()),
                timestamp: None,
            }
        }
    }
}

#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Provider for GroqClient {
    fn name(&self) -> &'static str {
        "Groq"
    }

    fn judge_label(&self) -> &'static str {
        "Groq Llama 3.3"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            anyhow::bail!("GROQ_API_KEY is not configured");
        };

        let body = json!({
            "model": GROQ_MODEL,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
        });

        let response = self
            .http
            .post(GROQ_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Groq API error ({}): {}", status, text);
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Groq returned no choices"))?;
        Ok(content)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn judge_label(&self) -> &'static str {
        "Gemini Flash"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            anyhow::bail!("GEMINI_API_KEY is not configured");
        };

        let url = format!("{GEMINI_BASE}/{GEMINI_MODEL}:generateContent?key={api_key}");
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": max_tokens },
        });

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, text);
        }

        let generated: GenerateContentResponse = response.json().await?;
        let text = generated
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no candidates"))?;
        Ok(text)
    }
}

/// The two provider clients sharing one HTTP connection pool.
#[derive(Clone)]
pub struct AiClients {
    pub groq: GroqClient,
    pub gemini: GeminiClient,
}

impl AiClients {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("build http client")?;

        Ok(Self {
            groq: GroqClient {
                http: http.clone(),
                api_key: config.groq_api_key.clone(),
            },
            gemini: GeminiClient {
                http,
                api_key: config.gemini_api_key.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> AiClients {
        AiClients::new(&ProviderConfig::default()).expect("clients build")
    }

    #[test]
    fn new_builds_clients_with_judge_labels() {
        let clients = unconfigured();
        assert_eq!(clients.groq.judge_label(), "Groq Llama 3.3");
        assert_eq!(clients.gemini.judge_label(), "Gemini Flash");
    }

    #[tokio::test]
    async fn missing_groq_key_errors_without_network() {
        let clients = unconfigured();
        let err = clients
            .groq
            .complete("hello", SINGLE_CALL_MAX_TOKENS)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn missing_gemini_key_errors_without_network() {
        let clients = unconfigured();
        let err = clients
            .gemini
            .complete("hello", SINGLE_CALL_MAX_TOKENS)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn run_folds_failure_into_structured_result() {
        let clients = unconfigured();
        let result = run(&clients.groq, "hello").await;
        assert_eq!(result.model, "Groq");
        assert!(result.is_err());
        assert_eq!(
            result.response.as_deref(),
            Some("Failed to get response from Groq")
        );
        assert!(result.timestamp.is_none());
    }

    #[test]
    fn error_result_omits_null_fields_in_json() {
        let result = ProviderResult {
            model: "Gemini",
            response: Some("hi".into()),
            error: None,
            timestamp: Some("2026-01-01T00:00:00Z".into()),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains("timestamp"));
    }
}
