use crate::capability::{AnswerMode, Capability};
use crate::error::{AiError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Characters of the user prompt echoed by the heuristic reply.
pub const FALLBACK_EXCERPT_CHARS: usize = 4000;
const FALLBACK_HEADER: &str = "[AI not configured] heuristic result:\n";

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CLAUDE_MODEL.to_string(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A remote engine that turns a system/user prompt pair into text.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;
}

/// Anthropic Messages API engine.
pub struct AnthropicEngine {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicEngine {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AiError::NotConfigured("ANTHROPIC_API_KEY is not set".to_string()))?
            .to_string();

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn extract_text(response: MessagesResponse) -> Result<String> {
    let texts: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .filter(|text| !text.is_empty())
        .collect();
    if texts.is_empty() {
        return Err(AiError::InvalidResponse(
            "response contained no text blocks".to_string(),
        ));
    }
    Ok(texts.join("\n"))
}

#[async_trait]
impl CompletionEngine for AnthropicEngine {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            system,
            messages: [ChatMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        extract_text(response.json::<MessagesResponse>().await?)
    }
}

/// Text produced by [`TextGenerator::ask`], tagged with the mode that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub text: String,
    pub mode: AnswerMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Text generation that prefers the remote engine and falls back to a templated reply.
pub struct TextGenerator {
    capability: Capability,
    engine: Option<Arc<dyn CompletionEngine>>,
}

impl TextGenerator {
    /// Probe the engine once: ready iff a credential is configured and the HTTP client builds.
    /// No network traffic happens here.
    pub fn new(config: &GenerationConfig) -> Self {
        match AnthropicEngine::new(config) {
            Ok(engine) => {
                log::info!("Text generation ready (model {})", engine.model());
                Self {
                    capability: Capability::Ready {
                        model: engine.model().to_string(),
                    },
                    engine: Some(Arc::new(engine)),
                }
            }
            Err(err) => {
                log::info!("Text generation falls back to heuristics: {err}");
                Self::unavailable(err.to_string())
            }
        }
    }

    pub fn with_engine(engine: Arc<dyn CompletionEngine>, model: impl Into<String>) -> Self {
        Self {
            capability: Capability::Ready {
                model: model.into(),
            },
            engine: Some(engine),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            capability: Capability::unavailable(reason),
            engine: None,
        }
    }

    /// Re-run the capability probe with a new configuration.
    pub fn reinitialize(&mut self, config: &GenerationConfig) {
        *self = Self::new(config);
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn available(&self) -> bool {
        self.capability.is_ready()
    }

    /// Ask the engine, or answer heuristically when it is unavailable or fails.
    ///
    /// The engine call runs on its own task so a slow reply never stalls the caller's task.
    pub async fn ask(&self, system: &str, user: &str, max_tokens: u32) -> Generation {
        let Some(engine) = self.engine.as_ref().map(Arc::clone) else {
            return heuristic_generation(user);
        };

        let system_owned = system.to_string();
        let user_owned = user.to_string();
        let handle = tokio::spawn(async move {
            engine
                .complete(&system_owned, &user_owned, max_tokens)
                .await
        });

        match handle.await {
            Ok(Ok(text)) => Generation {
                text,
                mode: AnswerMode::Ai,
                model: self.capability.model().map(str::to_string),
            },
            Ok(Err(err)) => {
                log::warn!("Text generation failed, answering heuristically: {err}");
                heuristic_generation(user)
            }
            Err(err) => {
                log::warn!("Text generation task aborted, answering heuristically: {err}");
                heuristic_generation(user)
            }
        }
    }
}

fn heuristic_generation(user: &str) -> Generation {
    Generation {
        text: heuristic_reply(user),
        mode: AnswerMode::Heuristic,
        model: None,
    }
}

/// Deterministic reply that echoes the head of the user prompt.
pub fn heuristic_reply(user: &str) -> String {
    let excerpt: String = user.chars().take(FALLBACK_EXCERPT_CHARS).collect();
    format!("{FALLBACK_HEADER}{excerpt}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionEngine for EchoEngine {
        async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{system}|{user}|{max_tokens}"))
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl CompletionEngine for FailingEngine {
        async fn complete(&self, _system: &str, _user: &str, _max_tokens: u32) -> Result<String> {
            Err(AiError::Status {
                status: 529,
                body: "overloaded".to_string(),
            })
        }
    }

    #[test]
    fn missing_key_is_unavailable() {
        let generator = TextGenerator::new(&GenerationConfig {
            api_key: Some("   ".to_string()),
            ..GenerationConfig::default()
        });
        assert!(!generator.available());
        assert_eq!(
            generator.capability(),
            &Capability::unavailable("not configured: ANTHROPIC_API_KEY is not set")
        );
    }

    #[test]
    fn configured_key_is_ready_without_network() {
        let generator = TextGenerator::new(&GenerationConfig {
            api_key: Some("sk-test".to_string()),
            model: "claude-test".to_string(),
            ..GenerationConfig::default()
        });
        assert!(generator.available());
        assert_eq!(generator.capability().model(), Some("claude-test"));
    }

    #[test]
    fn reinitialize_reprobes() {
        let mut generator = TextGenerator::new(&GenerationConfig::default());
        assert!(!generator.available());
        generator.reinitialize(&GenerationConfig {
            api_key: Some("sk-test".to_string()),
            ..GenerationConfig::default()
        });
        assert!(generator.available());
    }

    #[tokio::test]
    async fn unavailable_generator_answers_heuristically() {
        let generator = TextGenerator::unavailable("no key");
        let answer = generator.ask("system", "PoC for CVE-2021-44228", 800).await;
        assert_eq!(answer.mode, AnswerMode::Heuristic);
        assert!(answer.text.contains("CVE-2021-44228"));
        assert!(answer.model.is_none());
    }

    #[tokio::test]
    async fn ready_generator_uses_the_engine() {
        let engine = Arc::new(EchoEngine {
            calls: AtomicUsize::new(0),
        });
        let generator = TextGenerator::with_engine(engine.clone(), "echo");
        let answer = generator.ask("sys", "user", 64).await;
        assert_eq!(answer.mode, AnswerMode::Ai);
        assert_eq!(answer.text, "sys|user|64");
        assert_eq!(answer.model.as_deref(), Some("echo"));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn engine_failure_degrades_instead_of_erroring() {
        let generator = TextGenerator::with_engine(Arc::new(FailingEngine), "flaky");
        let answer = generator.ask("sys", "explain GHSA-xxxx", 64).await;
        assert_eq!(answer.mode, AnswerMode::Heuristic);
        assert!(answer.text.contains("GHSA-xxxx"));
    }

    #[test]
    fn heuristic_reply_truncates_on_char_boundaries() {
        let user = "é".repeat(FALLBACK_EXCERPT_CHARS + 10);
        let reply = heuristic_reply(&user);
        let excerpt = reply.strip_prefix(FALLBACK_HEADER).expect("header");
        assert_eq!(excerpt.chars().count(), FALLBACK_EXCERPT_CHARS);
    }

    #[test]
    fn extract_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                { "type": "text", "text": "first" },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "second" }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "first\nsecond");

        let empty: MessagesResponse =
            serde_json::from_value(serde_json::json!({ "content": [] })).unwrap();
        assert!(extract_text(empty).is_err());
    }
}
