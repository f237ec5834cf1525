//! Advisory collaborators that supplement heuristic reflection.
//!
//! An advisor turns a prompt plus a small context into free text. Calls
//! are bounded by a timeout; any failure yields [`Advice::Fallback`] and
//! never an error to the caller.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use evolve_core::{Context, Value};
use reqwest::{Client, ClientBuilder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Text used in place of advice when the advisor is unavailable.
pub const ADVICE_UNAVAILABLE: &str = "advisory analysis unavailable";

/// A source of free-text advice.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Advisor name (for logs).
    fn name(&self) -> &str;

    /// Generate advice for a prompt. `task_type` is `reflection` or
    /// `pattern_analysis`.
    async fn generate(&self, prompt: &str, context: &Context, task_type: &str) -> Result<String>;
}

/// Outcome of an advisory call.
#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    /// The advisor answered in time
    Text(String),
    /// The advisor failed or timed out
    Fallback {
        /// Why no advice was produced
        reason: String,
    },
}

impl Advice {
    /// Advice text, or the fallback text.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Fallback { .. } => ADVICE_UNAVAILABLE,
        }
    }

    /// Whether the advisor answered.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Ask an advisor, giving up after `timeout`.
///
/// The call runs as its own task so a slow advisor is aborted rather than
/// left running after the deadline.
pub async fn advise(
    advisor: Arc<dyn Advisor>,
    prompt: String,
    context: Context,
    task_type: &str,
    timeout: Duration,
) -> Advice {
    let name = advisor.name().to_string();
    let kind = task_type.to_string();
    let mut handle =
        tokio::spawn(async move { advisor.generate(&prompt, &context, &kind).await });

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(text))) => {
            debug!("Advisor {} answered ({} chars)", name, text.len());
            Advice::Text(text)
        }
        Ok(Ok(Err(e))) => {
            warn!("Advisor {} failed: {}", name, e);
            Advice::Fallback {
                reason: e.to_string(),
            }
        }
        Ok(Err(e)) => {
            warn!("Advisor {} task aborted: {}", name, e);
            Advice::Fallback {
                reason: e.to_string(),
            }
        }
        Err(_) => {
            handle.abort();
            warn!("Advisor {} timed out after {:?}", name, timeout);
            Advice::Fallback {
                reason: format!("timed out after {:?}", timeout),
            }
        }
    }
}

/// Deterministic advisor built from text templates.
///
/// Useful offline and in tests. An optional delay simulates a slow model.
#[derive(Debug, Clone, Default)]
pub struct TemplateAdvisor {
    delay: Option<Duration>,
}

impl TemplateAdvisor {
    /// Create a template advisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn reflection_advice(context: &Context) -> String {
        let action = context.get("action").and_then(Value::as_str).unwrap_or("unknown");
        let reward = context.get("reward").and_then(Value::as_f64).unwrap_or(0.0);
        let success = context.get("success").and_then(Value::as_bool).unwrap_or(false);

        if success {
            format!(
                "Action '{}' fit this task (reward {:.2}). Prefer it for tasks of the same type and keep the context that made it work.",
                action, reward
            )
        } else {
            format!(
                "Action '{}' did not fit this task (reward {:.2}). Check whether the inputs it needs were present and try a different action next time.",
                action, reward
            )
        }
    }

    fn pattern_advice(context: &Context) -> String {
        let count = context.get("pattern_count").and_then(Value::as_f64).unwrap_or(0.0);
        match context.get("strongest").and_then(Value::as_str) {
            Some(strongest) => format!(
                "{} patterns observed. Act on the strongest first: {}.",
                count, strongest
            ),
            None => "No patterns observed yet. Keep exploring.".to_string(),
        }
    }
}

#[async_trait]
impl Advisor for TemplateAdvisor {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, prompt: &str, context: &Context, task_type: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(match task_type {
            "reflection" => Self::reflection_advice(context),
            "pattern_analysis" => Self::pattern_advice(context),
            other => format!(
                "No template for '{}'. Prompt was: {}",
                other,
                prompt.lines().next().unwrap_or_default()
            ),
        })
    }
}

/// Advisor backed by an Ollama server's `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaAdvisor {
    /// HTTP client
    client: Client,

    /// Ollama server URL
    url: String,

    /// Model name
    model: String,
}

impl OllamaAdvisor {
    /// Create a new Ollama advisor.
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            url: url.into(),
            model: model.into(),
        }
    }

    /// Check if the Ollama server is available.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/version", self.url))
            .send()
            .await
            .context("Failed to check Ollama health")?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Advisor for OllamaAdvisor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, context: &Context, task_type: &str) -> Result<String> {
        let full_prompt = format!(
            "You are assisting a learning agent with {}.\nContext: {}\n\n{}",
            task_type,
            Value::Map(context.clone()),
            prompt
        );
        let payload = json!({
            "model": self.model,
            "prompt": full_prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&payload)
            .send()
            .await
            .context("Failed to call Ollama generate API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error (status {}): {}", status, error_text);
        }

        #[derive(serde::Deserialize)]
        struct Response {
            response: String,
        }

        let data: Response = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(data.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_core::context;

    struct BrokenAdvisor;

    #[async_trait]
    impl Advisor for BrokenAdvisor {
        fn name(&self) -> &str {
            "broken"
        }

        async fn generate(&self, _: &str, _: &Context, _: &str) -> Result<String> {
            anyhow::bail!("model not loaded")
        }
    }

    #[tokio::test]
    async fn test_template_reflection_advice() {
        let ctx = context! { "action" => "search", "success" => true, "reward" => 1.0 };
        let advice = advise(
            Arc::new(TemplateAdvisor::new()),
            "why".into(),
            ctx,
            "reflection",
            Duration::from_secs(1),
        )
        .await;
        assert!(advice.is_available());
        assert!(advice.text().contains("'search' fit"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let slow = TemplateAdvisor::new().with_delay(Duration::from_secs(5));
        let advice = advise(
            Arc::new(slow),
            "why".into(),
            Context::new(),
            "reflection",
            Duration::from_millis(20),
        )
        .await;
        assert!(!advice.is_available());
        assert_eq!(advice.text(), ADVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_error_falls_back() {
        let advice = advise(
            Arc::new(BrokenAdvisor),
            "why".into(),
            Context::new(),
            "pattern_analysis",
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(
            advice,
            Advice::Fallback {
                reason: "model not loaded".into()
            }
        );
    }
}
