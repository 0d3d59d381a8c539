//! Generation providers and prompt assembly.
//!
//! The prompt places a fixed system instruction first, then the
//! retrieved knowledge as numbered `[Context N]` blocks, then any
//! rendered conversation history, then the user question. Generation is
//! a single attempt: the caller decides what a failure turns into.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use concierge_core::models::RetrievalResult;

use crate::config::GenerationConfig;

/// Standing instructions prepended to every generation prompt.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a helpful assistant answering questions on behalf of a company, \
grounded in excerpts from its knowledge base.

Your role is to:
1. Answer questions about the company's services, pricing, and processes
2. Maintain a professional, friendly, and helpful tone
3. Base every answer on the provided context blocks

When the context does not contain the answer, say so honestly and \
encourage the user to contact the company directly.";

/// The downstream text-generation call failed.
#[derive(Debug, Error)]
#[error("generation failed: {reason}")]
pub struct GenerationError {
    pub reason: String,
}

impl GenerationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A text-generation backend. One call per request, no internal retry.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Assemble the full generation prompt.
///
/// `conversation` is the rendered session history ("User:"/"Assistant:"
/// lines) and is omitted entirely when empty.
pub fn build_prompt(results: &[RetrievalResult], conversation: &str, query: &str) -> String {
    let context = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Context {}]: {}", i + 1, r.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!(
        "{}\n\nContext from the company knowledge base:\n{}\n",
        SYSTEM_INSTRUCTION, context
    );

    if !conversation.is_empty() {
        prompt.push_str(&format!("\nConversation so far:\n{}\n", conversation));
    }

    prompt.push_str(&format!(
        "\nUser question: {}\n\nPlease answer the user's question using the provided context. \
         If the context doesn't contain enough information, acknowledge this and suggest \
         contacting the company directly.",
        query
    ));

    prompt
}

/// A generator that always fails; used when generation is not configured.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::new(
            "generation provider is disabled; set [generation] provider in config",
        ))
    }
}

/// Generator using the OpenAI chat completions API.
///
/// Requires `OPENAI_API_KEY`. A failed call is final: retrying a
/// generation would double the user-visible latency for an answer the
/// orchestrator can already degrade gracefully.
pub struct OpenAiGenerator {
    model: String,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            anyhow::bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| GenerationError::new("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| GenerationError::new(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::new(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(format!(
                "OpenAI API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::new(e.to_string()))?;

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| GenerationError::new("invalid response: missing message content"))
    }
}

/// Create the appropriate [`Generator`] based on configuration.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}
