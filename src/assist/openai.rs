//! OpenAI-compatible chat-completions assistant.
//!
//! Any transport, status or parse failure degrades to the
//! [`FallbackAssistant`] result for that call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{
    EMPTY_REPLY_KEYWORDS, Enrichment, FallbackAssistant, MAX_KEYWORDS, QueryAssistant,
    reconcile_ranking,
};
use crate::classify::ExtensionAllowlist;
use crate::config::CONNECT_TIMEOUT_SECS;
use crate::http_client::{ClientBuildError, build_http_client};
use crate::pipeline::Candidate;
use crate::user_agent::default_tool_user_agent;

/// Default API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Most candidates sent to the model for ranking.
const MAX_CANDIDATES_IN_PROMPT: usize = 30;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
enum AssistError {
    #[error("assistant request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("assistant returned HTTP {0}")]
    Status(u16),
    #[error("assistant reply was empty")]
    EmptyReply,
    #[error("assistant reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EnrichmentReply {
    #[serde(default)]
    keywords: Vec<Value>,
    #[serde(default)]
    extensions: Vec<Value>,
}

/// Assistant backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiAssistant {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    fallback: FallbackAssistant,
}

impl std::fmt::Debug for OpenAiAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistant")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiAssistant {
    /// Creates an assistant.
    ///
    /// `fallback` supplies the result whenever a call to the model fails.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        fallback: FallbackAssistant,
    ) -> Result<Self, ClientBuildError> {
        let client = build_http_client(
            "openai-assistant",
            &default_tool_user_agent(),
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
        )?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fallback,
        })
    }

    async fn complete(
        &self,
        system: &str,
        prompt: String,
        temperature: f32,
    ) -> Result<String, AssistError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssistError::Status(status.as_u16()));
        }
        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| strip_code_fence(&content).to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AssistError::EmptyReply)
    }

    async fn try_enrich(
        &self,
        query: &str,
        allowed: &ExtensionAllowlist,
    ) -> Result<Enrichment, AssistError> {
        let allowlist = allowed.iter().collect::<Vec<_>>().join(", ");
        let prompt = format!(
            "You are assisting a web file searcher. Given a user query, suggest up to {MAX_KEYWORDS} \
             additional keywords that are likely to yield direct file downloads and return a small \
             list of file extensions from the allowlist that best match the user's intent.\n\n\
             User query: {query}\n\
             Allowlist extensions: {allowlist}\n\
             Respond as JSON with keys 'keywords' (list[str]) and 'extensions' (list[str])."
        );
        let content = self.complete("Return only JSON.", prompt, 0.2).await?;
        let reply: EnrichmentReply = serde_json::from_str(&content)?;
        Ok(enrichment_from_reply(reply, allowed))
    }

    async fn try_rank(
        &self,
        query: &str,
        candidates: &[Candidate],
    ) -> Result<Vec<Candidate>, AssistError> {
        let shown = &candidates[..candidates.len().min(MAX_CANDIDATES_IN_PROMPT)];
        let candidates_json = serde_json::to_string(shown)?;
        let prompt = format!(
            "Rank downloadable file candidates for relevance to the user query. Return the same \
             list sorted best-first. Keep original fields and do not add new ones.\n\n\
             User query: {query}\n\
             Candidates JSON: {candidates_json}\n\
             Respond with JSON array only."
        );
        let content = self.complete("Return only raw JSON array.", prompt, 0.0).await?;
        let reply: Vec<Value> = serde_json::from_str(&content)?;
        let urls = reply.iter().filter_map(|entry| {
            entry
                .get("direct_url")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        Ok(reconcile_ranking(candidates, urls))
    }
}

#[async_trait]
impl QueryAssistant for OpenAiAssistant {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, allowed), fields(model = %self.model))]
    async fn enrich(&self, query: &str, allowed: &ExtensionAllowlist) -> Enrichment {
        match self.try_enrich(query, allowed).await {
            Ok(enrichment) => {
                debug!(
                    keywords = ?enrichment.keywords,
                    extensions = %enrichment.extensions,
                    "query enriched"
                );
                enrichment
            }
            Err(error) => {
                warn!(error = %error, "query enrichment failed; using fallback");
                self.fallback.enrich(query, allowed).await
            }
        }
    }

    #[instrument(
        skip(self, candidates),
        fields(model = %self.model, candidates = candidates.len())
    )]
    async fn rank(&self, query: &str, candidates: Vec<Candidate>) -> Vec<Candidate> {
        match self.try_rank(query, &candidates).await {
            Ok(ranked) if !ranked.is_empty() => ranked,
            Ok(_) => {
                debug!("ranking reply kept no known candidates; using fallback order");
                self.fallback.rank(query, candidates).await
            }
            Err(error) => {
                warn!(error = %error, "ranking failed; using fallback order");
                self.fallback.rank(query, candidates).await
            }
        }
    }
}

fn enrichment_from_reply(reply: EnrichmentReply, allowed: &ExtensionAllowlist) -> Enrichment {
    let mut keywords: Vec<String> = reply
        .keywords
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect();
    if keywords.is_empty() {
        keywords = EMPTY_REPLY_KEYWORDS.iter().map(ToString::to_string).collect();
    }
    let requested = ExtensionAllowlist::new(reply.extensions.iter().filter_map(Value::as_str));
    Enrichment {
        keywords,
        extensions: allowed.restrict_to(&requested),
    }
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enrichment_from_reply_filters_and_caps_keywords() {
        let reply: EnrichmentReply = serde_json::from_value(json!({
            "keywords": ["pdf", 7, " ", "free", "ebook", "textbook", "extra"],
            "extensions": [".PDF", "exe"]
        }))
        .unwrap_or_default();
        let allowed = ExtensionAllowlist::new(["pdf", "epub"]);
        let enrichment = enrichment_from_reply(reply, &allowed);
        assert_eq!(enrichment.keywords, vec!["pdf", "free", "ebook", "textbook"]);
        assert_eq!(enrichment.extensions, ExtensionAllowlist::new(["pdf"]));
    }

    #[test]
    fn test_enrichment_from_empty_reply_uses_defaults() {
        let allowed = ExtensionAllowlist::new(["pdf", "epub"]);
        let enrichment = enrichment_from_reply(EnrichmentReply::default(), &allowed);
        assert_eq!(enrichment.keywords, vec!["download", "file", "direct link"]);
        assert_eq!(enrichment.extensions, allowed);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}
