//! LLM generation boundary: `LlmClient` stands in for the out-of-scope HTTP
//! client (spec §1); a deterministic fallback keeps the controller useful
//! offline (spec §4.9, `LLMUnavailable` policy in §7).

use async_trait::async_trait;
use futures::stream::{self, BoxStream};

use crate::core::error::Result;
use crate::rag::retriever::RetrievedContext;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, prompt: &str) -> Result<String>;
    fn chat_stream<'a>(&'a self, prompt: &'a str) -> BoxStream<'a, Result<String>>;
    fn model_name(&self) -> &str;

    /// Up to 3 follow-up queries conditioned on `(query, current_answer)`.
    /// Default: none — with no real client wired, recursion terminates at
    /// depth 1 (spec §4.9, Testable Property S6).
    async fn suggest_followups(&self, _query: &str, _current_answer: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// An `LlmClient` that is always unavailable — exercises the
/// `LLMUnavailable` fallback path deterministically in tests.
pub struct UnavailableLlmClient;

#[async_trait]
impl LlmClient for UnavailableLlmClient {
    async fn chat(&self, _prompt: &str) -> Result<String> {
        Err(crate::core::error::Error::new(
            crate::core::error::ErrorKind::LlmUnavailable,
            "no llm client configured",
        ))
    }

    fn chat_stream<'a>(&'a self, _prompt: &'a str) -> BoxStream<'a, Result<String>> {
        Box::pin(stream::once(async {
            Err(crate::core::error::Error::new(
                crate::core::error::ErrorKind::LlmUnavailable,
                "no llm client configured",
            ))
        }))
    }

    fn model_name(&self) -> &str {
        "unavailable"
    }
}

/// Grounded in `original_source`'s `_fallback_answer`: synthesizes an
/// answer from the top 3 contexts without calling out to any model.
pub fn fallback_answer(query: &str, contexts: &[RetrievedContext]) -> String {
    if contexts.is_empty() {
        return format!("No relevant information was found for \"{query}\".");
    }
    let mut answer = format!("Based on the retrieved sources for \"{query}\":\n");
    for ctx in contexts.iter().take(3) {
        let excerpt: String = ctx.chunk_text.chars().take(200).collect();
        answer.push_str(&format!("- {} ({}): {}\n", ctx.title, ctx.url, excerpt));
    }
    answer
}

/// Generates an answer via the LLM, falling back to a deterministic
/// synthesis when the client is unavailable or errors.
pub async fn generate(llm: &dyn LlmClient, prompt: &str, query: &str, contexts: &[RetrievedContext]) -> String {
    match llm.chat(prompt).await {
        Ok(answer) => answer,
        Err(_) => fallback_answer(query, contexts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_handles_empty_contexts() {
        let answer = fallback_answer("rust ownership", &[]);
        assert!(answer.contains("No relevant information"));
    }

    #[tokio::test]
    async fn generate_falls_back_when_llm_unavailable() {
        let llm = UnavailableLlmClient;
        let ctx = vec![RetrievedContext {
            document_id: crate::core::types::DocId::new(),
            chunk_text: "ownership transfers on move".to_string(),
            title: "Rust Book".to_string(),
            url: "https://doc.rust-lang.org".to_string(),
            source: "custom".to_string(),
            relevance_score: 0.9,
        }];
        let answer = generate(&llm, "ignored", "ownership", &ctx).await;
        assert!(answer.contains("Rust Book"));
    }
}
