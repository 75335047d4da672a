use std::sync::Arc;

use tracing::{info, warn};

use crate::completion::{CompletionService, GroqClient};
use crate::config::Settings;
use crate::error::ServiceError;
use crate::retrieval::DocumentFetcher;
use crate::state::ChatMessage;
use crate::vector_store::PineconeClient;
use crate::vectorizer::RandomVectorizer;

/// Answers a prompt with retrieved passages attached.
///
/// Each call is independent: prior conversation turns are never sent.
#[derive(Clone)]
pub struct ResponseGenerator {
    fetcher: DocumentFetcher,
    completion: Arc<dyn CompletionService>,
    model: String,
}

impl ResponseGenerator {
    pub fn new(fetcher: DocumentFetcher, completion: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            fetcher,
            completion,
            model: model.into(),
        }
    }

    /// Wire up Pinecone and Groq from `settings`, creating the index if it
    /// does not exist yet.
    pub async fn connect(settings: &Settings) -> Result<Self, ServiceError> {
        let pinecone = PineconeClient::new(settings.pinecone_api_key.clone());
        let index = pinecone.ensure_index(&settings.index).await?;

        let fetcher = DocumentFetcher::new(
            Arc::new(RandomVectorizer::new(settings.index.dimension)),
            Arc::new(index),
        )
        .with_top_n(settings.top_n);
        let completion = Arc::new(GroqClient::new(settings.groq_api_key.clone()));

        Ok(Self::new(fetcher, completion, settings.model.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let documents = self.fetcher.fetch_relevant_docs(prompt).await.map_err(|e| {
            warn!(error = %e, "document fetch failed");
            e
        })?;

        let enriched = build_enriched_prompt(prompt, &documents);
        let messages = [ChatMessage::user(enriched)];

        let answer = self.completion.complete(&messages, &self.model).await.map_err(|e| {
            warn!(error = %e, model = %self.model, "completion failed");
            e
        })?;

        info!(documents = documents.len(), answer_chars = answer.chars().count(), "answer generated");
        Ok(answer)
    }
}

/// `prompt`, a blank line, then each document on its own line.
pub fn build_enriched_prompt(prompt: &str, documents: &[String]) -> String {
    format!("{}\n\n{}", prompt, documents.join("\n"))
}

/// What the transcript shows for a generation result.
pub fn render_reply(result: Result<String, ServiceError>) -> String {
    match result {
        Ok(answer) => answer,
        Err(e) => format!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::tests::{FailingStore, MockStore};
    use crate::state::ChatRole;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a canned answer and keeps every message list it was sent.
    struct RecordingCompletion {
        answer: &'static str,
        calls: Mutex<Vec<(Vec<ChatMessage>, String)>>,
    }

    impl RecordingCompletion {
        fn new(answer: &'static str) -> Self {
            Self {
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionService for RecordingCompletion {
        async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String, ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), model.to_string()));
            Ok(self.answer.to_string())
        }
    }

    struct BrokenCompletion;

    #[async_trait]
    impl CompletionService for BrokenCompletion {
        async fn complete(&self, _messages: &[ChatMessage], _model: &str) -> Result<String, ServiceError> {
            Err(ServiceError::MalformedResponse {
                service: "groq",
                detail: "service unavailable".to_string(),
            })
        }
    }

    fn fetcher_with(texts: Vec<&'static str>) -> DocumentFetcher {
        DocumentFetcher::new(
            Arc::new(RandomVectorizer::new(8)),
            Arc::new(MockStore::new(texts)),
        )
    }

    #[test]
    fn test_enriched_prompt_layout() {
        let docs = vec!["one".to_string(), "two".to_string()];
        assert_eq!(build_enriched_prompt("Q?", &docs), "Q?\n\none\ntwo");
    }

    #[test]
    fn test_enriched_prompt_without_documents() {
        assert_eq!(build_enriched_prompt("Q?", &[]), "Q?\n\n");
    }

    #[tokio::test]
    async fn test_generate_sends_single_user_message() {
        let completion = Arc::new(RecordingCompletion::new("the answer"));
        let generator = ResponseGenerator::new(
            fetcher_with(vec!["ctx a", "ctx b"]),
            completion.clone(),
            "llama3-8b-8192",
        );

        let answer = generator.generate("What?").await.unwrap();
        assert_eq!(answer, "the answer");

        let calls = completion.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (messages, model) = &calls[0];
        assert_eq!(model, "llama3-8b-8192");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "What?\n\nctx a\nctx b");
    }

    #[tokio::test]
    async fn test_completion_failure_renders_as_error_text() {
        let generator = ResponseGenerator::new(fetcher_with(vec!["ctx"]), Arc::new(BrokenCompletion), "m");
        let reply = render_reply(generator.generate("What?").await);
        assert!(reply.starts_with("Error: "), "got: {reply}");
        assert!(reply.contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_completion() {
        let completion = Arc::new(RecordingCompletion::new("unused"));
        let fetcher = DocumentFetcher::new(Arc::new(RandomVectorizer::new(8)), Arc::new(FailingStore));
        let generator = ResponseGenerator::new(fetcher, completion.clone(), "m");

        assert!(generator.generate("What?").await.is_err());
        assert!(completion.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_render_reply_passes_answer_through() {
        assert_eq!(render_reply(Ok("fine".to_string())), "fine");
    }
}
