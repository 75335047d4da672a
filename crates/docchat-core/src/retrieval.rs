use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_TOP_N;
use crate::error::ServiceError;
use crate::vector_store::VectorStore;
use crate::vectorizer::QueryVectorizer;

/// Fetches stored passages related to a query.
///
/// Errors from the vector store are returned to the caller untouched.
#[derive(Clone)]
pub struct DocumentFetcher {
    vectorizer: Arc<dyn QueryVectorizer>,
    store: Arc<dyn VectorStore>,
    top_n: usize,
}

impl DocumentFetcher {
    pub fn new(vectorizer: Arc<dyn QueryVectorizer>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            vectorizer,
            store,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub async fn fetch_relevant_docs(&self, query: &str) -> Result<Vec<String>, ServiceError> {
        self.fetch_with_limit(query, self.top_n).await
    }

    /// Texts of the `top_n` nearest matches, in the order the store ranked
    /// them. Fewer matches than `top_n` are returned as-is.
    pub async fn fetch_with_limit(&self, query: &str, top_n: usize) -> Result<Vec<String>, ServiceError> {
        let vector = self.vectorizer.vectorize(query);
        let matches = self.store.query(&vector, top_n).await?;

        debug!(requested = top_n, returned = matches.len(), "fetched matches");

        matches
            .into_iter()
            .map(|m| match m.text() {
                Some(text) => Ok(text.to_string()),
                None => Err(ServiceError::MissingMetadataText { id: m.id.clone() }),
            })
            .collect()
    }
}
