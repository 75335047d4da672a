pub mod completion;
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub mod retrieval;
pub mod state;
pub mod vector_store;
pub mod vectorizer;

// Re-export main types for convenience
pub use completion::{CompletionService, GroqClient};
pub use config::{ApiKey, Config, IndexSettings, Settings};
pub use document::{DocumentLoader, LoadedDocument, LopdfExtractor, PdfExtractor};
pub use error::{ConfigError, DocumentError, ServiceError, ValidationError};
pub use generator::{build_enriched_prompt, render_reply, ResponseGenerator};
pub use retrieval::DocumentFetcher;
pub use state::{ChatMessage, ChatRole, Session};
pub use vector_store::{PineconeClient, PineconeIndex, VectorMatch, VectorStore};
pub use vectorizer::{QueryVectorizer, RandomVectorizer};
