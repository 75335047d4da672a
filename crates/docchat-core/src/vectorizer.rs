//! Query vectorization strategies.
//!
//! WARNING: the only implementation here, [`RandomVectorizer`], is a
//! placeholder. Its output does not depend on the query text, so similarity
//! results obtained with it carry no meaning. A real text embedding model
//! plugs in by implementing [`QueryVectorizer`] with the index dimension.

use rand::Rng;

/// Turns a query into a fixed-length vector for similarity search.
pub trait QueryVectorizer: Send + Sync {
    fn dimension(&self) -> usize;

    fn vectorize(&self, query: &str) -> Vec<f32>;
}

/// Placeholder strategy: uniform random values in `[0, 1)`. NOT an embedding.
#[derive(Debug, Clone, Copy)]
pub struct RandomVectorizer {
    dimension: usize,
}

impl RandomVectorizer {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl QueryVectorizer for RandomVectorizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, _query: &str) -> Vec<f32> {
        let mut rng = rand::thread_rng();
        (0..self.dimension).map(|_| rng.gen::<f32>()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_vector_has_configured_dimension() {
        let vectorizer = RandomVectorizer::new(1536);
        assert_eq!(vectorizer.dimension(), 1536);
        assert_eq!(vectorizer.vectorize("what is this about?").len(), 1536);
    }

    #[test]
    fn test_random_values_are_in_unit_interval() {
        let vector = RandomVectorizer::new(256).vectorize("anything");
        assert!(vector.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_output_ignores_query_text() {
        // Same text twice gives unrelated vectors; this is the placeholder contract.
        let vectorizer = RandomVectorizer::new(64);
        assert_ne!(vectorizer.vectorize("same"), vectorizer.vectorize("same"));
    }
}
