use crate::capability::{AnswerMode, Capability};
use crate::error::{AiError, Result};
use async_trait::async_trait;
use ndarray::{Array1, Array2};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const EMBED_BATCH: usize = 64;
const MAX_EMBED_CHARS: usize = 8_000;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_URL.to_string(),
            model: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A remote engine that maps texts to dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = non_empty(config.model.as_deref()).ok_or_else(|| {
            AiError::NotConfigured("CODE_AUDIT_EMBEDDING_MODEL is not set".to_string())
        })?;
        let api_key = non_empty(config.api_key.as_deref()).ok_or_else(|| {
            AiError::NotConfigured("CODE_AUDIT_EMBEDDING_API_KEY is not set".to_string())
        })?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let input: Vec<String> = batch
            .iter()
            .map(|text| text.chars().take(MAX_EMBED_CHARS).collect())
            .collect();
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: &input,
            })
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

        let mut parsed = response.json::<EmbeddingsResponse>().await?;
        if parsed.data.len() != batch.len() {
            return Err(AiError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Position of the text in the indexed list.
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub mode: AnswerMode,
}

/// Similarity search that prefers embeddings and falls back to keyword counting.
pub struct SimilarityBackend {
    capability: Capability,
    embedder: Option<Arc<dyn Embedder>>,
}

impl SimilarityBackend {
    /// Probe once: ready iff both a model and a credential are configured.
    pub fn new(config: &EmbeddingConfig) -> Self {
        match HttpEmbedder::new(config) {
            Ok(embedder) => {
                log::info!("Similarity search ready (model {})", embedder.model());
                Self {
                    capability: Capability::Ready {
                        model: embedder.model().to_string(),
                    },
                    embedder: Some(Arc::new(embedder)),
                }
            }
            Err(err) => {
                log::info!("Similarity search falls back to keyword scoring: {err}");
                Self::unavailable(err.to_string())
            }
        }
    }

    pub fn with_embedder(embedder: Arc<dyn Embedder>, model: impl Into<String>) -> Self {
        Self {
            capability: Capability::Ready {
                model: model.into(),
            },
            embedder: Some(embedder),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            capability: Capability::unavailable(reason),
            embedder: None,
        }
    }

    pub fn reinitialize(&mut self, config: &EmbeddingConfig) {
        *self = Self::new(config);
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn available(&self) -> bool {
        self.capability.is_ready()
    }

    /// Index `texts`. When embedding fails the index answers in fallback mode for its lifetime.
    pub async fn index(&self, texts: Vec<String>) -> SimilarityIndex {
        let Some(embedder) = self.embedder.as_ref().map(Arc::clone) else {
            return SimilarityIndex::keyword(texts);
        };
        if texts.is_empty() {
            return SimilarityIndex::keyword(texts);
        }

        match embedder.embed(&texts).await.and_then(normalized_matrix) {
            Ok(vectors) if vectors.nrows() == texts.len() => SimilarityIndex {
                texts,
                vectors: Some(vectors),
                embedder: Some(embedder),
            },
            Ok(vectors) => {
                log::warn!(
                    "Embedding engine returned {} vectors for {} texts; using keyword scoring",
                    vectors.nrows(),
                    texts.len()
                );
                SimilarityIndex::keyword(texts)
            }
            Err(err) => {
                log::warn!("Embedding failed, using keyword scoring: {err}");
                SimilarityIndex::keyword(texts)
            }
        }
    }
}

/// Texts indexed for top-k queries.
pub struct SimilarityIndex {
    texts: Vec<String>,
    vectors: Option<Array2<f32>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl SimilarityIndex {
    pub fn keyword(texts: Vec<String>) -> Self {
        Self {
            texts,
            vectors: None,
            embedder: None,
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn mode(&self) -> AnswerMode {
        if self.vectors.is_some() {
            AnswerMode::Ai
        } else {
            AnswerMode::Heuristic
        }
    }

    pub async fn search(&self, query: &str, k: usize) -> SearchResults {
        if let (Some(vectors), Some(embedder)) = (self.vectors.as_ref(), self.embedder.as_ref()) {
            match embed_query(embedder.as_ref(), query, vectors.ncols()).await {
                Ok(query_vector) => {
                    return SearchResults {
                        hits: cosine_top_k(vectors, &query_vector, k),
                        mode: AnswerMode::Ai,
                    };
                }
                Err(err) => {
                    log::warn!("Query embedding failed, using keyword scoring: {err}");
                }
            }
        }

        SearchResults {
            hits: keyword_search(&self.texts, query, k),
            mode: AnswerMode::Heuristic,
        }
    }
}

async fn embed_query(embedder: &dyn Embedder, query: &str, dim: usize) -> Result<Array1<f32>> {
    let mut vectors = embedder.embed(&[query.to_string()]).await?;
    let vector = vectors
        .pop()
        .ok_or_else(|| AiError::InvalidResponse("no embedding for query".to_string()))?;
    if vector.len() != dim {
        return Err(AiError::InvalidResponse(format!(
            "query embedding has dimension {}, index has {dim}",
            vector.len()
        )));
    }
    let mut vector = Array1::from(vector);
    normalize(vector.view_mut());
    Ok(vector)
}

fn normalized_matrix(rows: Vec<Vec<f32>>) -> Result<Array2<f32>> {
    let n = rows.len();
    let dim = rows.first().map(Vec::len).unwrap_or(0);
    if dim == 0 {
        return Err(AiError::InvalidResponse("empty embeddings".to_string()));
    }
    if rows.iter().any(|row| row.len() != dim) {
        return Err(AiError::InvalidResponse(
            "embeddings have inconsistent dimensions".to_string(),
        ));
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    let mut matrix = Array2::from_shape_vec((n, dim), flat)
        .map_err(|err| AiError::InvalidResponse(err.to_string()))?;
    for row in matrix.rows_mut() {
        normalize(row);
    }
    Ok(matrix)
}

fn normalize(mut vector: ndarray::ArrayViewMut1<'_, f32>) {
    let norm = vector.dot(&vector).sqrt();
    if norm > f32::EPSILON {
        vector.mapv_inplace(|v| v / norm);
    }
}

fn cosine_top_k(vectors: &Array2<f32>, query: &Array1<f32>, k: usize) -> Vec<SearchHit> {
    let scores = vectors.dot(query);
    let mut hits: Vec<SearchHit> = scores
        .iter()
        .enumerate()
        .map(|(index, &score)| SearchHit { index, score })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    hits
}

/// Keyword fallback: score each text by the number of non-overlapping, case-folded occurrences
/// of `query`, drop zero scores, order by score descending (ties keep insertion order) and keep
/// the first `k`.
///
/// An empty query yields no hits. Plain substring counting would give every text a score of
/// its length plus one, which ranks by file size rather than relevance.
pub fn keyword_search(texts: &[String], query: &str, k: usize) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    if needle.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = texts
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            let count = text.to_lowercase().matches(needle.as_str()).count();
            (count > 0).then_some(SearchHit {
                index,
                score: count as f32,
            })
        })
        .collect();
    // `sort_by` is stable, so equal scores stay in insertion order.
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Letter-frequency vectors: deterministic and good enough to rank by shared vocabulary.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; 26];
                    for c in text.to_ascii_lowercase().bytes() {
                        if c.is_ascii_lowercase() {
                            v[(c - b'a') as usize] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AiError::Status {
                status: 401,
                body: "bad key".to_string(),
            })
        }
    }

    #[test]
    fn keyword_search_orders_by_count_with_stable_ties() {
        let corpus = texts(&[
            "exec once",
            "no match here",
            "EXEC exec exec",
            "exec and exec",
            "exec alone",
        ]);
        let hits = keyword_search(&corpus, "Exec", 10);
        let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![2, 3, 0, 4]);
        assert_eq!(hits[0].score, 3.0);
        assert!(hits.iter().all(|h| h.score > 0.0));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn keyword_search_respects_k() {
        let corpus = texts(&["a", "aa", "aaa", "aaaa"]);
        for k in 0..6 {
            let hits = keyword_search(&corpus, "a", k);
            assert!(hits.len() <= k);
        }
        assert!(keyword_search(&corpus, "a", 0).is_empty());
    }

    #[test]
    fn keyword_search_counts_non_overlapping_occurrences() {
        let corpus = texts(&["aaaa"]);
        let hits = keyword_search(&corpus, "aa", 5);
        assert_eq!(hits, vec![SearchHit { index: 0, score: 2.0 }]);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let corpus = texts(&["anything"]);
        assert!(keyword_search(&corpus, "", 5).is_empty());
    }

    #[test]
    fn backend_without_model_is_unavailable() {
        let backend = SimilarityBackend::new(&EmbeddingConfig {
            api_key: Some("key".to_string()),
            ..EmbeddingConfig::default()
        });
        assert!(!backend.available());
        assert_eq!(
            backend.capability(),
            &Capability::unavailable("not configured: CODE_AUDIT_EMBEDDING_MODEL is not set")
        );
    }

    #[tokio::test]
    async fn unavailable_backend_uses_keyword_mode() {
        let backend = SimilarityBackend::unavailable("no model");
        let index = backend
            .index(texts(&["fn parse_input()", "fn render()"]))
            .await;
        assert_eq!(index.mode(), AnswerMode::Heuristic);
        let results = index.search("parse", 3).await;
        assert_eq!(results.mode, AnswerMode::Heuristic);
        assert_eq!(results.hits, vec![SearchHit { index: 0, score: 1.0 }]);
    }

    #[tokio::test]
    async fn embedding_backend_ranks_by_cosine_similarity() {
        let backend = SimilarityBackend::with_embedder(Arc::new(LetterEmbedder), "letters");
        let index = backend
            .index(texts(&["zzzz zzzz", "query builder", "xyzzy"]))
            .await;
        assert_eq!(index.mode(), AnswerMode::Ai);
        let results = index.search("query", 2).await;
        assert_eq!(results.mode, AnswerMode::Ai);
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].index, 1);
        assert!(results.hits[0].score >= results.hits[1].score);
    }

    #[tokio::test]
    async fn embedding_failure_degrades_the_index() {
        let backend = SimilarityBackend::with_embedder(Arc::new(BrokenEmbedder), "broken");
        let index = backend.index(texts(&["sql query", "render"])).await;
        assert_eq!(index.mode(), AnswerMode::Heuristic);
        let results = index.search("query", 5).await;
        assert_eq!(results.mode, AnswerMode::Heuristic);
        assert_eq!(results.hits, vec![SearchHit { index: 0, score: 1.0 }]);
    }
}
