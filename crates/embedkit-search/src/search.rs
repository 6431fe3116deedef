//! Exhaustive similarity search over stored vectors.
//!
//! Every stored vector is scored against the query; there is no index.
//! Results are sorted by similarity descending, ties in scan order.

use std::collections::HashMap;

use embedkit_embeddings::EngineManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::similarity::{cosine_similarity, validate_vector};
use crate::store::{EmbeddingStore, StoredEmbedding};

/// Longest query vector accepted.
pub const MAX_QUERY_DIMENSION: usize = 8192;

/// A stored vector and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Stored vector id
    pub id: String,
    pub similarity: f32,
}

/// A record and the mean similarity of its vectors to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMatch<R> {
    pub record: R,
    pub similarity: f32,
}

/// Check `limit >= 1` and `0 <= min_similarity <= 1`.
pub fn validate_params(limit: usize, min_similarity: f32) -> Result<(), SearchError> {
    if limit == 0 {
        return Err(SearchError::InvalidArgument(
            "limit must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&min_similarity) {
        return Err(SearchError::InvalidArgument(format!(
            "min_similarity must be within [0, 1], got {}",
            min_similarity
        )));
    }
    Ok(())
}

/// Check that a query is non-empty, finite, and not too long.
pub fn validate_query(query: &[f32]) -> Result<(), SearchError> {
    if query.len() > MAX_QUERY_DIMENSION {
        return Err(SearchError::DimensionTooLarge {
            actual: query.len(),
            max: MAX_QUERY_DIMENSION,
        });
    }
    validate_vector(query)
}

/// Score every stored vector and keep those at or above `min_similarity`.
///
/// A vector that cannot be compared with the query scores 0.0. Returns
/// `(position, similarity)` pairs, best first.
pub fn scan(query: &[f32], embeddings: &[StoredEmbedding], min_similarity: f32) -> Vec<(usize, f32)> {
    let mut hits: Vec<(usize, f32)> = embeddings
        .iter()
        .enumerate()
        .filter_map(|(pos, stored)| {
            let similarity = cosine_similarity(query, &stored.vector).unwrap_or_else(|e| {
                debug!(id = %stored.id, error = %e, "Stored vector not comparable; scoring 0");
                0.0
            });
            (similarity >= min_similarity).then_some((pos, similarity))
        })
        .collect();
    // sort_by is stable, so ties stay in scan order
    hits.sort_by(|a, b| b.1.total_cmp(&a.1));
    hits
}

/// Top `limit` stored vectors most similar to `query`.
pub async fn search_similar<S>(
    store: &S,
    query: &[f32],
    limit: usize,
    min_similarity: f32,
) -> Result<Vec<SimilarityMatch>, SearchError>
where
    S: EmbeddingStore + ?Sized,
{
    validate_query(query)?;
    validate_params(limit, min_similarity)?;

    let embeddings = store.embeddings().await?;
    if embeddings.is_empty() {
        return Ok(vec![]);
    }

    let mut hits = scan(query, &embeddings, min_similarity);
    hits.truncate(limit);

    debug!(
        scanned = embeddings.len(),
        returned = hits.len(),
        "Vector search complete"
    );

    Ok(hits
        .into_iter()
        .map(|(pos, similarity)| SimilarityMatch {
            id: embeddings[pos].id.clone(),
            similarity,
        })
        .collect())
}

/// Embed `text`, then rank records by the mean similarity of their vectors.
///
/// Vectors whose record no longer exists are logged and skipped.
pub async fn semantic_search<S>(
    manager: &EngineManager,
    store: &S,
    text: &str,
    limit: usize,
    min_similarity: f32,
) -> Result<Vec<RecordMatch<S::Record>>, SearchError>
where
    S: EmbeddingStore + ?Sized,
{
    validate_params(limit, min_similarity)?;
    let query = manager.generate_embedding(text).await?;
    validate_query(&query.vector)?;

    let embeddings = store.embeddings().await?;
    if embeddings.is_empty() {
        return Ok(vec![]);
    }

    let hits = scan(&query.vector, &embeddings, min_similarity);

    // Group by record in first-seen order
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for (pos, similarity) in hits {
        let record_id = embeddings[pos].record_id.as_str();
        let slot = *slots.entry(record_id).or_insert_with(|| {
            groups.push((record_id, 0.0, 0));
            groups.len() - 1
        });
        groups[slot].1 += f64::from(similarity);
        groups[slot].2 += 1;
    }

    let mut ranked: Vec<(&str, f32)> = groups
        .into_iter()
        .map(|(id, sum, count)| (id, (sum / count as f64) as f32))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut results = Vec::with_capacity(limit.min(ranked.len()));
    for (record_id, similarity) in ranked {
        if results.len() == limit {
            break;
        }
        match store.record(record_id).await? {
            Some(record) => results.push(RecordMatch { record, similarity }),
            None => warn!(record_id, "Vector refers to a missing record; skipping"),
        }
    }

    debug!(
        query_len = text.len(),
        returned = results.len(),
        "Semantic search complete"
    );

    Ok(results)
}
