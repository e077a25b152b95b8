use crate::domain::ports::TextEmbedding;
use crate::utils::error::{PlannerError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryRecord {
    id: String,
    text: String,
    description: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQueryResult {
    pub id: String,
    pub text: String,
    pub description: String,
    pub relevance: f64,
}

/// 以 embedding 服務為後端的程序內語意記憶
pub struct SemanticTextMemory {
    embedding: Arc<dyn TextEmbedding>,
    collections: RwLock<HashMap<String, Vec<MemoryRecord>>>,
}

impl SemanticTextMemory {
    pub fn new(embedding: Arc<dyn TextEmbedding>) -> Self {
        Self {
            embedding,
            collections: RwLock::new(HashMap::new()),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedding
            .generate_embeddings(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::ServiceError {
                status: 200,
                message: "embedding service returned no vectors".to_string(),
            })
    }

    pub async fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections
            .read()
            .await
            .get(collection)
            .is_some_and(|records| records.iter().any(|r| r.id == id))
    }

    /// 寫入或覆蓋同 id 的記錄
    pub async fn save_information(
        &self,
        collection: &str,
        id: &str,
        text: &str,
        description: &str,
    ) -> Result<()> {
        let embedding = self.embed(text).await?;
        let record = MemoryRecord {
            id: id.to_string(),
            text: text.to_string(),
            description: description.to_string(),
            embedding,
        };

        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    /// 依 cosine 相似度由高到低回傳，低於 min_relevance 的略過
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f64,
    ) -> Result<Vec<MemoryQueryResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed(query).await?;
        let collections = self.collections.read().await;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<MemoryQueryResult> = records
            .iter()
            .map(|record| MemoryQueryResult {
                id: record.id.clone(),
                text: record.text.clone(),
                description: record.description.clone(),
                relevance: cosine_similarity(&query_embedding, &record.embedding),
            })
            .filter(|result| result.relevance >= min_relevance)
            .collect();

        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        results.truncate(limit);

        tracing::debug!(
            "🔎 Memory search in '{}' returned {} of {} records",
            collection,
            results.len(),
            records.len()
        );
        Ok(results)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
