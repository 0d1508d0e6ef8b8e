//! Keyword knowledge base over markdown documents.
//!
//! Documents are split into paragraph chunks of at most `chunk_chars`
//! characters. A query is scored against each chunk by the number of
//! distinct query terms the chunk contains; ties keep document order.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use prodops_core::KnowledgeSearch;
use prodops_core::error::CapabilityError;

const CAPABILITY: &str = "knowledge_search";

/// Terms shorter than this are ignored when indexing and querying.
const MIN_TERM_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "what", "how", "are", "was", "this", "that", "from", "can",
    "does", "should", "when", "which", "who", "why", "you", "your", "our", "about", "into",
];

#[derive(Debug, Clone)]
struct Chunk {
    source: String,
    text: String,
    terms: HashSet<String>,
}

pub struct KeywordKnowledgeBase {
    chunks: Vec<Chunk>,
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Split a document into paragraph-aligned chunks. A single paragraph longer
/// than `chunk_chars` becomes its own chunk.
fn chunk_document(content: &str, chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty()
            && current.chars().count() + paragraph.chars().count() + 2 > chunk_chars
        {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl KeywordKnowledgeBase {
    /// Build from `(source, content)` pairs.
    pub fn from_documents<I, S, C>(documents: I, chunk_chars: usize) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: AsRef<str>,
    {
        let mut chunks = Vec::new();
        for (source, content) in documents {
            let source = source.into();
            for text in chunk_document(content.as_ref(), chunk_chars.max(1)) {
                chunks.push(Chunk {
                    source: source.clone(),
                    terms: terms(&text),
                    text,
                });
            }
        }
        Self { chunks }
    }

    /// Load every `*.md` file in `dir`. A missing directory yields an empty
    /// knowledge base.
    pub async fn load_dir(dir: &Path, chunk_chars: usize) -> Result<Self, CapabilityError> {
        if !dir.exists() {
            warn!(dir = %dir.display(), "Knowledge directory not found, knowledge base is empty");
            return Ok(Self::from_documents(Vec::<(String, String)>::new(), chunk_chars));
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| CapabilityError::unavailable(CAPABILITY, e.to_string()))?;

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CapabilityError::unavailable(CAPABILITY, e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    documents.push((name, content));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }
        // read_dir order is platform-dependent
        documents.sort_by(|a, b| a.0.cmp(&b.0));

        let kb = Self::from_documents(documents, chunk_chars);
        info!(dir = %dir.display(), chunks = kb.len(), "Knowledge base loaded");
        Ok(kb)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<&Chunk> {
        let query_terms = terms(query);
        if query_terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &Chunk)> = self
            .chunks
            .iter()
            .map(|chunk| (query_terms.intersection(&chunk.terms).count(), chunk))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, chunk)| chunk).collect()
    }
}

#[async_trait]
impl KnowledgeSearch for KeywordKnowledgeBase {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, CapabilityError> {
        let hits = self.rank(query, k);
        debug!(
            hits = hits.len(),
            sources = ?hits.iter().map(|c| c.source.as_str()).collect::<Vec<_>>(),
            "Knowledge search"
        );
        Ok(hits.into_iter().map(|c| c.text.clone()).collect())
    }
}
