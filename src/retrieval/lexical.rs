//! BM25 scoring over a fixed candidate set

use crate::config::LexicalLanguage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::*;
use tantivy::tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError};
use thiserror::Error;

const TOKENIZER_NAME: &str = "legal";
/// Smallest writer arena tantivy accepts for a single indexing thread
const WRITER_MEMORY_BYTES: usize = 15_000_000;

#[derive(Error, Debug)]
pub enum LexicalError {
    #[error("Index build failed: {0}")]
    IndexError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Tantivy error: {0}")]
    TantivyError(#[from] TantivyError),
}

/// In-RAM index over one ordered candidate set
struct CandidateIndex {
    fingerprint: blake3::Hash,
    size: usize,
    index: Index,
    reader: IndexReader,
    position_field: Field,
    text_field: Field,
}

/// Scores an ordered list of passages against a query with BM25
///
/// Scores are relative to the candidate set itself (document frequencies are computed
/// over the candidates, not the corpus). The index is cached and rebuilt whenever the
/// ordered candidate texts change, so a score can never be attributed to the wrong
/// position.
pub struct LexicalScorer {
    language: LexicalLanguage,
    cached: Option<CandidateIndex>,
    builds: u64,
}

impl LexicalScorer {
    pub fn new(language: LexicalLanguage) -> Self {
        Self {
            language,
            cached: None,
            builds: 0,
        }
    }

    /// Fingerprint of an ordered document list
    ///
    /// Each text is length-prefixed so ["ab", "c"] and ["a", "bc"] differ.
    pub fn fingerprint(documents: &[&str]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(documents.len() as u64).to_le_bytes());
        for text in documents {
            hasher.update(&(text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        hasher.finalize()
    }

    /// Number of times an index has been built
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Score every document against `query`, one score per document in input order
    ///
    /// Documents that share no term with the query score 0.0.
    pub fn score(&mut self, query: &str, documents: &[&str]) -> Result<Vec<f32>, LexicalError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let fingerprint = Self::fingerprint(documents);
        let fresh = self
            .cached
            .as_ref()
            .is_some_and(|c| c.fingerprint == fingerprint);

        if !fresh {
            tracing::debug!("Building lexical index over {} candidates", documents.len());
            self.cached = Some(self.build(fingerprint, documents)?);
            self.builds += 1;
        }

        let candidates = self
            .cached
            .as_ref()
            .ok_or_else(|| LexicalError::IndexError("Candidate index missing".to_string()))?;

        Self::search(candidates, query)
    }

    fn build(
        &self,
        fingerprint: blake3::Hash,
        documents: &[&str],
    ) -> Result<CandidateIndex, LexicalError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER_NAME)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let position_field = schema_builder.add_u64_field("position", STORED);
        let text_field = schema_builder.add_text_field("text", text_options);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index
            .tokenizers()
            .register(TOKENIZER_NAME, build_analyzer(self.language));

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_MEMORY_BYTES)
            .map_err(|e| LexicalError::IndexError(e.to_string()))?;

        for (position, text) in documents.iter().enumerate() {
            writer
                .add_document(doc!(
                    position_field => position as u64,
                    text_field => *text,
                ))
                .map_err(|e| LexicalError::IndexError(e.to_string()))?;
        }

        writer
            .commit()
            .map_err(|e| LexicalError::IndexError(e.to_string()))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: TantivyError| LexicalError::IndexError(e.to_string()))?;

        Ok(CandidateIndex {
            fingerprint,
            size: documents.len(),
            index,
            reader,
            position_field,
            text_field,
        })
    }

    fn search(candidates: &CandidateIndex, query: &str) -> Result<Vec<f32>, LexicalError> {
        let mut scores = vec![0.0; candidates.size];

        let query_parser = QueryParser::for_index(&candidates.index, vec![candidates.text_field]);
        // Legal text is full of punctuation ("ст. 15-1", "п.3)") the strict parser rejects
        let (parsed, errors) = query_parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!("Ignored {} query syntax errors", errors.len());
        }

        let searcher = candidates.reader.searcher();
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(candidates.size))
            .map_err(|e| LexicalError::SearchError(e.to_string()))?;

        for (score, doc_address) in top_docs {
            let retrieved: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| LexicalError::SearchError(e.to_string()))?;

            let position = retrieved
                .get_first(candidates.position_field)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| {
                    LexicalError::SearchError("Missing or invalid position field".to_string())
                })? as usize;

            if let Some(slot) = scores.get_mut(position) {
                *slot = score;
            }
        }

        Ok(scores)
    }
}

/// Lexical relevance of candidate passages to a query
#[async_trait]
pub trait LexicalModel: Send + Sync {
    /// One score per document, in input order
    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, LexicalError>;
}

/// `LexicalScorer` shared between concurrent queries
///
/// Index builds and searches run on the blocking thread pool.
#[derive(Clone)]
pub struct Bm25Model {
    scorer: Arc<Mutex<LexicalScorer>>,
}

impl Bm25Model {
    pub fn new(language: LexicalLanguage) -> Self {
        Self {
            scorer: Arc::new(Mutex::new(LexicalScorer::new(language))),
        }
    }

    pub fn builds(&self) -> u64 {
        self.scorer.lock().builds()
    }
}

#[async_trait]
impl LexicalModel for Bm25Model {
    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>, LexicalError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let scorer = Arc::clone(&self.scorer);
        let query = query.to_string();
        let documents: Vec<String> = documents.iter().map(|d| d.to_string()).collect();

        tokio::task::spawn_blocking(move || {
            let documents: Vec<&str> = documents.iter().map(String::as_str).collect();
            scorer.lock().score(&query, &documents)
        })
        .await
        .map_err(|e| LexicalError::SearchError(format!("Lexical scoring task failed: {}", e)))?
    }
}

fn build_analyzer(language: LexicalLanguage) -> TextAnalyzer {
    let base = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(100))
        .filter(LowerCaser);

    match language {
        LexicalLanguage::None => base.build(),
        LexicalLanguage::English => base.filter(Stemmer::new(Language::English)).build(),
        LexicalLanguage::Russian => base.filter(Stemmer::new(Language::Russian)).build(),
    }
}
