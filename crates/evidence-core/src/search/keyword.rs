use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, STORED,
};
use tantivy::tokenizer::{LowerCaser, RegexTokenizer, TextAnalyzer, TokenStream};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::debug;

use crate::document::Document;
use crate::error::IndexError;
use crate::search::top_k_indices;

/// Analyzer name registered on every per-claim index
pub const CLAIM_ANALYZER: &str = "claim_words";

/// A token is a maximal run of word characters, case-folded
const TOKEN_PATTERN: &str = r"\w+";

/// Keyword search index using Tantivy for BM25 matching
///
/// Built once per run over the document store and kept entirely in RAM.
/// Indexing and querying share the [`CLAIM_ANALYZER`] analyzer, and queries
/// are assembled from its tokens rather than parsed, so arbitrary claim
/// text (quotes, colons, `AND`) never produces a query syntax error.
///
/// # Schema
///
/// - `doc_id`: position of the document in the store (FAST | STORED)
/// - `text`: document text, indexed with frequencies and positions
pub struct KeywordIndex {
    reader: IndexReader,
    analyzer: TextAnalyzer,
    doc_id_field: Field,
    text_field: Field,
    num_docs: usize,
}

impl KeywordIndex {
    /// Build the index over `documents` with a single commit
    ///
    /// An empty slice yields a valid index with zero documents.
    pub fn build(documents: &[Document]) -> Result<Self, IndexError> {
        let mut schema_builder = Schema::builder();

        let doc_id_field = schema_builder.add_u64_field("doc_id", FAST | STORED);
        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(CLAIM_ANALYZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let text_field = schema_builder.add_text_field("text", text_options);

        let schema = schema_builder.build();
        let index = Index::create_in_ram(schema);

        let analyzer = claim_analyzer()?;
        index.tokenizers().register(CLAIM_ANALYZER, analyzer.clone());

        let mut index_writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000)?;
        for document in documents {
            let mut doc = TantivyDocument::new();
            doc.add_u64(doc_id_field, document.id as u64);
            doc.add_text(text_field, &document.text);
            index_writer.add_document(doc)?;
        }
        index_writer.commit()?;

        // Never reloaded: the index is immutable after this commit.
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        debug!("Keyword index built over {} documents", documents.len());

        Ok(Self {
            reader,
            analyzer,
            doc_id_field,
            text_field,
            num_docs: documents.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.num_docs
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs == 0
    }

    /// Split text exactly as the index does
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }

    /// BM25 score of every document against `query`
    ///
    /// Indexed by doc id; documents sharing no token with the query score 0.0.
    pub fn score_all(&self, query: &str) -> Result<Vec<f32>, IndexError> {
        let mut scores = vec![0.0f32; self.num_docs];
        let tokens = self.tokenize(query);
        if tokens.is_empty() || self.num_docs == 0 {
            return Ok(scores);
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
            .iter()
            .map(|token| {
                let term = tantivy::Term::from_field_text(self.text_field, token);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();

        let top_docs = searcher.search(&query, &TopDocs::with_limit(self.num_docs))?;
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let doc_id = doc
                .get_first(self.doc_id_field)
                .and_then(|v| v.as_u64())
                .map(|id| id as usize);
            if let Some(slot) = doc_id.and_then(|id| scores.get_mut(id)) {
                *slot = score;
            }
        }

        Ok(scores)
    }

    /// Top-k documents by descending BM25 score, ties by doc id ascending
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        let scores = self.score_all(query)?;
        Ok(top_k_indices(&scores, k)
            .into_iter()
            .map(|id| (id, scores[id]))
            .collect())
    }
}

fn claim_analyzer() -> Result<TextAnalyzer, IndexError> {
    let tokenizer =
        RegexTokenizer::new(TOKEN_PATTERN).map_err(|e| IndexError::Tokenizer(e.to_string()))?;
    Ok(TextAnalyzer::builder(tokenizer).filter(LowerCaser).build())
}
