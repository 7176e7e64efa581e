use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credibility::normalize_domain;

/// One entry of the document pool handed over by the search collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDocument {
    pub text: String,
    #[serde(default)]
    pub url: String,
}

impl PoolDocument {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Indexed document. `id` is the position in the fit-time corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: usize,
    pub text: String,
    pub url: String,
    pub domain: Option<String>,
}

/// Fixed document pool for one claim-evaluation run
///
/// Ids are dense (`0..len`) and never change once the store is built.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Build the store, dropping entries whose text is blank.
    pub fn from_pool(pool: Vec<PoolDocument>) -> Self {
        let documents = pool
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .enumerate()
            .map(|(id, d)| {
                let domain = Some(normalize_domain(&d.url)).filter(|s| !s.is_empty());
                Document {
                    id,
                    text: d.text,
                    url: d.url,
                    domain,
                }
            })
            .collect();

        Self { documents }
    }

    /// Build the store, substituting the claim itself when the pool is empty
    /// so that indexing never runs over an empty corpus.
    pub fn from_pool_or_claim(pool: Vec<PoolDocument>, claim: &Claim) -> Self {
        let store = Self::from_pool(pool);
        if store.is_empty() {
            tracing::warn!(claim_id = %claim.id, "Empty document pool, indexing the claim text");
            return Self::from_pool(vec![PoolDocument::new(claim.text.clone(), "")]);
        }
        store
    }

    pub fn get(&self, id: usize) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// The claim under evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
}

impl Claim {
    /// Create a claim, generating an id when the caller supplies none.
    pub fn new(text: impl Into<String>, id: Option<String>) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()).unwrap_or_else(generate_claim_id),
            text: text.into(),
        }
    }
}

/// `CLM-<YYYYMMDD>-<8 hex>`; unique without coordination.
pub fn generate_claim_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("CLM-{}-{}", Utc::now().format("%Y%m%d"), &hex[..8])
}
