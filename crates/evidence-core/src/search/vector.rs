//! Dense similarity search over sentence embeddings
//!
//! Two interchangeable implementations of [`VectorIndex`], chosen
//! explicitly at construction through [`VectorBackend`]:
//!
//! - [`TensorIndex`]: the L2-normalized embedding matrix lives on the candle
//!   device and each query is a single matmul (exact inner product).
//! - [`BruteForceIndex`]: normalized vectors in plain `Vec`s and a cosine
//!   loop; no device required.
//!
//! Both return the same thing for the same input: descending score, ties
//! by doc id ascending, `k` clamped to the corpus size.

use candle_core::{Device, Tensor};

use crate::config::VectorBackend;
use crate::error::IndexError;
use crate::search::top_k_indices;

/// Exact similarity search over a fixed set of document vectors
pub trait VectorIndex: Send + Sync {
    /// Top-k `(doc_id, similarity)` pairs for `query`
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError>;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the name of this backend
    fn name(&self) -> &str;
}

/// Build the index selected by `backend`
///
/// `vectors[i]` must be the embedding of document `i`.
pub fn build_vector_index(
    backend: VectorBackend,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
    device: &Device,
) -> Result<Box<dyn VectorIndex>, IndexError> {
    let index: Box<dyn VectorIndex> = match backend {
        VectorBackend::Tensor => Box::new(TensorIndex::new(vectors, dimension, device)?),
        VectorBackend::BruteForce => Box::new(BruteForceIndex::new(vectors, dimension)?),
    };
    Ok(index)
}

fn check_dimension(vector: &[f32], dimension: usize) -> Result<(), IndexError> {
    if vector.len() != dimension {
        return Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return vec![0.0; vector.len()];
    }
    vector.iter().map(|x| x / norm).collect()
}

fn ranked(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    top_k_indices(scores, k)
        .into_iter()
        .map(|id| (id, scores[id]))
        .collect()
}

/// Pure Rust cosine similarity over normalized vectors
pub struct BruteForceIndex {
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl BruteForceIndex {
    pub fn new(vectors: Vec<Vec<f32>>, dimension: usize) -> Result<Self, IndexError> {
        let vectors = vectors
            .iter()
            .map(|v| check_dimension(v, dimension).map(|_| normalized(v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { vectors, dimension })
    }
}

impl VectorIndex for BruteForceIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        check_dimension(query, self.dimension)?;
        let query = normalized(query);

        let scores: Vec<f32> = self
            .vectors
            .iter()
            .map(|v| v.iter().zip(&query).map(|(a, b)| a * b).sum())
            .collect();

        Ok(ranked(&scores, k))
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn name(&self) -> &str {
        "brute_force"
    }
}

/// Flat inner-product index on the candle device
pub struct TensorIndex {
    /// [num_docs, dimension]; `None` for an empty corpus
    matrix: Option<Tensor>,
    dimension: usize,
    device: Device,
}

impl TensorIndex {
    pub fn new(vectors: Vec<Vec<f32>>, dimension: usize, device: &Device) -> Result<Self, IndexError> {
        let rows = vectors.len();
        let mut flat = Vec::with_capacity(rows * dimension);
        for vector in &vectors {
            check_dimension(vector, dimension)?;
            flat.extend(normalized(vector));
        }

        let matrix = if rows == 0 {
            None
        } else {
            Some(Tensor::from_vec(flat, (rows, dimension), device).map_err(tensor_error)?)
        };

        Ok(Self {
            matrix,
            dimension,
            device: device.clone(),
        })
    }
}

impl VectorIndex for TensorIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        check_dimension(query, self.dimension)?;
        let Some(matrix) = &self.matrix else {
            return Ok(Vec::new());
        };

        let query = Tensor::from_vec(normalized(query), (self.dimension, 1), &self.device)
            .map_err(tensor_error)?;
        let scores = matrix
            .matmul(&query)
            .and_then(|s| s.squeeze(1))
            .and_then(|s| s.to_vec1::<f32>())
            .map_err(tensor_error)?;

        Ok(ranked(&scores, k))
    }

    fn len(&self) -> usize {
        self.matrix
            .as_ref()
            .map(|m| m.dims().first().copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn name(&self) -> &str {
        "tensor"
    }
}

fn tensor_error(e: candle_core::Error) -> IndexError {
    IndexError::Vector(e.to_string())
}
