//! Knowledge layer - the concept graph.
//!
//! Concepts (tasks, actions, derived notions) are linked by typed,
//! weighted edges and carry embeddings for similarity queries.

#![warn(missing_docs)]

pub mod embedding;
pub mod graph;

pub use embedding::{cosine_similarity, normalize, Embedder, HashEmbedder, DEFAULT_DIMENSION};
pub use graph::{ConceptGraph, ConceptNode, GraphConfig, GraphStatistics, RelationEdge};
