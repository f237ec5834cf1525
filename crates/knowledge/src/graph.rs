//! Concept graph - a directed, weighted, multi-relation graph over concepts.

use crate::{cosine_similarity, Embedder, HashEmbedder};
use dashmap::DashMap;
use evolve_core::{Context, Time};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// A named concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Free-form properties, merged on every `add_concept`
    pub properties: Context,
    /// When the concept was first referenced
    pub created_at: Time,
    /// Number of traversal visits
    pub access_count: u64,
    /// Embedding, fixed at creation
    pub embedding: Vec<f64>,
}

/// A directed, typed, weighted link to another concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Target concept
    pub target: String,
    /// Relation type (e.g. `succeeds_with`)
    pub relation: String,
    /// EMA-blended weight
    pub weight: f64,
    /// When the edge was first added
    pub created_at: Time,
    /// Number of times the edge was added or reinforced
    pub usage_count: u32,
}

/// Summary counts for a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    /// Number of concepts
    pub concept_count: usize,
    /// Number of edges over all sources, targets and relation types
    pub relation_count: usize,
    /// Most visited concept and its visit count
    pub most_accessed: Option<(String, u64)>,
}

/// Configuration for the concept graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// EMA rate used when an existing edge is reinforced
    pub learning_rate: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { learning_rate: 0.1 }
    }
}

/// Concurrent concept graph.
///
/// Edges are kept in per-source adjacency lists, so all edges leaving a
/// concept are reached with one map lookup and iterate in first-seen
/// order. Invalid input (blank names) is ignored rather than rejected.
pub struct ConceptGraph {
    nodes: DashMap<String, ConceptNode>,
    edges: DashMap<String, Vec<RelationEdge>>,
    embedder: Arc<dyn Embedder>,
    config: GraphConfig,
}

impl ConceptGraph {
    /// Create an empty graph with the default hash embedder.
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            edges: DashMap::new(),
            embedder: Arc::new(HashEmbedder::default()),
            config: GraphConfig::default(),
        }
    }

    /// Use a different embedding source.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Insert a concept, or merge properties into an existing one.
    pub fn add_concept(&self, name: &str, properties: Context) {
        if name.trim().is_empty() {
            return;
        }

        self.nodes
            .entry(name.to_string())
            .and_modify(|node| node.properties.extend(properties.clone()))
            .or_insert_with(|| {
                debug!("New concept: {}", name);
                ConceptNode {
                    embedding: self.embedder.embed(name, &properties),
                    properties: properties.clone(),
                    created_at: chrono::Utc::now(),
                    access_count: 0,
                }
            });
    }

    /// Insert an edge or blend its weight with the learning rate.
    ///
    /// Missing endpoints are created. Blank names are ignored.
    pub fn add_relation(&self, from: &str, to: &str, relation: &str, weight: f64) {
        if from.trim().is_empty() || to.trim().is_empty() || relation.trim().is_empty() {
            return;
        }

        self.add_concept(from, Context::new());
        self.add_concept(to, Context::new());

        let alpha = self.config.learning_rate;
        let mut adjacency = self.edges.entry(from.to_string()).or_default();
        match adjacency
            .iter_mut()
            .find(|e| e.target == to && e.relation == relation)
        {
            Some(edge) => {
                edge.weight = (1.0 - alpha) * edge.weight + alpha * weight;
                edge.usage_count += 1;
            }
            None => adjacency.push(RelationEdge {
                target: to.to_string(),
                relation: relation.to_string(),
                weight,
                created_at: chrono::Utc::now(),
                usage_count: 1,
            }),
        }
    }

    /// Breadth-first search from `concept` up to `max_distance` hops.
    ///
    /// Every visited node, the origin included, has its access count
    /// bumped. The origin itself is not returned. Results are in visit
    /// order.
    pub fn find_related_concepts(&self, concept: &str, max_distance: usize) -> Vec<String> {
        if !self.nodes.contains_key(concept) {
            return Vec::new();
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(concept.to_string());
        queue.push_back((concept.to_string(), 0usize));

        while let Some((current, distance)) = queue.pop_front() {
            if let Some(mut node) = self.nodes.get_mut(&current) {
                node.access_count += 1;
            }
            if current != concept {
                order.push(current.clone());
            }
            if distance >= max_distance {
                continue;
            }

            let targets: Vec<String> = self
                .edges
                .get(&current)
                .map(|adj| adj.iter().map(|e| e.target.clone()).collect())
                .unwrap_or_default();

            for target in targets {
                if visited.insert(target.clone()) {
                    queue.push_back((target, distance + 1));
                }
            }
        }

        order
    }

    /// Similarity of two concepts.
    ///
    /// `1.0` for the same name, `0.0` if either is unknown, otherwise the
    /// cosine similarity of their embeddings.
    pub fn concept_similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        let Some(embedding_a) = self.nodes.get(a).map(|n| n.embedding.clone()) else {
            return 0.0;
        };
        match self.nodes.get(b) {
            Some(node_b) => cosine_similarity(&embedding_a, &node_b.embedding),
            None => 0.0,
        }
    }

    /// Target of the heaviest outgoing edge, optionally restricted to some
    /// relation types. Ties go to the edge seen first.
    pub fn strongest_related_concept(&self, concept: &str, relations: Option<&[&str]>) -> Option<String> {
        let adjacency = self.edges.get(concept)?;
        let mut best: Option<&RelationEdge> = None;
        for edge in adjacency.iter() {
            if let Some(allowed) = relations {
                if !allowed.contains(&edge.relation.as_str()) {
                    continue;
                }
            }
            if best.map_or(true, |b| edge.weight > b.weight) {
                best = Some(edge);
            }
        }
        best.map(|e| e.target.clone())
    }

    /// All outgoing edges of a concept, in first-seen order.
    pub fn direct_relations(&self, concept: &str) -> Vec<RelationEdge> {
        self.edges
            .get(concept)
            .map(|adj| adj.value().clone())
            .unwrap_or_default()
    }

    /// Look up a single edge.
    pub fn relation(&self, from: &str, to: &str, relation: &str) -> Option<RelationEdge> {
        self.edges.get(from)?.iter()
            .find(|e| e.target == to && e.relation == relation)
            .cloned()
    }

    /// Remove edges lighter than `weight_threshold` or older than `max_age`.
    ///
    /// Returns the number of removed edges.
    pub fn cleanup_weak_relations(&self, weight_threshold: f64, max_age: chrono::Duration) -> usize {
        self.cleanup_weak_relations_at(chrono::Utc::now(), weight_threshold, max_age)
    }

    /// Same as [`ConceptGraph::cleanup_weak_relations`], measuring age from `now`.
    pub fn cleanup_weak_relations_at(
        &self,
        now: Time,
        weight_threshold: f64,
        max_age: chrono::Duration,
    ) -> usize {
        let mut removed = 0;
        self.edges.retain(|_, adjacency| {
            let before = adjacency.len();
            adjacency.retain(|e| e.weight >= weight_threshold && now - e.created_at <= max_age);
            removed += before - adjacency.len();
            !adjacency.is_empty()
        });
        if removed > 0 {
            info!("Removed {} weak relations", removed);
        }
        removed
    }

    /// Concept count, relation count and the most visited concept.
    pub fn statistics(&self) -> GraphStatistics {
        let relation_count = self.edges.iter().map(|adj| adj.len()).sum();
        let most_accessed = self
            .nodes
            .iter()
            .map(|n| (n.key().clone(), n.access_count))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

        GraphStatistics {
            concept_count: self.nodes.len(),
            relation_count,
            most_accessed,
        }
    }

    /// Copy of a concept node.
    pub fn concept(&self, name: &str) -> Option<ConceptNode> {
        self.nodes.get(name).map(|n| n.value().clone())
    }

    /// Whether a concept exists.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All concept names, sorted.
    pub fn concept_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }

    /// Up to `limit` concept names, most visited first (ties by name).
    pub fn most_accessed_concepts(&self, limit: usize) -> Vec<String> {
        let mut ranked: Vec<(String, u64)> = self
            .nodes
            .iter()
            .map(|n| (n.key().clone(), n.access_count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().take(limit).map(|(name, _)| name).collect()
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no concepts.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for ConceptGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_core::{context, Value};

    fn create_test_graph() -> ConceptGraph {
        // a -> b -> c -> d, plus a -> e
        let graph = ConceptGraph::new();
        graph.add_relation("a", "b", "next", 0.5);
        graph.add_relation("b", "c", "next", 0.5);
        graph.add_relation("c", "d", "next", 0.5);
        graph.add_relation("a", "e", "other", 0.9);
        graph
    }

    #[test]
    fn test_add_concept_merges_properties() {
        let graph = ConceptGraph::new();
        graph.add_concept("X", Context::new());
        graph.add_concept("X", context! { "k" => "v" });
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.concept("X").unwrap().properties.get("k"), Some(&Value::from("v")));
    }

    #[test]
    fn test_blank_names_ignored() {
        let graph = ConceptGraph::new();
        graph.add_concept("  ", Context::new());
        graph.add_relation("a", "", "rel", 1.0);
        graph.add_relation("a", "b", "", 1.0);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_add_relation_blends_weight() {
        let graph = ConceptGraph::new();
        graph.add_relation("task:x", "action:y", "succeeds_with", 1.0);
        graph.add_relation("task:x", "action:y", "succeeds_with", 0.0);
        let edge = graph.relation("task:x", "action:y", "succeeds_with").unwrap();
        assert!((edge.weight - 0.9).abs() < 1e-9);
        assert_eq!(edge.usage_count, 2);
        assert!(graph.contains("task:x") && graph.contains("action:y"));
        assert_eq!(graph.statistics().relation_count, 1);
    }

    #[test]
    fn test_bfs_respects_distance() {
        let graph = create_test_graph();
        let one = graph.find_related_concepts("a", 1);
        assert_eq!(one, vec!["b", "e"]);

        let two = graph.find_related_concepts("a", 2);
        assert!(two.contains(&"c".to_string()));
        assert!(!two.contains(&"d".to_string()));
        assert!(!two.contains(&"a".to_string()));

        assert!(graph.find_related_concepts("unknown", 3).is_empty());
    }

    #[test]
    fn test_bfs_handles_cycles() {
        let graph = ConceptGraph::new();
        graph.add_relation("a", "b", "r", 1.0);
        graph.add_relation("b", "a", "r", 1.0);
        assert_eq!(graph.find_related_concepts("a", 10), vec!["b"]);
        assert_eq!(graph.concept("a").unwrap().access_count, 1);
        assert_eq!(graph.concept("b").unwrap().access_count, 1);
    }

    #[test]
    fn test_similarity_identity() {
        let graph = create_test_graph();
        assert_eq!(graph.concept_similarity("a", "a"), 1.0);
        assert_eq!(graph.concept_similarity("a", "unknown"), 0.0);
        let s = graph.concept_similarity("a", "b");
        assert!((-1.0..=1.0).contains(&s));
    }

    #[test]
    fn test_strongest_related_concept() {
        let graph = create_test_graph();
        assert_eq!(graph.strongest_related_concept("a", None).as_deref(), Some("e"));
        assert_eq!(
            graph.strongest_related_concept("a", Some(&["next"])).as_deref(),
            Some("b")
        );
        assert_eq!(graph.strongest_related_concept("d", None), None);

        // ties keep the first edge
        graph.add_relation("t", "first", "r", 0.5);
        graph.add_relation("t", "second", "r", 0.5);
        assert_eq!(graph.strongest_related_concept("t", None).as_deref(), Some("first"));
    }

    #[test]
    fn test_cleanup_by_weight() {
        let graph = create_test_graph();
        let removed = graph.cleanup_weak_relations(0.6, chrono::Duration::hours(1));
        assert_eq!(removed, 3);
        assert_eq!(graph.statistics().relation_count, 1);
        assert!(graph.direct_relations("b").is_empty());
        for name in graph.concept_names() {
            assert!(graph.direct_relations(&name).iter().all(|e| e.weight >= 0.6));
        }
    }

    #[test]
    fn test_cleanup_by_age() {
        let graph = create_test_graph();
        let later = chrono::Utc::now() + chrono::Duration::hours(2);
        let removed = graph.cleanup_weak_relations_at(later, 0.0, chrono::Duration::hours(1));
        assert_eq!(removed, 4);
        assert_eq!(graph.statistics().relation_count, 0);
        // concepts survive edge cleanup
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn test_statistics() {
        let graph = create_test_graph();
        graph.find_related_concepts("a", 1);
        graph.find_related_concepts("a", 1);
        let stats = graph.statistics();
        assert_eq!(stats.concept_count, 5);
        assert_eq!(stats.relation_count, 4);
        assert_eq!(stats.most_accessed, Some(("a".to_string(), 2)));
    }
}
