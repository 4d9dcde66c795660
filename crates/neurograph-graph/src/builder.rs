//! Graph assembly
//!
//! Merges entities and candidate triples from processed documents into a
//! single graph, resolving duplicates by canonical identity and unioning
//! confidence, then produces immutable snapshots with a derived adjacency
//! index for traversal.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use neurograph_core::{Entity, RelationTriple, TripleKey};

// ============================================================================
// Predicate normalization (data table, not branching logic)
// ============================================================================

/// Synonym predicates folded onto a canonical label before merge keying
const PREDICATE_SYNONYMS: &[(&str, &str)] = &[
    ("enhances", "increases"),
    ("boosts", "increases"),
    ("elevates", "increases"),
    ("augments", "increases"),
    ("raises", "increases"),
    ("promotes", "increases"),
    ("inhibits", "suppresses"),
    ("attenuates", "suppresses"),
    ("dampens", "suppresses"),
    ("decreases", "reduces"),
    ("diminishes", "reduces"),
    ("lowers", "reduces"),
    ("influences", "modulates"),
    ("affects", "modulates"),
    ("alters", "modulates"),
];

/// Resolve a predicate label to its canonical form
pub fn normalize_predicate(predicate: &str) -> &str {
    PREDICATE_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == predicate)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(predicate)
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates extraction output into a unified graph
///
/// In cumulative mode one builder outlives many documents; otherwise a fresh
/// builder is created per document. Handing out a snapshot never exposes the
/// builder's internal state.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    entities: BTreeMap<String, Entity>,
    triples: BTreeMap<TripleKey, RelationTriple>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one entity into the graph by canonical id
    pub fn add_entity(&mut self, entity: Entity) {
        if entity.canonical_id.is_empty() {
            warn!("dropped entity with empty canonical id");
            return;
        }
        match self.entities.get_mut(&entity.canonical_id) {
            Some(existing) => existing.merge_from(entity),
            None => {
                self.entities.insert(entity.canonical_id.clone(), entity);
            }
        }
    }

    /// Merge one triple into the graph by `(subject, predicate, object)` key
    ///
    /// The predicate is normalized through the synonym table first. Merged
    /// duplicates keep the maximum confidence and accumulate evidence.
    pub fn add_triple(&mut self, mut triple: RelationTriple) {
        if triple.is_self_loop() {
            warn!(
                subject = %triple.subject_id,
                predicate = %triple.predicate,
                "dropped self-referential triple"
            );
            return;
        }
        triple.predicate = normalize_predicate(&triple.predicate).to_string();

        match self.triples.get_mut(&triple.key()) {
            Some(existing) => existing.merge_from(triple),
            None => {
                self.triples.insert(triple.key(), triple);
            }
        }
    }

    /// Merge a whole document extraction
    pub fn add_document(
        &mut self,
        entities: impl IntoIterator<Item = Entity>,
        triples: impl IntoIterator<Item = RelationTriple>,
    ) {
        for entity in entities {
            self.add_entity(entity);
        }
        for triple in triples {
            self.add_triple(triple);
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn triple_count(&self) -> usize {
        self.triples.len()
    }

    /// Produce an immutable snapshot with its derived adjacency index
    ///
    /// The builder may keep accumulating afterwards; snapshots already handed
    /// out are never mutated.
    pub fn snapshot(&self) -> GraphSnapshot {
        let entities: Vec<Entity> = self.entities.values().cloned().collect();
        let relations: Vec<RelationTriple> = self.triples.values().cloned().collect();

        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, triple) in relations.iter().enumerate() {
            outgoing.entry(triple.subject_id.clone()).or_default().push(i);
            incoming.entry(triple.object_id.clone()).or_default().push(i);
        }

        debug!(
            entities = entities.len(),
            relations = relations.len(),
            "graph snapshot taken"
        );

        GraphSnapshot {
            entities,
            relations,
            outgoing,
            incoming,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable graph snapshot handed to persistence and queries
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    /// Entities sorted by canonical id
    pub entities: Vec<Entity>,

    /// Relations sorted by merge key
    pub relations: Vec<RelationTriple>,

    /// Adjacency: canonical id -> indices into `relations` where it is subject
    outgoing: HashMap<String, Vec<usize>>,

    /// Adjacency: canonical id -> indices into `relations` where it is object
    incoming: HashMap<String, Vec<usize>>,
}

impl GraphSnapshot {
    /// Look up an entity by canonical id
    pub fn entity(&self, canonical_id: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.canonical_id == canonical_id)
    }

    /// Relations where the entity is the subject
    pub fn outgoing(&self, canonical_id: &str) -> Vec<&RelationTriple> {
        self.outgoing
            .get(canonical_id)
            .map(|indices| indices.iter().map(|&i| &self.relations[i]).collect())
            .unwrap_or_default()
    }

    /// Relations where the entity is the object
    pub fn incoming(&self, canonical_id: &str) -> Vec<&RelationTriple> {
        self.incoming
            .get(canonical_id)
            .map(|indices| indices.iter().map(|&i| &self.relations[i]).collect())
            .unwrap_or_default()
    }

    /// Export as a petgraph digraph for traversal and visualization
    ///
    /// Nodes carry canonical ids, edge weights carry confidence.
    pub fn to_petgraph(&self) -> DiGraph<String, f32> {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for entity in &self.entities {
            let idx = graph.add_node(entity.canonical_id.clone());
            nodes.insert(entity.canonical_id.as_str(), idx);
        }
        for triple in &self.relations {
            if let (Some(&a), Some(&b)) = (
                nodes.get(triple.subject_id.as_str()),
                nodes.get(triple.object_id.as_str()),
            ) {
                graph.add_edge(a, b, triple.confidence);
            }
        }
        graph
    }

    /// Canonical ids reachable from a start entity within `depth` hops,
    /// following edges in either direction
    pub fn neighbors_within(&self, canonical_id: &str, depth: usize) -> Vec<String> {
        let graph = self.to_petgraph();
        let Some(start) = graph.node_indices().find(|&i| graph[i] == canonical_id) else {
            return Vec::new();
        };

        let mut seen: HashSet<NodeIndex> = HashSet::from([start]);
        let mut frontier = vec![start];
        let mut result = Vec::new();

        for _ in 0..depth {
            let mut next = Vec::new();
            for node in frontier {
                for neighbor in graph.neighbors_undirected(node) {
                    if seen.insert(neighbor) {
                        result.push(graph[neighbor].clone());
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
        }

        result.sort();
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use neurograph_core::{EntityType, EvidenceSpan};

    fn entity(id: &str, entity_type: EntityType) -> Entity {
        Entity::new(id, entity_type)
    }

    fn triple(subject: &str, predicate: &str, object: &str, confidence: f32) -> RelationTriple {
        RelationTriple::new(subject, predicate, object, confidence).with_evidence(EvidenceSpan {
            sentence_index: 0,
            text: format!("{subject} {predicate} {object}"),
        })
    }

    #[test]
    fn test_normalize_predicate() {
        assert_eq!(normalize_predicate("enhances"), "increases");
        assert_eq!(normalize_predicate("inhibits"), "suppresses");
        assert_eq!(normalize_predicate("increases"), "increases");
        assert_eq!(normalize_predicate("is_a"), "is_a");
    }

    #[test]
    fn test_entities_merge_by_canonical_id() {
        let mut builder = GraphBuilder::new();
        builder.add_entity(entity("stress", EntityType::Environment));
        builder.add_entity(entity("stress", EntityType::Environment));
        builder.add_entity(entity("amygdala", EntityType::NeuralRegion));

        assert_eq!(builder.entity_count(), 2);
    }

    #[test]
    fn test_triples_merge_with_max_confidence() {
        let mut builder = GraphBuilder::new();
        builder.add_triple(triple("stress", "increases", "amygdala activation", 0.7));
        builder.add_triple(triple("stress", "increases", "amygdala activation", 0.9));
        builder.add_triple(triple("stress", "increases", "amygdala activation", 0.8));

        assert_eq!(builder.triple_count(), 1);
        let snapshot = builder.snapshot();
        assert_eq!(snapshot.relations[0].confidence, 0.9);
    }

    #[test]
    fn test_synonym_predicates_merge() {
        let mut builder = GraphBuilder::new();
        builder.add_triple(triple("exercise", "enhances", "plasticity", 0.6));
        builder.add_triple(triple("exercise", "increases", "plasticity", 0.8));
        builder.add_triple(triple("exercise", "boosts", "plasticity", 0.7));

        assert_eq!(builder.triple_count(), 1);
        let snapshot = builder.snapshot();
        assert_eq!(snapshot.relations[0].predicate, "increases");
        assert_eq!(snapshot.relations[0].confidence, 0.8);
    }

    #[test]
    fn test_self_loops_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_triple(triple("stress", "increases", "stress", 0.9));
        assert_eq!(builder.triple_count(), 0);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_additions() {
        let mut builder = GraphBuilder::new();
        builder.add_entity(entity("stress", EntityType::Environment));
        let snapshot = builder.snapshot();

        builder.add_entity(entity("amygdala", EntityType::NeuralRegion));
        builder.add_triple(triple("stress", "increases", "amygdala activation", 0.8));

        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.relations.len(), 0);
        assert_eq!(builder.entity_count(), 2);
    }

    #[test]
    fn test_adjacency_index() {
        let mut builder = GraphBuilder::new();
        builder.add_triple(triple("stress", "increases", "amygdala activation", 0.8));
        builder.add_triple(triple("stress", "impairs", "memory", 0.7));
        builder.add_triple(triple("exercise", "reduces", "stress", 0.6));

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.outgoing("stress").len(), 2);
        assert_eq!(snapshot.incoming("stress").len(), 1);
        assert_eq!(snapshot.incoming("memory").len(), 1);
        assert!(snapshot.outgoing("memory").is_empty());
    }

    #[test]
    fn test_neighbors_within_depth() {
        let mut builder = GraphBuilder::new();
        for id in ["stress", "amygdala activation", "memory", "exercise"] {
            builder.add_entity(entity(id, EntityType::Unknown));
        }
        builder.add_triple(triple("stress", "increases", "amygdala activation", 0.8));
        builder.add_triple(triple("exercise", "reduces", "stress", 0.6));
        builder.add_triple(triple("amygdala activation", "impairs", "memory", 0.5));

        let snapshot = builder.snapshot();
        let one_hop = snapshot.neighbors_within("stress", 1);
        assert_eq!(one_hop, vec!["amygdala activation", "exercise"]);

        let two_hops = snapshot.neighbors_within("stress", 2);
        assert!(two_hops.contains(&"memory".to_string()));
    }

    proptest::proptest! {
        /// Merged confidence is the maximum of the inputs and stays in [0, 1]
        #[test]
        fn prop_merged_confidence_is_max_and_bounded(
            scores in proptest::collection::vec(-0.5f32..1.5, 1..20)
        ) {
            let mut builder = GraphBuilder::new();
            for &score in &scores {
                builder.add_triple(triple("stress", "increases", "memory", score));
            }
            let snapshot = builder.snapshot();
            let merged = snapshot.relations[0].confidence;
            let expected = scores
                .iter()
                .map(|s| s.clamp(0.0, 1.0))
                .fold(0.0f32, f32::max);
            proptest::prop_assert!((0.0..=1.0).contains(&merged));
            proptest::prop_assert_eq!(merged, expected);
        }
    }

    #[test]
    fn test_merge_is_idempotent_across_documents() {
        let mut builder = GraphBuilder::new();
        let mut stress = entity("stress", EntityType::Environment);
        stress.surface_forms.insert("Chronic stress".to_string());

        builder.add_document(
            vec![stress.clone()],
            vec![triple("stress", "increases", "amygdala activation", 0.8)],
        );
        builder.add_document(
            vec![stress],
            vec![triple("stress", "increases", "amygdala activation", 0.8)],
        );

        assert_eq!(builder.entity_count(), 1);
        assert_eq!(builder.triple_count(), 1);
        let snapshot = builder.snapshot();
        assert_eq!(snapshot.relations[0].confidence, 0.8);
        assert_eq!(snapshot.relations[0].evidence.len(), 1);
    }
}
