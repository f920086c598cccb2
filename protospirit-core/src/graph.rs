//! Relationship edges for diagram views
//!
//! Two entities often declare the same association from both ends. Views
//! draw one edge per unordered pair of entities.

use serde::Serialize;
use std::collections::HashSet;

use crate::models::{Entity, RelationshipType};

/// Dedup key for the unordered pair `{a, b}`
pub fn edge_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}|{}", a, b)
    } else {
        format!("{}|{}", b, a)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdge {
    pub key: String,
    pub source: String,
    pub target: String,
    pub rel_type: RelationshipType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RelationshipEdge {
    /// The edge as read from `entity`'s end: the relationship type in that
    /// direction and the entity on the other end. `None` when the edge does
    /// not touch `entity`.
    pub fn seen_from(&self, entity: &str) -> Option<(RelationshipType, &str)> {
        if self.source == entity {
            Some((self.rel_type, &self.target))
        } else if self.target == entity {
            Some((self.rel_type.inverse(), &self.source))
        } else {
            None
        }
    }
}

/// One edge per unordered entity pair; the first declaration wins.
/// Soft-removed entities and relationships are skipped.
pub fn relationship_edges(entities: &[Entity]) -> Vec<RelationshipEdge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for entity in entities.iter().filter(|e| !e.metadata.is_removed) {
        for rel in entity.relationships.iter().filter(|r| !r.is_removed) {
            let key = edge_key(&entity.name, &rel.entity);
            if seen.insert(key.clone()) {
                edges.push(RelationshipEdge {
                    key,
                    source: entity.name.clone(),
                    target: rel.entity.clone(),
                    rel_type: rel.rel_type,
                    description: rel.description.clone(),
                });
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_is_order_independent() {
        assert_eq!(edge_key("Student", "Course"), "Course|Student");
        assert_eq!(edge_key("Course", "Student"), "Course|Student");
    }

    #[test]
    fn test_mutual_relationships_render_once() {
        let entities = vec![
            Entity::new("A").with_relationship(RelationshipType::OneToMany, "B"),
            Entity::new("B").with_relationship(RelationshipType::ManyToOne, "A"),
        ];
        let edges = relationship_edges(&entities);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].key, "A|B");
        assert_eq!(edges[0].source, "A");
        assert_eq!(edges[0].rel_type, RelationshipType::OneToMany);
    }

    #[test]
    fn test_edge_seen_from_either_end() {
        let entities = vec![
            Entity::new("Book").with_relationship(RelationshipType::ManyToOne, "Author"),
            Entity::new("Author"),
        ];
        let edges = relationship_edges(&entities);
        assert_eq!(
            edges[0].seen_from("Book"),
            Some((RelationshipType::ManyToOne, "Author"))
        );
        assert_eq!(
            edges[0].seen_from("Author"),
            Some((RelationshipType::OneToMany, "Book"))
        );
        assert_eq!(edges[0].seen_from("Library"), None);
    }

    #[test]
    fn test_removed_relationships_are_skipped() {
        let mut a = Entity::new("A")
            .with_relationship(RelationshipType::OneToMany, "B")
            .with_relationship(RelationshipType::OneToOne, "A");
        a.relationships[0].is_removed = true;
        let edges = relationship_edges(&[a, Entity::new("B")]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].key, "A|A");
    }
}
