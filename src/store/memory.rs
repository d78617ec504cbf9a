//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No durability**: everything lives in process memory.
//! - **Single-writer only**: per-collection locks mean multi-step mutations
//!   are NOT atomic. Safe for single-threaded or read-heavy use only.
//! - **No property indexes**: `find_node` scans the label's nodes.
//!
//! Use this store for:
//! - Testing the lifecycle, affinity, and recommendation logic
//! - Embedding spacegraph in applications that don't need persistence

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use async_trait::async_trait;

use crate::model::*;
use crate::{Error, Result};
use super::GraphStore;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory social graph storage.
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    relationships: RwLock<HashMap<RelId, Relationship>>,
    /// node_id → list of relationship IDs, in creation order
    adjacency: RwLock<HashMap<NodeId, Vec<RelId>>>,
    /// label → node IDs in creation order (poor man's label index)
    label_index: RwLock<HashMap<String, Vec<NodeId>>>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                nodes: RwLock::new(HashMap::new()),
                relationships: RwLock::new(HashMap::new()),
                adjacency: RwLock::new(HashMap::new()),
                label_index: RwLock::new(HashMap::new()),
                next_node_id: AtomicU64::new(1),
                next_rel_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

#[async_trait]
impl GraphStore for MemoryStore {
    // ========================================================================
    // Node CRUD
    // ========================================================================

    async fn create_node(&self, label: &str, props: PropertyMap) -> Result<NodeId> {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        let node = Node {
            id,
            label: label.to_string(),
            properties: props,
        };

        self.inner
            .label_index
            .write()
            .entry(label.to_string())
            .or_default()
            .push(id);
        self.inner.nodes.write().insert(id, node);
        self.inner.adjacency.write().insert(id, Vec::new());

        Ok(id)
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.inner.nodes.read().get(&id).cloned())
    }

    async fn find_node(&self, label: &str, key: &str, value: &Value) -> Result<Option<Node>> {
        let idx = self.inner.label_index.read();
        let nodes = self.inner.nodes.read();

        let ids = idx.get(label).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| nodes.get(id))
            .find(|n| n.get(key) == Some(value))
            .cloned())
    }

    async fn nodes_by_label(&self, label: &str) -> Result<Vec<Node>> {
        let idx = self.inner.label_index.read();
        let nodes = self.inner.nodes.read();

        let ids = idx.get(label).cloned().unwrap_or_default();
        Ok(ids.iter().filter_map(|id| nodes.get(id).cloned()).collect())
    }

    async fn set_node_property(&self, id: NodeId, key: &str, val: Value) -> Result<()> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        node.properties.insert(key.to_string(), val);
        Ok(())
    }

    async fn detach_delete_node(&self, id: NodeId) -> Result<bool> {
        // Collect and drop every touching relationship first.
        let rel_ids = self
            .inner
            .adjacency
            .read()
            .get(&id)
            .cloned()
            .unwrap_or_default();
        for rid in rel_ids {
            self.delete_relationship(rid).await?;
        }

        let removed = self.inner.nodes.write().remove(&id);
        self.inner.adjacency.write().remove(&id);

        if let Some(node) = &removed {
            let mut idx = self.inner.label_index.write();
            if let Some(ids) = idx.get_mut(&node.label) {
                ids.retain(|nid| *nid != id);
            }
        }

        Ok(removed.is_some())
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    async fn create_relationship(
        &self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> Result<RelId> {
        // Verify both nodes exist
        {
            let nodes = self.inner.nodes.read();
            if !nodes.contains_key(&src) {
                return Err(Error::NotFound(format!("Source node {src}")));
            }
            if !nodes.contains_key(&dst) {
                return Err(Error::NotFound(format!("Target node {dst}")));
            }
        }

        let id = RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed));
        let rel = Relationship {
            id,
            src,
            dst,
            rel_type: rel_type.to_string(),
            properties: props,
        };

        self.inner.relationships.write().insert(id, rel);

        // Update adjacency for both endpoints
        let mut adj = self.inner.adjacency.write();
        adj.entry(src).or_default().push(id);
        if src != dst {
            adj.entry(dst).or_default().push(id);
        }

        Ok(id)
    }

    async fn get_relationship(&self, id: RelId) -> Result<Option<Relationship>> {
        Ok(self.inner.relationships.read().get(&id).cloned())
    }

    async fn delete_relationship(&self, id: RelId) -> Result<bool> {
        let removed = self.inner.relationships.write().remove(&id);
        if let Some(rel) = &removed {
            let mut adj = self.inner.adjacency.write();
            if let Some(rels) = adj.get_mut(&rel.src) {
                rels.retain(|rid| *rid != id);
            }
            if rel.src != rel.dst {
                if let Some(rels) = adj.get_mut(&rel.dst) {
                    rels.retain(|rid| *rid != id);
                }
            }
        }
        Ok(removed.is_some())
    }

    async fn set_relationship_property(&self, id: RelId, key: &str, val: Value) -> Result<()> {
        let mut rels = self.inner.relationships.write();
        let rel = rels
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Relationship {id}")))?;
        rel.properties.insert(key.to_string(), val);
        Ok(())
    }

    // ========================================================================
    // Pattern reads
    // ========================================================================

    async fn relationships(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        let adj = self.inner.adjacency.read();
        let rels = self.inner.relationships.read();

        let rel_ids = adj.get(&node).cloned().unwrap_or_default();
        let mut result = Vec::new();

        for rid in rel_ids {
            if let Some(rel) = rels.get(&rid) {
                // Direction filter
                let matches_dir = match dir {
                    Direction::Outgoing => rel.src == node,
                    Direction::Incoming => rel.dst == node,
                    Direction::Both => true,
                };
                // Type filter
                let matches_type = rel_type.is_none_or(|t| rel.rel_type == t);

                if matches_dir && matches_type {
                    result.push(rel.clone());
                }
            }
        }

        Ok(result)
    }

    async fn all_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.inner.nodes.read().values().cloned().collect())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self) -> Result<u64> {
        Ok(self.inner.nodes.read().len() as u64)
    }

    async fn relationship_count(&self) -> Result<u64> {
        Ok(self.inner.relationships.read().len() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_node() {
        let db = MemoryStore::new();

        let mut props = PropertyMap::new();
        props.insert("username".into(), Value::from("ada"));

        let id = db.create_node("User", props).await.unwrap();
        let node = db.get_node(id).await.unwrap().unwrap();

        assert_eq!(node.label, "User");
        assert_eq!(node.get("username"), Some(&Value::from("ada")));
    }

    #[tokio::test]
    async fn test_find_node_by_key() {
        let db = MemoryStore::new();

        for name in ["ada", "bob"] {
            let mut props = PropertyMap::new();
            props.insert("username".into(), Value::from(name));
            db.create_node("User", props).await.unwrap();
        }

        let found = db
            .find_node("User", "username", &Value::from("bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("username"), Some(&Value::from("bob")));

        let missing = db
            .find_node("User", "username", &Value::from("carol"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_create_relationship() {
        let db = MemoryStore::new();

        let a = db.create_node("User", PropertyMap::new()).await.unwrap();
        let b = db.create_node("User", PropertyMap::new()).await.unwrap();

        let rel_id = db
            .create_relationship(a, b, "FOLLOWS", PropertyMap::new())
            .await
            .unwrap();
        let rel = db.get_relationship(rel_id).await.unwrap().unwrap();

        assert_eq!(rel.src, a);
        assert_eq!(rel.dst, b);
        assert_eq!(rel.rel_type, "FOLLOWS");
    }

    #[tokio::test]
    async fn test_relationship_to_missing_node() {
        let db = MemoryStore::new();
        let a = db.create_node("User", PropertyMap::new()).await.unwrap();

        let result = db
            .create_relationship(a, NodeId(999), "FOLLOWS", PropertyMap::new())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_detach_delete_node() {
        let db = MemoryStore::new();

        let a = db.create_node("User", PropertyMap::new()).await.unwrap();
        let b = db.create_node("Post", PropertyMap::new()).await.unwrap();
        db.create_relationship(a, b, "PUBLISHED_ON", PropertyMap::new())
            .await
            .unwrap();
        db.create_relationship(b, a, "BY", PropertyMap::new())
            .await
            .unwrap();

        assert!(db.detach_delete_node(b).await.unwrap());
        assert!(db.get_node(b).await.unwrap().is_none());
        assert_eq!(db.relationship_count().await.unwrap(), 0);
        // The author node survives
        assert!(db.get_node(a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_relationship_properties() {
        let db = MemoryStore::new();

        let a = db.create_node("User", PropertyMap::new()).await.unwrap();
        let b = db.create_node("Space", PropertyMap::new()).await.unwrap();
        let rel_id = db
            .create_relationship(a, b, "JOINED_AS", PropertyMap::new())
            .await
            .unwrap();

        db.set_relationship_property(rel_id, "duration", Value::from(1.5))
            .await
            .unwrap();
        let rel = db.get_relationship(rel_id).await.unwrap().unwrap();
        assert_eq!(rel.get("duration"), Some(&Value::from(1.5)));
    }

    #[tokio::test]
    async fn test_direction_filters() {
        let db = MemoryStore::new();

        let a = db.create_node("User", PropertyMap::new()).await.unwrap();
        let b = db.create_node("User", PropertyMap::new()).await.unwrap();
        db.create_relationship(a, b, "FOLLOWS", PropertyMap::new())
            .await
            .unwrap();
        db.create_relationship(b, a, "FOLLOWS", PropertyMap::new())
            .await
            .unwrap();

        let out = db
            .relationships(a, Direction::Outgoing, Some("FOLLOWS"))
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].dst, b);

        let inc = db
            .relationships(a, Direction::Incoming, Some("FOLLOWS"))
            .await
            .unwrap();
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].src, b);

        let both = db.relationships(a, Direction::Both, None).await.unwrap();
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn test_relationships_by_type() {
        let db = MemoryStore::new();

        let a = db.create_node("User", PropertyMap::new()).await.unwrap();
        let b = db.create_node("User", PropertyMap::new()).await.unwrap();
        let c = db.create_node("Post", PropertyMap::new()).await.unwrap();

        db.create_relationship(a, b, "FOLLOWS", PropertyMap::new())
            .await
            .unwrap();
        db.create_relationship(a, c, "LIKES", PropertyMap::new())
            .await
            .unwrap();
        db.create_relationship(b, c, "LIKES", PropertyMap::new())
            .await
            .unwrap();

        let likes = db.relationships_by_type("LIKES").await.unwrap();
        assert_eq!(likes.len(), 2);

        let follows = db.relationships_by_type("FOLLOWS").await.unwrap();
        assert_eq!(follows.len(), 1);
    }

    #[tokio::test]
    async fn test_label_scan_preserves_creation_order() {
        let db = MemoryStore::new();

        for i in 0..4 {
            let mut props = PropertyMap::new();
            props.insert("id".into(), Value::from(format!("s{i}")));
            db.create_node("Space", props).await.unwrap();
        }

        let spaces = db.nodes_by_label("Space").await.unwrap();
        let ids: Vec<&str> = spaces
            .iter()
            .map(|n| n.get("id").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(ids, vec!["s0", "s1", "s2", "s3"]);
    }
}
