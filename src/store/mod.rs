//! # Graph Store Trait
//!
//! This is THE contract between the recommendation core and whatever holds
//! the durable graph. The core issues typed reads (find node by key, scan a
//! label, pattern-match relationships) and typed writes (create nodes and
//! edges, update properties, delete) and never sees how they are executed.
//!
//! Consistency is the store's problem: each operation completes within the
//! store's own transaction model, and racing writers are last-write-wins on
//! the touched node or edge. The core holds no locks and keeps no cache.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory for testing/embedding |

pub mod memory;

use async_trait::async_trait;
use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;

/// The universal storage contract.
///
/// Any backend that implements this trait can hold the social graph. The
/// trait is intentionally small — it covers exactly the reads and writes the
/// recommendation core performs, nothing more.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    // ========================================================================
    // Node CRUD
    // ========================================================================

    /// Create a node with the given label and properties.
    async fn create_node(&self, label: &str, props: PropertyMap) -> Result<NodeId>;

    /// Get a node by ID. Returns None if not found.
    async fn get_node(&self, id: NodeId) -> Result<Option<Node>>;

    /// Find the first node with the given label whose property `key` equals
    /// `value`. Earliest-created wins when several match.
    async fn find_node(&self, label: &str, key: &str, value: &Value) -> Result<Option<Node>>;

    /// All nodes with a given label, in creation order.
    async fn nodes_by_label(&self, label: &str) -> Result<Vec<Node>>;

    /// Set a property on a node (upsert).
    async fn set_node_property(&self, id: NodeId, key: &str, val: Value) -> Result<()>;

    /// Delete a node and all its relationships in one operation.
    /// Returns true if the node existed.
    async fn detach_delete_node(&self, id: NodeId) -> Result<bool>;

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    /// Create a relationship between two nodes.
    async fn create_relationship(
        &self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> Result<RelId>;

    /// Get a relationship by ID.
    async fn get_relationship(&self, id: RelId) -> Result<Option<Relationship>>;

    /// Delete a relationship. Returns true if it existed.
    async fn delete_relationship(&self, id: RelId) -> Result<bool>;

    /// Set a property on a relationship (upsert).
    async fn set_relationship_property(&self, id: RelId, key: &str, val: Value) -> Result<()>;

    // ========================================================================
    // Pattern reads
    // ========================================================================

    /// All relationships of a node, optionally filtered by direction and
    /// type. This is the pattern-match read the core's traversals build on.
    async fn relationships(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>>;

    /// All relationships of a given type, graph-wide.
    ///
    /// Default: scans all nodes and collects outgoing relationships of that
    /// type. Backends with an edge-type index should override.
    async fn relationships_by_type(&self, rel_type: &str) -> Result<Vec<Relationship>> {
        let mut result = Vec::new();
        for node in self.all_nodes().await? {
            let rels = self
                .relationships(node.id, Direction::Outgoing, Some(rel_type))
                .await?;
            result.extend(rels);
        }
        Ok(result)
    }

    /// Return all nodes (no label filter).
    async fn all_nodes(&self) -> Result<Vec<Node>>;

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Total number of nodes.
    async fn node_count(&self) -> Result<u64>;

    /// Total number of relationships.
    async fn relationship_count(&self) -> Result<u64>;
}
