//! # spacegraph — Graph-Backed Space Recommendations
//!
//! Recommends live "space" sessions to users of a social platform by
//! combining graph traversal with vector-similarity ranking.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the
//!    recommendation core and whatever holds the durable graph
//! 2. **Clean DTOs**: `Node`, `Relationship`, `Value` cross all boundaries;
//!    the domain schema (`Label`, `RelType`, `Role`) is a closed, typed set
//! 3. **Pure computations**: behavior summaries, affinity vectors, and
//!    rankings are functions of (store, arguments, clock) — no cached state
//! 4. **Tiered policy**: cold-start, social-only, and behavior-ranked
//!    strategies are selected per request from observed behavior
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spacegraph::{SpaceGraph, Role};
//!
//! # async fn example() -> spacegraph::Result<()> {
//! let graph = SpaceGraph::open_memory();
//!
//! graph.register("maya", "s3cret", "maya@example.com").await?;
//! graph.register("dev_host", "hunter2", "host@example.com").await?;
//!
//! let space = graph
//!     .create_space("dev_host", "Rust after dark", "Systems talk", &["rust"])
//!     .await?;
//! graph.join_space("maya", &space, Role::Listener).await?;
//!
//! for rec in graph.recommend_spaces("maya", 5).await? {
//!     println!("{} hosted by {:?}", rec.name, rec.host);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Recommendation strategies
//!
//! | Strategy | Trigger | Result |
//! |----------|---------|--------|
//! | Latest | no activity, no follows | newest spaces first |
//! | Friends | no activity, follows > 0 | spaces followed users joined |
//! | Ranked | any activity | cosine ranking of topic affinity |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod store;
pub mod clock;
pub mod social;
pub mod spaces;
pub mod affinity;
pub mod ranker;
pub mod recommend;

use std::sync::Arc;

use chrono::{DateTime, Utc};

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Relationship, Value, PropertyMap,
    NodeId, RelId, Direction,
    Label, RelType, Role, SpaceStatus,
    Membership, MembershipKind,
};

// ============================================================================
// Re-exports: Store
// ============================================================================

pub use store::{GraphStore, MemoryStore};

// ============================================================================
// Re-exports: Clock
// ============================================================================

pub use clock::{Clock, SystemClock, ManualClock};

// ============================================================================
// Re-exports: Views and payloads
// ============================================================================

pub use social::{PostView, RepostView, CommentView, UserProfile};
pub use spaces::{MembershipRecord, SpaceOverview};
pub use affinity::{TopicVector, SpaceVector};
pub use ranker::{cosine_similarity, rank_top_n};
pub use recommend::{BehaviorSummary, Strategy, RecommendedSpace};

// ============================================================================
// Top-level handle
// ============================================================================

/// The primary entry point. A `SpaceGraph` wraps a graph store and exposes
/// the social-graph operations, the space lifecycle, and the recommendation
/// pipeline.
///
/// The handle is stateless between calls: all durable state lives in the
/// store, and every computation reads fresh data.
pub struct SpaceGraph<S: GraphStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: GraphStore> SpaceGraph<S> {
    /// Create a handle over the given store, stamping wall-clock time.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a handle with an explicit time source (simulations, tests).
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Access the underlying store (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ========================================================================
    // Shared lookups
    // ========================================================================

    pub(crate) async fn require_user(&self, username: &str) -> Result<Node> {
        self.store
            .find_node(Label::User.as_str(), "username", &Value::from(username))
            .await?
            .ok_or_else(|| Error::NotFound(format!("User '{username}'")))
    }

    pub(crate) async fn require_post(&self, post_id: &str) -> Result<Node> {
        self.store
            .find_node(Label::Post.as_str(), "id", &Value::from(post_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Post '{post_id}'")))
    }

    pub(crate) async fn require_comment(&self, comment_id: &str) -> Result<Node> {
        self.store
            .find_node(Label::Comment.as_str(), "id", &Value::from(comment_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Comment '{comment_id}'")))
    }

    pub(crate) async fn require_space(&self, space_id: &str) -> Result<Node> {
        self.store
            .find_node(Label::Space.as_str(), "id", &Value::from(space_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Space '{space_id}'")))
    }

    /// Find or create the topic node for a name. Topics are minted on first
    /// reference and never deleted.
    pub(crate) async fn ensure_topic(&self, name: &str) -> Result<NodeId> {
        if let Some(node) = self
            .store
            .find_node(Label::Topic.as_str(), "name", &Value::from(name))
            .await?
        {
            return Ok(node.id);
        }
        let mut props = PropertyMap::new();
        props.insert("name".into(), Value::from(name));
        self.store.create_node(Label::Topic.as_str(), props).await
    }
}

/// In-memory graph for testing and embedding.
impl SpaceGraph<MemoryStore> {
    pub fn open_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
