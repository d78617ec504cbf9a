//! Tiered recommendation policy.
//!
//! Every request inspects the user's behavior summary and routes to exactly
//! one strategy: latest spaces for users with nothing on record, friends'
//! spaces for users who only follow people, and cosine ranking of topic
//! affinity for anyone with activity. Selection is total over the summary —
//! any activity at all wins over the social fallback.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::schema::{require_datetime, require_str};
use crate::model::{Direction, Label, Node, NodeId, RelType, SpaceStatus, space_status};
use crate::ranker::rank_top_n;
use crate::store::GraphStore;
use crate::{Result, SpaceGraph};

// ============================================================================
// Behavior summary
// ============================================================================

/// Distinct counts of a user's recorded behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub posts_count: usize,
    pub reposts_count: usize,
    pub likes_count: usize,
    pub spaces_count: usize,
    pub following_count: usize,
}

impl BehaviorSummary {
    /// Any interaction beyond following people.
    pub fn has_activity(&self) -> bool {
        self.posts_count + self.reposts_count + self.likes_count + self.spaces_count > 0
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// Which recommendation path applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Cold start: nothing on record, no follows. Newest spaces first.
    LatestSpaces,
    /// No activity but follows exist: spaces followed users joined.
    FriendsSpaces,
    /// Any activity: affinity vector × space vectors, cosine ranked.
    BehaviorRanked,
}

impl Strategy {
    /// Total over every possible summary: activity beats everything, then
    /// follows, then cold start.
    pub fn select(summary: &BehaviorSummary) -> Strategy {
        if summary.has_activity() {
            Strategy::BehaviorRanked
        } else if summary.following_count > 0 {
            Strategy::FriendsSpaces
        } else {
            Strategy::LatestSpaces
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// A recommended space, enriched for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedSpace {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub status: SpaceStatus,
    /// Host username; `None` if the host node is gone.
    pub host: Option<String>,
    /// For the friends branch: the followed user whose membership surfaced
    /// this space.
    pub via_friend: Option<String>,
}

impl<S: GraphStore> SpaceGraph<S> {
    // ========================================================================
    // Behavior summary
    // ========================================================================

    /// Distinct counts of the user's posts, reposts, likes, active space
    /// memberships, and follows.
    pub async fn behavior_summary(&self, username: &str) -> Result<BehaviorSummary> {
        let user = self.require_user(username).await?;
        Ok(BehaviorSummary {
            posts_count: self.distinct_targets(user.id, RelType::PublishedOn).await?,
            reposts_count: self.distinct_targets(user.id, RelType::Reposted).await?,
            likes_count: self.distinct_targets(user.id, RelType::Likes).await?,
            spaces_count: self.distinct_targets(user.id, RelType::JoinedAs).await?,
            following_count: self.distinct_targets(user.id, RelType::Follows).await?,
        })
    }

    // ========================================================================
    // Entry point
    // ========================================================================

    /// Recommend up to `top_n` spaces for a user, routed through the tiered
    /// policy. With no spaces in the graph every branch returns empty.
    pub async fn recommend_spaces(
        &self,
        username: &str,
        top_n: usize,
    ) -> Result<Vec<RecommendedSpace>> {
        let summary = self.behavior_summary(username).await?;
        let strategy = Strategy::select(&summary);
        debug!(username, ?strategy, "selected recommendation strategy");

        match strategy {
            Strategy::LatestSpaces => self.latest_spaces(top_n).await,
            Strategy::FriendsSpaces => self.friends_spaces(username, top_n).await,
            Strategy::BehaviorRanked => self.ranked_spaces(username, top_n).await,
        }
    }

    // ========================================================================
    // Branches
    // ========================================================================

    /// The `top_n` most recently created spaces.
    pub async fn latest_spaces(&self, top_n: usize) -> Result<Vec<RecommendedSpace>> {
        let mut spaces = Vec::new();
        for space in self.store().nodes_by_label(Label::Space.as_str()).await? {
            let created_at = require_datetime(&space.properties, "created_at")?;
            spaces.push((created_at, space));
        }
        spaces.sort_by(|a, b| b.0.cmp(&a.0));
        spaces.truncate(top_n);

        let mut recs = Vec::with_capacity(spaces.len());
        for (_, space) in &spaces {
            recs.push(self.recommended_from(space, None).await?);
        }
        Ok(recs)
    }

    /// Spaces that followed users have actively joined, newest space first.
    ///
    /// One entry per (friend, membership edge) — a space joined by several
    /// friends appears once per friend. That duplication is deliberate
    /// surface area for social proof; callers wanting a deduplicated list
    /// collapse it themselves.
    pub async fn friends_spaces(
        &self,
        username: &str,
        top_n: usize,
    ) -> Result<Vec<RecommendedSpace>> {
        let user = self.require_user(username).await?;

        let mut found: Vec<(DateTime<Utc>, Node, String)> = Vec::new();
        for follow in self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::Follows.as_str()))
            .await?
        {
            let Some(friend) = self.store().get_node(follow.dst).await? else {
                continue;
            };
            let friend_name = require_str(&friend.properties, "username")?.to_string();
            for joined in self
                .store()
                .relationships(friend.id, Direction::Outgoing, Some(RelType::JoinedAs.as_str()))
                .await?
            {
                let Some(space) = self.store().get_node(joined.dst).await? else {
                    continue;
                };
                let created_at = require_datetime(&space.properties, "created_at")?;
                found.push((created_at, space, friend_name.clone()));
            }
        }

        found.sort_by(|a, b| b.0.cmp(&a.0));
        found.truncate(top_n);

        let mut recs = Vec::with_capacity(found.len());
        for (_, space, friend) in &found {
            recs.push(self.recommended_from(space, Some(friend.clone())).await?);
        }
        Ok(recs)
    }

    /// Rank every space against the user's affinity vector and return the
    /// `top_n`, enriched.
    async fn ranked_spaces(&self, username: &str, top_n: usize) -> Result<Vec<RecommendedSpace>> {
        let affinity = self.affinity_vector(username).await?;
        let space_vectors = self.space_vectors().await?;
        if space_vectors.is_empty() {
            return Ok(Vec::new());
        }

        // Align both sides over the union basis. A topic minted between the
        // two reads shows up as a zero dimension on the side that missed it.
        let mut basis: BTreeSet<String> = affinity.keys().cloned().collect();
        for sv in &space_vectors {
            basis.extend(sv.vector.keys().cloned());
        }
        let query: Vec<f64> = basis
            .iter()
            .map(|name| affinity.get(name).copied().unwrap_or(0.0))
            .collect();
        let candidates: Vec<(String, Vec<f64>)> = space_vectors
            .iter()
            .map(|sv| {
                let vector = basis
                    .iter()
                    .map(|name| sv.vector.get(name).copied().unwrap_or(0.0))
                    .collect();
                (sv.id.clone(), vector)
            })
            .collect();

        let ranked = rank_top_n(&query, &candidates, top_n);

        let mut recs = Vec::with_capacity(ranked.len());
        for (space_id, _score) in ranked {
            let space = self.require_space(&space_id).await?;
            recs.push(self.recommended_from(&space, None).await?);
        }
        Ok(recs)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    async fn distinct_targets(&self, user: NodeId, edge: RelType) -> Result<usize> {
        let rels = self
            .store()
            .relationships(user, Direction::Outgoing, Some(edge.as_str()))
            .await?;
        let targets: HashSet<NodeId> = rels.iter().map(|rel| rel.dst).collect();
        Ok(targets.len())
    }

    /// Enrich a selected space for display. A separate read after selection;
    /// ranking never depends on it.
    async fn recommended_from(
        &self,
        space: &Node,
        via_friend: Option<String>,
    ) -> Result<RecommendedSpace> {
        Ok(RecommendedSpace {
            id: require_str(&space.properties, "id")?.to_string(),
            name: require_str(&space.properties, "name")?.to_string(),
            description: require_str(&space.properties, "description")?.to_string(),
            created_at: require_datetime(&space.properties, "created_at")?,
            status: space_status(&space.properties)?,
            host: self.space_host(space).await?,
            via_friend,
        })
    }
}
