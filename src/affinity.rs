//! Topic vectors: a user's weighted interest profile and each space's
//! binary topic fingerprint.
//!
//! Every vector spans the full current topic set, so all vectors are
//! directly comparable. Nothing here is cached — a topic minted a second ago
//! shows up as a fresh zero dimension on the next call.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::clock::hours_between;
use crate::model::schema::require_str;
use crate::model::{
    Direction, Label, Membership, MembershipKind, NodeId, RelType, SpaceStatus, space_status,
};
use crate::store::GraphStore;
use crate::{Result, SpaceGraph};

/// Per-topic score map over the full topic basis. BTreeMap keeps the
/// dimension order stable, so `values()` of any two vectors align.
pub type TopicVector = BTreeMap<String, f64>;

/// A space's binary topic fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceVector {
    pub id: String,
    pub vector: TopicVector,
}

/// Points per authored post on a topic.
const POST_WEIGHT: f64 = 3.0;
/// Points per repost of a post on a topic.
const REPOST_WEIGHT: f64 = 2.0;
/// Points per liked post on a topic.
const LIKE_WEIGHT: f64 = 1.0;

impl<S: GraphStore> SpaceGraph<S> {
    /// The full current topic set, sorted. This is the dimension basis every
    /// vector is built over.
    pub async fn topic_basis(&self) -> Result<Vec<String>> {
        self.all_topics().await
    }

    /// A user's topic affinity vector.
    ///
    /// Per topic, the sum of four independent contributions:
    /// 1. per membership edge to a space with the topic:
    ///    role weight × duration in hours (live for open memberships of
    ///    live spaces, stored otherwise);
    /// 2. 3 × own posts tagged with the topic;
    /// 3. 2 × reposts whose original is tagged with the topic;
    /// 4. 1 × liked posts tagged with the topic.
    pub async fn affinity_vector(&self, username: &str) -> Result<TopicVector> {
        let user = self.require_user(username).await?;
        let now = self.now();

        let mut vector: TopicVector = self
            .topic_basis()
            .await?
            .into_iter()
            .map(|name| (name, 0.0))
            .collect();

        // 1. Membership edges: JOINED_AS, LEFT_AS, and the hosting edge.
        for rel in self
            .store()
            .relationships(user.id, Direction::Outgoing, None)
            .await?
        {
            if !matches!(rel.rel_type.as_str(), "JOINED_AS" | "LEFT_AS" | "HOSTS") {
                continue;
            }
            let Some(space) = self.store().get_node(rel.dst).await? else {
                continue;
            };
            let membership = Membership::from_relationship(&rel)?;
            let status = space_status(&space.properties)?;
            let duration = match (membership.kind, status, membership.duration_hours) {
                (MembershipKind::Left, _, Some(stored)) => stored,
                (_, SpaceStatus::Ended, Some(stored)) => stored,
                _ => hours_between(membership.joined_at, now),
            };
            let weight = membership.weight() * duration;
            for topic in self.topics_of(space.id).await? {
                *vector.entry(topic).or_insert(0.0) += weight;
            }
        }

        // 2. Authored posts.
        self.add_post_contribution(&mut vector, user.id, RelType::PublishedOn, POST_WEIGHT, false)
            .await?;
        // 3. Reposts score the original post's topics.
        self.add_post_contribution(&mut vector, user.id, RelType::Reposted, REPOST_WEIGHT, true)
            .await?;
        // 4. Likes.
        self.add_post_contribution(&mut vector, user.id, RelType::Likes, LIKE_WEIGHT, false)
            .await?;

        Ok(vector)
    }

    /// Binary topic vectors for every space, in creation order, over the
    /// current topic basis.
    pub async fn space_vectors(&self) -> Result<Vec<SpaceVector>> {
        let basis = self.topic_basis().await?;

        let mut vectors = Vec::new();
        for space in self.store().nodes_by_label(Label::Space.as_str()).await? {
            let topics = self.topics_of(space.id).await?;
            let vector: TopicVector = basis
                .iter()
                .map(|name| {
                    let hit = if topics.contains(name) { 1.0 } else { 0.0 };
                    (name.clone(), hit)
                })
                .collect();
            vectors.push(SpaceVector {
                id: require_str(&space.properties, "id")?.to_string(),
                vector,
            });
        }
        Ok(vectors)
    }

    /// Topic names attached to a node via `HAS_TOPIC`.
    async fn topics_of(&self, node: NodeId) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for rel in self
            .store()
            .relationships(node, Direction::Outgoing, Some(RelType::HasTopic.as_str()))
            .await?
        {
            if let Some(topic) = self.store().get_node(rel.dst).await? {
                names.insert(require_str(&topic.properties, "name")?.to_string());
            }
        }
        Ok(names)
    }

    /// Accumulate `points` per topic for every post reached from the user
    /// over `edge`. With `via_original`, the post is a repost and the topics
    /// come from the original it points to.
    async fn add_post_contribution(
        &self,
        vector: &mut TopicVector,
        user: NodeId,
        edge: RelType,
        points: f64,
        via_original: bool,
    ) -> Result<()> {
        for rel in self
            .store()
            .relationships(user, Direction::Outgoing, Some(edge.as_str()))
            .await?
        {
            let Some(post) = self.store().get_node(rel.dst).await? else {
                continue;
            };
            let target = if via_original {
                match self.repost_original(&post).await? {
                    Some(original) => original,
                    None => continue,
                }
            } else {
                post
            };
            for topic in self.topics_of(target.id).await? {
                *vector.entry(topic).or_insert(0.0) += points;
            }
        }
        Ok(())
    }
}
