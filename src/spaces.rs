//! Space lifecycle: create, join, leave, end, delete, and the duration
//! bookkeeping that feeds the affinity vectors.
//!
//! Membership edges are time-scoped. Leaving converts the active `JOINED_AS`
//! edge into a `LEFT_AS` edge with a stored duration. Ending a space does
//! NOT convert members' edges — it annotates every still-active `JOINED_AS`
//! edge with `left_at` and a duration computed from that edge's own
//! `joined_at`. The two paths stay asymmetric on purpose: "I left" and "it
//! ended while I was there" are different facts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::hours_between;
use crate::model::schema::{require_datetime, require_str};
use crate::model::{
    Direction, Label, Membership, MembershipKind, Node, PropertyMap, RelType, Relationship, Role,
    SpaceStatus, Value, space_status,
};
use crate::store::GraphStore;
use crate::{Error, Result, SpaceGraph};

// ============================================================================
// Views
// ============================================================================

/// A space with its membership picture, as listed to a viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceOverview {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub status: SpaceStatus,
    pub host: Option<String>,
    pub members: Vec<String>,
    pub member_count: usize,
    pub is_member: bool,
    pub is_host: bool,
}

/// One membership edge of a user, with its duration resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub space_id: String,
    pub space_name: String,
    pub kind: MembershipKind,
    /// `None` on hosting edges.
    pub role: Option<Role>,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    /// Stored duration if the edge is closed, live `now - joined_at`
    /// otherwise. Fractional hours.
    pub duration_hours: f64,
}

impl<S: GraphStore> SpaceGraph<S> {
    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a space hosted by `username`, tagged with `topics`.
    /// Returns the space id.
    pub async fn create_space(
        &self,
        username: &str,
        name: &str,
        description: &str,
        topics: &[&str],
    ) -> Result<String> {
        if name.is_empty() {
            return Err(Error::Validation("space name is required".into()));
        }
        if description.is_empty() {
            return Err(Error::Validation("space description is required".into()));
        }
        let host = self.require_user(username).await?;

        let space_id = Uuid::new_v4().to_string();
        let created_at = self.now();
        let mut props = PropertyMap::new();
        props.insert("id".into(), Value::from(space_id.as_str()));
        props.insert("name".into(), Value::from(name));
        props.insert("description".into(), Value::from(description));
        props.insert("created_at".into(), Value::from(created_at));
        props.insert("status".into(), Value::from(SpaceStatus::Alive.as_str()));
        let space = self.store().create_node(Label::Space.as_str(), props).await?;

        // The hosting edge carries joined_at from the start so duration math
        // never special-cases the host.
        let mut host_props = PropertyMap::new();
        host_props.insert("joined_at".into(), Value::from(created_at));
        self.store()
            .create_relationship(host.id, space, RelType::Hosts.as_str(), host_props)
            .await?;

        let unique: BTreeSet<&str> = topics.iter().copied().filter(|t| !t.is_empty()).collect();
        for topic in unique {
            let topic_node = self.ensure_topic(topic).await?;
            self.store()
                .create_relationship(space, topic_node, RelType::HasTopic.as_str(), PropertyMap::new())
                .await?;
        }

        info!(username, %space_id, name, "created space");
        Ok(space_id)
    }

    // ========================================================================
    // Membership transitions
    // ========================================================================

    /// Join a space in the given role. Repeated joins by the same user are
    /// not deduplicated here; that policy belongs to the caller.
    pub async fn join_space(&self, username: &str, space_id: &str, role: Role) -> Result<()> {
        let user = self.require_user(username).await?;
        let space = self.require_space(space_id).await?;

        let mut props = PropertyMap::new();
        props.insert("role".into(), Value::from(role.as_str()));
        props.insert("joined_at".into(), Value::from(self.now()));
        self.store()
            .create_relationship(user.id, space.id, RelType::JoinedAs.as_str(), props)
            .await?;

        debug!(username, space_id, role = role.as_str(), "joined space");
        Ok(())
    }

    /// Leave a space: the active `JOINED_AS` edge becomes a `LEFT_AS` edge
    /// carrying the elapsed duration. Leaving a space never joined is a
    /// silent no-op.
    pub async fn leave_space(&self, username: &str, space_id: &str) -> Result<()> {
        let user = self.require_user(username).await?;
        let space = self.require_space(space_id).await?;

        let joined = self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::JoinedAs.as_str()))
            .await?;
        let Some(edge) = joined.iter().find(|rel| rel.dst == space.id) else {
            debug!(username, space_id, "leave with no active membership, ignoring");
            return Ok(());
        };

        let membership = Membership::from_relationship(edge)?;
        let left_at = self.now();
        let duration = hours_between(membership.joined_at, left_at);

        self.store().delete_relationship(edge.id).await?;
        let mut props = PropertyMap::new();
        props.insert(
            "role".into(),
            Value::from(membership.role.unwrap_or(Role::Listener).as_str()),
        );
        props.insert("joined_at".into(), Value::from(membership.joined_at));
        props.insert("left_at".into(), Value::from(left_at));
        props.insert("duration".into(), Value::from(duration));
        self.store()
            .create_relationship(user.id, space.id, RelType::LeftAs.as_str(), props)
            .await?;

        debug!(username, space_id, duration, "left space");
        Ok(())
    }

    /// End a space. Only the recorded host may end it.
    ///
    /// Sets the status to ended, stamps the hosting edge with a duration
    /// measured from the space's creation, and stamps every still-active
    /// `JOINED_AS` edge with a duration measured from its own `joined_at`.
    /// Ending an already-ended space restamps; the status stays ended.
    pub async fn end_space(&self, username: &str, space_id: &str) -> Result<()> {
        let caller = self.require_user(username).await?;
        let space = self.require_space(space_id).await?;

        let host_edge = self.hosting_edge(&space).await?;
        if host_edge.src != caller.id {
            return Err(Error::Unauthorized(format!(
                "'{username}' is not the host of space '{space_id}'"
            )));
        }

        let now = self.now();
        let created_at = require_datetime(&space.properties, "created_at")?;

        self.store()
            .set_node_property(space.id, "status", Value::from(SpaceStatus::Ended.as_str()))
            .await?;
        self.store()
            .set_relationship_property(host_edge.id, "left_at", Value::from(now))
            .await?;
        self.store()
            .set_relationship_property(
                host_edge.id,
                "duration",
                Value::from(hours_between(created_at, now)),
            )
            .await?;

        for edge in self
            .store()
            .relationships(space.id, Direction::Incoming, Some(RelType::JoinedAs.as_str()))
            .await?
        {
            let membership = Membership::from_relationship(&edge)?;
            self.store()
                .set_relationship_property(edge.id, "left_at", Value::from(now))
                .await?;
            self.store()
                .set_relationship_property(
                    edge.id,
                    "duration",
                    Value::from(hours_between(membership.joined_at, now)),
                )
                .await?;
        }

        info!(username, space_id, "ended space");
        Ok(())
    }

    /// Delete a space entirely. Only the host may delete it. All edges,
    /// including membership history, go with the node.
    pub async fn delete_space(&self, username: &str, space_id: &str) -> Result<()> {
        let caller = self.require_user(username).await?;
        let space = self.require_space(space_id).await?;

        let host_edge = self.hosting_edge(&space).await?;
        if host_edge.src != caller.id {
            return Err(Error::Unauthorized(format!(
                "'{username}' is not the host of space '{space_id}'"
            )));
        }

        self.store().detach_delete_node(space.id).await?;
        info!(username, space_id, "deleted space");
        Ok(())
    }

    // ========================================================================
    // Duration report
    // ========================================================================

    /// Every membership edge touching the user, durations resolved: stored
    /// values for closed edges, live `now - joined_at` for open ones.
    pub async fn get_user_space_durations(&self, username: &str) -> Result<Vec<MembershipRecord>> {
        let user = self.require_user(username).await?;
        let now = self.now();

        let mut records = Vec::new();
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
            records.push(MembershipRecord {
                space_id: require_str(&space.properties, "id")?.to_string(),
                space_name: require_str(&space.properties, "name")?.to_string(),
                kind: membership.kind,
                role: membership.role,
                joined_at: membership.joined_at,
                left_at: membership.left_at,
                duration_hours: membership
                    .duration_hours
                    .unwrap_or_else(|| hours_between(membership.joined_at, now)),
            });
        }
        Ok(records)
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// All spaces, newest first, with membership flags for the viewer.
    pub async fn list_spaces(&self, viewer: &str) -> Result<Vec<SpaceOverview>> {
        let mut overviews = Vec::new();
        for space in self.store().nodes_by_label(Label::Space.as_str()).await? {
            let host = self.space_host(&space).await?;

            let mut members = Vec::new();
            for rel in self
                .store()
                .relationships(space.id, Direction::Incoming, Some(RelType::JoinedAs.as_str()))
                .await?
            {
                if let Some(member) = self.store().get_node(rel.src).await? {
                    members.push(require_str(&member.properties, "username")?.to_string());
                }
            }

            let is_member = members.iter().any(|name| name == viewer);
            let is_host = host.as_deref() == Some(viewer);
            overviews.push(SpaceOverview {
                id: require_str(&space.properties, "id")?.to_string(),
                name: require_str(&space.properties, "name")?.to_string(),
                description: require_str(&space.properties, "description")?.to_string(),
                created_at: require_datetime(&space.properties, "created_at")?,
                status: space_status(&space.properties)?,
                host,
                member_count: members.len(),
                members,
                is_member,
                is_host,
            });
        }
        overviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(overviews)
    }

    /// All topic names, sorted.
    pub async fn all_topics(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for topic in self.store().nodes_by_label(Label::Topic.as_str()).await? {
            names.push(require_str(&topic.properties, "name")?.to_string());
        }
        names.sort();
        Ok(names)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// The one `HOSTS` edge of a space. Its absence is a broken invariant.
    pub(crate) async fn hosting_edge(&self, space: &Node) -> Result<Relationship> {
        let rels = self
            .store()
            .relationships(space.id, Direction::Incoming, Some(RelType::Hosts.as_str()))
            .await?;
        rels.into_iter()
            .next()
            .ok_or_else(|| Error::Storage(format!("space {} has no host edge", space.id)))
    }

    /// Username of a space's host, if the host node still exists.
    pub(crate) async fn space_host(&self, space: &Node) -> Result<Option<String>> {
        let rels = self
            .store()
            .relationships(space.id, Direction::Incoming, Some(RelType::Hosts.as_str()))
            .await?;
        let Some(rel) = rels.first() else {
            return Ok(None);
        };
        match self.store().get_node(rel.src).await? {
            Some(host) => Ok(Some(require_str(&host.properties, "username")?.to_string())),
            None => Ok(None),
        }
    }
}
