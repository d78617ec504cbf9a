//! Typed schema for the social graph.
//!
//! Labels, relationship types, membership roles, and space status are closed
//! enums with stable string forms — the strings are what the store sees, the
//! enums are what the crate logic works with. Membership edges get a typed
//! view (`Membership`) decoded from raw relationship properties, so the
//! duration and role bookkeeping is validated in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PropertyMap, Relationship};
use crate::{Error, Result};

// ============================================================================
// Labels
// ============================================================================

/// Node labels in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    User,
    Post,
    Comment,
    Topic,
    Space,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::User => "User",
            Label::Post => "Post",
            Label::Comment => "Comment",
            Label::Topic => "Topic",
            Label::Space => "Space",
        }
    }
}

// ============================================================================
// Relationship types
// ============================================================================

/// Relationship types in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelType {
    /// User → Post: authorship (paired with `By`).
    PublishedOn,
    /// Post → User: authorship back-edge.
    By,
    /// Post/Space → Topic.
    HasTopic,
    /// Repost → original Post.
    RepostOf,
    /// User → repost Post.
    Reposted,
    /// User → Post.
    Likes,
    /// User → Comment (paired with `On`).
    Commented,
    /// Comment → Post.
    On,
    /// User → User. No self-loops.
    Follows,
    /// User → Space: the hosting edge, one per space.
    Hosts,
    /// User → Space: active membership.
    JoinedAs,
    /// User → Space: historical membership, created by leaving.
    LeftAs,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::PublishedOn => "PUBLISHED_ON",
            RelType::By => "BY",
            RelType::HasTopic => "HAS_TOPIC",
            RelType::RepostOf => "REPOST_OF",
            RelType::Reposted => "REPOSTED",
            RelType::Likes => "LIKES",
            RelType::Commented => "COMMENTED",
            RelType::On => "ON",
            RelType::Follows => "FOLLOWS",
            RelType::Hosts => "HOSTS",
            RelType::JoinedAs => "JOINED_AS",
            RelType::LeftAs => "LEFT_AS",
        }
    }
}

// ============================================================================
// Membership roles
// ============================================================================

/// Role a user holds inside a space. Hosting is implied by the `HOSTS` edge
/// and carries the host weight in affinity math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Listener,
    Speaker,
    Moderator,
    Host,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Listener => "listener",
            Role::Speaker => "speaker",
            Role::Moderator => "moderator",
            Role::Host => "host",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "listener" => Some(Role::Listener),
            "speaker" => Some(Role::Speaker),
            "moderator" => Some(Role::Moderator),
            "host" => Some(Role::Host),
            _ => None,
        }
    }

    /// Weight of this role in the affinity vector.
    pub fn weight(&self) -> f64 {
        match self {
            Role::Listener => 1.0,
            Role::Speaker => 1.5,
            Role::Moderator => 1.7,
            Role::Host => 2.0,
        }
    }
}

/// Weight for a raw role string. Unrecognized roles fall back to 1.
pub fn role_weight(raw: &str) -> f64 {
    Role::parse(raw).map_or(1.0, |r| r.weight())
}

// ============================================================================
// Space status
// ============================================================================

/// Lifecycle status of a space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    #[default]
    Alive,
    Ended,
}

impl SpaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceStatus::Alive => "alive",
            SpaceStatus::Ended => "ended",
        }
    }

    pub fn parse(raw: &str) -> Option<SpaceStatus> {
        match raw {
            "alive" => Some(SpaceStatus::Alive),
            "ended" => Some(SpaceStatus::Ended),
            _ => None,
        }
    }
}

/// Read the status property of a space node. Absent means alive.
pub fn space_status(props: &PropertyMap) -> Result<SpaceStatus> {
    match props.get("status") {
        None => Ok(SpaceStatus::Alive),
        Some(v) => {
            let raw = v.as_str().ok_or_else(|| Error::TypeError {
                expected: "STRING".into(),
                got: v.type_name().into(),
            })?;
            SpaceStatus::parse(raw)
                .ok_or_else(|| Error::Storage(format!("unknown space status '{raw}'")))
        }
    }
}

// ============================================================================
// Membership view
// ============================================================================

/// Which membership edge a record was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipKind {
    /// `JOINED_AS` — active, possibly annotated by a space ending.
    Joined,
    /// `LEFT_AS` — historical, the member left.
    Left,
    /// `HOSTS` — the hosting edge.
    Hosting,
}

/// Typed view over a `JOINED_AS` / `LEFT_AS` / `HOSTS` edge.
///
/// `role` is `None` on hosting edges (the edge itself implies host weight).
/// `duration_hours` is present once the edge is closed or the space ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub kind: MembershipKind,
    pub role: Option<Role>,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub duration_hours: Option<f64>,
}

impl Membership {
    /// Decode a membership edge. Fails with `TypeError`/`Storage` if the
    /// edge does not carry the fixed attribute set for its type.
    pub fn from_relationship(rel: &Relationship) -> Result<Membership> {
        let kind = match rel.rel_type.as_str() {
            "JOINED_AS" => MembershipKind::Joined,
            "LEFT_AS" => MembershipKind::Left,
            "HOSTS" => MembershipKind::Hosting,
            other => {
                return Err(Error::Storage(format!(
                    "relationship {} is not a membership edge (type {other})",
                    rel.id
                )));
            }
        };

        let role = match kind {
            MembershipKind::Hosting => None,
            _ => Some(require_str(&rel.properties, "role").map(|raw| {
                // Unrecognized stored roles carry the default weight 1;
                // only non-string values are rejected.
                Role::parse(raw).unwrap_or(Role::Listener)
            })?),
        };

        Ok(Membership {
            kind,
            role,
            joined_at: require_datetime(&rel.properties, "joined_at")?,
            left_at: opt_datetime(&rel.properties, "left_at")?,
            duration_hours: opt_float(&rel.properties, "duration")?,
        })
    }

    /// Weight of this membership in the affinity vector. Hosting counts as
    /// the host role.
    pub fn weight(&self) -> f64 {
        self.role.unwrap_or(Role::Host).weight()
    }
}

// ============================================================================
// Property decoding helpers
// ============================================================================

pub(crate) fn require_str<'a>(props: &'a PropertyMap, key: &str) -> Result<&'a str> {
    match props.get(key) {
        Some(v) => v.as_str().ok_or_else(|| Error::TypeError {
            expected: format!("STRING '{key}'"),
            got: v.type_name().into(),
        }),
        None => Err(Error::Storage(format!("missing property '{key}'"))),
    }
}

pub(crate) fn require_datetime(props: &PropertyMap, key: &str) -> Result<DateTime<Utc>> {
    match props.get(key) {
        Some(v) => v.as_datetime().ok_or_else(|| Error::TypeError {
            expected: format!("DATETIME '{key}'"),
            got: v.type_name().into(),
        }),
        None => Err(Error::Storage(format!("missing property '{key}'"))),
    }
}

pub(crate) fn opt_datetime(props: &PropertyMap, key: &str) -> Result<Option<DateTime<Utc>>> {
    match props.get(key) {
        None => Ok(None),
        Some(v) => v.as_datetime().map(Some).ok_or_else(|| Error::TypeError {
            expected: format!("DATETIME '{key}'"),
            got: v.type_name().into(),
        }),
    }
}

pub(crate) fn opt_float(props: &PropertyMap, key: &str) -> Result<Option<f64>> {
    match props.get(key) {
        None => Ok(None),
        Some(v) => v.as_float().map(Some).ok_or_else(|| Error::TypeError {
            expected: format!("FLOAT '{key}'"),
            got: v.type_name().into(),
        }),
    }
}
