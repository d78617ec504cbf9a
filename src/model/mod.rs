//! # Social Graph Model
//!
//! Clean DTOs for the property graph plus the typed domain schema.
//! These types cross every boundary: store ↔ lifecycle ↔ ranking ↔ caller.
//!
//! Design rule: this module is pure data — no I/O, no state, no async.

pub mod node;
pub mod relationship;
pub mod value;
pub mod property_map;
pub mod schema;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, Direction};
pub use value::Value;
pub use property_map::PropertyMap;
pub use schema::{
    Label, RelType, Role, SpaceStatus,
    Membership, MembershipKind,
    role_weight, space_status,
};
