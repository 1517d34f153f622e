//! Write-model aggregates: user, post, follow relationship.
//!
//! Aggregates are transient: a handler rehydrates one from its event
//! stream, invokes a decision, drains the uncommitted events, and drops it.
//! Decisions validate first, then emit and apply in a single step, so an
//! aggregate is never left holding events it has not folded into itself.

pub mod follow;
pub mod post;
pub mod user;

pub use follow::FollowRelationship;
pub use post::Post;
pub use user::User;
