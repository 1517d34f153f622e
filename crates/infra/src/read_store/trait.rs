use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use murmur_core::{PostBody, PostId, RelationshipId, UserId, Username};

/// User profile read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: Username,
}

/// Post read model, denormalized with the author's username for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReadModel {
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_username: Username,
    pub body: PostBody,
    pub published_at: DateTime<Utc>,
}

/// Read-side store: profiles, posts, follow graph, materialized timelines,
/// celebrity index.
///
/// All mutations are driven by the projector; handlers and queries only
/// read. Implementations provide per-map read consistency; a reader sees
/// each individual operation fully or not at all.
pub trait ReadStore: Send + Sync {
    // Profiles.
    fn save_profile(&self, profile: UserProfile);
    fn profile(&self, user_id: UserId) -> Option<UserProfile>;
    fn find_profile_by_username(&self, username: &Username) -> Option<UserProfile>;
    /// All profiles, ordered by username for deterministic listings.
    fn list_profiles(&self) -> Vec<UserProfile>;

    // Posts.
    fn save_post(&self, post: PostReadModel);
    fn post(&self, post_id: PostId) -> Option<PostReadModel>;
    fn delete_post(&self, post_id: PostId);
    /// The author's posts, newest first.
    fn posts_by_author(&self, author_id: UserId) -> Vec<PostReadModel>;

    // Follow graph. Outgoing and incoming edges are two independently
    // owned indices (the graph may contain cycles); both are updated per
    // mutation.
    fn add_edge(&self, follower: UserId, followee: UserId, relationship_id: RelationshipId);
    fn remove_edge(&self, follower: UserId, followee: UserId);
    fn outgoing(&self, user_id: UserId) -> Vec<UserId>;
    fn incoming(&self, user_id: UserId) -> Vec<UserId>;
    fn is_following(&self, follower: UserId, followee: UserId) -> bool;
    fn relationship_of(&self, follower: UserId, followee: UserId) -> Option<RelationshipId>;

    // Materialized timelines.
    //
    /// Insert at the front, then truncate to the timeline bound. The post
    /// must already be in the post store (entries must resolve); pushing an
    /// unknown post id is a no-op.
    fn push_timeline(&self, owner_id: UserId, post_id: PostId);
    fn remove_from_timeline(&self, owner_id: UserId, post_id: PostId);
    /// Drop every timeline entry authored by `author_id`.
    fn remove_author_from_timeline(&self, owner_id: UserId, author_id: UserId);
    fn timeline(&self, owner_id: UserId) -> Vec<PostId>;

    // Celebrity index.
    fn mark_celebrity_post(&self, post_id: PostId, author_id: UserId);
    /// Remove a post from the celebrity index; returns whether it was
    /// present (i.e. the author was a celebrity when it was published).
    fn forget_celebrity_post(&self, post_id: PostId) -> bool;
    /// Celebrity-indexed posts authored by any of the given users.
    fn celebrity_posts_of(&self, author_ids: &[UserId]) -> Vec<PostId>;
    /// True iff the user's incoming-follow count meets the celebrity
    /// threshold. Evaluated against current state; the projector decides
    /// when to consult it.
    fn is_celebrity(&self, user_id: UserId) -> bool;

    /// Drop all read-side state (rebuild support).
    fn clear(&self);
}

impl<S> ReadStore for Arc<S>
where
    S: ReadStore + ?Sized,
{
    fn save_profile(&self, profile: UserProfile) {
        (**self).save_profile(profile)
    }

    fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        (**self).profile(user_id)
    }

    fn find_profile_by_username(&self, username: &Username) -> Option<UserProfile> {
        (**self).find_profile_by_username(username)
    }

    fn list_profiles(&self) -> Vec<UserProfile> {
        (**self).list_profiles()
    }

    fn save_post(&self, post: PostReadModel) {
        (**self).save_post(post)
    }

    fn post(&self, post_id: PostId) -> Option<PostReadModel> {
        (**self).post(post_id)
    }

    fn delete_post(&self, post_id: PostId) {
        (**self).delete_post(post_id)
    }

    fn posts_by_author(&self, author_id: UserId) -> Vec<PostReadModel> {
        (**self).posts_by_author(author_id)
    }

    fn add_edge(&self, follower: UserId, followee: UserId, relationship_id: RelationshipId) {
        (**self).add_edge(follower, followee, relationship_id)
    }

    fn remove_edge(&self, follower: UserId, followee: UserId) {
        (**self).remove_edge(follower, followee)
    }

    fn outgoing(&self, user_id: UserId) -> Vec<UserId> {
        (**self).outgoing(user_id)
    }

    fn incoming(&self, user_id: UserId) -> Vec<UserId> {
        (**self).incoming(user_id)
    }

    fn is_following(&self, follower: UserId, followee: UserId) -> bool {
        (**self).is_following(follower, followee)
    }

    fn relationship_of(&self, follower: UserId, followee: UserId) -> Option<RelationshipId> {
        (**self).relationship_of(follower, followee)
    }

    fn push_timeline(&self, owner_id: UserId, post_id: PostId) {
        (**self).push_timeline(owner_id, post_id)
    }

    fn remove_from_timeline(&self, owner_id: UserId, post_id: PostId) {
        (**self).remove_from_timeline(owner_id, post_id)
    }

    fn remove_author_from_timeline(&self, owner_id: UserId, author_id: UserId) {
        (**self).remove_author_from_timeline(owner_id, author_id)
    }

    fn timeline(&self, owner_id: UserId) -> Vec<PostId> {
        (**self).timeline(owner_id)
    }

    fn mark_celebrity_post(&self, post_id: PostId, author_id: UserId) {
        (**self).mark_celebrity_post(post_id, author_id)
    }

    fn forget_celebrity_post(&self, post_id: PostId) -> bool {
        (**self).forget_celebrity_post(post_id)
    }

    fn celebrity_posts_of(&self, author_ids: &[UserId]) -> Vec<PostId> {
        (**self).celebrity_posts_of(author_ids)
    }

    fn is_celebrity(&self, user_id: UserId) -> bool {
        (**self).is_celebrity(user_id)
    }

    fn clear(&self) {
        (**self).clear()
    }
}
