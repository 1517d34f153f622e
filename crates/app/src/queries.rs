//! Query handlers: read-only access, including feed assembly.

use std::collections::HashSet;

use murmur_core::{PostId, UserId};
use murmur_infra::{EventLog, PostReadModel, ReadStore, UserProfile};

use crate::service::App;

impl<L, S> App<L, S>
where
    L: EventLog,
    S: ReadStore,
{
    /// All registered users.
    pub fn list_users(&self) -> Vec<UserProfile> {
        self.read_store().list_profiles()
    }

    /// A user's home feed, newest first; retracted posts are absent.
    ///
    /// The materialized timeline covers normal authors the user follows;
    /// celebrity authors are merged in from the celebrity post index at
    /// read time. The union is deduplicated, resolved against the post
    /// store, and sorted by publication time with the post id breaking
    /// ties to make the order total.
    pub fn feed(&self, user_id: UserId) -> Vec<PostReadModel> {
        let store = self.read_store();

        let mut ids = store.timeline(user_id);
        let mut seen: HashSet<PostId> = ids.iter().copied().collect();

        let followed = store.outgoing(user_id);
        for post_id in store.celebrity_posts_of(&followed) {
            if seen.insert(post_id) {
                ids.push(post_id);
            }
        }

        let mut posts: Vec<PostReadModel> =
            ids.into_iter().filter_map(|id| store.post(id)).collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.post_id.cmp(&a.post_id))
        });
        posts
    }

    /// The author's posts, newest first.
    pub fn posts_by_author(&self, author_id: UserId) -> Vec<PostReadModel> {
        self.read_store().posts_by_author(author_id)
    }

    /// Whether `follower` currently follows `followee`.
    pub fn is_following(&self, follower: UserId, followee: UserId) -> bool {
        self.read_store().is_following(follower, followee)
    }
}
