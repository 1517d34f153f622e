use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use murmur_core::{PostId, RelationshipId, UserId, Username};

use crate::config::Tunables;

use super::r#trait::{PostReadModel, ReadStore, UserProfile};

/// Timeline entry. The author is kept alongside the post id so that
/// author-directed cleanup (unfollow, retraction) is a single pass over
/// the owner's timeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct TimelineEntry {
    post_id: PostId,
    author_id: UserId,
}

/// In-memory read store.
///
/// Each index family lives under its own lock; the projector's step lock
/// provides cross-index atomicity for a projection step.
#[derive(Debug)]
pub struct InMemoryReadStore {
    tunables: Tunables,
    profiles: RwLock<HashMap<UserId, UserProfile>>,
    by_username: RwLock<HashMap<Username, UserId>>,
    posts: RwLock<HashMap<PostId, PostReadModel>>,
    /// Per-author post ids in publication order (oldest first).
    author_index: RwLock<HashMap<UserId, Vec<PostId>>>,
    outgoing: RwLock<HashMap<UserId, HashSet<UserId>>>,
    incoming: RwLock<HashMap<UserId, HashSet<UserId>>>,
    relationships: RwLock<HashMap<(UserId, UserId), RelationshipId>>,
    timelines: RwLock<HashMap<UserId, VecDeque<TimelineEntry>>>,
    celebrity_posts: RwLock<HashMap<PostId, UserId>>,
}

impl InMemoryReadStore {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            profiles: RwLock::new(HashMap::new()),
            by_username: RwLock::new(HashMap::new()),
            posts: RwLock::new(HashMap::new()),
            author_index: RwLock::new(HashMap::new()),
            outgoing: RwLock::new(HashMap::new()),
            incoming: RwLock::new(HashMap::new()),
            relationships: RwLock::new(HashMap::new()),
            timelines: RwLock::new(HashMap::new()),
            celebrity_posts: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Tunables::default())
    }

    pub fn tunables(&self) -> Tunables {
        self.tunables
    }
}

impl ReadStore for InMemoryReadStore {
    fn save_profile(&self, profile: UserProfile) {
        if let Ok(mut index) = self.by_username.write() {
            index.insert(profile.username.clone(), profile.user_id);
        }
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(profile.user_id, profile);
        }
    }

    fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        let profiles = self.profiles.read().ok()?;
        profiles.get(&user_id).cloned()
    }

    fn find_profile_by_username(&self, username: &Username) -> Option<UserProfile> {
        let user_id = {
            let index = self.by_username.read().ok()?;
            *index.get(username)?
        };
        self.profile(user_id)
    }

    fn list_profiles(&self) -> Vec<UserProfile> {
        let profiles = match self.profiles.read() {
            Ok(p) => p,
            Err(_) => return vec![],
        };

        let mut all: Vec<UserProfile> = profiles.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        all
    }

    fn save_post(&self, post: PostReadModel) {
        if let Ok(mut index) = self.author_index.write() {
            let ids = index.entry(post.author_id).or_default();
            if !ids.contains(&post.post_id) {
                ids.push(post.post_id);
            }
        }
        if let Ok(mut posts) = self.posts.write() {
            posts.insert(post.post_id, post);
        }
    }

    fn post(&self, post_id: PostId) -> Option<PostReadModel> {
        let posts = self.posts.read().ok()?;
        posts.get(&post_id).cloned()
    }

    fn delete_post(&self, post_id: PostId) {
        let removed = match self.posts.write() {
            Ok(mut posts) => posts.remove(&post_id),
            Err(_) => None,
        };
        if let Some(post) = removed {
            if let Ok(mut index) = self.author_index.write() {
                if let Some(ids) = index.get_mut(&post.author_id) {
                    ids.retain(|id| *id != post_id);
                }
            }
        }
    }

    fn posts_by_author(&self, author_id: UserId) -> Vec<PostReadModel> {
        let ids = match self.author_index.read() {
            Ok(index) => index.get(&author_id).cloned().unwrap_or_default(),
            Err(_) => return vec![],
        };
        let posts = match self.posts.read() {
            Ok(p) => p,
            Err(_) => return vec![],
        };

        // The index is oldest-first; reverse for newest-first.
        ids.iter()
            .rev()
            .filter_map(|id| posts.get(id).cloned())
            .collect()
    }

    fn add_edge(&self, follower: UserId, followee: UserId, relationship_id: RelationshipId) {
        if let Ok(mut out) = self.outgoing.write() {
            out.entry(follower).or_default().insert(followee);
        }
        if let Ok(mut inc) = self.incoming.write() {
            inc.entry(followee).or_default().insert(follower);
        }
        if let Ok(mut rels) = self.relationships.write() {
            rels.insert((follower, followee), relationship_id);
        }
    }

    fn remove_edge(&self, follower: UserId, followee: UserId) {
        if let Ok(mut out) = self.outgoing.write() {
            if let Some(set) = out.get_mut(&follower) {
                set.remove(&followee);
            }
        }
        if let Ok(mut inc) = self.incoming.write() {
            if let Some(set) = inc.get_mut(&followee) {
                set.remove(&follower);
            }
        }
        if let Ok(mut rels) = self.relationships.write() {
            rels.remove(&(follower, followee));
        }
    }

    fn outgoing(&self, user_id: UserId) -> Vec<UserId> {
        let out = match self.outgoing.read() {
            Ok(o) => o,
            Err(_) => return vec![],
        };

        let mut edges: Vec<UserId> = out.get(&user_id).into_iter().flatten().copied().collect();
        edges.sort();
        edges
    }

    fn incoming(&self, user_id: UserId) -> Vec<UserId> {
        let inc = match self.incoming.read() {
            Ok(i) => i,
            Err(_) => return vec![],
        };

        let mut edges: Vec<UserId> = inc.get(&user_id).into_iter().flatten().copied().collect();
        edges.sort();
        edges
    }

    fn is_following(&self, follower: UserId, followee: UserId) -> bool {
        self.outgoing
            .read()
            .map(|out| out.get(&follower).is_some_and(|set| set.contains(&followee)))
            .unwrap_or(false)
    }

    fn relationship_of(&self, follower: UserId, followee: UserId) -> Option<RelationshipId> {
        let rels = self.relationships.read().ok()?;
        rels.get(&(follower, followee)).copied()
    }

    fn push_timeline(&self, owner_id: UserId, post_id: PostId) {
        // Entries must resolve; an unknown post id is dropped here rather
        // than dangling in the timeline.
        let author_id = match self.post(post_id) {
            Some(post) => post.author_id,
            None => return,
        };

        if let Ok(mut timelines) = self.timelines.write() {
            let timeline = timelines.entry(owner_id).or_default();
            timeline.push_front(TimelineEntry { post_id, author_id });
            timeline.truncate(self.tunables.max_timeline);
        }
    }

    fn remove_from_timeline(&self, owner_id: UserId, post_id: PostId) {
        if let Ok(mut timelines) = self.timelines.write() {
            if let Some(timeline) = timelines.get_mut(&owner_id) {
                timeline.retain(|entry| entry.post_id != post_id);
            }
        }
    }

    fn remove_author_from_timeline(&self, owner_id: UserId, author_id: UserId) {
        if let Ok(mut timelines) = self.timelines.write() {
            if let Some(timeline) = timelines.get_mut(&owner_id) {
                timeline.retain(|entry| entry.author_id != author_id);
            }
        }
    }

    fn timeline(&self, owner_id: UserId) -> Vec<PostId> {
        let timelines = match self.timelines.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };

        timelines
            .get(&owner_id)
            .map(|t| t.iter().map(|entry| entry.post_id).collect())
            .unwrap_or_default()
    }

    fn mark_celebrity_post(&self, post_id: PostId, author_id: UserId) {
        if let Ok(mut celeb) = self.celebrity_posts.write() {
            celeb.insert(post_id, author_id);
        }
    }

    fn forget_celebrity_post(&self, post_id: PostId) -> bool {
        match self.celebrity_posts.write() {
            Ok(mut celeb) => celeb.remove(&post_id).is_some(),
            Err(_) => false,
        }
    }

    fn celebrity_posts_of(&self, author_ids: &[UserId]) -> Vec<PostId> {
        let authors: HashSet<UserId> = author_ids.iter().copied().collect();
        let celeb = match self.celebrity_posts.read() {
            Ok(c) => c,
            Err(_) => return vec![],
        };

        let mut posts: Vec<PostId> = celeb
            .iter()
            .filter(|(_, author)| authors.contains(author))
            .map(|(post_id, _)| *post_id)
            .collect();
        posts.sort();
        posts
    }

    fn is_celebrity(&self, user_id: UserId) -> bool {
        self.incoming
            .read()
            .map(|inc| inc.get(&user_id).map(HashSet::len).unwrap_or(0))
            .unwrap_or(0)
            >= self.tunables.celebrity_threshold
    }

    fn clear(&self) {
        if let Ok(mut m) = self.profiles.write() {
            m.clear();
        }
        if let Ok(mut m) = self.by_username.write() {
            m.clear();
        }
        if let Ok(mut m) = self.posts.write() {
            m.clear();
        }
        if let Ok(mut m) = self.author_index.write() {
            m.clear();
        }
        if let Ok(mut m) = self.outgoing.write() {
            m.clear();
        }
        if let Ok(mut m) = self.incoming.write() {
            m.clear();
        }
        if let Ok(mut m) = self.relationships.write() {
            m.clear();
        }
        if let Ok(mut m) = self.timelines.write() {
            m.clear();
        }
        if let Ok(mut m) = self.celebrity_posts.write() {
            m.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use murmur_core::PostBody;

    fn store() -> InMemoryReadStore {
        InMemoryReadStore::new(Tunables {
            celebrity_threshold: 3,
            max_timeline: 5,
        })
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            user_id: UserId::new(),
            username: Username::new(name).unwrap(),
        }
    }

    fn post(author: &UserProfile, body: &str) -> PostReadModel {
        PostReadModel {
            post_id: PostId::new(),
            author_id: author.user_id,
            author_username: author.username.clone(),
            body: PostBody::new(body).unwrap(),
            published_at: Utc::now(),
        }
    }

    #[test]
    fn profiles_are_indexed_by_id_and_username() {
        let store = store();
        let alice = profile("alice");
        store.save_profile(alice.clone());

        assert_eq!(store.profile(alice.user_id), Some(alice.clone()));
        assert_eq!(
            store.find_profile_by_username(&alice.username),
            Some(alice.clone())
        );
        assert_eq!(
            store.find_profile_by_username(&Username::new("nobody").unwrap()),
            None
        );

        let bob = profile("bob");
        store.save_profile(bob.clone());
        let listed = store.list_profiles();
        assert_eq!(listed, vec![alice, bob]);
    }

    #[test]
    fn posts_by_author_come_back_newest_first() {
        let store = store();
        let alice = profile("alice");
        store.save_profile(alice.clone());

        let p1 = post(&alice, "p1");
        let p2 = post(&alice, "p2");
        let p3 = post(&alice, "p3");
        for p in [&p1, &p2, &p3] {
            store.save_post(p.clone());
        }

        let ids: Vec<_> = store
            .posts_by_author(alice.user_id)
            .into_iter()
            .map(|p| p.post_id)
            .collect();
        assert_eq!(ids, vec![p3.post_id, p2.post_id, p1.post_id]);
    }

    #[test]
    fn delete_post_also_leaves_the_author_index() {
        let store = store();
        let alice = profile("alice");
        let p = post(&alice, "bye");
        store.save_post(p.clone());

        store.delete_post(p.post_id);
        assert_eq!(store.post(p.post_id), None);
        assert!(store.posts_by_author(alice.user_id).is_empty());
    }

    #[test]
    fn edges_update_both_indices_and_the_relationship_index() {
        let store = store();
        let a = UserId::new();
        let b = UserId::new();
        let rel = RelationshipId::new();

        store.add_edge(a, b, rel);
        assert!(store.is_following(a, b));
        assert!(!store.is_following(b, a));
        assert_eq!(store.outgoing(a), vec![b]);
        assert_eq!(store.incoming(b), vec![a]);
        assert_eq!(store.relationship_of(a, b), Some(rel));

        store.remove_edge(a, b);
        assert!(!store.is_following(a, b));
        assert!(store.outgoing(a).is_empty());
        assert!(store.incoming(b).is_empty());
        assert_eq!(store.relationship_of(a, b), None);
    }

    #[test]
    fn timeline_pushes_to_front_and_truncates() {
        let store = store();
        let alice = profile("alice");
        let reader = UserId::new();

        let mut expected = Vec::new();
        for i in 0..7 {
            let p = post(&alice, &format!("post {i}"));
            store.save_post(p.clone());
            store.push_timeline(reader, p.post_id);
            expected.push(p.post_id);
        }

        // Bounded at 5, newest first.
        let timeline = store.timeline(reader);
        assert_eq!(timeline.len(), 5);
        let newest_first: Vec<_> = expected.iter().rev().take(5).copied().collect();
        assert_eq!(timeline, newest_first);
    }

    #[test]
    fn pushing_an_unknown_post_is_a_no_op() {
        let store = store();
        let reader = UserId::new();
        store.push_timeline(reader, PostId::new());
        assert!(store.timeline(reader).is_empty());
    }

    #[test]
    fn timeline_removals_by_post_and_by_author() {
        let store = store();
        let alice = profile("alice");
        let bob = profile("bob");
        let reader = UserId::new();

        let a1 = post(&alice, "a1");
        let b1 = post(&bob, "b1");
        let a2 = post(&alice, "a2");
        for p in [&a1, &b1, &a2] {
            store.save_post(p.clone());
            store.push_timeline(reader, p.post_id);
        }

        store.remove_from_timeline(reader, b1.post_id);
        assert_eq!(store.timeline(reader), vec![a2.post_id, a1.post_id]);

        store.remove_author_from_timeline(reader, alice.user_id);
        assert!(store.timeline(reader).is_empty());
    }

    #[test]
    fn celebrity_threshold_counts_incoming_edges() {
        let store = store();
        let star = UserId::new();

        for _ in 0..2 {
            store.add_edge(UserId::new(), star, RelationshipId::new());
        }
        assert!(!store.is_celebrity(star));

        store.add_edge(UserId::new(), star, RelationshipId::new());
        assert!(store.is_celebrity(star));
    }

    #[test]
    fn celebrity_index_marks_and_forgets() {
        let store = store();
        let star = UserId::new();
        let other = UserId::new();
        let p1 = PostId::new();
        let p2 = PostId::new();

        store.mark_celebrity_post(p1, star);
        store.mark_celebrity_post(p2, other);

        assert_eq!(store.celebrity_posts_of(&[star]), vec![p1]);
        let mut both = store.celebrity_posts_of(&[star, other]);
        both.sort();
        let mut expected = vec![p1, p2];
        expected.sort();
        assert_eq!(both, expected);

        assert!(store.forget_celebrity_post(p1));
        assert!(!store.forget_celebrity_post(p1));
        assert!(store.celebrity_posts_of(&[star]).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let store = store();
        let alice = profile("alice");
        store.save_profile(alice.clone());
        let p = post(&alice, "post");
        store.save_post(p.clone());
        store.add_edge(UserId::new(), alice.user_id, RelationshipId::new());
        store.push_timeline(UserId::new(), p.post_id);
        store.mark_celebrity_post(p.post_id, alice.user_id);

        store.clear();

        assert!(store.list_profiles().is_empty());
        assert_eq!(store.post(p.post_id), None);
        assert!(store.incoming(alice.user_id).is_empty());
        assert!(store.celebrity_posts_of(&[alice.user_id]).is_empty());
    }
}
