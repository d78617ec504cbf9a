//! Social graph operations: users, posts, comments, likes, follows, reposts.
//!
//! Every operation validates its main entity before the first write and
//! surfaces typed failures (`NotFound`, `Conflict`, `Validation`,
//! `Unauthorized`). Multi-edge writes (a post plus its topic edges) are not
//! atomic across the store boundary; a failure partway leaves the already
//! written part in place.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::schema::{require_datetime, require_str};
use crate::model::{Direction, Label, Node, PropertyMap, RelType, Value};
use crate::store::GraphStore;
use crate::{Error, Result, SpaceGraph};

// ============================================================================
// Views
// ============================================================================

/// A user's public profile. The stored credential never leaves the store
/// layer except through `authenticate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// An authored post with its topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub topics: Vec<String>,
}

/// A repost joined to its original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepostView {
    pub original_post_id: String,
    pub text: String,
    pub original_author: String,
    pub original_created_at: DateTime<Utc>,
    pub reposted_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Topics referenced by `#tag` tokens in a post. Case-sensitive, `#` trimmed,
/// empty tags dropped, duplicates collapsed.
fn extract_topics(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .filter(|token| token.starts_with('#'))
        .map(|token| token.trim_matches('#').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

impl<S: GraphStore> SpaceGraph<S> {
    // ========================================================================
    // Accounts
    // ========================================================================

    /// Register a new user.
    ///
    /// The credential is stored verbatim — matching the upstream system this
    /// models; see DESIGN.md for the hashing question.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<()> {
        if username.is_empty() {
            return Err(Error::Validation("username is required".into()));
        }
        if password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }
        if email.is_empty() {
            return Err(Error::Validation("email is required".into()));
        }
        if self.user_exists(username).await? {
            return Err(Error::Conflict(format!("username '{username}' is taken")));
        }

        let mut props = PropertyMap::new();
        props.insert("username".into(), Value::from(username));
        props.insert("password".into(), Value::from(password));
        props.insert("email".into(), Value::from(email));
        props.insert("created_at".into(), Value::from(self.now()));
        self.store().create_node(Label::User.as_str(), props).await?;

        info!(username, "registered user");
        Ok(())
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool> {
        Ok(self
            .store()
            .find_node(Label::User.as_str(), "username", &Value::from(username))
            .await?
            .is_some())
    }

    /// True iff the user exists and the credential matches the stored one.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let node = self
            .store()
            .find_node(Label::User.as_str(), "username", &Value::from(username))
            .await?;
        match node {
            Some(user) => Ok(require_str(&user.properties, "password")? == password),
            None => Ok(false),
        }
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<UserProfile>> {
        let node = self
            .store()
            .find_node(Label::User.as_str(), "username", &Value::from(username))
            .await?;
        node.map(|user| {
            Ok(UserProfile {
                username: require_str(&user.properties, "username")?.to_string(),
                email: require_str(&user.properties, "email")?.to_string(),
                created_at: require_datetime(&user.properties, "created_at")?,
            })
        })
        .transpose()
    }

    // ========================================================================
    // Posts
    // ========================================================================

    /// Publish a post. Topics come from `#tag` tokens in the text; each one
    /// is minted as a Topic node on first reference. Returns the post id.
    pub async fn add_post(&self, username: &str, text: &str) -> Result<String> {
        let user = self.require_user(username).await?;

        let post_id = Uuid::new_v4().to_string();
        let mut props = PropertyMap::new();
        props.insert("id".into(), Value::from(post_id.as_str()));
        props.insert("text".into(), Value::from(text));
        props.insert("created_at".into(), Value::from(self.now()));
        let post = self.store().create_node(Label::Post.as_str(), props).await?;

        // Authorship is a bidirectional convenience pair for one fact.
        self.store()
            .create_relationship(user.id, post, RelType::PublishedOn.as_str(), PropertyMap::new())
            .await?;
        self.store()
            .create_relationship(post, user.id, RelType::By.as_str(), PropertyMap::new())
            .await?;

        for topic in extract_topics(text) {
            let topic_node = self.ensure_topic(&topic).await?;
            self.store()
                .create_relationship(post, topic_node, RelType::HasTopic.as_str(), PropertyMap::new())
                .await?;
        }

        debug!(username, %post_id, "published post");
        Ok(post_id)
    }

    /// Repost an existing post as a new Post node linked to the original.
    /// Returns the repost's id.
    pub async fn repost(&self, username: &str, post_id: &str) -> Result<String> {
        let user = self.require_user(username).await?;
        let original = self.require_post(post_id).await?;

        let repost_id = Uuid::new_v4().to_string();
        let mut props = PropertyMap::new();
        props.insert("id".into(), Value::from(repost_id.as_str()));
        props.insert(
            "text".into(),
            Value::from(require_str(&original.properties, "text")?),
        );
        props.insert("created_at".into(), Value::from(self.now()));
        let repost = self.store().create_node(Label::Post.as_str(), props).await?;

        self.store()
            .create_relationship(user.id, repost, RelType::Reposted.as_str(), PropertyMap::new())
            .await?;
        self.store()
            .create_relationship(repost, original.id, RelType::RepostOf.as_str(), PropertyMap::new())
            .await?;

        debug!(username, post_id, %repost_id, "reposted");
        Ok(repost_id)
    }

    /// Delete a post. Only its author may delete it.
    pub async fn delete_post(&self, username: &str, post_id: &str) -> Result<()> {
        let user = self.require_user(username).await?;
        let post = self.require_post(post_id).await?;

        let authored = self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::PublishedOn.as_str()))
            .await?
            .iter()
            .any(|rel| rel.dst == post.id);
        if !authored {
            return Err(Error::Unauthorized(format!(
                "'{username}' is not the author of post '{post_id}'"
            )));
        }

        self.store().detach_delete_node(post.id).await?;
        info!(username, post_id, "deleted post");
        Ok(())
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Comment on a post. Returns the comment id.
    pub async fn add_comment(&self, username: &str, post_id: &str, text: &str) -> Result<String> {
        let user = self.require_user(username).await?;
        let post = self.require_post(post_id).await?;

        let comment_id = Uuid::new_v4().to_string();
        let mut props = PropertyMap::new();
        props.insert("id".into(), Value::from(comment_id.as_str()));
        props.insert("text".into(), Value::from(text));
        props.insert("created_at".into(), Value::from(self.now()));
        let comment = self
            .store()
            .create_node(Label::Comment.as_str(), props)
            .await?;

        self.store()
            .create_relationship(user.id, comment, RelType::Commented.as_str(), PropertyMap::new())
            .await?;
        self.store()
            .create_relationship(comment, post.id, RelType::On.as_str(), PropertyMap::new())
            .await?;

        debug!(username, post_id, %comment_id, "added comment");
        Ok(comment_id)
    }

    /// Delete a comment. Only its author may delete it.
    pub async fn delete_comment(&self, username: &str, comment_id: &str) -> Result<()> {
        let user = self.require_user(username).await?;
        let comment = self.require_comment(comment_id).await?;

        let authored = self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::Commented.as_str()))
            .await?
            .iter()
            .any(|rel| rel.dst == comment.id);
        if !authored {
            return Err(Error::Unauthorized(format!(
                "'{username}' is not the author of comment '{comment_id}'"
            )));
        }

        self.store().detach_delete_node(comment.id).await?;
        info!(username, comment_id, "deleted comment");
        Ok(())
    }

    // ========================================================================
    // Likes and follows
    // ========================================================================

    /// Create or remove the `LIKES` edge for (user, post).
    pub async fn toggle_like(&self, username: &str, post_id: &str, liked: bool) -> Result<()> {
        let user = self.require_user(username).await?;
        let post = self.require_post(post_id).await?;

        if liked {
            self.store()
                .create_relationship(user.id, post.id, RelType::Likes.as_str(), PropertyMap::new())
                .await?;
        } else {
            let edges = self
                .store()
                .relationships(user.id, Direction::Outgoing, Some(RelType::Likes.as_str()))
                .await?;
            for rel in edges.iter().filter(|rel| rel.dst == post.id) {
                self.store().delete_relationship(rel.id).await?;
            }
        }
        Ok(())
    }

    /// Create or remove the `FOLLOWS` edge for (user, target).
    pub async fn toggle_follow(
        &self,
        username: &str,
        target_username: &str,
        following: bool,
    ) -> Result<()> {
        if username == target_username {
            return Err(Error::Validation("cannot follow yourself".into()));
        }
        let user = self.require_user(username).await?;
        let target = self.require_user(target_username).await?;

        if following {
            self.store()
                .create_relationship(user.id, target.id, RelType::Follows.as_str(), PropertyMap::new())
                .await?;
        } else {
            let edges = self
                .store()
                .relationships(user.id, Direction::Outgoing, Some(RelType::Follows.as_str()))
                .await?;
            for rel in edges.iter().filter(|rel| rel.dst == target.id) {
                self.store().delete_relationship(rel.id).await?;
            }
        }
        Ok(())
    }

    pub async fn is_following(&self, username: &str, target_username: &str) -> Result<bool> {
        let user = self.require_user(username).await?;
        let target = self.require_user(target_username).await?;
        Ok(self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::Follows.as_str()))
            .await?
            .iter()
            .any(|rel| rel.dst == target.id))
    }

    /// Usernames this user follows.
    pub async fn following(&self, username: &str) -> Result<Vec<String>> {
        let user = self.require_user(username).await?;
        let edges = self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::Follows.as_str()))
            .await?;
        let mut names = Vec::with_capacity(edges.len());
        for rel in edges {
            if let Some(target) = self.store().get_node(rel.dst).await? {
                names.push(require_str(&target.properties, "username")?.to_string());
            }
        }
        Ok(names)
    }

    /// Usernames following this user.
    pub async fn followers(&self, username: &str) -> Result<Vec<String>> {
        let user = self.require_user(username).await?;
        let edges = self
            .store()
            .relationships(user.id, Direction::Incoming, Some(RelType::Follows.as_str()))
            .await?;
        let mut names = Vec::with_capacity(edges.len());
        for rel in edges {
            if let Some(source) = self.store().get_node(rel.src).await? {
                names.push(require_str(&source.properties, "username")?.to_string());
            }
        }
        Ok(names)
    }

    // ========================================================================
    // Feed reads
    // ========================================================================

    /// All authored posts, newest first.
    pub async fn all_posts(&self) -> Result<Vec<PostView>> {
        let mut views = Vec::new();
        for rel in self
            .store()
            .relationships_by_type(RelType::PublishedOn.as_str())
            .await?
        {
            let (Some(author), Some(post)) = (
                self.store().get_node(rel.src).await?,
                self.store().get_node(rel.dst).await?,
            ) else {
                continue;
            };
            views.push(self.post_view(&author, &post).await?);
        }
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    /// Posts authored by one user, newest first.
    pub async fn user_posts(&self, username: &str) -> Result<Vec<PostView>> {
        let user = self.require_user(username).await?;
        let mut views = Vec::new();
        for rel in self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::PublishedOn.as_str()))
            .await?
        {
            if let Some(post) = self.store().get_node(rel.dst).await? {
                views.push(self.post_view(&user, &post).await?);
            }
        }
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    /// A user's reposts joined to their originals, newest repost first.
    /// Reposts whose original has been deleted are skipped.
    pub async fn user_reposts(&self, username: &str) -> Result<Vec<RepostView>> {
        let user = self.require_user(username).await?;
        let mut views = Vec::new();
        for rel in self
            .store()
            .relationships(user.id, Direction::Outgoing, Some(RelType::Reposted.as_str()))
            .await?
        {
            let Some(repost) = self.store().get_node(rel.dst).await? else {
                continue;
            };
            let Some(original) = self.repost_original(&repost).await? else {
                continue;
            };
            let Some(original_author) = self.post_author(&original).await? else {
                continue;
            };
            views.push(RepostView {
                original_post_id: require_str(&original.properties, "id")?.to_string(),
                text: require_str(&original.properties, "text")?.to_string(),
                original_author,
                original_created_at: require_datetime(&original.properties, "created_at")?,
                reposted_at: require_datetime(&repost.properties, "created_at")?,
            });
        }
        views.sort_by(|a, b| b.reposted_at.cmp(&a.reposted_at));
        Ok(views)
    }

    /// Comments on a post, oldest first.
    pub async fn comments_on(&self, post_id: &str) -> Result<Vec<CommentView>> {
        let post = self.require_post(post_id).await?;
        let mut views = Vec::new();
        for rel in self
            .store()
            .relationships(post.id, Direction::Incoming, Some(RelType::On.as_str()))
            .await?
        {
            let Some(comment) = self.store().get_node(rel.src).await? else {
                continue;
            };
            let authors = self
                .store()
                .relationships(comment.id, Direction::Incoming, Some(RelType::Commented.as_str()))
                .await?;
            let Some(author_rel) = authors.first() else {
                continue;
            };
            let Some(author) = self.store().get_node(author_rel.src).await? else {
                continue;
            };
            views.push(CommentView {
                id: require_str(&comment.properties, "id")?.to_string(),
                author: require_str(&author.properties, "username")?.to_string(),
                text: require_str(&comment.properties, "text")?.to_string(),
                created_at: require_datetime(&comment.properties, "created_at")?,
            });
        }
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(views)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    async fn post_view(&self, author: &Node, post: &Node) -> Result<PostView> {
        let mut topics = Vec::new();
        for rel in self
            .store()
            .relationships(post.id, Direction::Outgoing, Some(RelType::HasTopic.as_str()))
            .await?
        {
            if let Some(topic) = self.store().get_node(rel.dst).await? {
                topics.push(require_str(&topic.properties, "name")?.to_string());
            }
        }
        topics.sort();

        Ok(PostView {
            id: require_str(&post.properties, "id")?.to_string(),
            author: require_str(&author.properties, "username")?.to_string(),
            text: require_str(&post.properties, "text")?.to_string(),
            created_at: require_datetime(&post.properties, "created_at")?,
            topics,
        })
    }

    /// The original post behind a repost node, if it still exists.
    pub(crate) async fn repost_original(&self, repost: &Node) -> Result<Option<Node>> {
        let rels = self
            .store()
            .relationships(repost.id, Direction::Outgoing, Some(RelType::RepostOf.as_str()))
            .await?;
        match rels.first() {
            Some(rel) => self.store().get_node(rel.dst).await,
            None => Ok(None),
        }
    }

    /// The author of a post via its `BY` back-edge.
    async fn post_author(&self, post: &Node) -> Result<Option<String>> {
        let rels = self
            .store()
            .relationships(post.id, Direction::Outgoing, Some(RelType::By.as_str()))
            .await?;
        let Some(rel) = rels.first() else {
            return Ok(None);
        };
        match self.store().get_node(rel.dst).await? {
            Some(author) => Ok(Some(require_str(&author.properties, "username")?.to_string())),
            None => Ok(None),
        }
    }
}
