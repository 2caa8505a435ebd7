use crate::config::SyncConfig;
use crate::domain::models::{
    CulturalPost, CulturalPostPatch, ImageUpload, NewCulturalPost, NewPostComment, PostComment,
};
use crate::error::{SyncError, SyncResult};
use crate::metrics;
use crate::repository::{CultureRepository, MediaRepository};
use chrono::Utc;
use dashmap::DashSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Storage bucket for post cover images
pub const POST_IMAGE_BUCKET: &str = "cultural-posts";

/// Client-local read replica of the culture section
#[derive(Debug, Clone, Default)]
pub struct CultureState {
    pub posts: Vec<CulturalPost>,
    pub comments: HashMap<String, Vec<PostComment>>,
    pub user_likes: HashSet<String>,
    pub loading: bool,
    pub last_refreshed: Option<Instant>,
    /// Bumped by every successful post fetch
    pub generation: u64,
}

/// Which relation write a failed counter adjustment followed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeWrite {
    Inserted,
    Deleted,
}

/// Interaction kind plus (post, user)
type InFlightKey = (&'static str, String, String);

/// Removes the in-flight key when the interaction finishes, however it finishes
struct InFlightGuard<'a> {
    keys: &'a DashSet<InFlightKey>,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

/// Social-state synchronizer
///
/// Keeps the local post aggregates and the current user's like membership in step
/// with the remote store without re-fetching the post list after every interaction.
///
/// A like toggle is three remote calls (lookup, relation write, counter RPC) that the
/// backend does not run in one transaction. When the counter call fails after the
/// relation write succeeded, the relation write is reversed if
/// `rollback_on_counter_failure` is set; local state only changes after every remote
/// call for the toggle succeeded.
pub struct CultureStore {
    repo: Arc<dyn CultureRepository>,
    media: Arc<dyn MediaRepository>,
    rollback_on_counter_failure: bool,
    state: RwLock<CultureState>,
    in_flight: DashSet<InFlightKey>,
}

impl CultureStore {
    pub fn new(
        repo: Arc<dyn CultureRepository>,
        media: Arc<dyn MediaRepository>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            repo,
            media,
            rollback_on_counter_failure: config.rollback_on_counter_failure,
            state: RwLock::new(CultureState::default()),
            in_flight: DashSet::new(),
        }
    }

    // ========== Reads ==========

    pub async fn snapshot(&self) -> CultureState {
        self.state.read().await.clone()
    }

    pub async fn posts(&self) -> Vec<CulturalPost> {
        self.state.read().await.posts.clone()
    }

    pub async fn post(&self, post_id: &str) -> Option<CulturalPost> {
        let state = self.state.read().await;
        state.posts.iter().find(|p| p.id == post_id).cloned()
    }

    /// Posts in a category; `"all"` matches every post
    pub async fn posts_in_category(&self, category: &str) -> Vec<CulturalPost> {
        let state = self.state.read().await;
        state
            .posts
            .iter()
            .filter(|p| category == "all" || p.category == category)
            .cloned()
            .collect()
    }

    /// Comments last fetched for a post; `None` if never fetched
    pub async fn comments(&self, post_id: &str) -> Option<Vec<PostComment>> {
        self.state.read().await.comments.get(post_id).cloned()
    }

    pub async fn user_likes(&self) -> HashSet<String> {
        self.state.read().await.user_likes.clone()
    }

    pub async fn is_liked(&self, post_id: &str) -> bool {
        self.state.read().await.user_likes.contains(post_id)
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    // ========== Post list ==========

    /// Replace the local post list with the published posts, newest first
    pub async fn fetch_posts(&self) -> SyncResult<()> {
        self.state.write().await.loading = true;

        let result = self.repo.list_published_posts().await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(posts) => {
                debug!(count = posts.len(), "Fetched posts");
                state.posts = posts;
                state.last_refreshed = Some(Instant::now());
                state.generation += 1;
                Ok(())
            }
            Err(e) => {
                metrics::record_remote_failure("fetch_posts");
                error!(error = %e, "Error fetching posts");
                Err(e)
            }
        }
    }

    /// Create a post, uploading its cover image first when one is attached
    pub async fn create_post(
        &self,
        mut post: NewCulturalPost,
        image: Option<ImageUpload>,
    ) -> SyncResult<CulturalPost> {
        if let Some(image) = image {
            post.image_url = self.upload_post_image(&image).await?;
        }

        let created = self.repo.insert_post(&post).await.map_err(|e| {
            metrics::record_remote_failure("create_post");
            error!(error = %e, "Error creating post");
            e
        })?;

        info!(post_id = %created.id, "Created post");
        self.state.write().await.posts.insert(0, created.clone());
        Ok(created)
    }

    /// Upload a cover image as `{unix_millis}.{ext}`; returns its public URL
    pub async fn upload_post_image(&self, image: &ImageUpload) -> SyncResult<String> {
        let object_name = format!("{}.{}", Utc::now().timestamp_millis(), image.extension());
        self.media
            .upload_image(POST_IMAGE_BUCKET, &object_name, image)
            .await
            .map_err(|e| {
                metrics::record_remote_failure("upload_post_image");
                error!(object = %object_name, error = %e, "Error uploading post image");
                e
            })
    }

    pub async fn update_post(
        &self,
        post_id: &str,
        patch: &CulturalPostPatch,
    ) -> SyncResult<CulturalPost> {
        let updated = self.repo.update_post(post_id, patch).await.map_err(|e| {
            metrics::record_remote_failure("update_post");
            error!(post_id = %post_id, error = %e, "Error updating post");
            e
        })?;

        let mut state = self.state.write().await;
        if let Some(slot) = state.posts.iter_mut().find(|p| p.id == post_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete_post(&self, post_id: &str) -> SyncResult<()> {
        self.repo.delete_post(post_id).await.map_err(|e| {
            metrics::record_remote_failure("delete_post");
            error!(post_id = %post_id, error = %e, "Error deleting post");
            e
        })?;

        let mut state = self.state.write().await;
        state.posts.retain(|p| p.id != post_id);
        state.comments.remove(post_id);
        state.user_likes.remove(post_id);
        info!(post_id = %post_id, "Deleted post");
        Ok(())
    }

    // ========== Likes ==========

    /// Replace the like set with the user's remote likes.
    ///
    /// On failure the set is emptied (no like shown as active) and the error returned.
    pub async fn fetch_user_likes(&self, user_id: &str) -> SyncResult<()> {
        match self.repo.list_user_like_post_ids(user_id).await {
            Ok(post_ids) => {
                let mut state = self.state.write().await;
                state.user_likes = post_ids.into_iter().collect();
                debug!(user_id = %user_id, count = state.user_likes.len(), "Fetched user likes");
                Ok(())
            }
            Err(e) => {
                metrics::record_remote_failure("fetch_user_likes");
                error!(user_id = %user_id, error = %e, "Error fetching user likes");
                self.state.write().await.user_likes = HashSet::new();
                Err(e)
            }
        }
    }

    /// Forget the like membership, e.g. once nobody is signed in
    pub async fn clear_user_likes(&self) {
        self.state.write().await.user_likes.clear();
    }

    /// Like or unlike a post. Returns whether the post is liked afterwards.
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> SyncResult<bool> {
        let _guard = self.begin("toggle_like", post_id, user_id)?;
        let generation = self.state.read().await.generation;

        let liked = match self.toggle_like_remote(post_id, user_id).await {
            Ok(liked) => liked,
            Err(e) => {
                metrics::record_remote_failure("toggle_like");
                error!(post_id = %post_id, user_id = %user_id, error = %e, "Error toggling like");
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if liked {
            state.user_likes.insert(post_id.to_string());
        } else {
            state.user_likes.remove(post_id);
        }
        if state.generation != generation {
            // The list was re-fetched mid-toggle and may already include this change
            debug!(post_id = %post_id, "Post list replaced during toggle, deferring count to next refresh");
            state.last_refreshed = None;
        } else if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.likes_count = if liked {
                post.likes_count + 1
            } else {
                (post.likes_count - 1).max(0)
            };
        }

        Ok(liked)
    }

    async fn toggle_like_remote(&self, post_id: &str, user_id: &str) -> SyncResult<bool> {
        let existing = self.repo.find_like(post_id, user_id).await?;

        if existing.is_some() {
            self.repo.delete_like(post_id, user_id).await?;
            if let Err(e) = self.repo.decrement_likes(post_id).await {
                self.compensate(LikeWrite::Deleted, post_id, user_id).await;
                return Err(e);
            }
            Ok(false)
        } else {
            self.repo.insert_like(post_id, user_id).await?;
            if let Err(e) = self.repo.increment_likes(post_id).await {
                self.compensate(LikeWrite::Inserted, post_id, user_id).await;
                return Err(e);
            }
            Ok(true)
        }
    }

    /// Undo a relation write whose counter adjustment failed
    async fn compensate(&self, write: LikeWrite, post_id: &str, user_id: &str) {
        if !self.rollback_on_counter_failure {
            warn!(
                post_id = %post_id,
                user_id = %user_id,
                "Counter adjustment failed after like write; relation and counter may disagree"
            );
            return;
        }

        let undo = match write {
            LikeWrite::Inserted => self.repo.delete_like(post_id, user_id).await,
            LikeWrite::Deleted => self.repo.insert_like(post_id, user_id).await,
        };

        match undo {
            Ok(()) => {
                metrics::record_rollback("toggle_like", true);
                warn!(post_id = %post_id, user_id = %user_id, ?write, "Rolled back like write");
            }
            Err(e) => {
                metrics::record_rollback("toggle_like", false);
                error!(
                    post_id = %post_id,
                    user_id = %user_id,
                    ?write,
                    error = %e,
                    "Rollback of like write failed; relation and counter disagree"
                );
            }
        }
    }

    // ========== Comments ==========

    /// Insert a comment and bump the local `comments_count`.
    ///
    /// The new comment is not spliced into the local list; call
    /// [`CultureStore::fetch_comments`] to see it.
    pub async fn add_comment(
        &self,
        post_id: &str,
        user_id: &str,
        content: &str,
        author_name: &str,
    ) -> SyncResult<()> {
        let _guard = self.begin("add_comment", post_id, user_id)?;
        let generation = self.state.read().await.generation;

        let comment = NewPostComment {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            author_name: author_name.to_string(),
        };

        if let Err(e) = self.repo.insert_comment(&comment).await {
            metrics::record_remote_failure("add_comment");
            error!(post_id = %post_id, user_id = %user_id, error = %e, "Error adding comment");
            return Err(e);
        }

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(post_id = %post_id, "Post list replaced during comment, deferring count to next refresh");
            state.last_refreshed = None;
        } else if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.comments_count += 1;
        }
        Ok(())
    }

    /// Replace the comment list of one post, newest first
    pub async fn fetch_comments(&self, post_id: &str) -> SyncResult<()> {
        let comments = self.repo.list_comments(post_id).await.map_err(|e| {
            metrics::record_remote_failure("fetch_comments");
            error!(post_id = %post_id, error = %e, "Error fetching comments");
            e
        })?;

        self.state
            .write()
            .await
            .comments
            .insert(post_id.to_string(), comments);
        Ok(())
    }

    // ========== Refresh policy ==========

    /// Mark the post replica stale so the next refresh re-fetches it
    pub async fn invalidate(&self) {
        self.state.write().await.last_refreshed = None;
    }

    pub async fn is_stale(&self, max_age: Duration) -> bool {
        match self.state.read().await.last_refreshed {
            Some(at) => at.elapsed() >= max_age,
            None => true,
        }
    }

    /// Re-fetch posts when the replica is older than `max_age`. Returns whether it did.
    pub async fn refresh_if_stale(&self, max_age: Duration) -> SyncResult<bool> {
        if !self.is_stale(max_age).await {
            return Ok(false);
        }
        self.fetch_posts().await?;
        Ok(true)
    }

    /// Run [`CultureStore::refresh_if_stale`] every `interval` until `shutdown` flips to true
    pub fn spawn_refresher(
        self: &Arc<Self>,
        max_age: Duration,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = store.refresh_if_stale(max_age).await {
                            warn!(error = %e, "Background post refresh failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Post refresher stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    // ========== In-flight tracking ==========

    fn begin(
        &self,
        operation: &'static str,
        post_id: &str,
        user_id: &str,
    ) -> SyncResult<InFlightGuard<'_>> {
        let key = (operation, post_id.to_string(), user_id.to_string());
        if !self.in_flight.insert(key.clone()) {
            metrics::record_inflight_rejection(operation);
            warn!(post_id = %post_id, user_id = %user_id, operation, "Rejected duplicate interaction");
            return Err(SyncError::InFlight(format!(
                "{} on post {} by user {}",
                operation, post_id, user_id
            )));
        }
        Ok(InFlightGuard {
            keys: &self.in_flight,
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PostLike;
    use crate::repository::traits::MockCultureRepository;
    use crate::repository::MemoryRepository;

    fn post(id: &str, likes: i64) -> CulturalPost {
        CulturalPost {
            id: id.to_string(),
            title: format!("Post {}", id),
            content: "Body".into(),
            excerpt: "Excerpt".into(),
            category: "heritage".into(),
            author: "Editor".into(),
            image_url: String::new(),
            tags: vec!["heritage".into()],
            likes_count: likes,
            comments_count: 0,
            read_time: "3 min".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_published: true,
        }
    }

    fn store_with(mock: MockCultureRepository, rollback: bool) -> CultureStore {
        let config = SyncConfig {
            rollback_on_counter_failure: rollback,
            ..SyncConfig::default()
        };
        CultureStore::new(Arc::new(mock), Arc::new(MemoryRepository::new()), &config)
    }

    fn remote_error() -> SyncError {
        SyncError::Internal("counter rpc unavailable".into())
    }

    #[tokio::test]
    async fn test_increment_failure_rolls_back_inserted_like() {
        let mut mock = MockCultureRepository::new();
        mock.expect_list_published_posts()
            .returning(|| Ok(vec![post("p1", 5)]));
        mock.expect_find_like().returning(|_, _| Ok(None));
        mock.expect_insert_like().times(1).returning(|_, _| Ok(()));
        mock.expect_increment_likes()
            .times(1)
            .returning(|_| Err(remote_error()));
        mock.expect_delete_like().times(1).returning(|_, _| Ok(()));

        let store = store_with(mock, true);
        store.fetch_posts().await.unwrap();

        assert!(store.toggle_like("p1", "u1").await.is_err());
        assert!(!store.is_liked("p1").await);
        assert_eq!(store.post("p1").await.unwrap().likes_count, 5);
    }

    #[tokio::test]
    async fn test_decrement_failure_rolls_back_deleted_like() {
        let mut mock = MockCultureRepository::new();
        mock.expect_find_like().returning(|post_id, user_id| {
            Ok(Some(PostLike {
                id: "l1".into(),
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
                created_at: Utc::now(),
            }))
        });
        mock.expect_delete_like().times(1).returning(|_, _| Ok(()));
        mock.expect_decrement_likes()
            .times(1)
            .returning(|_| Err(remote_error()));
        mock.expect_insert_like().times(1).returning(|_, _| Ok(()));

        let store = store_with(mock, true);
        assert!(store.toggle_like("p1", "u1").await.is_err());
    }

    #[tokio::test]
    async fn test_without_rollback_relation_write_is_kept() {
        let mut mock = MockCultureRepository::new();
        mock.expect_find_like().returning(|_, _| Ok(None));
        mock.expect_insert_like().times(1).returning(|_, _| Ok(()));
        mock.expect_increment_likes()
            .times(1)
            .returning(|_| Err(remote_error()));
        mock.expect_delete_like().never();

        let store = store_with(mock, false);
        assert!(store.toggle_like("p1", "u1").await.is_err());
        assert!(!store.is_liked("p1").await);
    }

    #[tokio::test]
    async fn test_failed_lookup_touches_nothing() {
        let mut mock = MockCultureRepository::new();
        mock.expect_find_like()
            .returning(|_, _| Err(SyncError::Internal("offline".into())));
        mock.expect_insert_like().never();
        mock.expect_delete_like().never();

        let store = store_with(mock, true);
        assert!(store.toggle_like("p1", "u1").await.is_err());
        assert!(store.user_likes().await.is_empty());
    }

    #[tokio::test]
    async fn test_decrement_is_clamped_at_zero() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1", 0)).await;
        repo.seed_like("p1", "u1").await;

        let store = CultureStore::new(repo.clone(), repo.clone(), &SyncConfig::default());
        store.fetch_posts().await.unwrap();

        assert!(!store.toggle_like("p1", "u1").await.unwrap());
        assert_eq!(store.post("p1").await.unwrap().likes_count, 0);
    }

    #[tokio::test]
    async fn test_fetch_posts_failure_clears_loading() {
        let mut mock = MockCultureRepository::new();
        mock.expect_list_published_posts()
            .returning(|| Err(SyncError::Internal("offline".into())));

        let store = store_with(mock, true);
        assert!(store.fetch_posts().await.is_err());
        assert!(!store.is_loading().await);
        assert!(store.is_stale(Duration::from_secs(3600)).await);
    }

    #[tokio::test]
    async fn test_posts_in_category() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1", 0)).await;
        repo.seed_post(CulturalPost {
            category: "music".into(),
            ..post("p2", 0)
        })
        .await;
        let store = CultureStore::new(repo.clone(), repo, &SyncConfig::default());
        store.fetch_posts().await.unwrap();

        let music: Vec<String> = store
            .posts_in_category("music")
            .await
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(music, vec!["p2"]);
        assert_eq!(store.posts_in_category("all").await.len(), 2);
        assert!(store.posts_in_category("food").await.is_empty());
    }

    #[tokio::test]
    async fn test_ids_with_separators_do_not_share_in_flight_keys() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("a:b", 0)).await;
        repo.seed_post(post("a", 0)).await;
        repo.set_latency(Some(Duration::from_millis(30))).await;
        let store = CultureStore::new(repo.clone(), repo.clone(), &SyncConfig::default());

        let (first, second) = tokio::join!(
            store.toggle_like("a:b", "c"),
            store.toggle_like("a", "b:c")
        );

        assert!(first.unwrap());
        assert!(second.unwrap());
        assert!(repo.like_exists("a:b", "c").await);
        assert!(repo.like_exists("a", "b:c").await);
    }

    #[tokio::test]
    async fn test_in_flight_key_released_after_failure() {
        let mut mock = MockCultureRepository::new();
        mock.expect_insert_comment()
            .times(2)
            .returning(|_| Err(SyncError::Internal("offline".into())));

        let store = store_with(mock, true);
        assert!(matches!(
            store.add_comment("p1", "u1", "hi", "Ann").await,
            Err(SyncError::Internal(_))
        ));
        // Second attempt reaches the repository again
        assert!(matches!(
            store.add_comment("p1", "u1", "hi", "Ann").await,
            Err(SyncError::Internal(_))
        ));
    }
}
