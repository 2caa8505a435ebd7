use crate::error::{SyncError, SyncResult};
use crate::services::auth::AuthStore;
use crate::services::culture::CultureStore;
use std::sync::Arc;
use tracing::debug;

/// Author name used when the profile has no full name
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Culture page interactions on behalf of the signed-in user
pub struct CultureFeed {
    auth: Arc<AuthStore>,
    culture: Arc<CultureStore>,
}

impl CultureFeed {
    pub fn new(auth: Arc<AuthStore>, culture: Arc<CultureStore>) -> Self {
        Self { auth, culture }
    }

    /// Load posts and the viewer's likes independently; the first failure is returned.
    /// Signed out, the like set is cleared.
    pub async fn load(&self) -> SyncResult<()> {
        let posts = self.culture.fetch_posts().await;
        let likes = match self.auth.current_user() {
            Some(user) => self.culture.fetch_user_likes(&user.id).await,
            None => {
                self.culture.clear_user_likes().await;
                Ok(())
            }
        };
        posts.and(likes)
    }

    pub async fn like(&self, post_id: &str) -> SyncResult<bool> {
        let user = self.auth.require_user()?;
        self.culture.toggle_like(post_id, &user.id).await
    }

    /// Post a comment, then re-fetch the post's comments so it shows up
    pub async fn comment(&self, post_id: &str, content: &str) -> SyncResult<()> {
        let user = self.auth.require_user()?;

        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::Validation("Comment cannot be empty".to_string()));
        }

        let author = self
            .auth
            .profile()
            .map(|p| p.full_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());

        self.culture
            .add_comment(post_id, &user.id, content, &author)
            .await?;
        debug!(post_id = %post_id, "Comment added, refreshing list");
        self.culture.fetch_comments(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::domain::models::{CulturalPost, Role, UserProfile};
    use crate::repository::{MemoryRepository, Op};
    use chrono::Utc;

    fn post(id: &str) -> CulturalPost {
        CulturalPost {
            id: id.to_string(),
            title: "Coffee ceremony".into(),
            content: "Body".into(),
            excerpt: "Excerpt".into(),
            category: "traditions".into(),
            author: "Editor".into(),
            image_url: String::new(),
            tags: vec![],
            likes_count: 2,
            comments_count: 0,
            read_time: "3 min".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_published: true,
        }
    }

    async fn feed(repo: &Arc<MemoryRepository>) -> (Arc<AuthStore>, Arc<CultureStore>, CultureFeed) {
        let config = SyncConfig::default();
        let auth = Arc::new(AuthStore::new(repo.clone(), &config));
        let culture = Arc::new(CultureStore::new(repo.clone(), repo.clone(), &config));
        let feed = CultureFeed::new(auth.clone(), culture.clone());
        (auth, culture, feed)
    }

    #[tokio::test]
    async fn test_interactions_require_sign_in() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1")).await;
        let (_, _, feed) = feed(&repo).await;

        assert!(matches!(feed.like("p1").await, Err(SyncError::Unauthenticated)));
        assert!(matches!(
            feed.comment("p1", "hello").await,
            Err(SyncError::Unauthenticated)
        ));
        assert_eq!(repo.calls(Op::FindLike).await, 0);
        assert_eq!(repo.calls(Op::InsertComment).await, 0);
    }

    #[tokio::test]
    async fn test_comment_trims_and_defaults_author() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1")).await;
        repo.add_account("guest@example.com", "pw").await;
        let (auth, culture, feed) = feed(&repo).await;
        auth.sign_in("guest@example.com", "pw").await.unwrap();
        feed.load().await.unwrap();

        assert!(matches!(
            feed.comment("p1", "   ").await,
            Err(SyncError::Validation(_))
        ));

        feed.comment("p1", "  Beautiful  ").await.unwrap();

        let comments = culture.comments("p1").await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "Beautiful");
        assert_eq!(comments[0].author_name, ANONYMOUS_AUTHOR);
        assert_eq!(culture.post("p1").await.unwrap().comments_count, 1);
    }

    #[tokio::test]
    async fn test_comment_uses_profile_name() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1")).await;
        let user = repo.add_account("abebe@example.com", "pw").await;
        repo.seed_profile(UserProfile {
            id: user.id.clone(),
            email: "abebe@example.com".into(),
            full_name: "Abebe Bikila".into(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await;
        let (auth, culture, feed) = feed(&repo).await;
        auth.sign_in("abebe@example.com", "pw").await.unwrap();

        feed.comment("p1", "Great read").await.unwrap();
        assert_eq!(
            culture.comments("p1").await.unwrap()[0].author_name,
            "Abebe Bikila"
        );
    }

    #[tokio::test]
    async fn test_load_fetches_likes_of_signed_in_user() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1")).await;
        repo.seed_post(post("p2")).await;
        let user = repo.add_account("guest@example.com", "pw").await;
        repo.seed_like("p2", &user.id).await;
        let (auth, culture, feed) = feed(&repo).await;

        feed.load().await.unwrap();
        assert!(culture.user_likes().await.is_empty());

        auth.sign_in("guest@example.com", "pw").await.unwrap();
        feed.load().await.unwrap();
        assert!(culture.is_liked("p2").await);
        assert!(!culture.is_liked("p1").await);

        assert!(!feed.like("p2").await.unwrap());
        assert_eq!(culture.post("p2").await.unwrap().likes_count, 1);
        assert!(!repo.like_exists("p2", &user.id).await);
    }

    #[tokio::test]
    async fn test_load_fetches_likes_when_posts_fail() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1")).await;
        let user = repo.add_account("guest@example.com", "pw").await;
        repo.seed_like("p1", &user.id).await;
        let (auth, culture, feed) = feed(&repo).await;
        auth.sign_in("guest@example.com", "pw").await.unwrap();
        repo.fail(Op::ListPosts).await;

        assert!(feed.load().await.is_err());
        assert!(culture.is_liked("p1").await);
        assert_eq!(repo.calls(Op::ListUserLikes).await, 1);
    }

    #[tokio::test]
    async fn test_load_after_sign_out_clears_likes() {
        let repo = Arc::new(MemoryRepository::new());
        repo.seed_post(post("p1")).await;
        let user = repo.add_account("guest@example.com", "pw").await;
        repo.seed_like("p1", &user.id).await;
        let (auth, culture, feed) = feed(&repo).await;
        auth.sign_in("guest@example.com", "pw").await.unwrap();
        feed.load().await.unwrap();
        assert!(culture.is_liked("p1").await);

        auth.sign_out().await.unwrap();
        feed.load().await.unwrap();
        assert!(culture.user_likes().await.is_empty());
    }
}
