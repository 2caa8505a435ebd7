use crate::domain::models::{
    CulturalPost, CulturalPostPatch, ImageUpload, Job, JobPatch, NewCulturalPost, NewJob,
    NewPostComment, NewUserProfile, PostComment, PostLike, UserProfile,
};
use crate::error::SyncResult;
use supabase_rest::AuthUser;

/// Remote operations behind the culture section.
///
/// Implemented by `RestRepository` (hosted backend) and `MemoryRepository` (in-process).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CultureRepository: Send + Sync {
    /// Published posts, newest first
    async fn list_published_posts(&self) -> SyncResult<Vec<CulturalPost>>;

    async fn insert_post(&self, post: &NewCulturalPost) -> SyncResult<CulturalPost>;

    async fn update_post(&self, post_id: &str, patch: &CulturalPostPatch)
        -> SyncResult<CulturalPost>;

    async fn delete_post(&self, post_id: &str) -> SyncResult<()>;

    /// Point lookup by (post, user); `None` when the user has not liked the post
    async fn find_like(&self, post_id: &str, user_id: &str) -> SyncResult<Option<PostLike>>;

    async fn insert_like(&self, post_id: &str, user_id: &str) -> SyncResult<()>;

    async fn delete_like(&self, post_id: &str, user_id: &str) -> SyncResult<()>;

    /// Server-side atomic `likes_count + 1`
    async fn increment_likes(&self, post_id: &str) -> SyncResult<()>;

    /// Server-side atomic `likes_count - 1`
    async fn decrement_likes(&self, post_id: &str) -> SyncResult<()>;

    async fn insert_comment(&self, comment: &NewPostComment) -> SyncResult<()>;

    /// Comments on one post, newest first
    async fn list_comments(&self, post_id: &str) -> SyncResult<Vec<PostComment>>;

    /// Ids of every post the user has liked
    async fn list_user_like_post_ids(&self, user_id: &str) -> SyncResult<Vec<String>>;
}

/// Remote operations behind the job board
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait JobRepository: Send + Sync {
    /// All jobs, newest `posted_at` first
    async fn list_jobs(&self) -> SyncResult<Vec<Job>>;

    async fn insert_job(&self, job: &NewJob) -> SyncResult<Job>;

    async fn update_job(&self, job_id: &str, patch: &JobPatch) -> SyncResult<Job>;

    async fn delete_job(&self, job_id: &str) -> SyncResult<()>;
}

/// Binary object storage for post images and company logos
#[async_trait::async_trait]
pub trait MediaRepository: Send + Sync {
    /// Store the object and return its public URL
    async fn upload_image(
        &self,
        bucket: &str,
        object_name: &str,
        image: &ImageUpload,
    ) -> SyncResult<String>;
}

/// Accounts and profiles
#[async_trait::async_trait]
pub trait AuthRepository: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthUser>;

    async fn sign_up(&self, email: &str, password: &str) -> SyncResult<AuthUser>;

    async fn sign_out(&self) -> SyncResult<()>;

    /// User behind the current session, if any
    async fn current_user(&self) -> SyncResult<Option<AuthUser>>;

    async fn fetch_profile(&self, user_id: &str) -> SyncResult<Option<UserProfile>>;

    async fn insert_profile(&self, profile: &NewUserProfile) -> SyncResult<()>;
}
