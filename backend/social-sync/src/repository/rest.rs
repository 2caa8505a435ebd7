use super::traits::{AuthRepository, CultureRepository, JobRepository, MediaRepository};
use crate::domain::models::{
    CulturalPost, CulturalPostPatch, ImageUpload, Job, JobPatch, NewCulturalPost, NewJob,
    NewPostComment, NewPostLike, NewUserProfile, PostComment, PostLike, UserProfile,
};
use crate::error::{SyncError, SyncResult};
use serde::Deserialize;
use serde_json::json;
use supabase_rest::{AuthUser, SupabaseClient};

const POSTS: &str = "cultural_posts";
const LIKES: &str = "post_likes";
const COMMENTS: &str = "post_comments";
const JOBS: &str = "jobs";
const USERS: &str = "users";

/// Repository backed by the hosted backend's REST surface
#[derive(Clone)]
pub struct RestRepository {
    client: SupabaseClient,
}

impl RestRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }
}

/// Unique-constraint rejections become `Conflict`; everything else stays `Remote`
fn map_write_error(err: supabase_rest::ClientError, what: &str) -> SyncError {
    if err.is_conflict() {
        SyncError::Conflict(what.to_string())
    } else {
        SyncError::Remote(err)
    }
}

fn first_row<T>(rows: Vec<T>, what: &str) -> SyncResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound(what.to_string()))
}

#[derive(Deserialize)]
struct LikedPostRow {
    post_id: String,
}

#[async_trait::async_trait]
impl CultureRepository for RestRepository {
    async fn list_published_posts(&self) -> SyncResult<Vec<CulturalPost>> {
        Ok(self
            .client
            .from(POSTS)
            .eq("is_published", true)
            .order("created_at", false)
            .fetch_all()
            .await?)
    }

    async fn insert_post(&self, post: &NewCulturalPost) -> SyncResult<CulturalPost> {
        let rows = self.client.from(POSTS).insert(&[post]).await?;
        first_row(rows, "inserted post")
    }

    async fn update_post(
        &self,
        post_id: &str,
        patch: &CulturalPostPatch,
    ) -> SyncResult<CulturalPost> {
        let rows = self.client.from(POSTS).eq("id", post_id).update(patch).await?;
        first_row(rows, &format!("post {}", post_id))
    }

    async fn delete_post(&self, post_id: &str) -> SyncResult<()> {
        Ok(self.client.from(POSTS).eq("id", post_id).delete().await?)
    }

    async fn find_like(&self, post_id: &str, user_id: &str) -> SyncResult<Option<PostLike>> {
        Ok(self
            .client
            .from(LIKES)
            .eq("post_id", post_id)
            .eq("user_id", user_id)
            .fetch_optional()
            .await?)
    }

    async fn insert_like(&self, post_id: &str, user_id: &str) -> SyncResult<()> {
        let like = NewPostLike {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
        };
        self.client
            .from(LIKES)
            .insert_minimal(&[like])
            .await
            .map_err(|e| map_write_error(e, &format!("like ({}, {})", post_id, user_id)))
    }

    async fn delete_like(&self, post_id: &str, user_id: &str) -> SyncResult<()> {
        Ok(self
            .client
            .from(LIKES)
            .eq("post_id", post_id)
            .eq("user_id", user_id)
            .delete()
            .await?)
    }

    async fn increment_likes(&self, post_id: &str) -> SyncResult<()> {
        Ok(self
            .client
            .rpc("increment_likes", &json!({ "post_id": post_id }))
            .await?)
    }

    async fn decrement_likes(&self, post_id: &str) -> SyncResult<()> {
        Ok(self
            .client
            .rpc("decrement_likes", &json!({ "post_id": post_id }))
            .await?)
    }

    async fn insert_comment(&self, comment: &NewPostComment) -> SyncResult<()> {
        Ok(self.client.from(COMMENTS).insert_minimal(&[comment]).await?)
    }

    async fn list_comments(&self, post_id: &str) -> SyncResult<Vec<PostComment>> {
        Ok(self
            .client
            .from(COMMENTS)
            .eq("post_id", post_id)
            .order("created_at", false)
            .fetch_all()
            .await?)
    }

    async fn list_user_like_post_ids(&self, user_id: &str) -> SyncResult<Vec<String>> {
        let rows: Vec<LikedPostRow> = self
            .client
            .from(LIKES)
            .select("post_id")
            .eq("user_id", user_id)
            .fetch_all()
            .await?;
        Ok(rows.into_iter().map(|row| row.post_id).collect())
    }
}

#[async_trait::async_trait]
impl JobRepository for RestRepository {
    async fn list_jobs(&self) -> SyncResult<Vec<Job>> {
        Ok(self
            .client
            .from(JOBS)
            .order("posted_at", false)
            .fetch_all()
            .await?)
    }

    async fn insert_job(&self, job: &NewJob) -> SyncResult<Job> {
        let rows = self.client.from(JOBS).insert(job).await?;
        first_row(rows, "inserted job")
    }

    async fn update_job(&self, job_id: &str, patch: &JobPatch) -> SyncResult<Job> {
        let rows = self.client.from(JOBS).eq("id", job_id).update(patch).await?;
        first_row(rows, &format!("job {}", job_id))
    }

    async fn delete_job(&self, job_id: &str) -> SyncResult<()> {
        Ok(self.client.from(JOBS).eq("id", job_id).delete().await?)
    }
}

#[async_trait::async_trait]
impl MediaRepository for RestRepository {
    async fn upload_image(
        &self,
        bucket: &str,
        object_name: &str,
        image: &ImageUpload,
    ) -> SyncResult<String> {
        let content_type = image.content_type();
        Ok(self
            .client
            .upload(
                bucket,
                object_name,
                image.bytes.clone(),
                content_type.essence_str(),
            )
            .await?)
    }
}

#[async_trait::async_trait]
impl AuthRepository for RestRepository {
    async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthUser> {
        let session = self.client.sign_in_with_password(email, password).await?;
        Ok(session.user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> SyncResult<AuthUser> {
        Ok(self.client.sign_up(email, password).await?)
    }

    async fn sign_out(&self) -> SyncResult<()> {
        Ok(self.client.sign_out().await?)
    }

    async fn current_user(&self) -> SyncResult<Option<AuthUser>> {
        Ok(self.client.current_user().await?)
    }

    async fn fetch_profile(&self, user_id: &str) -> SyncResult<Option<UserProfile>> {
        Ok(self
            .client
            .from(USERS)
            .eq("id", user_id)
            .fetch_optional()
            .await?)
    }

    async fn insert_profile(&self, profile: &NewUserProfile) -> SyncResult<()> {
        self.client
            .from(USERS)
            .insert_minimal(&[profile])
            .await
            .map_err(|e| map_write_error(e, &format!("profile {}", profile.id)))
    }
}
