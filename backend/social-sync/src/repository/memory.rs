//! In-process repository
//!
//! Mirrors the hosted backend's guarantees that the stores rely on: one like per
//! (post, user), counters adjusted atomically, newest-first listings. Individual
//! operations can be made to fail or to stall for exercising error and in-flight paths.

use super::traits::{AuthRepository, CultureRepository, JobRepository, MediaRepository};
use crate::domain::models::{
    CulturalPost, CulturalPostPatch, ImageUpload, Job, JobPatch, NewCulturalPost, NewJob,
    NewPostComment, NewUserProfile, PostComment, PostLike, UserProfile,
};
use crate::error::{SyncError, SyncResult};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use supabase_rest::AuthUser;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Remote operation names, for failure injection and call accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListPosts,
    InsertPost,
    UpdatePost,
    DeletePost,
    FindLike,
    InsertLike,
    DeleteLike,
    IncrementLikes,
    DecrementLikes,
    InsertComment,
    ListComments,
    ListUserLikes,
    ListJobs,
    InsertJob,
    UpdateJob,
    DeleteJob,
    Upload,
    SignIn,
    SignUp,
    SignOut,
    CurrentUser,
    FetchProfile,
    InsertProfile,
}

#[derive(Default)]
struct State {
    posts: Vec<CulturalPost>,
    likes: Vec<PostLike>,
    comments: Vec<PostComment>,
    jobs: Vec<Job>,
    profiles: HashMap<String, UserProfile>,
    accounts: HashMap<String, (String, AuthUser)>,
    session: Option<AuthUser>,
    objects: HashMap<String, Vec<u8>>,
    failing: HashSet<Op>,
    calls: HashMap<Op, usize>,
    latency: Option<Duration>,
}

/// Shared in-memory backend; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail with a remote error until [`MemoryRepository::heal`] is called
    pub async fn fail(&self, op: Op) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn heal(&self, op: Op) {
        self.state.lock().await.failing.remove(&op);
    }

    /// Delay every like/comment write by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().await.latency = latency;
    }

    /// Number of times `op` has been attempted
    pub async fn calls(&self, op: Op) -> usize {
        self.state.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    pub async fn seed_post(&self, post: CulturalPost) {
        self.state.lock().await.posts.push(post);
    }

    pub async fn seed_job(&self, job: Job) {
        self.state.lock().await.jobs.push(job);
    }

    pub async fn seed_like(&self, post_id: &str, user_id: &str) {
        let mut state = self.state.lock().await;
        state.likes.push(PostLike {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        });
    }

    /// Register an account that can sign in
    pub async fn add_account(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        self.state
            .lock()
            .await
            .accounts
            .insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    pub async fn seed_profile(&self, profile: UserProfile) {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.id.clone(), profile);
    }

    /// Remote view of a post
    pub async fn post(&self, post_id: &str) -> Option<CulturalPost> {
        let state = self.state.lock().await;
        state.posts.iter().find(|p| p.id == post_id).cloned()
    }

    pub async fn like_exists(&self, post_id: &str, user_id: &str) -> bool {
        let state = self.state.lock().await;
        state
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
    }

    pub async fn comment_rows(&self, post_id: &str) -> usize {
        let state = self.state.lock().await;
        state.comments.iter().filter(|c| c.post_id == post_id).count()
    }

    pub async fn object(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state.objects.get(&format!("{}/{}", bucket, name)).cloned()
    }

    /// Record the call, apply latency, and fail if `op` is marked failing
    async fn enter(&self, op: Op) -> SyncResult<()> {
        let latency = {
            let mut state = self.state.lock().await;
            *state.calls.entry(op).or_insert(0) += 1;
            if state.failing.contains(&op) {
                return Err(SyncError::Internal(format!("injected failure in {:?}", op)));
            }
            match op {
                Op::InsertLike
                | Op::DeleteLike
                | Op::IncrementLikes
                | Op::DecrementLikes
                | Op::InsertComment => state.latency,
                _ => None,
            }
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

/// Newest first; ties keep the most recently inserted row first
fn newest_first<T: Clone, F>(rows: &[T], created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    let mut sorted: Vec<T> = rows.iter().rev().cloned().collect();
    sorted.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    sorted
}

#[async_trait::async_trait]
impl CultureRepository for MemoryRepository {
    async fn list_published_posts(&self) -> SyncResult<Vec<CulturalPost>> {
        self.enter(Op::ListPosts).await?;
        let state = self.state.lock().await;
        let published: Vec<CulturalPost> = state
            .posts
            .iter()
            .filter(|p| p.is_published)
            .cloned()
            .collect();
        Ok(newest_first(&published, |p| p.created_at))
    }

    async fn insert_post(&self, post: &NewCulturalPost) -> SyncResult<CulturalPost> {
        self.enter(Op::InsertPost).await?;
        let now = Utc::now();
        let row = CulturalPost {
            id: Uuid::new_v4().to_string(),
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            category: post.category.clone(),
            author: post.author.clone(),
            image_url: post.image_url.clone(),
            tags: post.tags.clone(),
            likes_count: 0,
            comments_count: 0,
            read_time: post.read_time.clone(),
            created_at: now,
            updated_at: now,
            is_published: post.is_published.unwrap_or(true),
        };
        self.state.lock().await.posts.push(row.clone());
        Ok(row)
    }

    async fn update_post(
        &self,
        post_id: &str,
        patch: &CulturalPostPatch,
    ) -> SyncResult<CulturalPost> {
        self.enter(Op::UpdatePost).await?;
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| SyncError::NotFound(format!("post {}", post_id)))?;
        patch.apply_to(post);
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: &str) -> SyncResult<()> {
        self.enter(Op::DeletePost).await?;
        let mut state = self.state.lock().await;
        state.posts.retain(|p| p.id != post_id);
        // Likes and comments cascade with the post
        state.likes.retain(|l| l.post_id != post_id);
        state.comments.retain(|c| c.post_id != post_id);
        Ok(())
    }

    async fn find_like(&self, post_id: &str, user_id: &str) -> SyncResult<Option<PostLike>> {
        self.enter(Op::FindLike).await?;
        let state = self.state.lock().await;
        Ok(state
            .likes
            .iter()
            .find(|l| l.post_id == post_id && l.user_id == user_id)
            .cloned())
    }

    async fn insert_like(&self, post_id: &str, user_id: &str) -> SyncResult<()> {
        self.enter(Op::InsertLike).await?;
        let mut state = self.state.lock().await;
        if state
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
        {
            return Err(SyncError::Conflict(format!(
                "like ({}, {})",
                post_id, user_id
            )));
        }
        state.likes.push(PostLike {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_like(&self, post_id: &str, user_id: &str) -> SyncResult<()> {
        self.enter(Op::DeleteLike).await?;
        let mut state = self.state.lock().await;
        state
            .likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(())
    }

    async fn increment_likes(&self, post_id: &str) -> SyncResult<()> {
        self.enter(Op::IncrementLikes).await?;
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| SyncError::NotFound(format!("post {}", post_id)))?;
        post.likes_count += 1;
        Ok(())
    }

    async fn decrement_likes(&self, post_id: &str) -> SyncResult<()> {
        self.enter(Op::DecrementLikes).await?;
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| SyncError::NotFound(format!("post {}", post_id)))?;
        post.likes_count = (post.likes_count - 1).max(0);
        Ok(())
    }

    async fn insert_comment(&self, comment: &NewPostComment) -> SyncResult<()> {
        self.enter(Op::InsertComment).await?;
        let now = Utc::now();
        let mut state = self.state.lock().await;
        state.comments.push(PostComment {
            id: Uuid::new_v4().to_string(),
            post_id: comment.post_id.clone(),
            user_id: comment.user_id.clone(),
            content: comment.content.clone(),
            author_name: comment.author_name.clone(),
            created_at: now,
            updated_at: now,
        });
        // Counter maintained by trigger on the hosted side
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == comment.post_id) {
            post.comments_count += 1;
        }
        Ok(())
    }

    async fn list_comments(&self, post_id: &str) -> SyncResult<Vec<PostComment>> {
        self.enter(Op::ListComments).await?;
        let state = self.state.lock().await;
        let rows: Vec<PostComment> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |c| c.created_at))
    }

    async fn list_user_like_post_ids(&self, user_id: &str) -> SyncResult<Vec<String>> {
        self.enter(Op::ListUserLikes).await?;
        let state = self.state.lock().await;
        Ok(state
            .likes
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.post_id.clone())
            .collect())
    }
}

#[async_trait::async_trait]
impl JobRepository for MemoryRepository {
    async fn list_jobs(&self) -> SyncResult<Vec<Job>> {
        self.enter(Op::ListJobs).await?;
        let state = self.state.lock().await;
        Ok(newest_first(&state.jobs, |j| j.posted_at))
    }

    async fn insert_job(&self, job: &NewJob) -> SyncResult<Job> {
        self.enter(Op::InsertJob).await?;
        let now = Utc::now();
        let row = Job {
            id: Uuid::new_v4().to_string(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            job_type: job.job_type.clone(),
            category: job.category.clone(),
            description: job.description.clone(),
            requirements: job.requirements.clone(),
            deadline: job.deadline,
            logo_url: job.logo_url.clone(),
            posted_at: job.posted_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
            is_active: job.is_active.unwrap_or(true),
        };
        self.state.lock().await.jobs.push(row.clone());
        Ok(row)
    }

    async fn update_job(&self, job_id: &str, patch: &JobPatch) -> SyncResult<Job> {
        self.enter(Op::UpdateJob).await?;
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| SyncError::NotFound(format!("job {}", job_id)))?;
        patch.apply_to(job);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn delete_job(&self, job_id: &str) -> SyncResult<()> {
        self.enter(Op::DeleteJob).await?;
        self.state.lock().await.jobs.retain(|j| j.id != job_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaRepository for MemoryRepository {
    async fn upload_image(
        &self,
        bucket: &str,
        object_name: &str,
        image: &ImageUpload,
    ) -> SyncResult<String> {
        self.enter(Op::Upload).await?;
        let key = format!("{}/{}", bucket, object_name);
        let mut state = self.state.lock().await;
        if state.objects.contains_key(&key) {
            return Err(SyncError::Conflict(format!("object {}", key)));
        }
        state.objects.insert(key, image.bytes.clone());
        Ok(format!("memory://{}/{}", bucket, object_name))
    }
}

#[async_trait::async_trait]
impl AuthRepository for MemoryRepository {
    async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthUser> {
        self.enter(Op::SignIn).await?;
        let mut state = self.state.lock().await;
        let user = match state.accounts.get(email) {
            Some((stored, user)) if stored == password => user.clone(),
            _ => return Err(SyncError::Validation("Invalid login credentials".to_string())),
        };
        state.session = Some(user.clone());
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> SyncResult<AuthUser> {
        self.enter(Op::SignUp).await?;
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(email) {
            return Err(SyncError::Conflict(format!("account {}", email)));
        }
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> SyncResult<()> {
        self.enter(Op::SignOut).await?;
        self.state.lock().await.session = None;
        Ok(())
    }

    async fn current_user(&self) -> SyncResult<Option<AuthUser>> {
        self.enter(Op::CurrentUser).await?;
        Ok(self.state.lock().await.session.clone())
    }

    async fn fetch_profile(&self, user_id: &str) -> SyncResult<Option<UserProfile>> {
        self.enter(Op::FetchProfile).await?;
        Ok(self.state.lock().await.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, profile: &NewUserProfile) -> SyncResult<()> {
        self.enter(Op::InsertProfile).await?;
        let mut state = self.state.lock().await;
        if state.profiles.contains_key(&profile.id) {
            return Err(SyncError::Conflict(format!("profile {}", profile.id)));
        }
        let now = Utc::now();
        state.profiles.insert(
            profile.id.clone(),
            UserProfile {
                id: profile.id.clone(),
                email: profile.email.clone(),
                full_name: profile.full_name.clone(),
                role: profile.role,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }
}
