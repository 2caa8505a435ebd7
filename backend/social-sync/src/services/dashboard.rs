use crate::domain::models::{
    CulturalPost, CulturalPostPatch, ImageUpload, Job, JobPatch, NewCulturalPost, NewJob,
};
use crate::error::{SyncError, SyncResult};
use crate::services::auth::AuthStore;
use crate::services::culture::CultureStore;
use crate::services::jobs::JobStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Figures on the dashboard overview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub active_jobs: usize,
    pub published_posts: usize,
    pub total_likes: i64,
    pub total_comments: i64,
}

/// Admin-only management of posts and jobs.
///
/// Every write checks the admin role first and validates the form before any remote call.
pub struct Dashboard {
    auth: Arc<AuthStore>,
    culture: Arc<CultureStore>,
    jobs: Arc<JobStore>,
}

impl Dashboard {
    pub fn new(auth: Arc<AuthStore>, culture: Arc<CultureStore>, jobs: Arc<JobStore>) -> Self {
        Self {
            auth,
            culture,
            jobs,
        }
    }

    /// Totals over the local post and job replicas
    pub async fn overview(&self) -> SyncResult<DashboardStats> {
        self.auth.require_admin()?;

        let posts = self.culture.posts().await;
        let jobs = self.jobs.jobs().await;
        Ok(DashboardStats {
            active_jobs: jobs.iter().filter(|j| j.is_active).count(),
            published_posts: posts.iter().filter(|p| p.is_published).count(),
            total_likes: posts.iter().map(|p| p.likes_count).sum(),
            total_comments: posts.iter().map(|p| p.comments_count).sum(),
        })
    }

    // ========== Posts ==========

    /// New posts need a cover image. Accepts a [`PostForm`](crate::domain::models::PostForm) as entered or a ready payload.
    pub async fn create_post(
        &self,
        post: impl Into<NewCulturalPost>,
        image: Option<ImageUpload>,
    ) -> SyncResult<CulturalPost> {
        let admin = self.auth.require_admin()?;
        let post = post.into();
        post.validate()?;
        if image.is_none() {
            return Err(SyncError::Validation("Image is required".to_string()));
        }

        let created = self.culture.create_post(post, image).await?;
        info!(admin_id = %admin.id, post_id = %created.id, "Post created from dashboard");
        Ok(created)
    }

    /// Replacing the image is optional on edit
    pub async fn update_post(
        &self,
        post_id: &str,
        mut patch: CulturalPostPatch,
        image: Option<ImageUpload>,
    ) -> SyncResult<CulturalPost> {
        self.auth.require_admin()?;
        if let Some(image) = image {
            patch.image_url = Some(self.culture.upload_post_image(&image).await?);
        }
        self.culture.update_post(post_id, &patch).await
    }

    pub async fn delete_post(&self, post_id: &str) -> SyncResult<()> {
        self.auth.require_admin()?;
        self.culture.delete_post(post_id).await
    }

    // ========== Jobs ==========

    /// Uploads the logo when given and stamps `posted_at` with the submit time
    pub async fn create_job(
        &self,
        job: impl Into<NewJob>,
        logo: Option<ImageUpload>,
    ) -> SyncResult<Job> {
        let admin = self.auth.require_admin()?;
        let mut job = job.into();
        job.validate()?;

        if let Some(logo) = logo {
            job.logo_url = Some(self.jobs.upload_logo(&logo).await?);
        }
        job.posted_at = Some(Utc::now());
        if job.is_active.is_none() {
            job.is_active = Some(true);
        }

        let created = self.jobs.create_job(&job).await?;
        info!(admin_id = %admin.id, job_id = %created.id, "Job created from dashboard");
        Ok(created)
    }

    pub async fn update_job(
        &self,
        job_id: &str,
        mut patch: JobPatch,
        logo: Option<ImageUpload>,
    ) -> SyncResult<Job> {
        self.auth.require_admin()?;
        if let Some(logo) = logo {
            patch.logo_url = Some(self.jobs.upload_logo(&logo).await?);
        }
        patch.posted_at = Some(Utc::now());
        self.jobs.update_job(job_id, &patch).await
    }

    pub async fn delete_job(&self, job_id: &str) -> SyncResult<()> {
        self.auth.require_admin()?;
        self.jobs.delete_job(job_id).await
    }
}
