use crate::domain::models::{ImageUpload, Job, JobPatch, NewJob};
use crate::error::SyncResult;
use crate::metrics;
use crate::repository::{JobRepository, MediaRepository};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Storage bucket for company logos
pub const LOGO_BUCKET: &str = "logos";

#[derive(Debug, Clone, Default)]
pub struct JobState {
    pub jobs: Vec<Job>,
    pub loading: bool,
}

/// Local replica of the job board
pub struct JobStore {
    repo: Arc<dyn JobRepository>,
    media: Arc<dyn MediaRepository>,
    state: RwLock<JobState>,
}

impl JobStore {
    pub fn new(repo: Arc<dyn JobRepository>, media: Arc<dyn MediaRepository>) -> Self {
        Self {
            repo,
            media,
            state: RwLock::new(JobState::default()),
        }
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.state.read().await.jobs.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn fetch_jobs(&self) -> SyncResult<()> {
        self.state.write().await.loading = true;

        let result = self.repo.list_jobs().await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(jobs) => {
                state.jobs = jobs;
                Ok(())
            }
            Err(e) => {
                metrics::record_remote_failure("fetch_jobs");
                error!(error = %e, "Failed to fetch jobs");
                Err(e)
            }
        }
    }

    pub async fn create_job(&self, job: &NewJob) -> SyncResult<Job> {
        let created = self.repo.insert_job(job).await.map_err(|e| {
            metrics::record_remote_failure("create_job");
            error!(error = %e, "Error creating job");
            e
        })?;

        info!(job_id = %created.id, "Created job");
        self.state.write().await.jobs.insert(0, created.clone());
        Ok(created)
    }

    pub async fn update_job(&self, job_id: &str, patch: &JobPatch) -> SyncResult<Job> {
        let updated = self.repo.update_job(job_id, patch).await.map_err(|e| {
            metrics::record_remote_failure("update_job");
            error!(job_id = %job_id, error = %e, "Error updating job");
            e
        })?;

        let mut state = self.state.write().await;
        if let Some(slot) = state.jobs.iter_mut().find(|j| j.id == job_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete_job(&self, job_id: &str) -> SyncResult<()> {
        self.repo.delete_job(job_id).await.map_err(|e| {
            metrics::record_remote_failure("delete_job");
            error!(job_id = %job_id, error = %e, "Error deleting job");
            e
        })?;

        self.state.write().await.jobs.retain(|j| j.id != job_id);
        info!(job_id = %job_id, "Deleted job");
        Ok(())
    }

    /// Upload a company logo as `{unix_millis}-{file_name}`; returns its public URL
    pub async fn upload_logo(&self, logo: &ImageUpload) -> SyncResult<String> {
        let object_name = format!("{}-{}", Utc::now().timestamp_millis(), logo.file_name);
        self.media
            .upload_image(LOGO_BUCKET, &object_name, logo)
            .await
            .map_err(|e| {
                metrics::record_remote_failure("upload_logo");
                error!(object = %object_name, error = %e, "Logo upload error");
                e
            })
    }

    // ========== Listing ==========

    pub async fn active_jobs(&self) -> Vec<Job> {
        let state = self.state.read().await;
        state.jobs.iter().filter(|j| j.is_active).cloned().collect()
    }

    /// Active jobs whose title or company contains `term` (case-insensitive),
    /// restricted to `category` unless it is `"all"`
    pub async fn search(&self, term: &str, category: &str) -> Vec<Job> {
        let needle = term.trim().to_lowercase();
        self.active_jobs()
            .await
            .into_iter()
            .filter(|job| {
                needle.is_empty()
                    || job.title.to_lowercase().contains(&needle)
                    || job.company.to_lowercase().contains(&needle)
            })
            .filter(|job| category == "all" || job.category == category)
            .collect()
    }

    /// Number of active jobs per category
    pub async fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for job in self.active_jobs().await {
            *counts.entry(job.category).or_insert(0) += 1;
        }
        counts
    }
}
