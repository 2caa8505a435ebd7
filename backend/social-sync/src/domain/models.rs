use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Counter columns may come back `null` on rows created before the counters existed
fn nullable_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Cultural post - an article in the culture section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalPost {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable_count")]
    pub likes_count: i64,
    #[serde(default, deserialize_with = "nullable_count")]
    pub comments_count: i64,
    #[serde(default)]
    pub read_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
}

/// Insert payload for a cultural post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewCulturalPost {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(length(min = 1, message = "Excerpt is required"))]
    pub excerpt: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    /// Filled in from the uploaded image when one is attached
    #[serde(default)]
    pub image_url: String,
    #[validate(length(min = 1, message = "Tags are required"))]
    pub tags: Vec<String>,
    #[validate(length(min = 1, message = "Read time is required"))]
    pub read_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// Post form as entered: tags are one comma-separated string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category: String,
    pub author: String,
    pub tags: String,
    pub read_time: String,
    pub is_published: bool,
}

impl From<PostForm> for NewCulturalPost {
    fn from(form: PostForm) -> Self {
        Self {
            title: form.title,
            content: form.content,
            excerpt: form.excerpt,
            category: form.category,
            author: form.author,
            image_url: String::new(),
            tags: split_list(&form.tags, ','),
            read_time: form.read_time,
            is_published: Some(form.is_published),
        }
    }
}

/// Partial update for a cultural post; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CulturalPostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl CulturalPostPatch {
    /// Apply the present fields to a local copy
    pub fn apply_to(&self, post: &mut CulturalPost) {
        if let Some(v) = &self.title {
            post.title = v.clone();
        }
        if let Some(v) = &self.content {
            post.content = v.clone();
        }
        if let Some(v) = &self.excerpt {
            post.excerpt = v.clone();
        }
        if let Some(v) = &self.category {
            post.category = v.clone();
        }
        if let Some(v) = &self.author {
            post.author = v.clone();
        }
        if let Some(v) = &self.image_url {
            post.image_url = v.clone();
        }
        if let Some(v) = &self.tags {
            post.tags = v.clone();
        }
        if let Some(v) = &self.read_time {
            post.read_time = v.clone();
        }
        if let Some(v) = self.is_published {
            post.is_published = v;
        }
    }
}

/// Like relation - at most one per (post, user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostLike {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPostLike {
    pub post_id: String,
    pub user_id: String,
}

/// Comment on a cultural post (append-only from the client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostComment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewPostComment {
    pub post_id: String,
    pub user_id: String,
    #[validate(length(min = 1, message = "Comment cannot be empty"))]
    pub content: String,
    pub author_name: String,
}

/// Job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewJob {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Company is required"))]
    pub company: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Job type is required"))]
    pub job_type: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Requirements are required"))]
    pub requirements: Vec<String>,
    pub deadline: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Job form as entered: one requirement per line
#[derive(Debug, Clone, PartialEq)]
pub struct JobForm {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub category: String,
    pub description: String,
    pub requirements: String,
    pub deadline: NaiveDate,
    pub is_active: bool,
}

impl From<JobForm> for NewJob {
    fn from(form: JobForm) -> Self {
        Self {
            title: form.title,
            company: form.company,
            location: form.location,
            job_type: form.job_type,
            category: form.category,
            description: form.description,
            requirements: split_list(&form.requirements, '\n'),
            deadline: form.deadline,
            logo_url: None,
            posted_at: None,
            is_active: Some(form.is_active),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl JobPatch {
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(v) = &self.title {
            job.title = v.clone();
        }
        if let Some(v) = &self.company {
            job.company = v.clone();
        }
        if let Some(v) = &self.location {
            job.location = v.clone();
        }
        if let Some(v) = &self.job_type {
            job.job_type = v.clone();
        }
        if let Some(v) = &self.category {
            job.category = v.clone();
        }
        if let Some(v) = &self.description {
            job.description = v.clone();
        }
        if let Some(v) = &self.requirements {
            job.requirements = v.clone();
        }
        if let Some(v) = self.deadline {
            job.deadline = v;
        }
        if let Some(v) = &self.logo_url {
            job.logo_url = Some(v.clone());
        }
        if let Some(v) = self.posted_at {
            job.posted_at = v;
        }
        if let Some(v) = self.is_active {
            job.is_active = v;
        }
    }
}

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Row in the `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Image attached to a post or job form
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Extension of the original file name, lowercased; `bin` when there is none
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "bin".to_string())
    }

    pub fn content_type(&self) -> mime::Mime {
        match self.extension().as_str() {
            "png" => mime::IMAGE_PNG,
            "jpg" | "jpeg" => mime::IMAGE_JPEG,
            "gif" => mime::IMAGE_GIF,
            "svg" => mime::IMAGE_SVG,
            "bmp" => mime::IMAGE_BMP,
            _ => mime::APPLICATION_OCTET_STREAM,
        }
    }
}

/// Split a free-text list field into trimmed, non-empty entries.
///
/// Tags come in comma-separated, job requirements one per line.
pub fn split_list(input: &str, separator: char) -> Vec<String> {
    input
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("heritage, music,, food ", ','), vec!["heritage", "music", "food"]);
        assert_eq!(
            split_list("Degree\n\n 3 years experience \n", '\n'),
            vec!["Degree", "3 years experience"]
        );
        assert!(split_list("  ", ',').is_empty());
    }

    #[test]
    fn test_forms_split_list_fields() {
        let post: NewCulturalPost = PostForm {
            title: "Genna".into(),
            tags: "festival, , christmas".into(),
            ..Default::default()
        }
        .into();
        assert_eq!(post.tags, vec!["festival", "christmas"]);
        assert_eq!(post.is_published, Some(false));

        let job: NewJob = JobForm {
            title: "Archivist".into(),
            company: "Library".into(),
            location: "Gondar".into(),
            job_type: "contract".into(),
            category: "government".into(),
            description: "Catalogue manuscripts".into(),
            requirements: "Ge'ez reading\n\nCataloguing experience\n".into(),
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            is_active: true,
        }
        .into();
        assert_eq!(job.requirements, vec!["Ge'ez reading", "Cataloguing experience"]);
        assert_eq!(job.is_active, Some(true));
    }

    #[test]
    fn test_blank_tags_fail_validation() {
        let post: NewCulturalPost = PostForm {
            title: "Genna".into(),
            content: "Body".into(),
            excerpt: "Excerpt".into(),
            category: "festivals".into(),
            author: "Editor".into(),
            tags: " , ".into(),
            read_time: "2 min".into(),
            is_published: true,
        }
        .into();
        let err = post.validate().unwrap_err();
        assert!(err.field_errors().contains_key("tags"));
    }

    #[test]
    fn test_image_upload_content_type() {
        assert_eq!(ImageUpload::new("Photo.JPG", vec![]).content_type(), mime::IMAGE_JPEG);
        assert_eq!(ImageUpload::new("logo.png", vec![]).extension(), "png");
        assert_eq!(ImageUpload::new("README", vec![]).extension(), "bin");
    }

    #[test]
    fn test_post_defaults_missing_counters() {
        let post: CulturalPost = serde_json::from_value(json!({
            "id": "p1",
            "title": "Coffee ceremony",
            "content": "...",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "likes_count": null
        }))
        .unwrap();

        assert_eq!(post.likes_count, 0);
        assert_eq!(post.comments_count, 0);
    }

    #[test]
    fn test_job_type_wire_name() {
        let patch = JobPatch {
            job_type: Some("full-time".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "type": "full-time" }));
    }

    #[test]
    fn test_new_comment_requires_content() {
        let comment = NewPostComment {
            post_id: "p1".into(),
            user_id: "u1".into(),
            content: String::new(),
            author_name: "Anonymous".into(),
        };
        assert!(comment.validate().is_err());
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
        let role: Role = serde_json::from_value(json!("user")).unwrap();
        assert_eq!(role, Role::User);
    }
}
