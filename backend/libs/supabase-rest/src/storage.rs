//! Object storage under `/storage/v1/object`

use crate::error::ClientResult;
use crate::{check_status, SupabaseClient};
use tracing::info;
use urlencoding::encode;

impl SupabaseClient {
    /// Upload bytes to `bucket/name`; returns the object's public URL
    pub async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ClientResult<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config().url,
            encode(bucket),
            encode(name)
        );
        let size = bytes.len();

        let response = self
            .authorized(self.http().post(&url))
            .await
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        check_status(response).await?;

        info!(bucket = %bucket, object = %name, size, "uploaded object");
        Ok(self.public_url(bucket, name))
    }

    /// Public URL of an object in a public bucket
    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config().url,
            encode(bucket),
            encode(name)
        )
    }
}
