use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{error, info};

use crate::domain::repositories::storage::MediaStorage;

#[derive(Debug, Clone)]
pub struct SupabaseStorageConfig {
    pub project_url: String,
    pub service_key: String,
    pub bucket: String,
    pub prefix: String,
}

/// Uploads generated media to a public Supabase Storage bucket.
pub struct SupabaseStorageClient {
    http: reqwest::Client,
    project_url: String,
    service_key: String,
    bucket: String,
    prefix: String,
}

impl SupabaseStorageClient {
    pub fn new(config: SupabaseStorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            project_url: config.project_url.trim_end_matches('/').to_string(),
            service_key: config.service_key,
            bucket: config.bucket,
            prefix: normalize_prefix(&config.prefix),
        }
    }

    fn object_key(&self, object_name: &str) -> String {
        format!("{}{}", self.prefix, object_name.trim_start_matches('/'))
    }

    pub fn public_url(&self, object_key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.project_url, self.bucket, object_key
        )
    }
}

#[async_trait]
impl MediaStorage for SupabaseStorageClient {
    async fn store(&self, bytes: Vec<u8>, object_name: String) -> Result<String> {
        let object_key = self.object_key(&object_name);
        let content_type = mime_guess::from_path(&object_key).first_or_octet_stream();
        let size = bytes.len();

        let resp = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.project_url, self.bucket, object_key
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.service_key))
            .header(CONTENT_TYPE, content_type.essence_str())
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .context("supabase storage upload request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map(|b| b.trim().chars().take(512).collect::<String>())
                .unwrap_or_default();
            error!(
                status = %status,
                bucket = %self.bucket,
                key = %object_key,
                response_body = %body,
                "supabase_storage: upload failed"
            );
            anyhow::bail!(
                "failed to upload media to Supabase Storage (status {}) [bucket={}, key={}]",
                status,
                self.bucket,
                object_key
            );
        }

        info!(bucket = %self.bucket, key = %object_key, size, "supabase_storage: media uploaded");
        Ok(self.public_url(&object_key))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server_uri: String) -> SupabaseStorageClient {
        SupabaseStorageClient::new(SupabaseStorageConfig {
            project_url: format!("{}/", server_uri),
            service_key: "service".into(),
            bucket: "media".into(),
            prefix: "/avatar-visio/".into(),
        })
    }

    #[test]
    fn normalize_prefix_trims_slashes() {
        assert_eq!(normalize_prefix("/avatar-visio/"), "avatar-visio/");
        assert_eq!(normalize_prefix(""), "");
    }

    #[tokio::test]
    async fn store_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/avatar-visio/audio/a.mp3"))
            .and(header("content-type", "audio/mpeg"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        let url = client
            .store(vec![0u8; 4], "audio/a.mp3".into())
            .await
            .unwrap();

        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/media/avatar-visio/audio/a.mp3",
                server.uri()
            )
        );
    }

    #[tokio::test]
    async fn store_fails_on_rejected_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        assert!(client.store(vec![1], "x.mp4".into()).await.is_err());
    }
}
