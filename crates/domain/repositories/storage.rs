use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait MediaStorage {
    /// Uploads `bytes` under `object_name` and returns a publicly readable URL.
    async fn store(&self, bytes: Vec<u8>, object_name: String) -> Result<String>;
}
