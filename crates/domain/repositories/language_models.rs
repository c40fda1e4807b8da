use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait ReplyGenerator {
    async fn complete(&self, system_prompt: String, user_message: String) -> Result<String>;
}
