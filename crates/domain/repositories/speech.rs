use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait Transcriber {
    async fn transcribe(&self, audio: Vec<u8>, file_name: String) -> Result<String>;
}

#[automock]
#[async_trait]
pub trait SpeechSynthesizer {
    /// Returns encoded audio (mp3).
    async fn synthesize(&self, text: String, voice_id: String) -> Result<Vec<u8>>;
}
