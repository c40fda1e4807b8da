use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::domain::repositories::speech::{SpeechSynthesizer, Transcriber};

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io";
const STT_MODEL: &str = "scribe_v1";
const TTS_MODEL: &str = "eleven_multilingual_v2";

/// ElevenLabs speech-to-text and text-to-speech over their REST API.
pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, ELEVENLABS_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|err| format!("<failed to read response body: {err}>"));

        error!(status = %status, response_body = %body, context = %context, "elevenlabs: request failed");
        anyhow::bail!("ElevenLabs request failed: {} (status {})", context, status);
    }
}

#[async_trait]
impl Transcriber for ElevenLabsClient {
    async fn transcribe(&self, audio: Vec<u8>, file_name: String) -> Result<String> {
        let mime = mime_guess::from_path(&file_name).first_or_octet_stream();
        let part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str(mime.essence_str())?;
        let form = Form::new()
            .part("file", part)
            .text("model_id", STT_MODEL);

        let resp = self
            .http
            .post(format!("{}/v1/speech-to-text", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .context("elevenlabs speech-to-text request")?;
        let resp = Self::ensure_success(resp, "speech-to-text").await?;

        let parsed: TranscriptionResponse = resp.json().await?;
        debug!(chars = parsed.text.len(), "elevenlabs: transcription received");

        Ok(parsed.text)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: String, voice_id: String) -> Result<Vec<u8>> {
        let body = json!({
            "text": text,
            "model_id": TTS_MODEL,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
            },
        });

        let resp = self
            .http
            .post(format!("{}/v1/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("elevenlabs text-to-speech request")?;
        let resp = Self::ensure_success(resp, "text-to-speech").await?;

        let audio = resp.bytes().await?.to_vec();
        debug!(%voice_id, bytes = audio.len(), "elevenlabs: speech synthesized");

        Ok(audio)
    }
}
