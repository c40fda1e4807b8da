use crates::domain::{
    errors::{VisioError, VisioResult},
    repositories::{
        language_models::ReplyGenerator,
        speech::{SpeechSynthesizer, Transcriber},
        storage::MediaStorage,
    },
};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_SYSTEM_PROMPT: &str = "You are an AI avatar in a live video call with the user.

Rules:
- Keep answers SHORT and NATURAL (2 to 4 sentences at most)
- Speak the way people talk on a video call, warm and expressive
- Answer in the language the user speaks
- No bullet points or markdown formatting
- No emojis, your face already carries the emotion";

/// Builds the system prompt, appending the avatar's own personality when it has one.
pub fn system_prompt(personality_prompt: Option<&str>) -> String {
    match personality_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(personality) => format!("{BASE_SYSTEM_PROMPT}\n\n# AVATAR PERSONALITY\n{personality}"),
        None => BASE_SYSTEM_PROMPT.to_string(),
    }
}

/// Speech-to-text, reply generation, text-to-speech and media hosting, shared by the
/// conversational turn and the clip flow.
#[derive(Clone)]
pub struct SpeechPipeline {
    transcriber: Arc<dyn Transcriber + Send + Sync>,
    replies: Arc<dyn ReplyGenerator + Send + Sync>,
    synthesizer: Arc<dyn SpeechSynthesizer + Send + Sync>,
    storage: Arc<dyn MediaStorage + Send + Sync>,
    default_voice_id: String,
}

impl SpeechPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber + Send + Sync>,
        replies: Arc<dyn ReplyGenerator + Send + Sync>,
        synthesizer: Arc<dyn SpeechSynthesizer + Send + Sync>,
        storage: Arc<dyn MediaStorage + Send + Sync>,
        default_voice_id: String,
    ) -> Self {
        Self {
            transcriber,
            replies,
            synthesizer,
            storage,
            default_voice_id,
        }
    }

    /// Fails with `InvalidInput` when nothing intelligible was said.
    pub async fn transcribe(&self, audio: Vec<u8>, file_name: String) -> VisioResult<String> {
        if audio.is_empty() {
            return Err(VisioError::InvalidInput("audio is empty".to_string()));
        }

        let text = self.transcriber.transcribe(audio, file_name).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(VisioError::InvalidInput("no speech detected".to_string()));
        }

        debug!(chars = text.len(), "speech_pipeline: transcribed");
        Ok(text.to_string())
    }

    pub async fn reply(
        &self,
        personality_prompt: Option<&str>,
        user_text: &str,
    ) -> VisioResult<String> {
        let reply = self
            .replies
            .complete(system_prompt(personality_prompt), user_text.to_string())
            .await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(VisioError::Generate(
                "language model returned an empty reply".to_string(),
            ));
        }

        Ok(reply.to_string())
    }

    /// Synthesizes `text` and hosts it under `object_name`; returns the public audio URL.
    pub async fn speak(
        &self,
        text: &str,
        voice_id: Option<&str>,
        object_name: String,
    ) -> VisioResult<String> {
        let voice_id = voice_id
            .filter(|voice| !voice.trim().is_empty())
            .unwrap_or(&self.default_voice_id);

        let audio = self
            .synthesizer
            .synthesize(text.to_string(), voice_id.to_string())
            .await?;
        let bytes = audio.len();
        let audio_url = self.storage.store(audio, object_name).await?;

        info!(%voice_id, bytes, %audio_url, "speech_pipeline: audio stored");
        Ok(audio_url)
    }
}
