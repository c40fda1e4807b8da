use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::video_resolutions::VideoResolution;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateClipModel {
    pub text: String,
    #[serde(default)]
    pub resolution: VideoResolution,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipResult {
    pub video_url: String,
    pub audio_url: String,
    pub resolution: VideoResolution,
    pub credits_charged: i32,
    pub new_balance: i32,
}
