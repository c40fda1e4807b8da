use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VideoResolution {
    #[default]
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
}

impl Display for VideoResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl VideoResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoResolution::Sd480 => "480p",
            VideoResolution::Hd720 => "720p",
            VideoResolution::FullHd1080 => "1080p",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "480p" => Some(VideoResolution::Sd480),
            "720p" => Some(VideoResolution::Hd720),
            "1080p" => Some(VideoResolution::FullHd1080),
            _ => None,
        }
    }

    /// Credits charged for one rendered clip at this resolution.
    pub fn credit_cost(&self) -> i32 {
        match self {
            VideoResolution::Sd480 => 1,
            VideoResolution::Hd720 => 2,
            VideoResolution::FullHd1080 => 3,
        }
    }
}
