use serde::{Deserialize, Serialize};

/// Preferred source quality. Text sources ignore it; audio and video
/// sources pick the matching rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Ld,
    #[default]
    Sd,
    Hd,
    Fhd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ld => "LD",
            Self::Sd => "SD",
            Self::Hd => "HD",
            Self::Fhd => "FHD",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-reader playback preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    pub volume: f32,
    pub rate: f32,
    pub resolution: Resolution,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: 0.5,
            rate: 1.0,
            resolution: Resolution::Sd,
        }
    }
}
