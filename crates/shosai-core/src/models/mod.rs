mod playback;
mod settings;

pub use playback::{
    sanitize_time, ChapterFile, CurrentChapter, PlaybackState, PlayerPhase, ProgressValues,
    TimeUpdate,
};
pub use settings::{PlayerSettings, Resolution};
pub use shosai_api::traits::{Chapter, MediaProfile, ResumePoint, SourceFileRef};
