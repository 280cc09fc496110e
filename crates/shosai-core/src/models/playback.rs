use shosai_api::traits::{Chapter, MediaProfile};

/// Loaded content of a chapter file, one entry per line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterFile {
    pub id: String,
    pub name: String,
    pub content: Vec<String>,
}

impl ChapterFile {
    /// Split raw server text on `'\n'`; joining the lines back with `"\n"`
    /// yields the original text.
    pub fn from_raw(id: String, name: String, raw: &str) -> Self {
        Self {
            id,
            name,
            content: raw.split('\n').map(str::to_owned).collect(),
        }
    }

    pub fn text(&self) -> String {
        self.content.join("\n")
    }
}

/// The chapter being read, with the file actually loaded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentChapter {
    pub chapter: Chapter,
    /// Position the chapter was opened at.
    pub progress: f64,
    pub cur_file: ChapterFile,
}

impl CurrentChapter {
    pub fn id(&self) -> &str {
        &self.chapter.id
    }
}

/// Immutable snapshot handed to subscribers and callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub profile: Option<MediaProfile>,
    pub cur_chapter: Option<CurrentChapter>,
    pub chapters: Vec<Chapter>,
}

/// Lifecycle of a controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Uninitialized,
    ProfileLoading,
    Ready,
    Destroyed,
}

/// A partial progress report; missing fields fall back to the controller's
/// current time and a zero duration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressValues {
    pub current_time: Option<f64>,
    pub duration: Option<f64>,
}

/// A time update from the reader view (scroll position or media clock).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUpdate {
    pub current_time: f64,
    pub duration: f64,
}

/// Clamp a reported position to a non-negative finite number.
pub fn sanitize_time(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
