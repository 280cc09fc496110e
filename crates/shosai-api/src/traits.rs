//! Trait definitions for the reading service.
//!
//! The playback core only talks to the server through [`ReaderService`],
//! so tests and alternative transports can stand in for the HTTP client.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Errors a [`ReaderService`] can report.
pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    /// Whether the server said the requested resource does not exist.
    fn is_not_found(&self) -> bool;
}

/// The endpoints the playback core depends on.
pub trait ReaderService: Send + Sync {
    type Error: ServiceError;

    /// Fetch a novel's profile, the first page of chapters and the chapter
    /// the reader last stopped at.
    fn fetch_reading_profile(
        &self,
        novel_id: &str,
    ) -> impl Future<Output = Result<ReadingProfile, Self::Error>> + Send;

    /// Fetch the chapter page following `next_marker` (first page when `None`).
    fn fetch_chapters(
        &self,
        novel_id: &str,
        next_marker: Option<&str>,
    ) -> impl Future<Output = Result<ChapterPage, Self::Error>> + Send;

    /// Fetch the raw text of a single chapter file.
    fn fetch_chapter_file(
        &self,
        file_id: &str,
    ) -> impl Future<Output = Result<RawChapterFile, Self::Error>> + Send;

    /// Persist reading progress.
    fn update_play_history(
        &self,
        update: PlayHistoryUpdate,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Novel metadata shown above the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProfile {
    pub id: String,
    pub name: String,
    pub overview: String,
    pub poster_path: String,
}

/// A file attached to a chapter. A chapter may have several mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFileRef {
    pub id: String,
    pub name: String,
    /// Set locally once the file failed to load; never sent by the server.
    #[serde(default)]
    pub invalid: bool,
}

/// A chapter in the novel's table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub files: Vec<SourceFileRef>,
}

impl Chapter {
    /// A chapter without files cannot be read.
    pub fn is_missing(&self) -> bool {
        self.files.is_empty()
    }
}

/// Where the reader should pick up when a novel is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePoint {
    pub chapter: Chapter,
    pub current_time: f64,
}

/// Result of the profile fetch: metadata plus the first chapter window.
#[derive(Debug, Clone)]
pub struct ReadingProfile {
    pub profile: MediaProfile,
    pub chapters: Vec<Chapter>,
    pub resume: Option<ResumePoint>,
    pub next_marker: Option<String>,
}

/// One page of a cursor-paginated chapter list.
#[derive(Debug, Clone, Default)]
pub struct ChapterPage {
    pub chapters: Vec<Chapter>,
    pub next_marker: Option<String>,
}

/// Chapter file content as returned by the server, newline-joined.
#[derive(Debug, Clone)]
pub struct RawChapterFile {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// Body of a progress write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayHistoryUpdate {
    pub novel_id: String,
    pub novel_chapter_id: String,
    pub file_id: String,
    pub progress: f64,
    pub duration: f64,
}
