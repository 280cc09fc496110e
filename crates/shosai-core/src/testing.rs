//! In-memory `ReaderService` for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use shosai_api::traits::{
    Chapter, ChapterPage, MediaProfile, PlayHistoryUpdate, RawChapterFile, ReaderService,
    ReadingProfile, ResumePoint, ServiceError, SourceFileRef,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum MockError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Failed(String),
}

impl ServiceError for MockError {
    fn is_not_found(&self) -> bool {
        matches!(self, MockError::NotFound)
    }
}

pub fn chapter(id: &str, order: u32, file_ids: &[&str]) -> Chapter {
    Chapter {
        id: id.into(),
        name: format!("Chapter {order}"),
        order,
        files: file_ids
            .iter()
            .map(|f| SourceFileRef {
                id: (*f).into(),
                name: format!("{f}.txt"),
                invalid: false,
            })
            .collect(),
    }
}

pub fn reading_profile(
    novel_id: &str,
    chapters: Vec<Chapter>,
    resume: Option<(&str, f64)>,
    next_marker: Option<&str>,
) -> ReadingProfile {
    let resume = resume.and_then(|(id, t)| {
        chapters.iter().find(|c| c.id == id).map(|c| ResumePoint {
            chapter: c.clone(),
            current_time: t,
        })
    });
    ReadingProfile {
        profile: MediaProfile {
            id: novel_id.into(),
            name: format!("Novel {novel_id}"),
            overview: String::new(),
            poster_path: String::new(),
        },
        chapters,
        resume,
        next_marker: next_marker.map(str::to_owned),
    }
}

/// Scripted server. Chapter pages are served in order; files by id.
#[derive(Default)]
pub struct MockService {
    profiles: HashMap<String, ReadingProfile>,
    pages: Mutex<VecDeque<Result<ChapterPage, MockError>>>,
    files: HashMap<String, Result<String, MockError>>,
    file_delay: Duration,
    page_delay: Duration,
    pub chapter_fetches: AtomicUsize,
    pub file_fetches: AtomicUsize,
    pub markers_seen: Mutex<Vec<Option<String>>>,
    pub history: Mutex<Vec<PlayHistoryUpdate>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: ReadingProfile) -> Self {
        self.profiles.insert(profile.profile.id.clone(), profile);
        self
    }

    pub fn with_page(self, chapters: Vec<Chapter>, next_marker: Option<&str>) -> Self {
        self.pages.lock().unwrap().push_back(Ok(ChapterPage {
            chapters,
            next_marker: next_marker.map(str::to_owned),
        }));
        self
    }

    pub fn with_page_error(self, message: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(MockError::Failed(message.into())));
        self
    }

    pub fn with_file(mut self, id: &str, content: &str) -> Self {
        self.files.insert(id.into(), Ok(content.into()));
        self
    }

    pub fn with_failing_file(mut self, id: &str, message: &str) -> Self {
        self.files
            .insert(id.into(), Err(MockError::Failed(message.into())));
        self
    }

    /// Make every file fetch take this long (tokio time).
    pub fn with_file_delay(mut self, delay: Duration) -> Self {
        self.file_delay = delay;
        self
    }

    /// Make every chapter page fetch take this long (tokio time).
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn history(&self) -> Vec<PlayHistoryUpdate> {
        self.history.lock().unwrap().clone()
    }
}

impl ReaderService for MockService {
    type Error = MockError;

    async fn fetch_reading_profile(&self, novel_id: &str) -> Result<ReadingProfile, MockError> {
        self.profiles
            .get(novel_id)
            .cloned()
            .ok_or(MockError::NotFound)
    }

    async fn fetch_chapters(
        &self,
        _novel_id: &str,
        next_marker: Option<&str>,
    ) -> Result<ChapterPage, MockError> {
        self.chapter_fetches.fetch_add(1, Ordering::SeqCst);
        self.markers_seen
            .lock()
            .unwrap()
            .push(next_marker.map(str::to_owned));
        if !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }
        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ChapterPage::default()))
    }

    async fn fetch_chapter_file(&self, file_id: &str) -> Result<RawChapterFile, MockError> {
        self.file_fetches.fetch_add(1, Ordering::SeqCst);
        if !self.file_delay.is_zero() {
            tokio::time::sleep(self.file_delay).await;
        }
        match self.files.get(file_id) {
            Some(Ok(content)) => Ok(RawChapterFile {
                id: file_id.into(),
                name: format!("{file_id}.txt"),
                content: content.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(MockError::NotFound),
        }
    }

    async fn update_play_history(&self, update: PlayHistoryUpdate) -> Result<(), MockError> {
        self.history.lock().unwrap().push(update);
        Ok(())
    }
}
