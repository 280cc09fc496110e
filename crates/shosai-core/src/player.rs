//! Reading/playback controller.
//!
//! Owns which novel is open, which chapter and file are current, and how far
//! the reader has got. Views read [`PlayerController::state`] snapshots and
//! subscribe to [`PlayerEvent`]s; every mutation is followed by a
//! `StateChanged` notification.
//!
//! Next/previous navigation is serialized by an in-flight guard. Direct
//! `play_chapter`/`switch_chapter`/`change_source_file` calls are not: when
//! two of them overlap the later response wins.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use shosai_api::format::round2;
use shosai_api::traits::{PlayHistoryUpdate, ReaderService};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::PlayerError;
use crate::models::{
    sanitize_time, Chapter, CurrentChapter, MediaProfile, PlaybackState, PlayerPhase,
    PlayerSettings, ProgressValues, Resolution, ResumePoint, TimeUpdate,
};
use crate::observer::{Subject, Subscription};
use crate::paged::{ChapterPages, PageSource, PagedList};
use crate::source::SourceLoader;
use crate::throttle::{Debounce, Throttle};

/// A message for the reader, one line per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: Vec<String>,
}

impl Notice {
    fn new<I, T>(lines: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            text: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text.join(": "))
    }
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    ProfileLoaded {
        profile: MediaProfile,
        resume: ResumePoint,
    },
    ChapterChanged(CurrentChapter),
    SourceFileChanged(CurrentChapter),
    BeforeNextChapter,
    BeforePrevChapter,
    StateChanged(PlaybackState),
    Tip(Notice),
}

struct Inner {
    phase: PlayerPhase,
    /// Bumped every time a profile is loaded. Work started under an older
    /// generation must not touch the new novel's state.
    generation: u64,
    profile: Option<MediaProfile>,
    chapters: PagedList<Chapter>,
    cur_chapter: Option<CurrentChapter>,
    current_time: f64,
    settings: PlayerSettings,
}

impl Inner {
    fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            profile: self.profile.clone(),
            cur_chapter: self.cur_chapter.clone(),
            chapters: self.chapters.items().to_vec(),
        }
    }

    fn index_of(&self, chapter_id: &str) -> Option<usize> {
        self.chapters.items().iter().position(|c| c.id == chapter_id)
    }

    /// Whether work started at `generation` may still apply its result.
    fn is_current(&self, generation: u64) -> bool {
        self.phase == PlayerPhase::Ready && self.generation == generation
    }
}

/// Resets a flag or counter when the guarded operation ends, however it ends.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct CountGuard<'a>(&'a AtomicUsize);

impl<'a> CountGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CountGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Next,
    Prev,
}

pub struct PlayerController<S> {
    service: Arc<S>,
    source: SourceLoader<S>,
    inner: Mutex<Inner>,
    events: Subject<PlayerEvent>,
    navigating: AtomicBool,
    loading_files: AtomicUsize,
    playing: Arc<AtomicBool>,
    progress_throttle: Throttle,
    pause_debounce: Debounce,
}

impl<S: ReaderService + 'static> PlayerController<S> {
    pub fn new(service: Arc<S>, config: &AppConfig) -> Self {
        Self {
            source: SourceLoader::new(Arc::clone(&service)),
            service,
            inner: Mutex::new(Inner {
                phase: PlayerPhase::Uninitialized,
                generation: 0,
                profile: None,
                chapters: PagedList::new(),
                cur_chapter: None,
                current_time: 0.0,
                settings: config.player.settings(),
            }),
            events: Subject::new(),
            navigating: AtomicBool::new(false),
            loading_files: AtomicUsize::new(0),
            playing: Arc::new(AtomicBool::new(false)),
            progress_throttle: Throttle::new(config.progress.throttle_window()),
            pause_debounce: Debounce::new(config.progress.pause_debounce()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tip<I, T>(&self, lines: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.events.notify(&PlayerEvent::Tip(Notice::new(lines)));
    }

    fn emit_state(&self, state: PlaybackState) {
        self.events.notify(&PlayerEvent::StateChanged(state));
    }

    // ── Observation ─────────────────────────────────────────────

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().snapshot()
    }

    pub fn phase(&self) -> PlayerPhase {
        self.lock().phase
    }

    pub fn is_navigating(&self) -> bool {
        self.navigating.load(Ordering::SeqCst)
    }

    pub fn is_loading_file(&self) -> bool {
        self.loading_files.load(Ordering::SeqCst) > 0
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn current_time(&self) -> f64 {
        self.lock().current_time
    }

    pub fn settings(&self) -> PlayerSettings {
        self.lock().settings
    }

    /// Title lines: `[chapter, novel]`, `[novel]` or nothing.
    pub fn title(&self) -> Vec<String> {
        let inner = self.lock();
        match (&inner.profile, &inner.cur_chapter) {
            (Some(profile), Some(cur)) => vec![cur.chapter.name.clone(), profile.name.clone()],
            (Some(profile), None) => vec![profile.name.clone()],
            _ => Vec::new(),
        }
    }

    // ── Profile ─────────────────────────────────────────────────

    /// Load a novel: profile, first chapter window and resume point.
    pub async fn fetch_profile(&self, media_id: &str) -> Result<ResumePoint, PlayerError> {
        if media_id.is_empty() {
            self.tip(["Missing novel id"]);
            return Err(PlayerError::MissingParameter("media_id"));
        }

        let previous = {
            let mut inner = self.lock();
            if inner.phase == PlayerPhase::Destroyed {
                return Err(PlayerError::NotReady);
            }
            std::mem::replace(&mut inner.phase, PlayerPhase::ProfileLoading)
        };

        let restore = |this: &Self| {
            let mut inner = this.lock();
            if inner.phase == PlayerPhase::ProfileLoading {
                inner.phase = previous;
            }
        };

        let fetched = match self.service.fetch_reading_profile(media_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                restore(self);
                let err = PlayerError::from_service(e, format!("novel {media_id}"));
                warn!(media_id, error = %err, "failed to fetch novel profile");
                self.tip(["Failed to load novel".to_string(), err.to_string()]);
                return Err(err);
            }
        };

        let resume = match fetched.resume {
            Some(resume) if !fetched.chapters.is_empty() => resume,
            _ => {
                restore(self);
                self.tip(["This novel has no chapters"]);
                return Err(PlayerError::NoChapters);
            }
        };

        let (profile, state) = {
            let mut inner = self.lock();
            if inner.phase == PlayerPhase::Destroyed {
                return Err(PlayerError::NotReady);
            }
            inner.profile = Some(fetched.profile.clone());
            inner.chapters = PagedList::seeded(fetched.chapters, fetched.next_marker);
            inner.cur_chapter = None;
            inner.current_time = 0.0;
            inner.phase = PlayerPhase::Ready;
            inner.generation += 1;
            (fetched.profile, inner.snapshot())
        };
        self.progress_throttle.reset();

        info!(
            media_id,
            name = %profile.name,
            chapters = state.chapters.len(),
            resume = %resume.chapter.id,
            "novel loaded"
        );
        self.events.notify(&PlayerEvent::ProfileLoaded {
            profile,
            resume: resume.clone(),
        });
        self.emit_state(state);
        Ok(resume)
    }

    /// `fetch_profile`, then open the resume chapter where the reader left off.
    pub async fn open(&self, media_id: &str) -> Result<CurrentChapter, PlayerError> {
        let resume = self.fetch_profile(media_id).await?;
        self.play_chapter(&resume.chapter, resume.current_time).await
    }

    // ── Chapter playback ────────────────────────────────────────

    /// Make `chapter` current, loading its first file.
    pub async fn play_chapter(
        &self,
        chapter: &Chapter,
        current_time: f64,
    ) -> Result<CurrentChapter, PlayerError> {
        let generation = {
            let inner = self.lock();
            if inner.phase != PlayerPhase::Ready {
                return Err(PlayerError::NotReady);
            }
            if let Some(cur) = &inner.cur_chapter {
                if cur.id() == chapter.id {
                    let cur = cur.clone();
                    drop(inner);
                    self.tip(["Already on this chapter"]);
                    return Ok(cur);
                }
            }
            if inner.index_of(&chapter.id).is_none() {
                drop(inner);
                self.tip(["Chapter is not part of this novel"]);
                return Err(PlayerError::NotFound(format!("chapter {}", chapter.id)));
            }
            inner.generation
        };

        let Some(file) = chapter.files.first() else {
            self.tip(["This chapter has no source file"]);
            return Err(PlayerError::NoSourceFile(chapter.name.clone()));
        };

        let loaded = {
            let _loading = CountGuard::enter(&self.loading_files);
            self.source.load(&file.id).await
        };
        let cur_file = match loaded {
            Ok(file) => file,
            Err(err) => {
                self.tip(["Failed to load chapter content".to_string(), err.to_string()]);
                return Err(err);
            }
        };

        let progress = sanitize_time(current_time);
        let (cur, state) = {
            let mut inner = self.lock();
            if !inner.is_current(generation) {
                debug!(chapter = %chapter.id, "novel changed while loading chapter, dropping it");
                return Err(PlayerError::NotReady);
            }
            let cur = CurrentChapter {
                chapter: chapter.clone(),
                progress,
                cur_file,
            };
            inner.cur_chapter = Some(cur.clone());
            inner.current_time = progress;
            (cur, inner.snapshot())
        };

        debug!(chapter = %cur.chapter.id, file = %cur.cur_file.id, progress, "chapter opened");
        self.events.notify(&PlayerEvent::ChapterChanged(cur.clone()));
        self.emit_state(state);
        Ok(cur)
    }

    /// Jump to a chapter from the start.
    pub async fn switch_chapter(&self, chapter: &Chapter) -> Result<CurrentChapter, PlayerError> {
        self.play_chapter(chapter, 0.0).await
    }

    /// The chapter after the current one. Uses the resident list when it can
    /// and only pages in more chapters from the server when it must.
    pub async fn get_next_chapter(&self) -> Result<Chapter, PlayerError> {
        let (generation, requested, novel_id, last_order) = {
            let inner = self.lock();
            let (Some(profile), Some(cur)) = (&inner.profile, &inner.cur_chapter) else {
                return Err(PlayerError::NotReady);
            };
            let Some(index) = inner.index_of(cur.id()) else {
                return Err(PlayerError::NotFound("current chapter".into()));
            };
            if let Some(next) = inner.chapters.items().get(index + 1) {
                return Ok(next.clone());
            }
            if inner.chapters.is_exhausted() {
                return Err(PlayerError::EndOfList);
            }
            (
                inner.generation,
                inner.chapters.cursor().clone(),
                profile.id.clone(),
                inner.chapters.items().last().map(|c| c.order),
            )
        };

        debug!(novel = %novel_id, cursor = ?requested, "paging in more chapters");
        let page = ChapterPages::new(self.service.as_ref(), &novel_id)
            .fetch_page(requested.marker())
            .await
            .map_err(|e| PlayerError::from_service(e, format!("chapters of {novel_id}")))?;

        if let (Some(last), Some(first)) = (last_order, page.items.first()) {
            if first.order < last {
                warn!(last, first = first.order, "server returned chapters out of order");
            }
        }

        let mut inner = self.lock();
        if !inner.is_current(generation) {
            debug!(novel = %novel_id, "novel changed while paging, dropping page");
            return Err(PlayerError::NotReady);
        }
        if let Some(appended) = inner.chapters.apply_page(&requested, page) {
            if appended.is_empty() {
                debug!(novel = %novel_id, "no more chapters");
                return Err(PlayerError::EndOfList);
            }
        }
        let cur_id = match &inner.cur_chapter {
            Some(cur) => cur.id().to_string(),
            None => return Err(PlayerError::NotReady),
        };
        inner
            .index_of(&cur_id)
            .and_then(|i| inner.chapters.items().get(i + 1))
            .cloned()
            .ok_or(PlayerError::EndOfList)
    }

    /// The chapter before the current one. Only resident chapters are
    /// considered: the list grows forward from the first page.
    pub fn get_prev_chapter(&self) -> Result<Chapter, PlayerError> {
        let inner = self.lock();
        let Some(cur) = &inner.cur_chapter else {
            return Err(PlayerError::NotReady);
        };
        match inner.index_of(cur.id()) {
            Some(0) => Err(PlayerError::StartOfList),
            Some(i) => Ok(inner.chapters.items()[i - 1].clone()),
            None => Err(PlayerError::NotFound("current chapter".into())),
        }
    }

    pub async fn play_next_chapter(&self) -> Result<CurrentChapter, PlayerError> {
        self.navigate(Direction::Next).await
    }

    pub async fn play_prev_chapter(&self) -> Result<CurrentChapter, PlayerError> {
        self.navigate(Direction::Prev).await
    }

    async fn navigate(&self, direction: Direction) -> Result<CurrentChapter, PlayerError> {
        if self.navigating.swap(true, Ordering::SeqCst) {
            self.tip(["Loading, please wait"]);
            return Err(PlayerError::Busy);
        }
        let _guard = FlagGuard(&self.navigating);

        let target = match direction {
            Direction::Next => {
                self.events.notify(&PlayerEvent::BeforeNextChapter);
                self.get_next_chapter().await
            }
            Direction::Prev => {
                self.events.notify(&PlayerEvent::BeforePrevChapter);
                self.get_prev_chapter()
            }
        };
        let target = match target {
            Ok(chapter) => chapter,
            Err(err) => {
                self.tip([err.to_string()]);
                return Err(err);
            }
        };

        self.play_chapter(&target, 0.0).await
    }

    // ── Source files ────────────────────────────────────────────

    /// Load another file of the current chapter. The current file only
    /// changes once the new one has loaded.
    pub async fn change_source_file(&self, file_id: &str) -> Result<CurrentChapter, PlayerError> {
        let started = {
            let inner = self.lock();
            match (&inner.profile, &inner.cur_chapter) {
                (Some(_), Some(cur)) => {
                    if !cur.chapter.files.iter().any(|f| f.id == file_id) {
                        return Err(PlayerError::NotFound(format!("file {file_id}")));
                    }
                    Some((inner.generation, cur.chapter.id.clone()))
                }
                _ => None,
            }
        };
        let Some((generation, chapter_id)) = started else {
            self.tip(["Chapter is not loaded yet"]);
            return Err(PlayerError::NotReady);
        };

        let loaded = {
            let _loading = CountGuard::enter(&self.loading_files);
            self.source.load(file_id).await
        };
        let file = match loaded {
            Ok(file) => file,
            Err(err) => {
                self.tip([err.to_string()]);
                return Err(err);
            }
        };

        let (cur, state) = {
            let mut inner = self.lock();
            if !inner.is_current(generation) {
                return Err(PlayerError::NotReady);
            }
            let Some(cur) = inner.cur_chapter.as_mut().filter(|c| c.chapter.id == chapter_id)
            else {
                debug!(file_id, "chapter changed while loading file, dropping it");
                return Err(PlayerError::NotFound(format!("file {file_id}")));
            };
            cur.cur_file = file;
            let cur = cur.clone();
            (cur, inner.snapshot())
        };

        self.events.notify(&PlayerEvent::SourceFileChanged(cur.clone()));
        self.emit_state(state);
        Ok(cur)
    }

    /// Flag a file of the current chapter as broken so views can grey it
    /// out. Local only; no event is emitted. Returns whether a file matched.
    pub fn mark_file_invalid(&self, file_id: &str) -> bool {
        let mut inner = self.lock();
        let Some(cur) = inner.cur_chapter.as_mut() else {
            return false;
        };
        match cur.chapter.files.iter_mut().find(|f| f.id == file_id) {
            Some(file) => {
                file.invalid = true;
                true
            }
            None => false,
        }
    }

    // ── Settings ────────────────────────────────────────────────

    pub fn set_current_time(&self, current_time: f64) {
        self.lock().current_time = sanitize_time(current_time);
    }

    pub fn set_resolution(&self, resolution: Resolution) {
        self.lock().settings.resolution = resolution;
    }

    pub fn set_rate(&self, rate: f32) {
        if rate > 0.0 && rate.is_finite() {
            self.lock().settings.rate = rate;
        }
    }

    pub fn set_volume(&self, volume: f32) {
        if volume.is_finite() {
            self.lock().settings.volume = volume.clamp(0.0, 1.0);
        }
    }

    // ── Progress ────────────────────────────────────────────────

    /// Persist progress at most once per throttle window. Returns the write
    /// task when one was started.
    pub fn update_play_progress(&self, values: ProgressValues) -> Option<JoinHandle<()>> {
        if !self.progress_throttle.try_acquire() {
            return None;
        }
        self.update_play_progress_force(values)
    }

    /// Persist progress now. Fire-and-forget: the write is not retried and
    /// its failure is only logged. Nothing is sent once destroyed.
    pub fn update_play_progress_force(&self, values: ProgressValues) -> Option<JoinHandle<()>> {
        let update = {
            let inner = self.lock();
            if inner.phase == PlayerPhase::Destroyed {
                return None;
            }
            let (Some(profile), Some(cur)) = (&inner.profile, &inner.cur_chapter) else {
                return None;
            };
            PlayHistoryUpdate {
                novel_id: profile.id.clone(),
                novel_chapter_id: cur.chapter.id.clone(),
                file_id: cur.cur_file.id.clone(),
                progress: round2(sanitize_time(values.current_time.unwrap_or(inner.current_time))),
                duration: round2(sanitize_time(values.duration.unwrap_or(0.0))),
            }
        };

        let Ok(handle) = Handle::try_current() else {
            warn!("progress update requested outside a tokio runtime");
            return None;
        };
        let service = Arc::clone(&self.service);
        Some(handle.spawn(async move {
            let chapter = update.novel_chapter_id.clone();
            let progress = update.progress;
            match service.update_play_history(update).await {
                Ok(()) => debug!(%chapter, progress, "progress saved"),
                Err(e) => warn!(%chapter, error = %e, "failed to save progress"),
            }
        }))
    }

    /// Feed a position update from the view. Marks the reader as playing
    /// until updates stop for the debounce period.
    pub fn handle_current_time_change(&self, update: TimeUpdate) -> Option<JoinHandle<()>> {
        self.playing.store(true, Ordering::SeqCst);
        let playing = Arc::clone(&self.playing);
        self.pause_debounce.call(move || {
            playing.store(false, Ordering::SeqCst);
        });

        let current_time = sanitize_time(update.current_time);
        self.lock().current_time = current_time;
        self.update_play_progress(ProgressValues {
            current_time: Some(current_time),
            duration: Some(update.duration),
        })
    }

    // ── Teardown ────────────────────────────────────────────────

    /// Release subscribers and timers. The controller rejects further work.
    pub fn destroy(&self) {
        self.lock().phase = PlayerPhase::Destroyed;
        self.pause_debounce.cancel();
        self.playing.store(false, Ordering::SeqCst);
        self.events.clear();
        debug!("player destroyed");
    }
}
