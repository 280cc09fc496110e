use serde::{Deserialize, Serialize};

use crate::format::relative_time_from_now;
use crate::traits::{
    Chapter, ChapterPage, MediaProfile, RawChapterFile, ReadingProfile, ResumePoint,
    SourceFileRef,
};

// ── Envelope ────────────────────────────────────────────────────

/// Every endpoint wraps its payload as `{ code, msg, data }`; `code == 0` is success.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// The server sends `""` rather than `null` once a list is exhausted.
fn non_empty(marker: Option<String>) -> Option<String> {
    marker.filter(|m| !m.is_empty())
}

// ── Reader responses ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SourceFileResp {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NovelChapterResp {
    pub id: String,
    pub name: String,
    pub order: u32,
    #[serde(default)]
    pub files: Vec<SourceFileResp>,
}

impl From<NovelChapterResp> for Chapter {
    fn from(resp: NovelChapterResp) -> Self {
        Chapter {
            id: resp.id,
            name: resp.name,
            order: resp.order,
            files: resp
                .files
                .into_iter()
                .map(|f| SourceFileRef {
                    id: f.id,
                    name: f.name,
                    invalid: false,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CurChapterResp {
    pub id: String,
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Deserialize)]
pub struct NovelAndCurChapterResp {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub cover_path: String,
    pub cur_chapter: Option<CurChapterResp>,
    #[serde(default)]
    pub chapters: Vec<NovelChapterResp>,
    pub next_marker: Option<String>,
}

impl NovelAndCurChapterResp {
    /// Resolve the resume point: the server's chapter if it is in the first
    /// page, otherwise the first chapter from the beginning.
    pub fn into_reading_profile(self) -> ReadingProfile {
        let chapters: Vec<Chapter> = self.chapters.into_iter().map(Chapter::from).collect();

        let matched = self.cur_chapter.as_ref().and_then(|cur| {
            chapters
                .iter()
                .find(|c| c.id == cur.id)
                .map(|c| ResumePoint {
                    chapter: c.clone(),
                    current_time: cur.progress.max(0.0),
                })
        });
        let resume = matched.or_else(|| {
            chapters.first().map(|c| ResumePoint {
                chapter: c.clone(),
                current_time: 0.0,
            })
        });

        ReadingProfile {
            profile: MediaProfile {
                id: self.id,
                name: self.name,
                overview: self.overview,
                poster_path: self.cover_path,
            },
            chapters,
            resume,
            next_marker: non_empty(self.next_marker),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChapterListResp {
    #[serde(default)]
    pub list: Vec<NovelChapterResp>,
    pub next_marker: Option<String>,
}

impl From<ChapterListResp> for ChapterPage {
    fn from(resp: ChapterListResp) -> Self {
        ChapterPage {
            chapters: resp.list.into_iter().map(Chapter::from).collect(),
            next_marker: non_empty(resp.next_marker),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChapterFileResp {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl From<ChapterFileResp> for RawChapterFile {
    fn from(resp: ChapterFileResp) -> Self {
        RawChapterFile {
            id: resp.id,
            name: resp.name,
            content: resp.content,
        }
    }
}

// ── Shelf ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuthorResp {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ShelfNovelResp {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub cover_path: String,
    #[serde(default)]
    pub latest_chapter_name: String,
    #[serde(default)]
    pub latest_chapter_created: String,
    pub cur_chapter_name: Option<String>,
    pub updated: Option<String>,
    pub author: AuthorResp,
}

#[derive(Debug, Deserialize)]
pub struct ShelfListResp {
    #[serde(default)]
    pub list: Vec<ShelfNovelResp>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

/// A chapter name paired with a relative time ("3d ago").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterMark {
    pub name: String,
    pub when: String,
}

/// A novel on the user's shelf, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfNovel {
    pub id: String,
    pub name: String,
    pub overview: String,
    pub cover_path: String,
    pub author: String,
    /// Where the reader stopped; only present when the server reports both
    /// the chapter and when it was read.
    pub cur_chapter: Option<ChapterMark>,
    pub latest_chapter: ChapterMark,
}

impl ShelfNovelResp {
    pub fn into_shelf_novel(self) -> ShelfNovel {
        let cur_chapter = match (self.updated, self.cur_chapter_name) {
            (Some(updated), Some(name)) if !updated.is_empty() && !name.is_empty() => {
                Some(ChapterMark {
                    name,
                    when: relative_time_from_now(&updated),
                })
            }
            _ => None,
        };
        ShelfNovel {
            id: self.id,
            name: self.name,
            overview: self.overview,
            cover_path: self.cover_path,
            author: self.author.name,
            cur_chapter,
            latest_chapter: ChapterMark {
                name: self.latest_chapter_name,
                when: relative_time_from_now(&self.latest_chapter_created),
            },
        }
    }
}

/// A page of shelf entries (page-number based).
#[derive(Debug, Clone)]
pub struct ShelfPage {
    pub novels: Vec<ShelfNovel>,
    pub total: u32,
    pub page: u32,
    pub page_size: u32,
}

impl ShelfPage {
    pub fn has_more(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }
}

impl From<ShelfListResp> for ShelfPage {
    fn from(resp: ShelfListResp) -> Self {
        ShelfPage {
            novels: resp
                .list
                .into_iter()
                .map(ShelfNovelResp::into_shelf_novel)
                .collect(),
            total: resp.total,
            page: resp.page,
            page_size: resp.page_size,
        }
    }
}

// ── Search ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchedAuthor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestChapter {
    pub name: String,
    pub updated_at: String,
}

/// A search hit. Sent back verbatim when adding it to the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchedNovel {
    pub unique_id: String,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub cover_path: Option<String>,
    pub author: SearchedAuthor,
    #[serde(default)]
    pub in_production: u8,
    pub latest_chapter: Option<LatestChapter>,
}

impl SearchedNovel {
    pub fn is_finished(&self) -> bool {
        self.in_production == 0
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchListResp {
    #[serde(default)]
    pub list: Vec<SearchedNovel>,
    pub next_marker: Option<String>,
}

/// A cursor page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub novels: Vec<SearchedNovel>,
    pub next_marker: Option<String>,
}

impl From<SearchListResp> for SearchPage {
    fn from(resp: SearchListResp) -> Self {
        SearchPage {
            novels: resp.list,
            next_marker: non_empty(resp.next_marker),
        }
    }
}

// ── History ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PlayHistoryResp {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub has_update: u8,
}

#[derive(Debug, Deserialize)]
pub struct HistoryListResp {
    #[serde(default)]
    pub list: Vec<PlayHistoryResp>,
    pub next_marker: Option<String>,
}

/// A reading history entry, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct PlayHistoryItem {
    pub id: String,
    pub media_id: String,
    pub name: String,
    pub poster_path: String,
    pub current_time: f64,
    /// Whole percent read, 0 when either progress or duration is unknown.
    pub percent: u8,
    pub has_update: bool,
    pub updated: String,
}

impl PlayHistoryResp {
    pub fn into_history_item(self) -> PlayHistoryItem {
        let percent = if self.current_time <= 0.0 || self.duration <= 0.0 {
            0
        } else {
            ((self.current_time / self.duration) * 100.0)
                .round()
                .clamp(0.0, 100.0) as u8
        };
        PlayHistoryItem {
            id: self.id,
            media_id: self.media_id,
            name: self.name,
            poster_path: self.poster_path,
            current_time: self.current_time,
            percent,
            has_update: self.has_update != 0,
            updated: relative_time_from_now(&self.updated),
        }
    }
}

/// A cursor page of history entries.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub items: Vec<PlayHistoryItem>,
    pub next_marker: Option<String>,
}

impl From<HistoryListResp> for HistoryPage {
    fn from(resp: HistoryListResp) -> Self {
        HistoryPage {
            items: resp
                .list
                .into_iter()
                .map(PlayHistoryResp::into_history_item)
                .collect(),
            next_marker: non_empty(resp.next_marker),
        }
    }
}
