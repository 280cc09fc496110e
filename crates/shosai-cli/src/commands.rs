use std::sync::Arc;

use shosai_api::format::relative_time_from_now;
use shosai_api::reader::types::SearchedNovel;
use shosai_api::{ApiError, ReaderClient};
use shosai_core::config::AppConfig;
use shosai_core::error::{ConfigError, PlayerError};
use shosai_core::paged::{Page, PageSource, PagedList};
use shosai_core::{PlayerController, PlayerEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error("config serialize error: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("no search result with id {0}")]
    NoSuchResult(String),
}

// ── Shelf ──────────────────────────────────────────────────────

pub async fn shelf(
    client: &ReaderClient,
    keyword: &str,
    page: u32,
    page_size: u32,
) -> Result<(), CliError> {
    let shelf = client.fetch_shelf(keyword, page, page_size).await?;
    if shelf.novels.is_empty() {
        println!("Shelf is empty.");
        return Ok(());
    }

    for novel in &shelf.novels {
        println!("{}  {} ({})", novel.id, novel.name, novel.author);
        if let Some(cur) = &novel.cur_chapter {
            println!("    reading: {} · {}", cur.name, cur.when);
        }
        println!(
            "    latest:  {} · {}",
            novel.latest_chapter.name, novel.latest_chapter.when
        );
    }
    if shelf.has_more() {
        println!("-- page {} of {} novels, use --page {} for more", shelf.page, shelf.total, shelf.page + 1);
    }
    Ok(())
}

// ── Search ─────────────────────────────────────────────────────

/// Catalogue search results for one keyword.
pub struct SearchPages<'a> {
    client: &'a ReaderClient,
    keyword: &'a str,
    page_size: u32,
}

impl<'a> SearchPages<'a> {
    pub fn new(client: &'a ReaderClient, keyword: &'a str, page_size: u32) -> Self {
        Self {
            client,
            keyword,
            page_size,
        }
    }
}

impl PageSource<SearchedNovel> for SearchPages<'_> {
    type Error = ApiError;

    async fn fetch_page(&self, marker: Option<&str>) -> Result<Page<SearchedNovel>, ApiError> {
        let page = self.client.search(self.keyword, self.page_size, marker).await?;
        Ok(Page {
            items: page.novels,
            next_marker: page.next_marker,
        })
    }
}

/// Fetch up to `pages` pages, stopping early once results run out.
async fn collect_results<S>(source: &S, pages: u32) -> Result<PagedList<SearchedNovel>, S::Error>
where
    S: PageSource<SearchedNovel>,
{
    let mut list = PagedList::<SearchedNovel>::new();
    for _ in 0..pages.max(1) {
        if list.load_more(source).await?.is_empty() {
            break;
        }
    }
    Ok(list)
}

pub async fn search(
    client: &ReaderClient,
    keyword: &str,
    page_size: u32,
    pages: u32,
) -> Result<(), CliError> {
    let source = SearchPages::new(client, keyword, page_size);
    let list = collect_results(&source, pages).await?;

    if list.is_empty() {
        println!("No results for \"{keyword}\".");
        return Ok(());
    }
    for novel in list.items() {
        let status = if novel.is_finished() { "finished" } else { "ongoing" };
        println!("{}  {} ({}) [{status}]", novel.unique_id, novel.name, novel.author.name);
        if let Some(latest) = &novel.latest_chapter {
            println!("    latest: {} · {}", latest.name, relative_time_from_now(&latest.updated_at));
        }
    }
    if !list.is_exhausted() {
        println!("-- more results available, use --pages {}", pages + 1);
    }
    Ok(())
}

/// Search for `keyword` and put the result with `unique_id` on the shelf.
pub async fn add(
    client: &ReaderClient,
    keyword: &str,
    unique_id: &str,
    page_size: u32,
) -> Result<(), CliError> {
    let source = SearchPages::new(client, keyword, page_size);
    let Some(novel) = find_result(&source, unique_id).await? else {
        return Err(CliError::NoSuchResult(unique_id.to_string()));
    };

    client.add_to_shelf(&novel).await?;
    info!(unique_id, name = %novel.name, "added to shelf");
    println!("Added \"{}\" to the shelf.", novel.name);
    Ok(())
}

/// Page through results until one with `unique_id` turns up.
async fn find_result<S>(source: &S, unique_id: &str) -> Result<Option<SearchedNovel>, S::Error>
where
    S: PageSource<SearchedNovel>,
{
    let mut list = PagedList::<SearchedNovel>::new();
    loop {
        if let Some(found) = list.items().iter().find(|n| n.unique_id == unique_id) {
            return Ok(Some(found.clone()));
        }
        if list.is_exhausted() || list.load_more(source).await?.is_empty() {
            return Ok(None);
        }
    }
}

// ── History ────────────────────────────────────────────────────

pub async fn history(
    client: &ReaderClient,
    page_size: u32,
    delete: Option<&str>,
) -> Result<(), CliError> {
    if let Some(id) = delete {
        client.delete_history(id).await?;
        println!("Deleted history entry {id}.");
        return Ok(());
    }

    let page = client.fetch_histories(page_size, None).await?;
    if page.items.is_empty() {
        println!("No reading history.");
        return Ok(());
    }
    for item in &page.items {
        let update = if item.has_update { " (new chapters)" } else { "" };
        println!(
            "{}  {} {:>3}% · {}{update}",
            item.id,
            item.name,
            item.percent,
            item.updated
        );
    }
    Ok(())
}

// ── Read ───────────────────────────────────────────────────────

pub async fn read(
    client: ReaderClient,
    config: &AppConfig,
    novel_id: &str,
    next: u32,
    lines: usize,
) -> Result<(), CliError> {
    let player = PlayerController::new(Arc::new(client), config);
    let _tips = player.subscribe(|event| match event {
        PlayerEvent::Tip(notice) => warn!("{notice}"),
        PlayerEvent::ChapterChanged(cur) => debug!(chapter = %cur.chapter.id, "chapter changed"),
        _ => {}
    });

    let mut cur = player.open(novel_id).await?;
    for _ in 0..next {
        match player.play_next_chapter().await {
            Ok(chapter) => cur = chapter,
            Err(PlayerError::EndOfList) => {
                println!("Reached the last chapter.");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("{}", player.title().join(" · "));
    println!("file: {}", cur.cur_file.name);
    println!();
    for line in cur.cur_file.content.iter().take(lines) {
        println!("{line}");
    }
    if cur.cur_file.content.len() > lines {
        println!("…");
    }

    if let Some(write) = player.update_play_progress_force(Default::default()) {
        if let Err(e) = write.await {
            warn!(error = %e, "progress task failed");
        }
    }
    player.destroy();
    Ok(())
}

// ── Config ─────────────────────────────────────────────────────

pub fn show_config(config: &AppConfig, path: &std::path::Path) -> Result<(), CliError> {
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shosai_api::reader::types::SearchedAuthor;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn novel(id: &str) -> SearchedNovel {
        SearchedNovel {
            unique_id: id.into(),
            name: format!("Novel {id}"),
            overview: String::new(),
            cover_path: None,
            author: SearchedAuthor {
                name: "Anon".into(),
            },
            in_production: 1,
            latest_chapter: None,
        }
    }

    /// Serves scripted result pages and records the markers it was asked for.
    struct Scripted {
        pages: Mutex<VecDeque<Page<SearchedNovel>>>,
        markers: Mutex<Vec<Option<String>>>,
    }

    impl Scripted {
        fn new(pages: Vec<(Vec<&str>, Option<&str>)>) -> Self {
            let pages = pages
                .into_iter()
                .map(|(ids, marker)| Page {
                    items: ids.into_iter().map(novel).collect(),
                    next_marker: marker.map(str::to_owned),
                })
                .collect();
            Self {
                pages: Mutex::new(pages),
                markers: Mutex::new(Vec::new()),
            }
        }

        fn markers(&self) -> Vec<Option<String>> {
            self.markers.lock().unwrap().clone()
        }
    }

    impl PageSource<SearchedNovel> for Scripted {
        type Error = String;

        async fn fetch_page(&self, marker: Option<&str>) -> Result<Page<SearchedNovel>, String> {
            self.markers.lock().unwrap().push(marker.map(str::to_owned));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| "unexpected fetch".to_string())
        }
    }

    #[tokio::test]
    async fn test_collect_results_stops_at_page_limit() {
        let source = Scripted::new(vec![
            (vec!["a", "b"], Some("m1")),
            (vec!["c"], Some("m2")),
            (vec!["d"], None),
        ]);

        let list = collect_results(&source, 2).await.unwrap();
        let ids: Vec<&str> = list.items().iter().map(|n| n.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(!list.is_exhausted());
        assert_eq!(source.markers(), vec![None, Some("m1".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_results_stops_when_exhausted() {
        let source = Scripted::new(vec![(vec!["a"], None)]);

        let list = collect_results(&source, 5).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.is_exhausted());
        assert_eq!(source.markers().len(), 1);
    }

    #[tokio::test]
    async fn test_find_result_pages_until_found() {
        let source = Scripted::new(vec![
            (vec!["a", "b"], Some("m1")),
            (vec!["c", "d"], Some("m2")),
        ]);

        let found = find_result(&source, "d").await.unwrap();
        assert_eq!(found, Some(novel("d")));
        assert_eq!(source.markers().len(), 2);
    }

    #[tokio::test]
    async fn test_find_result_missing() {
        let source = Scripted::new(vec![(vec!["a"], Some("m1")), (vec![], None)]);

        assert_eq!(find_result(&source, "z").await.unwrap(), None);
        assert_eq!(source.markers(), vec![None, Some("m1".to_string())]);
    }

    #[tokio::test]
    async fn test_search_errors_pass_through() {
        let source = Scripted::new(vec![]);
        assert_eq!(
            collect_results(&source, 1).await.unwrap_err(),
            "unexpected fetch"
        );
    }
}
