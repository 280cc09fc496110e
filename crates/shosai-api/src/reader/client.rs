use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::error::ApiError;
use super::types::{
    ChapterFileResp, ChapterListResp, Envelope, HistoryListResp, HistoryPage,
    NovelAndCurChapterResp, SearchListResp, SearchPage, SearchedNovel, ShelfListResp, ShelfPage,
};
use crate::traits::{ChapterPage, PlayHistoryUpdate, RawChapterFile, ReaderService, ReadingProfile};

const CUR_CHAPTER_PATH: &str = "/api/v1/wechat/novel/cur_chapter";
const CHAPTERS_PATH: &str = "/api/v1/wechat/novel/chapters";
const CHAPTER_FILE_PATH: &str = "/api/v1/wechat/novel/file";
const HISTORY_UPDATE_PATH: &str = "/api/v1/wechat/history/update";
const SHELF_LIST_PATH: &str = "/api/v1/wechat/shelf/novel/list";
const SHELF_ADD_PATH: &str = "/api/v1/wechat/shelf/add_novel";
const SEARCH_PATH: &str = "/api/v1/wechat/search";
const HISTORY_LIST_PATH: &str = "/api/v2/wechat/history/list";
const HISTORY_DELETE_PATH: &str = "/api/v2/wechat/history/delete";

/// JSON-over-POST client for the reading server.
pub struct ReaderClient {
    base_url: Url,
    token: Option<String>,
    http: Client,
}

impl ReaderClient {
    pub fn new(base_url: Url, token: Option<String>) -> Self {
        Self {
            base_url,
            token: token.filter(|t| !t.is_empty()),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "reader API error");
            Err(ApiError::Api {
                status,
                message: body,
            })
        }
    }

    async fn send<B>(&self, path: &str, body: &B) -> Result<Envelope<serde_json::Value>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path)?;
        tracing::debug!(%url, "POST");

        let mut req = self.http.post(url).json(body);
        if let Some(token) = &self.token {
            req = req.header("Authorization", token);
        }
        let resp = Self::check_response(req.send().await?).await?;
        let envelope: Envelope<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        if envelope.code != 0 {
            tracing::warn!(code = envelope.code, msg = %envelope.msg, path, "server rejected request");
            return Err(ApiError::Server {
                code: envelope.code,
                message: envelope.msg,
            });
        }
        Ok(envelope)
    }

    /// POST `body` to `path` and decode the envelope's `data`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope = self.send(path, body).await?;
        let data = envelope
            .data
            .ok_or_else(|| ApiError::Parse(format!("{path}: response has no data")))?;
        serde_json::from_value(data).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// POST for endpoints whose `data` is irrelevant.
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(path, body).await.map(|_| ())
    }

    /// The user's shelf, page-number paginated.
    pub async fn fetch_shelf(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ShelfPage, ApiError> {
        let body = serde_json::json!({
            "keyword": keyword,
            "page": page,
            "page_size": page_size,
        });
        let resp: ShelfListResp = self.post(SHELF_LIST_PATH, &body).await?;
        Ok(resp.into())
    }

    /// Search the catalogue, cursor paginated.
    pub async fn search(
        &self,
        keyword: &str,
        page_size: u32,
        next_marker: Option<&str>,
    ) -> Result<SearchPage, ApiError> {
        let body = serde_json::json!({
            "keyword": keyword,
            "page_size": page_size,
            "next_marker": next_marker.unwrap_or_default(),
        });
        let resp: SearchListResp = self.post(SEARCH_PATH, &body).await?;
        Ok(resp.into())
    }

    pub async fn add_to_shelf(&self, novel: &SearchedNovel) -> Result<(), ApiError> {
        self.post_unit(SHELF_ADD_PATH, novel).await
    }

    /// Reading history, cursor paginated.
    pub async fn fetch_histories(
        &self,
        page_size: u32,
        next_marker: Option<&str>,
    ) -> Result<HistoryPage, ApiError> {
        let body = serde_json::json!({
            "page_size": page_size,
            "next_marker": next_marker.unwrap_or_default(),
        });
        let resp: HistoryListResp = self.post(HISTORY_LIST_PATH, &body).await?;
        Ok(resp.into())
    }

    pub async fn delete_history(&self, history_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "history_id": history_id });
        self.post_unit(HISTORY_DELETE_PATH, &body).await
    }
}

impl ReaderService for ReaderClient {
    type Error = ApiError;

    async fn fetch_reading_profile(&self, novel_id: &str) -> Result<ReadingProfile, ApiError> {
        let body = serde_json::json!({ "novel_id": novel_id });
        let resp: NovelAndCurChapterResp = self.post(CUR_CHAPTER_PATH, &body).await?;
        Ok(resp.into_reading_profile())
    }

    async fn fetch_chapters(
        &self,
        novel_id: &str,
        next_marker: Option<&str>,
    ) -> Result<ChapterPage, ApiError> {
        let body = serde_json::json!({
            "novel_id": novel_id,
            "next_marker": next_marker,
        });
        let resp: ChapterListResp = self.post(CHAPTERS_PATH, &body).await?;
        Ok(resp.into())
    }

    async fn fetch_chapter_file(&self, file_id: &str) -> Result<RawChapterFile, ApiError> {
        let body = serde_json::json!({ "file_id": file_id });
        let resp: ChapterFileResp = self.post(CHAPTER_FILE_PATH, &body).await?;
        Ok(resp.into())
    }

    async fn update_play_history(&self, update: PlayHistoryUpdate) -> Result<(), ApiError> {
        self.post_unit(HISTORY_UPDATE_PATH, &update).await
    }
}
