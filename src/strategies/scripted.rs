//! Script-based listing for sites whose data is assembled client-side.
//!
//! The per-plugin snippet runs in the sandbox against the fetched document
//! and returns JSON: an array of `{ "id", "title" }` objects for chapters,
//! an array of URL strings for pages. The snippet gets `documentSource` and
//! `pageUrl` as globals (see [`crate::engine::script`]).

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::compose::{Capabilities, Capability, Strategy};
use crate::engine::error::ScrapeError;
use crate::engine::{Connector, PluginContext};
use crate::model::{media_type_for_url, Chapter, ImageData, Page, PageData, Series};

/// Chapters computed by a snippet (e.g. sites that ship the chapter list as
/// a packed script variable instead of markup).
pub struct ScriptedChapterList {
    snippet: String,
}

impl ScriptedChapterList {
    pub fn new(snippet: &str) -> Self {
        Self {
            snippet: snippet.to_string(),
        }
    }
}

impl Strategy for ScriptedChapterList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Chapters])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(ScriptedChapterLayer {
            snippet: self.snippet,
            inner,
            ctx,
        })
    }
}

struct ScriptedChapterLayer {
    snippet: String,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for ScriptedChapterLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        self.inner.list_series().await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        let base = &self.ctx.info.base_url;
        let url = series.url(base)?;
        let html = self.ctx.client.get_text(&url).await?;
        let value = self
            .ctx
            .script
            .evaluate(&url, &html, &self.snippet, self.ctx.limits.script_timeout)
            .await?;
        let items = value.as_array().ok_or_else(|| ScrapeError::ParseFailure {
            url: url.to_string(),
            reason: "chapter snippet did not return an array".to_string(),
        })?;
        let mut chapters = Vec::with_capacity(items.len());
        for item in items {
            let id = item.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                ScrapeError::ParseFailure {
                    url: url.to_string(),
                    reason: "chapter snippet item missing \"id\"".to_string(),
                }
            })?;
            let title = item
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(id)
                .to_string();
            chapters.push(Chapter {
                id: id.to_string(),
                title,
                series: series.id.clone(),
            });
        }
        Ok(chapters)
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.inner.list_pages(chapter).await
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}

/// Page URLs computed by a snippet against the chapter document.
pub struct ScriptedPageList {
    snippet: String,
}

impl ScriptedPageList {
    pub fn new(snippet: &str) -> Self {
        Self {
            snippet: snippet.to_string(),
        }
    }
}

impl Strategy for ScriptedPageList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Pages])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(ScriptedPageLayer {
            snippet: self.snippet,
            inner,
            ctx,
        })
    }
}

struct ScriptedPageLayer {
    snippet: String,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for ScriptedPageLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        self.inner.list_series().await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        self.inner.list_chapters(series).await
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        let base = &self.ctx.info.base_url;
        let url = chapter.url(base)?;
        let html = self.ctx.client.get_text(&url).await?;
        let value = self
            .ctx
            .script
            .evaluate(&url, &html, &self.snippet, self.ctx.limits.script_timeout)
            .await?;
        let items = value.as_array().ok_or_else(|| ScrapeError::ParseFailure {
            url: url.to_string(),
            reason: "page snippet did not return an array".to_string(),
        })?;
        let mut pages = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let raw = item.as_str().ok_or_else(|| ScrapeError::ParseFailure {
                url: url.to_string(),
                reason: "page snippet item is not a string".to_string(),
            })?;
            let resolved = url.join(raw).map_err(|e| ScrapeError::ParseFailure {
                url: url.to_string(),
                reason: format!("page snippet returned bad URL {:?}: {}", raw, e),
            })?;
            pages.push(Page {
                index: i as u32,
                media_type: media_type_for_url(resolved.as_str()),
                data: PageData::Remote(resolved.to_string()),
                referer: Some(url.to_string()),
            });
        }
        Ok(pages)
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}
