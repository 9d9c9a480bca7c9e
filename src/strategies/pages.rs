//! Page listing from static chapter markup.

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::compose::{Capabilities, Capability, Strategy};
use crate::engine::dom::select_attr_urls;
use crate::engine::error::ScrapeError;
use crate::engine::{Connector, PluginContext};
use crate::model::{media_type_for_url, Chapter, ImageData, Page, PageData, Series};

/// Image elements selected from the chapter document. The attribute list is
/// tried in order per element (lazy loaders keep the real source in
/// `data-src`). A chapter whose reader markup matches nothing is a parse
/// failure, not an empty chapter.
pub struct CssPageList {
    selector: String,
    attrs: Vec<String>,
}

impl CssPageList {
    pub fn new(selector: &str, attrs: &[&str]) -> Self {
        Self {
            selector: selector.to_string(),
            attrs: attrs.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Strategy for CssPageList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Pages])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(CssPageLayer {
            selector: self.selector,
            attrs: self.attrs,
            inner,
            ctx,
        })
    }
}

struct CssPageLayer {
    selector: String,
    attrs: Vec<String>,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for CssPageLayer {
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
        let attrs: Vec<&str> = self.attrs.iter().map(String::as_str).collect();
        let urls = select_attr_urls(&html, &self.selector, &attrs, &url, true)?;
        Ok(urls
            .into_iter()
            .enumerate()
            .map(|(i, u)| Page {
                index: i as u32,
                media_type: media_type_for_url(&u),
                data: PageData::Remote(u),
                referer: Some(url.to_string()),
            })
            .collect())
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}
