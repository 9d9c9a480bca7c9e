//! Chapter listing strategies: CSS over the series page, and AJAX fragment
//! endpoints (the WordPress admin-ajax scheme common to themed sites).

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::compose::{Capabilities, Capability, Strategy};
use crate::engine::dom::select_anchors;
use crate::engine::error::ScrapeError;
use crate::engine::{Connector, PluginContext};
use crate::model::{join_id, Chapter, ImageData, Page, Series};

/// Chapter anchors scraped straight off the series page, in document order.
/// Zero matches is a valid empty result (a series with no chapters yet).
pub struct CssChapterList {
    selector: String,
}

impl CssChapterList {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
        }
    }
}

impl Strategy for CssChapterList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Chapters])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(CssChapterLayer {
            selector: self.selector,
            inner,
            ctx,
        })
    }
}

struct CssChapterLayer {
    selector: String,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for CssChapterLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        self.inner.list_series().await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        let base = &self.ctx.info.base_url;
        let url = series.url(base)?;
        let html = self.ctx.client.get_text(&url).await?;
        let anchors = select_anchors(&html, &self.selector, base, &url, false)?;
        Ok(anchors
            .into_iter()
            .map(|a| Chapter {
                id: a.id,
                title: a.title,
                series: series.id.clone(),
            })
            .collect())
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.inner.list_pages(chapter).await
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}

/// Chapters fetched from a site AJAX endpoint returning an HTML fragment.
///
/// Form values may carry a `{series}` placeholder, substituted with the
/// series identifier before the POST. The returned fragment is parsed with
/// `selector` relative to the series URL.
pub struct AjaxChapterList {
    endpoint: String,
    form: Vec<(String, String)>,
    selector: String,
}

impl AjaxChapterList {
    pub fn new(endpoint: &str, form: &[(&str, &str)], selector: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            selector: selector.to_string(),
        }
    }
}

impl Strategy for AjaxChapterList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Chapters])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(AjaxChapterLayer {
            params: *self,
            inner,
            ctx,
        })
    }
}

struct AjaxChapterLayer {
    params: AjaxChapterList,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for AjaxChapterLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        self.inner.list_series().await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        let base = &self.ctx.info.base_url;
        let endpoint = join_id(base, &self.params.endpoint)?;
        let form: Vec<(String, String)> = self
            .params
            .form
            .iter()
            .map(|(k, v)| (k.clone(), v.replace("{series}", &series.id)))
            .collect();
        let fragment = self.ctx.client.post_form_text(&endpoint, &form).await?;
        // Fragment hrefs resolve against the series page, not the endpoint.
        let series_url = series.url(base)?;
        let anchors = select_anchors(&fragment, &self.params.selector, base, &series_url, false)?;
        Ok(anchors
            .into_iter()
            .map(|a| Chapter {
                id: a.id,
                title: a.title,
                series: series.id.clone(),
            })
            .collect())
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.inner.list_pages(chapter).await
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}
