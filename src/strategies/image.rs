//! Binary page fetch, with the anti-hotlink referer workaround.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::engine::compose::{Capabilities, Capability, Strategy};
use crate::engine::error::ScrapeError;
use crate::engine::{Connector, PluginContext};
use crate::model::{Chapter, ImageData, Page, PageData, Series};

/// Fetches page bytes.
///
/// With `referer_workaround`, the request carries a synthetic `Referer`
/// equal to the page that linked the image, for hosts that reject hot-linked
/// requests. Plugins whose hosts do not need it are composed with the flag
/// off and fetch directly. A non-success status after the workaround is
/// `NotFound`; retry policy, if any, belongs to the download pipeline.
pub struct ImageFetch {
    referer_workaround: bool,
}

impl ImageFetch {
    /// Plain fetch, no synthetic headers.
    pub fn direct() -> Self {
        Self {
            referer_workaround: false,
        }
    }

    /// Fetch with the anti-hotlink referer attached.
    pub fn with_referer() -> Self {
        Self {
            referer_workaround: true,
        }
    }
}

impl Strategy for ImageFetch {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Image])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(ImageFetchLayer {
            referer_workaround: self.referer_workaround,
            inner,
            ctx,
        })
    }
}

struct ImageFetchLayer {
    referer_workaround: bool,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for ImageFetchLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        self.inner.list_series().await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        self.inner.list_chapters(series).await
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.inner.list_pages(chapter).await
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        let remote = match &page.data {
            // Bytes already in hand (embedded data): no request.
            PageData::Inline(bytes) => {
                return Ok(ImageData {
                    bytes: bytes.clone(),
                    media_type: page.media_type.clone(),
                });
            }
            PageData::Remote(url) => url,
        };
        let url = Url::parse(remote).map_err(|e| ScrapeError::InvalidUrl {
            input: remote.clone(),
            reason: e.to_string(),
        })?;
        let referer = if self.referer_workaround {
            page.referer.as_deref()
        } else {
            None
        };
        let (bytes, media_type) = self.ctx.client.get_bytes(&url, referer).await?;
        Ok(ImageData {
            media_type: media_type.unwrap_or_else(|| page.media_type.clone()),
            bytes,
        })
    }
}
