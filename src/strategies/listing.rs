//! Series listing strategies: CSS over numbered pages, and AJAX/JSON APIs.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::compose::{Capabilities, Capability, Strategy};
use crate::engine::dom::select_anchors;
use crate::engine::error::ScrapeError;
use crate::engine::paginate::{collect_pages, page_path};
use crate::engine::{Connector, PluginContext};
use crate::model::{join_id, Chapter, ImageData, Page, Series};

/// CSS-based series listing.
///
/// A `{page}` placeholder in the path makes this the multi-page walk
/// (terminating on the first page with no new entries); without it the
/// listing is a single fetch.
pub struct CssSeriesList {
    path: String,
    selector: String,
}

impl CssSeriesList {
    pub fn new(path: &str, selector: &str) -> Self {
        Self {
            path: path.to_string(),
            selector: selector.to_string(),
        }
    }
}

impl Strategy for CssSeriesList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Series])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(CssSeriesLayer {
            path: self.path,
            selector: self.selector,
            inner,
            ctx,
        })
    }
}

struct CssSeriesLayer {
    path: String,
    selector: String,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

#[async_trait]
impl Connector for CssSeriesLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        let base = &self.ctx.info.base_url;
        let plugin_id = self.ctx.info.id.as_str();

        if !self.path.contains("{page}") {
            // Single-page variant: the loop body exactly once.
            let url = join_id(base, &self.path)?;
            let html = self.ctx.client.get_text(&url).await?;
            let anchors = select_anchors(&html, &self.selector, base, &url, false)?;
            let mut seen = HashSet::new();
            return Ok(anchors
                .into_iter()
                .filter(|a| seen.insert(a.id.clone()))
                .map(|a| Series {
                    id: a.id,
                    title: a.title,
                    plugin: plugin_id.to_string(),
                })
                .collect());
        }

        collect_pages(
            self.ctx.limits.page_cap,
            |page| {
                let path = page_path(&self.path, page);
                async move {
                    let url = join_id(base, &path)?;
                    let html = self.ctx.client.get_text(&url).await?;
                    let anchors = select_anchors(&html, &self.selector, base, &url, false)?;
                    Ok(anchors
                        .into_iter()
                        .map(|a| Series {
                            id: a.id,
                            title: a.title,
                            plugin: plugin_id.to_string(),
                        })
                        .collect())
                }
            },
            |s: &Series| s.id.as_str(),
        )
        .await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        self.inner.list_chapters(series).await
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.inner.list_pages(chapter).await
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}

/// JSON API series listing over a templated endpoint.
///
/// `endpoint` carries a `{page}` placeholder; the response locates its item
/// array at `items_pointer` (JSON pointer), each item exposing `id_field`
/// and `title_field`. `id_template`'s `{id}` turns the raw item id into the
/// site-relative series identifier.
pub struct AjaxSeriesList {
    endpoint: String,
    items_pointer: String,
    id_field: String,
    title_field: String,
    id_template: String,
}

impl AjaxSeriesList {
    pub fn new(
        endpoint: &str,
        items_pointer: &str,
        id_field: &str,
        title_field: &str,
        id_template: &str,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            items_pointer: items_pointer.to_string(),
            id_field: id_field.to_string(),
            title_field: title_field.to_string(),
            id_template: id_template.to_string(),
        }
    }
}

impl Strategy for AjaxSeriesList {
    fn provides(&self) -> Capabilities {
        Capabilities::of(&[Capability::Series])
    }

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector> {
        Arc::new(AjaxSeriesLayer {
            params: *self,
            inner,
            ctx,
        })
    }
}

struct AjaxSeriesLayer {
    params: AjaxSeriesList,
    inner: Arc<dyn Connector>,
    ctx: Arc<PluginContext>,
}

/// Read a field that may be a JSON string or number, as a string.
fn field_string(item: &serde_json::Value, field: &str) -> Option<String> {
    match item.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Connector for AjaxSeriesLayer {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        let base = &self.ctx.info.base_url;
        let plugin_id = self.ctx.info.id.as_str();
        let p = &self.params;

        collect_pages(
            self.ctx.limits.page_cap,
            |page| {
                let path = page_path(&p.endpoint, page);
                async move {
                    let url = join_id(base, &path)?;
                    let body: serde_json::Value = self.ctx.client.get_json(&url).await?;
                    let items = body
                        .pointer(&p.items_pointer)
                        .and_then(|v| v.as_array())
                        .ok_or_else(|| ScrapeError::ParseFailure {
                            url: url.to_string(),
                            reason: format!("no array at JSON pointer {:?}", p.items_pointer),
                        })?;
                    let mut series = Vec::with_capacity(items.len());
                    for item in items {
                        let raw_id = field_string(item, &p.id_field).ok_or_else(|| {
                            ScrapeError::ParseFailure {
                                url: url.to_string(),
                                reason: format!("item missing field {:?}", p.id_field),
                            }
                        })?;
                        let title = field_string(item, &p.title_field).ok_or_else(|| {
                            ScrapeError::ParseFailure {
                                url: url.to_string(),
                                reason: format!("item missing field {:?}", p.title_field),
                            }
                        })?;
                        series.push(Series {
                            id: p.id_template.replace("{id}", &raw_id),
                            title,
                            plugin: plugin_id.to_string(),
                        });
                    }
                    Ok(series)
                }
            },
            |s: &Series| s.id.as_str(),
        )
        .await
    }

    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        self.inner.list_chapters(series).await
    }

    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.inner.list_pages(chapter).await
    }

    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.inner.fetch_image(page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::client::HttpClient;
    use crate::engine::compose::PluginDef;
    use crate::engine::script::JsSandbox;
    use crate::engine::{Limits, Services};
    use crate::model::PluginInfo;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn services() -> Services {
        Services::new(HttpClient::new().unwrap(), JsSandbox::new())
    }

    fn plugin_for(server: &MockServer, strategy: impl Strategy + 'static) -> crate::engine::compose::Plugin {
        let info = PluginInfo::new("fixture", "Fixture", &format!("{}/", server.uri())).unwrap();
        PluginDef::new(info).with(strategy).compose(&services())
    }

    fn listing_html(entries: &[(&str, &str)]) -> String {
        let items: String = entries
            .iter()
            .map(|(href, title)| format!(r#"<a class="series-link" href="{}">{}</a>"#, href, title))
            .collect();
        format!(r#"<html><body><div class="listing">{}</div></body></html>"#, items)
    }

    #[tokio::test]
    async fn multi_page_css_listing_walks_until_empty() -> Result<(), ScrapeError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directory/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[
                ("/manga/alpha/", "Alpha"),
                ("/manga/beta/", "Beta"),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/directory/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[
                // Beta repeats on page 2; only Gamma is new.
                ("/manga/beta/", "Beta"),
                ("/manga/gamma/", "Gamma"),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/directory/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[])))
            .mount(&server)
            .await;

        let plugin = plugin_for(
            &server,
            CssSeriesList::new("/directory/?page={page}", "a.series-link"),
        );
        let series = plugin.list_series().await?;
        let ids: Vec<&str> = series.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["/manga/alpha/", "/manga/beta/", "/manga/gamma/"]);
        assert!(series.iter().all(|s| s.plugin == "fixture"));
        Ok(())
    }

    #[tokio::test]
    async fn single_page_css_listing_fetches_once() -> Result<(), ScrapeError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manga-list/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[
                ("/manga/alpha/", "Alpha"),
                ("/manga/alpha/", "Alpha duplicate"),
                ("/manga/beta/", "Beta"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let plugin = plugin_for(&server, CssSeriesList::new("/manga-list/", "a.series-link"));
        let series = plugin.list_series().await?;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].title, "Alpha");
        Ok(())
    }

    #[tokio::test]
    async fn ajax_listing_parses_items_and_dedupes() -> Result<(), ScrapeError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/comics"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "items": [
                    { "slug": "alpha", "name": "Alpha" },
                    { "slug": "beta", "name": "Beta" },
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/comics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "items": [] }
            })))
            .mount(&server)
            .await;

        let plugin = plugin_for(
            &server,
            AjaxSeriesList::new("/api/comics?page={page}", "/data/items", "slug", "name", "/comics/{id}/"),
        );
        let series = plugin.list_series().await?;
        let ids: Vec<&str> = series.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["/comics/alpha/", "/comics/beta/"]);
        Ok(())
    }

    #[tokio::test]
    async fn ajax_listing_shape_mismatch_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/comics"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "unexpected": true })),
            )
            .mount(&server)
            .await;

        let plugin = plugin_for(
            &server,
            AjaxSeriesList::new("/api/comics?page={page}", "/data/items", "slug", "name", "/comics/{id}/"),
        );
        let result = plugin.list_series().await;
        assert!(matches!(result, Err(ScrapeError::ParseFailure { .. })));
    }

    #[tokio::test]
    async fn listing_respects_page_cap() -> Result<(), ScrapeError> {
        let server = MockServer::start().await;
        // Every page returns one fresh entry derived from the page number in
        // the query; only the cap stops the walk.
        for page in 1..=3u32 {
            Mock::given(method("GET"))
                .and(path("/directory/"))
                .and(query_param("page", page.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[(
                    &format!("/manga/p{}/", page),
                    "Entry",
                )])))
                .mount(&server)
                .await;
        }

        let info = PluginInfo::new("fixture", "Fixture", &format!("{}/", server.uri())).unwrap();
        let services = services().with_limits(Limits {
            page_cap: 3,
            ..Limits::default()
        });
        let plugin = PluginDef::new(info)
            .with(CssSeriesList::new("/directory/?page={page}", "a.series-link"))
            .compose(&services);
        let series = plugin.list_series().await?;
        assert_eq!(series.len(), 3);
        Ok(())
    }
}
