//! PanelTide: JSON API directory, static reader markup, no hotlink guard.

use crate::engine::compose::PluginDef;
use crate::engine::error::ScrapeError;
use crate::model::{PluginInfo, Tag};
use crate::strategies::{AjaxSeriesList, CssChapterList, CssPageList, ImageFetch};

pub fn definition() -> Result<PluginDef, ScrapeError> {
    let info = PluginInfo::new("paneltide", "PanelTide", "https://paneltide.net/")?
        .with_icon("icons/paneltide.png")
        .with_tags(&[Tag::Webcomic, Tag::English, Tag::Aggregator]);
    Ok(PluginDef::new(info)
        .with(AjaxSeriesList::new(
            "/api/v2/comics?page={page}",
            "/data/items",
            "slug",
            "title",
            "/comics/{id}/",
        ))
        .with(CssChapterList::new("ul.chapter-list a.chapter-link"))
        .with(CssPageList::new("div.reader-pages img", &["data-src", "src"]))
        .with(ImageFetch::direct()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_admissible() {
        let def = definition().unwrap();
        assert!(def.capabilities().missing().is_empty());
        assert_eq!(def.info.base_url.as_str(), "https://paneltide.net/");
    }
}
