//! Inkbound: small official publisher, full directory on one page.

use crate::engine::compose::PluginDef;
use crate::engine::error::ScrapeError;
use crate::model::{PluginInfo, Tag};
use crate::strategies::{CssChapterList, CssPageList, CssSeriesList, ImageFetch};

pub fn definition() -> Result<PluginDef, ScrapeError> {
    let info = PluginInfo::new("inkbound", "Inkbound", "https://inkbound.co/")?
        .with_icon("icons/inkbound.png")
        .with_tags(&[Tag::Webcomic, Tag::English, Tag::Official]);
    Ok(PluginDef::new(info)
        .with(CssSeriesList::new("/comics/", "div.comic-index a.comic-title"))
        .with(CssChapterList::new("ol.chapter-list a"))
        .with(CssPageList::new("section.pages img", &["src"]))
        .with(ImageFetch::direct()))
}
