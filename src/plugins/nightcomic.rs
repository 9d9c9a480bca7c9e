//! NightComic: chapter and page lists are assembled client-side from packed
//! script variables, so both go through the sandbox. Image CDN requires the
//! referer workaround.

use crate::engine::compose::PluginDef;
use crate::engine::error::ScrapeError;
use crate::model::{PluginInfo, Tag};
use crate::strategies::{CssSeriesList, ImageFetch, ScriptedChapterList, ScriptedPageList};

const CHAPTER_SNIPPET: &str = r#"
const m = documentSource.match(/window\.__chapters\s*=\s*(\[[\s\S]*?\]);/);
if (!m) throw new Error("chapter data not found");
return JSON.parse(m[1]).map((c) => ({ id: c.url, title: c.name }));
"#;

const PAGE_SNIPPET: &str = r#"
const m = documentSource.match(/window\.__pages\s*=\s*(\[[\s\S]*?\]);/);
if (!m) throw new Error("page data not found");
return JSON.parse(m[1]);
"#;

pub fn definition() -> Result<PluginDef, ScrapeError> {
    let info = PluginInfo::new("nightcomic", "NightComic", "https://nightcomic.io/")?
        .with_icon("icons/nightcomic.png")
        .with_tags(&[Tag::Manhwa, Tag::English, Tag::Aggregator]);
    Ok(PluginDef::new(info)
        .with(CssSeriesList::new(
            "/series/?page={page}",
            "div.series-grid a.series-card",
        ))
        .with(ScriptedChapterList::new(CHAPTER_SNIPPET))
        .with(ScriptedPageList::new(PAGE_SNIPPET))
        .with(ImageFetch::with_referer()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_admissible() {
        let def = definition().unwrap();
        assert!(def.capabilities().missing().is_empty());
    }
}
