//! Shared definition for sites running the Madara-style WordPress theme.
//!
//! Dozens of scanlation sites ship this theme nearly unmodified: a paged
//! `/manga/page/N/` directory, chapters served as an HTML fragment from
//! `admin-ajax.php`, lazy-loaded reader images, and CDNs that reject
//! hot-linked requests. One parameterization covers them all; layer order is
//! listing, chapters, pages, image fetch (each capability bound exactly
//! once).

use crate::engine::compose::PluginDef;
use crate::engine::error::ScrapeError;
use crate::model::{PluginInfo, Tag};
use crate::strategies::{AjaxChapterList, CssPageList, CssSeriesList, ImageFetch};

const SERIES_SELECTOR: &str = "div.page-item-detail div.post-title h3 a";
const CHAPTER_SELECTOR: &str = "li.wp-manga-chapter > a";
const PAGE_SELECTOR: &str = "div.reading-content img.wp-manga-chapter-img";

/// Definition for one Madara-themed site.
pub fn site(
    id: &str,
    title: &str,
    base_url: &str,
    extra_tags: &[Tag],
) -> Result<PluginDef, ScrapeError> {
    let mut tags = vec![Tag::Manga, Tag::Scanlation];
    tags.extend_from_slice(extra_tags);
    let info = PluginInfo::new(id, title, base_url)?
        .with_icon(&format!("icons/{}.png", id))
        .with_tags(&tags);
    Ok(PluginDef::new(info)
        .with(CssSeriesList::new("/manga/page/{page}/", SERIES_SELECTOR))
        .with(AjaxChapterList::new(
            "/wp-admin/admin-ajax.php",
            &[("action", "manga_get_chapters"), ("manga", "{series}")],
            CHAPTER_SELECTOR,
        ))
        .with(CssPageList::new(PAGE_SELECTOR, &["data-src", "src"]))
        .with(ImageFetch::with_referer()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compose::Capability;

    #[test]
    fn madara_site_binds_the_full_contract() {
        let def = site("mangahaven", "Manga Haven", "https://mangahaven.org/", &[Tag::English])
            .unwrap();
        assert!(def.capabilities().missing().is_empty());
        for cap in Capability::ALL {
            assert!(def.capabilities().contains(cap));
        }
        assert_eq!(def.info.id, "mangahaven");
        assert!(def.info.tags.contains(&Tag::Manga));
        assert!(def.info.tags.contains(&Tag::English));
    }

    #[test]
    fn madara_site_rejects_bad_base_url() {
        assert!(site("x", "X", "not a url", &[]).is_err());
    }
}
