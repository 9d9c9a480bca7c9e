//! Per-site plugin definitions.
//!
//! Each module declares one site (or one family of sites sharing a theme) by
//! parameterizing the reusable strategies; no extraction logic lives here.
//! The full catalog is a small slice of what a production deployment ships.

pub mod inkbound;
pub mod madara;
pub mod nightcomic;
pub mod paneltide;

use crate::engine::compose::PluginDef;
use crate::engine::error::ScrapeError;
use crate::model::Tag;

/// All shipped plugin definitions, in registry enumeration order.
pub fn catalog() -> Result<Vec<PluginDef>, ScrapeError> {
    Ok(vec![
        madara::site("mangahaven", "Manga Haven", "https://mangahaven.org/", &[Tag::English])?,
        madara::site("lunarscans", "Lunar Scans", "https://lunarscans.com/", &[Tag::English])?,
        madara::site("tintaazul", "Tinta Azul", "https://tintaazul.es/", &[Tag::Spanish])?,
        paneltide::definition()?,
        nightcomic::definition()?,
        inkbound::definition()?,
    ])
}
