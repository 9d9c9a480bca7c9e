//! Reusable strategy catalog.
//!
//! Each strategy overrides one capability operation of the contract and is
//! parameterized by a per-site plugin definition (selectors, path templates,
//! endpoints, snippets). Everything else falls through to the next layer of
//! the decoration chain.

mod chapters;
mod image;
mod listing;
mod pages;
mod scripted;

pub use chapters::{AjaxChapterList, CssChapterList};
pub use image::ImageFetch;
pub use listing::{AjaxSeriesList, CssSeriesList};
pub use pages::CssPageList;
pub use scripted::{ScriptedChapterList, ScriptedPageList};
