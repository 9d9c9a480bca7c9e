//! Core scraping framework: capability contract, fetch primitives, the
//! pagination walk, strategy composition, and the plugin registry.
//!
//! A site plugin is a decoration chain of strategy layers over an unbound
//! base, composed once at registry construction. Callers drive the four
//! capability operations through [`compose::Plugin`] without knowing which
//! strategies were mixed in.

pub mod client;
pub mod compose;
pub mod dom;
pub mod error;
pub mod paginate;
pub mod registry;
pub mod script;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::client::HttpClient;
use crate::engine::error::ScrapeError;
use crate::engine::script::ScriptEngine;
use crate::model::{Chapter, ImageData, Page, PluginInfo, Series};

/// The capability contract every plugin satisfies. Each operation is bound
/// to whichever strategy layer last overrode it.
///
/// An empty result vector is a valid success (a site with zero chapters),
/// distinct from any failure. Implementations suspend only at network calls
/// and script execution; independent operations are safe to run
/// concurrently.
#[async_trait]
pub trait Connector: Send + Sync {
    /// All discoverable series for the plugin's site, flattened and
    /// deduplicated, in the order the strategy emits (typically site order).
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError>;

    /// All chapters of one series, in the order retrieved.
    async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError>;

    /// The ordered page entries of one chapter; indices contiguous from 0.
    async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError>;

    /// Raw binary payload and content type for one page entry.
    async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError>;
}

/// Bounds applied to every strategy at composition time.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Hard cap on pages walked per listing run.
    pub page_cap: u32,
    /// Wall-clock budget for one sandboxed script evaluation.
    pub script_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            page_cap: paginate::DEFAULT_PAGE_CAP,
            script_timeout: Duration::from_secs(20),
        }
    }
}

/// Everything a strategy layer needs, resolved before composition: shared
/// services plus the owning plugin's static info. Strategies never consult a
/// settings store themselves.
pub struct PluginContext {
    pub client: Arc<HttpClient>,
    pub script: Arc<dyn ScriptEngine>,
    pub info: Arc<PluginInfo>,
    pub limits: Limits,
}

/// Shared services handed to the registry at startup; combined with each
/// plugin's info into its [`PluginContext`].
pub struct Services {
    pub client: Arc<HttpClient>,
    pub script: Arc<dyn ScriptEngine>,
    pub limits: Limits,
}

impl Services {
    pub fn new(client: HttpClient, script: impl ScriptEngine + 'static) -> Self {
        Self {
            client: Arc::new(client),
            script: Arc::new(script),
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
