//! comicscrape: composable site-plugin framework for scraping comic series,
//! chapters, and pages.
//!
//! Site plugins are declared as a base plus reusable strategy layers
//! (listing, chapter, page, and image-fetch overrides) composed once at
//! registry construction; callers drive the four-operation capability
//! contract through the registry without knowing which strategies a plugin
//! mixes in.

pub mod cli;
pub mod config;
pub mod engine;
pub mod health;
pub mod model;
pub mod plugins;
pub mod strategies;

// Re-exports for CLI and consumers.
pub use engine::client::{HttpClient, HttpClientBuilder};
pub use engine::compose::{Capabilities, Capability, Plugin, PluginDef, Strategy};
pub use engine::error::ScrapeError;
pub use engine::registry::{Registry, RegistryError};
pub use engine::script::{JsSandbox, ScriptEngine};
pub use engine::{Connector, Limits, PluginContext, Services};
pub use model::{
    Chapter, ImageData, Page, PageData, PluginDescriptor, PluginInfo, Series, Tag,
};
