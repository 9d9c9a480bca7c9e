//! Strategy composition: the decoration chain.
//!
//! A plugin definition is a base (which binds nothing) plus an ordered list
//! of strategies. Composition happens once, at construction: each strategy
//! wraps the chain built so far, so the last-applied strategy is outermost
//! and dispatched first. Layers hold a reference to the next layer and
//! delegate every operation they do not override; they share no mutable
//! state, so composition order matters only for strategies overriding the
//! same operation (last-applied wins).

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::error::ScrapeError;
use crate::engine::{Connector, PluginContext, Services};
use crate::model::{Chapter, ImageData, Page, PluginDescriptor, PluginInfo, Series};

/// One capability operation of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Series,
    Chapters,
    Pages,
    Image,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Series,
        Capability::Chapters,
        Capability::Pages,
        Capability::Image,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Series => "list_series",
            Capability::Chapters => "list_chapters",
            Capability::Pages => "list_pages",
            Capability::Image => "fetch_image",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of capability operations a strategy overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    series: bool,
    chapters: bool,
    pages: bool,
    image: bool,
}

impl Capabilities {
    pub fn of(caps: &[Capability]) -> Self {
        let mut set = Self::default();
        for cap in caps {
            match cap {
                Capability::Series => set.series = true,
                Capability::Chapters => set.chapters = true,
                Capability::Pages => set.pages = true,
                Capability::Image => set.image = true,
            }
        }
        set
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            series: self.series || other.series,
            chapters: self.chapters || other.chapters,
            pages: self.pages || other.pages,
            image: self.image || other.image,
        }
    }

    pub fn contains(&self, cap: Capability) -> bool {
        match cap {
            Capability::Series => self.series,
            Capability::Chapters => self.chapters,
            Capability::Pages => self.pages,
            Capability::Image => self.image,
        }
    }

    /// Capabilities of the full contract not present in this set.
    pub fn missing(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| !self.contains(*c))
            .collect()
    }
}

/// A reusable override of one or more capability operations.
///
/// `apply` consumes the strategy's parameters and produces a connector layer
/// wrapping `inner`. The layer must delegate every operation outside
/// `provides()` to `inner` unchanged.
pub trait Strategy: Send + Sync {
    fn provides(&self) -> Capabilities;

    fn apply(
        self: Box<Self>,
        inner: Arc<dyn Connector>,
        ctx: Arc<PluginContext>,
    ) -> Arc<dyn Connector>;
}

/// Declaration of one site plugin: static info plus the strategies layered
/// onto the base, in application order.
pub struct PluginDef {
    pub info: PluginInfo,
    layers: Vec<Box<dyn Strategy>>,
}

impl PluginDef {
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info,
            layers: Vec::new(),
        }
    }

    /// Layer a strategy on top of the chain built so far. The last-applied
    /// strategy is outermost and dispatched first.
    pub fn with(mut self, strategy: impl Strategy + 'static) -> Self {
        self.layers.push(Box::new(strategy));
        self
    }

    /// Union of the operations bound by all layers. Admission to the
    /// registry requires the full contract.
    pub fn capabilities(&self) -> Capabilities {
        self.layers
            .iter()
            .fold(Capabilities::default(), |acc, s| acc.union(s.provides()))
    }

    /// Build the composed, immutable plugin. The caller (registry) is
    /// responsible for checking `capabilities()` first; operations no layer
    /// bound fail with `Unsupported` at the chain terminator.
    pub fn compose(self, services: &Services) -> Plugin {
        let info = Arc::new(self.info);
        let ctx = Arc::new(PluginContext {
            client: Arc::clone(&services.client),
            script: Arc::clone(&services.script),
            info: Arc::clone(&info),
            limits: services.limits,
        });
        let mut connector: Arc<dyn Connector> = Arc::new(Unbound {
            info: Arc::clone(&info),
        });
        for strategy in self.layers {
            connector = strategy.apply(connector, Arc::clone(&ctx));
        }
        Plugin { info, connector }
    }
}

/// A composed site plugin: one object exposing the full capability contract,
/// each operation bound to whichever layer last overrode it. Immutable after
/// composition; never destroyed during the process lifetime.
pub struct Plugin {
    info: Arc<PluginInfo>,
    connector: Arc<dyn Connector>,
}

impl Plugin {
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: self.info.id.clone(),
            title: self.info.title.clone(),
            base_url: self.info.base_url.clone(),
        }
    }

    pub async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        self.connector.list_series().await
    }

    pub async fn list_chapters(&self, series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        self.connector.list_chapters(series).await
    }

    pub async fn list_pages(&self, chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        self.connector.list_pages(chapter).await
    }

    pub async fn fetch_image(&self, page: &Page) -> Result<ImageData, ScrapeError> {
        self.connector.fetch_image(page).await
    }
}

/// Chain terminator: binds nothing. Unreachable for registered plugins
/// because admission requires every operation to be bound by some layer.
struct Unbound {
    info: Arc<PluginInfo>,
}

impl Unbound {
    fn unsupported(&self, capability: Capability) -> ScrapeError {
        ScrapeError::Unsupported {
            plugin: self.info.id.clone(),
            capability: capability.name(),
        }
    }
}

#[async_trait]
impl Connector for Unbound {
    async fn list_series(&self) -> Result<Vec<Series>, ScrapeError> {
        Err(self.unsupported(Capability::Series))
    }

    async fn list_chapters(&self, _series: &Series) -> Result<Vec<Chapter>, ScrapeError> {
        Err(self.unsupported(Capability::Chapters))
    }

    async fn list_pages(&self, _chapter: &Chapter) -> Result<Vec<Page>, ScrapeError> {
        Err(self.unsupported(Capability::Pages))
    }

    async fn fetch_image(&self, _page: &Page) -> Result<ImageData, ScrapeError> {
        Err(self.unsupported(Capability::Image))
    }
}
