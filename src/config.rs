//! Optional config file loading. Search order: ./comicscrape.toml, then
//! $XDG_CONFIG_HOME/comicscrape/config.toml (or ~/.config/comicscrape/config.toml).

use anyhow::Context;
use serde::Deserialize;

/// Config file contents. All fields optional; only present keys override
/// defaults. CLI flags override config.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Hard cap on pages walked per listing run.
    pub page_cap: Option<u32>,
    /// Wall-clock budget in seconds for one sandboxed script evaluation.
    pub script_timeout_secs: Option<u64>,
    /// Liveness probe timeout in seconds.
    pub probe_timeout_secs: Option<u64>,
}

/// Search order: (1) ./comicscrape.toml, (2) $XDG_CONFIG_HOME/comicscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or an unreadable present file
/// is an error.
pub fn load_config() -> anyhow::Result<Option<Config>> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let mut paths = vec![cwd.join("comicscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("comicscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            let config: Config = toml::from_str(&s)
                .with_context(|| format!("invalid config {}", path.display()))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}
