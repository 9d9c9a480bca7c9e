//! Site liveness probes over the registry enumeration interface.
//!
//! One GET per plugin base URI with a bounded timeout; the outcome is
//! classified Ok / Warning / Error and aggregated into a report sorted by
//! severity, then a popularity signal, then title. Only descriptors are
//! consumed; listing and fetch capabilities are never invoked here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::debug;

use crate::engine::client::HttpClient;
use crate::model::PluginDescriptor;

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Probe outcome, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Error,
    Warning,
    Ok,
}

impl Status {
    fn rank(self) -> u8 {
        match self {
            Status::Error => 0,
            Status::Warning => 1,
            Status::Ok => 2,
        }
    }
}

/// Harness configuration. Popularity and redirect allow-lists are keyed by
/// plugin identifier; redirect allow-list entries are substrings matched
/// against the final URL after redirects.
pub struct ProbeOptions {
    pub timeout: Duration,
    pub popularity: HashMap<String, u32>,
    pub allowed_redirects: HashMap<String, Vec<String>>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            popularity: HashMap::new(),
            allowed_redirects: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub id: String,
    pub title: String,
    pub base_url: String,
    pub status: Status,
    pub detail: String,
    pub popularity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub results: Vec<ProbeResult>,
}

impl HealthReport {
    /// Machine-readable form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable table.
    pub fn render_table(&self) -> String {
        let mut out = format!(
            "{:<8} {:<16} {:<28} {}\n",
            "STATUS", "PLUGIN", "TITLE", "DETAIL"
        );
        for r in &self.results {
            let status = match r.status {
                Status::Ok => "ok",
                Status::Warning => "warning",
                Status::Error => "error",
            };
            out.push_str(&format!(
                "{:<8} {:<16} {:<28} {}\n",
                status, r.id, r.title, r.detail
            ));
        }
        out
    }
}

/// Probe every descriptor concurrently and return the sorted report. The
/// optional callback is invoked after each completed probe with
/// (done, total).
pub async fn probe_all(
    descriptors: Vec<PluginDescriptor>,
    client: Arc<HttpClient>,
    options: &ProbeOptions,
    progress: Option<&dyn Fn(usize, usize)>,
) -> HealthReport {
    let total = descriptors.len();
    let mut set = JoinSet::new();
    for desc in descriptors {
        let client = Arc::clone(&client);
        let timeout = options.timeout;
        let allow = options
            .allowed_redirects
            .get(&desc.id)
            .cloned()
            .unwrap_or_default();
        let popularity = options.popularity.get(&desc.id).copied().unwrap_or(0);
        set.spawn(async move {
            let (status, detail) = probe_one(&client, &desc, timeout, &allow).await;
            ProbeResult {
                id: desc.id,
                title: desc.title,
                base_url: desc.base_url.to_string(),
                status,
                detail,
                popularity,
            }
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        if let Ok(result) = joined {
            debug!(id = %result.id, status = ?result.status, "probe finished");
            results.push(result);
            if let Some(cb) = progress {
                cb(results.len(), total);
            }
        }
    }
    sort_results(&mut results);
    HealthReport { results }
}

async fn probe_one(
    client: &HttpClient,
    desc: &PluginDescriptor,
    timeout: Duration,
    allow: &[String],
) -> (Status, String) {
    match tokio::time::timeout(timeout, client.probe(&desc.base_url)).await {
        Err(_) => (
            Status::Error,
            format!("no response within {}s", timeout.as_secs()),
        ),
        Ok(Err(e)) => (Status::Error, e.to_string()),
        Ok(Ok((final_url, status))) => {
            if !(200..400).contains(&status) {
                return (Status::Error, format!("HTTP {}", status));
            }
            if final_url.origin() != desc.base_url.origin() {
                let expected = allow.iter().any(|pat| final_url.as_str().contains(pat));
                if !expected {
                    return (
                        Status::Warning,
                        format!("redirected to {}", final_url),
                    );
                }
            }
            (Status::Ok, format!("HTTP {}", status))
        }
    }
}

/// Severity first, then popularity (high before low), then title.
fn sort_results(results: &mut [ProbeResult]) {
    results.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then(b.popularity.cmp(&a.popularity))
            .then(a.title.cmp(&b.title))
    });
}
