//! Sandboxed script execution for dynamically rendered listings.
//!
//! Some sites assemble their page lists client-side; for those, a per-plugin
//! snippet runs against the fetched document inside an isolated JavaScript
//! context and returns a JSON value. The backend is swappable behind
//! [`ScriptEngine`]; the default is an embedded `deno_core` isolate. No
//! browser semantics are emulated: the snippet gets the raw document source
//! and the page URL as globals and must compute its result from those.

use std::time::Duration;

use async_trait::async_trait;
use deno_core::{v8, JsRuntime, RuntimeOptions};
use reqwest::Url;
use tokio::sync::oneshot;
use tracing::debug;

use crate::engine::error::ScrapeError;

/// Pluggable script-execution backend.
///
/// The snippet is the body of a function; it may return a value directly or
/// a promise. `documentSource` (the fetched HTML) and `pageUrl` are in scope
/// as globals. The result must be JSON-serializable.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn evaluate(
        &self,
        page_url: &Url,
        html: &str,
        snippet: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScrapeError>;
}

/// `deno_core`-backed engine. Every evaluation gets a fresh isolate on its
/// own thread; isolates are never shared between evaluations. On timeout the
/// isolate is terminated and the worker abandoned.
#[derive(Debug, Default)]
pub struct JsSandbox;

impl JsSandbox {
    pub fn new() -> Self {
        Self
    }
}

/// What the worker thread observed after draining the event loop.
enum Outcome {
    Ok(String),
    ScriptError(String),
    /// The snippet's promise can no longer resolve (no pending work left).
    Pending,
}

#[async_trait]
impl ScriptEngine for JsSandbox {
    async fn evaluate(
        &self,
        page_url: &Url,
        html: &str,
        snippet: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScrapeError> {
        debug!(%page_url, timeout_ms = timeout.as_millis() as u64, "script evaluation");
        let code = harness(page_url, html, snippet);
        let url = page_url.to_string();

        let (handle_tx, handle_rx) = std::sync::mpsc::channel();
        let (result_tx, result_rx) = oneshot::channel();
        std::thread::spawn(move || {
            let outcome = run_isolate(code, handle_tx);
            let _ = result_tx.send(outcome);
        });

        let timeout_err = ScrapeError::Timeout {
            operation: format!("script evaluation for {}", url),
            limit: timeout,
        };
        match tokio::time::timeout(timeout, result_rx).await {
            Ok(Ok(Ok(Outcome::Ok(json)))) => {
                serde_json::from_str(&json).map_err(|e| ScrapeError::ParseFailure {
                    url,
                    reason: format!("script returned unparsable JSON: {}", e),
                })
            }
            Ok(Ok(Ok(Outcome::ScriptError(message)))) => Err(ScrapeError::ParseFailure {
                url,
                reason: format!("script failed: {}", message),
            }),
            Ok(Ok(Ok(Outcome::Pending))) => Err(timeout_err),
            Ok(Ok(Err(message))) => Err(ScrapeError::ParseFailure {
                url,
                reason: message,
            }),
            // Worker thread died without reporting.
            Ok(Err(_)) => Err(ScrapeError::ParseFailure {
                url,
                reason: "script worker terminated unexpectedly".to_string(),
            }),
            Err(_) => {
                // Wall clock exhausted: kill the isolate so the worker can
                // unwind, then abandon it.
                if let Ok(handle) = handle_rx.try_recv() {
                    handle.terminate_execution();
                }
                Err(timeout_err)
            }
        }
    }
}

/// Wrap the snippet so its resolution lands in globals the embedder can read
/// back after the event loop drains.
fn harness(page_url: &Url, html: &str, snippet: &str) -> String {
    // serde_json string encoding doubles as JS string-literal escaping.
    let url_literal = serde_json::Value::String(page_url.to_string()).to_string();
    let html_literal = serde_json::Value::String(html.to_string()).to_string();
    format!(
        r#"globalThis.pageUrl = {url_literal};
globalThis.documentSource = {html_literal};
globalThis.__scrape_status = "pending";
globalThis.__scrape_result = undefined;
globalThis.__scrape_error = undefined;
Promise.resolve((function () {{
{snippet}
}})()).then(
  (value) => {{
    globalThis.__scrape_status = "ok";
    globalThis.__scrape_result = JSON.stringify(value);
  }},
  (err) => {{
    globalThis.__scrape_status = "error";
    globalThis.__scrape_error = String(err);
  }}
);
"#
    )
}

/// Runs on the worker thread: build an isolate, execute the harness, drive
/// the event loop to completion, read the result globals.
fn run_isolate(
    code: String,
    handle_tx: std::sync::mpsc::Sender<v8::IsolateHandle>,
) -> Result<Outcome, String> {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());
    let _ = handle_tx.send(runtime.v8_isolate().thread_safe_handle());

    runtime
        .execute_script("<scrape_snippet>", code.into())
        .map_err(|e| format!("script compile/execute failed: {}", e))?;

    let local = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| e.to_string())?;
    local
        .block_on(runtime.run_event_loop(Default::default()))
        .map_err(|e| format!("event loop failed: {}", e))?;

    let scope = &mut runtime.handle_scope();
    let context = scope.get_current_context();
    let global = context.global(scope);

    let get_global_string = |scope: &mut v8::HandleScope, key: &str| -> Option<String> {
        let key_str = v8::String::new(scope, key)?;
        let val = global.get(scope, key_str.into())?;
        if val.is_undefined() || val.is_null() {
            return None;
        }
        Some(val.to_string(scope)?.to_rust_string_lossy(scope))
    };

    let status = get_global_string(scope, "__scrape_status")
        .ok_or_else(|| "missing execution status".to_string())?;
    match status.as_str() {
        "ok" => {
            let result = get_global_string(scope, "__scrape_result")
                .ok_or_else(|| "script resolved with no result".to_string())?;
            Ok(Outcome::Ok(result))
        }
        "error" => Ok(Outcome::ScriptError(
            get_global_string(scope, "__scrape_error").unwrap_or_else(|| "unknown".to_string()),
        )),
        "pending" => Ok(Outcome::Pending),
        other => Err(format!("invalid execution status: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn page_url() -> Url {
        Url::parse("https://example.test/manga/sample/ch-1/").unwrap()
    }

    #[tokio::test]
    async fn snippet_returns_json_value() -> Result<(), ScrapeError> {
        let engine = JsSandbox::new();
        let value = engine
            .evaluate(
                &page_url(),
                "<html></html>",
                r#"return ["a.jpg", "b.jpg"];"#,
                Duration::from_secs(5),
            )
            .await?;
        assert_eq!(value, serde_json::json!(["a.jpg", "b.jpg"]));
        Ok(())
    }

    #[tokio::test]
    async fn snippet_sees_document_and_url_globals() -> Result<(), ScrapeError> {
        let engine = JsSandbox::new();
        let value = engine
            .evaluate(
                &page_url(),
                "<div id=\"x\">42</div>",
                r#"return [pageUrl, documentSource.includes("42")];"#,
                Duration::from_secs(5),
            )
            .await?;
        assert_eq!(
            value,
            serde_json::json!(["https://example.test/manga/sample/ch-1/", true])
        );
        Ok(())
    }

    #[tokio::test]
    async fn promise_result_is_awaited() -> Result<(), ScrapeError> {
        let engine = JsSandbox::new();
        let value = engine
            .evaluate(
                &page_url(),
                "<html></html>",
                r#"return Promise.resolve({ pages: 2 });"#,
                Duration::from_secs(5),
            )
            .await?;
        assert_eq!(value, serde_json::json!({ "pages": 2 }));
        Ok(())
    }

    #[tokio::test]
    async fn throwing_snippet_is_parse_failure() {
        let engine = JsSandbox::new();
        let result = engine
            .evaluate(
                &page_url(),
                "<html></html>",
                r#"throw new Error("widget missing");"#,
                Duration::from_secs(5),
            )
            .await;
        match result {
            Err(ScrapeError::ParseFailure { reason, .. }) => {
                assert!(reason.contains("widget missing"), "got: {}", reason);
            }
            other => panic!("expected ParseFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn never_resolving_snippet_times_out_within_bound() {
        let engine = JsSandbox::new();
        let bound = Duration::from_secs(2);
        let start = Instant::now();
        let result = engine
            .evaluate(
                &page_url(),
                "<html></html>",
                r#"return new Promise(() => {});"#,
                bound,
            )
            .await;
        assert!(matches!(result, Err(ScrapeError::Timeout { .. })));
        // Must fail promptly, not hang until some unrelated limit.
        assert!(start.elapsed() < bound + Duration::from_secs(3));
    }
}
