//! Generic multi-page listing walk.
//!
//! Shared by every paged strategy: fetch page 1, 2, ... through a supplied
//! fetch function, keep first-seen entries only, stop when a page yields
//! nothing new or the hard cap is reached. Pages are fetched strictly in
//! order because page N+1 only exists after page N's termination check.

use std::collections::HashSet;
use std::future::Future;

use tracing::{debug, warn};

use crate::engine::error::ScrapeError;

/// Hard cap on pages walked in one listing run. Guards against sites that
/// redirect the out-of-range page back to a valid one forever.
pub const DEFAULT_PAGE_CAP: u32 = 500;

/// Walk numbered pages starting at 1, deduplicating by `key`.
///
/// Termination is a normal end-of-data signal, never an error: a page with
/// zero new entries stops the walk, as does reaching `cap` (logged as a
/// warning since the listing may be incomplete). Any page fetch error aborts
/// the walk and discards everything accumulated so far.
pub async fn collect_pages<T, Fetch, Fut, Key>(
    cap: u32,
    mut fetch: Fetch,
    key: Key,
) -> Result<Vec<T>, ScrapeError>
where
    Fetch: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ScrapeError>>,
    Key: Fn(&T) -> &str,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::new();
    let mut page = 1u32;
    loop {
        let candidates = fetch(page).await?;
        let mut fresh = 0usize;
        for candidate in candidates {
            if seen.insert(key(&candidate).to_string()) {
                result.push(candidate);
                fresh += 1;
            }
        }
        debug!(page, fresh, total = result.len(), "listing page walked");
        if fresh == 0 {
            break;
        }
        if page >= cap {
            warn!(cap, "listing reached page cap; result may be incomplete");
            break;
        }
        page += 1;
    }
    Ok(result)
}

/// Substitute `{page}` in a path template. Templates without the placeholder
/// describe single-page listings and are returned unchanged.
pub fn page_path(template: &str, page: u32) -> String {
    template.replace("{page}", &page.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn entries(ids: &[&str]) -> Vec<(String, String)> {
        ids.iter()
            .map(|i| (i.to_string(), format!("Title {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn stops_after_first_empty_page_with_exact_fetch_count() -> Result<(), ScrapeError> {
        // k = 3 non-empty pages, then an empty one: exactly k + 1 fetches.
        let fetches = Cell::new(0u32);
        let result = collect_pages(
            DEFAULT_PAGE_CAP,
            |page| {
                fetches.set(fetches.get() + 1);
                let batch = match page {
                    1 => entries(&["a", "b"]),
                    2 => entries(&["c"]),
                    3 => entries(&["d", "e"]),
                    _ => Vec::new(),
                };
                async move { Ok(batch) }
            },
            |(id, _)| id.as_str(),
        )
        .await?;
        assert_eq!(fetches.get(), 4);
        let ids: Vec<&str> = result.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_identifier_kept_once_in_first_seen_position() -> Result<(), ScrapeError> {
        let result = collect_pages(
            DEFAULT_PAGE_CAP,
            |page| {
                let batch = match page {
                    1 => entries(&["a", "b"]),
                    // Page 2 repeats "a" but also brings "c".
                    2 => entries(&["a", "c"]),
                    _ => Vec::new(),
                };
                async move { Ok(batch) }
            },
            |(id, _)| id.as_str(),
        )
        .await?;
        let ids: Vec<&str> = result.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        Ok(())
    }

    #[tokio::test]
    async fn page_of_only_duplicates_terminates() -> Result<(), ScrapeError> {
        let fetches = Cell::new(0u32);
        let result = collect_pages(
            DEFAULT_PAGE_CAP,
            |page| {
                fetches.set(fetches.get() + 1);
                let batch = match page {
                    1 => entries(&["a", "b"]),
                    // Strict subset of what page 1 returned: end of data.
                    _ => entries(&["b"]),
                };
                async move { Ok(batch) }
            },
            |(id, _)| id.as_str(),
        )
        .await?;
        assert_eq!(fetches.get(), 2);
        assert_eq!(result.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn cap_stops_a_never_ending_listing() -> Result<(), ScrapeError> {
        let fetches = Cell::new(0u32);
        let result = collect_pages(
            5,
            |page| {
                fetches.set(fetches.get() + 1);
                // Every page yields a fresh entry; only the cap stops this.
                let batch = entries(&[&format!("id-{}", page)]);
                async move { Ok(batch) }
            },
            |(id, _)| id.as_str(),
        )
        .await?;
        assert_eq!(fetches.get(), 5);
        assert_eq!(result.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_error_discards_partial_results() {
        let result = collect_pages(
            DEFAULT_PAGE_CAP,
            |page| async move {
                match page {
                    1 => Ok(entries(&["a"])),
                    _ => Err(ScrapeError::Unreachable {
                        url: "https://example.test/?page=2".to_string(),
                        reason: "connection reset".to_string(),
                    }),
                }
            },
            |(id, _): &(String, String)| id.as_str(),
        )
        .await;
        assert!(matches!(result, Err(ScrapeError::Unreachable { .. })));
    }

    #[test]
    fn page_path_substitution() {
        assert_eq!(page_path("/manga/page/{page}/", 3), "/manga/page/3/");
        assert_eq!(page_path("/manga-list/", 3), "/manga-list/");
    }
}
