//! Accumulation of paged listings.
//!
//! Providers return listings one page at a time, each page optionally
//! carrying a continuation link to the next. [`list_all`] follows those links
//! until they run out and hands back every item in provider order.
//!
//! The listing is all-or-nothing: if any page fails, the items gathered so
//! far are dropped and the error names the 1-based page that failed.
//!
//! # Example
//!
//! ```
//! use rgmux::paging::{list_all, Page};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rgmux::Result<()> {
//! let items = list_all(|next: Option<String>| async move {
//!     Ok(match next.as_deref() {
//!         None => Page::with_next(vec!["a", "b"], "t1"),
//!         Some(_) => Page::last(vec!["c"]),
//!     })
//! })
//! .await?;
//!
//! assert_eq!(items, vec!["a", "b", "c"]);
//! # Ok(())
//! # }
//! ```

use crate::{Result, RgmuxError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

/// One batch of listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in provider order
    #[serde(rename = "value", default = "Vec::new")]
    pub items: Vec<T>,

    /// Link to the next page, if any
    #[serde(rename = "nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }

    /// A page followed by another one at `next_link`.
    pub fn with_next(items: Vec<T>, next_link: impl Into<String>) -> Self {
        Self {
            items,
            next_link: Some(next_link.into()),
        }
    }

    /// Continuation link, treating an empty link as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_link.as_deref().filter(|link| !link.is_empty())
    }
}

/// Follows continuation links across pages.
///
/// A default `Lister` has no page cap and trusts the provider to stop
/// returning continuation links. [`Lister::max_pages`] bounds the number of
/// pages; exceeding it fails with [`RgmuxError::PageLimitExceeded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lister {
    max_pages: Option<usize>,
}

impl Lister {
    /// Creates a lister without a page cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of pages fetched by one listing.
    ///
    /// A cap of 0 fails every listing before the first fetch.
    pub fn max_pages(mut self, limit: usize) -> Self {
        self.max_pages = Some(limit);
        self
    }

    /// Caps the number of pages when `limit` is `Some`.
    pub fn with_limit(self, limit: Option<usize>) -> Self {
        Self { max_pages: limit }
    }

    /// Returns the configured cap.
    pub fn limit(&self) -> Option<usize> {
        self.max_pages
    }

    /// Fetches every page and concatenates their items.
    ///
    /// `fetch_page` is called with `None` for the first page and with the
    /// previous page's continuation link afterwards. It is called exactly
    /// once per page.
    ///
    /// # Errors
    ///
    /// - [`RgmuxError::PageFetch`] wrapping the fetch error and the 1-based
    ///   index of the failing page
    /// - [`RgmuxError::PageLimitExceeded`] when a cap is set and the provider
    ///   still has pages after the cap is reached
    pub async fn list_all<T, F, Fut>(&self, mut fetch_page: F) -> Result<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut next_link: Option<String> = None;
        let mut page = 0usize;

        loop {
            if let Some(limit) = self.max_pages {
                if page >= limit {
                    return Err(RgmuxError::PageLimitExceeded { limit });
                }
            }
            page += 1;

            let result = fetch_page(next_link.take()).await.map_err(|e| {
                RgmuxError::PageFetch {
                    page,
                    source: Box::new(e),
                }
            })?;

            debug!(page, items = result.items.len(), "fetched listing page");

            next_link = result.continuation().map(str::to_string);
            items.extend(result.items);

            if next_link.is_none() {
                break;
            }
        }

        Ok(items)
    }
}

/// Fetches every page without a page cap.
///
/// Shorthand for `Lister::new().list_all(fetch_page)`.
pub async fn list_all<T, F, Fut>(fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    Lister::new().list_all(fetch_page).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves `pages` in order, linking page i to "t{i+1}", and records the
    /// argument of every call.
    struct StubPages {
        pages: Vec<Vec<&'static str>>,
        fail_on: Option<usize>,
        calls: Mutex<Vec<Option<String>>>,
    }

    impl StubPages {
        fn new(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                fail_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on = Some(call);
            self
        }

        async fn fetch(&self, next: Option<String>) -> Result<Page<&'static str>> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(next);
            let call = calls.len();

            if self.fail_on == Some(call) {
                return Err(RgmuxError::Remote(format!("boom on call {}", call)));
            }

            let items = self.pages[call - 1].clone();
            if call < self.pages.len() {
                Ok(Page::with_next(items, format!("t{}", call)))
            } else {
                Ok(Page::last(items))
            }
        }

        fn calls(&self) -> Vec<Option<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_two_pages_follow_token() {
        let stub = StubPages::new(vec![vec!["A", "B"], vec!["C"]]);

        let items = list_all(|next| stub.fetch(next)).await.unwrap();

        assert_eq!(items, vec!["A", "B", "C"]);
        assert_eq!(stub.calls(), vec![None, Some("t1".to_string())]);
    }

    #[tokio::test]
    async fn test_single_page_is_one_call() {
        let stub = StubPages::new(vec![vec!["only"]]);

        let items = list_all(|next| stub.fetch(next)).await.unwrap();

        assert_eq!(items, vec!["only"]);
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let stub = StubPages::new(vec![vec![]]);

        let items = list_all(|next| stub.fetch(next)).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_concatenates_many_pages_in_order() {
        let pages = vec![
            vec!["1", "2"],
            vec![],
            vec!["3"],
            vec!["4", "5", "6"],
            vec!["7"],
        ];
        let stub = StubPages::new(pages);

        let items = list_all(|next| stub.fetch(next)).await.unwrap();

        assert_eq!(items, vec!["1", "2", "3", "4", "5", "6", "7"]);
        assert_eq!(stub.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_failure_reports_page_and_drops_items() {
        for k in 1..=3 {
            let stub = StubPages::new(vec![vec!["A"], vec!["B"], vec!["C"]]).failing_on(k);

            let err = list_all(|next| stub.fetch(next)).await.unwrap_err();

            match err {
                RgmuxError::PageFetch { page, source } => {
                    assert_eq!(page, k);
                    assert!(source.to_string().contains("boom"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(stub.calls().len(), k);
        }
    }

    #[tokio::test]
    async fn test_empty_link_ends_listing() {
        let mut calls = 0;
        let items = list_all(|_next| {
            calls += 1;
            async { Ok(Page::with_next(vec![1, 2], "")) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_page_cap() {
        let stub = StubPages::new(vec![vec!["A"], vec!["B"], vec!["C"]]);
        let err = Lister::new()
            .max_pages(2)
            .list_all(|next| stub.fetch(next))
            .await
            .unwrap_err();

        assert!(matches!(err, RgmuxError::PageLimitExceeded { limit: 2 }));
        assert_eq!(stub.calls().len(), 2);

        let stub = StubPages::new(vec![vec!["A"], vec!["B"]]);
        let items = Lister::new()
            .max_pages(2)
            .list_all(|next| stub.fetch(next))
            .await
            .unwrap();
        assert_eq!(items, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_zero_page_cap_fetches_nothing() {
        let stub = StubPages::new(vec![vec!["A"]]);
        let err = Lister::new()
            .max_pages(0)
            .list_all(|next| stub.fetch(next))
            .await
            .unwrap_err();

        assert!(matches!(err, RgmuxError::PageLimitExceeded { limit: 0 }));
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn test_page_deserializes_provider_shape() {
        let page: Page<serde_json::Value> = serde_json::from_str(
            r#"{"value": [{"id": "/a"}], "nextLink": "https://example/next"}"#,
        )
        .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.continuation(), Some("https://example/next"));

        let page: Page<serde_json::Value> = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert_eq!(page.continuation(), None);
    }
}
