use tracing::debug;

use crate::config::settings::PaginationConfig;
use crate::error::{DirectoryError, Result};
use crate::helpers::cancel::CancelFlag;
use crate::normalize::{normalize_body, NormalizedValue};
use crate::observability::metrics::get_metrics;
use crate::transport::{ApiRequest, ExecuteRequest};
use crate::utils::constants::NEXT_PAGE_TOKEN_FIELD;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationSettings {
    /// page size sent as `maxResults`, service default when absent
    pub max_results: Option<u32>,
    pub max_pages: Option<u32>,
}

impl PaginationSettings {
    pub fn from_config(pagination: Option<&PaginationConfig>) -> Self {
        Self {
            max_results: pagination.and_then(|p| p.max_results),
            max_pages: pagination.and_then(|p| p.max_pages),
        }
    }
}

/// One decoded page: the normalized document plus its continuation token.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub record: NormalizedValue,
    pub next_page_token: Option<String>,
}

impl Page {
    pub fn from_body(raw_body: &str) -> Result<Self> {
        let record = normalize_body(raw_body)?;
        // an empty token means the same as no token
        let next_page_token = record
            .get(NEXT_PAGE_TOKEN_FIELD)
            .and_then(NormalizedValue::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned);
        Ok(Self { record, next_page_token })
    }

    /// Elements of the collection field, empty when the field is absent.
    pub fn into_items(mut self, collection_field: &str) -> Vec<NormalizedValue> {
        self.record.take_list(collection_field)
    }
}

/// Follows `nextPageToken` until the service stops sending one.
///
/// Pages are fetched strictly one after another since every request depends
/// on the previous answer. The result is all-or-nothing: a failed page drops
/// whatever earlier pages produced.
pub struct PaginatedFetcher<'a, E> {
    executor: &'a E,
    max_pages: Option<u32>,
    cancel: Option<CancelFlag>,
}

impl<'a, E: ExecuteRequest + Sync> PaginatedFetcher<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self { executor, max_pages: None, cancel: None }
    }

    /// Without a ceiling the loop ends only when the service stops paging.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn fetch_all<F>(&self, request_template: F, collection_field: &str) -> Result<Vec<NormalizedValue>>
    where
        F: Fn(Option<&str>) -> ApiRequest,
    {
        let metrics = get_metrics().await;
        let mut accumulator: Vec<NormalizedValue> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages: u32 = 0;

        loop {
            if let Some(max_pages) = self.max_pages {
                if pages >= max_pages {
                    return Err(DirectoryError::PageLimitExceeded { pages });
                }
            }
            if let Some(cancel) = &self.cancel {
                cancel.check()?;
            }

            let request = request_template(page_token.as_deref());
            let raw_body = self
                .executor
                .execute(&request)
                .await?
                .into_body()
                .inspect_err(|err| debug!("'{}' page {} failed: {}", collection_field, pages + 1, err))?;

            let page = Page::from_body(&raw_body)?;
            pages += 1;
            metrics.pages_fetched.with_label_values(&[collection_field]).inc();

            let next_page_token = page.next_page_token.clone();
            let items = page.into_items(collection_field);
            debug!(
                "'{}' page {}: {} items, more: {}",
                collection_field,
                pages,
                items.len(),
                next_page_token.is_some()
            );
            accumulator.extend(items);

            match next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(accumulator),
            }
        }
    }
}
