//! Key/offset pagination over ordered store scans.
//!
//! A continuation key, when present, takes precedence over the offset. Keys
//! are opaque to callers: pass back whatever `next_key` the previous page
//! returned.

use serde::{Deserialize, Serialize};

use ecobasket_protocol::config::DEFAULT_PAGE_LIMIT;

/// Paging parameters for list queries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Continuation key from a previous [`PageResponse::next_key`].
    pub key: Option<Vec<u8>>,
    /// Entries to skip. Ignored when `key` is set.
    pub offset: u64,
    /// Maximum entries to return. 0 means the default page size.
    pub limit: u64,
    /// Whether to report the total entry count. Ignored when `key` is set.
    pub count_total: bool,
}

impl PageRequest {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Request for the page after `response`, keeping this page size.
    pub fn next(&self, response: &PageResponse) -> Option<Self> {
        response.next_key.as_ref().map(|key| Self {
            key: Some(key.clone()),
            offset: 0,
            limit: self.limit,
            count_total: false,
        })
    }
}

/// Paging metadata returned with each page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Key of the first entry of the next page, `None` on the last page.
    pub next_key: Option<Vec<u8>>,
    /// Total entries, when requested.
    pub total: Option<u64>,
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: PageResponse,
}

/// Slices an ordered prefix scan into one page.
///
/// Keys in `entries` all start with `prefix`; continuation keys are the
/// remainder after the prefix.
pub(crate) fn paginate(
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    prefix: &[u8],
    request: &PageRequest,
) -> (Vec<(Vec<u8>, Vec<u8>)>, PageResponse) {
    let len = entries.len();
    let limit = match request.limit {
        0 => DEFAULT_PAGE_LIMIT,
        n => n,
    };
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    let start = match &request.key {
        Some(key) => entries.partition_point(|(k, _)| &k[prefix.len()..] < key.as_slice()),
        None => usize::try_from(request.offset).unwrap_or(usize::MAX).min(len),
    };
    let end = start.saturating_add(limit).min(len);

    let next_key = entries
        .get(end)
        .map(|(k, _)| k[prefix.len()..].to_vec());
    let total = (request.count_total && request.key.is_none()).then_some(len as u64);

    let page = entries.into_iter().skip(start).take(end - start).collect();
    (page, PageResponse { next_key, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: u8) -> Vec<(Vec<u8>, Vec<u8>)> {
        (0..n).map(|i| (vec![b'p', i], vec![i])).collect()
    }

    #[test]
    fn offset_and_limit() {
        let request = PageRequest {
            offset: 2,
            limit: 3,
            count_total: true,
            ..Default::default()
        };
        let (page, response) = paginate(entries(10), b"p", &request);
        assert_eq!(page.iter().map(|(_, v)| v[0]).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(response.next_key, Some(vec![5]));
        assert_eq!(response.total, Some(10));
    }

    #[test]
    fn key_continues_where_previous_page_stopped() {
        let first = PageRequest::with_limit(4);
        let (_, response) = paginate(entries(10), b"p", &first);
        let second = first.next(&response).unwrap();
        let (page, response) = paginate(entries(10), b"p", &second);
        assert_eq!(page.iter().map(|(_, v)| v[0]).collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        assert_eq!(response.total, None);

        let third = second.next(&response).unwrap();
        let (page, response) = paginate(entries(10), b"p", &third);
        assert_eq!(page.len(), 2);
        assert!(response.next_key.is_none());
        assert!(third.next(&response).is_none());
    }

    #[test]
    fn offset_past_end_is_empty() {
        let request = PageRequest {
            offset: 50,
            ..Default::default()
        };
        let (page, response) = paginate(entries(3), b"p", &request);
        assert!(page.is_empty());
        assert!(response.next_key.is_none());
    }
}
