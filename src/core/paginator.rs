use crate::domain::model::{Record, FETCHED_AT_FIELD};
use crate::domain::ports::RecordSource;
use crate::utils::error::{ExportError, Result};
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOptions {
    pub page_size: usize,
    pub max_records: Option<usize>,
    /// Courtesy pause between pages, not needed for correctness.
    pub page_delay: Duration,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_records: None,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    pub pages_fetched: usize,
}

/// Drains `source` page by page, one request in flight at a time.
///
/// Stops when a page reports `hasMore=false`, when `max_records` is reached
/// (the last page is truncated to the cap) or when a page comes back empty.
/// Any failed page aborts the whole fetch.
pub async fn fetch_all<S: RecordSource + ?Sized>(
    source: &S,
    options: &PaginationOptions,
) -> Result<FetchOutcome> {
    if options.page_size == 0 {
        return Err(ExportError::InvalidConfigValueError {
            field: "pagination.page_size".to_string(),
            value: "0".to_string(),
            reason: "Page size must be at least 1".to_string(),
        });
    }

    let mut records: Vec<Record> = Vec::new();
    let mut cursor = 0usize;
    let mut pages_fetched = 0usize;

    if options.max_records == Some(0) {
        return Ok(FetchOutcome {
            records,
            pages_fetched,
        });
    }

    loop {
        let page = pages_fetched + 1;
        tracing::debug!(
            "Fetching page {} of {} (cursor {}, count {})",
            page,
            source.describe(),
            cursor,
            options.page_size
        );

        let batch = source
            .fetch_page(cursor, options.page_size)
            .await
            .map_err(|e| tag_page(e, page, cursor))?;
        pages_fetched += 1;

        let fetched_at = batch.fetched_at.to_rfc3339();
        let page_len = batch.records.len();
        records.extend(batch.records.into_iter().map(|mut record| {
            if !record.data.contains_key(FETCHED_AT_FIELD) {
                record.insert(FETCHED_AT_FIELD, fetched_at.clone());
            }
            record
        }));

        tracing::debug!(
            "Page {} returned {} records (hasMore={})",
            page,
            page_len,
            batch.has_more
        );

        if let Some(cap) = options.max_records {
            if records.len() >= cap {
                records.truncate(cap);
                tracing::info!("Reached max records cap of {}", cap);
                break;
            }
        }

        if !batch.has_more {
            break;
        }

        if page_len == 0 {
            tracing::warn!(
                "Page {} was empty but reported more results; stopping pagination",
                page
            );
            break;
        }

        cursor += options.page_size;

        if !options.page_delay.is_zero() {
            tokio::time::sleep(options.page_delay).await;
        }
    }

    tracing::info!(
        "Fetched {} records from {} in {} pages",
        records.len(),
        source.describe(),
        pages_fetched
    );

    Ok(FetchOutcome {
        records,
        pages_fetched,
    })
}

// Sources don't know their page number; fill it in, and wrap transport errors.
fn tag_page(error: ExportError, page: usize, cursor: usize) -> ExportError {
    match error {
        ExportError::SourceFetch {
            status, message, ..
        } => ExportError::SourceFetch {
            page,
            cursor,
            status,
            message,
        },
        ExportError::Http(e) => ExportError::SourceFetch {
            page,
            cursor,
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        },
        ExportError::SerializationError(e) => ExportError::SourceFetch {
            page,
            cursor,
            status: None,
            message: format!("Malformed response: {}", e),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RecordBatch;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves pre-built pages and records every cursor it was asked for.
    struct ScriptedSource {
        pages: Vec<(Vec<Record>, bool)>,
        fail_on_call: Option<usize>,
        cursors: Mutex<Vec<(usize, usize)>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<(Vec<Record>, bool)>) -> Self {
            Self {
                pages,
                fail_on_call: None,
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        fn calls(&self) -> Vec<(usize, usize)> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordSource for ScriptedSource {
        async fn fetch_page(&self, cursor: usize, page_size: usize) -> Result<RecordBatch> {
            let call = {
                let mut cursors = self.cursors.lock().unwrap();
                cursors.push((cursor, page_size));
                cursors.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(ExportError::source_fetch(0, cursor, Some(502), "Bad Gateway"));
            }
            let (records, has_more) = self
                .pages
                .get(call - 1)
                .cloned()
                .unwrap_or((Vec::new(), false));
            Ok(RecordBatch::new(records, has_more, cursor))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn members(ids: &[&str]) -> Vec<Record> {
        ids.iter()
            .map(|id| Record::from_json(json!({ "profileId": id })).unwrap())
            .collect()
    }

    fn options(page_size: usize, max_records: Option<usize>) -> PaginationOptions {
        PaginationOptions {
            page_size,
            max_records,
            page_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_stops_on_has_more_false() {
        let source = ScriptedSource::new(vec![
            (members(&["A", "B", "C"]), true),
            (members(&["D", "E", "F"]), true),
            (members(&["G"]), false),
            (members(&["never"]), false),
        ]);

        let outcome = fetch_all(&source, &options(3, None)).await.unwrap();

        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.records.len(), 7);
        assert_eq!(source.calls(), vec![(0, 3), (3, 3), (6, 3)]);
    }

    #[tokio::test]
    async fn test_cap_truncates_last_page() {
        let source = ScriptedSource::new(vec![
            (members(&["A", "B", "C"]), true),
            (members(&["D", "E", "F"]), true),
            (members(&["G", "H", "I"]), false),
        ]);

        let outcome = fetch_all(&source, &options(3, Some(5))).await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        let ids: Vec<String> = outcome.records.iter().filter_map(Record::profile_id).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
    }

    #[tokio::test]
    async fn test_cap_larger_than_available() {
        let source = ScriptedSource::new(vec![(members(&["A", "B"]), false)]);

        let outcome = fetch_all(&source, &options(50, Some(500))).await.unwrap();

        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_final_page() {
        let source = ScriptedSource::new(vec![
            (members(&["A", "B", "C"]), true),
            (Vec::new(), false),
        ]);

        let outcome = fetch_all(&source, &options(3, None)).await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.records.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_page_claiming_more_stops() {
        let source = ScriptedSource::new(vec![
            (members(&["A"]), true),
            (Vec::new(), true),
            (members(&["B"]), false),
        ]);

        let outcome = fetch_all(&source, &options(1, None)).await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_aborts_with_page_number() {
        let source = ScriptedSource::new(vec![
            (members(&["A", "B"]), true),
            (members(&["C", "D"]), true),
            (members(&["E"]), false),
        ])
        .failing_on(2);

        let err = fetch_all(&source, &options(2, None)).await.unwrap_err();

        match err {
            ExportError::SourceFetch {
                page,
                cursor,
                status,
                ..
            } => {
                assert_eq!(page, 2);
                assert_eq!(cursor, 2);
                assert_eq!(status, Some(502));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_records_are_stamped_with_fetch_time() {
        let mut pre_stamped = members(&["B"]);
        pre_stamped[0].insert(FETCHED_AT_FIELD, "2024-01-01T00:00:00Z");
        let mut page = members(&["A"]);
        page.extend(pre_stamped);
        let source = ScriptedSource::new(vec![(page, false)]);

        let outcome = fetch_all(&source, &options(10, None)).await.unwrap();

        assert!(outcome.records[0].str_field(FETCHED_AT_FIELD).is_some());
        assert_eq!(
            outcome.records[1].str_field(FETCHED_AT_FIELD),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let source = ScriptedSource::new(vec![]);
        assert!(fetch_all(&source, &options(0, None)).await.is_err());
        assert!(source.calls().is_empty());
    }
}
