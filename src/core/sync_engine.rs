use crate::domain::model::{
    cell_text, spreadsheet_url, Record, RecordLayout, SheetTarget, SinkReport, SyncOutcome,
};
use crate::domain::ports::{RecordSink, SpreadsheetProvider};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// Lifecycle of the spreadsheet+tab pair during one sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    NeedsCreate,
    CreatedEmpty,
    Existing,
    Synced,
}

/// Reconciles a record set against one sheet tab, appending only rows whose
/// profile id is not already in the first column.
///
/// Read-then-append is not transactional: two runs against the same tab at
/// the same time can both miss each other's rows and append duplicates.
pub struct SyncEngine<P: SpreadsheetProvider> {
    provider: P,
    layout: RecordLayout,
}

impl<P: SpreadsheetProvider> SyncEngine<P> {
    pub fn new(provider: P, layout: RecordLayout) -> Self {
        Self { provider, layout }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    pub async fn sync(&self, target: &SheetTarget, records: &[Record]) -> Result<SyncOutcome> {
        let sheet_name = target.sheet_name().to_string();
        let mut state = match target {
            SheetTarget::New { .. } => SyncState::NeedsCreate,
            SheetTarget::Existing { .. } => SyncState::Existing,
        };

        let (spreadsheet_id, url, title) = match target {
            SheetTarget::New { title, .. } => {
                tracing::info!("Creating spreadsheet \"{}\" with tab \"{}\"", title, sheet_name);
                let created = self
                    .provider
                    .create_spreadsheet(title, &sheet_name, &self.layout.headers())
                    .await?;
                state = SyncState::CreatedEmpty;
                tracing::info!("Created spreadsheet {}", created.spreadsheet_id);
                (created.spreadsheet_id, created.spreadsheet_url, Some(title.clone()))
            }
            SheetTarget::Existing { spreadsheet_id, .. } => {
                (spreadsheet_id.clone(), spreadsheet_url(spreadsheet_id), None)
            }
        };
        tracing::debug!("Sync state: {:?}", state);

        let existing_rows = self.provider.read_values(&spreadsheet_id, &sheet_name).await?;
        let mut known_ids = existing_ids(&existing_rows);
        tracing::debug!(
            "Sheet \"{}\" already holds {} profile ids",
            sheet_name,
            known_ids.len()
        );

        let mut rows: Vec<Vec<Value>> = Vec::new();
        let mut skipped = 0usize;
        for record in records {
            let Some(id) = record.profile_id() else {
                tracing::warn!("Skipping record without profileId");
                skipped += 1;
                continue;
            };
            // insert() is false for ids already in the sheet or earlier in this batch
            if known_ids.insert(id) {
                rows.push(self.layout.to_row(record));
            } else {
                skipped += 1;
            }
        }

        let added = rows.len();
        if added > 0 {
            self.provider
                .append_values(&spreadsheet_id, &sheet_name, &rows)
                .await?;
        }
        state = SyncState::Synced;
        tracing::debug!("Sync state: {:?}", state);
        tracing::info!(
            "Appended {} rows to \"{}\" ({} duplicates skipped)",
            added,
            sheet_name,
            skipped
        );

        Ok(SyncOutcome {
            spreadsheet_id,
            spreadsheet_url: url,
            spreadsheet_title: title,
            sheet_name,
            added,
            skipped,
            is_new_sheet: matches!(target, SheetTarget::New { .. }),
        })
    }
}

/// Sheet-backed sink: one sync call per export run.
pub struct SheetSink<P: SpreadsheetProvider> {
    engine: SyncEngine<P>,
    target: SheetTarget,
}

impl<P: SpreadsheetProvider> SheetSink<P> {
    pub fn new(engine: SyncEngine<P>, target: SheetTarget) -> Self {
        Self { engine, target }
    }

    pub fn engine(&self) -> &SyncEngine<P> {
        &self.engine
    }
}

#[async_trait]
impl<P: SpreadsheetProvider> RecordSink for SheetSink<P> {
    async fn load(&self, records: Vec<Record>) -> Result<SinkReport> {
        let outcome = self.engine.sync(&self.target, &records).await?;
        tracing::info!("📄 {}", outcome.summary());
        Ok(SinkReport::Sheet(outcome))
    }
}

/// Ids in the first column, header row excluded.
fn existing_ids(rows: &[Vec<Value>]) -> HashSet<String> {
    rows.iter()
        .skip(1)
        .filter_map(|row| row.first())
        .map(cell_text)
        .filter(|id| !id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CreatedSpreadsheet, GROUP_MEMBER_LAYOUT};
    use crate::utils::error::ExportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySheets {
        sheets: Mutex<HashMap<String, Vec<Vec<Value>>>>,
        created: Mutex<usize>,
        append_calls: Mutex<usize>,
        fail_append: bool,
    }

    impl MemorySheets {
        fn with_rows(id: &str, rows: Vec<Vec<Value>>) -> Self {
            let provider = Self::default();
            provider.sheets.lock().unwrap().insert(id.to_string(), rows);
            provider
        }

        fn rows(&self, id: &str) -> Vec<Vec<Value>> {
            self.sheets.lock().unwrap().get(id).cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl SpreadsheetProvider for MemorySheets {
        async fn create_spreadsheet(
            &self,
            _title: &str,
            _sheet_name: &str,
            headers: &[String],
        ) -> Result<CreatedSpreadsheet> {
            let mut created = self.created.lock().unwrap();
            *created += 1;
            let id = format!("sheet-{}", *created);
            let header_row = headers.iter().map(|h| json!(h)).collect();
            self.sheets.lock().unwrap().insert(id.clone(), vec![header_row]);
            Ok(CreatedSpreadsheet {
                spreadsheet_url: spreadsheet_url(&id),
                spreadsheet_id: id,
            })
        }

        async fn read_values(&self, spreadsheet_id: &str, _sheet_name: &str) -> Result<Vec<Vec<Value>>> {
            self.sheets
                .lock()
                .unwrap()
                .get(spreadsheet_id)
                .cloned()
                .ok_or_else(|| ExportError::SheetRead {
                    status: Some(404),
                    message: "Requested entity was not found.".into(),
                })
        }

        async fn append_values(
            &self,
            spreadsheet_id: &str,
            _sheet_name: &str,
            rows: &[Vec<Value>],
        ) -> Result<()> {
            *self.append_calls.lock().unwrap() += 1;
            if self.fail_append {
                return Err(ExportError::SheetAppend {
                    status: Some(500),
                    message: "backend error".into(),
                });
            }
            self.sheets
                .lock()
                .unwrap()
                .entry(spreadsheet_id.to_string())
                .or_default()
                .extend(rows.iter().cloned());
            Ok(())
        }
    }

    fn members(ids: &[&str]) -> Vec<Record> {
        ids.iter()
            .map(|id| Record::from_json(json!({"profileId": id, "isPremium": true})).unwrap())
            .collect()
    }

    fn existing(id: &str) -> SheetTarget {
        SheetTarget::Existing {
            spreadsheet_id: id.to_string(),
            sheet_name: "Members".to_string(),
        }
    }

    fn header() -> Vec<Value> {
        GROUP_MEMBER_LAYOUT.headers().into_iter().map(Value::String).collect()
    }

    #[tokio::test]
    async fn test_creates_sheet_when_no_id() {
        let engine = SyncEngine::new(MemorySheets::default(), GROUP_MEMBER_LAYOUT);
        let target = SheetTarget::New {
            title: "Leads".into(),
            sheet_name: "Members".into(),
        };

        let outcome = engine.sync(&target, &members(&["A", "B"])).await.unwrap();

        assert!(outcome.is_new_sheet);
        assert!(!outcome.spreadsheet_id.is_empty());
        assert!(outcome.spreadsheet_url.ends_with(&outcome.spreadsheet_id));
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.skipped, 0);

        let rows = engine.provider().rows(&outcome.spreadsheet_id);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header());
        assert_eq!(rows[1][0], json!("A"));
        assert_eq!(rows[2][0], json!("B"));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let engine = SyncEngine::new(MemorySheets::with_rows("s1", vec![header()]), GROUP_MEMBER_LAYOUT);
        let records = members(&["A", "B", "C"]);

        let first = engine.sync(&existing("s1"), &records).await.unwrap();
        let second = engine.sync(&existing("s1"), &records).await.unwrap();

        assert!(!first.is_new_sheet);
        assert_eq!((first.added, first.skipped), (3, 0));
        assert_eq!((second.added, second.skipped), (0, 3));
        assert_eq!(engine.provider().rows("s1").len(), 4);
        // nothing new, so no append request the second time
        assert_eq!(*engine.provider().append_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_only_new_ids_are_appended() {
        let mut row_a = vec![json!("A")];
        row_a.resize(12, json!(""));
        let engine = SyncEngine::new(
            MemorySheets::with_rows("s1", vec![header(), row_a]),
            GROUP_MEMBER_LAYOUT,
        );

        let outcome = engine.sync(&existing("s1"), &members(&["A", "D"])).await.unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped, 1);
        let rows = engine.provider().rows("s1");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][0], json!("D"));
    }

    #[tokio::test]
    async fn test_header_cell_is_not_a_key() {
        // A record whose id equals the header label must still be appended.
        let engine = SyncEngine::new(MemorySheets::with_rows("s1", vec![header()]), GROUP_MEMBER_LAYOUT);

        let outcome = engine.sync(&existing("s1"), &members(&["Profile ID"])).await.unwrap();

        assert_eq!(outcome.added, 1);
    }

    #[tokio::test]
    async fn test_numeric_ids_match_stringified_cells() {
        let engine = SyncEngine::new(
            MemorySheets::with_rows("s1", vec![header(), vec![json!(12345)]]),
            GROUP_MEMBER_LAYOUT,
        );
        let records = vec![Record::from_json(json!({"profileId": "12345"})).unwrap()];

        let outcome = engine.sync(&existing("s1"), &records).await.unwrap();

        assert_eq!((outcome.added, outcome.skipped), (0, 1));
    }

    #[tokio::test]
    async fn test_duplicates_within_batch_and_missing_ids() {
        let engine = SyncEngine::new(MemorySheets::with_rows("s1", vec![]), GROUP_MEMBER_LAYOUT);
        let mut records = members(&["A", "B", "A"]);
        records.push(Record::from_json(json!({"fullName": "No Id"})).unwrap());

        let outcome = engine.sync(&existing("s1"), &records).await.unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.skipped, 2);
        let ids: Vec<Value> = engine.provider().rows("s1").iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec![json!("A"), json!("B")]);
    }

    #[tokio::test]
    async fn test_read_failure_surfaces_read_error() {
        let engine = SyncEngine::new(MemorySheets::default(), GROUP_MEMBER_LAYOUT);

        let err = engine.sync(&existing("missing"), &members(&["A"])).await.unwrap_err();

        assert!(matches!(err, ExportError::SheetRead { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn test_append_failure_surfaces_append_error() {
        let provider = MemorySheets {
            fail_append: true,
            ..MemorySheets::default()
        };
        provider.sheets.lock().unwrap().insert("s1".into(), vec![header()]);
        let engine = SyncEngine::new(provider, GROUP_MEMBER_LAYOUT);

        let err = engine.sync(&existing("s1"), &members(&["A"])).await.unwrap_err();

        assert!(matches!(err, ExportError::SheetAppend { .. }));
    }
}
