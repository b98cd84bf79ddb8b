use crate::domain::model::{CreatedSpreadsheet, Record, RecordBatch, SinkReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Paged external API yielding flat records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches `page_size` records starting at offset `cursor`.
    async fn fetch_page(&self, cursor: usize, page_size: usize) -> Result<RecordBatch>;

    /// Short label used in logs.
    fn describe(&self) -> String;
}

/// Spreadsheet operations needed by the sync engine.
#[async_trait]
pub trait SpreadsheetProvider: Send + Sync {
    /// Creates a spreadsheet with a single tab whose frozen first row holds `headers`.
    async fn create_spreadsheet(
        &self,
        title: &str,
        sheet_name: &str,
        headers: &[String],
    ) -> Result<CreatedSpreadsheet>;

    /// All rows of the tab, header row included.
    async fn read_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Vec<Vec<Value>>>;

    /// Appends `rows` after the last non-empty row of the tab, in order.
    async fn append_values(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<Value>],
    ) -> Result<()>;
}

/// Supplies a bearer token valid at call time.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Final stage of an export run.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn load(&self, records: Vec<Record>) -> Result<SinkReport>;
}

// Boxed trait objects, so the CLI can pick adapters at runtime.

#[async_trait]
impl<T: RecordSource + ?Sized> RecordSource for Box<T> {
    async fn fetch_page(&self, cursor: usize, page_size: usize) -> Result<RecordBatch> {
        (**self).fetch_page(cursor, page_size).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Box<T> {
    async fn access_token(&self) -> Result<String> {
        (**self).access_token().await
    }
}

#[async_trait]
impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    async fn load(&self, records: Vec<Record>) -> Result<SinkReport> {
        (**self).load(records).await
    }
}
