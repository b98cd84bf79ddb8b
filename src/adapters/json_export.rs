use crate::domain::model::{JsonExportOutcome, Record, SinkReport};
use crate::domain::ports::{RecordSink, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportFile<'a> {
    exported_at: String,
    total_count: usize,
    records: &'a [Record],
}

/// Writes each run to a fresh JSON file; no dedup across runs.
pub struct JsonFileSink<S: Storage> {
    storage: S,
    filename: Option<String>,
}

impl<S: Storage> JsonFileSink<S> {
    pub fn new(storage: S, filename: Option<String>) -> Self {
        Self { storage, filename }
    }

    fn resolve_filename(&self) -> String {
        match &self.filename {
            Some(name) if name.ends_with(".json") => name.clone(),
            Some(name) => format!("{}.json", name),
            None => format!(
                "linkedin-export-{}.json",
                Utc::now().format("%Y-%m-%dT%H-%M-%S")
            ),
        }
    }
}

#[async_trait]
impl<S: Storage> RecordSink for JsonFileSink<S> {
    async fn load(&self, records: Vec<Record>) -> Result<SinkReport> {
        let filename = self.resolve_filename();
        let document = ExportFile {
            exported_at: Utc::now().to_rfc3339(),
            total_count: records.len(),
            records: &records,
        };
        let data = serde_json::to_vec_pretty(&document)?;

        tracing::debug!("Writing {} bytes to {}", data.len(), filename);
        let file_path = self.storage.write_file(&filename, &data).await?;
        tracing::info!("💾 Exported {} records to {}", records.len(), file_path);

        Ok(SinkReport::Json(JsonExportOutcome {
            file_path,
            records_exported: records.len(),
            file_size_bytes: data.len(),
        }))
    }
}
