use crate::core::filter::filter_qualified;
use crate::core::paginator::{fetch_all, PaginationOptions};
use crate::domain::model::ExportResult;
use crate::domain::ports::{RecordSink, RecordSource};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub pagination: PaginationOptions,
    /// Keep only premium/verified records before loading.
    pub qualified_only: bool,
}

/// Fetch -> filter -> load. Each stage's error is returned as-is; nothing is
/// retried and rows already written by the sink stay written.
pub struct ExportEngine<S: RecordSource, K: RecordSink> {
    source: S,
    sink: K,
    options: ExportOptions,
    monitor: SystemMonitor,
}

impl<S: RecordSource, K: RecordSink> ExportEngine<S, K> {
    pub fn new(source: S, sink: K, options: ExportOptions) -> Self {
        Self::new_with_monitoring(source, sink, options, false)
    }

    pub fn new_with_monitoring(source: S, sink: K, options: ExportOptions, monitor: bool) -> Self {
        Self {
            source,
            sink,
            options,
            monitor: SystemMonitor::new(monitor),
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn run(&self) -> Result<ExportResult> {
        tracing::info!("🚀 Starting export from {}", self.source.describe());
        self.monitor.log_stage("Start");

        // Fetch
        let fetched = fetch_all(&self.source, &self.options.pagination).await?;
        let total_fetched = fetched.records.len();
        tracing::info!(
            "📥 Fetched {} records in {} pages",
            total_fetched,
            fetched.pages_fetched
        );
        self.monitor.log_stage("Fetch");

        // Filter
        let records = if self.options.qualified_only {
            let qualified = filter_qualified(fetched.records);
            tracing::info!(
                "🔎 {} of {} records are premium or verified",
                qualified.len(),
                total_fetched
            );
            qualified
        } else {
            fetched.records
        };
        let qualified = records.len();
        self.monitor.log_stage("Filter");

        // Load
        let sink = self.sink.load(records).await?;
        self.monitor.log_stage("Load");
        self.monitor.log_final_stats();

        let result = ExportResult {
            fetched: total_fetched,
            pages_fetched: fetched.pages_fetched,
            qualified,
            sink,
        };
        tracing::info!("✅ {}", result.summary());
        Ok(result)
    }
}
