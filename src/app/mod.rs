//! Wires configuration into concrete adapters and runs one export.

use crate::adapters::connectsafely::{ConnectSafelyClient, GeoLocation};
use crate::adapters::google_sheets::GoogleSheetsClient;
use crate::adapters::json_export::JsonFileSink;
use crate::adapters::storage::LocalStorage;
use crate::config::{CliConfig, ExportConfig, SourceCommand};
use crate::core::etl::{ExportEngine, ExportOptions};
use crate::core::sync_engine::{SheetSink, SyncEngine};
use crate::core::RecordSink;
use crate::domain::model::{ExportResult, SheetTarget};
use crate::utils::error::{ExportError, Result};

/// Builds the sink for this run. Credentials are checked here, before any
/// source page is fetched.
pub fn build_sink(
    cli: &CliConfig,
    source: &SourceCommand,
    config: &ExportConfig,
    http: reqwest::Client,
) -> Result<Box<dyn RecordSink>> {
    if cli.writes_json() {
        let storage = LocalStorage::new(config.json.output_dir.clone());
        return Ok(Box::new(JsonFileSink::new(storage, config.json.filename.clone())));
    }

    let tokens = config.google_token_provider(http.clone())?;
    let sheets = GoogleSheetsClient::new(http, config.google.sheets_base_url.clone(), tokens);
    let target = SheetTarget::resolve(
        config.sheet.spreadsheet_id.clone(),
        config.sheet.spreadsheet_title.clone(),
        config.sheet.sheet_name.clone(),
    );
    Ok(Box::new(SheetSink::new(
        SyncEngine::new(sheets, source.layout()),
        target,
    )))
}

/// Swaps a search's location name for the first geo id the lookup returns.
/// Other commands come back unchanged.
pub async fn resolve_search_location(
    source: &SourceCommand,
    client: &ConnectSafelyClient,
) -> Result<SourceCommand> {
    let SourceCommand::Search {
        keywords,
        location: Some(name),
        title,
        resolve_location: true,
    } = source
    else {
        return Ok(source.clone());
    };

    let best = client
        .search_geo(name)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ExportError::LocationLookup {
            status: None,
            message: format!("no LinkedIn location matches \"{}\"", name),
        })?;
    tracing::info!("📍 Location \"{}\" resolved to {} ({})", name, best.name, best.id);

    Ok(SourceCommand::Search {
        keywords: keywords.clone(),
        location: Some(best.id),
        title: title.clone(),
        resolve_location: false,
    })
}

pub async fn lookup_locations(config: &ExportConfig, keywords: &str) -> Result<Vec<GeoLocation>> {
    let client = config.connectsafely_client(config.http_client()?)?;
    client.search_geo(keywords).await
}

pub async fn run_export(cli: &CliConfig, config: &ExportConfig) -> Result<ExportResult> {
    let source = cli
        .source()
        .ok_or_else(|| ExportError::config("the locations command does not export records"))?;

    let http = config.http_client()?;
    let client = config.connectsafely_client(http.clone())?;
    let sink = build_sink(cli, source, config, http)?;

    let source = resolve_search_location(source, &client).await?;
    let options = ExportOptions {
        pagination: config.pagination_options(),
        qualified_only: cli.qualified_only(),
    };

    ExportEngine::new_with_monitoring(source.build_source(client), sink, options, cli.monitor)
        .run()
        .await
}
